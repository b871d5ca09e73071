//! Text helpers for the relay — question normalization and reply chunking.

/// Join command-argument fragments with single spaces and strip one layer
/// of enclosing double quotes.
///
/// Users often quote their question (`/gpt "Explain gravity"`); the quotes
/// are not part of the prompt. Only a balanced pair is removed: a lone
/// leading or trailing quote stays.
pub fn normalize_question(raw: &str) -> String {
    let joined = raw.split_whitespace().collect::<Vec<&str>>().join(" ");
    strip_enclosing_quotes(&joined).to_string()
}

/// Remove a leading+trailing double-quote pair, if both are present.
pub fn strip_enclosing_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Split a reply into chunks of at most `max_chars` characters.
///
/// Counts code points, not bytes, so multi-byte text is never split inside
/// a character. Chunks concatenate back to the input exactly, in order.
/// A `max_chars` of zero disables splitting.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for ch in text.chars() {
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    chunks.push(current);

    chunks
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
