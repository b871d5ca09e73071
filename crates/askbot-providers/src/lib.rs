//! Completion provider client for Askbot.
//!
//! One reqwest-based client speaks all three upstream API shapes; the
//! relay only sees the [`traits::CompletionProvider`] seam.

pub mod client;
pub mod error;
pub mod traits;

pub use client::CompletionClient;
pub use error::{mask_key, CompletionError};
pub use traits::CompletionProvider;
