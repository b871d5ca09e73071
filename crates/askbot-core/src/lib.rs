//! Core crate for Askbot — configuration and provider wire types.

pub mod config;
pub mod types;
