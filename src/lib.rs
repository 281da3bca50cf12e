//! cream-room library crate
//!
//! Redecorates a living room photo in cream style through an OpenAI-compatible
//! multimodal model, then extracts a validated furnishing shopping list from
//! the result. The binary wraps this in an HTTP server and a small CLI.

pub mod config;
pub mod furnish;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod testing;
pub mod util;
