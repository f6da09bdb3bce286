//! Chat-completion client and wire types for the hosted language model.
//!
//! The provider is reached only through the OpenAI-compatible
//! `chat/completions` contract: messages in, text content and token
//! usage out.

mod client;
mod types;


pub use client::LlmClient;
pub use types::*;
