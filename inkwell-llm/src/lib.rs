//! # inkwell-llm: Generative-Model Layer for Inkwell
//!
//! Provides a unified interface for generative inference across backends:
//!   - **OpenAI-compatible API** (default; also works with any chat-completions server)
//!   - **Ollama** (local models)
//!
//! All generative calls in Inkwell go through this crate, ensuring:
//!   - Structured output requests (JSON mode)
//!   - Timeout management
//!   - Retry on transient server failures
//!   - A typed error taxonomy callers can degrade on
//!
//! # Call sites
//!
//! ```text
//! Grammar review     low temperature, JSON findings anchored to substrings
//! Next sentence      higher temperature, N candidates in one call
//! Logic review       low temperature, free-form analysis
//! ```

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use generator::TextGenerator;
pub use types::{LlmRequest, LlmResponse};
