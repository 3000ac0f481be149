//! # Inkwell Core Library
//!
//! Service-agnostic building blocks for a writing assistant that merges two
//! grammar-checking signals into one correction list:
//!
//! - **Span model**: character-offset ranges, per-source findings and the
//!   composite errors surfaced to the writer ([`span`])
//! - **Merge engine**: transitive interval-union reconciliation of findings
//!   from disagreeing sources ([`merge`])
//! - **Segmentation**: sentence-boundary chunking for length-limited
//!   services ([`segment`])
//! - **Writing analysis**: rule-based tips and sentence statistics
//!   ([`analysis`])
//! - **Error journal**: optional SQLite log of findings and what the writer
//!   did with them ([`journal`])
//!
//! Everything here is synchronous and free of network I/O. Orchestration
//! and service adapters live in `inkwell-check`.
//!
//! ## Offsets
//!
//! All offsets are **character** offsets (Unicode scalar values), never byte
//! offsets. Korean text makes the distinction matter on every keystroke.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod journal;
pub mod merge;
pub mod segment;
pub mod span;

pub use config::InkwellConfig;
pub use error::InkwellError;
pub use merge::merge;
pub use span::*;
