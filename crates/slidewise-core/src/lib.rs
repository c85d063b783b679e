#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for chunking operations.
pub const TRACING_TARGET_CHUNKER: &str = "slidewise_core::chunker";

/// Tracing target for model output parsing and row merging.
pub const TRACING_TARGET_TABLE: &str = "slidewise_core::table";

/// Tracing target for slide extraction.
pub const TRACING_TARGET_EXTRACT: &str = "slidewise_core::extract";

/// Tracing target for completion provider calls.
pub const TRACING_TARGET_COMPLETION: &str = "slidewise_core::completion";

mod error;

pub mod chunker;
pub mod completion;
pub mod export;
pub mod extract;
pub mod health;
#[doc(hidden)]
pub mod prelude;
pub mod prompt;
pub mod table;
pub mod types;

pub use chunker::{chunk_slides, count_words};
pub use error::{BoxedError, Error, ErrorKind, Result};
