#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for completion client operations.
pub const TRACING_TARGET: &str = "slidewise_reqwest::client";

mod client;
mod config;
mod error;
mod sse;

pub use crate::client::OpenAiClient;
pub use crate::config::OpenAiConfig;
pub use crate::error::{Error, Result};
