//! Key-value bucket configuration traits.

use std::time::Duration;

/// Marker trait for KV bucket configuration.
pub trait KvBucket: Clone + Send + Sync + 'static {
    /// Bucket name used in NATS KV.
    const NAME: &'static str;

    /// Human-readable description for the bucket.
    const DESCRIPTION: &'static str;

    /// Default TTL for entries in this bucket.
    /// Returns `None` for buckets where entries should not expire.
    const TTL: Option<Duration>;
}

/// Bucket holding jobs, chunk states and the jobs list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct JobsBucket;

impl KvBucket for JobsBucket {
    const NAME: &'static str = "slidewise_jobs";
    const DESCRIPTION: &'static str = "Slide review jobs and chunk states";
    const TTL: Option<Duration> = Some(Duration::from_secs(24 * 60 * 60)); // 24 hours
}
