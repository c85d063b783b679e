//! Key-value key types and traits.
//!
//! Keys are namespaced per tool: `{ns}_job.{job_id}`,
//! `{ns}_result.{job_id}.{chunk_id}`, `{ns}_deck.{job_id}`,
//! `{ns}_payload.{job_id}.{chunk_id}` and `{ns}_jobs_list`. NATS KV keys may
//! not contain `:`, so `.` separates the segments.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::Error;

/// Marker trait for KV key types.
///
/// This trait defines how keys are formatted for storage.
pub trait KvKey: fmt::Debug + fmt::Display + FromStr + Clone + Send + Sync + 'static {}

fn parse_uuid(kind: &str, s: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(s).map_err(|e| Error::operation(format!("parse_{kind}_key"), e.to_string()))
}

/// Key of a job record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub namespace: String,
    pub job_id: Uuid,
}

impl JobKey {
    /// Creates a job key.
    pub fn new(namespace: impl Into<String>, job_id: Uuid) -> Self {
        Self {
            namespace: namespace.into(),
            job_id,
        }
    }
}

impl KvKey for JobKey {}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_job.{}", self.namespace, self.job_id)
    }
}

impl FromStr for JobKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, id) = s
            .split_once("_job.")
            .ok_or_else(|| Error::operation("parse_job_key", format!("not a job key: {s}")))?;
        Ok(Self::new(namespace, parse_uuid("job", id)?))
    }
}

/// Key of one chunk's state within a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub namespace: String,
    pub job_id: Uuid,
    pub chunk_id: String,
}

impl ChunkKey {
    /// Creates a chunk key.
    pub fn new(namespace: impl Into<String>, job_id: Uuid, chunk_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            job_id,
            chunk_id: chunk_id.into(),
        }
    }

    /// Prefix shared by every chunk key of a job.
    pub fn job_prefix(namespace: &str, job_id: Uuid) -> String {
        format!("{namespace}_result.{job_id}.")
    }
}

impl KvKey for ChunkKey {}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            Self::job_prefix(&self.namespace, self.job_id),
            self.chunk_id
        )
    }
}

impl FromStr for ChunkKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::operation("parse_chunk_key", format!("not a chunk key: {s}"));
        let (namespace, rest) = s.split_once("_result.").ok_or_else(invalid)?;
        let (id, chunk_id) = rest.split_once('.').ok_or_else(invalid)?;
        if chunk_id.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(namespace, parse_uuid("chunk", id)?, chunk_id))
    }
}

/// Key of the uploaded deck of a job, kept until the run is chunked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeckKey {
    pub namespace: String,
    pub job_id: Uuid,
}

impl DeckKey {
    /// Creates a deck key.
    pub fn new(namespace: impl Into<String>, job_id: Uuid) -> Self {
        Self {
            namespace: namespace.into(),
            job_id,
        }
    }
}

impl KvKey for DeckKey {}

impl fmt::Display for DeckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_deck.{}", self.namespace, self.job_id)
    }
}

impl FromStr for DeckKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, id) = s
            .split_once("_deck.")
            .ok_or_else(|| Error::operation("parse_deck_key", format!("not a deck key: {s}")))?;
        Ok(Self::new(namespace, parse_uuid("deck", id)?))
    }
}

/// Key of the slides of one chunk.
///
/// Payloads live apart from the job record so counter updates never
/// rewrite the deck.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadKey {
    pub namespace: String,
    pub job_id: Uuid,
    pub chunk_id: String,
}

impl PayloadKey {
    /// Creates a payload key.
    pub fn new(namespace: impl Into<String>, job_id: Uuid, chunk_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            job_id,
            chunk_id: chunk_id.into(),
        }
    }

    /// Prefix shared by every payload key of a job.
    pub fn job_prefix(namespace: &str, job_id: Uuid) -> String {
        format!("{namespace}_payload.{job_id}.")
    }
}

impl KvKey for PayloadKey {}

impl fmt::Display for PayloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            Self::job_prefix(&self.namespace, self.job_id),
            self.chunk_id
        )
    }
}

impl FromStr for PayloadKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::operation("parse_payload_key", format!("not a payload key: {s}"));
        let (namespace, rest) = s.split_once("_payload.").ok_or_else(invalid)?;
        let (id, chunk_id) = rest.split_once('.').ok_or_else(invalid)?;
        if chunk_id.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(namespace, parse_uuid("payload", id)?, chunk_id))
    }
}

/// Key of the set of known job ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobsListKey {
    pub namespace: String,
}

impl JobsListKey {
    /// Creates the jobs list key of a namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl KvKey for JobsListKey {}

impl fmt::Display for JobsListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_jobs_list", self.namespace)
    }
}

impl FromStr for JobsListKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_suffix("_jobs_list")
            .map(Self::new)
            .ok_or_else(|| Error::operation("parse_jobs_list_key", format!("not a list key: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_key_layout() {
        let key = JobKey::new("wr", Uuid::nil());
        let s = key.to_string();
        assert_eq!(s, "wr_job.00000000-0000-0000-0000-000000000000");
        assert_eq!(s.parse::<JobKey>().unwrap(), key);
    }

    #[test]
    fn test_chunk_key_layout() {
        let key = ChunkKey::new("wr", Uuid::nil(), "wr_0003");
        let s = key.to_string();
        assert_eq!(s, "wr_result.00000000-0000-0000-0000-000000000000.wr_0003");
        assert!(s.starts_with(&ChunkKey::job_prefix("wr", Uuid::nil())));
        assert_eq!(s.parse::<ChunkKey>().unwrap(), key);
    }

    #[test]
    fn test_deck_and_payload_key_layout() {
        let deck = DeckKey::new("sr", Uuid::nil());
        assert_eq!(deck.to_string(), "sr_deck.00000000-0000-0000-0000-000000000000");
        assert_eq!(deck.to_string().parse::<DeckKey>().unwrap(), deck);

        let payload = PayloadKey::new("sr", Uuid::nil(), "sr_0002");
        let s = payload.to_string();
        assert_eq!(s, "sr_payload.00000000-0000-0000-0000-000000000000.sr_0002");
        assert_eq!(s.parse::<PayloadKey>().unwrap(), payload);
        assert!(s.parse::<ChunkKey>().is_err());
        assert!(s.parse::<JobKey>().is_err());
    }

    #[test]
    fn test_keys_do_not_cross_parse() {
        assert!("wr_jobs_list".parse::<JobKey>().is_err());
        assert!("wr_job.not-a-uuid".parse::<JobKey>().is_err());
        assert!(
            "wr_result.00000000-0000-0000-0000-000000000000."
                .parse::<ChunkKey>()
                .is_err()
        );
        assert_eq!(
            "wr_jobs_list".parse::<JobsListKey>().unwrap(),
            JobsListKey::new("wr")
        );
    }
}
