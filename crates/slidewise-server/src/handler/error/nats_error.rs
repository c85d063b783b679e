//! Storage error to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};

impl From<slidewise_nats::Error> for HttpError<'static> {
    fn from(error: slidewise_nats::Error) -> Self {
        use slidewise_nats::Error as NatsError;

        match error {
            NatsError::Connection(_) => ErrorKind::ServiceUnavailable
                .with_message("Job storage is temporarily unavailable")
                .with_context("Unable to reach the storage server"),

            NatsError::Timeout { timeout } => ErrorKind::ServiceUnavailable
                .with_message("Job storage did not answer in time")
                .with_context(format!("Timed out after {}s", timeout.as_secs())),

            NatsError::Serialization(error) => ErrorKind::InternalServerError
                .with_message("Stored record could not be read")
                .with_context(error.to_string()),

            NatsError::KvKeyNotFound { key, .. } => ErrorKind::NotFound
                .with_message("Record not found")
                .with_context(key),

            NatsError::KvRevisionMismatch { key, .. } | NatsError::Contended { key, .. } => {
                ErrorKind::Conflict
                    .with_message("The record was modified concurrently, please retry")
                    .with_context(key)
            }

            NatsError::InvalidConfig { reason } => ErrorKind::InternalServerError
                .with_message("Job storage is misconfigured")
                .with_context(reason),

            NatsError::Operation { operation, details } => ErrorKind::InternalServerError
                .with_message("Job storage operation failed")
                .with_context(format!("{operation}: {details}")),
        }
    }
}
