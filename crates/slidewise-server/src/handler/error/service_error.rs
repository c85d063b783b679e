//! Service error to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};
use crate::{Error as ServiceError, ErrorKind as ServiceErrorKind};

impl From<ServiceError> for HttpError<'static> {
    fn from(error: ServiceError) -> Self {
        let kind = match error.kind() {
            ServiceErrorKind::NotFound => ErrorKind::NotFound,
            ServiceErrorKind::Conflict => ErrorKind::Conflict,
            ServiceErrorKind::InvalidInput => ErrorKind::BadRequest,
            ServiceErrorKind::Auth => ErrorKind::Unauthorized,
            ServiceErrorKind::External => ErrorKind::ServiceUnavailable,
            ServiceErrorKind::Config | ServiceErrorKind::Internal => {
                tracing::error!(
                    target: "slidewise_server::handler::error",
                    error = %error,
                    "Unhandled service error"
                );
                return ErrorKind::InternalServerError.into_error();
            }
        };

        let http = kind.with_message(error.message().to_owned());
        match error.resource() {
            Some(resource) => http.with_resource(resource.to_owned()),
            None => http,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_resource() {
        let error: HttpError = ServiceError::not_found("Chunk not found")
            .with_resource("chunk")
            .into();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.message(), Some("Chunk not found"));
        assert_eq!(error.resource(), Some("chunk"));
    }

    #[test]
    fn internal_details_are_hidden() {
        let error: HttpError = ServiceError::internal("pipeline", "task panicked").into();
        assert_eq!(error.kind(), ErrorKind::InternalServerError);
        assert_eq!(error.message(), None);
    }
}
