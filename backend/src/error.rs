use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use shared::{ErrorKind, ErrorResponse};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Image could not be decoded: {0}")]
    Decode(String),
    #[error("Image could not be shaped for the model: {0}")]
    Shape(String),
    #[error("Upload exceeds the limit of {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Classifier unavailable: {0}")]
    ServiceUnavailable(String),
}

impl InferenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InferenceError::Decode(_) => ErrorKind::DecodeError,
            InferenceError::Shape(_) => ErrorKind::ShapeError,
            InferenceError::PayloadTooLarge(_) => ErrorKind::PayloadTooLarge,
            InferenceError::Configuration(_) => ErrorKind::ConfigurationError,
            InferenceError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
        }
    }
}

impl From<actix_web::error::BlockingError> for InferenceError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        InferenceError::ServiceUnavailable(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for InferenceError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        InferenceError::Decode(format!("Malformed multipart upload: {}", err))
    }
}

impl From<InferenceError> for std::io::Error {
    fn from(err: InferenceError) -> Self {
        std::io::Error::other(err.to_string())
    }
}

impl ResponseError for InferenceError {
    fn status_code(&self) -> StatusCode {
        match self {
            InferenceError::Decode(_) | InferenceError::Shape(_) => StatusCode::BAD_REQUEST,
            InferenceError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            InferenceError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            InferenceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}: {}", self.kind(), self);
        } else {
            log::warn!("{}: {}", self.kind(), self);
        }
        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
        })
    }
}
