//! Error types for the document Q&A pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Empty document: {0}")]
    EmptyDocument(String),

    #[error("Failed to decode '{filename}': {message}")]
    Decode { filename: String, message: String },

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("The index contains no entries")]
    EmptyIndex,

    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    #[error("No relevant context found in the index")]
    NoContext,

    #[error("Generation service error: {0}")]
    Generation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn unsupported_format(what: impl Into<String>) -> Self {
        Self::UnsupportedFormat(what.into())
    }

    pub fn empty_document(what: impl Into<String>) -> Self {
        Self::EmptyDocument(what.into())
    }

    pub fn decode(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            filename: filename.into(),
            message: message.into(),
        }
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn index_corruption(message: impl Into<String>) -> Self {
        Self::IndexCorruption(message.into())
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::UnsupportedFormat(_) => {
                (StatusCode::BAD_REQUEST, "unsupported_format", self.to_string())
            }
            Error::EmptyDocument(_) => (StatusCode::BAD_REQUEST, "empty_document", self.to_string()),
            Error::Decode { .. } => (StatusCode::BAD_REQUEST, "decode_error", self.to_string()),
            Error::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_error", self.to_string()),
            Error::Configuration(_) => {
                (StatusCode::BAD_REQUEST, "configuration_error", self.to_string())
            }
            Error::EmptyIndex => (StatusCode::NOT_FOUND, "empty_index", self.to_string()),
            Error::IndexCorruption(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "index_corruption",
                self.to_string(),
            ),
            Error::NoContext => (StatusCode::NOT_FOUND, "no_context", self.to_string()),
            Error::Generation(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "generation_error", self.to_string())
            }
            Error::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request", self.to_string())
            }
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error", self.to_string()),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error", self.to_string()),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error", self.to_string()),
            Error::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", self.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        for err in [
            Error::unsupported_format("report.xyz"),
            Error::empty_document("blank.txt"),
            Error::decode("broken.pdf", "bad xref"),
            Error::invalid_request("question must not be empty"),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn upstream_failures_map_to_gateway_codes() {
        assert_eq!(
            Error::embedding("HTTP 500").into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::generation("HTTP 500").into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn corruption_is_a_server_error() {
        let status = Error::index_corruption("build id mismatch")
            .into_response()
            .status();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn display_includes_the_offending_file() {
        let err = Error::decode("broken.pdf", "unreadable trailer");
        assert!(err.to_string().contains("broken.pdf"));
        assert!(err.to_string().contains("unreadable trailer"));
    }
}
