use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("InvalidCookie: no name=value pairs in cookie header")]
    InvalidCookie,
    #[error("InvalidUrl: {0}")]
    InvalidUrl(String),
    #[error("HttpError: {0}")]
    Http(#[from] reqwest::Error),
    #[error("UnexpectedStatus: {endpoint} returned {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
    #[error("ApiError: errcode {code}: {message}")]
    Api { code: i64, message: String },
    #[error("DecodeError: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HttpError: {0}")]
    Http(#[from] reqwest::Error),
    #[error("UnexpectedStatus: {endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("DecodeError: {0}")]
    Decode(#[from] serde_json::Error),
}
