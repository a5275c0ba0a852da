use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),

    #[error("no provider credentials configured (set {0})")]
    NoCredentials(String),

    #[error("invalid json")]
    InvalidJson(#[from] serde_json::Error),

    #[error("queries and categories count mismatch")]
    CountMismatch { queries: usize, categories: usize },
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            AppError::CountMismatch { .. } => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::HttpClient(_)
            | AppError::Join(_)
            | AppError::NoCredentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Outcome of a failed logical search for one batch item.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited (status {status})")]
    RateLimited { status: u16 },

    #[error("provider error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("all credentials exhausted after {attempts} attempts")]
    Exhausted { attempts: usize },

    #[error("concurrency gate unavailable: {0}")]
    Admission(String),
}

impl SearchError {
    /// Retryable errors move the search on to the next credential.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SearchError::Transport(_) | SearchError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        SearchError::Transport(e.to_string())
    }
}
