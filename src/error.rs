use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::attendance::scanner::Notification;

/// Failure of a single call to the remote store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Non-2xx answer. `message` is the store's own message when it sent one.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("failed to build http client: {0}")]
    Client(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// A scan could not be turned into a check-in or a check-out.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("member id must not be empty")]
    InvalidMemberId,

    #[error("check-in failed: {check_in}; check-out failed: {check_out}")]
    BothFailed {
        check_in: ApiError,
        check_out: ApiError,
    },

    #[error("status lookup failed: {0}")]
    StatusLookup(ApiError),

    #[error("check-in failed: {0}")]
    CheckIn(ApiError),

    #[error("check-out failed: {0}")]
    CheckOut(ApiError),
}

impl ResponseError for ReconcileError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReconcileError::InvalidMemberId => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "notification": Notification::error(self.to_string())
        }))
    }
}

/// Failure of the desk workflow: scan dialog plus reconciliation.
#[derive(Debug, Error)]
pub enum ScanFlowError {
    #[error("scanner is already reading a card")]
    Busy,

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl ResponseError for ScanFlowError {
    fn status_code(&self) -> StatusCode {
        match self {
            ScanFlowError::Busy => StatusCode::CONFLICT,
            ScanFlowError::Reconcile(e) => e.status_code(),
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ScanFlowError::Busy => HttpResponse::Conflict().json(serde_json::json!({
                "notification": Notification::error(self.to_string())
            })),
            ScanFlowError::Reconcile(e) => e.error_response(),
        }
    }
}

/// Listing records or stats failed. Rendered as an inline banner, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("could not load attendance records: {0}")]
    Records(ApiError),

    #[error("could not load attendance stats: {0}")]
    Stats(ApiError),
}
