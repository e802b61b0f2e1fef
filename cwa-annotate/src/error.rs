//! HTTP-facing error type
//!
//! Every variant renders a full HTML page: the only client is the browser UI.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use cwa_common::sheets::SheetError;
use thiserror::Error;

use crate::corpus::CorpusError;
use crate::ui;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No logged-in annotator (401)
    #[error("Not logged in: {0}")]
    Unauthorized(String),

    /// Submission for a unit that is no longer current (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Allow-list could not be read; login is impossible (503)
    #[error("Allow-list unavailable: {0}")]
    AllowListUnavailable(#[source] SheetError),

    /// Corpus file missing or unreadable (500)
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    /// Login-time ledger read failed (503)
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(#[source] SheetError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::AllowListUnavailable(_) | ApiError::LedgerUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Corpus(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Page heading shown above the error detail
    fn title(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "Du er ikke logget ind",
            ApiError::Conflict(_) => "Teksten er allerede gemt",
            ApiError::AllowListUnavailable(_) => "Kunne ikke hente listen over brugere",
            ApiError::Corpus(_) => "Datafil mangler",
            ApiError::LedgerUnavailable(_) => "Kunne ikke hente dine annotationer",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let page = ui::render_error(self.title(), &self.to_string());
        (status, Html(page)).into_response()
    }
}

/// Result type for page handlers
pub type ApiResult<T> = Result<T, ApiError>;
