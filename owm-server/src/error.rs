//! Request-terminating errors.
//!
//! Provider failures are NOT represented here: they travel to the client
//! as an in-body `{status: "error", message, code}` envelope with HTTP 200.
//! This type only covers failures that end the request with a non-200
//! status and a plain-text body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use owm_core::TransformError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Neither `city` nor `coord` was supplied.
    #[error("City or coordinates cannot be undefined.")]
    MissingLocation,

    /// The provider delivered a snapshot violating its contract
    /// (missing `sun`/`lastUpdate`). Unrecoverable.
    #[error("malformed provider response: {0}")]
    Contract(#[from] TransformError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingLocation => StatusCode::BAD_REQUEST,
            Self::Contract(source) => {
                error!(%source, "provider response violated the snapshot contract");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
