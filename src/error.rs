use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::http::ErrorResponse;

/// Failures a relay turn can end with.
///
/// Each variant maps onto the HTTP status the relay endpoint replies with;
/// the `Display` text becomes the `error` field of the JSON body.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The inbound request could not be turned into a conversational turn
    #[error("{0}")]
    BadRequest(String),

    /// `isCompressed` was set but the payload did not inflate to base64 text
    #[error("Failed to decompress audio data: {0}")]
    Decompression(String),

    /// The upstream service reported an `error` event
    #[error("{0}")]
    Upstream(String),

    /// The upstream socket failed before any response was produced
    #[error("WebSocket error occurred")]
    Connection,

    /// A client event could not be encoded
    #[error("Failed to encode upstream event: {0}")]
    Encode(#[from] serde_json::Error),

    /// The session task went away without producing an outcome
    #[error("Relay session ended without a response")]
    Internal,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) | RelayError::Decompression(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream(_)
            | RelayError::Connection
            | RelayError::Encode(_)
            | RelayError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
