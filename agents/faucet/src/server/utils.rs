//! Response types shared by the handlers

use axum::{http::StatusCode, response::IntoResponse, Json};
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Result of a handler. Both sides are sent as JSON.
pub type ServerResult<T, E = ResponseErrorBody> =
    Result<ServerSuccessResponse<T>, ServerErrorResponse<E>>;

/// Body of a failed request
#[derive(Clone, Debug, Deserialize, Serialize, new)]
pub struct ResponseErrorBody {
    /// What went wrong
    pub message: String,
}

/// A `200 OK` with a JSON body
#[derive(Debug, new)]
pub struct ServerSuccessResponse<T> {
    /// Response payload
    pub body: T,
}

impl<T: Serialize> IntoResponse for ServerSuccessResponse<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self.body)).into_response()
    }
}

/// Any other status with a JSON body
#[derive(Debug, new)]
pub struct ServerErrorResponse<E> {
    /// Response status
    pub status: StatusCode,
    /// Response payload
    pub body: E,
}

impl ServerErrorResponse<ResponseErrorBody> {
    /// `400 Bad Request` with a message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ResponseErrorBody::new(message.into()),
        )
    }
}

impl<E: Serialize> IntoResponse for ServerErrorResponse<E> {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}
