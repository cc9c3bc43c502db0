// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! API error types and response rendering.
//!
//! Two renderings share one status mapping: admin endpoints answer
//! `{"error": message}`, internal endpoints answer the tagged envelope
//! `{"type":"error","error": message}` that worker runtimes branch on.
//! Store failures with no client-facing meaning are logged in full and
//! surface as an opaque 500.

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use tarmac_types::ApiResult;

/// Admin API errors with their HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid session credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Missing or invalid internal secret.
    #[error("{0}")]
    Forbidden(String),

    /// Resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Unexpected failure; details stay server-side.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tarmac_state::Error> for ApiError {
    fn from(err: tarmac_state::Error) -> Self {
        use tarmac_state::Error as Store;
        match err {
            Store::ProjectNotFound(id) => Self::NotFound(format!("project not found: {id}")),
            Store::VersionNotFound => Self::NotFound("version not found".to_string()),
            Store::KvDatabaseNotFound(id) => {
                Self::NotFound(format!("KV database not found: {id}"))
            }
            Store::QueueNotFound(id) => Self::NotFound(format!("queue not found: {id}")),
            Store::InvalidDeploy(msg) => Self::BadRequest(msg),
            Store::InvalidRequest(msg) => Self::BadRequest(msg),
            Store::NameTaken(name) => Self::BadRequest(format!("name already in use: {name}")),
            other => {
                error!("Store error: {}", other);
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// The same errors rendered in the internal envelope shape.
#[derive(Debug)]
pub struct InternalError(pub ApiError);

impl From<ApiError> for InternalError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<tarmac_state::Error> for InternalError {
    fn from(err: tarmac_state::Error) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for InternalError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let envelope: ApiResult<()> = ApiResult::Error {
            error: self.0.to_string(),
        };
        (status, Json(envelope)).into_response()
    }
}

/// JSON body whose deserialization failures answer 400 in the admin error
/// shape instead of axum's default rejection.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// JSON body for internal endpoints; failures answer 400 in the envelope
/// shape.
pub struct InternalJson<T>(pub T);

impl<S, T> FromRequest<S> for InternalJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = InternalError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(InternalError(ApiError::BadRequest(rejection.body_text()))),
        }
    }
}
