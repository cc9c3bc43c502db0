// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Boundary authentication extractors.
//!
//! Sessions are created elsewhere; this crate only validates a presented
//! credential. Admin endpoints take a [`Session`], internal endpoints take
//! an [`InternalCaller`]. Handlers that extract neither are open, so every
//! route declares its gate in its own signature.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use tarmac_state::sessions;

use crate::error::{ApiError, InternalError};
use crate::state::AppState;

pub use tarmac_types::{SECRET_HEADER, SESSION_HEADER};

/// A request authenticated by a valid, unexpired session.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    /// User owning the session.
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing auth-token header".to_string()))?;

        match sessions::authenticate(&state.pool, token).await? {
            Some(user_id) => Ok(Self { user_id }),
            None => Err(ApiError::Unauthorized(
                "invalid or expired session".to_string(),
            )),
        }
    }
}

/// A request that presented the shared internal secret.
///
/// The front door already drops internal-prefix requests without the secret;
/// this extractor re-checks it because worker runtimes reach the admin
/// socket directly, without passing the front door.
#[derive(Debug, Clone, Copy)]
pub struct InternalCaller;

impl FromRequestParts<AppState> for InternalCaller {
    type Rejection = InternalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(SECRET_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented == Some(state.secret.as_str()) {
            Ok(Self)
        } else {
            Err(InternalError(ApiError::Forbidden(
                "invalid internal secret".to_string(),
            )))
        }
    }
}
