// Copyright (c) 2025 - Cowboy AI, Inc.
//! Mapping of service errors onto HTTP responses

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, Request,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::IpamError;

/// Error body returned by every endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable kind, e.g. `pool_exhausted`
    pub error: String,
    pub message: String,
    pub retryable: bool,
}

impl IpamError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            IpamError::DeviceAlreadyBound { .. }
            | IpamError::AddressNotHeld(_)
            | IpamError::PoolExhausted { .. }
            | IpamError::DeviceAlreadyInstalled(_)
            | IpamError::UnitsOccupied { .. }
            | IpamError::DuplicateName(_)
            | IpamError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
            IpamError::InvalidCidr(_)
            | IpamError::InvalidAddress(_)
            | IpamError::InvalidUnitSpan { .. }
            | IpamError::InsufficientRackUnits { .. }
            | IpamError::PlacementMismatch(_)
            | IpamError::InvalidState(_)
            | IpamError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&IpamError> for ErrorResponse {
    fn from(err: &IpamError) -> Self {
        Self {
            error: err.kind().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<JsonRejection> for IpamError {
    fn from(rejection: JsonRejection) -> Self {
        IpamError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for IpamError {
    fn from(rejection: QueryRejection) -> Self {
        IpamError::InvalidRequest(rejection.body_text())
    }
}

/// `Json` body extractor whose rejections use the API error body
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = IpamError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl IntoResponse for IpamError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(kind = self.kind(), "Request failed: {}", self);
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
