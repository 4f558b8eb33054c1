//! Request extractors whose rejections are [`ApiError`]s.
//!
//! axum's stock `Path`, `Query` and `Json` reject with plain-text bodies;
//! these wrappers keep every client error in the `{"error": ...}` shape.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use csos_core::RuleSetKind;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Rule-set kind taken from the single path parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathKind(pub RuleSetKind);

#[async_trait]
impl<S> FromRequestParts<S> for PathKind
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_input(e.body_text()))?;
        raw.parse::<RuleSetKind>().map(PathKind).map_err(ApiError::from)
    }
}

/// Query string extractor.
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ValidQuery(value))
            .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))
    }
}

/// JSON body extractor.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ValidJson(value))
            .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))
    }
}
