//! Extractors whose rejections use the JSON error envelope.

use axum::extract::{
    FromRequest, FromRequestParts, Path, Query, Request,
    rejection::{JsonRejection, PathRejection, QueryRejection},
};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::domain::{AppError, ValidationError};

/// `Json<T>` that rejects with [`AppError`] instead of a plain-text body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(Self(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
        return AppError::Deserialization(
            "Missing 'Content-Type: application/json' header".to_string(),
        );
    }

    let text = rejection.body_text();
    if let Some(field) = missing_field(&text) {
        return ValidationError::invalid(field, "is required").into();
    }
    AppError::Deserialization(text)
}

/// Pulls `name` out of serde's "missing field `name`" message.
fn missing_field(message: &str) -> Option<&str> {
    message
        .split("missing field `")
        .nth(1)
        .and_then(|rest| rest.split('`').next())
}

/// `Query<T>` that rejects with [`AppError`].
#[derive(Debug, Clone, Default)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| {
                AppError::Deserialization(rejection.body_text())
            })?;
        Ok(Self(value))
    }
}

/// `Path<T>` that rejects with [`AppError`], e.g. for ids that are not UUIDs.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| {
                AppError::Deserialization(rejection.body_text())
            })?;
        Ok(Self(value))
    }
}
