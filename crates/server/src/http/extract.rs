use axum::extract::FromRequestParts;

use crate::error::ApiError;

/// [`axum::extract::Path`] whose rejection is rendered as an [`ApiError`]
/// envelope instead of plain text.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
