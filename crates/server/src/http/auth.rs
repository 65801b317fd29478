use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use db::models::user::{Profile, User};
use deployment::Deployment;

use crate::{DeploymentImpl, error::ApiError};

/// The caller resolved from the request token, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    /// Rejects callers whose profile is not in `allowed` with 403.
    pub fn require(&self, allowed: &[Profile]) -> Result<&User, ApiError> {
        if self.0.has_profile(allowed) {
            Ok(&self.0)
        } else {
            tracing::warn!(
                user = %self.0.email,
                profile = %self.0.profile,
                reason = "profile_not_allowed",
                "Forbidden API request"
            );
            Err(ApiError::Forbidden("Access denied".to_string()))
        }
    }
}

/// Accepts `Bearer <token>` as well as a bare token.
fn parse_authorization(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let token = match trimmed.split_once(' ') {
        Some((prefix, rest)) if prefix.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None => trimmed,
    };
    if token.is_empty() || token.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

pub fn extract_request_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization)
        .map(str::to_string)
}

pub async fn require_api_auth(
    State(deployment): State<DeploymentImpl>,
    mut req: Request,
    next: Next,
) -> Response {
    let presented = extract_request_token(req.headers());
    let user = match presented.as_deref() {
        Some(token) => deployment
            .auth()
            .authenticate(&deployment.db().pool, token)
            .await
            .map_err(|err| err.to_string()),
        None => Err("missing_token".to_string()),
    };

    match user {
        Ok(user) => {
            req.extensions_mut().insert(AuthenticatedUser(user));
            next.run(req).await
        }
        Err(reason) => {
            tracing::warn!(
                path = %req.uri().path(),
                method = %req.method(),
                reason = %reason,
                "Unauthorized API request"
            );
            ApiError::Unauthorized.into_response()
        }
    }
}
