use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::post,
};
use deployment::Deployment;
use services::services::auth::{CurrentUser, LoginRequest};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, http::auth::extract_request_token};

pub async fn login(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<CurrentUser>>, ApiError> {
    let current = deployment
        .auth()
        .login(&deployment.db().pool, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(current)))
}

pub async fn refresh(
    State(deployment): State<DeploymentImpl>,
    headers: HeaderMap,
) -> Result<ResponseJson<ApiResponse<CurrentUser>>, ApiError> {
    let token = extract_request_token(&headers).ok_or(ApiError::Unauthorized)?;
    let current = deployment
        .auth()
        .refresh(&deployment.db().pool, &token)
        .await?;
    Ok(ResponseJson(ApiResponse::success(current)))
}

/// Routes reachable without a token.
pub fn public_router() -> Router<DeploymentImpl> {
    Router::new().route("/auth", post(login))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/refresh", post(refresh))
}
