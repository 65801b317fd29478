use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    page::Page,
    user::{Profile, User},
};
use deployment::Deployment;
use services::services::user::UserPayload;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    http::{auth::AuthenticatedUser, extract::ApiPath},
    middleware::load_user_middleware,
};

const ADMINS: &[Profile] = &[Profile::Admin];

pub async fn create_user(
    Extension(caller): Extension<AuthenticatedUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UserPayload>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    caller.require(ADMINS)?;
    let user = deployment
        .users()
        .create(&deployment.db().pool, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn update_user(
    Extension(caller): Extension<AuthenticatedUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UserPayload>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    caller.require(ADMINS)?;
    let user = deployment
        .users()
        .update(&deployment.db().pool, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn get_user(
    Extension(caller): Extension<AuthenticatedUser>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    caller.require(ADMINS)?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn delete_user(
    Extension(caller): Extension<AuthenticatedUser>,
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    caller.require(ADMINS)?;
    deployment
        .users()
        .delete(&deployment.db().pool, user.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn list_users(
    Extension(caller): Extension<AuthenticatedUser>,
    State(deployment): State<DeploymentImpl>,
    ApiPath((page, count)): ApiPath<(u64, u64)>,
) -> Result<ResponseJson<ApiResponse<Page<User>>>, ApiError> {
    caller.require(ADMINS)?;
    let max_page_size = deployment.config().read().await.pagination.max_page_size;
    let users = deployment
        .users()
        .list(
            &deployment.db().pool,
            page,
            count.clamp(1, max_page_size.max(1)),
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let user_id_router = Router::new()
        .route("/{id}", get(get_user).delete(delete_user))
        .route_layer(from_fn_with_state(
            deployment.clone(),
            load_user_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", post(create_user).put(update_user))
        .route("/{id}/{arg}", get(list_users))
        .merge(user_id_router);

    Router::new().nest("/user", inner)
}
