use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    page::Page,
    ticket::{Ticket, TicketWithChanges},
    user::Profile,
};
use deployment::Deployment;
use services::services::ticket::{SearchParams, TicketPayload, TicketSummary};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    http::{auth::AuthenticatedUser, extract::ApiPath},
    middleware::load_ticket_middleware,
};

const READERS: &[Profile] = &[Profile::Customer, Profile::Technician];
const OWNERS: &[Profile] = &[Profile::Customer];

pub async fn create_ticket(
    Extension(caller): Extension<AuthenticatedUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<TicketPayload>,
) -> Result<ResponseJson<ApiResponse<Ticket>>, ApiError> {
    let actor = caller.require(OWNERS)?;
    let ticket = deployment
        .tickets()
        .create(&deployment.db().pool, actor, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(ticket)))
}

pub async fn update_ticket(
    Extension(caller): Extension<AuthenticatedUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<TicketPayload>,
) -> Result<ResponseJson<ApiResponse<Ticket>>, ApiError> {
    let actor = caller.require(OWNERS)?;
    let ticket = deployment
        .tickets()
        .update(&deployment.db().pool, actor, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(ticket)))
}

pub async fn get_ticket(
    Extension(caller): Extension<AuthenticatedUser>,
    Extension(ticket): Extension<Ticket>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<TicketWithChanges>>, ApiError> {
    let actor = caller.require(READERS)?;
    let ticket = deployment
        .tickets()
        .with_changes(&deployment.db().pool, actor, ticket)
        .await?;
    Ok(ResponseJson(ApiResponse::success(ticket)))
}

pub async fn delete_ticket(
    Extension(caller): Extension<AuthenticatedUser>,
    Extension(ticket): Extension<Ticket>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let actor = caller.require(OWNERS)?;
    deployment
        .tickets()
        .delete(&deployment.db().pool, actor, &ticket)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn list_tickets(
    Extension(caller): Extension<AuthenticatedUser>,
    State(deployment): State<DeploymentImpl>,
    ApiPath((page, count)): ApiPath<(u64, u64)>,
) -> Result<ResponseJson<ApiResponse<Page<Ticket>>>, ApiError> {
    let actor = caller.require(READERS)?;
    let tickets = deployment
        .tickets()
        .list(&deployment.db().pool, actor, page, count)
        .await?;
    Ok(ResponseJson(ApiResponse::success(tickets)))
}

type SearchPath = (u64, u64, i64, String, String, String, bool);

pub async fn search_tickets(
    Extension(caller): Extension<AuthenticatedUser>,
    State(deployment): State<DeploymentImpl>,
    ApiPath((page, count, number, title, status, priority, assigned)): ApiPath<SearchPath>,
) -> Result<ResponseJson<ApiResponse<Page<Ticket>>>, ApiError> {
    let actor = caller.require(READERS)?;
    let params = SearchParams {
        page,
        count,
        number,
        title,
        status,
        priority,
        assigned,
    };
    let tickets = deployment
        .tickets()
        .search(&deployment.db().pool, actor, &params)
        .await?;
    Ok(ResponseJson(ApiResponse::success(tickets)))
}

pub async fn change_status(
    Extension(caller): Extension<AuthenticatedUser>,
    State(deployment): State<DeploymentImpl>,
    ApiPath((ticket_id, status)): ApiPath<(Uuid, String)>,
) -> Result<ResponseJson<ApiResponse<TicketWithChanges>>, ApiError> {
    let actor = caller.require(READERS)?;
    let ticket = deployment
        .tickets()
        .change_status(&deployment.db().pool, actor, ticket_id, &status)
        .await?;
    Ok(ResponseJson(ApiResponse::success(ticket)))
}

pub async fn summary(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<TicketSummary>>, ApiError> {
    let summary = deployment.tickets().summary(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let ticket_id_router = Router::new()
        .route("/{id}", get(get_ticket).delete(delete_ticket))
        .route_layer(from_fn_with_state(
            deployment.clone(),
            load_ticket_middleware::<DeploymentImpl>,
        ));

    // `/{id}/{arg}` is shared: GET reads it as `{page}/{count}`, PUT as
    // `{id}/{status}`.
    let inner = Router::new()
        .route("/", post(create_ticket).put(update_ticket))
        .route("/summary", get(summary))
        .route("/{id}/{arg}", get(list_tickets).put(change_status))
        .route(
            "/{id}/{arg}/{number}/{title}/{status}/{priority}/{assigned}",
            get(search_tickets),
        )
        .merge(ticket_id_router);

    Router::new().nest("/ticket", inner)
}
