use std::{fmt::Display, future::Future};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use db::{
    DBService,
    models::{ticket::Ticket, user::User},
};
use deployment::Deployment;
use uuid::Uuid;

use crate::{error::ApiError, http::extract::ApiPath};

pub trait ModelLoaderDeps {
    fn db_service(&self) -> &DBService;
}

impl<D> ModelLoaderDeps for D
where
    D: Deployment,
{
    fn db_service(&self) -> &DBService {
        self.db()
    }
}

async fn fetch_model_or_error<M, E, Fut>(
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<M, ApiError>
where
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::warn!("{model_name} {model_id} not found");
            Err(ApiError::NotFound(model_id.to_string()))
        }
        Err(error) => {
            tracing::error!("Failed to fetch {model_name} {model_id}: {error}");
            Err(ApiError::BadRequest(error.to_string()))
        }
    }
}

async fn load_request_extension<M, E, Fut>(
    request: Request,
    next: Next,
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<Response, ApiError>
where
    M: Clone + Send + Sync + 'static,
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    let model = fetch_model_or_error(model_name, model_id, load_future).await?;
    let mut request = request;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

pub async fn load_ticket_middleware<S>(
    State(deployment): State<S>,
    ApiPath(ticket_id): ApiPath<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Ticket",
        ticket_id,
        Ticket::find_by_id(&deployment.db_service().pool, ticket_id),
    )
    .await
}

pub async fn load_user_middleware<S>(
    State(deployment): State<S>,
    ApiPath(user_id): ApiPath<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "User",
        user_id,
        User::find_by_id(&deployment.db_service().pool, user_id),
    )
    .await
}
