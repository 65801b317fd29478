use std::sync::Arc;

use async_trait::async_trait;
use db::{DBService, DbErr};
use services::services::{
    auth::AuthService,
    config::{Config, ConfigError},
    ticket::TicketService,
    user::{UserService, UserServiceError},
};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    User(#[from] UserServiceError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Everything a request handler needs, assembled once at startup.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Arc<RwLock<Config>>;

    fn db(&self) -> &DBService;

    fn auth(&self) -> &AuthService;

    fn tickets(&self) -> &TicketService;

    fn users(&self) -> &UserService;
}
