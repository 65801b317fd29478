use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    auth::AuthService,
    config::{Config, load_config_from_file, save_config_to_file},
    ticket::TicketService,
    user::UserService,
};
use tokio::sync::RwLock;
use utils::assets::config_path;

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<RwLock<Config>>,
    db: DBService,
    auth: AuthService,
    tickets: TicketService,
    users: UserService,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Self::load_runtime_config().await?;
        let db = DBService::new().await?;
        Self::from_parts(config, db).await
    }

    fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn auth(&self) -> &AuthService {
        &self.auth
    }

    fn tickets(&self) -> &TicketService {
        &self.tickets
    }

    fn users(&self) -> &UserService {
        &self.users
    }
}

impl LocalDeployment {
    async fn load_runtime_config() -> Result<Config, DeploymentError> {
        let mut config = load_config_from_file(&config_path()).await;
        if config.ensure_jwt_secret() {
            tracing::info!("Generated a new JWT signing secret");
        }
        save_config_to_file(&config, &config_path()).await?;
        Ok(config)
    }

    /// Builds the services from an already loaded config and seeds the
    /// default administrator.
    pub async fn from_parts(config: Config, db: DBService) -> Result<Self, DeploymentError> {
        let secret = config
            .jwt
            .secret
            .clone()
            .ok_or_else(|| anyhow!("JWT secret is not configured"))?;

        let auth = AuthService::new(&secret, config.jwt.expiration_secs);
        let tickets = TicketService::new(config.pagination.max_page_size);
        let users = UserService::new(config.auth.bcrypt_cost);

        users.ensure_default_admin(&db.pool, &config.seed_admin).await?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            db,
            auth,
            tickets,
            users,
        })
    }
}
