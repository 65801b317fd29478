use db_migration::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use utils::assets::database_path;

pub mod entities;
pub mod models;
pub mod types;

pub use sea_orm::{DbErr, TransactionTrait};

pub type DbPool = DatabaseConnection;

const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

/// `DATABASE_URL` wins; otherwise a SQLite file inside the asset directory.
pub fn database_url() -> String {
    match std::env::var(DATABASE_URL_ENV) {
        Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => format!(
            "sqlite://{}?mode=rwc",
            database_path().to_string_lossy()
        ),
    }
}

impl DBService {
    pub async fn new() -> Result<DBService, DbErr> {
        Self::connect(&database_url()).await
    }

    pub async fn connect(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options.sqlx_logging(false);

        let pool = Database::connect(options).await?;
        Migrator::up(&pool, None).await?;
        tracing::debug!("Database migrations applied");

        Ok(DBService { pool })
    }
}
