use db::{
    DbErr, DbPool,
    models::{
        page::{Page, checked_offset},
        user::{CreateUser, Profile, UpdateUser, User, UserError},
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::config::SeedAdminConfig;

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Password hashing task failed: {0}")]
    HashTask(#[from] tokio::task::JoinError),
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Register not found id: {0}")]
    NotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, UserServiceError>;

/// Body of `POST`/`PUT /api/user`. Every field is optional on the wire so
/// that missing values surface as validation messages instead of a
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile: Option<Profile>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn validate_email(email: &str, errors: &mut Vec<String>) {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        errors.push("Invalid e-mail".to_string());
    }
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// `false` for a malformed stored hash as well as for a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    match verified {
        Ok(matches) => Ok(matches),
        Err(err) => {
            tracing::warn!(error = %err, "Stored password hash could not be verified");
            Ok(false)
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(bcrypt_cost: u32) -> Self {
        Self { bcrypt_cost }
    }

    pub async fn find_by_id(&self, pool: &DbPool, id: Uuid) -> Result<User> {
        User::find_by_id(pool, id)
            .await?
            .ok_or(UserServiceError::NotFound(id))
    }

    pub async fn list(&self, pool: &DbPool, page: u64, count: u64) -> Result<Page<User>> {
        if checked_offset(page, count).is_none() {
            return Err(UserServiceError::Validation(vec!["Invalid page".to_string()]));
        }
        Ok(User::find_page(pool, page, count).await?)
    }

    pub async fn create(&self, pool: &DbPool, payload: &UserPayload) -> Result<User> {
        let mut errors = Vec::new();
        let email = non_blank(payload.email.as_deref());
        let password = non_blank(payload.password.as_deref());
        match email {
            Some(email) => validate_email(email, &mut errors),
            None => errors.push("Email no information".to_string()),
        }
        if password.is_none() {
            errors.push("Password no information".to_string());
        }
        if payload.profile.is_none() {
            errors.push("Profile no information".to_string());
        }
        let (Some(email), Some(password), Some(profile), true) =
            (email, password, payload.profile, errors.is_empty())
        else {
            return Err(UserServiceError::Validation(errors));
        };

        let password_hash = hash_password(password, self.bcrypt_cost).await?;
        let user = User::create(
            pool,
            &CreateUser {
                email: email.to_string(),
                password_hash,
                profile,
            },
        )
        .await?;

        tracing::info!(user = %user.email, profile = %user.profile, "User created");
        Ok(user)
    }

    pub async fn update(&self, pool: &DbPool, payload: &UserPayload) -> Result<User> {
        let Some(id) = payload.id else {
            return Err(UserServiceError::Validation(vec![
                "Id no information".to_string(),
            ]));
        };

        let email = non_blank(payload.email.as_deref());
        if let Some(email) = email {
            let mut errors = Vec::new();
            validate_email(email, &mut errors);
            if !errors.is_empty() {
                return Err(UserServiceError::Validation(errors));
            }
        }

        let password_hash = match non_blank(payload.password.as_deref()) {
            Some(password) => Some(hash_password(password, self.bcrypt_cost).await?),
            None => None,
        };

        let update = UpdateUser {
            email: email.map(str::to_string),
            password_hash,
            profile: payload.profile,
        };
        match User::update(pool, id, &update).await {
            Ok(user) => Ok(user),
            Err(UserError::NotFound) => Err(UserServiceError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Accounts that own tickets or wrote status changes are kept so the audit
    /// trail stays intact.
    pub async fn delete(&self, pool: &DbPool, id: Uuid) -> Result<()> {
        if User::has_history(pool, id).await? {
            return Err(UserServiceError::Validation(vec![
                "User has tickets or status history".to_string(),
            ]));
        }
        if User::delete(pool, id).await? == 0 {
            return Err(UserServiceError::NotFound(id));
        }
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Creates the configured administrator when no account uses its e-mail.
    /// Returns the created user, or `None` when nothing had to be done.
    pub async fn ensure_default_admin(
        &self,
        pool: &DbPool,
        seed: &SeedAdminConfig,
    ) -> Result<Option<User>> {
        if !seed.enabled {
            return Ok(None);
        }
        if User::find_by_email(pool, &seed.email).await?.is_some() {
            return Ok(None);
        }

        let admin = User::create(
            pool,
            &CreateUser {
                email: seed.email.clone(),
                password_hash: seed.password_hash.clone(),
                profile: Profile::Admin,
            },
        )
        .await?;
        tracing::info!(user = %admin.email, "Seeded default admin");
        Ok(Some(admin))
    }
}
