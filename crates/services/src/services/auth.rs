use db::{
    DbErr, DbPool,
    models::user::{Profile, User},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utils_jwt::{JwtError, JwtService};

use super::user::{UserServiceError, verify_password};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid e-mail or password")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Password(#[from] UserServiceError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token plus the account it was issued for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    jwt: JwtService,
}

impl AuthService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            jwt: JwtService::new(secret, ttl_secs),
        }
    }

    fn issue_for(&self, user: User) -> Result<CurrentUser, AuthError> {
        let token = self.jwt.issue(&user.email, &user.profile.to_string())?;
        Ok(CurrentUser { token, user })
    }

    pub async fn login(
        &self,
        pool: &DbPool,
        request: &LoginRequest,
    ) -> Result<CurrentUser, AuthError> {
        let email = request.email.trim();
        if email.is_empty() || request.password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some((user, hash)) = User::find_credentials_by_email(pool, email).await? else {
            tracing::warn!(user = email, reason = "unknown_email", "Login rejected");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&request.password, &hash).await? {
            tracing::warn!(user = email, reason = "bad_password", "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::debug!(user = email, "Login succeeded");
        self.issue_for(user)
    }

    /// Resolves a token to the account it names. The profile is read from the
    /// database, so role changes apply without re-issuing tokens.
    pub async fn authenticate(&self, pool: &DbPool, token: &str) -> Result<User, AuthError> {
        let email = self.jwt.subject(token)?;
        User::find_by_email(pool, &email)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    pub async fn refresh(&self, pool: &DbPool, token: &str) -> Result<CurrentUser, AuthError> {
        if !self.jwt.can_refresh(token) {
            return Err(AuthError::Unauthorized);
        }
        let user = self.authenticate(pool, token).await?;
        self.issue_for(user)
    }
}
