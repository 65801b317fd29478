use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

pub const CURRENT_CONFIG_VERSION: &str = "v1";

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@helpdesk.com";
pub const DEFAULT_ADMIN_PASSWORD_HASH: &str =
    "$2a$10$mBulBb00T5QNpRVPP8tQcOFtQC8vOWnquMGuioYLhY0e9O1ouKEam";

const JWT_SECRET_LEN: usize = 64;
const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_MAX_PAGE_SIZE: u64 = 100;
const DEFAULT_BCRYPT_COST: u32 = 10;
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

pub fn generate_jwt_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JWT_SECRET_LEN)
        .map(char::from)
        .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret: Option<String>,
    #[serde(alias = "expirationSecs", alias = "expiration")]
    pub expiration_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            expiration_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedAdminConfig {
    pub enabled: bool,
    pub email: String,
    #[serde(alias = "passwordHash")]
    pub password_hash: String,
}

impl Default for SeedAdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password_hash: DEFAULT_ADMIN_PASSWORD_HASH.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    #[serde(alias = "maxPageSize")]
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(alias = "bcryptCost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "configVersion")]
    pub config_version: String,
    pub jwt: JwtConfig,
    #[serde(alias = "seedAdmin")]
    pub seed_admin: SeedAdminConfig,
    pub pagination: PaginationConfig,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.config_version = CURRENT_CONFIG_VERSION.to_string();

        if matches!(
            self.jwt.secret.as_deref(),
            Some(secret) if secret.trim().is_empty()
        ) {
            self.jwt.secret = None;
        }

        if self.jwt.expiration_secs <= 0 {
            tracing::warn!(
                "Invalid jwt.expiration_secs {}, resetting to default",
                self.jwt.expiration_secs
            );
            self.jwt.expiration_secs = DEFAULT_TOKEN_TTL_SECS;
        }

        if self.pagination.max_page_size == 0 {
            self.pagination.max_page_size = DEFAULT_MAX_PAGE_SIZE;
        }

        self.auth.bcrypt_cost = self.auth.bcrypt_cost.clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST);

        self.seed_admin.email = self.seed_admin.email.trim().to_string();
        if self.seed_admin.email.is_empty() {
            self.seed_admin.email = DEFAULT_ADMIN_EMAIL.to_string();
        }
        if self.seed_admin.password_hash.trim().is_empty() {
            self.seed_admin.password_hash = DEFAULT_ADMIN_PASSWORD_HASH.to_string();
        }

        self
    }

    /// Fills in a signing secret when none is configured. Returns `true` when
    /// the config changed and should be persisted.
    pub fn ensure_jwt_secret(&mut self) -> bool {
        if self.jwt.secret.is_some() {
            return false;
        }
        self.jwt.secret = Some(generate_jwt_secret());
        true
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION.to_string(),
            jwt: JwtConfig::default(),
            seed_admin: SeedAdminConfig::default(),
            pagination: PaginationConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_empty_config() {
        let config = Config::from_raw("{}");

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert!(config.jwt.secret.is_none());
        assert_eq!(config.jwt.expiration_secs, 604_800);
        assert_eq!(config.pagination.max_page_size, 100);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert!(config.seed_admin.enabled);
        assert_eq!(config.seed_admin.email, DEFAULT_ADMIN_EMAIL);
    }

    #[test]
    fn invalid_json_falls_back_to_default() {
        let config = Config::from_raw("{invalid json");

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.seed_admin.password_hash, DEFAULT_ADMIN_PASSWORD_HASH);
    }

    #[test]
    fn aliases_and_normalization_are_applied() {
        let raw = r#"{
            "configVersion": "v0",
            "jwt": { "secret": "   ", "expirationSecs": -5 },
            "seedAdmin": { "email": " root@helpdesk.com ", "passwordHash": "" },
            "pagination": { "maxPageSize": 0 },
            "auth": { "bcryptCost": 99 }
        }"#;

        let config = Config::from_raw(raw);

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert!(config.jwt.secret.is_none());
        assert_eq!(config.jwt.expiration_secs, 604_800);
        assert_eq!(config.seed_admin.email, "root@helpdesk.com");
        assert_eq!(config.seed_admin.password_hash, DEFAULT_ADMIN_PASSWORD_HASH);
        assert_eq!(config.pagination.max_page_size, 100);
        assert_eq!(config.auth.bcrypt_cost, 31);
    }

    #[test]
    fn missing_secret_is_generated_once() {
        let mut config = Config::default();

        assert!(config.ensure_jwt_secret());
        let secret = config.jwt.secret.clone().unwrap();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));

        assert!(!config.ensure_jwt_secret());
        assert_eq!(config.jwt.secret.as_deref(), Some(secret.as_str()));
    }
}
