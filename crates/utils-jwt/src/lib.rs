//! HS256 bearer tokens identifying a help-desk user.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User email.
    pub sub: String,
    pub profile: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn issue(&self, subject: &str, profile: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            profile: profile.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| JwtError::Signing(err.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    pub fn subject(&self, token: &str) -> Result<String, JwtError> {
        self.validate(token).map(|claims| claims.sub)
    }

    /// Only unexpired tokens with a valid signature can be refreshed.
    pub fn can_refresh(&self, token: &str) -> bool {
        self.validate(token).is_ok()
    }

    pub fn refresh(&self, token: &str) -> Result<String, JwtError> {
        let claims = self.validate(token)?;
        self.issue(&claims.sub, &claims.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_token_carries_subject_and_profile() {
        let jwt = JwtService::new(SECRET, 3600);
        let token = jwt.issue("user@helpdesk.com", "CUSTOMER").unwrap();

        let claims = jwt.validate(&token).unwrap();
        assert_eq!(claims.sub, "user@helpdesk.com");
        assert_eq!(claims.profile, "CUSTOMER");
        assert!(claims.exp > claims.iat);
        assert_eq!(jwt.subject(&token).unwrap(), "user@helpdesk.com");
    }

    #[test]
    fn expired_token_is_rejected_and_not_refreshable() {
        let jwt = JwtService::new(SECRET, -120);
        let token = jwt.issue("user@helpdesk.com", "CUSTOMER").unwrap();

        assert!(matches!(jwt.validate(&token), Err(JwtError::Expired)));
        assert!(!jwt.can_refresh(&token));
        assert!(jwt.refresh(&token).is_err());
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() {
        let issuer = JwtService::new("other-secret", 3600);
        let token = issuer.issue("user@helpdesk.com", "ADMIN").unwrap();

        let jwt = JwtService::new(SECRET, 3600);
        assert!(matches!(jwt.validate(&token), Err(JwtError::Invalid(_))));
        assert!(matches!(
            jwt.validate("not-a-token"),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn refresh_issues_a_new_token_for_the_same_user() {
        let jwt = JwtService::new(SECRET, 3600);
        let token = jwt.issue("tech@helpdesk.com", "TECHNICIAN").unwrap();

        assert!(jwt.can_refresh(&token));
        let refreshed = jwt.refresh(&token).unwrap();
        assert_ne!(refreshed, token);

        let claims = jwt.validate(&refreshed).unwrap();
        assert_eq!(claims.sub, "tech@helpdesk.com");
        assert_eq!(claims.profile, "TECHNICIAN");
    }
}
