use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{User, UserRole};

/// Shortest HS256 secret accepted for signing tokens.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid token or expired token.")]
    InvalidToken,
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

pub fn hash_password(password: &str) -> Result<String, SecurityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SecurityError::PasswordHash(e.to_string()))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: UserRole,
    iat: i64,
    exp: i64,
}

/// Identity carried by a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: UserRole,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies HS256 access tokens.
pub struct TokenService {
    secret: SecretString,
    expiry: Duration,
}

impl TokenService {
    pub fn new(secret: SecretString, expiry_minutes: i64) -> Result<Self, SecurityError> {
        if secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(SecurityError::KeyDerivation(format!(
                "JWT secret must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self {
            secret,
            expiry: Duration::minutes(expiry_minutes.max(1)),
        })
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn issue(&self, user: &User) -> Result<String, SecurityError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| SecurityError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<AuthContext, SecurityError> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data =
            decode::<Claims>(token, &key, &validation).map_err(|_| SecurityError::InvalidToken)?;
        let claims = data.claims;

        Ok(AuthContext {
            user_id: Uuid::parse_str(&claims.sub).map_err(|_| SecurityError::InvalidToken)?,
            role: claims.role,
            issued_at: DateTime::from_timestamp(claims.iat, 0).unwrap_or_default(),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum SecurityEvent {
    AuthenticationFailure {
        email: String,
        reason: String,
    },
    AuthenticationSuccess {
        user_id: Uuid,
        role: UserRole,
    },
    InvalidToken {
        reason: String,
    },
    PermissionDenied {
        user_id: Uuid,
        role: UserRole,
        required_role: UserRole,
    },
    AdminAction {
        user_id: Uuid,
        action: String,
        target: String,
    },
}

pub struct SecurityLogger;

impl SecurityLogger {
    pub fn log_event(event: SecurityEvent) {
        use tracing::{info, warn};

        match event {
            SecurityEvent::AuthenticationFailure { email, reason } => {
                warn!(email = %email, reason = %reason, "Authentication failure");
            }
            SecurityEvent::AuthenticationSuccess { user_id, role } => {
                info!(user_id = %user_id, role = %role, "Authentication success");
            }
            SecurityEvent::InvalidToken { reason } => {
                warn!(reason = %reason, "Rejected bearer token");
            }
            SecurityEvent::PermissionDenied {
                user_id,
                role,
                required_role,
            } => {
                warn!(
                    user_id = %user_id,
                    role = %role,
                    required_role = %required_role,
                    "Permission denied"
                );
            }
            SecurityEvent::AdminAction {
                user_id,
                action,
                target,
            } => {
                info!(user_id = %user_id, action = %action, target = %target, "Admin action");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            SecretString::from("an-example-secret-that-is-long-enough"),
            30,
        )
        .unwrap()
    }

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "t@example.com".into(),
            full_name: "T".into(),
            role,
            is_active: true,
            hashed_password: String::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(verify_password("s3cret!", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret!", "not-a-hash"));
    }

    #[test]
    fn token_round_trip_keeps_role() {
        let svc = service();
        let u = user(UserRole::Teacher);
        let token = svc.issue(&u).unwrap();
        let ctx = svc.verify(&token).unwrap();
        assert_eq!(ctx.user_id, u.id);
        assert_eq!(ctx.role, UserRole::Teacher);
        assert!(ctx.expires_at > ctx.issued_at);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service();
        let mut token = svc.issue(&user(UserRole::Student)).unwrap();
        token.push('x');
        assert!(matches!(svc.verify(&token), Err(SecurityError::InvalidToken)));
    }

    #[test]
    fn short_secret_is_refused() {
        assert!(TokenService::new(SecretString::from("short"), 30).is_err());
    }
}
