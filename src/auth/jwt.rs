//! JWT token handling

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::models::{Identity, Role};
use crate::config::AuthConfig;
use crate::error::{Error, Result};

/// Default token lifetime
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Longest accepted token lifetime
pub const MAX_TTL_DAYS: i64 = 365;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i32,
    pub email: String,
    /// Unknown role strings fail deserialization, and with it verification
    pub role: Role,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Issues and verifies signed identity tokens with a process-wide secret
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service. An empty secret is a configuration error.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self> {
        if secret.trim().is_empty() {
            return Err(Error::Config("JWT secret must not be empty".to_string()));
        }
        if ttl <= Duration::zero() {
            return Err(Error::Config("Token lifetime must be positive".to_string()));
        }
        if ttl > Duration::days(MAX_TTL_DAYS) {
            return Err(Error::Config(format!(
                "Token lifetime must be at most {} days",
                MAX_TTL_DAYS
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    /// Build from configuration, refusing to start without a secret
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let secret = config.signing_secret().ok_or_else(|| {
            Error::Config(
                "JWT secret is not configured. Set auth.jwt_secret or the JWT_SECRET environment variable"
                    .to_string(),
            )
        })?;
        let ttl = Duration::try_days(config.token_ttl_days).ok_or_else(|| {
            Error::Config(format!(
                "auth.token_ttl_days is out of range: {}",
                config.token_ttl_days
            ))
        })?;
        Self::new(secret, ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token that expires one lifetime from now
    pub fn issue(&self, user_id: i32, email: &str, role: Role) -> Result<String> {
        self.issue_at(user_id, email, role, Utc::now())
    }

    /// Issue a token as if it were created at `issued_at`
    pub fn issue_at(
        &self,
        user_id: i32,
        email: &str,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::Other("Token expiry is out of range".to_string()))?;
        let claims = Claims {
            user_id,
            email: email.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verify signature, structure and expiry.
    ///
    /// Every failure maps to `None`; callers cannot tell an expired token
    /// from a forged one.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("Rejected token: {}", e);
                None
            }
        }
    }
}
