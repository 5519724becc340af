//! JWT authentication module.
//!
//! Handles password hashing, token issue / validation, and the
//! [`AuthUser`] extractor every protected handler takes.
//!
//! ```text
//!   POST /api/auth/login {email, password}
//!        │  argon2 verify against users.password_hash
//!        ▼
//!   JWT (HS256, sub = user id)  ──►  Authorization: Bearer <token>
//!                                          │
//!                          AuthUser extractor: decode, reload user
//!                                          │
//!                             handler: user.require_admin()?
//! ```
//!
//! The user is reloaded on every request, so a deleted or demoted account
//! loses access immediately rather than when its token expires.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use haze_core::{ManagedUser, Role};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

// =============================================================================
// Passwords
// =============================================================================

// Argon2 is CPU-bound; both entry points run it on tokio's blocking pool.

/// Hashes a password into an Argon2id PHC string.
pub async fn hash_password(password: &str) -> Result<String, ApiError> {
    let password = password.to_owned();
    task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| ApiError::internal(format!("Password hashing task failed: {}", e)))?
}

/// Checks a password against a stored PHC string.
pub async fn verify_password(password: &str, stored_hash: &str) -> bool {
    let password = password.to_owned();
    let stored_hash = stored_hash.to_owned();
    match task::spawn_blocking(move || verify_password_blocking(&password, &stored_hash)).await {
        Ok(matches) => matches,
        Err(e) => {
            error!(error = %e, "Password verification task failed");
            false
        }
    }
}

fn hash_password_blocking(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
}

fn verify_password_blocking(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Display name at issue time
    pub name: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Issues a token for a user.
    pub fn issue(&self, user: &ManagedUser) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validates and decodes a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!(error = %e, "Rejected token");
            ApiError::unauthorized("Invalid or expired token")
        })?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    /// Fails with 403 unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            warn!(user = %self.name, "Staff user attempted an admin action");
            Err(ApiError::forbidden("This action requires an admin account"))
        }
    }
}

impl From<&ManagedUser> for AuthUser {
    fn from(user: &ManagedUser) -> Self {
        AuthUser {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Expected a Bearer token"))?;

        let claims = state.jwt.validate(token)?;

        let user = state
            .db
            .users()
            .get_by_id(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

        Ok(AuthUser::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> ManagedUser {
        let now = Utc::now();
        ManagedUser {
            id: "u-1".to_string(),
            name: "Nadia".to_string(),
            email: "nadia@shop.test".to_string(),
            phone: None,
            role,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_password_hash_roundtrip() {
        let hash = hash_password("correct-horse").await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("correct-horse"));
        assert!(verify_password("correct-horse", &hash).await);
        assert!(!verify_password("wrong-horse", &hash).await);
        assert!(!verify_password("correct-horse", "not-a-hash").await);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_leaves_the_runtime_responsive() {
        let hashing = hash_password("correct-horse");
        tokio::pin!(hashing);
        let ticker = tokio::spawn(async {
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
        });

        // One runtime thread: the ticker only gets to finish first if
        // argon2 is running somewhere else.
        tokio::select! {
            biased;
            _ = &mut hashing => panic!("hash completed before the runtime could run other tasks"),
            done = ticker => done.unwrap(),
        }
        assert!(hashing.await.unwrap().starts_with("$argon2"));
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);
        let token = manager.issue(&user(Role::Admin)).unwrap();

        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a".to_string(), 3600);
        let verifier = JwtManager::new("secret-b".to_string(), 3600);
        let token = issuer.issue(&user(Role::Staff)).unwrap();
        assert!(verifier.validate(&token).is_err());
    }

    #[test]
    fn test_bearer_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn test_require_admin() {
        assert!(AuthUser::from(&user(Role::Admin)).require_admin().is_ok());
        let err = AuthUser::from(&user(Role::Staff)).require_admin().unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
