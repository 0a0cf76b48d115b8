//! Session lifecycle: registration, sign-in, refresh rotation and logout.
//!
//! A refresh token is ISSUED when both its durable row and its fast marker
//! exist. Rotation and logout delete both; neither state can be left again.
//! A durable row past its expiry is treated as revoked on next use.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::errors::AuthError;
use super::types::TokenPair;
use crate::cache::SessionCache;
use crate::db::Database;
use crate::jwt::{AccessClaims, JwtConfig, RefreshClaims, unix_now};
use crate::password::CredentialVerifier;
use crate::session::{STORE_DEADLINE, SessionStore, with_deadline};

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    sessions: SessionStore,
    jwt: Arc<JwtConfig>,
    verifier: CredentialVerifier,
    deadline: Duration,
}

impl AuthService {
    pub fn new(
        db: Database,
        cache: Arc<dyn SessionCache>,
        jwt: Arc<JwtConfig>,
        verifier: CredentialVerifier,
    ) -> Self {
        let sessions = SessionStore::new(db.sessions(), cache);
        Self {
            db,
            sessions,
            jwt,
            verifier,
            deadline: STORE_DEADLINE,
        }
    }

    /// Override the per-operation store deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.sessions = self.sessions.with_deadline(deadline);
        self.deadline = deadline;
        self
    }

    /// Create an account. Input has already been validated by the caller.
    pub async fn register(&self, email: &str, password: &str) -> Result<i64, AuthError> {
        let password_hash = self
            .verifier
            .hash(password)
            .await
            .map_err(|e| AuthError::internal("hash password", e))?;

        match with_deadline(self.deadline, self.db.users().create(email, &password_hash)).await {
            Ok(user_id) => {
                info!(user_id, "User registered");
                Ok(user_id)
            }
            Err(e) if e.is_unique_violation() => {
                debug!("Registration rejected for an email already in use");
                Err(AuthError::Conflict)
            }
            Err(e) => Err(AuthError::internal("create user", e)),
        }
    }

    /// Check credentials and open a new session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = with_deadline(self.deadline, self.db.users().get_by_email(email))
            .await
            .map_err(|e| AuthError::internal("look up user", e))?;

        let Some(user) = user else {
            self.verifier
                .verify_dummy(password)
                .await
                .map_err(|e| AuthError::internal("verify password", e))?;
            warn!("Sign-in attempt for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let matches = self
            .verifier
            .verify(&user.password_hash, password)
            .await
            .map_err(|e| AuthError::internal("verify password", e))?;
        if !matches {
            warn!(user_id = user.id, "Sign-in attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.create_session(user.id, &user.email).await?;
        info!(user_id = user.id, "User signed in");
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair. The old token is consumed.
    pub async fn refresh_tokens(&self, old_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_refresh_token(old_token).await?;

        let session = self
            .sessions
            .find(old_token)
            .await
            .map_err(|e| AuthError::internal("load refresh session", e))?
            .ok_or(AuthError::InvalidToken)?;

        if session.user_id != claims.user_id {
            warn!(
                user_id = claims.user_id,
                session_user_id = session.user_id,
                "Refresh session owner does not match token"
            );
            return Err(AuthError::InvalidToken);
        }

        if session.is_expired(unix_now()) {
            if let Err(e) = self.sessions.consume(old_token).await {
                warn!(user_id = claims.user_id, error = %e, "Failed to delete expired refresh session");
            }
            if let Err(e) = self.sessions.unmark(claims.user_id, old_token).await {
                warn!(user_id = claims.user_id, error = %e, "Failed to clear expired session marker");
            }
            return Err(AuthError::TokenExpired);
        }

        match self.sessions.consume(old_token).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    user_id = claims.user_id,
                    "Refresh token already consumed by another request"
                );
                return Err(AuthError::TokenRevoked);
            }
            Err(e) => {
                error!(user_id = claims.user_id, error = %e, "Failed to delete old refresh session");
            }
        }

        if let Err(e) = self.sessions.unmark(claims.user_id, old_token).await {
            warn!(user_id = claims.user_id, error = %e, "Failed to clear old session marker");
        }

        let user = with_deadline(self.deadline, self.db.users().get_by_id(claims.user_id))
            .await
            .map_err(|e| AuthError::internal("look up user", e))?
            .ok_or(AuthError::NotFound)?;

        let pair = self.create_session(user.id, &user.email).await?;
        debug!(user_id = user.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Verify a refresh token's signature and expiry, then make sure its
    /// marker is still present.
    pub async fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let claims = self.jwt.validate_refresh_token(token).map_err(|e| {
            debug!(error = %e, "Refresh token rejected");
            AuthError::InvalidToken
        })?;

        let marked = self
            .sessions
            .is_marked_valid(claims.user_id, token)
            .await
            .map_err(|e| AuthError::internal("check session marker", e))?;
        if !marked {
            debug!(user_id = claims.user_id, "Refresh token has no session marker");
            return Err(AuthError::TokenRevoked);
        }

        Ok(claims)
    }

    /// End the session of one refresh token. Repeating it is harmless.
    pub async fn logout_current_session(
        &self,
        user_id: i64,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        self.sessions
            .unmark(user_id, refresh_token)
            .await
            .map_err(|e| AuthError::internal("clear session marker", e))?;
        self.sessions
            .remove(user_id, refresh_token)
            .await
            .map_err(|e| AuthError::internal("delete refresh session", e))?;

        info!(user_id, "Session logged out");
        Ok(())
    }

    /// End every session of a user. Returns how many markers were cleared.
    pub async fn logout_all_sessions(&self, user_id: i64) -> Result<u64, AuthError> {
        let revoked = self
            .sessions
            .unmark_all(user_id)
            .await
            .map_err(|e| AuthError::internal("clear session markers", e))?;
        let deleted = self
            .sessions
            .remove_all(user_id)
            .await
            .map_err(|e| AuthError::internal("delete refresh sessions", e))?;

        info!(user_id, revoked, deleted, "All sessions logged out");
        Ok(revoked)
    }

    /// Verify an access token. Never touches either session store.
    pub fn parse_access_token(&self, token: &str) -> Result<AccessClaims, AuthError> {
        parse_access_token(&self.jwt, token)
    }

    async fn create_session(&self, user_id: i64, email: &str) -> Result<TokenPair, AuthError> {
        let now = unix_now();
        let access_token = self
            .jwt
            .issue_access_token(user_id, email, now)
            .map_err(|e| AuthError::internal("sign access token", e))?;
        let refresh = self
            .jwt
            .issue_refresh_token(user_id, email, now)
            .map_err(|e| AuthError::internal("sign refresh token", e))?;

        self.sessions
            .mark_valid(user_id, &refresh.token, self.jwt.lifetimes().refresh)
            .await
            .map_err(|e| AuthError::internal("write session marker", e))?;

        if let Err(e) = self
            .sessions
            .persist(user_id, &refresh.token, refresh.expires_at, now)
            .await
        {
            if let Err(unmark_err) = self.sessions.unmark(user_id, &refresh.token).await {
                warn!(
                    user_id,
                    error = %unmark_err,
                    "Session marker left behind after failed durable write, it lapses with its TTL"
                );
            }
            return Err(AuthError::internal("persist refresh session", e));
        }

        Ok(TokenPair {
            access_token,
            refresh_token: refresh.token,
        })
    }
}

/// Verify an access token with the given key material.
pub fn parse_access_token(jwt: &JwtConfig, token: &str) -> Result<AccessClaims, AuthError> {
    jwt.validate_access_token(token).map_err(|e| {
        debug!(error = %e, "Access token rejected");
        AuthError::InvalidToken
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemorySessionCache, session_key};
    use crate::jwt::TokenLifetimes;

    async fn service() -> (AuthService, MemorySessionCache) {
        let db = Database::open(":memory:").await.unwrap();
        let cache = MemorySessionCache::new();
        let jwt = Arc::new(JwtConfig::new(
            b"unit-test-secret-key-0123456789abcdef",
            TokenLifetimes::default(),
        ));
        let verifier = CredentialVerifier::with_cost(4).unwrap();
        let service = AuthService::new(db, Arc::new(cache.clone()), jwt, verifier);
        (service, cache)
    }

    #[tokio::test]
    async fn test_register_then_sign_in() {
        let (service, cache) = service().await;
        let user_id = service.register("a@example.com", "secret1").await.unwrap();

        let pair = service.sign_in("a@example.com", "secret1").await.unwrap();
        let claims = service.parse_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.user_id, user_id);

        let key = session_key(user_id, &pair.refresh_token);
        assert_eq!(cache.check_valid(&key).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let (service, _) = service().await;
        service.register("a@example.com", "secret1").await.unwrap();

        let result = service.register("a@example.com", "secret2").await;
        assert!(matches!(result, Err(AuthError::Conflict)));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let (service, _) = service().await;
        service.register("a@example.com", "secret1").await.unwrap();

        let wrong_password = service.sign_in("a@example.com", "nope!!").await;
        let unknown_email = service.sign_in("b@example.com", "secret1").await;

        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_as_access_token() {
        let (service, _) = service().await;
        service.register("a@example.com", "secret1").await.unwrap();
        let pair = service.sign_in("a@example.com", "secret1").await.unwrap();

        let result = service.parse_access_token(&pair.refresh_token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
