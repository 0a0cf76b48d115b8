//! Password hashing and verification (bcrypt).

use bcrypt::DEFAULT_COST;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hashes passwords at registration and checks them at sign-in.
#[derive(Clone)]
pub struct CredentialVerifier {
    cost: u32,
    /// Verified against when the email is unknown, so that path costs one bcrypt check too.
    dummy_hash: String,
}

impl CredentialVerifier {
    /// Verifier using bcrypt's default cost.
    pub fn new() -> Result<Self, PasswordError> {
        Self::with_cost(DEFAULT_COST)
    }

    /// Verifier with an explicit cost. Lower costs are only meant for tests.
    pub fn with_cost(cost: u32) -> Result<Self, PasswordError> {
        let dummy_hash = bcrypt::hash("fintrack-dummy-password", cost)?;
        Ok(Self { cost, dummy_hash })
    }

    /// Hash a password for storage.
    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password = password.to_string();
        let cost = self.cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hash)
    }

    /// Check a candidate password against a stored hash.
    /// A malformed stored hash never matches.
    pub async fn verify(&self, stored_hash: &str, candidate: &str) -> Result<bool, PasswordError> {
        let stored_hash = stored_hash.to_string();
        let candidate = candidate.to_string();
        let matches = tokio::task::spawn_blocking(move || {
            bcrypt::verify(candidate, &stored_hash).unwrap_or(false)
        })
        .await?;
        Ok(matches)
    }

    /// Burn one verification for a sign-in attempt against an unknown email.
    pub async fn verify_dummy(&self, candidate: &str) -> Result<(), PasswordError> {
        self.verify(&self.dummy_hash, candidate).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::with_cost(4).unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let verifier = verifier();
        let hash = verifier.hash("secret1").await.unwrap();

        assert_ne!(hash, "secret1");
        assert!(verifier.verify(&hash, "secret1").await.unwrap());
        assert!(!verifier.verify(&hash, "secret2").await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_hashes_differ() {
        let verifier = verifier();
        let first = verifier.hash("secret1").await.unwrap();
        let second = verifier.hash("secret1").await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_malformed_hash_does_not_match() {
        let verifier = verifier();
        assert!(!verifier.verify("not-a-bcrypt-hash", "secret1").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_dummy() {
        assert!(verifier().verify_dummy("anything").await.is_ok());
    }
}
