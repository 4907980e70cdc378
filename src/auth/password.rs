//! Password Hashing
//! Mission: Salted one-way hashing and constant-time verification with bcrypt

use anyhow::{bail, Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};

/// bcrypt only reads this many bytes of input; anything longer is refused
pub const MAX_PASSWORD_BYTES: usize = 72;

/// bcrypt wrapper carrying the configured work factor
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password. Output embeds a fresh random salt.
    ///
    /// Fails for input longer than [`MAX_PASSWORD_BYTES`].
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            bail!("Password exceeds {} bytes", MAX_PASSWORD_BYTES);
        }
        hash(plaintext, self.cost).context("Failed to hash password")
    }

    /// Check a plaintext against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; only a malformed hash is an error.
    /// Over-long input never matches, since no stored hash was made from it.
    pub fn verify(&self, plaintext: &str, password_hash: &str) -> Result<bool> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        verify(plaintext, password_hash).context("Failed to verify password")
    }

    /// [`PasswordHasher::hash`] on the blocking pool
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .context("Password hashing task failed")?
    }

    /// [`PasswordHasher::verify`] on the blocking pool
    pub async fn verify_blocking(&self, plaintext: String, password_hash: String) -> Result<bool> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &password_hash))
            .await
            .context("Password verification task failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn test_same_input_hashes_differently() {
        let hasher = fast_hasher();
        let first = hasher.hash("secret1").unwrap();
        let second = hasher.hash("secret1").unwrap();

        assert_ne!(first, second); // distinct salts
        assert!(hasher.verify("secret1", &first).unwrap());
        assert!(hasher.verify("secret1", &second).unwrap());
    }

    #[test]
    fn test_mismatch_is_not_an_error() {
        let hasher = fast_hasher();
        let stored = hasher.hash("secret1").unwrap();

        assert!(!hasher.verify("wrong", &stored).unwrap());
        assert!(!hasher.verify("", &stored).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(fast_hasher().verify("secret1", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_input_past_bcrypt_limit() {
        let hasher = fast_hasher();
        let at_limit = "a".repeat(MAX_PASSWORD_BYTES);
        let stored = hasher.hash(&at_limit).unwrap();
        assert!(hasher.verify(&at_limit, &stored).unwrap());

        // 73 bytes: bcrypt would silently drop the last one
        assert!(hasher.hash(&format!("{}X", at_limit)).is_err());
        assert!(!hasher.verify(&format!("{}Y", at_limit), &stored).unwrap());

        // Limit is bytes, not chars: 36 two-byte chars fit, 37 do not
        assert!(hasher.hash(&"é".repeat(36)).is_ok());
        assert!(hasher.hash(&"é".repeat(37)).is_err());
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(PasswordHasher::default().cost(), DEFAULT_COST);
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let hasher = fast_hasher();
        let stored = hasher.hash_blocking("secret1".to_string()).await.unwrap();

        assert!(hasher
            .verify_blocking("secret1".to_string(), stored.clone())
            .await
            .unwrap());
        assert!(!hasher
            .verify_blocking("nope".to_string(), stored)
            .await
            .unwrap());
    }
}
