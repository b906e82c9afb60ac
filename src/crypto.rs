//! Cryptographic logic.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
#[derive(Clone)]
pub struct PasswordManager {
    params: Params,
    /// Verified on login attempts against unknown emails so the response
    /// timing does not reveal whether an account exists.
    decoy_hash: String,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        let mut manager = Self {
            params,
            decoy_hash: String::default(),
        };
        manager.decoy_hash = manager.hash_password("decoy")?;

        Ok(manager)
    }

    fn argon2(&self) -> Argon2 {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash password using Argon2id.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_ref(), &salt)
            .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC string.
    pub fn verify_password(&self, password: impl AsRef<[u8]>, phc_hash: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(phc_hash).map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(self
            .argon2()
            .verify_password(password.as_ref(), &parsed)
            .is_ok())
    }

    /// Burn a verification against the decoy hash.
    pub fn verify_decoy(&self, password: impl AsRef<[u8]>) {
        let _ = self.verify_password(password, &self.decoy_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_manager() -> PasswordManager {
        // Low-cost parameters to keep tests quick.
        PasswordManager::new(Some(ArgonConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let pwd = fast_manager();
        let hash = pwd.hash_password("StRong_Pa§$W0rD").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(pwd.verify_password("StRong_Pa§$W0rD", &hash).unwrap());
        assert!(!pwd.verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let pwd = fast_manager();
        let first = pwd.hash_password("same-password").unwrap();
        let second = pwd.hash_password("same-password").unwrap();

        assert_ne!(first, second);
    }
}
