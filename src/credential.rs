//! Delete-password hashing.
//!
//! Passwords are hashed with Argon2id into PHC strings; the salt and cost
//! parameters travel inside the stored hash, so verification never needs the
//! codec's own parameters.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CredentialError {
    #[error("password must not be empty")]
    Empty,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
}

#[derive(Clone, Debug)]
pub struct CredentialCodec {
    params: Params,
}

impl Default for CredentialCodec {
    fn default() -> Self {
        Self { params: Params::default() }
    }
}

impl CredentialCodec {
    /// `m_cost` in KiB, `t_cost` iterations, `p_cost` lanes.
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, CredentialError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| CredentialError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    /// Cheapest parameters argon2 accepts. Only meant for tests.
    pub fn insecure_fast() -> Self {
        Self {
            params: Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
                .unwrap_or_default(),
        }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        if plaintext.is_empty() {
            return Err(CredentialError::Empty);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// False on mismatch, on empty input and on a malformed stored hash.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        if plaintext.is_empty() {
            return false;
        }
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
