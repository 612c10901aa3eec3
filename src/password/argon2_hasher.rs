use super::{Argon2Variant, PasswordHasher};
use crate::error::{AppError, AppResult};
use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash,
    PasswordHasher as Argon2PasswordHasher, PasswordVerifier, Version,
};

/// Cost parameters for newly hashed Argon2 passwords
///
/// Defaults follow the directory's legacy writers: 125000 KiB of memory,
/// 2 iterations, parallelism 4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argon2Settings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Settings {
    fn default() -> Self {
        Self {
            memory_kib: 125_000,
            iterations: 2,
            parallelism: 4,
        }
    }
}

/// Argon2 password hasher for the d, i and id variants
///
/// Produces and verifies PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
/// Verification takes its cost parameters from the stored string.
pub struct Argon2Hasher {
    variant: Argon2Variant,
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(variant: Argon2Variant, settings: Argon2Settings) -> AppResult<Self> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            Some(32),
        )
        .map_err(|e| AppError::Configuration(format!("Invalid Argon2 parameters: {}", e)))?;

        let argon2 = Argon2::new(Self::algorithm_for(variant), Version::V0x13, params);

        Ok(Self { variant, argon2 })
    }

    fn algorithm_for(variant: Argon2Variant) -> Algorithm {
        match variant {
            Argon2Variant::Argon2d => Algorithm::Argon2d,
            Argon2Variant::Argon2i => Algorithm::Argon2i,
            Argon2Variant::Argon2id => Algorithm::Argon2id,
        }
    }

    fn generate_salt(&self) -> SaltString {
        SaltString::generate(&mut rand::thread_rng())
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = self.generate_salt();

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                AppError::Internal(format!(
                    "Failed to hash password with {}: {}",
                    self.variant.name(),
                    e
                ))
            })?;

        Ok(password_hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        if hash.is_empty() {
            return Ok(false);
        }

        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            AppError::MalformedHash(format!("Failed to parse {} hash: {}", self.variant.name(), e))
        })?;

        // A hash written by another variant is never accepted
        if parsed_hash.algorithm != Self::algorithm_for(self.variant).ident() {
            return Ok(false);
        }

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::Internal(format!(
                "Failed to verify {} password: {}",
                self.variant.name(),
                e
            ))),
        }
    }
}
