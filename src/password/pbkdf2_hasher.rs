use super::PasswordHasher;
use crate::error::{AppError, AppResult};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use sha2::Sha256;

pub const ALGORITHM_NAME: &str = "PBKDF2-SHA256";
pub const DEFAULT_ITERATIONS: u32 = 650_000;

const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;

/// PBKDF2-HMAC-SHA256 password hasher
///
/// Stored format: `PBKDF2-SHA256$<iterations>$<salt>$<base64 key>`. The salt
/// field is used as-is: its UTF-8 bytes are the KDF salt.
pub struct Pbkdf2Sha256Hasher {
    iterations: u32,
}

/// Fields of a stored PBKDF2 value
#[derive(Debug, PartialEq, Eq)]
pub struct Pbkdf2Components<'a> {
    pub iterations: u32,
    pub salt: &'a str,
    pub key: &'a str,
}

impl Pbkdf2Sha256Hasher {
    pub fn new() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }

    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Derive the Base64 key for a password, salt and iteration count
    pub fn derive_key(password: &str, salt: &[u8], iterations: u32) -> String {
        let mut key = [0u8; KEY_LENGTH];
        pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
        general_purpose::STANDARD.encode(key)
    }

    /// Split a stored value into its fields
    pub fn parse(hash: &str) -> AppResult<Pbkdf2Components<'_>> {
        let fields: Vec<&str> = hash.split('$').collect();
        if fields.len() != 4 {
            return Err(AppError::MalformedHash(format!(
                "{} value must have 4 '$'-separated fields, found {}",
                ALGORITHM_NAME,
                fields.len()
            )));
        }

        let iterations = fields[1].parse::<u32>().map_err(|_| {
            AppError::MalformedHash(format!(
                "{} iteration count is not a number: {}",
                ALGORITHM_NAME, fields[1]
            ))
        })?;
        if iterations == 0 {
            return Err(AppError::MalformedHash(format!(
                "{} iteration count must be positive",
                ALGORITHM_NAME
            )));
        }

        Ok(Pbkdf2Components {
            iterations,
            salt: fields[2],
            key: fields[3],
        })
    }

    fn generate_salt(&self) -> String {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        general_purpose::STANDARD.encode(salt)
    }
}

impl Default for Pbkdf2Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Pbkdf2Sha256Hasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = self.generate_salt();
        let key = Self::derive_key(password, salt.as_bytes(), self.iterations);
        Ok(format!(
            "{}${}${}${}",
            ALGORITHM_NAME, self.iterations, salt, key
        ))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let components = Self::parse(hash)?;
        let derived = Self::derive_key(password, components.salt.as_bytes(), components.iterations);
        // Plain string equality, matching existing stored-hash consumers
        Ok(derived == components.key)
    }
}
