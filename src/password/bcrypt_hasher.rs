use super::PasswordHasher;
use crate::error::{AppError, AppResult};
use bcrypt::{hash, verify, BcryptError};

/// Cost factor used for newly hashed passwords
pub const DEFAULT_COST: u32 = 14;

/// bcrypt password hasher
///
/// Selected for any hash function name containing "blowfish". Verification
/// accepts every `$2?$` revision the stored value carries.
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new() -> Self {
        Self { cost: DEFAULT_COST }
    }

    /// Cost should be between 4 and 31. Higher values are more secure but slower.
    pub fn with_cost(cost: u32) -> AppResult<Self> {
        if !(4..=31).contains(&cost) {
            return Err(AppError::Configuration(
                "bcrypt cost must be between 4 and 31".to_string(),
            ));
        }

        Ok(Self { cost })
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Failed to hash password with bcrypt: {}", e)))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        if hash.is_empty() {
            return Ok(false);
        }

        match verify(password, hash) {
            Ok(verified) => Ok(verified),
            Err(BcryptError::InvalidHash(_))
            | Err(BcryptError::InvalidPrefix(_))
            | Err(BcryptError::InvalidCost(_))
            | Err(BcryptError::InvalidBase64(_)) => Err(AppError::MalformedHash(
                "stored value is not a bcrypt hash".to_string(),
            )),
            Err(e) => Err(AppError::Internal(format!(
                "Failed to verify bcrypt password: {}",
                e
            ))),
        }
    }
}
