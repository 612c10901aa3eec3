use crate::error::{AppError, AppResult};
use std::str::FromStr;

/// Plain digest functions, stored as lowercase hex of the UTF-8 password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Md2,
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha512_224,
    Sha512_256,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl DigestKind {
    pub const ALL: [DigestKind; 13] = [
        DigestKind::Md2,
        DigestKind::Md5,
        DigestKind::Sha1,
        DigestKind::Sha224,
        DigestKind::Sha256,
        DigestKind::Sha384,
        DigestKind::Sha512,
        DigestKind::Sha512_224,
        DigestKind::Sha512_256,
        DigestKind::Sha3_224,
        DigestKind::Sha3_256,
        DigestKind::Sha3_384,
        DigestKind::Sha3_512,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DigestKind::Md2 => "MD2",
            DigestKind::Md5 => "MD5",
            DigestKind::Sha1 => "SHA-1",
            DigestKind::Sha224 => "SHA-224",
            DigestKind::Sha256 => "SHA-256",
            DigestKind::Sha384 => "SHA-384",
            DigestKind::Sha512 => "SHA-512",
            DigestKind::Sha512_224 => "SHA-512/224",
            DigestKind::Sha512_256 => "SHA-512/256",
            DigestKind::Sha3_224 => "SHA3-224",
            DigestKind::Sha3_256 => "SHA3-256",
            DigestKind::Sha3_384 => "SHA3-384",
            DigestKind::Sha3_512 => "SHA3-512",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argon2Variant {
    Argon2d,
    Argon2i,
    Argon2id,
}

impl Argon2Variant {
    pub fn name(&self) -> &'static str {
        match self {
            Argon2Variant::Argon2d => "Argon2d",
            Argon2Variant::Argon2i => "Argon2i",
            Argon2Variant::Argon2id => "Argon2id",
        }
    }
}

/// Password hashing algorithm configured for a directory
///
/// Resolved once from the administrator's hash function name; call sites
/// dispatch on the variant and never re-inspect the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Digest(DigestKind),
    /// bcrypt, selected by any name containing "blowfish"
    Bcrypt,
    Argon2(Argon2Variant),
    /// `PBKDF2-SHA256$<iterations>$<salt>$<base64 key>`
    Pbkdf2Sha256,
}

impl FromStr for HashAlgorithm {
    type Err = AppError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name.to_lowercase().contains("blowfish") {
            return Ok(HashAlgorithm::Bcrypt);
        }

        match name {
            "Argon2d" => return Ok(HashAlgorithm::Argon2(Argon2Variant::Argon2d)),
            "Argon2i" => return Ok(HashAlgorithm::Argon2(Argon2Variant::Argon2i)),
            "Argon2id" => return Ok(HashAlgorithm::Argon2(Argon2Variant::Argon2id)),
            pbkdf2_hasher::ALGORITHM_NAME => return Ok(HashAlgorithm::Pbkdf2Sha256),
            _ => {}
        }

        DigestKind::ALL
            .iter()
            .find(|kind| kind.name() == name)
            .map(|kind| HashAlgorithm::Digest(*kind))
            .ok_or_else(|| {
                AppError::Configuration(format!("Unsupported password hash function: {}", name))
            })
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digest(kind) => write!(f, "{}", kind.name()),
            Self::Bcrypt => write!(f, "Blowfish (bcrypt)"),
            Self::Argon2(variant) => write!(f, "{}", variant.name()),
            Self::Pbkdf2Sha256 => write!(f, "{}", pbkdf2_hasher::ALGORITHM_NAME),
        }
    }
}

/// Hash/verify contract shared by every algorithm family
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into its stored representation
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verify a plaintext password against a stored representation
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

pub mod argon2_hasher;
pub mod bcrypt_hasher;
pub mod digest_hasher;
pub mod pbkdf2_hasher;

pub use argon2_hasher::{Argon2Hasher, Argon2Settings};
pub use bcrypt_hasher::BcryptHasher;
pub use digest_hasher::DigestHasher;
pub use pbkdf2_hasher::Pbkdf2Sha256Hasher;

/// Hash engine bound to one configured algorithm
#[derive(Debug, Clone)]
pub struct HashEngine {
    algorithm: HashAlgorithm,
    bcrypt_cost: u32,
    argon2: Argon2Settings,
    pbkdf2_iterations: u32,
}

impl HashEngine {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            bcrypt_cost: bcrypt_hasher::DEFAULT_COST,
            argon2: Argon2Settings::default(),
            pbkdf2_iterations: pbkdf2_hasher::DEFAULT_ITERATIONS,
        }
    }

    /// Resolve an administrator-supplied hash function name
    pub fn from_name(name: &str) -> AppResult<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> AppResult<Self> {
        if !(4..=31).contains(&cost) {
            return Err(AppError::Configuration(
                "bcrypt cost must be between 4 and 31".to_string(),
            ));
        }
        self.bcrypt_cost = cost;
        Ok(self)
    }

    pub fn with_argon2_settings(mut self, settings: Argon2Settings) -> Self {
        self.argon2 = settings;
        self
    }

    pub fn with_pbkdf2_iterations(mut self, iterations: u32) -> AppResult<Self> {
        if iterations == 0 {
            return Err(AppError::Configuration(
                "PBKDF2 iteration count must be positive".to_string(),
            ));
        }
        self.pbkdf2_iterations = iterations;
        Ok(self)
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn hasher(&self) -> AppResult<Box<dyn PasswordHasher>> {
        Ok(match self.algorithm {
            HashAlgorithm::Digest(kind) => Box::new(DigestHasher::new(kind)),
            HashAlgorithm::Bcrypt => Box::new(BcryptHasher::with_cost(self.bcrypt_cost)?),
            HashAlgorithm::Argon2(variant) => {
                Box::new(Argon2Hasher::new(variant, self.argon2.clone())?)
            }
            HashAlgorithm::Pbkdf2Sha256 => {
                Box::new(Pbkdf2Sha256Hasher::with_iterations(self.pbkdf2_iterations))
            }
        })
    }

    /// Hash a plaintext password with the configured algorithm
    pub fn hash(&self, password: &str) -> AppResult<String> {
        self.hasher()?.hash_password(password)
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// An empty stored hash never verifies for bcrypt and Argon2. A PBKDF2
    /// value that does not have four `$`-separated fields is reported as
    /// `AppError::MalformedHash`.
    pub fn verify(&self, stored_hash: &str, password: &str) -> AppResult<bool> {
        self.hasher()?.verify_password(password, stored_hash)
    }

    /// `hash` on tokio's blocking thread pool
    pub async fn hash_blocking(&self, password: &str) -> AppResult<String> {
        let engine = self.clone();
        let password = password.to_string();
        run_blocking(move || engine.hash(&password)).await
    }

    /// `verify` on tokio's blocking thread pool
    pub async fn verify_blocking(&self, stored_hash: &str, password: &str) -> AppResult<bool> {
        let engine = self.clone();
        let stored_hash = stored_hash.to_string();
        let password = password.to_string();
        run_blocking(move || engine.verify(&stored_hash, &password)).await
    }
}

async fn run_blocking<T, F>(task: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_engine(algorithm: HashAlgorithm) -> HashEngine {
        HashEngine::new(algorithm)
            .with_bcrypt_cost(4)
            .unwrap()
            .with_argon2_settings(Argon2Settings {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            })
            .with_pbkdf2_iterations(1000)
            .unwrap()
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(
            "Blowfish (bcrypt)".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Bcrypt
        );
        assert_eq!("BLOWFISH".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Bcrypt);
        assert_eq!(
            "Argon2id".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Argon2(Argon2Variant::Argon2id)
        );
        assert_eq!(
            "PBKDF2-SHA256".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Pbkdf2Sha256
        );
        assert_eq!(
            "SHA-512/256".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Digest(DigestKind::Sha512_256)
        );
        assert_eq!(
            "SHA3-384".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Digest(DigestKind::Sha3_384)
        );
    }

    #[test]
    fn test_unknown_algorithm_is_configuration_error() {
        for name in ["sha-1", "Argon2", "PBKDF2", "CRC32", ""] {
            match name.parse::<HashAlgorithm>() {
                Err(AppError::Configuration(_)) => {}
                other => panic!("expected configuration error for {:?}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_round_trip_every_algorithm() {
        let mut algorithms: Vec<HashAlgorithm> = DigestKind::ALL
            .iter()
            .map(|kind| HashAlgorithm::Digest(*kind))
            .collect();
        algorithms.push(HashAlgorithm::Bcrypt);
        algorithms.push(HashAlgorithm::Argon2(Argon2Variant::Argon2d));
        algorithms.push(HashAlgorithm::Argon2(Argon2Variant::Argon2i));
        algorithms.push(HashAlgorithm::Argon2(Argon2Variant::Argon2id));
        algorithms.push(HashAlgorithm::Pbkdf2Sha256);

        for algorithm in algorithms {
            let engine = fast_engine(algorithm);
            let hash = engine.hash("correct horse").unwrap();
            assert!(
                engine.verify(&hash, "correct horse").unwrap(),
                "{} failed to verify its own hash",
                algorithm
            );
            assert!(
                !engine.verify(&hash, "battery staple").unwrap(),
                "{} accepted a wrong password",
                algorithm
            );
        }
    }

    #[test]
    fn test_empty_stored_hash_never_verifies() {
        for algorithm in [
            HashAlgorithm::Bcrypt,
            HashAlgorithm::Argon2(Argon2Variant::Argon2id),
            HashAlgorithm::Digest(DigestKind::Sha1),
        ] {
            assert!(!fast_engine(algorithm).verify("", "secret").unwrap());
        }
    }

    #[test]
    fn test_malformed_pbkdf2_is_surfaced() {
        let engine = fast_engine(HashAlgorithm::Pbkdf2Sha256);
        assert!(matches!(
            engine.verify("PBKDF2-SHA256$1000$salt", "secret"),
            Err(AppError::MalformedHash(_))
        ));
    }

    #[test]
    fn test_default_engine_parameters() {
        let engine = HashEngine::from_name("Argon2i").unwrap();
        assert_eq!(engine.bcrypt_cost, 14);
        assert_eq!(engine.pbkdf2_iterations, 650_000);
        assert_eq!(engine.argon2, Argon2Settings::default());
        assert!(HashEngine::from_name("whirlpool").is_err());
    }

    #[test]
    fn test_invalid_tunables() {
        let engine = HashEngine::new(HashAlgorithm::Bcrypt);
        assert!(engine.clone().with_bcrypt_cost(3).is_err());
        assert!(engine.with_pbkdf2_iterations(0).is_err());
    }

    #[tokio::test]
    async fn test_blocking_hash_keeps_runtime_responsive() {
        let engine = HashEngine::new(HashAlgorithm::Bcrypt);
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let stored = engine.hash_blocking("s3cret").await.unwrap();
        assert!(engine.verify_blocking(&stored, "s3cret").await.unwrap());
        assert!(!engine.verify_blocking(&stored, "guess").await.unwrap());
        ticker.abort();

        // three cost-14 rounds take far longer than ten ticks
        assert!(ticks.load(Ordering::SeqCst) >= 10);
    }
}
