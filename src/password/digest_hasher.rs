use super::{DigestKind, PasswordHasher};
use crate::error::AppResult;
use sha2::Digest;

/// Unsalted digest hasher: lowercase hex of the digest of the UTF-8 password
///
/// Only meant for reading legacy tables; every call hashes the same input to
/// the same output.
pub struct DigestHasher {
    kind: DigestKind,
}

impl DigestHasher {
    pub fn new(kind: DigestKind) -> Self {
        Self { kind }
    }

    fn hex_digest<D: Digest>(password: &str) -> String {
        hex::encode(D::digest(password.as_bytes()))
    }

    pub fn digest_hex(&self, password: &str) -> String {
        match self.kind {
            DigestKind::Md2 => Self::hex_digest::<md2::Md2>(password),
            DigestKind::Md5 => Self::hex_digest::<md5::Md5>(password),
            DigestKind::Sha1 => Self::hex_digest::<sha1::Sha1>(password),
            DigestKind::Sha224 => Self::hex_digest::<sha2::Sha224>(password),
            DigestKind::Sha256 => Self::hex_digest::<sha2::Sha256>(password),
            DigestKind::Sha384 => Self::hex_digest::<sha2::Sha384>(password),
            DigestKind::Sha512 => Self::hex_digest::<sha2::Sha512>(password),
            DigestKind::Sha512_224 => Self::hex_digest::<sha2::Sha512_224>(password),
            DigestKind::Sha512_256 => Self::hex_digest::<sha2::Sha512_256>(password),
            DigestKind::Sha3_224 => Self::hex_digest::<sha3::Sha3_224>(password),
            DigestKind::Sha3_256 => Self::hex_digest::<sha3::Sha3_256>(password),
            DigestKind::Sha3_384 => Self::hex_digest::<sha3::Sha3_384>(password),
            DigestKind::Sha3_512 => Self::hex_digest::<sha3::Sha3_512>(password),
        }
    }
}

impl PasswordHasher for DigestHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(self.digest_hex(password))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(self.digest_hex(password) == hash)
    }
}
