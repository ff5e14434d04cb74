//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Encoded form: `pbkdf2-sha256$<iterations>$<salt-hex>$<digest-hex>`. The
//! iteration count travels with the hash so it can be raised without
//! invalidating existing accounts.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::DomainError;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_BYTES: usize = 16;

#[derive(Clone)]
pub struct PasswordHasher {
    iterations: u32,
    /// Verified against when no account matches, so unknown emails cost
    /// the same as wrong passwords.
    decoy: String,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        let iterations = iterations.max(1);
        let decoy = encode(iterations, &random_salt(), b"decoy password");
        Self { iterations, decoy }
    }

    /// Hashes `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> String {
        encode(self.iterations, &random_salt(), password.as_bytes())
    }

    /// Checks `password` against an encoded hash in constant time.
    ///
    /// Malformed hashes never verify.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let Some((iterations, salt, expected)) = decode(encoded) else {
            return false;
        };
        let actual = derive(&salt, password.as_bytes(), iterations);
        actual.as_slice().ct_eq(expected.as_slice()).into()
    }

    /// Burns the same work as a real verification and always fails.
    pub fn verify_decoy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.decoy);
        false
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_blocking(&self, password: &str) -> Result<String, DomainError> {
        let hasher = self.clone();
        let password = password.to_owned();
        run_blocking(move || hasher.hash(&password)).await
    }

    /// Verifies on the blocking thread pool. With no stored hash, does the
    /// decoy work instead and fails.
    pub async fn verify_blocking(
        &self,
        password: &str,
        encoded: Option<&str>,
    ) -> Result<bool, DomainError> {
        let hasher = self.clone();
        let password = password.to_owned();
        let encoded = encoded.map(str::to_owned);
        run_blocking(move || match encoded {
            Some(encoded) => hasher.verify(&password, &encoded),
            None => hasher.verify_decoy(&password),
        })
        .await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, DomainError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DomainError::Internal(format!("password hashing task failed: {e}")))
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

fn random_salt() -> [u8; SALT_BYTES] {
    let mut salt = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt);
    salt
}

fn derive(salt: &[u8], password: &[u8], iterations: u32) -> [u8; 32] {
    let mut digest = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut digest);
    digest
}

fn encode(iterations: u32, salt: &[u8], password: &[u8]) -> String {
    let digest = derive(salt, password, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        hex::encode(salt),
        hex::encode(digest)
    )
}

fn decode(encoded: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok()?;
    let salt = hex::decode(parts.next()?).ok()?;
    let digest = hex::decode(parts.next()?).ok()?;
    if parts.next().is_some() || iterations == 0 || digest.len() != 32 {
        return None;
    }
    Some((iterations, salt, digest))
}
