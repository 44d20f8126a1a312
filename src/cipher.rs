//! The authenticated-encryption contract protecting session contents at rest,
//! and an AES-256-GCM implementation of it.

use std::fmt;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng, Payload, rand_core::RngCore},
};
use time::{Duration, OffsetDateTime};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CipherError;

pub const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TIMESTAMP_SIZE: usize = 8;

/// Symmetric authenticated encryption with optional expiry binding.
///
/// Implementations embed (and authenticate) a creation timestamp so that
/// [`Cipher::decrypt`] can reject ciphertexts older than a TTL without
/// trusting any unauthenticated data.
pub trait Cipher: fmt::Debug + Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;

    /// Fails with [`CipherError::Expired`] when `ttl` is given and the
    /// authenticated timestamp is older than it, or [`CipherError::Invalid`]
    /// when authentication fails or the key does not match.
    fn decrypt(&self, ciphertext: &[u8], ttl: Option<Duration>) -> Result<Vec<u8>, CipherError>;
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct SecretKey([u8; KEY_SIZE]);

/// AES-256-GCM with a random 96-bit nonce per message and the creation
/// timestamp bound as associated data.
///
/// Wire layout: `nonce (12) || unix seconds, big endian (8) || ciphertext`.
/// The key is zeroized on drop.
pub struct Aes256GcmCipher {
    key: SecretKey,
}

impl Aes256GcmCipher {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self {
            key: SecretKey(key),
        }
    }

    /// A cipher with a freshly generated random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self::new(key)
    }
}

impl fmt::Debug for Aes256GcmCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes256GcmCipher").finish_non_exhaustive()
    }
}

impl Cipher for Aes256GcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let cipher = Aes256Gcm::new((&self.key.0).into());

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_be_bytes();

        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: &timestamp,
                },
            )
            .map_err(|_| CipherError::Invalid)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + TIMESTAMP_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&timestamp);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], ttl: Option<Duration>) -> Result<Vec<u8>, CipherError> {
        if ciphertext.len() < NONCE_SIZE + TIMESTAMP_SIZE {
            return Err(CipherError::Invalid);
        }
        let (nonce_bytes, rest) = ciphertext.split_at(NONCE_SIZE);
        let (timestamp_bytes, message) = rest.split_at(TIMESTAMP_SIZE);

        let cipher = Aes256Gcm::new((&self.key.0).into());
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: message,
                    aad: timestamp_bytes,
                },
            )
            .map_err(|_| CipherError::Invalid)?;

        // Only check expiry against a timestamp that authenticated.
        if let Some(ttl) = ttl {
            let mut seconds = [0u8; TIMESTAMP_SIZE];
            seconds.copy_from_slice(timestamp_bytes);
            let created = OffsetDateTime::from_unix_timestamp(i64::from_be_bytes(seconds))
                .map_err(|_| CipherError::Invalid)?;
            if OffsetDateTime::now_utc() - created > ttl {
                return Err(CipherError::Expired);
            }
        }

        Ok(plaintext)
    }
}
