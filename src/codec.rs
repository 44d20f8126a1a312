//! Encoding session records to bytes, optionally through an authenticated
//! encryption transform.

use std::sync::Arc;

use time::Duration;

use crate::{
    cipher::Cipher,
    error::{SerializationError, SessionStoreError},
    session::Record,
};

/// Serializes a [`Record`] to JSON bytes and back, passing the result through
/// an injected [`Cipher`] when one is configured.
#[derive(Debug, Clone, Default)]
pub struct SessionCodec {
    cipher: Option<Arc<dyn Cipher>>,
}

impl SessionCodec {
    /// JSON only; no encryption. Suitable for in-process backends and tests.
    pub fn plain() -> Self {
        Self { cipher: None }
    }

    /// JSON wrapped in the given cipher.
    pub fn encrypted(cipher: Arc<dyn Cipher>) -> Self {
        Self {
            cipher: Some(cipher),
        }
    }

    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, SessionStoreError> {
        let bytes = serde_json::to_vec(record).map_err(SerializationError::from)?;
        match &self.cipher {
            Some(cipher) => Ok(cipher.encrypt(&bytes)?),
            None => Ok(bytes),
        }
    }

    /// Decodes stored bytes back into a record. When `ttl` is given and the
    /// codec carries a cipher, the cipher's embedded timestamp enforces it.
    pub fn decode(&self, bytes: &[u8], ttl: Option<Duration>) -> Result<Record, SessionStoreError> {
        let plain = match &self.cipher {
            Some(cipher) => cipher.decrypt(bytes, ttl)?,
            None => bytes.to_vec(),
        };
        let record = serde_json::from_slice(&plain).map_err(SerializationError::from)?;
        Ok(record)
    }
}
