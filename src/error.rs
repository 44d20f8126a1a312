use thiserror::Error;

/// The operating system's random source could not supply the bytes required
/// for a session identifier.
///
/// This is fatal and never retried: a weaker source must not be substituted.
#[derive(Debug, Error)]
#[error("random source could not supply session id entropy")]
pub struct EntropyError(#[source] pub(crate) rand::Error);

/// Failures of the authenticated-encryption layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The ciphertext authenticated, but its embedded timestamp is older
    /// than the supplied TTL.
    #[error("ciphertext has expired")]
    Expired,

    /// Authentication failed, the key does not match, or the ciphertext is
    /// structurally malformed.
    #[error("ciphertext is invalid")]
    Invalid,
}

/// A stored session payload could not be encoded or decoded.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("session payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
}

/// Umbrella error for "could not retrieve, persist, or remove a session".
///
/// Retrieval failures are always recoverable: the middleware degrades to a
/// fresh session. Persistence failures propagate to the caller as a
/// request-handling failure.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("no session cookie value is present")]
    NoCookie,

    #[error("no session entry exists for the requested id")]
    MissingEntry,

    #[error("session id is malformed")]
    MalformedId,

    #[error("session has expired")]
    Expired,

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Entropy(#[from] EntropyError),

    #[error("session storage i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("cookie value exceeds {max} bytes (got {len})")]
    CookieTooLarge { len: usize, max: usize },

    #[error("storage backend: {0}")]
    Backend(String),

    #[cfg(feature = "redis")]
    #[error("redis backend: {0}")]
    Redis(#[from] redis::RedisError),
}

/// No [`Session`](crate::Session) was found in the request extensions.
///
/// This is a programmer error: the [`SessionManagerLayer`](crate::SessionManagerLayer)
/// was never installed on the route. It is surfaced loudly rather than
/// defaulted.
#[derive(Debug, Error)]
#[error("no session found in the request; is SessionManagerLayer installed?")]
pub struct AttributeMissingError;
