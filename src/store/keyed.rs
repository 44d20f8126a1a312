//! The keyed-backend store: the cookie carries only the session id, a
//! [`StorageBackend`] maps id to encoded payload.

use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tower_cookies::Cookies;

use crate::{
    codec::SessionCodec,
    config::SessionConfig,
    error::{EntropyError, SessionStoreError},
    session::{self, Session},
    store::{SessionStore, StorageBackend},
};

/// Bytes of a plain hex id (16 bytes of entropy).
const PLAIN_ID_BYTES: usize = 16;
/// Bytes of a timestamped id: 8-byte big-endian unix seconds + 16 random.
const TIMESTAMPED_ID_BYTES: usize = 24;

/// Store for any [`StorageBackend`]: filesystem, redis, or in-process memory.
#[derive(Debug, Clone)]
pub struct KeyedStore {
    backend: Arc<dyn StorageBackend>,
    codec: SessionCodec,
    config: SessionConfig,
    timestamped_ids: bool,
}

impl KeyedStore {
    pub fn new(backend: Arc<dyn StorageBackend>, codec: SessionCodec, config: SessionConfig) -> Self {
        Self {
            backend,
            codec,
            config,
            timestamped_ids: false,
        }
    }

    /// Mint ids with an embedded big-endian creation timestamp, letting
    /// retrieval reject expired sessions from the id alone without reading
    /// the backend.
    ///
    /// With this enabled, expiry becomes a hard retrieval failure measured
    /// from session creation, instead of the default soft
    /// regenerate-on-inactivity handled by the middleware.
    ///
    /// [`Session::regenerate`] mints plain ids, so a rotated session keeps
    /// the hard `startedAt` check but loses the prefix fast path.
    #[must_use]
    pub fn with_timestamped_ids(mut self, timestamped_ids: bool) -> Self {
        self.timestamped_ids = timestamped_ids;
        self
    }

    fn mint_id(&self) -> Result<String, EntropyError> {
        if self.timestamped_ids {
            timestamped_id()
        } else {
            session::random_id()
        }
    }
}

#[async_trait]
impl SessionStore for KeyedStore {
    async fn retrieve(&self, cookies: &Cookies) -> Result<Session, SessionStoreError> {
        let cookie = cookies
            .get(&self.config.name)
            .ok_or(SessionStoreError::NoCookie)?;
        let id = cookie.value().to_owned();
        if id.is_empty() {
            return Err(SessionStoreError::NoCookie);
        }

        if self.timestamped_ids {
            validate_id(&id, self.config.ttl)?;
        }

        let bytes = self
            .backend
            .retrieve(&id)
            .await?
            .ok_or(SessionStoreError::MissingEntry)?;
        let record = self.codec.decode(&bytes, None)?;
        if record.id != id {
            return Err(SessionStoreError::MalformedId);
        }

        // The stored record is the source of truth for expiry. The id prefix
        // above only rejects early what this check would reject anyway.
        if self.timestamped_ids
            && OffsetDateTime::now_utc() - record.started_at > self.config.ttl
        {
            return Err(SessionStoreError::Expired);
        }

        Ok(Session::from_record(record))
    }

    async fn store(&self, cookies: &Cookies, session: &Session) -> Result<(), SessionStoreError> {
        let id = session.id();
        let id = if id.is_empty() {
            let id = self.mint_id()?;
            session.set_id(id.clone());
            id
        } else {
            id
        };

        let bytes = self.codec.encode(&session.to_record())?;
        self.backend.store(&id, &bytes).await?;
        cookies.add(self.config.build_cookie(id));
        Ok(())
    }

    async fn destroy(
        &self,
        cookies: &Cookies,
        session: &Session,
    ) -> Result<(), SessionStoreError> {
        let id = session.id();
        if !id.is_empty() {
            self.backend.delete(&id).await?;
        }
        cookies.remove(self.config.removal_cookie());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), SessionStoreError> {
        self.backend.delete(id).await
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// Mints an id whose first 8 bytes are the big-endian unix-second creation
/// time, followed by 16 random bytes.
fn timestamped_id() -> Result<String, EntropyError> {
    let seconds = OffsetDateTime::now_utc().unix_timestamp().to_be_bytes();
    let random = session::random_id()?;
    Ok(format!("{}{random}", hex::encode(seconds)))
}

/// Structural and expiry validation of an id carried in a cookie.
///
/// Timestamped ids (48 hex chars) are rejected once their embedded creation
/// time plus `ttl` is in the past. Plain 32-hex ids (minted by
/// [`Session::regenerate`]) carry no prefix and pass through to the record
/// check. Anything else is malformed.
fn validate_id(id: &str, ttl: Duration) -> Result<(), SessionStoreError> {
    let bytes = hex::decode(id).map_err(|_| SessionStoreError::MalformedId)?;
    match bytes.len() {
        PLAIN_ID_BYTES => Ok(()),
        TIMESTAMPED_ID_BYTES => {
            let mut seconds = [0u8; 8];
            seconds.copy_from_slice(&bytes[..8]);
            let created = OffsetDateTime::from_unix_timestamp(i64::from_be_bytes(seconds))
                .map_err(|_| SessionStoreError::MalformedId)?;
            // Subtraction of two in-range datetimes cannot overflow, so a
            // crafted far-future timestamp cannot panic this check.
            if OffsetDateTime::now_utc() - created > ttl {
                Err(SessionStoreError::Expired)
            } else {
                Ok(())
            }
        }
        _ => Err(SessionStoreError::MalformedId),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamped_id_embeds_current_time() {
        let id = timestamped_id().expect("entropy is available");
        assert_eq!(id.len(), TIMESTAMPED_ID_BYTES * 2);

        let bytes = hex::decode(&id).expect("id is hex");
        let mut seconds = [0u8; 8];
        seconds.copy_from_slice(&bytes[..8]);
        let embedded = i64::from_be_bytes(seconds);
        let now = OffsetDateTime::now_utc().unix_timestamp();
        assert!((now - embedded).abs() <= 1);
    }

    #[test]
    fn validate_id_accepts_fresh_timestamped() {
        let id = timestamped_id().expect("entropy is available");
        assert!(validate_id(&id, Duration::hours(1)).is_ok());
    }

    #[test]
    fn validate_id_rejects_expired_timestamped() {
        let old = OffsetDateTime::now_utc() - Duration::hours(2);
        let id = format!(
            "{}{}",
            hex::encode(old.unix_timestamp().to_be_bytes()),
            "ab".repeat(PLAIN_ID_BYTES)
        );
        assert!(matches!(
            validate_id(&id, Duration::hours(1)),
            Err(SessionStoreError::Expired)
        ));
    }

    #[test]
    fn validate_id_survives_far_future_timestamps() {
        // Unix seconds for year 9999: in range for a datetime, but adding a
        // TTL to it would leave the representable range. Crafted cookie
        // values like this must get an orderly verdict, never a panic.
        let id = format!(
            "{}{}",
            hex::encode(253_402_300_799_i64.to_be_bytes()),
            "ab".repeat(PLAIN_ID_BYTES)
        );
        assert!(validate_id(&id, Duration::hours(1)).is_ok());
    }

    #[test]
    fn validate_id_passes_plain_ids_through() {
        let id = session::random_id().expect("entropy is available");
        assert!(validate_id(&id, Duration::ZERO).is_ok());
    }

    #[test]
    fn validate_id_rejects_garbage() {
        assert!(matches!(
            validate_id("not-hex!", Duration::hours(1)),
            Err(SessionStoreError::MalformedId)
        ));
        assert!(matches!(
            validate_id("abcd", Duration::hours(1)),
            Err(SessionStoreError::MalformedId)
        ));
    }
}
