//! The cookie-embedded store: the entire encrypted session record is the
//! cookie value, with no server-side state at all.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use tower_cookies::Cookies;

use crate::{
    cipher::Cipher,
    codec::SessionCodec,
    config::SessionConfig,
    error::{SerializationError, SessionStoreError},
    session::{self, Session},
    store::SessionStore,
};

/// Packs the whole session into the cookie through an authenticated cipher.
///
/// Expiry is enforced by the cipher's embedded timestamp at decrypt time, so
/// an expired cookie is simply unreadable and degrades to a fresh session.
#[derive(Debug, Clone)]
pub struct EncryptedCookieStore {
    codec: SessionCodec,
    config: SessionConfig,
}

impl EncryptedCookieStore {
    pub fn new(cipher: Arc<dyn Cipher>, config: SessionConfig) -> Self {
        Self {
            codec: SessionCodec::encrypted(cipher),
            config,
        }
    }
}

#[async_trait]
impl SessionStore for EncryptedCookieStore {
    async fn retrieve(&self, cookies: &Cookies) -> Result<Session, SessionStoreError> {
        let cookie = cookies
            .get(&self.config.name)
            .ok_or(SessionStoreError::NoCookie)?;
        let value = cookie.value();
        if value.is_empty() {
            return Err(SessionStoreError::NoCookie);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(value.as_bytes())
            .map_err(SerializationError::from)?;
        let record = self.codec.decode(&bytes, Some(self.config.ttl))?;
        Ok(Session::from_record(record))
    }

    async fn store(&self, cookies: &Cookies, session: &Session) -> Result<(), SessionStoreError> {
        if session.is_new() {
            session.set_id(session::random_id()?);
        }

        let bytes = self.codec.encode(&session.to_record())?;
        let value = URL_SAFE_NO_PAD.encode(bytes);
        if value.len() > self.config.max_cookie_bytes {
            return Err(SessionStoreError::CookieTooLarge {
                len: value.len(),
                max: self.config.max_cookie_bytes,
            });
        }

        cookies.add(self.config.build_cookie(value));
        Ok(())
    }

    async fn destroy(
        &self,
        cookies: &Cookies,
        _session: &Session,
    ) -> Result<(), SessionStoreError> {
        cookies.remove(self.config.removal_cookie());
        Ok(())
    }

    /// No backend entries exist: regeneration leaves nothing to clean up.
    async fn remove(&self, _id: &str) -> Result<(), SessionStoreError> {
        Ok(())
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }
}
