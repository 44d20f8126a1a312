//! Session stores: how a session is resolved from and persisted to durable
//! storage (or to the cookie itself).

mod backend;
mod cookie;
mod keyed;

use std::fmt;

use async_trait::async_trait;
use tower_cookies::Cookies;

pub use self::backend::{FilesystemBackend, MemoryBackend, StorageBackend};
#[cfg(feature = "redis")]
pub use self::backend::RedisBackend;
pub use self::cookie::EncryptedCookieStore;
pub use self::keyed::KeyedStore;

use crate::{config::SessionConfig, error::SessionStoreError, session::Session};

/// Uniform contract over storage strategies.
///
/// A store is shared across requests and holds no cross-request mutable state
/// beyond its backend handle. The `Cookies` jar passed to each operation is
/// the request-scoped view provided by `tower_cookies::CookieManager`: reads
/// see the inbound `Cookie` header, writes become `Set-Cookie` on the
/// response.
#[async_trait]
pub trait SessionStore: fmt::Debug + Send + Sync {
    /// Resolves the session addressed by the request's cookie.
    ///
    /// Every failure mode (missing cookie, missing entry, decode or cipher
    /// failure, expiry) is a [`SessionStoreError`]; callers treat it as "no
    /// session" and fall back to [`SessionStore::create`], never as fatal.
    async fn retrieve(&self, cookies: &Cookies) -> Result<Session, SessionStoreError>;

    /// A fresh unsaved session. An id is minted lazily at first store, so
    /// sessions that are never mutated cost nothing.
    fn create(&self) -> Session {
        Session::create()
    }

    /// Persists the session, minting an id if it is new, and sets or
    /// refreshes the session cookie.
    async fn store(&self, cookies: &Cookies, session: &Session) -> Result<(), SessionStoreError>;

    /// Removes any backend state for the session and clears the cookie.
    async fn destroy(&self, cookies: &Cookies, session: &Session)
    -> Result<(), SessionStoreError>;

    /// Removes a specific backend entry by id; used to drop the old entry
    /// after a session has been regenerated.
    async fn remove(&self, id: &str) -> Result<(), SessionStoreError>;

    fn config(&self) -> &SessionConfig;
}
