//! Cookie-bound HTTP session management for tower services.
//!
//! This crate provides the full session lifecycle: a [`Session`] entity with
//! dotted-path data access and one-shot flash entries, an authenticated
//! encryption [`Cipher`] protecting session contents at rest, pluggable
//! [`SessionStore`] strategies, and a [`SessionManagerLayer`] middleware that
//! resolves a session per request and persists only what changed.
//!
//! # Stores
//! - [`EncryptedCookieStore`]: the entire encrypted session record travels in
//!   the cookie; no server-side state.
//! - [`KeyedStore`]: the cookie carries only an opaque id; a
//!   [`StorageBackend`] ([`MemoryBackend`], [`FilesystemBackend`], or
//!   [`RedisBackend`] with the `redis` feature) holds the payload.
//!
//! # Security
//! Session ids carry 128 bits of OS entropy and are minted lazily, so
//! read-only requests never allocate one. Call [`Session::regenerate`] on
//! every login and logout to defeat session fixation; the middleware cleans
//! up the old backend entry. Keyed backends never use the raw id as a storage
//! key: the filesystem backend names files by the id's SHA-256.

mod cipher;
mod codec;
mod config;
mod error;
#[cfg(feature = "axum")]
mod extract;
pub mod layer;
mod path;
mod session;
mod store;

pub use tower_cookies::cookie::SameSite;

pub use crate::cipher::{Aes256GcmCipher, Cipher, KEY_SIZE};
pub use crate::codec::SessionCodec;
pub use crate::config::{DEFAULT_COOKIE_NAME, DEFAULT_TTL, SessionConfig};
pub use crate::error::{
    AttributeMissingError, CipherError, EntropyError, SerializationError, SessionStoreError,
};
pub use crate::layer::SessionManagerLayer;
pub use crate::session::{Record, Session};
pub use crate::store::{
    EncryptedCookieStore, FilesystemBackend, KeyedStore, MemoryBackend, SessionStore,
    StorageBackend,
};

#[cfg(feature = "redis")]
pub use crate::store::RedisBackend;

#[cfg(test)]
mod tests {
    use std::{convert::Infallible, sync::Arc};

    use axum::body::Body;
    use http::{Request, Response, header};
    use tower::{ServiceBuilder, ServiceExt as _};

    use super::*;

    async fn handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let session = Session::from_extensions(req.extensions()).expect("session is attached");
        session.set("n", 1).expect("session set succeeds");
        Ok(Response::new(Body::empty()))
    }

    async fn noop_handler(_: Request<Body>) -> Result<Response<Body>, Infallible> {
        Ok(Response::new(Body::empty()))
    }

    fn memory_layer() -> SessionManagerLayer<KeyedStore> {
        let store = KeyedStore::new(
            Arc::new(MemoryBackend::new()),
            SessionCodec::plain(),
            SessionConfig::default(),
        );
        SessionManagerLayer::new(store)
    }

    #[tokio::test]
    async fn mutated_session_sets_cookie() {
        let svc = ServiceBuilder::new()
            .layer(memory_layer())
            .service_fn(handler);

        let req = Request::builder()
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc.oneshot(req).await.expect("service call succeeds");

        assert!(res.headers().get(header::SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn untouched_session_sets_no_cookie() {
        let svc = ServiceBuilder::new()
            .layer(memory_layer())
            .service_fn(noop_handler);

        let req = Request::builder()
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc.oneshot(req).await.expect("service call succeeds");

        assert!(res.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn bogus_cookie_degrades_to_fresh_session() {
        let svc = ServiceBuilder::new()
            .layer(memory_layer())
            .service_fn(handler);

        let req = Request::builder()
            .header(header::COOKIE, format!("{DEFAULT_COOKIE_NAME}=bogus"))
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc.oneshot(req).await.expect("service call succeeds");

        assert!(res.headers().get(header::SET_COOKIE).is_some());
    }
}
