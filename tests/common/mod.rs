#![allow(dead_code)]

// Shared helpers for integration tests.
//
// Cookie parsing/encoding goes through `tower_cookies::Cookie` to match what
// the middleware emits in `Set-Cookie` and what browsers send back.
use std::sync::Arc;

use axum::{Router, body::Body, routing::get};
use http::{HeaderMap, Response, header};
use http_body_util::BodyExt as _;
use sessionware::{
    Aes256GcmCipher, EncryptedCookieStore, KeyedStore, MemoryBackend, Session, SessionCodec,
    SessionConfig, SessionManagerLayer,
};
use tower_cookies::Cookie;

pub async fn body_string(body: Body) -> String {
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// The standard route set used by most service tests.
pub fn routes() -> Router {
    Router::new()
        .route(
            "/set",
            get(|session: Session| async move {
                session.set("count", 1).expect("session set succeeds");
            }),
        )
        .route(
            "/get",
            get(|session: Session| async move {
                session
                    .get("count")
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "none".to_string())
            }),
        )
        .route(
            "/destroy",
            get(|session: Session| async move {
                session.destroy();
            }),
        )
        .route(
            "/regenerate",
            get(|session: Session| async move {
                session.regenerate().expect("session regenerate succeeds");
            }),
        )
        .route(
            "/flash-set",
            get(|session: Session| async move {
                session.flash("notice", "saved").expect("session flash succeeds");
            }),
        )
        .route(
            "/flash-read",
            get(|session: Session| async move {
                session
                    .get_as::<String>("notice")
                    .expect("session get succeeds")
                    .unwrap_or_else(|| "none".to_string())
            }),
        )
}

/// An in-memory keyed store plus a handle on its backend for inspection.
pub fn memory_layer(config: SessionConfig) -> (MemoryBackend, SessionManagerLayer<KeyedStore>) {
    let backend = MemoryBackend::new();
    let store = KeyedStore::new(Arc::new(backend.clone()), SessionCodec::plain(), config);
    (backend, SessionManagerLayer::new(store))
}

pub fn encrypted_cookie_layer(config: SessionConfig) -> SessionManagerLayer<EncryptedCookieStore> {
    let store = EncryptedCookieStore::new(Arc::new(Aes256GcmCipher::generate()), config);
    SessionManagerLayer::new(store)
}

pub fn get_session_cookie(res: &Response<Body>) -> Cookie<'static> {
    get_session_cookie_from_headers(res.headers())
}

pub fn get_session_cookie_from_headers(headers: &HeaderMap) -> Cookie<'static> {
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("response includes set-cookie header");
    let set_cookie = set_cookie
        .to_str()
        .expect("set-cookie header is valid utf-8");
    Cookie::parse_encoded(set_cookie)
        .expect("set-cookie parses successfully")
        .into_owned()
}

/// Renders a request `Cookie` header pair. Session values are hex or
/// url-safe base64, so no percent-encoding is needed.
pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    format!("{}={}", cookie.name(), cookie.value())
}
