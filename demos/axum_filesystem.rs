use std::{net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use sessionware::{
    Aes256GcmCipher, FilesystemBackend, KeyedStore, SameSite, Session, SessionCodec,
    SessionConfig, SessionManagerLayer,
};
use time::Duration;

async fn index(session: Session) -> String {
    let n: usize = session
        .get_as("n")
        .expect("session get succeeds")
        .unwrap_or(0);
    session.set("n", n + 1).expect("session set succeeds");
    format!("n={n}")
}

async fn login(session: Session) -> &'static str {
    session.set("auth.user_id", "some-id").expect("session set succeeds");
    // New authentication state, new session id.
    session.regenerate().expect("session regenerate succeeds");
    session
        .flash("notice", "welcome back")
        .expect("session flash succeeds");
    "ok"
}

#[tokio::main]
async fn main() {
    let config = SessionConfig::default()
        // Default: "lgsid"
        .with_name("lgsid")
        // Default: true
        .with_http_only(true)
        // Default: SameSite::Strict
        .with_same_site(SameSite::Strict)
        // Default: one hour
        .with_ttl(Duration::hours(1))
        // Default: true (set to false for local HTTP development)
        .with_secure(false)
        // Default: "/"
        .with_path("/");

    let backend =
        FilesystemBackend::new("/tmp/sessions").expect("session directory is available");
    let store = KeyedStore::new(
        Arc::new(backend),
        SessionCodec::encrypted(Arc::new(Aes256GcmCipher::generate())),
        config,
    );

    let app = Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .layer(SessionManagerLayer::new(store));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    println!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
