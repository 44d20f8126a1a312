// Filesystem backend: file naming, directory creation, and an encrypted
// end-to-end pass through the middleware.
mod common;

use std::sync::Arc;

use axum::body::Body;
use http::{Request, header};
use sessionware::{
    Aes256GcmCipher, FilesystemBackend, KeyedStore, SessionCodec, SessionConfig,
    SessionManagerLayer, StorageBackend,
};
use sha2::{Digest, Sha256};
use tower::ServiceExt as _;

fn hashed_name(id: &str) -> String {
    hex::encode(Sha256::digest(id.as_bytes()))
}

#[tokio::test]
async fn files_are_named_by_sha256_of_the_id() {
    let dir = tempfile::tempdir().expect("tempdir creates successfully");
    let backend = FilesystemBackend::new(dir.path()).expect("backend builds successfully");

    backend
        .store("id", b"payload")
        .await
        .expect("backend stores bytes");

    let expected = dir.path().join(hashed_name("id"));
    assert!(expected.is_file());
    assert_eq!(
        backend
            .retrieve("id")
            .await
            .expect("backend retrieves bytes"),
        Some(b"payload".to_vec())
    );

    backend.delete("id").await.expect("backend deletes entry");
    assert!(!expected.exists());
    assert_eq!(
        backend
            .retrieve("id")
            .await
            .expect("backend retrieves bytes"),
        None
    );
    // Deleting a missing entry is a no-op.
    backend.delete("id").await.expect("delete is idempotent");
}

#[tokio::test]
async fn missing_directory_is_created() {
    let dir = tempfile::tempdir().expect("tempdir creates successfully");
    let nested = dir.path().join("a/b/sessions");
    let _backend = FilesystemBackend::new(&nested).expect("backend builds successfully");
    assert!(nested.is_dir());
}

#[tokio::test]
async fn non_directory_path_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir creates successfully");
    let file = dir.path().join("occupied");
    std::fs::write(&file, b"x").expect("file writes successfully");

    assert!(FilesystemBackend::new(&file).is_err());
}

#[tokio::test]
async fn encrypted_session_round_trips_through_disk() {
    let dir = tempfile::tempdir().expect("tempdir creates successfully");
    let backend = FilesystemBackend::new(dir.path()).expect("backend builds successfully");
    let store = KeyedStore::new(
        Arc::new(backend),
        SessionCodec::encrypted(Arc::new(Aes256GcmCipher::generate())),
        SessionConfig::default(),
    );
    let app = common::routes().layer(SessionManagerLayer::new(store));

    let req = Request::builder()
        .uri("/set")
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app
        .clone()
        .oneshot(req)
        .await
        .expect("service call succeeds");
    let cookie = common::get_session_cookie(&res);

    // The file on disk is keyed by hash and holds no plaintext.
    let path = dir.path().join(hashed_name(cookie.value()));
    let contents = std::fs::read(&path).expect("session file reads successfully");
    let haystack = String::from_utf8_lossy(&contents).into_owned();
    assert!(!haystack.contains("count"));

    let req = Request::builder()
        .uri("/get")
        .header(header::COOKIE, common::cookie_header_value(&cookie))
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app.oneshot(req).await.expect("service call succeeds");
    assert_eq!(common::body_string(res.into_body()).await, "1");
}
