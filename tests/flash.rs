// Flash entries live for exactly one request cycle after they are staged.
mod common;

use axum::body::Body;
use http::{Request, header};
use sessionware::SessionConfig;
use tower::ServiceExt as _;

#[tokio::test]
async fn flash_is_visible_for_exactly_one_cycle() {
    let (_backend, layer) = common::memory_layer(SessionConfig::default());
    let app = common::routes().layer(layer);

    // Cycle 1: stage the flash. Staging is a mutation, so a cookie is set.
    let req = Request::builder()
        .uri("/flash-set")
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app
        .clone()
        .oneshot(req)
        .await
        .expect("service call succeeds");
    let cookie = common::get_session_cookie(&res);

    // Cycle 2: the flash is readable once.
    let req = Request::builder()
        .uri("/flash-read")
        .header(header::COOKIE, common::cookie_header_value(&cookie))
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app
        .clone()
        .oneshot(req)
        .await
        .expect("service call succeeds");
    assert_eq!(common::body_string(res.into_body()).await, "saved");

    // Cycle 3: gone.
    let req = Request::builder()
        .uri("/flash-read")
        .header(header::COOKIE, common::cookie_header_value(&cookie))
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app.oneshot(req).await.expect("service call succeeds");
    assert_eq!(common::body_string(res.into_body()).await, "none");
}

#[tokio::test]
async fn unread_flash_is_swept_after_one_round_trip() {
    let (_backend, layer) = common::memory_layer(SessionConfig::default());
    let app = common::routes().layer(layer);

    let req = Request::builder()
        .uri("/flash-set")
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app
        .clone()
        .oneshot(req)
        .await
        .expect("service call succeeds");
    let cookie = common::get_session_cookie(&res);

    // Cycle 2 never reads the flash; the sweep must still be persisted.
    let req = Request::builder()
        .uri("/get")
        .header(header::COOKIE, common::cookie_header_value(&cookie))
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app
        .clone()
        .oneshot(req)
        .await
        .expect("service call succeeds");
    assert!(res.headers().get(header::SET_COOKIE).is_some());

    // Cycle 3: the unread flash did not survive a second round-trip.
    let req = Request::builder()
        .uri("/flash-read")
        .header(header::COOKIE, common::cookie_header_value(&cookie))
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app.oneshot(req).await.expect("service call succeeds");
    assert_eq!(common::body_string(res.into_body()).await, "none");
}
