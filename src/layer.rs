//! The session middleware: a tower layer that resolves a session for each
//! request, exposes it to the handler, and persists the outcome.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::{Request, Response};
use tower_cookies::CookieManager;
use tower_layer::Layer;
use tower_service::Service;

use crate::store::SessionStore;

/// Installs [`SessionManager`] (wrapped in `tower_cookies::CookieManager`, so
/// no separate cookie layer is needed) around an inner service.
#[derive(Debug)]
pub struct SessionManagerLayer<S> {
    store: Arc<S>,
}

impl<S: SessionStore> SessionManagerLayer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

impl<S> Clone for SessionManagerLayer<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<Inner, S: SessionStore> Layer<Inner> for SessionManagerLayer<S> {
    type Service = CookieManager<SessionManager<Inner, S>>;

    fn layer(&self, inner: Inner) -> Self::Service {
        CookieManager::new(SessionManager {
            inner,
            store: self.store.clone(),
        })
    }
}

/// Per-request session lifecycle:
///
/// 1. Resolve the session from the cookie; any store failure degrades to a
///    fresh session.
/// 2. A session already past its TTL is regenerated before the handler runs:
///    new id, same data.
/// 3. The session is exposed through request extensions; the handler is the
///    sole mutation window.
/// 4. Afterwards, in order: regenerated ids orphan their old backend entry,
///    which is removed; a destroyed session is deleted and its cookie
///    cleared; a modified session is persisted; an untouched session leaves
///    the response alone, costing zero writes.
#[derive(Debug, Clone)]
pub struct SessionManager<Inner, S> {
    inner: Inner,
    store: Arc<S>,
}

impl<ReqBody, ResBody, Inner, S> Service<Request<ReqBody>> for SessionManager<Inner, S>
where
    Inner: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    Inner::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    S: SessionStore + 'static,
{
    type Response = Inner::Response;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let store = self.store.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let cookies = match req.extensions().get::<tower_cookies::Cookies>().cloned() {
                Some(cookies) => cookies,
                None => return Ok(server_error()),
            };

            let ttl = store.config().ttl();

            let session = match store.retrieve(&cookies).await {
                Ok(session) => session,
                Err(err) => {
                    tracing::debug!(err = %err, "session retrieval failed, starting fresh");
                    store.create()
                }
            };

            let original_id = session.id();

            // Expired sessions get a new identity but keep their data.
            if session.is_expired(ttl) && session.regenerate().is_err() {
                return Ok(server_error());
            }

            req.extensions_mut().insert(session.clone());

            let res = inner.call(req).await?;

            if session.is_expired(ttl)
                && !session.is_destroyed()
                && session.regenerate().is_err()
            {
                return Ok(server_error());
            }

            // A regenerated session leaves its old backend entry orphaned.
            if !original_id.is_empty() && original_id != session.id() {
                if let Err(err) = store.remove(&original_id).await {
                    tracing::warn!(err = %err, "failed to remove old session entry");
                }
            }

            if session.is_destroyed() {
                if let Err(err) = store.destroy(&cookies, &session).await {
                    tracing::error!(err = %err, "session destroy failed");
                    return Ok(server_error());
                }
                return Ok(res);
            }

            if session.is_modified() {
                if let Err(err) = store.store(&cookies, &session).await {
                    tracing::error!(err = %err, "session save failed");
                    return Ok(server_error());
                }
            }

            Ok(res)
        })
    }
}

fn server_error<ResBody: Default>() -> Response<ResBody> {
    let mut res = Response::default();
    *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
    res
}
