//! Axum extractor for the request's [`Session`].

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::{error::AttributeMissingError, session::Session};

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AttributeMissingError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Session::from_extensions(&parts.extensions)
    }
}

impl IntoResponse for AttributeMissingError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
