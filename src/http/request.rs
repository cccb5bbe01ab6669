//! Request translation.
//!
//! # Responsibilities
//! - Derive the outbound backend request from the inbound client request
//! - Copy headers without syntax validation, rewriting `Host`
//! - Decide whether the inbound body travels with the request
//!
//! # Design Decisions
//! - The body stream is moved, never buffered or copied
//! - GET, HEAD, DELETE and TRACE never carry a body, whatever the client sent
//! - Headers are copied in two tiers. Message headers always go through;
//!   content headers only attach when a body is attached, so a
//!   `Content-Type` sent with a GET is dropped
//! - The outbound request is always HTTP/1.1 regardless of the inbound version

use axum::{
    body::Body,
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request, Uri},
};
use uuid::Uuid;

use crate::http::headers::{tier, HeaderTier};
use crate::routing::RouteError;

pub const X_REQUEST_ID: &str = "x-request-id";

const BODYLESS_METHODS: [Method; 4] = [Method::GET, Method::HEAD, Method::DELETE, Method::TRACE];

/// Whether requests with this method forward their body.
pub fn carries_body(method: &Method) -> bool {
    !BODYLESS_METHODS.contains(method)
}

/// Build the backend request for `inbound`, targeting `target`.
pub fn translate(inbound: &Parts, body: Body, target: Uri) -> Result<Request<Body>, RouteError> {
    let authority = target
        .authority()
        .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
        .ok_or_else(|| RouteError::InvalidTarget(target.to_string()))?;

    let with_body = carries_body(&inbound.method);
    let mut request = Request::new(if with_body { body } else { Body::empty() });
    *request.method_mut() = inbound.method.clone();
    *request.uri_mut() = target;

    copy_request_headers(&inbound.headers, request.headers_mut(), with_body);
    request.headers_mut().insert(header::HOST, authority);

    Ok(request)
}

fn copy_request_headers(source: &HeaderMap, target: &mut HeaderMap, with_body: bool) {
    for (name, value) in source {
        match tier(name) {
            HeaderTier::Message => {
                target.append(name.clone(), value.clone());
            }
            HeaderTier::Content if with_body => {
                target.append(name.clone(), value.clone());
            }
            HeaderTier::Content => {
                tracing::trace!(header = %name, "Dropping content header on body-less request");
            }
        }
    }
}

/// Request id assigned by the request-id layer, or a fresh one.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
