//! Response simulation: deterministically reconstructs the configured
//! response for a matched endpoint.
//!
//! The construction order is an observable contract: headers first, then
//! the status code, then the JSON-encoded body, and finally the configured
//! delay. The delay is applied *after* the response bytes, not before, by
//! chaining a sleep onto the tail of the body stream; the payload goes out
//! promptly and the connection is then held open for `delay` milliseconds,
//! simulating a slow consumer rather than server-side think time. The
//! sleep suspends only the request it belongs to.

use axum::body::Body;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde_json::Value;
use std::convert::Infallible;
use std::time::Duration;
use thiserror::Error;

use crate::config::EndpointDefinition;

/// Failure while constructing the response for a matched endpoint.
///
/// Surfaced to the dispatcher as-is; there is no local recovery.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("invalid header name {0:?}")]
    HeaderName(String),

    #[error("invalid value for header {0:?}")]
    HeaderValue(String),

    #[error("invalid status code {0}")]
    Status(u16),

    #[error("failed to encode response body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Build the configured response for `endpoint`.
pub fn simulate(endpoint: &EndpointDefinition) -> Result<Response<Body>, ResponseError> {
    let spec = &endpoint.response;

    // Headers are assembled before the status line is committed.
    let mut headers = HeaderMap::with_capacity(spec.headers.len() + 1);
    for (name, value) in &spec.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ResponseError::HeaderName(name.clone()))?;
        let header_value = HeaderValue::from_str(&render_scalar(value))
            .map_err(|_| ResponseError::HeaderValue(name.clone()))?;
        headers.insert(header_name, header_value);
    }

    let status =
        StatusCode::from_u16(spec.status).map_err(|_| ResponseError::Status(spec.status))?;

    let payload = match &spec.body {
        Some(body) => {
            // Configured content types (any casing) take precedence over
            // the JSON convention.
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Bytes::from(serde_json::to_vec(body)?)
        }
        None => Bytes::new(),
    };

    let mut response = Response::new(delayed_body(
        payload,
        Duration::from_millis(endpoint.delay),
    ));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Render a scalar configuration value to the string form used for the
/// header value. Strings are used verbatim, numbers and booleans are
/// formatted as written in the config.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Wrap the payload in a body whose final frame resolves only after the
/// configured delay, so the connection outlives the written response.
fn delayed_body(payload: Bytes, delay: Duration) -> Body {
    if delay.is_zero() {
        return Body::from(payload);
    }
    let frames = stream::once(async move { Ok::<_, Infallible>(payload) }).chain(stream::once(
        async move {
            tokio::time::sleep(delay).await;
            Ok(Bytes::new())
        },
    ));
    Body::from_stream(frames)
}
