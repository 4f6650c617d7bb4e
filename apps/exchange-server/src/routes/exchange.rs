//! Exchange endpoint
//!
//! GET and POST on the configured route. Every protocol answer, including
//! failures, is sent with status 200 and a windows-1251 body.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::exchange::{self, ExchangeRequest};
use crate::state::AppState;

pub async fn exchange(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let url = full_url(&uri, &headers);

    let (body, too_large) = match body {
        Ok(body) => (body, false),
        Err(rejection) => {
            let too_large = rejection.status() == StatusCode::PAYLOAD_TOO_LARGE;
            tracing::warn!(error = %rejection, "Could not read exchange request body");
            (Bytes::new(), too_large)
        }
    };

    let mut request = ExchangeRequest::new(url, uri.query(), headers, body);
    if too_large {
        request = request.with_body_too_large();
    }

    let dispatched = exchange::dispatch(&state, request).await;
    let mut response = dispatched.answer.into_response();

    if let Some(session_id) = dispatched.session_id {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly",
            state.config().session.cookie_name,
            session_id
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Invalid session cookie value"),
        }
    }

    response
}

/// Absolute request URL for diagnostics
fn full_url(uri: &Uri, headers: &HeaderMap) -> String {
    if uri.authority().is_some() {
        return uri.to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    format!("http://{}{}", host, uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url_uses_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("shop.example"));
        let uri: Uri = "/1c_exchange?type=catalog&mode=deactivate".parse().unwrap();

        assert_eq!(
            full_url(&uri, &headers),
            "http://shop.example/1c_exchange?type=catalog&mode=deactivate"
        );
        assert_eq!(
            full_url(&uri, &HeaderMap::new()),
            "http://localhost/1c_exchange?type=catalog&mode=deactivate"
        );
    }
}
