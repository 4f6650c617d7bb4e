//! Response encoder
//!
//! Answers are plain text, one field per line, sent to the client in
//! windows-1251 regardless of their content.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use encoding_rs::WINDOWS_1251;

pub const SUCCESS: &str = "success";
pub const FAILURE: &str = "failure";
pub const PROGRESS: &str = "progress";

const CONTENT_TYPE: &str = "text/plain; charset=windows-1251";

/// A protocol answer before transcoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer(String);

impl Answer {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Empty body, used by `success` for catalog exchanges
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    /// Bytes sent on the wire
    pub fn encode(&self) -> Vec<u8> {
        encode(&self.0)
    }
}

/// `success`
pub fn success() -> Answer {
    Answer::new(SUCCESS)
}

/// `failure`, followed by the detail lines when present
pub fn failure(details: &str) -> Answer {
    if details.is_empty() {
        Answer::new(FAILURE)
    } else {
        Answer::new(format!("{}\n{}", FAILURE, details))
    }
}

/// A status line followed by an optional detail trail
pub fn with_detail(status: &str, detail: &str) -> Answer {
    if detail.is_empty() {
        Answer::new(status)
    } else {
        Answer::new(format!("{}\n{}", status, detail))
    }
}

/// Transcode UTF-8 text to windows-1251.
///
/// Characters outside the code page become decimal numeric character
/// references (`&#20013;`), the encoder's replacement policy.
pub fn encode(text: &str) -> Vec<u8> {
    let (bytes, _, had_unmappable) = WINDOWS_1251.encode(text);
    if had_unmappable {
        tracing::debug!("Answer contains characters outside windows-1251, replaced");
    }
    bytes.into_owned()
}

impl IntoResponse for Answer {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, self.encode()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE),
        );
        response
    }
}
