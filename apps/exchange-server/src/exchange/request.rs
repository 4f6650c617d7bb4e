//! Exchange request parsing

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern of the exchange start time carried as a bare parameter key
pub const START_TIME_PATTERN: &str = r"(\d{4}-\d\d-\d\d)_(\d\d:\d\d:\d\d)";

static START_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(START_TIME_PATTERN).expect("start time pattern is valid"));

// ============================================================================
// Type and Mode
// ============================================================================

/// Exchange flavour selected by the `type` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeType {
    Catalog,
    Sale,
}

impl ExchangeType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "catalog" => Some(Self::Catalog),
            "sale" => Some(Self::Sale),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Sale => "sale",
        }
    }
}

/// Protocol step selected by the `mode` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    CheckAuth,
    Init,
    File,
    Import,
    Info,
    Deactivate,
    Complete,
    Query,
    Success,
}

impl Mode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "checkauth" => Some(Self::CheckAuth),
            "init" => Some(Self::Init),
            "file" => Some(Self::File),
            "import" => Some(Self::Import),
            "info" => Some(Self::Info),
            "deactivate" => Some(Self::Deactivate),
            "complete" => Some(Self::Complete),
            "query" => Some(Self::Query),
            "success" => Some(Self::Success),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckAuth => "checkauth",
            Self::Init => "init",
            Self::File => "file",
            Self::Import => "import",
            Self::Info => "info",
            Self::Deactivate => "deactivate",
            Self::Complete => "complete",
            Self::Query => "query",
            Self::Success => "success",
        }
    }
}

// ============================================================================
// Request
// ============================================================================

/// One exchange call as the dispatcher sees it
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    /// Full request URL, for diagnostics
    pub url: String,
    pub headers: HeaderMap,
    /// Query parameters followed by url-encoded form fields, in request order
    pub params: Vec<(String, String)>,
    /// Raw request body
    pub body: Bytes,
    /// The body was refused for exceeding the size limit
    pub body_too_large: bool,
}

impl ExchangeRequest {
    pub fn new(url: impl Into<String>, query: Option<&str>, headers: HeaderMap, body: Bytes) -> Self {
        let mut params: Vec<(String, String)> = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        // A `file` body is payload, never form fields
        let is_upload = params
            .iter()
            .any(|(k, v)| k == "mode" && v == Mode::File.as_str());
        if !is_upload && is_form(&headers) {
            params.extend(url::form_urlencoded::parse(&body).into_owned());
        }

        Self {
            url: url.into(),
            headers,
            params,
            body,
            body_too_large: false,
        }
    }

    pub fn with_body_too_large(mut self) -> Self {
        self.body_too_large = true;
        self
    }

    /// First value of `key`
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `key` is present as a parameter name
    pub fn has_key(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(k, _)| k.as_str())
    }

    /// Session id from the `Cookie` header, else from a same-named header
    pub fn session_id(&self, cookie_name: &str) -> Option<String> {
        self.cookie(cookie_name).or_else(|| {
            self.headers
                .get(cookie_name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
    }

    /// Value of cookie `name`
    pub fn cookie(&self, name: &str) -> Option<String> {
        let pattern = format!(r"(?:^|[;\s]){}=([^;\s]+)", regex::escape(name));
        let re = Regex::new(&pattern).ok()?;

        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| re.captures(cookie).map(|c| c[1].to_string()))
    }

    /// Exchange start time hidden in a parameter key.
    ///
    /// Keys are scanned in request order and the first match wins, formatted
    /// `YYYY-MM-DD HH:MM:SS`.
    pub fn start_time(&self) -> Option<String> {
        self.keys().find_map(|key| {
            START_TIME_RE
                .captures(key)
                .map(|c| format!("{} {}", &c[1], &c[2]))
        })
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn request(query: &str) -> ExchangeRequest {
        ExchangeRequest::new("http://localhost/1c_exchange", Some(query), HeaderMap::new(), Bytes::new())
    }

    #[test]
    fn test_type_and_mode_parsing() {
        assert_eq!(ExchangeType::parse("sale"), Some(ExchangeType::Sale));
        assert_eq!(ExchangeType::parse("orders"), None);
        assert_eq!(Mode::parse("checkauth"), Some(Mode::CheckAuth));
        assert_eq!(Mode::parse("CHECKAUTH"), None);
        assert_eq!(Mode::Import.as_str(), "import");
    }

    #[test]
    fn test_params_keep_order_and_decode() {
        let req = request("type=catalog&mode=file&filename=import%20files.xml");
        assert_eq!(req.param("type"), Some("catalog"));
        assert_eq!(req.param("filename"), Some("import files.xml"));
        assert_eq!(req.keys().collect::<Vec<_>>(), vec!["type", "mode", "filename"]);
        assert!(req.has_key("mode"));
        assert!(!req.has_key("missing"));
    }

    #[test]
    fn test_form_body_is_merged_except_for_uploads() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let req = ExchangeRequest::new(
            "u",
            Some("type=catalog&mode=import"),
            headers.clone(),
            Bytes::from_static(b"csrftoken&filename=import.xml"),
        );
        assert!(req.has_key("csrftoken"));
        assert_eq!(req.param("filename"), Some("import.xml"));

        let upload = ExchangeRequest::new(
            "u",
            Some("type=catalog&mode=file&filename=a.xml"),
            headers,
            Bytes::from_static(b"<xml a=b/>"),
        );
        assert_eq!(upload.params.len(), 3);
    }

    #[test]
    fn test_session_id_from_cookie_or_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; exchange_session=abc123; x_exchange_session=zzz"),
        );
        let req = ExchangeRequest::new("u", None, headers, Bytes::new());
        assert_eq!(req.session_id("exchange_session").as_deref(), Some("abc123"));

        let mut headers = HeaderMap::new();
        headers.insert("exchange_session", HeaderValue::from_static("fromheader"));
        let req = ExchangeRequest::new("u", None, headers, Bytes::new());
        assert_eq!(req.session_id("exchange_session").as_deref(), Some("fromheader"));

        let req = ExchangeRequest::new("u", None, HeaderMap::new(), Bytes::new());
        assert_eq!(req.session_id("exchange_session"), None);
    }

    #[test]
    fn test_prefixed_cookie_name_does_not_match() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("my_exchange_session=zzz"));
        let req = ExchangeRequest::new("u", None, headers, Bytes::new());
        assert_eq!(req.cookie("exchange_session"), None);
    }

    #[test]
    fn test_start_time_first_match_in_request_order() {
        let req = request("type=catalog&mode=deactivate&2024-03-01_10:15:00&2023-01-01_00:00:00");
        assert_eq!(req.start_time().as_deref(), Some("2024-03-01 10:15:00"));

        let req = request("type=catalog&mode=deactivate&timestamp=2024-03-01_10:15:00");
        assert_eq!(req.start_time(), None);
    }
}
