//! Credential checking
//!
//! The exchange client authenticates with HTTP basic auth. Credentials are
//! verified by an [`Authenticator`]; registered [`gates`] may then deny the
//! resulting principal.

pub mod gates;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use base64::Engine;
use subtle::ConstantTimeEq;

use crate::session::Principal;

pub use gates::GateRegistry;

/// Credential store the exchange authenticates against
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Principal for valid credentials, `None` otherwise
    async fn attempt(&self, login: &str, password: &str) -> Option<Principal>;
}

/// Single configured exchange account
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    login: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticCredentials {
    async fn attempt(&self, login: &str, password: &str) -> Option<Principal> {
        // An unset password never authenticates
        if self.password.is_empty() {
            return None;
        }

        let login_ok: bool = login.as_bytes().ct_eq(self.login.as_bytes()).into();
        let password_ok: bool = password.as_bytes().ct_eq(self.password.as_bytes()).into();

        (login_ok && password_ok).then(|| Principal::new(login))
    }
}

/// User and password carried in an `Authorization: Basic` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        Self::parse(value)
    }

    pub fn parse(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;

        Some(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }
}
