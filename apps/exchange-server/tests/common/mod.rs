//! Shared fixtures for the protocol tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use base64::Engine;
use encoding_rs::WINDOWS_1251;
use tempfile::TempDir;
use tower::ServiceExt;

use catalog_exchange_server::config::Config;
use catalog_exchange_server::models::{ImportContext, Importer, Info, Model, SaleExchange};
use catalog_exchange_server::routes;
use catalog_exchange_server::session::ExchangeSession;
use catalog_exchange_server::state::{AppState, AppStateBuilder};

pub const USER: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const ROUTE: &str = "/1c_exchange";

/// Config rooted in a temp dir with the test account
pub fn config(root: &TempDir) -> Config {
    let mut config = Config::default();
    config.exchange.input_path = root.path().join("exchange");
    config.credentials.user = USER.to_string();
    config.credentials.password = PASSWORD.to_string();
    config
}

pub struct TestApp {
    pub state: AppState,
    pub root: TempDir,
}

impl TestApp {
    pub fn new(configure: impl FnOnce(&mut Config)) -> Self {
        Self::build(configure, |builder| builder)
    }

    pub fn build(
        configure: impl FnOnce(&mut Config),
        customize: impl FnOnce(AppStateBuilder) -> AppStateBuilder,
    ) -> Self {
        let root = TempDir::new().unwrap();
        let mut config = config(&root);
        configure(&mut config);
        let state = customize(AppState::builder(config)).build();
        Self { state, root }
    }

    pub fn input_path(&self) -> PathBuf {
        self.state.config().exchange.input_path.clone()
    }

    /// Client that sends the test credentials
    pub fn client(&self) -> Client<'_> {
        Client {
            app: self,
            cookie: None,
            credentials: Some((USER.to_string(), PASSWORD.to_string())),
        }
    }

    pub fn anonymous(&self) -> Client<'_> {
        Client {
            app: self,
            cookie: None,
            credentials: None,
        }
    }

    /// Working directory of a stored session
    pub async fn working_dir(&self, session_id: &str) -> Option<PathBuf> {
        let session = self.state.sessions().get(session_id).await?;
        self.state.working_dirs().current(&session)
    }
}

/// A protocol client keeping the session cookie between calls
pub struct Client<'a> {
    app: &'a TestApp,
    pub cookie: Option<String>,
    pub credentials: Option<(String, String)>,
}

impl Client<'_> {
    pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
        self.credentials = Some((user.to_string(), password.to_string()));
        self
    }

    /// Stop sending basic auth; the session cookie must carry the login
    pub fn without_credentials(&mut self) {
        self.credentials = None;
    }

    pub async fn get(&mut self, query: &str) -> Reply {
        self.send(Method::GET, query, Body::empty()).await
    }

    pub async fn post(&mut self, query: &str, body: impl Into<Body>) -> Reply {
        self.send(Method::POST, query, body.into()).await
    }

    pub async fn send(&mut self, method: Method, query: &str, body: Body) -> Reply {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{}?{}", ROUTE, query))
            .header(header::HOST, "shop.test");

        if let Some((user, password)) = &self.credentials {
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", user, password));
            builder = builder.header(header::AUTHORIZATION, format!("Basic {}", token));
        }
        if let Some(id) = &self.cookie {
            builder = builder.header(header::COOKIE, format!("exchange_session={}", id));
        }

        let response = routes::app(self.app.state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let session_id = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .and_then(|v| v.strip_prefix("exchange_session="))
            .map(str::to_string);

        let raw = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        let (text, _, _) = WINDOWS_1251.decode(&raw);

        if let Some(id) = &session_id {
            self.cookie = Some(id.clone());
        }

        Reply {
            status,
            content_type,
            body: text.into_owned(),
            raw,
            session_id,
        }
    }

    /// `checkauth`, returning the answer lines
    pub async fn check_auth(&mut self, exchange_type: &str) -> Vec<String> {
        let reply = self
            .get(&format!("type={}&mode=checkauth", exchange_type))
            .await;
        assert_eq!(reply.first_line(), "success", "checkauth failed: {}", reply.body);
        reply.lines()
    }
}

#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
    pub raw: Vec<u8>,
    pub session_id: Option<String>,
}

impl Reply {
    pub fn first_line(&self) -> &str {
        self.body.lines().next().unwrap_or("")
    }

    pub fn lines(&self) -> Vec<String> {
        self.body.lines().map(str::to_string).collect()
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Test models
// ============================================================================

/// Answers `progress` for the first `steps` calls per file, then `success`
pub struct SteppingImporter {
    pub steps: u32,
}

#[async_trait]
impl Importer for SteppingImporter {
    async fn import(&self, path: &Path, ctx: &mut ImportContext<'_>) -> anyhow::Result<String> {
        let attempt = ctx.session_mut().bump_progress(&file_name(path));
        if attempt <= self.steps {
            ctx.push_detail(format!("step {}", attempt));
            return Ok("progress".to_string());
        }
        ctx.push_detail(format!("imported {}", file_name(path)));
        Ok("success".to_string())
    }
}

impl Model for SteppingImporter {
    fn as_importer(&self) -> Option<&dyn Importer> {
        Some(self)
    }
}

/// Breaks the answer contract
pub struct WrongAnswerImporter;

#[async_trait]
impl Importer for WrongAnswerImporter {
    async fn import(&self, _path: &Path, _ctx: &mut ImportContext<'_>) -> anyhow::Result<String> {
        Ok("done".to_string())
    }
}

impl Model for WrongAnswerImporter {
    fn as_importer(&self) -> Option<&dyn Importer> {
        Some(self)
    }
}

/// Fails the import with an error
pub struct FailingImporter;

#[async_trait]
impl Importer for FailingImporter {
    async fn import(&self, _path: &Path, _ctx: &mut ImportContext<'_>) -> anyhow::Result<String> {
        anyhow::bail!("catalog group 42 is missing")
    }
}

impl Model for FailingImporter {
    fn as_importer(&self) -> Option<&dyn Importer> {
        Some(self)
    }
}

/// Panics inside the import
pub struct PanickingImporter;

#[async_trait]
impl Importer for PanickingImporter {
    async fn import(&self, _path: &Path, _ctx: &mut ImportContext<'_>) -> anyhow::Result<String> {
        panic!("importer exploded")
    }
}

impl Model for PanickingImporter {
    fn as_importer(&self) -> Option<&dyn Importer> {
        Some(self)
    }
}

/// Implements `Info` only, with text outside ASCII
pub struct CyrillicInfo;

#[async_trait]
impl Info for CyrillicInfo {
    async fn info(&self) -> anyhow::Result<String> {
        Ok("success\nКаталог".to_string())
    }
}

impl Model for CyrillicInfo {
    fn as_info(&self) -> Option<&dyn Info> {
        Some(self)
    }
}

/// Order export recording confirmations in the session
pub struct OrdersExport;

#[async_trait]
impl SaleExchange for OrdersExport {
    async fn process_query(&self, session: &mut ExchangeSession) -> anyhow::Result<String> {
        session.put("exported", serde_json::json!(2));
        Ok("<?xml version=\"1.0\"?><orders count=\"2\"/>".to_string())
    }

    async fn sale_success(&self, session: &mut ExchangeSession) -> anyhow::Result<String> {
        let exported = session.get("exported").cloned().unwrap_or_default();
        Ok(format!("success\nconfirmed {}", exported))
    }
}

impl Model for OrdersExport {
    fn as_sale_exchange(&self) -> Option<&dyn SaleExchange> {
        Some(self)
    }
}
