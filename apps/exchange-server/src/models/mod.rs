//! Pluggable exchange models
//!
//! The business side of the exchange (parsing catalogs, reporting status,
//! exporting orders) lives behind a small set of capability traits. A
//! [`Model`] exposes the capabilities it implements through accessor
//! methods; the [`ModelRegistry`] maps configured names to models and is
//! resolved once when the application state is built.

pub mod builtin;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::session::ExchangeSession;

// ============================================================================
// Capabilities
// ============================================================================

/// Consumes a received file, one request at a time.
///
/// `import` must answer `"success"` or `"progress"`; any other string is a
/// contract violation reported to the client as a failure. Returning
/// `"progress"` makes the client call again with the same file name.
#[async_trait]
pub trait Importer: Send + Sync {
    async fn import(&self, path: &Path, ctx: &mut ImportContext<'_>) -> anyhow::Result<String>;

    /// Detail lines sent after the status line, may be empty
    fn answer_detail(&self, ctx: &ImportContext<'_>) -> String {
        ctx.detail()
    }
}

/// Answers `mode=info`
#[async_trait]
pub trait Info: Send + Sync {
    async fn info(&self) -> anyhow::Result<String>;
}

/// End-of-exchange hooks of a catalog import
#[async_trait]
pub trait CatalogLifecycle: Send + Sync {
    /// `start_time` is formatted `YYYY-MM-DD HH:MM:SS`
    async fn deactivate(
        &self,
        start_time: &str,
        session: &mut ExchangeSession,
    ) -> anyhow::Result<String>;

    async fn complete(&self, session: &mut ExchangeSession) -> anyhow::Result<String>;
}

/// Order export for `type=sale`
#[async_trait]
pub trait SaleExchange: Send + Sync {
    async fn process_query(&self, session: &mut ExchangeSession) -> anyhow::Result<String>;

    async fn sale_success(&self, session: &mut ExchangeSession) -> anyhow::Result<String>;
}

/// A registered model and the capabilities it implements
pub trait Model: Send + Sync {
    fn as_importer(&self) -> Option<&dyn Importer> {
        None
    }

    fn as_info(&self) -> Option<&dyn Info> {
        None
    }

    fn as_catalog_lifecycle(&self) -> Option<&dyn CatalogLifecycle> {
        None
    }

    fn as_sale_exchange(&self) -> Option<&dyn SaleExchange> {
        None
    }
}

// ============================================================================
// Import Context
// ============================================================================

/// What an importer sees of the exchange during one `import` call
pub struct ImportContext<'a> {
    session: &'a mut ExchangeSession,
    working_dir: PathBuf,
    detail: Vec<String>,
}

impl<'a> ImportContext<'a> {
    pub fn new(session: &'a mut ExchangeSession, working_dir: PathBuf) -> Self {
        Self {
            session,
            working_dir,
            detail: Vec::new(),
        }
    }

    pub fn session(&self) -> &ExchangeSession {
        &*self.session
    }

    pub fn session_mut(&mut self) -> &mut ExchangeSession {
        &mut *self.session
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Add a line to the detail trail
    pub fn push_detail(&mut self, line: impl Into<String>) {
        self.detail.push(line.into());
    }

    pub fn detail(&self) -> String {
        self.detail.join("\n")
    }
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the models shipped with the server
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(builtin::LoggingImporter::NAME, builtin::LoggingImporter)
            .register(builtin::StatusInfo::NAME, builtin::StatusInfo);
        registry
    }

    pub fn register<M>(&mut self, name: impl Into<String>, model: M) -> &mut Self
    where
        M: Model + 'static,
    {
        self.models.insert(name.into(), Arc::new(model));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Model>> {
        self.models.get(name).cloned()
    }

    /// Resolve a configured model name
    pub fn bind(&self, name: Option<&str>) -> ModelBinding {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => ModelBinding::Unset,
            Some(name) => match self.get(name) {
                Some(model) => ModelBinding::Bound {
                    name: name.to_string(),
                    model,
                },
                None => ModelBinding::Unknown(name.to_string()),
            },
        }
    }
}

/// Outcome of resolving one configured model name
#[derive(Clone)]
pub enum ModelBinding {
    /// Nothing configured
    Unset,
    /// Configured, but no model with that name was registered
    Unknown(String),
    Bound { name: String, model: Arc<dyn Model> },
}

impl ModelBinding {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl std::fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "Unset"),
            Self::Unknown(name) => f.debug_tuple("Unknown").field(name).finish(),
            Self::Bound { name, .. } => f.debug_struct("Bound").field("name", name).finish(),
        }
    }
}
