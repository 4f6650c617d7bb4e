//! Application state management

use std::sync::Arc;

use chrono::Duration;

use crate::archive::{ArchiveExtractor, ZipExtractor};
use crate::auth::{Authenticator, GateRegistry, StaticCredentials};
use crate::config::Config;
use crate::models::{ModelBinding, ModelRegistry};
use crate::session::SessionStore;
use crate::workdir::WorkingDirs;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    sessions: SessionStore,
    working_dirs: WorkingDirs,
    authenticator: Arc<dyn Authenticator>,
    gates: GateRegistry,
    archive: Option<Arc<dyn ArchiveExtractor>>,
    catalog_model: ModelBinding,
    info_model: ModelBinding,
    sale_model: ModelBinding,
}

impl AppState {
    /// State with the built-in collaborators
    pub fn new(config: Config) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: Config) -> AppStateBuilder {
        AppStateBuilder::new(config)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub fn working_dirs(&self) -> &WorkingDirs {
        &self.inner.working_dirs
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.inner.authenticator.as_ref()
    }

    pub fn gates(&self) -> &GateRegistry {
        &self.inner.gates
    }

    /// Archive extractor, `None` when archive support is off
    pub fn archive(&self) -> Option<&dyn ArchiveExtractor> {
        self.inner.archive.as_deref()
    }

    pub fn catalog_model(&self) -> &ModelBinding {
        &self.inner.catalog_model
    }

    pub fn info_model(&self) -> &ModelBinding {
        &self.inner.info_model
    }

    pub fn sale_model(&self) -> &ModelBinding {
        &self.inner.sale_model
    }
}

/// Composition root for [`AppState`]
pub struct AppStateBuilder {
    config: Config,
    authenticator: Option<Arc<dyn Authenticator>>,
    gates: GateRegistry,
    models: ModelRegistry,
    archive: Option<Arc<dyn ArchiveExtractor>>,
}

impl AppStateBuilder {
    fn new(config: Config) -> Self {
        Self {
            config,
            authenticator: None,
            gates: GateRegistry::new(),
            models: ModelRegistry::with_builtin(),
            archive: Some(Arc::new(ZipExtractor::new())),
        }
    }

    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    pub fn gates(mut self, gates: GateRegistry) -> Self {
        self.gates = gates;
        self
    }

    pub fn models(mut self, models: ModelRegistry) -> Self {
        self.models = models;
        self
    }

    /// Replace the archive extractor; `None` disables archive support
    pub fn archive(mut self, archive: Option<Arc<dyn ArchiveExtractor>>) -> Self {
        self.archive = archive;
        self
    }

    pub fn build(self) -> AppState {
        let config = self.config;
        let exchange = &config.exchange;

        let authenticator = self.authenticator.unwrap_or_else(|| {
            Arc::new(StaticCredentials::new(
                config.credentials.user.clone(),
                config.credentials.password.clone(),
            ))
        });

        let catalog_model = self.models.bind(exchange.catalog_work_model.as_deref());
        let info_model = self.models.bind(exchange.info_model.as_deref());
        let sale_model = self.models.bind(exchange.sale_model.as_deref());

        tracing::debug!(
            catalog = ?catalog_model,
            info = ?info_model,
            sale = ?sale_model,
            archive = self.archive.is_some(),
            "Resolved exchange models"
        );

        let sessions = SessionStore::new(Duration::minutes(config.session.lifetime_minutes));
        let working_dirs = WorkingDirs::new(exchange.input_path.clone(), exchange.purge_stale_dirs);

        AppState {
            inner: Arc::new(AppStateInner {
                sessions,
                working_dirs,
                authenticator,
                gates: self.gates,
                archive: self.archive,
                catalog_model,
                info_model,
                sale_model,
                config,
            }),
        }
    }
}
