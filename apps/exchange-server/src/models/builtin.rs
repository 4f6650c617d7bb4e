//! Models shipped with the server

use std::path::Path;

use async_trait::async_trait;

use super::{CatalogLifecycle, ImportContext, Importer, Info, Model};
use crate::exchange::response::SUCCESS;
use crate::session::ExchangeSession;

/// Accepts every file, logging its size. Useful to validate a client setup
/// before a real catalog model is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingImporter;

impl LoggingImporter {
    pub const NAME: &'static str = "logging";
}

#[async_trait]
impl Importer for LoggingImporter {
    async fn import(&self, path: &Path, ctx: &mut ImportContext<'_>) -> anyhow::Result<String> {
        let size = tokio::fs::metadata(path).await?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let attempt = ctx.session_mut().bump_progress(&name);

        tracing::info!(file = %name, size = size, attempt = attempt, "Received exchange file");

        ctx.push_detail(format!("{}: {} bytes", name, size));
        Ok(SUCCESS.to_string())
    }
}

#[async_trait]
impl CatalogLifecycle for LoggingImporter {
    async fn deactivate(
        &self,
        start_time: &str,
        _session: &mut ExchangeSession,
    ) -> anyhow::Result<String> {
        tracing::info!(start_time = %start_time, "Deactivate requested");
        Ok(SUCCESS.to_string())
    }

    async fn complete(&self, session: &mut ExchangeSession) -> anyhow::Result<String> {
        tracing::info!(files = session.import_progress.len(), "Exchange complete");
        Ok(SUCCESS.to_string())
    }
}

impl Model for LoggingImporter {
    fn as_importer(&self) -> Option<&dyn Importer> {
        Some(self)
    }

    fn as_catalog_lifecycle(&self) -> Option<&dyn CatalogLifecycle> {
        Some(self)
    }
}

/// Reports the server name and version
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusInfo;

impl StatusInfo {
    pub const NAME: &'static str = "status";
}

#[async_trait]
impl Info for StatusInfo {
    async fn info(&self) -> anyhow::Result<String> {
        Ok(format!(
            "{}\n{} {}",
            SUCCESS,
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
    }
}

impl Model for StatusInfo {
    fn as_info(&self) -> Option<&dyn Info> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_logging_importer_reports_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("import.xml");
        std::fs::write(&path, b"12345").unwrap();

        let mut session = ExchangeSession::new(Duration::minutes(1));
        let mut ctx = ImportContext::new(&mut session, temp_dir.path().to_path_buf());

        let answer = LoggingImporter.import(&path, &mut ctx).await.unwrap();
        assert_eq!(answer, "success");
        assert_eq!(LoggingImporter.answer_detail(&ctx), "import.xml: 5 bytes");
        assert_eq!(session.progress_of("import.xml"), 1);
    }

    #[tokio::test]
    async fn test_status_info() {
        let info = StatusInfo.info().await.unwrap();
        assert!(info.starts_with("success\n"));
    }
}
