//! File reception
//!
//! `mode=file` appends the request body to `filename` inside the session's
//! working directory. Large files arrive as several chunks with the same
//! name, so the file is always opened for append.

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::response::{self, Answer};
use super::ExchangeContext;
use crate::archive::is_symlink;
use crate::error::{ExchangeError, Result};
use crate::workdir::sanitize_file_name;

pub async fn receive(ctx: &mut ExchangeContext<'_>) -> Result<Answer> {
    let file_name = ctx
        .request
        .param("filename")
        .and_then(sanitize_file_name)
        .ok_or(ExchangeError::MissingFilename { mode: "file" })?;

    let path = ctx
        .state
        .working_dirs()
        .resolve(ctx.session.data_mut(), &file_name, true)
        .await?;

    if ctx.request.body_too_large {
        return Err(ExchangeError::PayloadTooLarge {
            limit: ctx.state.config().exchange.max_file_size,
        });
    }

    let body = &ctx.request.body;
    if body.is_empty() {
        return Err(ExchangeError::EmptyPayload);
    }

    if is_symlink(&path) {
        tracing::warn!(path = %path.display(), "Refusing to write through a symlink");
        return Err(ExchangeError::StorageOpenFailed(path));
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to open exchange file");
            ExchangeError::StorageOpenFailed(path.clone())
        })?;

    let mut written = 0;
    while written < body.len() {
        match file.write(&body[written..]).await {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write exchange file");
                break;
            }
        }
    }

    if written != body.len() || file.flush().await.is_err() {
        return Err(ExchangeError::StorageWriteFailed(path));
    }

    tracing::debug!(
        file = %file_name,
        bytes = written,
        path = %path.display(),
        "Stored exchange chunk"
    );

    if let Some(extractor) = ctx.state.archive() {
        if extractor.is_archive(&path).await {
            ctx.session
                .data_mut()
                .pending_archives
                .insert(file_name, path);
        }
    }

    Ok(response::success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exchange::ExchangeRequest;
    use crate::session::SessionHandle;
    use crate::state::AppState;
    use axum::body::Bytes;
    use axum::http::HeaderMap;
    use tempfile::TempDir;

    fn state(root: &TempDir) -> AppState {
        let mut config = Config::default();
        config.exchange.input_path = root.path().to_path_buf();
        AppState::new(config)
    }

    async fn upload(
        state: &AppState,
        session: SessionHandle,
        name: &str,
        body: &'static [u8],
    ) -> (Result<Answer>, SessionHandle) {
        let request = ExchangeRequest::new(
            "http://localhost/1c_exchange",
            Some(&format!("type=catalog&mode=file&filename={}", name)),
            HeaderMap::new(),
            Bytes::from_static(body),
        );
        let mut ctx = ExchangeContext {
            state,
            request: &request,
            session,
            teardown: false,
        };
        let result = receive(&mut ctx).await;
        (result, ctx.session)
    }

    #[tokio::test]
    async fn test_chunks_are_appended() {
        let root = TempDir::new().unwrap();
        let state = state(&root);
        let session = state.sessions().start(None).await;

        let (result, session) = upload(&state, session, "import.xml", b"<a>").await;
        assert_eq!(result.unwrap().text(), "success");
        let (result, session) = upload(&state, session, "import.xml", b"</a>").await;
        assert!(result.is_ok());

        let dir = state.working_dirs().current(session.data()).unwrap();
        assert_eq!(std::fs::read(dir.join("import.xml")).unwrap(), b"<a></a>");
        assert!(session.data().pending_archives.is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_and_missing_name() {
        let root = TempDir::new().unwrap();
        let state = state(&root);
        let session = state.sessions().start(None).await;

        let (result, session) = upload(&state, session, "import.xml", b"").await;
        assert!(matches!(result, Err(ExchangeError::EmptyPayload)));

        let (result, _) = upload(&state, session, "", b"data").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Mode: file, parameter filename is empty"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_target_is_refused() {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let victim = outside.path().join("victim.txt");
        std::fs::write(&victim, b"ORIGINAL").unwrap();

        let state = state(&root);
        let session = state.sessions().start(None).await;
        let (result, session) = upload(&state, session, "import.xml", b"<a/>").await;
        assert!(result.is_ok());

        let dir = state.working_dirs().current(session.data()).unwrap();
        std::os::unix::fs::symlink(&victim, dir.join("evil.xml")).unwrap();

        let (result, _) = upload(&state, session, "evil.xml", b"PWNED").await;
        assert!(matches!(result, Err(ExchangeError::StorageOpenFailed(_))));
        assert_eq!(std::fs::read(&victim).unwrap(), b"ORIGINAL");
    }
}
