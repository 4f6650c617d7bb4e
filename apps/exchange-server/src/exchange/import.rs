//! Import driver
//!
//! Hands a received file to the configured catalog importer. The client
//! repeats `mode=import` for the same file for as long as the importer
//! answers `progress`.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use super::response::{self, Answer, PROGRESS, SUCCESS};
use super::ExchangeContext;
use crate::archive::is_symlink;
use crate::config::CATALOG_WORK_MODEL_KEY;
use crate::error::{ExchangeError, Result};
use crate::models::{ImportContext, ModelBinding};
use crate::workdir::sanitize_file_name;

pub async fn import(ctx: &mut ExchangeContext<'_>) -> Result<Answer> {
    let file_name = ctx
        .request
        .param("filename")
        .and_then(sanitize_file_name)
        .ok_or(ExchangeError::MissingImportFilename)?;

    let state = ctx.state;
    let (model_name, model) = match state.catalog_model() {
        ModelBinding::Unset => {
            return Err(ExchangeError::ImporterNotConfigured {
                key: CATALOG_WORK_MODEL_KEY,
            })
        }
        ModelBinding::Unknown(name) => {
            return Err(ExchangeError::ModelNotRegistered {
                mode: "import",
                model: name.clone(),
            })
        }
        ModelBinding::Bound { name, model } => (name, model),
    };

    let importer = model
        .as_importer()
        .ok_or_else(|| ExchangeError::ImporterCapabilityMissing {
            model: model_name.clone(),
        })?;

    unpack_pending(ctx).await?;

    let path = state
        .working_dirs()
        .resolve(ctx.session.data_mut(), &file_name, false)
        .await?;

    if is_symlink(&path) || !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ExchangeError::ImportedFileMissing(path));
    }

    let working_dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| state.working_dirs().root().to_path_buf());
    let mut import_ctx = ImportContext::new(ctx.session.data_mut(), working_dir);

    let outcome = AssertUnwindSafe(importer.import(&path, &mut import_ctx))
        .catch_unwind()
        .await;

    let status = match outcome {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => return Err(ExchangeError::ImporterRuntimeFault(e.to_string())),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(model = %model_name, panic = %message, "Importer panicked");
            return Err(ExchangeError::ImporterRuntimeFault(message));
        }
    };

    if status != SUCCESS && status != PROGRESS {
        tracing::warn!(model = %model_name, answer = %status, "Importer broke the answer contract");
        return Err(ExchangeError::ImporterContractViolation {
            model: model_name.clone(),
        });
    }

    tracing::info!(file = %file_name, status = %status, "Import step finished");

    let detail = importer.answer_detail(&import_ctx);
    Ok(response::with_detail(&status, &detail))
}

/// Unpack archives received since the last import
async fn unpack_pending(ctx: &mut ExchangeContext<'_>) -> Result<()> {
    let Some(extractor) = ctx.state.archive() else {
        return Ok(());
    };
    let Some(target) = ctx.state.working_dirs().current(ctx.session.data()) else {
        return Ok(());
    };

    let pending: Vec<_> = ctx
        .session
        .data()
        .pending_archives
        .iter()
        .map(|(name, path)| (name.clone(), path.clone()))
        .collect();

    for (name, path) in pending {
        // A broken archive is reported once, not on every later import
        ctx.session.data_mut().pending_archives.remove(&name);

        if !extractor.is_archive(&path).await {
            continue;
        }

        let entries = extractor.extract(&path, &target).await.map_err(|e| {
            ExchangeError::ArchiveExtraction {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;

        tracing::info!(archive = %name, entries = entries, "Unpacked exchange archive");
    }

    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Mode: import, importer panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let panic: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(panic.as_ref()), "boom");

        let panic: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(panic.as_ref()), "owned boom");

        let panic: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(panic.as_ref()), "Mode: import, importer panicked");
    }
}
