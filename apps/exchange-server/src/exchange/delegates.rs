//! Modes answered by collaborator models
//!
//! `info`, `deactivate`, `complete`, `query` and `success` carry no logic of
//! their own beyond locating the configured model and checking it offers the
//! needed capability.

use super::request::START_TIME_PATTERN;
use super::response::{self, Answer};
use super::{ExchangeContext, ExchangeType};
use crate::config::{INFO_MODEL_KEY, SALE_MODEL_KEY};
use crate::error::{ExchangeError, Result};
use crate::models::{Model, ModelBinding};

/// Configured model of a binding; `None` when nothing is configured
fn bound<'s>(
    binding: &'s ModelBinding,
    mode: &'static str,
) -> Result<Option<(&'s str, &'s dyn Model)>> {
    match binding {
        ModelBinding::Unset => Ok(None),
        ModelBinding::Unknown(name) => Err(ExchangeError::ModelNotRegistered {
            mode,
            model: name.clone(),
        }),
        ModelBinding::Bound { name, model } => Ok(Some((name.as_str(), model.as_ref()))),
    }
}

fn collaborator(e: anyhow::Error) -> ExchangeError {
    ExchangeError::Collaborator(e.to_string())
}

/// `mode=info`
pub async fn info(ctx: &mut ExchangeContext<'_>) -> Result<Answer> {
    let (name, model) = bound(ctx.state.info_model(), "info")?
        .ok_or(ExchangeError::InfoNotConfigured { key: INFO_MODEL_KEY })?;

    let info = model
        .as_info()
        .ok_or_else(|| ExchangeError::InfoCapabilityMissing {
            model: name.to_string(),
        })?;

    info.info().await.map(Answer::new).map_err(collaborator)
}

/// `mode=deactivate`: retire catalog entries not touched since the start time
pub async fn deactivate(ctx: &mut ExchangeContext<'_>) -> Result<Answer> {
    let start_time = ctx
        .request
        .start_time()
        .ok_or_else(|| ExchangeError::StartTimeUnresolvable {
            url: ctx.request.url.clone(),
            pattern: START_TIME_PATTERN,
        })?;

    let lifecycle = bound(ctx.state.catalog_model(), "deactivate")?
        .and_then(|(_, model)| model.as_catalog_lifecycle());
    let Some(lifecycle) = lifecycle else {
        tracing::debug!(start_time = %start_time, "No catalog lifecycle, deactivate skipped");
        return Ok(response::success());
    };

    lifecycle
        .deactivate(&start_time, ctx.session.data_mut())
        .await
        .map(Answer::new)
        .map_err(collaborator)
}

/// `mode=complete`: finish the exchange and close the session
pub async fn complete(ctx: &mut ExchangeContext<'_>) -> Result<Answer> {
    let lifecycle = bound(ctx.state.catalog_model(), "complete")?
        .and_then(|(_, model)| model.as_catalog_lifecycle());

    let answer = match lifecycle {
        Some(lifecycle) => lifecycle
            .complete(ctx.session.data_mut())
            .await
            .map(Answer::new)
            .map_err(collaborator)?,
        None => response::success(),
    };

    ctx.teardown = true;
    Ok(answer)
}

/// `mode=query`: export orders to the client
pub async fn query(ctx: &mut ExchangeContext<'_>) -> Result<Answer> {
    let (name, model) = bound(ctx.state.sale_model(), "query")?
        .ok_or(ExchangeError::QueryNotConfigured { key: SALE_MODEL_KEY })?;

    let sale = model
        .as_sale_exchange()
        .ok_or_else(|| ExchangeError::CapabilityMissing {
            mode: "query",
            model: name.to_string(),
            capability: "SaleExchange",
        })?;

    sale.process_query(ctx.session.data_mut())
        .await
        .map(Answer::new)
        .map_err(collaborator)
}

/// `mode=success`: the client confirms it received the exported orders
pub async fn success(ctx: &mut ExchangeContext<'_>, exchange_type: ExchangeType) -> Result<Answer> {
    if exchange_type != ExchangeType::Sale {
        return Ok(Answer::empty());
    }

    let Some((name, model)) = bound(ctx.state.sale_model(), "success")? else {
        return Ok(response::success());
    };

    let sale = model
        .as_sale_exchange()
        .ok_or_else(|| ExchangeError::CapabilityMissing {
            mode: "success",
            model: name.to_string(),
            capability: "SaleExchange",
        })?;

    sale.sale_success(ctx.session.data_mut())
        .await
        .map(Answer::new)
        .map_err(collaborator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Bare;
    impl Model for Bare {}

    #[test]
    fn test_bound_resolution() {
        assert!(bound(&ModelBinding::Unset, "info").unwrap().is_none());

        let unknown = ModelBinding::Unknown("ghost".into());
        assert_eq!(
            bound(&unknown, "info").err().unwrap().to_string(),
            "Mode: info, model ghost is not registered"
        );

        let binding = ModelBinding::Bound {
            name: "bare".into(),
            model: Arc::new(Bare),
        };
        let (name, model) = bound(&binding, "info").unwrap().unwrap();
        assert_eq!(name, "bare");
        assert!(model.as_sale_exchange().is_none());
    }
}
