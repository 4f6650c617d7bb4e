//! Exchange protocol
//!
//! One HTTP request is one protocol step. [`dispatch`] validates the request
//! type, the anti-forgery token and the credentials, then routes on `mode`
//! and always produces exactly one [`Answer`]; faults never escape as HTTP
//! errors.

pub mod delegates;
pub mod file;
pub mod handshake;
pub mod import;
pub mod request;
pub mod response;

pub use request::{ExchangeRequest, ExchangeType, Mode};
pub use response::Answer;

use crate::error::{ExchangeError, Result};
use crate::session::SessionHandle;
use crate::state::AppState;

/// Everything a handler sees of the current request
pub struct ExchangeContext<'a> {
    pub state: &'a AppState,
    pub request: &'a ExchangeRequest,
    pub session: SessionHandle,
    /// Drop the session instead of saving it once the request is answered
    pub teardown: bool,
}

/// Outcome of one dispatched request
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub answer: Answer,
    /// Session id to hand back to the client, `None` if nothing was kept
    pub session_id: Option<String>,
}

/// Run one exchange request to completion
pub async fn dispatch(state: &AppState, request: ExchangeRequest) -> Dispatched {
    let cookie_name = &state.config().session.cookie_name;
    let session = state
        .sessions()
        .start(request.session_id(cookie_name).as_deref())
        .await;

    log_request(state, &request);

    let mut ctx = ExchangeContext {
        state,
        request: &request,
        session,
        teardown: false,
    };

    let answer = match handle(&mut ctx).await {
        Ok(answer) => answer,
        Err(ExchangeError::Unsupported) => {
            tracing::debug!(
                mode = request.param("mode").unwrap_or_default(),
                "Unsupported exchange mode"
            );
            response::failure("")
        }
        Err(e) => {
            tracing::warn!(
                mode = request.param("mode").unwrap_or_default(),
                error = %e,
                "Exchange request failed"
            );
            response::failure(&e.to_string())
        }
    };

    let ExchangeContext {
        session, teardown, ..
    } = ctx;

    let session_id = if teardown {
        state.sessions().forget(session.id()).await;
        None
    } else if session.data().principal.is_some() {
        let id = session.id().to_string();
        state.sessions().save(session).await;
        Some(id)
    } else {
        None
    };

    Dispatched { answer, session_id }
}

async fn handle(ctx: &mut ExchangeContext<'_>) -> Result<Answer> {
    let exchange_type = resolve_type(ctx)?;
    log_command(ctx, exchange_type);
    let mode = ctx.request.param("mode").and_then(Mode::parse);

    if !handshake::check_csrf(ctx, mode) {
        return Err(ExchangeError::CsrfMismatch);
    }

    if !handshake::user_login(ctx).await {
        return Err(ExchangeError::AuthenticationFailed);
    }
    handshake::rebind_session(ctx);

    let Some(mode) = mode else {
        return Err(ExchangeError::Unsupported);
    };

    match mode {
        Mode::CheckAuth => Ok(handshake::check_auth(ctx, exchange_type)),
        Mode::Init => Ok(handshake::init(ctx)),
        Mode::File => file::receive(ctx).await,
        Mode::Import => import::import(ctx).await,
        Mode::Info => delegates::info(ctx).await,
        Mode::Deactivate => delegates::deactivate(ctx).await,
        Mode::Complete => delegates::complete(ctx).await,
        Mode::Query => delegates::query(ctx).await,
        Mode::Success => delegates::success(ctx, exchange_type).await,
    }
}

/// `type` parameter, falling back to the configured default when empty
fn resolve_type(ctx: &ExchangeContext<'_>) -> Result<ExchangeType> {
    let value = match ctx.request.param("type").map(str::trim) {
        None | Some("") => ctx.state.config().exchange.default_type.as_str(),
        Some(value) => value,
    };

    ExchangeType::parse(value).ok_or(ExchangeError::InvalidRequestType)
}

fn log_command(ctx: &ExchangeContext<'_>, exchange_type: ExchangeType) {
    if ctx.state.config().logging.log_commands {
        tracing::debug!(
            exchange_type = exchange_type.as_str(),
            mode = ctx.request.param("mode").unwrap_or_default(),
            filename = ctx.request.param("filename").unwrap_or_default(),
            "Exchange command"
        );
    }
}

fn log_request(state: &AppState, request: &ExchangeRequest) {
    let logging = &state.config().logging;

    if logging.log_headers {
        tracing::debug!(headers = ?request.headers, "Exchange request headers");
    }
    if logging.log_full_url {
        tracing::debug!(url = %request.url, "Exchange request url");
    }
}
