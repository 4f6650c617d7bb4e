//! Authentication and session handshake
//!
//! `checkauth` hands the client a cookie name and session id it must send
//! back on every later call. Authenticating rotates the session id, so after
//! every successful login the id the client presents is adopted again.

use chrono::Local;

use super::response::{Answer, SUCCESS};
use super::{ExchangeContext, ExchangeType, Mode};
use crate::auth::BasicCredentials;

/// Bind a principal to the session if none is bound yet.
///
/// Returns `false` for bad credentials or when a configured gate denies the
/// principal.
pub async fn user_login(ctx: &mut ExchangeContext<'_>) -> bool {
    if ctx.session.data().principal.is_some() {
        return true;
    }

    let Some(credentials) = BasicCredentials::from_headers(&ctx.request.headers) else {
        tracing::debug!("No basic auth credentials on exchange request");
        return false;
    };

    let Some(principal) = ctx
        .state
        .authenticator()
        .attempt(&credentials.user, &credentials.password)
        .await
    else {
        tracing::warn!(user = %credentials.user, "Exchange authentication failed");
        return false;
    };

    if let Some(gate) = ctx
        .state
        .gates()
        .first_denial(&ctx.state.config().exchange.gates, &principal)
    {
        tracing::warn!(user = %principal.login, gate = %gate, "Exchange gate denied user");
        return false;
    }

    tracing::info!(user = %principal.login, "Exchange user authenticated");
    ctx.session.data_mut().principal = Some(principal);
    ctx.session.regenerate_id();
    true
}

/// Put the session back under the id the client was given at `checkauth`
pub fn rebind_session(ctx: &mut ExchangeContext<'_>) {
    let cookie_name = &ctx.state.config().session.cookie_name;
    if let Some(id) = ctx.request.session_id(cookie_name) {
        ctx.session.adopt_id(&id);
    }
}

/// Anti-forgery check for interop clients.
///
/// The token may sit anywhere in the request, so only key presence is
/// checked.
pub fn check_csrf(ctx: &ExchangeContext<'_>, mode: Option<Mode>) -> bool {
    if !ctx.state.config().exchange.interop || mode == Some(Mode::CheckAuth) {
        return true;
    }

    ctx.request.has_key(ctx.session.csrf_token())
}

/// `mode=checkauth`
pub fn check_auth(ctx: &mut ExchangeContext<'_>, exchange_type: ExchangeType) -> Answer {
    let config = ctx.state.config();

    if let Some(fixed) = config.exchange.session_id.as_deref() {
        ctx.session.adopt_id(fixed);
        let data = ctx.session.data_mut();
        let principal = data.principal.take();
        data.flush();
        data.principal = principal;
        data.regenerate_token();
    }

    let mut answer = format!(
        "{}\n{}\n{}",
        SUCCESS,
        config.session.cookie_name,
        ctx.session.id()
    );

    if config.exchange.interop {
        answer.push('\n');
        answer.push_str(ctx.session.csrf_token());
        if exchange_type == ExchangeType::Catalog {
            answer.push('\n');
            answer.push_str(&Local::now().format("%Y-%m-%d_%H:%M:%S").to_string());
        }
    }

    Answer::new(answer)
}

/// `mode=init`: archive support and chunk size limit
pub fn init(ctx: &ExchangeContext<'_>) -> Answer {
    let config = ctx.state.config();
    let zip = if ctx.state.archive().is_some() { "yes" } else { "no" };

    let mut answer = format!("zip={}\nfile_limit={}", zip, config.exchange.max_file_size);

    if config.exchange.interop {
        answer.push('\n');
        answer.push_str(ctx.session.id());
        answer.push('\n');
        answer.push_str(&config.exchange.catalog_xml_version);
    }

    Answer::new(answer)
}
