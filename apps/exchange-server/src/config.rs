//! Configuration management for the exchange server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::exchange::ExchangeType;

/// Configuration key naming the import model, quoted in protocol diagnostics
pub const CATALOG_WORK_MODEL_KEY: &str = "catalog_work_model";

/// Configuration key naming the info model
pub const INFO_MODEL_KEY: &str = "info_model";

/// Configuration key naming the sale exchange model
pub const SALE_MODEL_KEY: &str = "sale_model";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub exchange: ExchangeConfig,
    pub logging: LoggingConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path the exchange endpoint is mounted on
    pub route: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Cookie (and fallback header) carrying the session id
    pub cookie_name: String,
    pub lifetime_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Type used when a request carries no `type` parameter
    pub default_type: String,

    /// Interop mode for clients that carry an anti-forgery token and expect
    /// the extended handshake lines
    pub interop: bool,

    /// Fixed session id forced at `checkauth`
    pub session_id: Option<String>,

    /// Largest chunk accepted per `file` request, advertised in `init`
    pub max_file_size: u64,

    /// Root under which per-session working directories are created
    pub input_path: PathBuf,

    pub catalog_xml_version: String,

    /// Authorization gates a principal must pass
    pub gates: Vec<String>,

    pub catalog_work_model: Option<String>,
    pub info_model: Option<String>,
    pub sale_model: Option<String>,

    /// Purge other sessions' working directories on upload
    pub purge_stale_dirs: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    pub log_commands: bool,
    pub log_headers: bool,
    pub log_full_url: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    pub user: String,
    pub password: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                route: "/1c_exchange".to_string(),
            },
            session: SessionConfig {
                cookie_name: "exchange_session".to_string(),
                lifetime_minutes: 120,
            },
            exchange: ExchangeConfig {
                default_type: ExchangeType::Catalog.as_str().to_string(),
                interop: false,
                session_id: None,
                max_file_size: 100 * 1024 * 1024,
                input_path: PathBuf::from("./storage/exchange"),
                catalog_xml_version: "2.08".to_string(),
                gates: Vec::new(),
                catalog_work_model: None,
                info_model: None,
                sale_model: None,
                purge_stale_dirs: true,
            },
            logging: LoggingConfig::default(),
            credentials: CredentialsConfig {
                user: "exchange".to_string(),
                password: String::new(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
                route: env::var("EXCHANGE_ROUTE").unwrap_or(defaults.server.route),
            },
            session: SessionConfig {
                cookie_name: env::var("SESSION_COOKIE").unwrap_or(defaults.session.cookie_name),
                lifetime_minutes: env::var("SESSION_LIFETIME_MINUTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.session.lifetime_minutes),
            },
            exchange: ExchangeConfig {
                default_type: env::var("EXCHANGE_DEFAULT_TYPE")
                    .unwrap_or(defaults.exchange.default_type),
                interop: flag("EXCHANGE_INTEROP"),
                session_id: non_empty("EXCHANGE_SESSION_ID"),
                max_file_size: env::var("EXCHANGE_MAX_FILE_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.exchange.max_file_size),
                input_path: env::var("EXCHANGE_INPUT_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.exchange.input_path),
                catalog_xml_version: env::var("EXCHANGE_CATALOG_XML_VERSION")
                    .unwrap_or(defaults.exchange.catalog_xml_version),
                gates: env::var("EXCHANGE_GATES")
                    .map(|v| parse_list(&v))
                    .unwrap_or_default(),
                catalog_work_model: non_empty("EXCHANGE_CATALOG_WORK_MODEL"),
                info_model: non_empty("EXCHANGE_INFO_MODEL"),
                sale_model: non_empty("EXCHANGE_SALE_MODEL"),
                purge_stale_dirs: env::var("EXCHANGE_PURGE_STALE_DIRS")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(true),
            },
            logging: LoggingConfig {
                log_commands: flag("EXCHANGE_LOG_COMMANDS"),
                log_headers: flag("EXCHANGE_LOG_HEADERS"),
                log_full_url: flag("EXCHANGE_LOG_FULL_URL"),
            },
            credentials: CredentialsConfig {
                user: env::var("EXCHANGE_USER").unwrap_or(defaults.credentials.user),
                password: env::var("EXCHANGE_PASSWORD").unwrap_or(defaults.credentials.password),
            },
        }
    }
}

fn flag(key: &str) -> bool {
    env::var(key).map(|v| parse_bool(&v)).unwrap_or(false)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Split a comma separated list. A single scalar becomes a one-element list.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
