//! Error types for the exchange server
//!
//! Every variant renders the exact diagnostic the client receives after the
//! `failure` line. Errors never leave the dispatcher as HTTP errors: they are
//! turned into a protocol answer with status 200.

use std::path::PathBuf;

use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, ExchangeError>;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("invalid request type")]
    InvalidRequestType,

    #[error("CSRF token mismatch")]
    CsrfMismatch,

    #[error("wrong username or password")]
    AuthenticationFailed,

    #[error("Mode: {mode}, parameter filename is empty")]
    MissingFilename { mode: &'static str },

    #[error("Mode: import wrong file name")]
    MissingImportFilename,

    #[error("Mode: file, input data is empty.")]
    EmptyPayload,

    #[error("Mode: file, input data exceeds file_limit={limit}")]
    PayloadTooLarge { limit: u64 },

    #[error("Mode: file, cant open file: {} to write.", .0.display())]
    StorageOpenFailed(PathBuf),

    #[error("Mode: file, can't wrote data to file: {}", .0.display())]
    StorageWriteFailed(PathBuf),

    #[error("Mode: import, please set model to import data in {key} key.")]
    ImporterNotConfigured { key: &'static str },

    #[error("Mode: import model {model} must implement Import")]
    ImporterCapabilityMissing { model: String },

    #[error("Mode: {mode}, model {model} is not registered")]
    ModelNotRegistered { mode: &'static str, model: String },

    #[error("Mode: import, file {} not exists", .0.display())]
    ImportedFileMissing(PathBuf),

    #[error("Mode: import model {model} return wrong answer")]
    ImporterContractViolation { model: String },

    #[error("{0}")]
    ImporterRuntimeFault(String),

    #[error("Mode: import, can't extract archive {name}: {reason}")]
    ArchiveExtraction { name: String, reason: String },

    #[error("Mode: info, please set model to import data in {key} key.")]
    InfoNotConfigured { key: &'static str },

    #[error("Mode: info model {model} must implement Info")]
    InfoCapabilityMissing { model: String },

    #[error("Mode: query, please set model to export data in {key} key.")]
    QueryNotConfigured { key: &'static str },

    #[error("Mode: {mode} model {model} must implement {capability}")]
    CapabilityMissing {
        mode: &'static str,
        model: String,
        capability: &'static str,
    },

    #[error("Cannot get start time of session, url: {url}\nRegexp: {pattern}")]
    StartTimeUnresolvable { url: String, pattern: &'static str },

    #[error("{0}")]
    Collaborator(String),

    /// Unknown mode; answered with a bare `failure`
    #[error("")]
    Unsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
