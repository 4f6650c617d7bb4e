//! Catalog Exchange Server Library
//!
//! Server side of the catalog/order exchange protocol spoken by ERP
//! accounting clients. The binary in main.rs wires these modules together.
//!
//! # Modules
//!
//! - `exchange`: Request parsing, mode dispatch and protocol answers
//! - `session`: Sessions spanning the requests of one exchange
//! - `workdir`: Per-session working directories for received files
//! - `models`: Pluggable importers and export collaborators
//! - `auth`: Basic auth credentials and authorization gates

pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod exchange;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod workdir;
