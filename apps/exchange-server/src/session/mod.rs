//! Exchange session state
//!
//! Sessions survive across the independent requests of one exchange and hold
//! the working directory name, archive bookkeeping, import progress counters,
//! the bound principal and the anti-forgery token.

pub mod store;
pub mod types;

pub use store::{SessionHandle, SessionStore};
pub use types::{ExchangeSession, Principal};
