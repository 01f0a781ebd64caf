//! Logic Module - Scan lifecycle
//!
//! - `validators` - URL / content checks and sanitizers
//! - `client/` - classification backend client
//! - `state`, `storage` - persisted records and the typed store
//! - `worker/` - background worker state machine and badge
//! - `popup/` - popup orchestration and view models

pub mod error;
pub mod validators;
pub mod state;
pub mod storage;

pub mod client;
pub mod worker;
pub mod popup;

pub use error::{ErrorKind, PhishGuardError, PhishGuardResult};
