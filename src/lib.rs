//! PhishGuard client core
//!
//! Background worker, popup controller and API client for a phishing-scan
//! browser extension, with the browser surfaces (storage, badge, tabs,
//! content scripts) modelled as traits.

pub mod api;
pub mod constants;
pub mod logic;

pub use logic::client::{ApiClient, Prediction, ScanRequest, ScanResult};
pub use logic::error::{ErrorKind, PhishGuardError, PhishGuardResult};
pub use logic::popup::PopupController;
pub use logic::storage::StateStore;
pub use logic::worker::BackgroundWorker;
