//! API Module
//!
//! Command surface shared by the CLI and any other host:
//! - commands.rs: one function per user-facing action over an `AppContext`

pub mod commands;

pub use commands::*;
