//! Request middleware

pub mod auth;
pub mod traffic;
