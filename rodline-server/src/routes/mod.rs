//! HTTP route handlers

pub mod session;
pub mod status;
