//! Request middleware

pub mod access;
pub mod logging;

pub use access::{access_control, is_loopback};
pub use logging::logging_middleware;
