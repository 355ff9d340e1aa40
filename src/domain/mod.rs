// Domain module - configuration, errors and input validation
pub mod config;
pub mod error;
pub mod validation;
