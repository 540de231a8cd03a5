//! Shared domain types for the PageSpeed batch runner.

pub mod config;
pub mod events;
pub mod metrics;
pub mod run;
pub mod validation;

mod errors;

pub use errors::{BatchError, Result, ValidationField};
