//! Shared utilities for econ-bot
//!
//! This crate provides the ambient pieces used by the econ-bot binary:
//! tracing setup and `.env` loading.

pub mod config;
pub mod logging;

pub use config::{load_dotenv, load_dotenv_from};
pub use logging::{DEFAULT_FILTER, LogFormat, init_tracing};
