//! StockScope Common - Shared types and utilities for StockScope services.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup and request tracing helpers
//! - Small numeric and date utilities

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    Config, ConfigSource, MarketConfig, ObservabilityConfig, ReportsConfig, ServerConfig,
    SymbolsConfig,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};
