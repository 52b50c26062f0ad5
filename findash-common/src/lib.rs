//! Findash Common - Shared configuration and logging for Findash services.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Logging setup with noise filtering

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;
pub mod validation;

pub use config::{
    Config, NetworkConfig, ObservabilityConfig, ScreenerConfig, StorageConfig,
};
pub use validation::{Validate, ValidationError, ValidationResult};
