//! Shared utilities for the financial assistant workspace
//!
//! This crate provides the ambient pieces every other crate relies on:
//! tracing setup and the environment-driven application configuration.

pub mod config;
pub mod logging;

pub use config::{AppConfig, ConfigError, LlmProviderKind};
pub use logging::{LogFormat, init_tracing};
