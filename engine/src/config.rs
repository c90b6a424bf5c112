//! Configuration management for the Warehouse Inventory Management Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with WIM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Movement workflow configuration
    pub workflow: WorkflowConfig,

    /// Projector worker configuration
    pub worker: WorkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    /// Escalate a closed-accounting-period alert to a hard rejection.
    /// When false the alert is returned as an advisory only.
    pub reject_closed_period: bool,

    /// Window, in days, within which a soon-to-expire lot is preferred
    /// whole by the optimized allocation mode
    pub near_expiry_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Projector job channel capacity
    pub queue_capacity: usize,

    /// Interval between catch-up sweeps over all stock summaries, in
    /// seconds. The sweep backstops lost queue jobs (at-least-once).
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("WIM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("workflow.reject_closed_period", true)?
            .set_default("workflow.near_expiry_days", 30)?
            .set_default("worker.queue_capacity", 256)?
            .set_default("worker.sweep_interval_secs", 300)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WIM_ prefix)
            .add_source(
                Environment::with_prefix("WIM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            reject_closed_period: true,
            near_expiry_days: 30,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            sweep_interval_secs: 300,
        }
    }
}
