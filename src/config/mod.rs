//! Configuration management for an [`crate::Atom`] context.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Environment variable overrides
//! - Configuration file support
//! - Component-wise validation
mod api;
mod scheduler;
pub use api::*;
pub use scheduler::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Main configuration container
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables with `ATOM__` prefix (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct AtomConfig {
    /// Request pipeline parameters
    #[serde(default)]
    pub api: ApiConfig,
    /// Change propagation parameters
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Debug for AtomConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AtomConfig")
            .field("api", &self.api)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl AtomConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `ATOM__` prefix (highest priority)
    ///
    /// # Note
    /// Callers should call `validate()` before handing the config to [`crate::Atom::new`].
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("ATOM__API__BASE_URL", "https://api.example.com");
    /// let cfg = AtomConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(Self::environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.api.validate()?;
        self.scheduler.validate()?;
        Ok(self)
    }

    fn environment() -> Environment {
        Environment::with_prefix("ATOM")
            .separator("__")
            .ignore_empty(true)
            .try_parsing(true)
    }
}
