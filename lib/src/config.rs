// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Host configuration, loaded from TOML with environment overrides
//!
//! ```toml
//! pairings-file = "/var/lib/keycard/pairings.json"
//! insert-card-delay-ms = 150
//! log-level = "info"
//! ```

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use log::{debug, LevelFilter};
use serde::{Deserialize, Serialize};

use keycard_flow_core::FlowConfig;

use crate::Error;

/// Environment variable overriding the configured log level
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Host configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Pairing store file
    pub pairings_file: PathBuf,

    /// Delay before requesting card insertion
    pub insert_card_delay_ms: u64,

    /// Log level (`off`, `error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pairings_file: PathBuf::from("pairings.json"),
            insert_card_delay_ms: FlowConfig::default().insert_card_delay.as_millis() as u64,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, applying environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        debug!("Loading configuration from {}", path.display());

        let s = std::fs::read_to_string(path)?;
        let mut c: Config = toml::from_str(&s)?;

        c.apply_env();

        Ok(c)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            self.log_level = level;
        }
    }

    /// Parse the configured log level
    pub fn level(&self) -> Result<LevelFilter, Error> {
        LevelFilter::from_str(&self.log_level).map_err(|_| Error::LogLevel(self.log_level.clone()))
    }

    /// Engine configuration
    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig {
            insert_card_delay: Duration::from_millis(self.insert_card_delay_ms),
        }
    }
}
