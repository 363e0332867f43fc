use failure::Fail;
use log::LevelFilter;
use quire_models::Config as ModelConfig;
use serde::Deserialize;
use std::{collections::HashMap, fs};

use crate::Result;

/// Load configuration from `config.toml` in the current directory.
pub fn load() -> Result<Config> {
    let data = fs::read("config.toml").map_err(ReadConfigurationError)?;
    parse(&data)
}

fn parse(data: &[u8]) -> Result<Config> {
    toml::from_slice(data).map_err(|e| ConfigurationError(e).into())
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub server: quire_rest_api::Config,
    #[serde(default)]
    pub logging: Logging,
    #[serde(flatten)]
    pub model: ModelConfig,
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Logging {
    /// Default logging level.
    #[serde(default = "default_level_filter")]
    pub level: LevelFilter,
    /// Actix-web logging level.
    pub network: Option<LevelFilter>,
    /// Custom filters.
    #[serde(default)]
    pub filters: HashMap<String, LevelFilter>,
}

#[derive(Debug, Fail)]
#[fail(display = "Cannot read configuration file")]
pub struct ReadConfigurationError(#[fail(cause)] std::io::Error);

#[derive(Debug, Fail)]
#[fail(display = "Invalid configuration: {}", _0)]
pub struct ConfigurationError(#[fail(cause)] toml::de::Error);

fn default_level_filter() -> LevelFilter {
    LevelFilter::Info
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: default_level_filter(),
            network: None,
            filters: HashMap::new(),
        }
    }
}
