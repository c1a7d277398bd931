//! ---
//! sts_section: "01-core-functionality"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Shared primitives and utilities for the simulator runtime."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_station_name() -> String {
    "Subestacion_Cordillera".to_owned()
}

fn default_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_publish_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_simulation_seed() -> u64 {
    0x5EED
}

fn default_waterline() -> bool {
    true
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_broker_port() -> u16 {
    1883
}

/// Primary configuration object for the STS runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_station_name")]
    pub station_name: String,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub profiles: Vec<BrokerProfile>,
    #[serde(default)]
    pub active_profile: Option<String>,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "STS_CONFIG";

    /// Load configuration from disk, respecting the `STS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the broker profile the simulator should publish through.
    ///
    /// Falls back to the first declared profile when no `active_profile`
    /// note is configured.
    pub fn active_profile(&self) -> Result<&BrokerProfile> {
        match &self.active_profile {
            Some(note) => self
                .profiles
                .iter()
                .find(|profile| &profile.note == note)
                .ok_or_else(|| anyhow!("active_profile '{}' is not a declared profile", note)),
            None => self
                .profiles
                .first()
                .ok_or_else(|| anyhow!("configuration declares no broker profiles")),
        }
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.station_name.trim().is_empty() {
            return Err(anyhow!("station_name must not be empty"));
        }
        if self.profiles.is_empty() {
            return Err(anyhow!(
                "configuration must declare at least one broker profile"
            ));
        }
        for (idx, profile) in self.profiles.iter().enumerate() {
            profile
                .validate()
                .with_context(|| format!("profile at index {}", idx))?;
            let duplicates = self
                .profiles
                .iter()
                .filter(|other| other.note == profile.note)
                .count();
            if duplicates > 1 {
                return Err(anyhow!("duplicate broker profile note '{}'", profile.note));
            }
        }
        if let Some(note) = &self.active_profile {
            if !self.profiles.iter().any(|profile| &profile.note == note) {
                return Err(anyhow!(
                    "active_profile '{}' does not match any declared profile",
                    note
                ));
            }
        }
        self.simulation.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            station_name: default_station_name(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
            profiles: vec![BrokerProfile::default()],
            active_profile: None,
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// How device payloads are handed to the publish sink each tick.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PublishMode {
    /// One merged payload for the whole station on the profile topic.
    #[default]
    Consolidated,
    /// A status sub-payload plus a telemetry payload per device on
    /// device-specific topics.
    PerDevice,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub interval: Duration,
    #[serde(default)]
    pub publish_mode: PublishMode,
    #[serde(default = "default_simulation_seed")]
    pub random_seed: u64,
    #[serde(default = "default_publish_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub publish_timeout: Duration,
    #[serde(default = "default_waterline")]
    pub waterline: bool,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval < Duration::from_secs(1) {
            return Err(anyhow!("simulation interval must be at least one second"));
        }
        if self.publish_timeout.is_zero() {
            return Err(anyhow!("publish_timeout must be non-zero"));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            publish_mode: PublishMode::default(),
            random_seed: default_simulation_seed(),
            publish_timeout: default_publish_timeout(),
            waterline: default_waterline(),
        }
    }
}

/// Named broker connection profile, uniquely keyed by `note`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerProfile {
    pub note: String,
    pub broker: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    pub topic: String,
    #[serde(default)]
    pub username: String,
}

impl BrokerProfile {
    pub fn validate(&self) -> Result<()> {
        if self.note.trim().is_empty() {
            return Err(anyhow!("broker profile note must not be empty"));
        }
        if self.broker.trim().is_empty() {
            return Err(anyhow!("broker profile '{}' has no broker host", self.note));
        }
        if self.topic.trim().is_empty() {
            return Err(anyhow!("broker profile '{}' has no topic", self.note));
        }
        Ok(())
    }
}

impl Default for BrokerProfile {
    fn default() -> Self {
        Self {
            note: "local".to_owned(),
            broker: "localhost".to_owned(),
            port: default_broker_port(),
            topic: "substation/telemetry".to_owned(),
            username: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
