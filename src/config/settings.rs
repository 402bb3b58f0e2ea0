use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::runtime::EngineConfig;

/// Process-level settings: defaults, then an optional TOML file, then
/// `SEQTREE__SECTION__KEY` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    pub log_format: LogFormat,
    pub server: ServerSettings,
    pub data: DataSettings,
    pub events: EventSettings,
    pub engine: EngineSettings,
}

impl AppSettings {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let settings = Config::builder()
            .add_source(Config::try_from(&AppSettings::default())?)
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("SEQTREE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<AppSettings>()?;

        let engine = settings.engine.to_config();
        if let Err(errors) = engine.validate() {
            anyhow::bail!("invalid [engine] settings: {}", errors.join(", "));
        }
        if settings.events.capacity == 0 {
            anyhow::bail!("events.capacity must be > 0");
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    pub dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    /// Events buffered per subscriber before the oldest are dropped.
    pub capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Engine defaults used when `initialize` arrives without a payload.
/// Snake case here because environment keys are lowercased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub num_bins: usize,
    pub sequence_length: usize,
    pub confidence_threshold: f64,
    pub lookahead_days: usize,
    pub take_profit_threshold: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineConfig::default().into()
    }
}

impl EngineSettings {
    pub fn to_config(&self) -> EngineConfig {
        EngineConfig {
            num_bins: self.num_bins,
            sequence_length: self.sequence_length,
            confidence_threshold: self.confidence_threshold,
            lookahead_days: self.lookahead_days,
            take_profit_threshold: self.take_profit_threshold,
        }
    }
}

impl From<EngineConfig> for EngineSettings {
    fn from(c: EngineConfig) -> Self {
        Self {
            num_bins: c.num_bins,
            sequence_length: c.sequence_length,
            confidence_threshold: c.confidence_threshold,
            lookahead_days: c.lookahead_days,
            take_profit_threshold: c.take_profit_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
