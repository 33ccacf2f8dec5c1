use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use strum::Display;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/loadgen.toml";

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "LOADGEN_CONFIG";

/// Single-variable override of `target.base_url`.
pub const ENDPOINT_URL_ENV: &str = "ENDPOINT_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub corpus: CorpusConfig,
    pub load: LoadConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub base_url: String,
    pub http_timeout_seconds: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            http_timeout_seconds: 30,
        }
    }
}

impl TargetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub path: PathBuf,
    pub skip_header: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("wine.csv"),
            skip_header: true,
        }
    }
}

/// How a virtual user spends one iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Create, read, search and delete in order.
    #[default]
    Sequential,
    /// One operation drawn from the weighted task mix.
    Weighted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub vus: usize,
    /// Iterations shared by all virtual users; 0 runs until the deadline.
    pub iterations: u64,
    pub duration_seconds: u64,
    pub scenario: Scenario,
    /// Creates each virtual user performs before its first iteration.
    pub warmup_creates: u32,
    pub seed: Option<u64>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            vus: 10,
            iterations: 10,
            duration_seconds: 30,
            scenario: Scenario::Sequential,
            warmup_creates: 0,
            seed: None,
        }
    }
}

impl LoadConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }

    pub fn iteration_limit(&self) -> Option<u64> {
        (self.iterations > 0).then_some(self.iterations)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub json_path: Option<PathBuf>,
    /// Exit with an error when any iteration was aborted.
    pub fail_on_abort: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            json_path: None,
            fail_on_abort: true,
        }
    }
}

impl Config {
    /// Defaults, then `config/loadgen.toml` (or `$LOADGEN_CONFIG`), then
    /// `LOADGEN__SECTION__KEY` variables, then `ENDPOINT_URL`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::from_figment(Self::figment(&path))
    }

    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("LOADGEN__").split("__"))
            .merge(
                Env::raw()
                    .only(&[ENDPOINT_URL_ENV])
                    .map(|_| "target.base_url".into()),
            )
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let cfg: Config = figment.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.target.base_url).map_err(|e| {
            ConfigError::Invalid(format!("target.base_url {:?}: {e}", self.target.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "target.base_url must be http(s), got {}",
                url.scheme()
            )));
        }
        if self.target.http_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "target.http_timeout_seconds must be at least 1".into(),
            ));
        }
        if self.load.vus == 0 {
            return Err(ConfigError::Invalid("load.vus must be at least 1".into()));
        }
        if self.load.duration_seconds == 0 {
            return Err(ConfigError::Invalid(
                "load.duration_seconds must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
