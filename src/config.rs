//! Configuration for the validator and the surrounding pipeline.

use crate::error::{Error, Result};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable that overrides `fofa.api_key`.
pub const API_KEY_ENV: &str = "SOCKS_HUNTER_FOFA_KEY";

/// Order in which validated proxies are handed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatedOrder {
    /// The order in which probes succeeded.
    #[default]
    Completion,
    /// Lowest probe latency first.
    Fastest,
    /// Shuffled.
    Random,
}

impl FromStr for ValidatedOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "completion" => Ok(Self::Completion),
            "fastest" => Ok(Self::Fastest),
            "random" => Ok(Self::Random),
            other => Err(format!(
                "unknown order {other:?} (expected completion, fastest or random)"
            )),
        }
    }
}

/// Configuration for the concurrent validator.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// URL fetched through each candidate.
    pub test_url: String,
    /// Timeout for dialling the candidate proxy.
    pub connect_timeout: Duration,
    /// Timeout for the whole round trip.
    pub timeout: Duration,
    /// Maximum number of probes in flight, unbounded when `None`.
    pub max_concurrency: Option<usize>,
    /// Maximum probe launches per second, unlimited when `None`.
    pub probes_per_second: Option<f64>,
    /// Order of the returned list.
    pub order: ValidatedOrder,
}

impl ValidatorConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ValidatorConfigBuilder {
        ValidatorConfigBuilder::new()
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for `ValidatorConfig`.
#[derive(Debug, Default)]
pub struct ValidatorConfigBuilder {
    test_url: Option<String>,
    connect_timeout: Option<Duration>,
    timeout: Option<Duration>,
    max_concurrency: Option<usize>,
    probes_per_second: Option<f64>,
    order: Option<ValidatedOrder>,
}

impl ValidatorConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the URL fetched through each candidate.
    pub fn test_url(mut self, url: impl Into<String>) -> Self {
        self.test_url = Some(url.into());
        self
    }

    /// Set the timeout for dialling the candidate.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the timeout for the whole round trip.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cap the number of probes in flight.
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Cap the number of probes started per second.
    pub fn probes_per_second(mut self, rate: f64) -> Self {
        self.probes_per_second = Some(rate);
        self
    }

    /// Set the order of the returned list.
    pub fn order(mut self, order: ValidatedOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ValidatorConfig {
        ValidatorConfig {
            test_url: self.test_url.unwrap_or_else(|| "https://www.baidu.com".to_string()),
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(5)),
            timeout: self.timeout.unwrap_or(Duration::from_secs(10)),
            max_concurrency: self.max_concurrency.filter(|&n| n > 0),
            probes_per_second: self.probes_per_second.filter(|r| r.is_finite() && *r > 0.0),
            order: self.order.unwrap_or_default(),
        }
    }
}

/// Top-level configuration file (`config.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fofa: FofaSection,
    pub validator: ValidatorSection,
    pub v2ray: V2raySection,
    pub output: OutputSection,
}

/// `[fofa]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FofaSection {
    pub api_key: String,
    pub base_url: String,
    pub query: String,
}

impl Default for FofaSection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://fofa.info".to_string(),
            query: r#"protocol="socks5" && "Version:5 Method:No Authentication(0x00)" && country="CN""#
                .to_string(),
        }
    }
}

/// `[validator]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidatorSection {
    pub test_url: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub max_concurrency: Option<usize>,
    pub probes_per_second: Option<f64>,
    pub order: ValidatedOrder,
}

impl Default for ValidatorSection {
    fn default() -> Self {
        let defaults = ValidatorConfig::default();
        Self {
            test_url: defaults.test_url,
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            timeout_secs: defaults.timeout.as_secs(),
            max_concurrency: None,
            probes_per_second: None,
            order: defaults.order,
        }
    }
}

impl ValidatorSection {
    /// Convert the file section into a validator configuration.
    pub fn to_validator_config(&self) -> ValidatorConfig {
        let mut builder = ValidatorConfig::builder()
            .test_url(self.test_url.clone())
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .timeout(Duration::from_secs(self.timeout_secs))
            .order(self.order);
        if let Some(limit) = self.max_concurrency {
            builder = builder.max_concurrency(limit);
        }
        if let Some(rate) = self.probes_per_second {
            builder = builder.probes_per_second(rate);
        }
        builder.build()
    }
}

/// `[v2ray]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct V2raySection {
    pub binary: PathBuf,
    /// Arguments passed to the binary; `{config}` is replaced by `config_path`.
    pub args: Vec<String>,
    pub config_path: PathBuf,
    pub listen: String,
    pub port: u16,
    /// Also kill instances not started by this process when stopping.
    pub kill_existing: bool,
    /// Leave the process running after the session ends.
    pub keep_running: bool,
}

impl Default for V2raySection {
    fn default() -> Self {
        let dir = if cfg!(windows) { "./v2ray-windows-64" } else { "./v2ray" };
        let exe = if cfg!(windows) { "v2ray.exe" } else { "v2ray" };
        Self {
            binary: Path::new(dir).join(exe),
            args: vec!["run".into(), "-config".into(), "{config}".into()],
            config_path: Path::new(dir).join("config.json"),
            listen: "127.0.0.1".to_string(),
            port: 8888,
            kill_existing: true,
            keep_running: false,
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub available_dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self { available_dir: PathBuf::from("./AvailableList") }
    }
}

impl AppConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&text)?;
        config.apply_env();
        Ok(config)
    }

    /// Apply overrides from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            self.fofa.api_key = key;
        }
    }

    /// The configured FOFA api key, or `MissingApiKey` if it is blank.
    pub fn api_key(&self) -> Result<&str> {
        let key = self.fofa.api_key.trim();
        if key.is_empty() {
            return Err(Error::MissingApiKey);
        }
        Ok(key)
    }
}
