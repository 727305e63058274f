use crate::application::sensor_store::{
    StoreSettings, DEFAULT_SENSOR_COUNT, DEFAULT_SENSOR_PREFIX, MAX_RETAINED,
};
use serde::Deserialize;
use std::time::Duration;

const CONFIG_FILE: &str = "config/dashboard";
const ENV_PREFIX: &str = "GREENHOUSE";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub instrumentation: InstrumentationSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
    #[serde(default = "default_sensor_count")]
    pub sensor_count: usize,
    #[serde(default = "default_sensor_prefix")]
    pub sensor_prefix: String,
    /// Probability in [0, 1] that a simulated sensor fails to report
    #[serde(default)]
    pub fault_rate: f64,
    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_retained: default_max_retained(),
            sensor_count: default_sensor_count(),
            sensor_prefix: default_sensor_prefix(),
            fault_rate: 0.0,
            seed: None,
        }
    }
}

impl StoreConfig {
    pub fn to_settings(&self) -> StoreSettings {
        StoreSettings {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            max_retained: self.max_retained,
            sensor_count: self.sensor_count,
            sensor_prefix: self.sensor_prefix.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuerySettings {
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InstrumentationSettings {
    /// Time production and pipeline steps; off means the no-op hook
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for InstrumentationSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_tick_interval_ms() -> u64 {
    2000
}

fn default_max_retained() -> usize {
    MAX_RETAINED
}

fn default_sensor_count() -> usize {
    DEFAULT_SENSOR_COUNT
}

fn default_sensor_prefix() -> String {
    DEFAULT_SENSOR_PREFIX.to_string()
}

fn default_page_size() -> i64 {
    20
}

/// Load `config/dashboard.*` (optional) overlaid with `GREENHOUSE__SECTION__KEY`
/// environment variables.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let config: DashboardConfig = settings.try_deserialize()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &DashboardConfig) -> anyhow::Result<()> {
    anyhow::ensure!(config.store.tick_interval_ms > 0, "store.tick_interval_ms must be positive");
    anyhow::ensure!(config.store.max_retained > 0, "store.max_retained must be positive");
    anyhow::ensure!(config.store.sensor_count > 0, "store.sensor_count must be positive");
    anyhow::ensure!(
        (0.0..=1.0).contains(&config.store.fault_rate),
        "store.fault_rate must be between 0 and 1"
    );
    anyhow::ensure!(config.query.default_page_size > 0, "query.default_page_size must be positive");
    Ok(())
}
