use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Highest `num` the image-search API accepts for one call.
pub const MAX_RESULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    pub label: String,
    /// Name of the environment variable holding the scope id.
    #[serde(default)]
    pub scope_env: Option<String>,
    /// Literal scope id; wins over `scope_env`.
    #[serde(default)]
    pub scope_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub web_port: u16,
    pub static_directory: String,
    pub log_level: String,
    pub credentials_env: String,
    pub provider_endpoint: String,
    pub request_timeout_secs: u64,
    pub max_concurrency: usize,
    pub result_limit: usize,
    pub query_suffix: String,
    pub cooldown_ms: u64,
    #[serde(default)]
    pub max_requests_per_second: Option<u32>,
    #[serde(default)]
    pub default_category: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

impl AppConfig {
    pub fn new(config_path: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("web_port", 8888)?
            .set_default("static_directory", "./static")?
            .set_default("log_level", "info")?
            .set_default("credentials_env", "GOOGLE_KEYS")?
            .set_default("provider_endpoint", "https://www.googleapis.com/customsearch/v1")?
            .set_default("request_timeout_secs", 20)?
            .set_default("max_concurrency", 4)?
            .set_default("result_limit", 5)?
            .set_default("query_suffix", "photo")?
            .set_default("cooldown_ms", 1000)?
            .add_source(File::with_name(config_path))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("IMAGE_BATCH").separator("__"))
            .build()?;

        let mut cfg: AppConfig = s.try_deserialize()?;
        cfg.normalize();
        Ok(cfg)
    }

    fn normalize(&mut self) {
        if self.max_concurrency == 0 {
            log::warn!("max_concurrency of 0 would stall every batch, using 1");
            self.max_concurrency = 1;
        }
        let clamped = self.result_limit.clamp(1, MAX_RESULT_LIMIT);
        if clamped != self.result_limit {
            log::warn!("result_limit {} out of range, using {}", self.result_limit, clamped);
            self.result_limit = clamped;
        }
    }

    /// Raw comma-separated credential list from the configured variable.
    pub fn credential_list(&self) -> Option<String> {
        std::env::var(&self.credentials_env).ok().filter(|v| !v.trim().is_empty())
    }
}
