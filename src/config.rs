use serde::{Deserialize, Serialize};

pub const DEFAULT_API_ENDPOINT: &str = "https://opentip.kaspersky.com/api/v1/search/domain";

// The lookup service rejects unknown clients, so a browser identifier is sent by default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36 Edg/136.0.0.0";

const DEFAULT_TIMEOUT_SECONDS: u64 = 40;
const DEFAULT_REQUESTS_PER_SECOND: f64 = 1.0;
const DEFAULT_MAX_RESPONSE_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_endpoint: String,
    pub request_timeout_seconds: u64,
    pub requests_per_second: f64,
    pub accept_invalid_certs: bool,
    pub user_agent: String,
    pub max_response_size: usize,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigData {
    pub api_endpoint: String,
    pub request_timeout_seconds: u64,
    pub requests_per_second: f64,
    pub accept_invalid_certs: bool,
    pub user_agent: String,
    pub max_response_size: usize,
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            request_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            accept_invalid_certs: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            show_progress: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = Config::default();

        let mut settings = config::Config::builder()
            .set_default("api_endpoint", defaults.api_endpoint)?
            .set_default("request_timeout_seconds", defaults.request_timeout_seconds)?
            .set_default("requests_per_second", defaults.requests_per_second)?
            .set_default("accept_invalid_certs", defaults.accept_invalid_certs)?
            .set_default("user_agent", defaults.user_agent)?
            .set_default("max_response_size", defaults.max_response_size as i64)?
            .set_default("show_progress", defaults.show_progress)?;

        // Override with environment variables if present
        settings = Self::apply_env_overrides(settings)?;

        let config_data: ConfigData = settings.build()?.try_deserialize()?;
        let config = Config::from(config_data);
        config.validate()?;

        Ok(config)
    }

    /// Rejects values that would make every lookup fail in the same way.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        url::Url::parse(&self.api_endpoint).map_err(|e| {
            config::ConfigError::Message(format!("Invalid API endpoint '{}': {}", self.api_endpoint, e))
        })?;

        if self.request_timeout_seconds == 0 {
            return Err(config::ConfigError::Message(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }

        if !self.requests_per_second.is_finite() || self.requests_per_second < 0.0 {
            return Err(config::ConfigError::Message(format!(
                "Requests per second must be a non-negative number, got {}",
                self.requests_per_second
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(mut settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let env_mappings = [
            ("OPENTIP_API_ENDPOINT", "api_endpoint"),
            ("OPENTIP_TIMEOUT_SECONDS", "request_timeout_seconds"),
            ("OPENTIP_TIMEOUT", "request_timeout_seconds"),
            ("OPENTIP_REQUESTS_PER_SECOND", "requests_per_second"),
            ("OPENTIP_ACCEPT_INVALID_CERTS", "accept_invalid_certs"),
            ("OPENTIP_USER_AGENT", "user_agent"),
            ("OPENTIP_MAX_RESPONSE_SIZE", "max_response_size"),
            ("OPENTIP_SHOW_PROGRESS", "show_progress"),
        ];

        for (env_var, config_key) in env_mappings {
            if let Ok(value) = std::env::var(env_var) {
                settings = settings.set_override(config_key, value)?;
            }
        }

        Ok(settings)
    }
}

impl From<ConfigData> for Config {
    fn from(data: ConfigData) -> Self {
        Self {
            api_endpoint: data.api_endpoint,
            request_timeout_seconds: data.request_timeout_seconds,
            requests_per_second: data.requests_per_second,
            accept_invalid_certs: data.accept_invalid_certs,
            user_agent: data.user_agent,
            max_response_size: data.max_response_size,
            show_progress: data.show_progress,
        }
    }
}
