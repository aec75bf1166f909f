//! HTTP server settings loaded with the `config` crate

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Server settings, read from `APP_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Bind address (`APP_HOST`, default: 0.0.0.0)
    pub host: String,
    /// Bind port (`APP_PORT`, default: 8000)
    pub port: u16,
    /// Items per page on list endpoints (`APP_PAGE_SIZE`, default: 10)
    pub page_size: i64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000_i64)?
            .set_default("page_size", 10_i64)?
            .add_source(Environment::with_prefix("APP").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if settings.page_size < 1 {
            return Err(ConfigError::Message(
                "APP_PAGE_SIZE must be at least 1".to_string(),
            ));
        }

        Ok(settings)
    }

    /// Socket address to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
