use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub gateway_api_url: String,
    pub gateway_key_id: String,
    pub gateway_key_secret: String,
    pub currency: String,
    pub reservation_ttl_seconds: i64,
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let gateway_api_url = env_map
            .get("GATEWAY_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("GATEWAY_API_URL".to_string()))?;

        let gateway_key_id = env_map
            .get("GATEWAY_KEY_ID")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("GATEWAY_KEY_ID".to_string()))?;

        // The callback verifier cannot run without this secret; its absence is
        // a configuration failure, never a signature mismatch.
        let gateway_key_secret = env_map
            .get("GATEWAY_KEY_SECRET")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("GATEWAY_KEY_SECRET".to_string()))?;
        if gateway_key_secret.is_empty() {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_KEY_SECRET".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let currency = env_map
            .get("STORE_CURRENCY")
            .cloned()
            .unwrap_or_else(|| "INR".to_string());

        let reservation_ttl_seconds = env_map
            .get("RESERVATION_TTL_SECONDS")
            .map(|s| s.as_str())
            .unwrap_or("7200")
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "RESERVATION_TTL_SECONDS".to_string(),
                    "must be a valid i64".to_string(),
                )
            })?;
        if reservation_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "RESERVATION_TTL_SECONDS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let sweep_interval_seconds = env_map
            .get("SWEEP_INTERVAL_SECONDS")
            .map(|s| s.as_str())
            .unwrap_or("300")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "SWEEP_INTERVAL_SECONDS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;
        if sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECONDS".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            gateway_api_url,
            gateway_key_id,
            gateway_key_secret,
            currency,
            reservation_ttl_seconds,
            sweep_interval_seconds,
        })
    }
}
