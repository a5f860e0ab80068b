//! Configuration module

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: IpAddr,

    /// Server port
    pub port: u16,

    /// Fitted preprocessor export (JSON)
    pub preprocessor_path: String,

    /// Tree-ensemble model (JSON)
    pub model_path: String,

    /// Environment (development, production)
    pub environment: String,

    /// Force JSON log lines regardless of environment
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            preprocessor_path: "preprocessor.json".to_string(),
            model_path: "xgboost_model.json".to_string(),
            environment: "development".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST")
                .and_then(|h| h.parse().ok())
                .unwrap_or(defaults.host),

            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            preprocessor_path: lookup("PREPROCESSOR_PATH")
                .unwrap_or(defaults.preprocessor_path),

            model_path: lookup("MODEL_PATH")
                .unwrap_or(defaults.model_path),

            environment: lookup("ENVIRONMENT")
                .unwrap_or(defaults.environment),

            json_logs: lookup("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// JSON logs in production or when explicitly requested
    pub fn use_json_logs(&self) -> bool {
        self.json_logs || self.is_production()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config.port, 8000);
        assert_eq!(config.preprocessor_path, "preprocessor.json");
        assert_eq!(config.model_path, "xgboost_model.json");
        assert!(!config.use_json_logs());
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8000");
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "not-a-port"),
            ("MODEL_PATH", "/models/booster.json"),
            ("ENVIRONMENT", "production"),
        ]));
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.model_path, "/models/booster.json");
        assert!(config.is_production());
        assert!(config.use_json_logs());
    }

    #[test]
    fn test_log_format_json() {
        let config = Config::from_lookup(lookup_from(&[("LOG_FORMAT", "JSON")]));
        assert!(config.use_json_logs());
    }
}
