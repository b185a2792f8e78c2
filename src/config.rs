use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::mcp::adapter::DEFAULT_MAX_CONCURRENT_TOOLS;

pub const DEFAULT_USER_SERVICE_URL: &str = "http://localhost:8041";
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub user_service_url: String,
    pub backend_timeout: Duration,
    pub tool_concurrency: usize,
    pub session_idle_timeout: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("USERS_MANAGEMENT_SERVICE_URL must be an http(s) URL")]
    InvalidUserServiceUrl,
    #[error("{0} must be a positive integer")]
    InvalidPositiveInteger(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = read("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = read("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8006);

        let user_service_url = read("USERS_MANAGEMENT_SERVICE_URL")
            .unwrap_or_else(|| DEFAULT_USER_SERVICE_URL.to_string());
        if !(user_service_url.starts_with("http://") || user_service_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUserServiceUrl);
        }

        let backend_timeout_secs =
            positive_integer("BACKEND_TIMEOUT_SECS", read("BACKEND_TIMEOUT_SECS"))?
                .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS);
        let tool_concurrency =
            positive_integer("MCP_TOOL_CONCURRENCY", read("MCP_TOOL_CONCURRENCY"))?
                .map(|value| value as usize)
                .unwrap_or(DEFAULT_MAX_CONCURRENT_TOOLS);
        let session_idle_timeout =
            positive_integer("MCP_SESSION_IDLE_SECS", read("MCP_SESSION_IDLE_SECS"))?
                .map(Duration::from_secs);

        let config = Self {
            bind_addr,
            bind_port,
            user_service_url,
            backend_timeout: Duration::from_secs(backend_timeout_secs),
            tool_concurrency,
            session_idle_timeout,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

fn positive_integer(key: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|value| match value.parse::<u64>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(ConfigError::InvalidPositiveInteger(key)),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = parse(&[]).expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8006);
        assert_eq!(config.user_service_url, "http://localhost:8041");
        assert_eq!(config.backend_timeout, Duration::from_secs(30));
        assert_eq!(config.tool_concurrency, DEFAULT_MAX_CONCURRENT_TOOLS);
        assert_eq!(config.session_idle_timeout, None);
    }

    #[test]
    fn reads_overrides() {
        let config = parse(&[
            ("BIND_ADDR", "0.0.0.0"),
            ("BIND_PORT", "9000"),
            ("USERS_MANAGEMENT_SERVICE_URL", "https://users.internal:8443"),
            ("MCP_TOOL_CONCURRENCY", "4"),
            ("MCP_SESSION_IDLE_SECS", "600"),
        ])
        .expect("config should parse");

        assert_eq!(config.bind_socket().expect("socket").port(), 9000);
        assert_eq!(config.user_service_url, "https://users.internal:8443");
        assert_eq!(config.tool_concurrency, 4);
        assert_eq!(config.session_idle_timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = parse(&[("BIND_PORT", "  "), ("MCP_SESSION_IDLE_SECS", "")])
            .expect("config should parse");
        assert_eq!(config.bind_port, 8006);
        assert_eq!(config.session_idle_timeout, None);
    }

    #[test]
    fn invalid_port_fails() {
        let err = parse(&[("BIND_PORT", "70000")]).expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn zero_concurrency_fails() {
        let err = parse(&[("MCP_TOOL_CONCURRENCY", "0")]).expect_err("expected invalid value");
        assert!(matches!(
            err,
            ConfigError::InvalidPositiveInteger("MCP_TOOL_CONCURRENCY")
        ));
    }

    #[test]
    fn non_http_backend_url_fails() {
        let err = parse(&[("USERS_MANAGEMENT_SERVICE_URL", "localhost:8041")])
            .expect_err("expected invalid url");
        assert!(matches!(err, ConfigError::InvalidUserServiceUrl));
    }

    #[test]
    fn invalid_bind_address_fails() {
        let err = parse(&[("BIND_ADDR", "not an address")]).expect_err("expected invalid socket");
        assert!(matches!(err, ConfigError::InvalidSocket));
    }
}
