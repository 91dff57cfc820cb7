//! Configuration module for environment variable parsing.
//!
//! Every setting has a default so the relay starts with an empty environment.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

/// Default listen address when `LISTEN_ADDR` is absent.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,

    /// Public base URL used when rendering `proxy_url` (e.g. "https://relay.example.com")
    pub public_url: Option<String>,

    /// Timeout for a single forwarded delivery, in milliseconds
    pub forward_timeout_ms: u64,

    /// Largest request body the relay will capture, in bytes
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: parse_listen_addr(DEFAULT_LISTEN_ADDR)
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080))),
            public_url: None,
            forward_timeout_ms: 5000,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let listen_addr = match env::var("LISTEN_ADDR") {
            Ok(raw) if !raw.trim().is_empty() => parse_listen_addr(&raw).unwrap_or_else(|| {
                warn!(env_var = "LISTEN_ADDR", value = %raw, "Invalid listen address, using default");
                defaults.listen_addr
            }),
            _ => defaults.listen_addr,
        };

        Config {
            listen_addr,

            public_url: env::var("PUBLIC_URL")
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),

            forward_timeout_ms: parse_number("FORWARD_TIMEOUT_MS", defaults.forward_timeout_ms),

            max_body_bytes: parse_number("MAX_BODY_BYTES", defaults.max_body_bytes),
        }
    }

    /// Forwarding timeout as a `Duration`.
    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }
}

/// Parse a listen address, accepting the port-only form ":8080".
fn parse_listen_addr(raw: &str) -> Option<SocketAddr> {
    let raw = raw.trim();
    let candidate = if raw.starts_with(':') {
        format!("0.0.0.0{}", raw)
    } else {
        raw.to_string()
    };
    candidate.parse().ok()
}

/// Parse a numeric variable, falling back to `default` when absent or invalid.
fn parse_number<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listen_addr_port_only() {
        let addr = parse_listen_addr(":9090").unwrap();
        assert_eq!(addr, SocketAddr::from(([0, 0, 0, 0], 9090)));
    }

    #[test]
    fn test_parse_listen_addr_full() {
        let addr = parse_listen_addr("127.0.0.1:3000").unwrap();
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 3000)));
    }

    #[test]
    fn test_parse_listen_addr_invalid() {
        assert!(parse_listen_addr("not-an-address").is_none());
    }

    #[test]
    fn test_parse_number_valid() {
        env::set_var("TEST_RELAY_NUMBER", "1234");
        assert_eq!(parse_number("TEST_RELAY_NUMBER", 5u64), 1234);
        env::remove_var("TEST_RELAY_NUMBER");
    }

    #[test]
    fn test_parse_number_invalid_uses_default() {
        env::set_var("TEST_RELAY_NUMBER_BAD", "soon");
        assert_eq!(parse_number("TEST_RELAY_NUMBER_BAD", 5u64), 5);
        env::remove_var("TEST_RELAY_NUMBER_BAD");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.forward_timeout(), Duration::from_secs(5));
        assert!(config.public_url.is_none());
    }
}
