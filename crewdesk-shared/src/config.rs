/// Configuration management for the CrewDesk node
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `BUS_CALL_TIMEOUT_MS`: Timeout for synchronous cross-service calls (default: 2000)
/// - `BUS_CALL_RETRIES`: Retry budget for idempotent read-only checks (default: 2)
/// - `TOKEN_DEFAULT_TTL_S`: Default lifetime of issued tokens in seconds (default: 3600)
/// - `TOKEN_SWEEP_INTERVAL_S`: Interval of the expired-token sweep (default: 300)
/// - `RUST_LOG`: Log level (default: info)
///
/// # Example
///
/// ```no_run
/// use crewdesk_shared::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("bus timeout: {:?}", config.bus.call_timeout);
/// # Ok(())
/// # }
/// ```
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Complete node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Action bus configuration
    pub bus: BusConfig,

    /// Token lifecycle configuration
    pub tokens: TokenConfig,
}

/// Action bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Timeout applied to every synchronous cross-service call
    pub call_timeout: Duration,

    /// Extra attempts for idempotent read-only checks (existence,
    /// authorization). Mutating calls are never retried.
    pub call_retries: u32,
}

/// Token lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Default TTL applied when the caller does not pass one
    pub default_ttl: Duration,

    /// How often the node runs the expired-token sweep
    pub sweep_interval: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            call_timeout: Duration::from_millis(2000),
            call_retries: 2,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        TokenConfig {
            default_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bus: BusConfig::default(),
            tokens: TokenConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable has an unparsable value.
    /// Missing variables fall back to the defaults above.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let call_timeout_ms = env_parse("BUS_CALL_TIMEOUT_MS", 2000u64)?;
        let call_retries = env_parse("BUS_CALL_RETRIES", 2u32)?;
        let default_ttl_s = env_parse("TOKEN_DEFAULT_TTL_S", 3600u64)?;
        let sweep_interval_s = env_parse("TOKEN_SWEEP_INTERVAL_S", 300u64)?;

        Ok(Config {
            bus: BusConfig {
                call_timeout: Duration::from_millis(call_timeout_ms),
                call_retries,
            },
            tokens: TokenConfig {
                default_ttl: Duration::from_secs(default_ttl_s),
                sweep_interval: Duration::from_secs(sweep_interval_s),
            },
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bus.call_timeout, Duration::from_millis(2000));
        assert_eq!(config.bus.call_retries, 2);
        assert_eq!(config.tokens.default_ttl, Duration::from_secs(3600));
    }
}
