// ⚙️ Configuration - environment variables (optionally from .env)

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_TRANSACTIONS_FILE: &str = "data/transactions.json";
pub const DEFAULT_TOP_N: usize = 3;
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// TRANSACTIONS_FILE
    pub transactions_file: PathBuf,
    /// TRANSACTIONS_CACHE - load once per process instead of per query
    pub cache_records: bool,
    /// INSIGHTS_TOP_N - size of the ranking in reports
    pub top_n: usize,
    /// INSIGHTS_ADDR - API server bind address
    pub server_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            transactions_file: PathBuf::from(DEFAULT_TRANSACTIONS_FILE),
            cache_records: false,
            top_n: DEFAULT_TOP_N,
            server_addr: DEFAULT_ADDR.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key → value lookup (tests pass a closure over a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let transactions_file = lookup("TRANSACTIONS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.transactions_file);

        let cache_records = match lookup("TRANSACTIONS_CACHE") {
            Some(value) => parse_bool(&value).with_context(|| format!("Invalid TRANSACTIONS_CACHE: {:?}", value))?,
            None => defaults.cache_records,
        };

        let top_n = match lookup("INSIGHTS_TOP_N") {
            Some(value) => {
                let n: usize = value
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid INSIGHTS_TOP_N: {:?}", value))?;
                if n == 0 {
                    bail!("INSIGHTS_TOP_N must be at least 1");
                }
                n
            }
            None => defaults.top_n,
        };

        let server_addr = lookup("INSIGHTS_ADDR").unwrap_or(defaults.server_addr);

        Ok(Config {
            transactions_file,
            cache_records,
            top_n,
            server_addr,
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected true/false, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.transactions_file, PathBuf::from("data/transactions.json"));
        assert_eq!(config.top_n, 3);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TRANSACTIONS_FILE", "/data/tx.json"),
            ("TRANSACTIONS_CACHE", "yes"),
            ("INSIGHTS_TOP_N", "5"),
            ("INSIGHTS_ADDR", "127.0.0.1:8080"),
        ])
        .unwrap();

        assert_eq!(config.transactions_file, PathBuf::from("/data/tx.json"));
        assert!(config.cache_records);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.server_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_top_n_is_an_error() {
        assert!(config_from(&[("INSIGHTS_TOP_N", "three")]).is_err());
        assert!(config_from(&[("INSIGHTS_TOP_N", "0")]).is_err());
    }

    #[test]
    fn test_invalid_cache_flag_is_an_error() {
        let err = config_from(&[("TRANSACTIONS_CACHE", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("TRANSACTIONS_CACHE"));
    }
}
