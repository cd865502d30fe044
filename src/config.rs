//! Runtime configuration.
//!
//! Values come from environment variables first; the binary then overlays
//! any command line flags on top (see `main.rs`).

use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Size of the unfiltered page scanned when an exact name lookup misses.
pub const SEARCH_SCAN_LIMIT: u32 = 1000;
/// Queries shorter than this (after trimming) show the normal list.
pub const MIN_SEARCH_LEN: usize = 2;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub timeout: Duration,
    pub page_size: u32,
    pub search_scan_limit: u32,
    /// Per-request retry around each HTTP call.
    pub read_retry: RetryPolicy,
    /// Retry around a whole cached query; composes with `read_retry`.
    pub query_retry: RetryPolicy,
    pub debounce: Duration,
    /// JSON file backing the key-value store.
    pub storage_path: PathBuf,
    pub log_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            search_scan_limit: SEARCH_SCAN_LIMIT,
            read_retry: RetryPolicy::reads(),
            query_retry: RetryPolicy::queries(),
            debounce: DEFAULT_DEBOUNCE,
            storage_path: PathBuf::from("data/storage.json"),
            log_path: PathBuf::from("data/pokedex.log"),
        }
    }
}

impl Config {
    /// Defaults overridden by `POKEAPI_BASE_URL`, `POKEAPI_TIMEOUT_SECS`,
    /// `POKEMON_PAGE_SIZE`, `POKEDEX_STORAGE` and `POKEDEX_LOG`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(url) = lookup("POKEAPI_BASE_URL").filter(|s| !s.trim().is_empty()) {
            cfg.base_url = url;
        }
        if let Some(secs) = lookup("POKEAPI_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = lookup("POKEMON_PAGE_SIZE")
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0)
        {
            cfg.page_size = n;
        }
        if let Some(path) = lookup("POKEDEX_STORAGE") {
            cfg.storage_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("POKEDEX_LOG") {
            cfg.log_path = PathBuf::from(path);
        }
        cfg.base_url = cfg.base_url.trim_end_matches('/').to_string();
        cfg
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Shrink retry waits; used by tests talking to a local mock server.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.read_retry = self.read_retry.with_base_delay(delay);
        self.query_retry = self.query_retry.with_base_delay(delay);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("POKEAPI_BASE_URL", "http://localhost:1234/api/"),
            ("POKEAPI_TIMEOUT_SECS", "3"),
            ("POKEMON_PAGE_SIZE", "50"),
        ]
        .into_iter()
        .collect();
        let cfg = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.base_url, "http://localhost:1234/api");
        assert_eq!(cfg.timeout, Duration::from_secs(3));
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.search_scan_limit, SEARCH_SCAN_LIMIT);
    }

    #[test]
    fn bad_values_are_ignored() {
        let cfg = Config::from_lookup(|k| match k {
            "POKEMON_PAGE_SIZE" => Some("0".into()),
            "POKEAPI_TIMEOUT_SECS" => Some("soon".into()),
            _ => None,
        });
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.timeout, DEFAULT_TIMEOUT);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }
}
