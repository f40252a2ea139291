use dotenvy::dotenv;
use reqwest::Url;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::data_models::{CacheMode, CrawlerOptions};
use crate::error::ConfigError;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000);
const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiSettings,
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,
}

/// Everything the crawl client needs to reach the remote service.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub options: CrawlerOptions,
}

impl ApiSettings {
    pub fn new(base_url: Url) -> Self {
        ApiSettings {
            base_url,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            options: CrawlerOptions::default(),
        }
    }
}

impl Config {
    /// Load from the process environment, reading a `.env` file first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. `from_env` is this over `std::env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_url = get("CRAWL_API_URL").ok_or(ConfigError::Missing("CRAWL_API_URL"))?;
        let base_url = Url::parse(raw_url.trim()).map_err(|e| ConfigError::Invalid {
            key: "CRAWL_API_URL",
            value: raw_url.clone(),
            reason: e.to_string(),
        })?;

        let defaults = CrawlerOptions::default();
        let options = CrawlerOptions {
            word_count_threshold: parse_or_default(
                &get,
                "CRAWL_WORD_COUNT_THRESHOLD",
                defaults.word_count_threshold,
            )?,
            cache_mode: parse_or_default::<CacheMode, _>(&get, "CRAWL_CACHE_MODE", defaults.cache_mode)?,
            enable_rate_limiting: parse_bool(&get, "CRAWL_ENABLE_RATE_LIMITING", defaults.enable_rate_limiting)?,
            verbose: parse_bool(&get, "CRAWL_VERBOSE", defaults.verbose)?,
            stream: false,
        };

        let timeout_secs: u64 = parse_or_default(&get, "CRAWL_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "CRAWL_API_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        let bind_addr = parse_or_default(&get, "SUPERCRAWL_BIND", DEFAULT_BIND)?;
        let static_dir = get("SUPERCRAWL_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        Ok(Config {
            api: ApiSettings {
                base_url,
                api_key: get("CRAWL_API_KEY").map(|k| k.trim().to_string()),
                timeout: Duration::from_secs(timeout_secs),
                options,
            },
            bind_addr,
            static_dir,
        })
    }
}

fn parse_or_default<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        }
    }
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(value) = get(key) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected a boolean".to_string(),
        }),
    }
}
