//! Runtime configuration
//!
//! Defaults mirror the built-in values; any field can be overridden from the
//! environment as `TSCAN_<SECTION>_<FIELD>`, e.g. `TSCAN_CACHE_TTL=60`.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_CACHE_TTL: u64 = 300;
pub const DEFAULT_CACHE_MAX_SIZE_MB: u64 = 500;
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Cache behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds an entry stays valid
    pub ttl: u64,
    pub enabled: bool,
    pub max_size_mb: u64,
    pub use_compression: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            enabled: true,
            max_size_mb: DEFAULT_CACHE_MAX_SIZE_MB,
            use_compression: false,
        }
    }
}

/// Tree rendering options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub max_depth: u32,
    pub enable_rich_formatting: bool,
    pub ignore_hidden: bool,
    pub ignore_patterns: Vec<String>,
    pub show_sizes: bool,
    pub use_unicode_tree: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            enable_rich_formatting: true,
            ignore_hidden: false,
            ignore_patterns: Vec::new(),
            show_sizes: true,
            use_unicode_tree: true,
        }
    }
}

/// Scan safety limits
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub follow_symlinks: bool,
    /// 0 means unlimited
    pub max_file_count: u64,
    pub pre_scan_hook: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub cache: CacheConfig,
    pub display: DisplayConfig,
    pub safety: SafetyConfig,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self> {
        let env = Env { map: &env_map };
        let mut config = Self::default();

        let cache = &mut config.cache;
        env.unsigned("CacheConfig", "ttl", &mut cache.ttl)?;
        env.flag("CacheConfig", "enabled", &mut cache.enabled)?;
        env.unsigned("CacheConfig", "max_size_mb", &mut cache.max_size_mb)?;
        env.flag("CacheConfig", "use_compression", &mut cache.use_compression)?;

        let display = &mut config.display;
        env.unsigned("DisplayConfig", "max_depth", &mut display.max_depth)?;
        env.flag("DisplayConfig", "enable_rich_formatting", &mut display.enable_rich_formatting)?;
        env.flag("DisplayConfig", "ignore_hidden", &mut display.ignore_hidden)?;
        if let Some(raw) = env.get("DisplayConfig", "ignore_patterns") {
            display.ignore_patterns = raw
                .split(',')
                .map(str::trim)
                .filter(|pattern| !pattern.is_empty())
                .map(String::from)
                .collect();
        }
        env.flag("DisplayConfig", "show_sizes", &mut display.show_sizes)?;
        env.flag("DisplayConfig", "use_unicode_tree", &mut display.use_unicode_tree)?;

        let safety = &mut config.safety;
        env.flag("SafetyConfig", "follow_symlinks", &mut safety.follow_symlinks)?;
        env.unsigned("SafetyConfig", "max_file_count", &mut safety.max_file_count)?;
        if let Some(raw) = env.get("SafetyConfig", "pre_scan_hook") {
            safety.pre_scan_hook = raw.to_string();
        }

        Ok(config)
    }
}

struct Env<'a> {
    map: &'a HashMap<String, String>,
}

impl Env<'_> {
    fn key(container: &str, field: &str) -> String {
        let section = container.trim_end_matches("Config").to_uppercase();
        format!("TSCAN_{}_{}", section, field.to_uppercase())
    }

    fn get(&self, container: &str, field: &str) -> Option<&str> {
        self.map.get(&Self::key(container, field)).map(String::as_str)
    }

    fn unsigned<T>(&self, container: &str, field: &str, slot: &mut T) -> Result<()>
    where
        T: FromStr,
    {
        let Some(raw) = self.get(container, field) else {
            return Ok(());
        };
        let raw = raw.trim();
        if raw.parse::<i64>().is_ok_and(|n| n < 0) {
            return Err(Error::validation(
                field,
                format!("{}.{} must be a non-negative integer.", container, field),
            ));
        }
        *slot = raw.parse().map_err(|_| type_error(container, field, "integer"))?;
        Ok(())
    }

    fn flag(&self, container: &str, field: &str, slot: &mut bool) -> Result<()> {
        let Some(raw) = self.get(container, field) else {
            return Ok(());
        };
        *slot = match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => return Err(type_error(container, field, "bool")),
        };
        Ok(())
    }
}

fn type_error(container: &str, field: &str, type_name: &str) -> Error {
    Error::validation(
        field,
        format!("{}.{} must be of type {}.", container, field, type_name),
    )
}
