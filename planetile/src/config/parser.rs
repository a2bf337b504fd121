//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::defaults::{LOG_LEVELS, MAX_MEMORY_TTL_SECS, MAX_RADIUS, MAX_TILE_TTL_SECS};
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::coord::{DatasetId, MAX_ZOOM};
use crate::provider::UrlTemplate;

/// URL schemes accepted for the distributed tier.
const REDIS_SCHEMES: [&str; 3] = ["redis://", "rediss://", "redis+unix://"];

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        let s = Section::new("cache", section);
        s.number("memory_capacity", 1, u64::MAX, &mut config.cache.memory_capacity)?;
        s.number("memory_ttl_secs", 1, MAX_MEMORY_TTL_SECS, &mut config.cache.memory_ttl_secs)?;
        s.number("tile_ttl_secs", 1, MAX_TILE_TTL_SECS, &mut config.cache.tile_ttl_secs)?;
    }

    // [redis] section
    if let Some(section) = ini.section(Some("redis")) {
        let s = Section::new("redis", section);
        if let Some(v) = s.get("url") {
            if !REDIS_SCHEMES.iter().any(|scheme| v.starts_with(scheme)) {
                return Err(s.invalid(
                    "url",
                    v,
                    "must start with redis://, rediss:// or redis+unix://",
                ));
            }
            config.redis.url = v.to_string();
        }
        s.number("connect_timeout_ms", 1, 60_000, &mut config.redis.connect_timeout_ms)?;
        s.number("response_timeout_ms", 1, 60_000, &mut config.redis.response_timeout_ms)?;
    }

    // [prefetch] section
    if let Some(section) = ini.section(Some("prefetch")) {
        let s = Section::new("prefetch", section);
        if let Some(v) = s.get("enabled") {
            config.prefetch.enabled = parse_bool(v);
        }
        s.number("radius", 0, MAX_RADIUS, &mut config.prefetch.radius)?;
        s.number("max_zoom", 0, MAX_ZOOM, &mut config.prefetch.max_zoom)?;
        s.number("max_concurrent_rounds", 1, 256, &mut config.prefetch.max_concurrent_rounds)?;
        s.number("batch_size", 1, 64, &mut config.prefetch.batch_size)?;
        s.number("batch_pause_ms", 0, 10_000, &mut config.prefetch.batch_pause_ms)?;
        s.number("cooldown_secs", 0, 3_600, &mut config.prefetch.cooldown_secs)?;
        s.number("dedup_capacity", 1, 1_000_000, &mut config.prefetch.dedup_capacity)?;
    }

    // [origin] section
    if let Some(section) = ini.section(Some("origin")) {
        let s = Section::new("origin", section);
        s.number("timeout_secs", 1, 300, &mut config.origin.timeout_secs)?;
        s.number("max_idle_per_host", 0, 1_024, &mut config.origin.max_idle_per_host)?;
    }

    // [datasets] section: every key is a dataset name
    if let Some(section) = ini.section(Some("datasets")) {
        let s = Section::new("datasets", section);
        for (name, template) in section.iter() {
            let template = template.trim();
            let dataset = DatasetId::new(name.trim())
                .map_err(|e| s.invalid(name, template, e.to_string()))?;
            UrlTemplate::parse(&dataset, template)
                .map_err(|e| s.invalid(name, template, e.to_string()))?;
            config
                .datasets
                .insert(dataset.to_string(), template.to_string());
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        let s = Section::new("logging", section);
        if let Some(v) = s.get("directory") {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = s.get("file") {
            if v.contains('/') || v.contains('\\') {
                return Err(s.invalid("file", v, "must be a file name, not a path"));
            }
            config.logging.file = v.to_string();
        }
        if let Some(v) = s.get("level") {
            let level = v.to_lowercase();
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(s.invalid(
                    "level",
                    v,
                    "must be one of: trace, debug, info, warn, error",
                ));
            }
            config.logging.level = level;
        }
    }

    Ok(config)
}

/// One INI section with its name, for error reporting.
struct Section<'a> {
    name: &'static str,
    properties: &'a Properties,
}

impl<'a> Section<'a> {
    fn new(name: &'static str, properties: &'a Properties) -> Self {
        Self { name, properties }
    }

    /// Trimmed, non-empty value of `key`.
    fn get(&self, key: &str) -> Option<&'a str> {
        self.properties
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn invalid(&self, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Parse `key` as a number within `[min, max]` into `target`, if present.
    fn number<T>(&self, key: &str, min: T, max: T, target: &mut T) -> Result<(), ConfigFileError>
    where
        T: FromStr + PartialOrd + Display + Copy,
    {
        let Some(v) = self.get(key) else {
            return Ok(());
        };

        let reason = || format!("expected a whole number between {} and {}", min, max);
        let parsed: T = v.parse().map_err(|_| self.invalid(key, v, reason()))?;
        if parsed < min || parsed > max {
            return Err(self.invalid(key, v, reason()));
        }

        *target = parsed;
        Ok(())
    }
}

/// Parse a boolean value leniently.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
