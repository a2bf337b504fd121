//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let prefetch_enabled = if config.prefetch.enabled {
        "true"
    } else {
        "false"
    };

    let datasets = if config.datasets.is_empty() {
        "; ceres = https://tiles.example.org/ceres/{z}/{x}/{y}.jpg\n".to_string()
    } else {
        config
            .datasets
            .iter()
            .map(|(name, template)| format!("{} = {}\n", name, template))
            .collect::<String>()
    };

    format!(
        r#"[cache]
; Maximum number of tiles kept in process memory (default: 500)
memory_capacity = {}
; Seconds a tile stays in process memory (default: 300)
memory_ttl_secs = {}
; Seconds a tile stays in the shared Redis tier (default: 86400)
tile_ttl_secs = {}

[redis]
; Shared cache server. Accepts redis://, rediss:// and redis+unix:// URLs.
; When the server is unreachable tiles are served from memory and origin only.
url = {}
connect_timeout_ms = {}
response_timeout_ms = {}

[prefetch]
; Warm neighboring tiles in the background after each served tile
enabled = {}
; Neighborhood radius in tiles (1 = the 8 surrounding tiles)
radius = {}
; Tiles deeper than this zoom level never trigger prefetch
max_zoom = {}
; Prefetch rounds allowed to run at once
max_concurrent_rounds = {}
; Origin requests issued together, and the pause between groups
batch_size = {}
batch_pause_ms = {}
; Seconds before the same tile may trigger another round
cooldown_secs = {}
; Upper bound on remembered prefetch centers
dedup_capacity = {}

[origin]
; Timeout for a single tile request to the origin
timeout_secs = {}
max_idle_per_host = {}

[datasets]
; Additional datasets or overrides of built-in ones: name = URL template
; Templates must be http(s) URLs containing {{z}}, {{x}} and {{y}}
{}
[logging]
directory = {}
file = {}
; One of: trace, debug, info, warn, error (RUST_LOG takes precedence)
level = {}
"#,
        config.cache.memory_capacity,
        config.cache.memory_ttl_secs,
        config.cache.tile_ttl_secs,
        config.redis.url,
        config.redis.connect_timeout_ms,
        config.redis.response_timeout_ms,
        prefetch_enabled,
        config.prefetch.radius,
        config.prefetch.max_zoom,
        config.prefetch.max_concurrent_rounds,
        config.prefetch.batch_size,
        config.prefetch.batch_pause_ms,
        config.prefetch.cooldown_secs,
        config.prefetch.dedup_capacity,
        config.origin.timeout_secs,
        config.origin.max_idle_per_host,
        datasets,
        path_to_string(&config.logging.directory),
        config.logging.file,
        config.logging.level,
    )
}

/// Convert a path to string, using ~ for home directory.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
