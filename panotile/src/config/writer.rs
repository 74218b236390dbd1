//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let use_prediction = if config.scheduler.use_prediction {
        "true"
    } else {
        "false"
    };

    format!(
        r#"[scheduler]
; Squared normalized distance from the viewport point to a tile center at or
; below which the tile is fetched and played (default: 0.1)
threshold = {}
; Extra squared distance beyond the threshold before a playing tile is paused.
; 0 pauses as soon as the threshold is crossed (default: 0.0)
hysteresis = {}
; How long a tile must stay beyond the eviction boundary before it is paused,
; in milliseconds (default: 0)
dwell_ms = {}
; Also admit tiles near the predicted viewport point (default: false)
use_prediction = {}
; Wait this long after a failed fetch before fetching the tile again,
; in milliseconds (default: 0 = retry on the next viewport update)
retry_cooldown_ms = {}

[predictor]
; Viewport samples per regression window (default: 5)
window = {}
; Forecast steps computed per window (default: 5)
horizon = {}
; Trajectory trace entries kept for reports (default: 100)
trace_capacity = {}

[metrics]
; Interval between metrics snapshots in milliseconds (default: 2000)
interval_ms = {}

[logging]
; Log file path (default: ~/.panotile/panotile.log)
file = {}
"#,
        config.scheduler.threshold,
        config.scheduler.hysteresis,
        config.scheduler.dwell_ms,
        use_prediction,
        config.scheduler.retry_cooldown_ms,
        config.predictor.window,
        config.predictor.horizon,
        config.predictor.trace_capacity,
        config.metrics.interval_ms,
        path_to_string(&config.logging.file),
    )
}

/// Convert a path to string, replacing home directory with ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
