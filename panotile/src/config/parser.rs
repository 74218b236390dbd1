//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [scheduler] section
    if let Some(section) = ini.section(Some("scheduler")) {
        if let Some(v) = section.get("threshold") {
            let threshold: f64 = parse_number("scheduler", "threshold", v, "must be a number")?;
            if !(threshold > 0.0 && threshold.is_finite()) {
                return Err(invalid(
                    "scheduler",
                    "threshold",
                    v,
                    "must be greater than 0",
                ));
            }
            config.scheduler.threshold = threshold;
        }
        if let Some(v) = section.get("hysteresis") {
            let hysteresis: f64 =
                parse_number("scheduler", "hysteresis", v, "must be a number")?;
            if !(hysteresis >= 0.0 && hysteresis.is_finite()) {
                return Err(invalid(
                    "scheduler",
                    "hysteresis",
                    v,
                    "must be 0 or greater",
                ));
            }
            config.scheduler.hysteresis = hysteresis;
        }
        if let Some(v) = section.get("dwell_ms") {
            config.scheduler.dwell_ms = parse_number(
                "scheduler",
                "dwell_ms",
                v,
                "must be a non-negative integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("use_prediction") {
            config.scheduler.use_prediction = parse_bool(v);
        }
        if let Some(v) = section.get("retry_cooldown_ms") {
            config.scheduler.retry_cooldown_ms = parse_number(
                "scheduler",
                "retry_cooldown_ms",
                v,
                "must be a non-negative integer (milliseconds)",
            )?;
        }
    }

    // [predictor] section
    if let Some(section) = ini.section(Some("predictor")) {
        if let Some(v) = section.get("window") {
            config.predictor.window = parse_positive("predictor", "window", v)?;
        }
        if let Some(v) = section.get("horizon") {
            config.predictor.horizon = parse_positive("predictor", "horizon", v)?;
        }
        if let Some(v) = section.get("trace_capacity") {
            config.predictor.trace_capacity = parse_number(
                "predictor",
                "trace_capacity",
                v,
                "must be a non-negative integer",
            )?;
        }
    }

    // [metrics] section
    if let Some(section) = ini.section(Some("metrics")) {
        if let Some(v) = section.get("interval_ms") {
            let interval: u64 = parse_number(
                "metrics",
                "interval_ms",
                v,
                "must be a positive integer (milliseconds)",
            )?;
            if interval == 0 {
                return Err(invalid(
                    "metrics",
                    "interval_ms",
                    v,
                    "must be a positive integer (milliseconds)",
                ));
            }
            config.metrics.interval_ms = interval;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<usize, ConfigFileError> {
    const REASON: &str = "must be a positive integer";
    match parse_number(section, key, value, REASON)? {
        0 => Err(invalid(section, key, value, REASON)),
        n => Ok(n),
    }
}

/// Parse a boolean value from a string.
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
