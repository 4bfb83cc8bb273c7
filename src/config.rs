//! Config Store (§4.I, §6, §9 "Config persistence frequency").
//!
//! A flat `NAME = VALUE` file, one entry per tunable, loaded once at startup
//! and rewritten in full on every explicit save. There is no crate dependency
//! here deliberately: the format is a dozen lines of well-known scalar
//! fields, and a general `serde` + ini/toml stack would buy nothing but its
//! own format quirks to work around.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const HEADER: &str = "; kat configuration file\n\
; lines starting with ';' or '#' are comments\n\
; format: NAME = VALUE\n";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine a writable config directory")]
    NoHome,
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Identifies one of the 13 tunables, in the declaration order used for
/// `save()`'s full rewrite and for the panel's navigable row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    MouseSpeed,
    MovementIntervalSlowMs,
    MovementIntervalFastMs,
    MovementAccelerationTime,
    JumpHorizontal,
    JumpVertical,
    JumpDiagonal,
    JumpMargin,
    JumpIntervalMs,
    ScrollSpeed,
    ScrollIntervalMs,
    AutoscrollSpeed,
    AutoscrollIntervalMs,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::MouseSpeed,
        Field::MovementIntervalSlowMs,
        Field::MovementIntervalFastMs,
        Field::MovementAccelerationTime,
        Field::JumpHorizontal,
        Field::JumpVertical,
        Field::JumpDiagonal,
        Field::JumpMargin,
        Field::JumpIntervalMs,
        Field::ScrollSpeed,
        Field::ScrollIntervalMs,
        Field::AutoscrollSpeed,
        Field::AutoscrollIntervalMs,
    ];

    pub fn key_name(self) -> &'static str {
        match self {
            Field::MouseSpeed => "MOUSE_SPEED",
            Field::MovementIntervalSlowMs => "MOVEMENT_INTERVAL_SLOW_MS",
            Field::MovementIntervalFastMs => "MOVEMENT_INTERVAL_FAST_MS",
            Field::MovementAccelerationTime => "MOVEMENT_ACCELERATION_TIME",
            Field::JumpHorizontal => "JUMP_HORIZONTAL",
            Field::JumpVertical => "JUMP_VERTICAL",
            Field::JumpDiagonal => "JUMP_DIAGONAL",
            Field::JumpMargin => "JUMP_MARGIN",
            Field::JumpIntervalMs => "JUMP_INTERVAL_MS",
            Field::ScrollSpeed => "SCROLL_SPEED",
            Field::ScrollIntervalMs => "SCROLL_INTERVAL_MS",
            Field::AutoscrollSpeed => "AUTOSCROLL_SPEED",
            Field::AutoscrollIntervalMs => "AUTOSCROLL_INTERVAL_MS",
        }
    }

    pub fn from_key_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key_name() == name)
    }

    pub fn min(self) -> f64 {
        match self {
            Field::MouseSpeed => 1.0,
            Field::MovementIntervalSlowMs => 1.0,
            Field::MovementIntervalFastMs => 1.0,
            Field::MovementAccelerationTime => 0.1,
            Field::JumpHorizontal => 0.0,
            Field::JumpVertical => 0.0,
            Field::JumpDiagonal => 0.0,
            Field::JumpMargin => 0.0,
            Field::JumpIntervalMs => 1.0,
            Field::ScrollSpeed => 0.01,
            Field::ScrollIntervalMs => 1.0,
            Field::AutoscrollSpeed => 0.01,
            Field::AutoscrollIntervalMs => 1.0,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            Field::MovementAccelerationTime | Field::ScrollSpeed | Field::AutoscrollSpeed
        )
    }

    /// Whether this field uses the dual-granularity (0.01 / 0.1) step rule
    /// instead of the uniform `±0.1 * multiplier` real-valued step.
    pub fn is_dual_granularity(self) -> bool {
        matches!(self, Field::ScrollSpeed | Field::AutoscrollSpeed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub mouse_speed: i64,
    pub movement_interval_slow_ms: i64,
    pub movement_interval_fast_ms: i64,
    pub movement_acceleration_time: f64,
    pub jump_horizontal: i64,
    pub jump_vertical: i64,
    pub jump_diagonal: i64,
    pub jump_margin: i64,
    pub jump_interval_ms: i64,
    pub scroll_speed: f64,
    pub scroll_interval_ms: i64,
    pub autoscroll_speed: f64,
    pub autoscroll_interval_ms: i64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            mouse_speed: 5,
            movement_interval_slow_ms: 64,
            movement_interval_fast_ms: 8,
            movement_acceleration_time: 0.4,
            jump_horizontal: 100,
            jump_vertical: 100,
            jump_diagonal: 100,
            jump_margin: 20,
            jump_interval_ms: 80,
            scroll_speed: 1.00,
            scroll_interval_ms: 100,
            autoscroll_speed: 0.01,
            autoscroll_interval_ms: 24,
        }
    }
}

impl Config {
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::MouseSpeed => self.mouse_speed as f64,
            Field::MovementIntervalSlowMs => self.movement_interval_slow_ms as f64,
            Field::MovementIntervalFastMs => self.movement_interval_fast_ms as f64,
            Field::MovementAccelerationTime => self.movement_acceleration_time,
            Field::JumpHorizontal => self.jump_horizontal as f64,
            Field::JumpVertical => self.jump_vertical as f64,
            Field::JumpDiagonal => self.jump_diagonal as f64,
            Field::JumpMargin => self.jump_margin as f64,
            Field::JumpIntervalMs => self.jump_interval_ms as f64,
            Field::ScrollSpeed => self.scroll_speed,
            Field::ScrollIntervalMs => self.scroll_interval_ms as f64,
            Field::AutoscrollSpeed => self.autoscroll_speed,
            Field::AutoscrollIntervalMs => self.autoscroll_interval_ms as f64,
        }
    }

    pub fn set(&mut self, field: Field, value: f64) {
        match field {
            Field::MouseSpeed => self.mouse_speed = value.round() as i64,
            Field::MovementIntervalSlowMs => self.movement_interval_slow_ms = value.round() as i64,
            Field::MovementIntervalFastMs => self.movement_interval_fast_ms = value.round() as i64,
            Field::MovementAccelerationTime => self.movement_acceleration_time = value,
            Field::JumpHorizontal => self.jump_horizontal = value.round() as i64,
            Field::JumpVertical => self.jump_vertical = value.round() as i64,
            Field::JumpDiagonal => self.jump_diagonal = value.round() as i64,
            Field::JumpMargin => self.jump_margin = value.round() as i64,
            Field::JumpIntervalMs => self.jump_interval_ms = value.round() as i64,
            Field::ScrollSpeed => self.scroll_speed = value,
            Field::ScrollIntervalMs => self.scroll_interval_ms = value.round() as i64,
            Field::AutoscrollSpeed => self.autoscroll_speed = value,
            Field::AutoscrollIntervalMs => self.autoscroll_interval_ms = value.round() as i64,
        }
    }

    /// Formats a field's current value the way `save()` writes it:
    /// integers with `%d`, reals with `%.1f`, except SCROLL_SPEED and
    /// AUTOSCROLL_SPEED which use `%.2f`.
    pub fn format(&self, field: Field) -> String {
        if field.is_integer() {
            format!("{}", self.get(field) as i64)
        } else if field.is_dual_granularity() {
            format!("{:.2}", self.get(field))
        } else {
            format!("{:.1}", self.get(field))
        }
    }

    /// Adjusts `field` by one step in `direction` (true = increase), scaled
    /// by the auto-repeat multiplier, then clamps to the field's minimum.
    pub fn adjust(&mut self, field: Field, increase: bool, multiplier: u32) {
        let current = self.get(field);
        let delta = if field.is_dual_granularity() {
            dual_granularity_delta(current, increase, multiplier)
        } else if field.is_integer() {
            multiplier as f64 * if increase { 1.0 } else { -1.0 }
        } else {
            0.1 * multiplier as f64 * if increase { 1.0 } else { -1.0 }
        };
        let next = (current + delta).max(field.min());
        self.set(field, next);
    }

    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Config::default();
                cfg.save(path)?;
                return Ok(cfg);
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut cfg = Config::default();
        let mut seen = std::collections::HashSet::new();
        for line in text.lines() {
            if let Some((name, value)) = parse_line(line) {
                if let Some(field) = Field::from_key_name(&name) {
                    cfg.set(field, value);
                    seen.insert(field.key_name());
                }
                // Unknown names are ignored, per spec.
            }
        }

        let missing: Vec<Field> = Field::ALL
            .into_iter()
            .filter(|f| !seen.contains(f.key_name()))
            .collect();
        if !missing.is_empty() {
            append_missing(path, &cfg, &missing)?;
        }

        Ok(cfg)
    }

    /// Rewrites the config file in full: fixed header, all 13 entries in
    /// declaration order. Used on every explicit save (adjustment debounce
    /// flush, panel hide, shutdown).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut body = String::from(HEADER);
        for field in Field::ALL {
            body.push_str(&format!("{} = {}\n", field.key_name(), self.format(field)));
        }
        fs::write(path, body).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn append_missing(path: &Path, cfg: &Config, missing: &[Field]) -> Result<(), ConfigError> {
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    for field in missing {
        writeln!(file, "{} = {}", field.key_name(), cfg.format(*field)).map_err(|source| {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
    }
    Ok(())
}

/// Parses one config line into `(NAME, VALUE)`. Returns `None` for comments,
/// blank lines, and anything else malformed — malformed lines are skipped
/// silently, per §7.
fn parse_line(line: &str) -> Option<(String, f64)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
        return None;
    }
    // Strip a trailing inline comment.
    let code_part = trimmed
        .split(';')
        .next()
        .unwrap_or(trimmed)
        .split('#')
        .next()
        .unwrap_or(trimmed);
    let (name, value) = code_part.split_once('=')?;
    let value: f64 = value.trim().parse().ok()?;
    Some((name.trim().to_string(), value))
}

/// Resolves the config file path: `$HOME/.config/kat/config.ini`, falling
/// back to `/tmp/.config/kat/config.ini` when `$HOME` is unset.
pub fn default_config_path() -> PathBuf {
    let base = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    base.join(".config").join("kat").join("config.ini")
}

/// Repeat-rate multiplier from hold duration, per §4.D.
pub fn repeat_multiplier(held: Duration) -> u32 {
    let secs = held.as_secs_f64();
    if secs < 0.4 {
        1
    } else if secs < 0.8 {
        2
    } else if secs < 1.2 {
        4
    } else if secs < 1.6 {
        8
    } else if secs < 2.0 {
        16
    } else {
        32
    }
}

/// Half the minimum dual-granularity step, used as the epsilon for the
/// `current < 0.1 + eps` boundary check instead of the original's
/// `current <= 0.10000001` kludge (§9).
const GRANULARITY_EPSILON: f64 = 0.005;

fn dual_granularity_delta(current: f64, increase: bool, multiplier: u32) -> f64 {
    let unit = if current < 0.1 + GRANULARITY_EPSILON {
        0.01
    } else {
        0.1
    };
    if increase {
        return unit * multiplier as f64;
    }
    let coarse = -(unit * multiplier as f64);
    if unit == 0.1 && current + coarse < 0.1 {
        -(multiplier as f64 * 0.01)
    } else {
        coarse
    }
}

/// Used by the router at startup to get a concrete timestamp for the
/// debounced-save timer; kept here so `movement.rs`/`router.rs` don't each
/// invent their own notion of "now".
pub fn now() -> Instant {
    Instant::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_table() {
        let cfg = Config::default();
        assert_eq!(cfg.mouse_speed, 5);
        assert_eq!(cfg.jump_margin, 20);
        assert!((cfg.scroll_speed - 1.0).abs() < f64::EPSILON);
        assert!((cfg.autoscroll_speed - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn format_uses_declared_precision() {
        let cfg = Config::default();
        assert_eq!(cfg.format(Field::MouseSpeed), "5");
        assert_eq!(cfg.format(Field::MovementAccelerationTime), "0.4");
        assert_eq!(cfg.format(Field::ScrollSpeed), "1.00");
    }

    #[test]
    fn adjust_clamps_to_minimum() {
        let mut cfg = Config::default();
        cfg.mouse_speed = 1;
        cfg.adjust(Field::MouseSpeed, false, 32);
        assert_eq!(cfg.mouse_speed, 1);
    }

    #[test]
    fn dual_granularity_switches_unit_at_boundary() {
        // Just above the minimum: fine 0.01 steps.
        assert_eq!(dual_granularity_delta(0.05, true, 1), 0.01);
        // Comfortably above 0.1: coarse 0.1 steps.
        assert_eq!(dual_granularity_delta(0.5, true, 1), 0.1);
        // Decreasing from just above 0.1 with a coarse step would undershoot
        // the boundary, so it falls back to a fine step instead.
        assert_eq!(dual_granularity_delta(0.15, false, 1), -0.01);
    }

    #[test]
    fn parse_line_skips_comments_and_malformed() {
        assert_eq!(parse_line("; comment"), None);
        assert_eq!(parse_line("# comment"), None);
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("garbage"), None);
        assert_eq!(
            parse_line("MOUSE_SPEED = 7 ; inline comment"),
            Some(("MOUSE_SPEED".to_string(), 7.0))
        );
    }

    #[test]
    fn round_trip_is_byte_stable() {
        let dir = std::env::temp_dir().join(format!("kat-test-{:?}", std::thread::current().id()));
        let path = dir.join("config.ini");
        let cfg = Config::default();
        cfg.save(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        cfg.save(&path).unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, cfg);
        let _ = fs::remove_dir_all(&dir);
    }
}
