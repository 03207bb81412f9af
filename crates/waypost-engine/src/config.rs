//! Engine configuration, validation, and the shared runtime view.
//!
//! [`EngineConfig`] is the host-facing input, validated before any engine
//! state exists. `SharedConfig` is the atomics-backed form the tick thread
//! and mutation callers read concurrently; it is owned by the engine and
//! handed around explicitly, never a process-wide singleton.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── EngineConfig ───────────────────────────────────────────────────

/// Global engine configuration.
///
/// Serializable so hosts can load it from their own config file; every
/// field also has a runtime setter on the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// When enabled, an entity in a stealthed state has its live marker
    /// withheld from every viewer. Default: `true`.
    pub stealth_suppression: bool,
    /// When enabled, a dimension change leaves an anchor marker at the
    /// entity's last known position. Default: `false`.
    pub anchor_feature: bool,
    /// Maximum distance at which a live marker is rendered from its viewer;
    /// farther targets are projected back to this range. Default: `50.0`.
    pub projection_distance: f64,
    /// Period of the reconciliation tick. Default: 50 ms.
    pub tick_interval: Duration,
    /// Native-marker transmit range restored to an entity on
    /// unregistration. Default: `999_999.0`.
    pub fallback_suppression_range: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stealth_suppression: true,
            anchor_feature: false,
            projection_distance: 50.0,
            tick_interval: Duration::from_millis(50),
            fallback_suppression_range: 999_999.0,
        }
    }
}

impl EngineConfig {
    /// Check structural invariants before the engine starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_projection_distance(self.projection_distance)?;
        validate_tick_interval(self.tick_interval)?;
        if !self.fallback_suppression_range.is_finite() || self.fallback_suppression_range < 0.0 {
            return Err(ConfigError::InvalidSuppressionRange {
                value: self.fallback_suppression_range,
            });
        }
        Ok(())
    }
}

/// Shared validation for the construction and runtime-setter paths.
pub(crate) fn validate_projection_distance(value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidProjectionDistance { value });
    }
    Ok(())
}

/// Tick intervals must be strictly positive; a zero interval would spin.
pub(crate) fn validate_tick_interval(value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::ZeroTickInterval);
    }
    Ok(())
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected validating an [`EngineConfig`] or a runtime setter.
///
/// Invalid input is rejected at the boundary, before any engine state
/// mutates.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `projection_distance` is NaN, infinite, zero, or negative.
    InvalidProjectionDistance {
        /// The rejected value.
        value: f64,
    },
    /// `tick_interval` is zero.
    ZeroTickInterval,
    /// `fallback_suppression_range` is NaN, infinite, or negative.
    InvalidSuppressionRange {
        /// The rejected value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProjectionDistance { value } => {
                write!(f, "projection_distance must be finite and positive, got {value}")
            }
            Self::ZeroTickInterval => write!(f, "tick_interval must be non-zero"),
            Self::InvalidSuppressionRange { value } => {
                write!(
                    f,
                    "fallback_suppression_range must be finite and non-negative, got {value}"
                )
            }
        }
    }
}

impl Error for ConfigError {}

// ── SharedConfig ───────────────────────────────────────────────────

/// Atomics-backed configuration cells shared between the tick thread and
/// mutation callers.
///
/// Each cell is independent — a tick may observe a mix of old and new
/// values across cells, but never a torn single value. `Relaxed` ordering
/// suffices: no cell synchronizes access to any other state.
#[derive(Debug)]
pub(crate) struct SharedConfig {
    stealth_suppression: AtomicBool,
    anchor_feature: AtomicBool,
    projection_distance: AtomicU64,
    fallback_suppression_range: AtomicU64,
    tick_interval_nanos: AtomicU64,
}

impl SharedConfig {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            stealth_suppression: AtomicBool::new(config.stealth_suppression),
            anchor_feature: AtomicBool::new(config.anchor_feature),
            projection_distance: AtomicU64::new(config.projection_distance.to_bits()),
            fallback_suppression_range: AtomicU64::new(
                config.fallback_suppression_range.to_bits(),
            ),
            tick_interval_nanos: AtomicU64::new(config.tick_interval.as_nanos() as u64),
        }
    }

    pub fn stealth_suppression(&self) -> bool {
        self.stealth_suppression.load(Ordering::Relaxed)
    }

    pub fn set_stealth_suppression(&self, enabled: bool) {
        self.stealth_suppression.store(enabled, Ordering::Relaxed);
    }

    pub fn anchor_feature(&self) -> bool {
        self.anchor_feature.load(Ordering::Relaxed)
    }

    pub fn set_anchor_feature(&self, enabled: bool) {
        self.anchor_feature.store(enabled, Ordering::Relaxed);
    }

    pub fn projection_distance(&self) -> f64 {
        f64::from_bits(self.projection_distance.load(Ordering::Relaxed))
    }

    pub fn set_projection_distance(&self, value: f64) {
        self.projection_distance.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn fallback_suppression_range(&self) -> f64 {
        f64::from_bits(self.fallback_suppression_range.load(Ordering::Relaxed))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(self.tick_interval_nanos.load(Ordering::Relaxed))
    }

    pub fn set_tick_interval(&self, interval: Duration) {
        self.tick_interval_nanos
            .store(interval.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Snapshot the current values back into the host-facing form.
    pub fn snapshot(&self) -> EngineConfig {
        EngineConfig {
            stealth_suppression: self.stealth_suppression(),
            anchor_feature: self.anchor_feature(),
            projection_distance: self.projection_distance(),
            tick_interval: self.tick_interval(),
            fallback_suppression_range: self.fallback_suppression_range(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_projection_distance() {
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = EngineConfig {
                projection_distance: value,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidProjectionDistance { .. })
            ));
        }
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let config = EngineConfig {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickInterval));
    }

    #[test]
    fn rejects_negative_suppression_range() {
        let config = EngineConfig {
            fallback_suppression_range: -5.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSuppressionRange { .. })
        ));
    }

    #[test]
    fn shared_config_round_trips_values() {
        let shared = SharedConfig::new(&EngineConfig::default());
        shared.set_stealth_suppression(false);
        shared.set_anchor_feature(true);
        shared.set_projection_distance(75.5);
        shared.set_tick_interval(Duration::from_millis(250));

        let snapshot = shared.snapshot();
        assert!(!snapshot.stealth_suppression);
        assert!(snapshot.anchor_feature);
        assert_eq!(snapshot.projection_distance, 75.5);
        assert_eq!(snapshot.tick_interval, Duration::from_millis(250));
        assert_eq!(snapshot.fallback_suppression_range, 999_999.0);
    }
}
