use std::time::{Duration, Instant};

use crate::constants::Unit;

/// Snapshot of what the scale has reported so far.
///
/// Weight and unit setters only report a change when the value differs;
/// model and serial are always overwritten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleState {
    weight: f64,
    unit: Option<Unit>,
    stable: bool,
    stable_since: Option<Instant>,
    model: String,
    serial: String,
}

impl ScaleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    pub fn stable(&self) -> bool {
        self.stable
    }

    pub fn stable_since(&self) -> Option<Instant> {
        self.stable_since
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Returns true when the stored weight changed.
    pub fn set_weight(&mut self, weight: f64) -> bool {
        if self.weight == weight {
            return false;
        }
        self.weight = weight;
        true
    }

    /// Returns true when the stored unit changed.
    pub fn set_unit(&mut self, unit: Option<Unit>) -> bool {
        if self.unit == unit {
            return false;
        }
        self.unit = unit;
        true
    }

    /// Returns true on a flip. Entering the stable state stamps `now`.
    pub fn set_stable(&mut self, stable: bool, now: Instant) -> bool {
        if self.stable == stable {
            return false;
        }
        self.stable = stable;
        self.stable_since = if stable { Some(now) } else { None };
        true
    }

    pub fn set_model(&mut self, model: String) {
        self.model = model;
    }

    pub fn set_serial(&mut self, serial: String) {
        self.serial = serial;
    }

    /// Time spent stable as of `now`, or `None` while the reading is unstable.
    pub fn stable_duration(&self, now: Instant) -> Option<Duration> {
        if !self.stable {
            return None;
        }
        self.stable_since.map(|since| now.saturating_duration_since(since))
    }
}
