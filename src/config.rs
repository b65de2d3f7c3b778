use crate::constants::{DEFAULT_BAUD, DEFAULT_DEVICE};
use crate::router::RouterOptions;

/// Runtime options for a scale connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleConfig {
    pub device: String,
    pub baud: u32,
    /// Use the in-process mock transport instead of a serial port.
    pub mock: bool,
    /// Trace every raw line with a wall-clock timestamp.
    pub debug: bool,
    pub trim_unit_field: bool,
    pub event_capacity: usize,
}

impl ScaleConfig {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    pub fn mock() -> Self {
        Self {
            mock: true,
            ..Self::default()
        }
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            trim_unit_field: self.trim_unit_field,
        }
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud: DEFAULT_BAUD,
            mock: false,
            debug: false,
            trim_unit_field: true,
            event_capacity: 256,
        }
    }
}
