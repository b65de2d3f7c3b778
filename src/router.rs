use std::time::Instant;

use crate::constants::{error_description, Unit, UNKNOWN_ERROR};
use crate::decoding::DecodedMessage;
use crate::events::{DeviceError, ScaleEvent};
use crate::state::ScaleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    /// Trim whitespace off the 3-character unit field before the unit lookup.
    /// With `false` the lookup is exact, so a padded field such as `" GN"`
    /// never matches and the unit is left unset.
    pub trim_unit_field: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self { trim_unit_field: true }
    }
}

/// Applies one decoded message to `state` and returns the events it caused.
///
/// The first event is always [`ScaleEvent::Data`] with the original line.
pub fn route(
    state: &mut ScaleState,
    message: &DecodedMessage,
    now: Instant,
    options: &RouterOptions,
) -> Vec<ScaleEvent> {
    let mut events = vec![ScaleEvent::Data(message.line().to_string())];

    match message {
        DecodedMessage::Stable { weight, unit, .. } => {
            apply_reading(state, weight, unit, true, now, options, &mut events);
        }
        DecodedMessage::Unstable { weight, unit, .. } => {
            apply_reading(state, weight, unit, false, now, options, &mut events);
        }
        DecodedMessage::Error { line, code } => {
            let description = error_description(code).unwrap_or(UNKNOWN_ERROR);
            let error = DeviceError {
                code: code.clone(),
                description: description.to_string(),
                line: line.clone(),
            };
            tracing::error!("{}", error);
            events.push(ScaleEvent::Error(error));
        }
        DecodedMessage::ModelNumber { model, .. } => {
            state.set_model(model.clone());
            events.push(ScaleEvent::Model(model.clone()));
        }
        DecodedMessage::SerialNumber { serial, .. } => {
            state.set_serial(serial.clone());
            events.push(ScaleEvent::Serial(serial.clone()));
        }
        DecodedMessage::Acknowledge { .. } => {
            tracing::info!("Command acknowledged");
        }
        DecodedMessage::Overload { line } => {
            tracing::warn!("Scale overloaded: {}", line);
            events.push(ScaleEvent::Overload);
        }
        DecodedMessage::Unhandled { line } => {
            tracing::debug!("UNHANDLED MESSAGE: {}", line);
            events.push(ScaleEvent::Unhandled(line.clone()));
        }
    }

    events
}

fn apply_reading(
    state: &mut ScaleState,
    weight: &str,
    unit: &str,
    stable: bool,
    now: Instant,
    options: &RouterOptions,
    events: &mut Vec<ScaleEvent>,
) {
    match parse_weight(weight) {
        Some(value) => {
            if state.set_weight(value) {
                events.push(ScaleEvent::Weight(value));
            }
        }
        None => tracing::warn!("Unparseable weight field {:?}", weight),
    }

    let unit_code = if options.trim_unit_field { unit.trim() } else { unit };
    let unit = Unit::from_code(unit_code);
    if state.set_unit(unit) {
        events.push(ScaleEvent::Unit(unit));
    }

    if state.set_stable(stable, now) {
        events.push(ScaleEvent::Stable(stable));
    }
}

/// A blank or missing field reads as zero; only non-numeric text is rejected.
fn parse_weight(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return Some(0.0);
    }
    let digits = field.strip_prefix('+').unwrap_or(field);
    digits.parse::<f64>().ok().filter(|value| value.is_finite())
}
