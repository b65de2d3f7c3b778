use crate::constants::{
    Status, ERROR_CODE_LEN, PAYLOAD_OFFSET, STATUS_LEN, UNIT_LEN, UNIT_OFFSET, WEIGHT_LEN,
};

/// One line from the scale, classified by its two character status header.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    Stable { line: String, weight: String, unit: String, counting: bool },
    Unstable { line: String, weight: String, unit: String },
    Overload { line: String },
    Error { line: String, code: String },
    ModelNumber { line: String, model: String },
    SerialNumber { line: String, serial: String },
    Acknowledge { line: String },
    Unhandled { line: String },
}

impl DecodedMessage {
    pub fn line(&self) -> &str {
        match self {
            DecodedMessage::Stable { line, .. }
            | DecodedMessage::Unstable { line, .. }
            | DecodedMessage::Overload { line }
            | DecodedMessage::Error { line, .. }
            | DecodedMessage::ModelNumber { line, .. }
            | DecodedMessage::SerialNumber { line, .. }
            | DecodedMessage::Acknowledge { line }
            | DecodedMessage::Unhandled { line } => line,
        }
    }
}

/// Splits a raw line into its status code and positional fields.
///
/// Never fails: short lines produce partial or empty fields and unknown
/// headers produce [`DecodedMessage::Unhandled`].
pub fn decode_line(raw: &str) -> DecodedMessage {
    let line = raw.trim().to_string();
    let status = field(&line, 0, STATUS_LEN);

    let status = match Status::from_code(status) {
        Some(status) => status,
        None => return DecodedMessage::Unhandled { line },
    };

    match status {
        Status::Stable | Status::Counting => {
            let weight = field(&line, PAYLOAD_OFFSET, WEIGHT_LEN).to_string();
            let unit = field(&line, UNIT_OFFSET, UNIT_LEN).to_string();
            let counting = status == Status::Counting;
            DecodedMessage::Stable { line, weight, unit, counting }
        }
        Status::Unstable => {
            let weight = field(&line, PAYLOAD_OFFSET, WEIGHT_LEN).to_string();
            let unit = field(&line, UNIT_OFFSET, UNIT_LEN).to_string();
            DecodedMessage::Unstable { line, weight, unit }
        }
        Status::Overload => DecodedMessage::Overload { line },
        Status::Error => {
            let code = field(&line, PAYLOAD_OFFSET, ERROR_CODE_LEN).to_string();
            DecodedMessage::Error { line, code }
        }
        Status::ModelNumber => {
            let model = rest(&line, PAYLOAD_OFFSET).to_string();
            DecodedMessage::ModelNumber { line, model }
        }
        Status::SerialNumber => {
            let serial = rest(&line, PAYLOAD_OFFSET).to_string();
            DecodedMessage::SerialNumber { line, serial }
        }
        Status::Acknowledge => DecodedMessage::Acknowledge { line },
    }
}

/// Up to `len` characters starting at character `start`, clamped to the line.
fn field(line: &str, start: usize, len: usize) -> &str {
    let rest = rest(line, start);
    match rest.char_indices().nth(len) {
        Some((end, _)) => &rest[..end],
        None => rest,
    }
}

fn rest(line: &str, start: usize) -> &str {
    match line.char_indices().nth(start) {
        Some((begin, _)) => &line[begin..],
        None => "",
    }
}
