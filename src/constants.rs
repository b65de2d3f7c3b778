pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD: u32 = 19200;
pub(crate) const DELIMITER: &str = "\r\n";

// Fixed field layout of a data line, e.g. `ST,+0012.345 GN`.
pub(crate) const STATUS_LEN: usize = 2;
pub(crate) const PAYLOAD_OFFSET: usize = 3;
pub(crate) const WEIGHT_LEN: usize = 9;
pub(crate) const UNIT_OFFSET: usize = 12;
pub(crate) const UNIT_LEN: usize = 3;
pub(crate) const ERROR_CODE_LEN: usize = 3;

pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Stable,
    Counting,
    Unstable,
    Overload,
    Error,
    Acknowledge,
    ModelNumber,
    SerialNumber,
}

impl Status {
    pub(crate) fn from_code(code: &str) -> Option<Status> {
        match code {
            "ST" => Some(Status::Stable),
            "QT" => Some(Status::Counting),
            "US" => Some(Status::Unstable),
            "OL" => Some(Status::Overload),
            "EC" => Some(Status::Error),
            "AK" => Some(Status::Acknowledge),
            "TN" => Some(Status::ModelNumber),
            "SN" => Some(Status::SerialNumber),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Grains,
    Grams,
}

impl Unit {
    /// Looks up the device unit code. The match is exact; callers decide
    /// whether the fixed-width field is trimmed first.
    pub fn from_code(code: &str) -> Option<Unit> {
        match code {
            "GN" => Some(Unit::Grains),
            "g" => Some(Unit::Grams),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match *self {
            Unit::Grains => "GN",
            Unit::Grams => "g",
        }
    }
}

/// Human readable description of a device error code, if the code is known.
pub fn error_description(code: &str) -> Option<&'static str> {
    let description = match code {
        "E00" => "Communications error",
        "E01" => "Undefined command error",
        "E02" => "Not ready",
        "E03" => "Timeout error",
        "E04" => "Excess characters error",
        "E06" => "Format error",
        "E07" => "Parameter setting error",
        "E11" => "Stability error",
        "E17" => "Internal mass error",
        "E20" => "Calibration weight error: The calibration weight is too heavy",
        "E21" => "Calibration weight error: The calibration weight is too light",
        _ => return None,
    };
    Some(description)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Id,
    SerialNumber,
    ModelNumber,
    TareWeight,
    CalButton,
    OffButton,
    OnButton,
    OnOffButton,
    PrintButton,
    RezeroButton,
    SampleButton,
    ModeButton,
}

impl Command {
    pub const ALL: [Command; 12] = [
        Command::Id,
        Command::SerialNumber,
        Command::ModelNumber,
        Command::TareWeight,
        Command::CalButton,
        Command::OffButton,
        Command::OnButton,
        Command::OnOffButton,
        Command::PrintButton,
        Command::RezeroButton,
        Command::SampleButton,
        Command::ModeButton,
    ];
}
