use tracing_subscriber::EnvFilter;

use crate::decoding::DecodedMessage;

/// Installs the stderr subscriber. `RUST_LOG` wins over the `debug` flag.
pub fn init(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

impl DecodedMessage {
    pub(crate) fn log(&self) {
        match self {
            DecodedMessage::Stable { weight, unit, counting, .. } => {
                tracing::debug!(counting, "Stable - weight: {:?}, unit: {:?}", weight, unit)
            }
            DecodedMessage::Unstable { weight, unit, .. } => {
                tracing::debug!("Unstable - weight: {:?}, unit: {:?}", weight, unit)
            }
            DecodedMessage::Overload { line } => tracing::debug!("Overload: {}", line),
            DecodedMessage::Error { code, .. } => tracing::debug!("Error code: {}", code),
            DecodedMessage::ModelNumber { model, .. } => tracing::debug!("Model: {}", model),
            DecodedMessage::SerialNumber { serial, .. } => tracing::debug!("Serial: {}", serial),
            DecodedMessage::Acknowledge { .. } => tracing::debug!("Acknowledge"),
            DecodedMessage::Unhandled { line } => tracing::debug!("Unhandled: {}", line),
        }
    }
}
