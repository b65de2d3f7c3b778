use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScaleError>;

/// Failures of the transport underneath the protocol. Protocol level problems
/// (bad lines, device error codes) are events, not errors.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport is not open")]
    NotOpen,

    #[error("transport is already open")]
    AlreadyOpen,

    #[error("line channel closed")]
    ChannelClosed,

    #[error("blocking write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
