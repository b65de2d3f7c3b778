use std::fmt;

use tokio::sync::broadcast;

use crate::constants::Unit;

/// Fault reported by the scale itself through an `EC` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceError {
    pub code: String,
    pub description: String,
    pub line: String,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error code: {}, message: {}, line: {}",
            self.code, self.description, self.line
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleEvent {
    /// Every line received, before any interpretation.
    Data(String),
    Weight(f64),
    Unit(Option<Unit>),
    Stable(bool),
    Model(String),
    Serial(String),
    Error(DeviceError),
    Overload,
    /// Lines with a status code the decoder does not know.
    Unhandled(String),
    Open,
    Close,
    TransportError(String),
}

impl ScaleEvent {
    /// Name of the notification channel this event belongs to.
    pub fn name(&self) -> &'static str {
        match self {
            ScaleEvent::Data(_) => "data",
            ScaleEvent::Weight(_) => "weight",
            ScaleEvent::Unit(_) => "unit",
            ScaleEvent::Stable(_) => "stable",
            ScaleEvent::Model(_) => "model",
            ScaleEvent::Serial(_) => "serial",
            ScaleEvent::Error(_) => "error",
            ScaleEvent::Overload => "overload",
            ScaleEvent::Unhandled(_) => "unhandled",
            ScaleEvent::Open => "open",
            ScaleEvent::Close => "close",
            ScaleEvent::TransportError(_) => "error",
        }
    }
}

/// Fan-out of scale events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScaleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScaleEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn publish(&self, event: ScaleEvent) {
        // No subscribers is fine; the event is simply dropped.
        if self.sender.send(event).is_err() {
            tracing::trace!("event dropped, no subscribers");
        }
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ScaleEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}
