use std::sync::{Arc, Mutex, MutexGuard};

use rand::Rng;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::constants::{Command, Unit, DELIMITER};
use crate::error::{Result, ScaleError};
use crate::transport::{line_stream, LineStream, Transport};

const MOCK_ID: &str = "LAB-0001";

/// In-process stand-in for the scale. Answers queries with canned lines and
/// button presses with `AK`.
pub struct MockTransport {
    inner: Arc<Mutex<MockDevice>>,
}

/// Test-side access to a [`MockTransport`] after it has been handed over.
#[derive(Clone)]
pub struct MockHandle {
    inner: Arc<Mutex<MockDevice>>,
}

struct MockDevice {
    sender: Option<UnboundedSender<Result<String>>>,
    written: Vec<String>,
    auto_reply: bool,
    model: String,
    serial: String,
    weight: f64,
    unit: Unit,
    jitter: f64,
}

impl MockTransport {
    pub fn new() -> Self {
        let device = MockDevice {
            sender: None,
            written: Vec::new(),
            auto_reply: true,
            model: "FX-120i".to_string(),
            serial: "T0000001".to_string(),
            weight: 0.0,
            unit: Unit::Grains,
            jitter: 0.0,
        };
        Self {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    /// Random noise, in display units, added to each printed reading.
    pub fn with_jitter(self, jitter: f64) -> Self {
        lock(&self.inner).jitter = jitter.abs();
        self
    }

    pub fn with_auto_reply(self, auto_reply: bool) -> Self {
        lock(&self.inner).auto_reply = auto_reply;
        self
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> Result<LineStream> {
        let mut device = lock(&self.inner);
        if device.sender.is_some() {
            return Err(ScaleError::AlreadyOpen);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        device.sender = Some(tx);
        Ok(line_stream(rx))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut device = lock(&self.inner);
        if device.sender.is_none() {
            return Err(ScaleError::NotOpen);
        }

        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_end_matches(DELIMITER).to_string();
        tracing::trace!("mock received {:?}", text);
        device.written.push(text.clone());

        if device.auto_reply {
            let reply = device.reply_to(&text);
            device.send(reply)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the sender ends the line stream.
        lock(&self.inner)
            .sender
            .take()
            .map(drop)
            .ok_or(ScaleError::NotOpen)
    }
}

impl MockDevice {
    fn send(&self, line: String) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(ScaleError::NotOpen)?;
        sender.send(Ok(line)).map_err(|_| ScaleError::ChannelClosed)
    }

    fn reply_to(&mut self, text: &str) -> String {
        let command = match Command::from_line(text) {
            Some(command) => command,
            None => return "EC,E01".to_string(),
        };

        match command {
            Command::Id => format!("ID,{}", MOCK_ID),
            Command::ModelNumber => format!("TN,{}", self.model),
            Command::SerialNumber => format!("SN,{}", self.serial),
            Command::TareWeight => format!("PT,{:+09.3}{:>3}", 0.0, self.unit.code()),
            Command::PrintButton => self.reading(),
            Command::RezeroButton => {
                self.weight = 0.0;
                "AK".to_string()
            }
            Command::ModeButton => {
                self.unit = match self.unit {
                    Unit::Grains => Unit::Grams,
                    Unit::Grams => Unit::Grains,
                };
                "AK".to_string()
            }
            Command::CalButton
            | Command::OffButton
            | Command::OnButton
            | Command::OnOffButton
            | Command::SampleButton => "AK".to_string(),
        }
    }

    fn reading(&self) -> String {
        let noise = if self.jitter > 0.0 {
            rand::rng().random_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        format!("ST,{:+09.3}{:>3}", self.weight + noise, self.unit.code())
    }
}

impl MockHandle {
    /// Delivers `line` as if the scale had sent it.
    pub fn inject(&self, line: &str) -> Result<()> {
        lock(&self.inner).send(line.to_string())
    }

    /// Delivers a transport failure on the line stream.
    pub fn inject_error(&self, message: &str) -> Result<()> {
        let device = lock(&self.inner);
        let sender = device.sender.as_ref().ok_or(ScaleError::NotOpen)?;
        let error = std::io::Error::other(message.to_string());
        sender
            .send(Err(ScaleError::Io(error)))
            .map_err(|_| ScaleError::ChannelClosed)
    }

    /// Lines written to the device, without their terminators.
    pub fn written(&self) -> Vec<String> {
        lock(&self.inner).written.clone()
    }

    pub fn set_weight(&self, weight: f64) {
        lock(&self.inner).weight = weight;
    }

    pub fn set_model(&self, model: &str) {
        lock(&self.inner).model = model.to_string();
    }

    pub fn is_open(&self) -> bool {
        lock(&self.inner).sender.is_some()
    }
}

fn lock(inner: &Mutex<MockDevice>) -> MutexGuard<'_, MockDevice> {
    // A panic while holding the lock leaves plain data behind; keep going.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn answers_model_query() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.set_model("GX-200");
        let mut lines = mock.open().unwrap();

        mock.write(Command::ModelNumber.as_bytes()).unwrap();
        assert_eq!(lines.next().await.unwrap().unwrap(), "TN,GX-200");
        assert_eq!(handle.written(), vec!["?TN".to_string()]);
    }

    #[tokio::test]
    async fn print_sends_fixed_width_reading() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.set_weight(12.345);
        let mut lines = mock.open().unwrap();

        mock.write(Command::PrintButton.as_bytes()).unwrap();
        assert_eq!(lines.next().await.unwrap().unwrap(), "ST,+0012.345 GN");

        mock.write(Command::ModeButton.as_bytes()).unwrap();
        assert_eq!(lines.next().await.unwrap().unwrap(), "AK");
        mock.write(Command::PrintButton.as_bytes()).unwrap();
        assert_eq!(lines.next().await.unwrap().unwrap(), "ST,+0012.345  g");
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let mut mock = MockTransport::new();
        let mut lines = mock.open().unwrap();
        mock.write(b"BOGUS\r\n").unwrap();
        assert_eq!(lines.next().await.unwrap().unwrap(), "EC,E01");
    }

    #[tokio::test]
    async fn close_ends_stream() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        let mut lines = mock.open().unwrap();
        assert!(handle.is_open());
        mock.close().unwrap();
        assert!(lines.next().await.is_none());
        assert!(matches!(mock.write(b"R\r\n"), Err(ScaleError::NotOpen)));
        assert!(matches!(handle.inject("AK"), Err(ScaleError::NotOpen)));
    }

    #[test]
    fn double_open_is_refused() {
        let mut mock = MockTransport::new();
        let _lines = mock.open().unwrap();
        assert!(matches!(mock.open(), Err(ScaleError::AlreadyOpen)));
    }
}
