use std::io::{ErrorKind, Read, Write};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::stream::Stream;
use serialport::SerialPort;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{Result, ScaleError};

const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Complete, CRLF-stripped lines from the device.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Byte link to the scale. Implementations frame incoming bytes into lines.
pub trait Transport: Send {
    /// Opens the link. The returned stream ends when the link closes.
    fn open(&mut self) -> Result<LineStream>;

    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Accumulates raw bytes and splits them on `\r\n`. A lone `\r` or `\n` also
/// ends a line, and empty lines are dropped.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let end = self.buffer.iter().position(|&b| is_terminator(b))?;
            let line: Vec<u8> = self.buffer.drain(..end).collect();
            let skip = self.buffer.iter().take_while(|&&b| is_terminator(b)).count();
            self.buffer.drain(..skip);

            if !line.is_empty() {
                return Some(String::from_utf8_lossy(&line).into_owned());
            }
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

fn is_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}

pub(crate) fn line_stream(mut rx: UnboundedReceiver<Result<String>>) -> LineStream {
    Box::pin(stream! {
        while let Some(line) = rx.recv().await {
            yield line;
        }
    })
}

pub struct SerialTransport {
    device: String,
    baud: u32,
    port: Option<Box<dyn SerialPort>>,
    running: Arc<AtomicBool>,
}

impl SerialTransport {
    pub fn new(device: impl Into<String>, baud: u32) -> Self {
        Self {
            device: device.into(),
            baud,
            port: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a port is held and its reader thread is still running.
    pub fn is_open(&self) -> bool {
        self.port.is_some() && self.running.load(Ordering::Acquire)
    }

    /// Drops a port whose reader has already exited.
    fn release_dead_port(&mut self) -> bool {
        if self.port.is_some() && !self.running.load(Ordering::Acquire) {
            self.port = None;
            tracing::debug!(device = %self.device, "released serial port after reader exit");
            return true;
        }
        false
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<LineStream> {
        self.release_dead_port();
        if self.port.is_some() {
            return Err(ScaleError::AlreadyOpen);
        }

        let port = serialport::new(self.device.as_str(), self.baud)
            .timeout(READ_TIMEOUT)
            .open()?;
        let reader = port.try_clone()?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.running = Arc::new(AtomicBool::new(true));
        let running = Arc::clone(&self.running);
        std::thread::spawn(move || read_lines(reader, tx, running));

        tracing::debug!(device = %self.device, baud = self.baud, "serial port opened");
        self.port = Some(port);
        Ok(line_stream(rx))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.release_dead_port() {
            return Err(ScaleError::NotOpen);
        }
        let port = self.port.as_mut().ok_or(ScaleError::NotOpen)?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.release_dead_port() {
            return Err(ScaleError::NotOpen);
        }
        self.running.store(false, Ordering::Release);
        self.port.take().map(drop).ok_or(ScaleError::NotOpen)
    }
}

/// Reads until closed, end of file or a fatal read error. A fatal error is
/// forwarded once, then the stream ends and the port counts as closed.
fn read_lines(
    mut reader: Box<dyn SerialPort>,
    tx: UnboundedSender<Result<String>>,
    running: Arc<AtomicBool>,
) {
    let mut framer = LineFramer::new();
    let mut buf = [0u8; 256];

    while running.load(Ordering::Acquire) {
        match reader.read(&mut buf) {
            Ok(0) => {
                tracing::debug!("serial port reached end of file");
                break;
            }
            Ok(n) => {
                framer.push(&buf[..n]);
                while let Some(line) = framer.next_line() {
                    if tx.send(Ok(line)).is_err() {
                        running.store(false, Ordering::Release);
                        return;
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                // Clear the flag before the sender drops so the transport is
                // already closed when the stream ends.
                running.store(false, Ordering::Release);
                let _ = tx.send(Err(e.into()));
                return;
            }
        }
    }
    running.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_crlf_lines() {
        let mut framer = LineFramer::new();
        framer.push(b"ST,+0012.345 GN\r\nAK\r\n");
        assert_eq!(framer.next_line().as_deref(), Some("ST,+0012.345 GN"));
        assert_eq!(framer.next_line().as_deref(), Some("AK"));
        assert_eq!(framer.next_line(), None);
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn holds_partial_lines() {
        let mut framer = LineFramer::new();
        framer.push(b"TN,GX-");
        assert_eq!(framer.next_line(), None);
        framer.push(b"200\r");
        assert_eq!(framer.next_line().as_deref(), Some("TN,GX-200"));
        framer.push(b"\nSN,1\r\n");
        assert_eq!(framer.next_line().as_deref(), Some("SN,1"));
    }

    #[test]
    fn drops_empty_lines() {
        let mut framer = LineFramer::new();
        framer.push(b"\r\n\r\n\nAK\n");
        assert_eq!(framer.next_line().as_deref(), Some("AK"));
        assert_eq!(framer.next_line(), None);
    }

    #[test]
    fn write_before_open_fails() {
        let mut transport = SerialTransport::new("/dev/null-scale", 19200);
        assert!(!transport.is_open());
        assert!(matches!(transport.write(b"?TN\r\n"), Err(ScaleError::NotOpen)));
        assert!(matches!(transport.close(), Err(ScaleError::NotOpen)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hangup_ends_stream_and_closes_transport() {
        use futures::StreamExt;
        use serialport::TTYPort;

        let (mut master, slave) = TTYPort::pair().expect("pty pair");
        let path = slave.name().expect("pty name");
        drop(slave);
        let mut transport = SerialTransport::new(path, 19200);
        let mut lines = transport.open().unwrap();
        assert!(transport.is_open());

        master.write_all(b"ST,+0012.345 GN\r\n").unwrap();
        let first = tokio::time::timeout(Duration::from_secs(2), lines.next())
            .await
            .unwrap();
        assert_eq!(first.unwrap().unwrap(), "ST,+0012.345 GN");

        drop(master);
        let ended = tokio::time::timeout(Duration::from_secs(2), async {
            while lines.next().await.is_some() {}
        })
        .await;
        assert!(ended.is_ok(), "line stream did not end after hangup");

        assert!(!transport.is_open());
        assert!(matches!(transport.write(b"?TN\r\n"), Err(ScaleError::NotOpen)));
        assert!(matches!(transport.close(), Err(ScaleError::NotOpen)));
        assert!(!matches!(transport.open(), Err(ScaleError::AlreadyOpen)));
    }
}
