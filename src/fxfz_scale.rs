use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use time::OffsetDateTime;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::config::ScaleConfig;
use crate::constants::{Command, Unit};
use crate::decoding::decode_line;
use crate::error::Result;
use crate::events::{EventBus, ScaleEvent};
use crate::mock_transport::MockTransport;
use crate::router::{route, RouterOptions};
use crate::state::ScaleState;
use crate::transport::{LineStream, SerialTransport, Transport};

const MOCK_JITTER: f64 = 0.002;

pub struct FxfzScale {
    config: ScaleConfig,
    options: RouterOptions,
    transport: Arc<Mutex<Box<dyn Transport>>>,
    state: Mutex<ScaleState>,
    bus: EventBus,
}

impl FxfzScale {
    pub fn new(config: ScaleConfig) -> Self {
        let transport: Box<dyn Transport> = if config.mock {
            tracing::info!("Using Mock interface");
            Box::new(MockTransport::new().with_jitter(MOCK_JITTER))
        } else {
            Box::new(SerialTransport::new(config.device.as_str(), config.baud))
        };
        Self::from_boxed(config, transport)
    }

    pub fn with_transport(config: ScaleConfig, transport: impl Transport + 'static) -> Self {
        Self::from_boxed(config, Box::new(transport))
    }

    fn from_boxed(config: ScaleConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            options: config.router_options(),
            bus: EventBus::new(config.event_capacity),
            transport: Arc::new(Mutex::new(transport)),
            state: Mutex::new(ScaleState::new()),
            config,
        }
    }

    pub fn config(&self) -> &ScaleConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScaleEvent> {
        self.bus.subscribe()
    }

    /// Opens the transport and spawns the task that feeds received lines
    /// through the decoder. The task ends, publishing `Close`, when the
    /// line stream ends.
    pub async fn connect(self: Arc<Self>) -> Result<JoinHandle<()>> {
        let opened = self.transport.lock().await.open();
        let lines = match opened {
            Ok(lines) => lines,
            Err(e) => {
                tracing::error!("Serial port error: {}", e);
                self.bus.publish(ScaleEvent::TransportError(e.to_string()));
                return Err(e);
            }
        };

        tracing::info!(device = %self.config.device, "Serial port open");
        self.bus.publish(ScaleEvent::Open);

        let handle = tokio::spawn({
            let me = Arc::clone(&self);
            async move { me.handle_lines(lines).await }
        });

        Ok(handle)
    }

    async fn handle_lines(&self, mut lines: LineStream) {
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => self.handle_line(&line).await,
                Err(e) => {
                    tracing::error!("Serial port error: {}", e);
                    self.bus.publish(ScaleEvent::TransportError(e.to_string()));
                }
            }
        }
        tracing::info!("Serial port close");
        self.bus.publish(ScaleEvent::Close);
    }

    /// Decodes one line, applies it to the state and publishes the resulting
    /// events. The state lock is held until every event is published.
    pub async fn handle_line(&self, raw: &str) {
        let message = decode_line(raw);
        if self.config.debug {
            tracing::info!("{} {}", OffsetDateTime::now_utc(), message.line());
        }
        message.log();

        let mut state = self.state.lock().await;
        let events = route(&mut state, &message, Instant::now(), &self.options);
        self.bus.publish_all(events);
    }

    /// Writes the command on the blocking pool; serial writes block until the
    /// bytes are handed to the driver.
    pub async fn send(&self, command: Command) -> Result<()> {
        let mut transport = Arc::clone(&self.transport).lock_owned().await;
        let written = tokio::task::spawn_blocking(move || transport.write(command.as_bytes()))
            .await
            .unwrap_or_else(|e| Err(e.into()));
        if let Err(e) = &written {
            tracing::error!("Serial port error: {}", e);
            self.bus.publish(ScaleEvent::TransportError(e.to_string()));
        }
        written
    }

    pub async fn close(&self) -> Result<()> {
        let closed = self.transport.lock().await.close();
        if let Err(e) = &closed {
            tracing::error!("Serial port error: {}", e);
            self.bus.publish(ScaleEvent::TransportError(e.to_string()));
        }
        closed
    }

    pub async fn get_id(&self) -> Result<()> {
        tracing::info!("WRITE: Requesting ID...");
        self.send(Command::Id).await
    }

    pub async fn get_model_number(&self) -> Result<()> {
        tracing::info!("WRITE: Requesting model number...");
        self.send(Command::ModelNumber).await
    }

    pub async fn get_serial_number(&self) -> Result<()> {
        tracing::info!("WRITE: Requesting serial number...");
        self.send(Command::SerialNumber).await
    }

    pub async fn get_tare_weight(&self) -> Result<()> {
        tracing::info!("WRITE: Requesting tare weight...");
        self.send(Command::TareWeight).await
    }

    pub async fn press_mode(&self) -> Result<()> {
        tracing::info!("WRITE: Pressing Mode button to change unit...");
        self.send(Command::ModeButton).await
    }

    pub async fn re_zero(&self) -> Result<()> {
        tracing::info!("WRITE: Pressing ReZero button...");
        self.send(Command::RezeroButton).await
    }

    pub async fn press_print(&self) -> Result<()> {
        tracing::info!("WRITE: Pressing Print button...");
        self.send(Command::PrintButton).await
    }

    pub async fn press_cal(&self) -> Result<()> {
        tracing::info!("WRITE: Pressing Cal button...");
        self.send(Command::CalButton).await
    }

    pub async fn press_sample(&self) -> Result<()> {
        tracing::info!("WRITE: Pressing Sample button...");
        self.send(Command::SampleButton).await
    }

    pub async fn power_on(&self) -> Result<()> {
        tracing::info!("WRITE: Pressing On button...");
        self.send(Command::OnButton).await
    }

    pub async fn power_off(&self) -> Result<()> {
        tracing::info!("WRITE: Pressing Off button...");
        self.send(Command::OffButton).await
    }

    pub async fn toggle_power(&self) -> Result<()> {
        tracing::info!("WRITE: Pressing On/Off button...");
        self.send(Command::OnOffButton).await
    }

    pub async fn weight(&self) -> f64 {
        self.state.lock().await.weight()
    }

    pub async fn unit(&self) -> Option<Unit> {
        self.state.lock().await.unit()
    }

    pub async fn stable(&self) -> bool {
        self.state.lock().await.stable()
    }

    /// How long the reading has been stable, `None` while unstable.
    pub async fn stable_duration(&self) -> Option<Duration> {
        self.state.lock().await.stable_duration(Instant::now())
    }

    pub async fn model(&self) -> String {
        self.state.lock().await.model().to_string()
    }

    pub async fn serial(&self) -> String {
        self.state.lock().await.serial().to_string()
    }

    pub async fn snapshot(&self) -> ScaleState {
        self.state.lock().await.clone()
    }
}
