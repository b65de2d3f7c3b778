use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::sleep;

use rust_fxfz::constants::{DEFAULT_BAUD, DEFAULT_DEVICE};
use rust_fxfz::{logging, FxfzScale, ScaleConfig, ScaleEvent};

#[derive(Parser, Debug)]
#[command(name = "rust-fxfz", about = "Watch an A&D FX/FZ scale on a serial port")]
struct Cli {
    /// Serial device path
    #[arg(short, long, env = "SCALE_DEVICE_PATH", default_value = DEFAULT_DEVICE)]
    device: String,

    /// Baud rate
    #[arg(short, long, env = "SCALE_BAUD_RATE", default_value_t = DEFAULT_BAUD)]
    baud: u32,

    /// Talk to a simulated scale instead of the serial port
    #[arg(long)]
    mock: bool,

    /// Trace every raw line
    #[arg(long)]
    debug: bool,

    /// Match the 3-character unit field exactly instead of trimming it
    #[arg(long)]
    exact_unit_field: bool,

    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let config = ScaleConfig {
        device: cli.device,
        baud: cli.baud,
        mock: cli.mock,
        debug: cli.debug,
        trim_unit_field: !cli.exact_unit_field,
        ..ScaleConfig::default()
    };

    let scale = Arc::new(FxfzScale::new(config));
    let mut events = scale.subscribe();
    let handle = scale.clone().connect().await?;

    scale.get_model_number().await?;
    scale.get_serial_number().await?;
    if scale.config().mock {
        scale.press_print().await?;
    }

    let deadline = run_until(cli.seconds);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ScaleEvent::Close) => break,
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(n)) => tracing::warn!("dropped {} events", n),
                Err(RecvError::Closed) => break,
            },
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if scale.close().await.is_ok() {
        handle.await?;
    }
    Ok(())
}

/// Resolves after `seconds`, or never when no limit was given.
async fn run_until(seconds: Option<u64>) {
    match seconds {
        Some(seconds) => sleep(Duration::from_secs(seconds)).await,
        None => std::future::pending::<()>().await,
    }
}

fn print_event(event: &ScaleEvent) {
    match event {
        ScaleEvent::Data(_) => {}
        ScaleEvent::Weight(w) => println!("weight: {}", w),
        ScaleEvent::Unit(u) => println!("unit: {:?}", u),
        ScaleEvent::Stable(s) => println!("stable: {}", s),
        ScaleEvent::Model(m) => println!("model: {}", m),
        ScaleEvent::Serial(s) => println!("serial: {}", s),
        ScaleEvent::Error(e) => println!("error: {}", e),
        other => println!("{}: {:?}", other.name(), other),
    }
}
