//! Driver for A&D FX/FZ-series laboratory scales on a serial link.
//!
//! Lines from the scale are decoded into [`DecodedMessage`]s, applied to a
//! [`ScaleState`] by [`route`], and the resulting [`ScaleEvent`]s are fanned
//! out through an [`EventBus`]. [`FxfzScale`] ties these to a [`Transport`].

pub mod config;
pub mod constants;
pub mod decoding;
pub mod encoding;
pub mod error;
pub mod events;
pub mod fxfz_scale;
pub mod logging;
pub mod mock_transport;
pub mod router;
pub mod state;
pub mod transport;

pub use config::ScaleConfig;
pub use constants::{Command, Unit};
pub use decoding::{decode_line, DecodedMessage};
pub use error::{Result, ScaleError};
pub use events::{DeviceError, EventBus, ScaleEvent};
pub use fxfz_scale::FxfzScale;
pub use mock_transport::{MockHandle, MockTransport};
pub use router::{route, RouterOptions};
pub use state::ScaleState;
pub use transport::{LineFramer, LineStream, SerialTransport, Transport};
