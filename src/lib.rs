//! Decoding of Libre CGM memory blocks into timestamped glucose readings.
//!
//! A 344 byte block is either parsed locally, walking the trend and history
//! ring buffers, or sent to a web calibration service whose response is
//! adapted into the same sample shape. [`dispatch::DecodeDispatcher`] picks
//! the path per block, removes readings the caller already has, and reports
//! the new watermark.
pub mod config;
pub mod dispatch;
pub mod error;
pub mod libre;
pub mod models;
pub mod remote;
pub mod utils;

pub use config::{DecoderConfig, WebOopConfig};
pub use dispatch::{BlockRead, DecodeDispatcher, DecodePath, ReadingConsumer};
pub use error::DecodeError;
pub use libre::RawBlock;
pub use models::{Sample, SensorState, SensorType};
pub use remote::{RemoteClient, RemoteRequest, RemoteResponse};
