//! Chooses between local parsing and the web calibration service for one
//! block, then filters and hands the readings to a consumer.
use std::sync::Arc;

use log::{debug, error, info};
use time::OffsetDateTime;

use crate::config::WebOopConfig;
use crate::error::DecodeError;
use crate::libre::window::{filter_window, initial_anchor};
use crate::libre::{decode_block, filter_regions, RawBlock};
use crate::models::{Sample, SensorType, WARM_UP_MINUTES};
use crate::remote::{adapt_response, RemoteClient, RemoteRequest};

/// Receives the result of each dispatched block
pub trait ReadingConsumer {
    /// Newest-first readings. Empty while the sensor warms up.
    fn readings_received(&mut self, samples: &[Sample], sensor_age_minutes: Option<u16>);

    /// Failures reported by the web calibration service
    fn error(&mut self, message: &str);
}

/// Everything known about one block read from a transmitter
#[derive(Debug, Clone)]
pub struct BlockRead {
    pub block: RawBlock,
    pub captured_at: OffsetDateTime,
    /// Timestamp of the latest reading the caller already has
    pub watermark: OffsetDateTime,
    pub patch_info: Option<Vec<u8>>,
    pub serial: Option<String>,
}

/// How a block gets decoded, selected once per block
#[derive(Debug, Clone, PartialEq)]
pub enum DecodePath {
    Local,
    Remote(RemoteRequest),
}

/// Intermediate result of either path
#[derive(Debug, Clone, PartialEq)]
struct Outcome {
    samples: Vec<Sample>,
    sensor_age_minutes: Option<u16>,
    error: Option<String>,
}

pub struct DecodeDispatcher {
    web_oop: WebOopConfig,
    client: Option<Arc<dyn RemoteClient>>,
}

impl DecodeDispatcher {
    pub fn new(web_oop: WebOopConfig, client: Option<Arc<dyn RemoteClient>>) -> Self {
        DecodeDispatcher { web_oop, client }
    }

    /// Dispatcher that always parses locally
    pub fn local() -> Self {
        DecodeDispatcher::new(WebOopConfig::default(), None)
    }

    /// Decide how to decode the block
    ///
    /// Libre 1, US and Pro/H layouts are parsed locally even with web oop
    /// enabled, the service does not support them.
    pub fn select_path(&self, read: &BlockRead) -> Result<DecodePath, DecodeError> {
        let sensor_type = SensorType::from_patch_info(read.patch_info.as_deref())?;

        if !self.web_oop.enabled {
            return Ok(DecodePath::Local);
        }

        let (Some(serial), Some(site), Some(token)) = (
            read.serial.as_ref(),
            self.web_oop.site.as_ref(),
            self.web_oop.token.as_ref(),
        ) else {
            return Err(DecodeError::RemoteConfig("serial, site and token are required"));
        };

        if sensor_type.requires_local_parsing() {
            return Ok(DecodePath::Local);
        }

        if self.client.is_none() {
            return Err(DecodeError::RemoteConfig("no web oop client available"));
        }

        let block = read.block.clone();
        let site = site.clone();
        match sensor_type {
            SensorType::Libre1A2 => Ok(DecodePath::Remote(RemoteRequest::A2 { block, site })),
            _ => Ok(DecodePath::Remote(RemoteRequest::General {
                block,
                serial: serial.clone(),
                // local families are handled above, so patch info is present
                patch_info: read.patch_info.clone().unwrap_or_default(),
                site,
                token: token.clone(),
            })),
        }
    }

    /// Decode one block and deliver its readings to `consumer`
    ///
    /// The consumer is called at most once. Nothing is delivered when the
    /// sensor cannot be identified or web oop is enabled but not fully
    /// configured; both are logged.
    ///
    /// # Returns
    /// The timestamp of the newest delivered reading, to be used as the
    /// watermark for the next block, or None if nothing was delivered
    pub async fn dispatch<C>(&self, read: BlockRead, consumer: &mut C) -> Option<OffsetDateTime>
    where
        C: ReadingConsumer + ?Sized,
    {
        let path = match self.select_path(&read) {
            Ok(path) => path,
            Err(e) => {
                error!("in dispatch, {}", e);
                return None;
            }
        };

        let outcome = match path {
            DecodePath::Local => decode_locally(&read),
            DecodePath::Remote(request) => self.decode_remotely(request, &read).await,
        };

        deliver(outcome, consumer)
    }

    async fn decode_remotely(&self, request: RemoteRequest, read: &BlockRead) -> Outcome {
        let Some(client) = self.client.as_ref() else {
            return Outcome {
                samples: Vec::new(),
                sensor_age_minutes: None,
                error: Some("no web oop client available".to_string()),
            };
        };

        debug!("Requesting web oop decoding from {}", request.site());
        let response = match client.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Web oop request failed: {}", e);
                return Outcome {
                    samples: Vec::new(),
                    sensor_age_minutes: None,
                    error: Some(e),
                };
            }
        };
        debug!("Received web oop response:\n{}", response);

        if let Some(code) = response.service_error() {
            return Outcome {
                samples: Vec::new(),
                sensor_age_minutes: response.sensor_age_minutes(),
                error: Some(format!("service returned errcode {}", code)),
            };
        }

        let adapted = adapt_response(&response, read.captured_at);
        debug!(
            "Adapted web oop response: {} candidates, sensor state {}, error {}",
            adapted.samples.len(),
            adapted.sensor_state,
            adapted.is_error
        );
        let window = filter_window(
            &adapted.samples,
            read.watermark,
            initial_anchor(read.captured_at),
        );

        Outcome {
            samples: window.kept,
            sensor_age_minutes: adapted.sensor_age_minutes,
            error: None,
        }
    }
}

fn decode_locally(read: &BlockRead) -> Outcome {
    let decoded = decode_block(&read.block, read.captured_at, read.watermark);
    info!(
        "Local parsing: sensor state {}, sensor age {} min",
        decoded.sensor_state, decoded.sensor_age_minutes
    );

    Outcome {
        samples: filter_regions(
            &decoded.trend,
            &decoded.history,
            read.watermark,
            read.captured_at,
        ),
        sensor_age_minutes: Some(decoded.sensor_age_minutes),
        error: None,
    }
}

fn deliver<C>(outcome: Outcome, consumer: &mut C) -> Option<OffsetDateTime>
where
    C: ReadingConsumer + ?Sized,
{
    if let Some(message) = outcome.error {
        consumer.error(&format!("Web OOP : {}", message));
        return None;
    }

    if let Some(age) = outcome.sensor_age_minutes {
        if age < WARM_UP_MINUTES {
            info!("Sensor warming up, age {} min", age);
            consumer.readings_received(&[], Some(age));
            return None;
        }
    }

    info!("Delivering {} readings", outcome.samples.len());
    consumer.readings_received(&outcome.samples, outcome.sensor_age_minutes);
    outcome.samples.first().map(|s| s.timestamp)
}
