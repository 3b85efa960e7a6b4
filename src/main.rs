use log::{debug, error, info, warn};
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

use libre_block_decoder::utils::{duration_to_seconds, format_datetime};
use libre_block_decoder::{
    BlockRead, DecodeDispatcher, DecoderConfig, RawBlock, ReadingConsumer, Sample,
};

/// Logs every delivered reading
struct LogConsumer;

impl ReadingConsumer for LogConsumer {
    fn readings_received(&mut self, samples: &[Sample], sensor_age_minutes: Option<u16>) {
        match sensor_age_minutes {
            Some(age) => info!("Sensor age: {} minutes", age),
            None => info!("Sensor age unknown"),
        }

        if samples.is_empty() {
            warn!("No new readings in this block");
        }
        for sample in samples {
            info!("  {}", sample);
        }
    }

    fn error(&mut self, message: &str) {
        error!("{}", message);
    }
}

/// Read time of the dump, taken from the file's modification time
async fn capture_time(config: &DecoderConfig) -> OffsetDateTime {
    match tokio::fs::metadata(&config.block_path)
        .await
        .and_then(|m| m.modified())
    {
        Ok(modified) => OffsetDateTime::from(modified),
        Err(e) => {
            debug!("No modification time for block dump: {}", e);
            OffsetDateTime::now_utc()
        }
    }
}

async fn main_loop(config: DecoderConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Starting block decoder for {}",
        config.block_path.display()
    );

    let dispatcher = DecodeDispatcher::new(config.web_oop.clone(), None);
    let mut consumer = LogConsumer;
    let mut watermark = OffsetDateTime::UNIX_EPOCH;
    let mut last_bytes: Option<Vec<u8>> = None;

    loop {
        let started = OffsetDateTime::now_utc();

        match tokio::fs::read(&config.block_path).await {
            Ok(bytes) if last_bytes.as_deref() == Some(bytes.as_slice()) => {
                debug!("Block dump unchanged, skipping");
            }
            Ok(bytes) => match RawBlock::try_from(bytes.as_slice()) {
                Ok(block) => {
                    let read = BlockRead {
                        block,
                        captured_at: capture_time(&config).await,
                        watermark,
                        patch_info: config.patch_info.clone(),
                        serial: config.serial.clone(),
                    };

                    if let Some(newest) = dispatcher.dispatch(read, &mut consumer).await {
                        info!("Watermark advanced to {}", format_datetime(&newest));
                        watermark = newest;
                    }
                    last_bytes = Some(bytes);
                }
                Err(e) => warn!("Ignoring block dump: {}", e),
            },
            Err(e) => error!(
                "Failed to read block dump {}: {}",
                config.block_path.display(),
                e
            ),
        }

        // Wait until the next poll, minus the time spent decoding
        let elapsed = duration_to_seconds(OffsetDateTime::now_utc() - started);
        let wait_time = config.poll_interval_secs.saturating_sub(elapsed).max(1);
        sleep(Duration::from_secs(wait_time)).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let mut config = match DecoderConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    if config.web_oop.enabled {
        warn!("No web oop transport is built into this binary, using local parsing");
        config.web_oop.enabled = false;
    }

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        let _ = tx.send(());
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
