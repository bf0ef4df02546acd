use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::{BlockMsg, SampleBlock};
use crate::config::AudioConfig;

/// Capture-side device errors. Non-fatal: a failed source still lets the
/// session seal whatever was captured.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No input device is available
    #[error("no input device available")]
    NoDevice,

    /// The input stream could not be opened or started
    #[error("failed to open input stream: {0}")]
    Stream(String),
}

/// Produces sample blocks until told to stop
pub trait AudioSource: Send + 'static {
    /// Emit blocks into `blocks` until `stop` is set, then tear down the
    /// device before returning. The caller enqueues the sentinel afterwards,
    /// so no block may be sent once this returns.
    ///
    /// # Errors
    /// Returns error if the device cannot be opened; logged, non-fatal
    fn run(&mut self, blocks: &Sender<BlockMsg>, stop: &AtomicBool) -> Result<(), DeviceError>;
}

/// Microphone capture via CPAL at the configured rate and channel count
pub struct CpalSource {
    sample_rate: u32,
    channels: u16,
    poll_interval: Duration,
}

impl CpalSource {
    #[must_use]
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

impl AudioSource for CpalSource {
    fn run(&mut self, blocks: &Sender<BlockMsg>, stop: &AtomicBool) -> Result<(), DeviceError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(DeviceError::NoDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_owned());
        info!(
            device = %device_name,
            sample_rate = self.sample_rate,
            channels = self.channels,
            "opening input stream"
        );

        let config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let tx = blocks.clone();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // The writer owns the receiving side; a closed queue just
                    // means the session is tearing down.
                    let _ = tx.send(BlockMsg::Block(SampleBlock(data.to_vec())));
                },
                |err| {
                    // Mid-capture device errors are logged and capture
                    // continues best-effort.
                    warn!(error = %err, "audio stream error");
                },
                None,
            )
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        while !stop.load(Ordering::Relaxed) {
            std::thread::sleep(self.poll_interval);
        }

        // Stream torn down here: no more callbacks, no more blocks.
        drop(stream);
        info!("input stream closed");
        Ok(())
    }
}
