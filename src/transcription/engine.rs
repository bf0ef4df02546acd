use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::config::{Config, ModelConfig};

/// Whisper operates on 16 kHz mono input regardless of the capture format
const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Errors from the transcription gateway
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Failed to load the whisper model
    #[error("failed to load whisper model from {path}: {source}")]
    ModelLoad {
        /// Path to the model file
        path: String,
        /// Underlying error
        source: anyhow::Error,
    },

    /// The sealed recording buffer could not be read
    #[error("failed to read recording buffer {path}: {source}")]
    BufferRead {
        /// Buffer path
        path: PathBuf,
        /// Underlying hound error
        source: hound::Error,
    },

    /// Failed to create whisper inference state
    #[error("failed to create whisper state")]
    StateCreation,

    /// Inference failed
    #[error("failed to transcribe audio")]
    Inference(#[from] anyhow::Error),
}

/// Consumes a sealed recording buffer, returns plain text or fails.
/// May take seconds; must only be invoked after the buffer is sealed.
#[cfg_attr(test, mockall::automock)]
pub trait Transcriber: Send + Sync {
    /// Transcribe the recording at `buffer` to text
    ///
    /// # Errors
    /// Returns error if the buffer cannot be read or inference fails
    fn transcribe(&self, buffer: &Path) -> Result<String, TranscriptionError>;
}

/// Local whisper engine, model loaded once at startup
pub struct WhisperTranscriber {
    ctx: Mutex<WhisperContext>,
    threads: i32,
    beam_size: i32,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Load the model named in config
    ///
    /// # Errors
    /// Returns error if the model file is missing or invalid, or if
    /// `threads`/`beam_size` are zero or exceed `i32::MAX`
    pub fn new(config: &ModelConfig) -> Result<Self, TranscriptionError> {
        let model_load = |source: anyhow::Error| TranscriptionError::ModelLoad {
            path: config.path.clone(),
            source,
        };

        if config.threads == 0 {
            return Err(model_load(anyhow::anyhow!("threads must be > 0")));
        }
        if config.beam_size == 0 {
            return Err(model_load(anyhow::anyhow!("beam_size must be > 0")));
        }
        let threads = i32::try_from(config.threads)
            .map_err(|_| model_load(anyhow::anyhow!("threads value too large")))?;
        let beam_size = i32::try_from(config.beam_size)
            .map_err(|_| model_load(anyhow::anyhow!("beam_size value too large")))?;

        let model_path =
            Config::expand_path(&config.path).map_err(|e| model_load(anyhow::anyhow!("{e}")))?;
        let path_str = model_path
            .to_str()
            .ok_or_else(|| model_load(anyhow::anyhow!("model path contains invalid UTF-8")))?;

        info!(
            path = %model_path.display(),
            threads,
            beam_size,
            language = ?config.language,
            "loading whisper model"
        );

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| model_load(anyhow::anyhow!("{e:?}")))?;

        info!("whisper model loaded");

        Ok(Self {
            ctx: Mutex::new(ctx),
            threads,
            beam_size,
            language: config.language.clone(),
        })
    }

    const fn sampling_strategy(beam_size: i32) -> SamplingStrategy {
        if beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        }
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, buffer: &Path) -> Result<String, TranscriptionError> {
        let _span = tracing::debug_span!("transcription", buffer = %buffer.display()).entered();

        let (samples, sample_rate, channels) = load_wav(buffer)?;
        debug!(
            samples = samples.len(),
            sample_rate, channels, "recording buffer loaded"
        );
        let audio = to_whisper_input(&samples, sample_rate, channels);

        let mut state = self
            .ctx
            .lock()
            .map_err(|e| anyhow::anyhow!("whisper context mutex poisoned: {e}"))?
            .create_state()
            .map_err(|_| TranscriptionError::StateCreation)?;

        let mut params = FullParams::new(Self::sampling_strategy(self.beam_size));
        params.set_n_threads(self.threads);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_language(self.language.as_deref());
        params.set_translate(false);

        let start = std::time::Instant::now();
        state
            .full(params, &audio)
            .context("whisper inference failed")?;
        let inference_duration = start.elapsed();

        let mut result = String::new();
        for segment in state.as_iter() {
            result.push_str(&segment.to_string());
        }
        let result = result.trim().to_owned();

        info!(
            segments = state.full_n_segments(),
            text_len = result.len(),
            inference_ms = inference_duration.as_millis(),
            "transcription completed"
        );

        Ok(result)
    }
}

// SAFETY: WhisperContext is only reached through the Mutex, so access is
// exclusive; no other shared mutable state exists in the struct.
#[allow(unsafe_code)]
unsafe impl Send for WhisperTranscriber {}
#[allow(unsafe_code)]
unsafe impl Sync for WhisperTranscriber {}

/// Read a sealed WAV buffer into f32 samples together with its format
fn load_wav(path: &Path) -> Result<(Vec<f32>, u32, u16), TranscriptionError> {
    let buffer_read = |source: hound::Error| TranscriptionError::BufferRead {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = hound::WavReader::open(path).map_err(buffer_read)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(buffer_read)?,
        hound::SampleFormat::Int => {
            let max = f32::from(i16::MAX);
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| f32::from(v) / max))
                .collect::<Result<_, _>>()
                .map_err(buffer_read)?
        }
    };

    Ok((samples, spec.sample_rate, spec.channels))
}

/// Downmix to mono and linearly resample to 16 kHz
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn to_whisper_input(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<f32> {
    let mono: Vec<f32> = if channels <= 1 {
        samples.to_vec()
    } else {
        samples
            .chunks(channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / f32::from(channels))
            .collect()
    };

    if sample_rate == WHISPER_SAMPLE_RATE || mono.is_empty() {
        return mono;
    }

    let ratio = f64::from(sample_rate) / f64::from(WHISPER_SAMPLE_RATE);
    let output_len = (mono.len() as f64 / ratio).ceil() as usize;
    let mut resampled = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let pos = i as f64 * ratio;
        let idx = (pos as usize).min(mono.len() - 1);
        let next = (idx + 1).min(mono.len() - 1);
        let fract = (pos - pos.floor()) as f32;
        resampled.push(mono[idx] + (mono[next] - mono[idx]) * fract);
    }

    debug!(
        input_rate = sample_rate,
        input_samples = mono.len(),
        output_samples = resampled.len(),
        "resampled for whisper"
    );
    resampled
}
