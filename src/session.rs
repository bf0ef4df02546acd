use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tracing::{info, warn};

use crate::audio::source::AudioSource;
use crate::audio::writer::{BufferWriter, SealedBuffer, WavSink, WriterError};
use crate::audio::BlockMsg;
use crate::config::AudioConfig;
use crate::media::MediaControl;
use crate::output::OutputMode;

/// Session-level failures, caught and logged at the app boundary
#[derive(Debug, Error)]
pub enum SessionError {
    /// A start was requested while a session is active
    #[error("a recording session is already active")]
    AlreadyRecording,

    /// The sealed buffer is missing at stop time; transcription is skipped
    #[error("recording buffer missing at {0}")]
    BufferMissing(PathBuf),

    /// The writer failed to persist or seal the buffer
    #[error(transparent)]
    Writer(#[from] WriterError),

    /// The previous buffer could not be cleared, or a thread could not spawn
    #[error("session I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// One press-to-release recording. Owns the producer/writer pair and the
/// single-use recording buffer for its lifetime.
pub struct CaptureSession {
    mode: OutputMode,
    resume_playback: bool,
    stop_flag: Arc<AtomicBool>,
    producer: thread::JoinHandle<()>,
    writer: BufferWriter,
}

impl CaptureSession {
    /// Output mode requested when the session started
    #[must_use]
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Begin capturing: clears the previous buffer, spawns the writer and the
    /// producer, and pauses the media player if it is playing.
    ///
    /// The caller enforces the single-session invariant; see
    /// [`SessionError::AlreadyRecording`].
    ///
    /// # Errors
    /// Returns error if the buffer target cannot be prepared
    pub fn start(
        mode: OutputMode,
        source: Box<dyn AudioSource>,
        media: &dyn MediaControl,
        audio: &AudioConfig,
        buffer_path: &Path,
    ) -> Result<Self, SessionError> {
        // The buffer target is single-use: drop whatever the previous
        // session left behind.
        match fs::remove_file(buffer_path) {
            Ok(()) => info!(path = %buffer_path.display(), "removed previous recording buffer"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SessionError::Io(e)),
        }

        let sink = WavSink::create(buffer_path, audio.sample_rate, audio.channels)?;
        let (tx, rx) = mpsc::channel();
        let writer = BufferWriter::spawn(Box::new(sink), rx, buffer_path.to_path_buf());

        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_flag);
        let producer = thread::Builder::new()
            .name("audio-capture".to_owned())
            .spawn(move || {
                let mut source = source;
                if let Err(e) = source.run(&tx, &stop) {
                    // Device errors are non-fatal; the session still seals
                    // whatever made it into the queue.
                    warn!(error = %e, "audio source ended with device error");
                }
                // The source has shut down, so the sentinel is guaranteed to
                // be the last message.
                let _ = tx.send(BlockMsg::Seal);
            })?;

        let resume_playback = pause_if_playing(media);

        info!(?mode, resume_playback, "capture session started");

        Ok(Self {
            mode,
            resume_playback,
            stop_flag,
            producer,
            writer,
        })
    }

    /// Stop capturing and block until the buffer is sealed.
    ///
    /// Playback is resumed immediately (before the flush wait and before
    /// transcription) to keep the interruption short. The flush wait is
    /// mandatory: transcription must never see an unsealed buffer.
    ///
    /// # Errors
    /// Returns error if the writer failed or the sealed buffer is missing
    pub fn stop(self, media: &dyn MediaControl) -> Result<SealedBuffer, SessionError> {
        self.stop_flag.store(true, Ordering::Relaxed);

        if self.resume_playback {
            if let Err(e) = media.toggle_playback() {
                warn!(error = %e, "failed to resume playback");
            }
        }

        if self.producer.join().is_err() {
            warn!("audio producer thread panicked");
        }

        let sealed = self.writer.wait()?;
        if !sealed.path.exists() {
            return Err(SessionError::BufferMissing(sealed.path));
        }

        info!(
            blocks = sealed.blocks,
            samples = sealed.samples,
            "capture session stopped, buffer flushed"
        );
        Ok(sealed)
    }
}

fn pause_if_playing(media: &dyn MediaControl) -> bool {
    match media.is_playing() {
        Ok(true) => {
            if let Err(e) = media.toggle_playback() {
                warn!(error = %e, "failed to pause playback");
                false
            } else {
                info!("paused playback for capture");
                true
            }
        }
        Ok(false) => false,
        Err(e) => {
            warn!(error = %e, "media state query failed");
            false
        }
    }
}
