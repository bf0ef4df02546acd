use hound::{WavSpec, WavWriter};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::thread;
use thiserror::Error;
use tracing::{info, warn};

use super::{BlockMsg, SampleBlock};

/// Buffer-side write errors
#[derive(Debug, Error)]
pub enum WriterError {
    /// The buffer file could not be created
    #[error("failed to create recording buffer at {path}: {source}")]
    Create {
        /// Buffer path
        path: PathBuf,
        /// Underlying hound error
        source: hound::Error,
    },

    /// A sample block could not be written
    #[error("failed to write sample block: {0}")]
    Write(#[from] hound::Error),

    /// The buffer could not be finalized
    #[error("failed to seal recording buffer: {0}")]
    Seal(hound::Error),

    /// The drain thread died without reporting a result
    #[error("buffer writer thread panicked")]
    Panicked,
}

/// Destination for sample blocks. Split from the drain loop so tests can
/// observe ordering and inject slow writes.
pub trait BlockSink: Send {
    /// Persist one block, in arrival order
    ///
    /// # Errors
    /// Returns error if the block cannot be written
    fn write_block(&mut self, block: &SampleBlock) -> Result<(), WriterError>;

    /// Seal the destination; called exactly once, after the last block
    ///
    /// # Errors
    /// Returns error if the destination cannot be finalized
    fn seal(self: Box<Self>) -> Result<(), WriterError>;
}

/// WAV file sink (32-bit float samples)
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
}

impl WavSink {
    /// Create the buffer file, truncating nothing: the caller removes any
    /// previous buffer before this runs
    ///
    /// # Errors
    /// Returns error if the file or its parent directory cannot be created
    pub fn create(path: &Path, sample_rate: u32, channels: u16) -> Result<Self, WriterError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| WriterError::Create {
                path: path.to_path_buf(),
                source: hound::Error::IoError(e),
            })?;
        }

        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        let writer = WavWriter::create(path, spec).map_err(|source| WriterError::Create {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self { writer })
    }
}

impl BlockSink for WavSink {
    fn write_block(&mut self, block: &SampleBlock) -> Result<(), WriterError> {
        for &sample in &block.0 {
            self.writer.write_sample(sample)?;
        }
        Ok(())
    }

    fn seal(self: Box<Self>) -> Result<(), WriterError> {
        self.writer.finalize().map_err(WriterError::Seal)
    }
}

/// Summary of a sealed recording buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBuffer {
    /// Location of the sealed file
    pub path: PathBuf,
    /// Number of blocks written
    pub blocks: u64,
    /// Total samples written
    pub samples: u64,
}

/// Single consumer draining the block queue into a sink. One instance backs
/// each session; never reused.
pub struct BufferWriter {
    handle: thread::JoinHandle<Result<(u64, u64), WriterError>>,
    path: PathBuf,
}

impl BufferWriter {
    /// Spawn the drain thread. It terminates only on the sentinel (or a
    /// closed queue) and seals the sink exactly once.
    #[must_use]
    pub fn spawn(sink: Box<dyn BlockSink>, rx: Receiver<BlockMsg>, path: PathBuf) -> Self {
        let handle = thread::spawn(move || drain(sink, &rx));
        Self { handle, path }
    }

    /// Block until the buffer is sealed. This is the flush-complete signal:
    /// it fires exactly once, and transcription must not start before it.
    ///
    /// # Errors
    /// Returns error if writing or sealing failed, or the thread panicked
    pub fn wait(self) -> Result<SealedBuffer, WriterError> {
        let (blocks, samples) = self.handle.join().map_err(|_| WriterError::Panicked)??;
        Ok(SealedBuffer {
            path: self.path,
            blocks,
            samples,
        })
    }
}

fn drain(mut sink: Box<dyn BlockSink>, rx: &Receiver<BlockMsg>) -> Result<(u64, u64), WriterError> {
    let mut blocks = 0u64;
    let mut samples = 0u64;

    loop {
        match rx.recv() {
            Ok(BlockMsg::Block(block)) => {
                sink.write_block(&block)?;
                blocks += 1;
                samples += block.len() as u64;
            }
            Ok(BlockMsg::Seal) => break,
            Err(_) => {
                // Producer went away without a sentinel; seal what we have
                // so the stop path never hangs.
                warn!("block queue closed without sentinel");
                break;
            }
        }
    }

    sink.seal()?;
    info!(blocks, samples, "recording buffer sealed");
    Ok((blocks, samples))
}
