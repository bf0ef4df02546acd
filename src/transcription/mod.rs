//! Speech-to-text gateway: capability trait plus the whisper implementation

mod engine;

pub use engine::{TranscriptionError, Transcriber, WhisperTranscriber};

#[cfg(test)]
pub use engine::MockTranscriber;
