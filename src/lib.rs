//! voicenote - hold-to-record voice notes with local whisper transcription
//!
//! Hold the configured chord to capture microphone audio; on release the
//! recording is transcribed and delivered to the notes file or the clipboard.

/// Event loop gluing hotkeys, sessions, and delivery together
pub mod app;
/// Audio capture sources and the recording buffer writer
pub mod audio;
/// Configuration management
pub mod config;
/// Global key listening and the chord state machine
pub mod input;
/// Media player pause/resume around capture
pub mod media;
/// Transcript delivery (notes file, clipboard)
pub mod output;
/// One press-to-release capture session
pub mod session;
/// Process-wide logging
pub mod telemetry;
/// Whisper transcription gateway
pub mod transcription;
