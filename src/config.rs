use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Top-level configuration, loaded from `~/.voicenote.toml`
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub hotkey: HotkeyConfig,
    pub audio: AudioConfig,
    pub paths: PathsConfig,
    pub model: ModelConfig,
    pub telemetry: TelemetryConfig,
}

/// Chord layout: two modifiers plus one trigger key per output mode
#[derive(Debug, Deserialize, Clone)]
pub struct HotkeyConfig {
    /// Modifier whose release ends the session
    pub primary_modifier: String,
    pub secondary_modifier: String,
    /// Trigger key that starts a notes-mode session
    pub notes_key: String,
    /// Trigger key that starts a clipboard-mode session
    pub clipboard_key: String,
}

/// Capture format for the recording buffer
#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    /// Capture rate in Hz
    pub sample_rate: u32,
    pub channels: u16,
    /// How often the producer checks the stop flag, in milliseconds
    pub poll_interval_ms: u64,
}

/// Where the notes file and the scratch buffer live
#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Append-only notes target
    pub notes_file: String,
    /// Single-use WAV buffer, recreated at each session start
    pub buffer_file: String,
}

/// Whisper model settings
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Path to a ggml model file
    pub path: String,
    /// Language code (None = auto-detect)
    pub language: Option<String>,
    pub threads: usize,
    pub beam_size: usize,
}

/// Log output settings
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub log_path: String,
}

impl Config {
    /// Load config from `~/.voicenote.toml`, creating a default file on first run
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not valid TOML
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        let contents = fs::read_to_string(&config_path).context("failed to read config file")?;
        Self::parse(&contents)
    }

    /// Parse a TOML config string
    ///
    /// # Errors
    /// Returns error if the string is not a valid config
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config TOML")
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".voicenote.toml"))
    }

    fn create_default(path: &PathBuf) -> Result<()> {
        let default_config = r#"[hotkey]
primary_modifier = "Command"
secondary_modifier = "Control"
notes_key = "L"
clipboard_key = "J"

[audio]
sample_rate = 44100
channels = 1
poll_interval_ms = 100

[paths]
notes_file = "~/.voicenote/notes.txt"
buffer_file = "~/.voicenote/tmp.wav"

[model]
path = "~/.voicenote/models/ggml-small.en.bin"
language = "en"
threads = 4
beam_size = 5

[telemetry]
enabled = true
log_path = "~/.voicenote/voicenote.log"
"#;
        fs::write(path, default_config).context("failed to write default config")?;
        Ok(())
    }

    /// Expand `~` in paths to the home directory
    ///
    /// # Errors
    /// Returns error if `HOME` is not set
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}
