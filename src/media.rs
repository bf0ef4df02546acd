use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Media control errors; always logged and ignored, playback is left as-is
#[derive(Debug, Error)]
pub enum MediaError {
    /// osascript could not be executed
    #[error("failed to run osascript: {0}")]
    Spawn(#[from] std::io::Error),

    /// osascript ran but reported failure
    #[error("osascript exited with {0}")]
    Status(std::process::ExitStatus),
}

/// Best-effort control over an external media player
#[cfg_attr(test, mockall::automock)]
pub trait MediaControl: Send + Sync {
    /// Whether the player is currently playing
    ///
    /// # Errors
    /// Returns error if the player cannot be queried
    fn is_playing(&self) -> Result<bool, MediaError>;

    /// Toggle between playing and paused
    ///
    /// # Errors
    /// Returns error if the player cannot be controlled
    fn toggle_playback(&self) -> Result<(), MediaError>;
}

/// Spotify control via AppleScript
pub struct SpotifyControl;

impl MediaControl for SpotifyControl {
    fn is_playing(&self) -> Result<bool, MediaError> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(r#"tell application "Spotify" to player state as string"#)
            .output()?;
        let state = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        debug!(%state, "spotify player state");
        Ok(state == "playing")
    }

    fn toggle_playback(&self) -> Result<(), MediaError> {
        let status = Command::new("osascript")
            .arg("-e")
            .arg(r#"tell application "Spotify" to playpause"#)
            .status()?;
        if !status.success() {
            return Err(MediaError::Status(status));
        }
        Ok(())
    }
}
