use anyhow::{anyhow, Result};
use rdev::{listen, Event, EventType, Key};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, trace};

use super::state_machine::{KeyInput, KeySym};
use crate::config::HotkeyConfig;

/// Maps raw `rdev` keys to chord roles. Left/right variants of a modifier
/// count as the same logical key.
pub struct KeyMap {
    primary: Vec<Key>,
    secondary: Vec<Key>,
    notes: Key,
    clipboard: Key,
}

impl KeyMap {
    /// Resolve configured key names
    ///
    /// # Errors
    /// Returns error on an unknown modifier or trigger key name
    pub fn from_config(config: &HotkeyConfig) -> Result<Self> {
        Ok(Self {
            primary: parse_modifier(&config.primary_modifier)?,
            secondary: parse_modifier(&config.secondary_modifier)?,
            notes: parse_key(&config.notes_key)?,
            clipboard: parse_key(&config.clipboard_key)?,
        })
    }

    fn classify(&self, key: Key) -> Option<KeySym> {
        if self.primary.contains(&key) {
            Some(KeySym::PrimaryModifier)
        } else if self.secondary.contains(&key) {
            Some(KeySym::SecondaryModifier)
        } else if key == self.notes {
            Some(KeySym::NotesTrigger)
        } else if key == self.clipboard {
            Some(KeySym::ClipboardTrigger)
        } else {
            None
        }
    }
}

/// Start the OS-level key listener on its own thread and return the channel
/// of classified events.
///
/// The callback only classifies and forwards over an unbounded channel, so
/// it never blocks the OS event delivery path.
#[must_use]
pub fn spawn(map: KeyMap) -> UnboundedReceiver<KeyInput> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let callback = move |event: Event| {
            trace!(event_type = ?event.event_type, "key event");
            let input = match event.event_type {
                EventType::KeyPress(key) => map.classify(key).map(KeyInput::Pressed),
                EventType::KeyRelease(key) => map.classify(key).map(KeyInput::Released),
                _ => None,
            };
            if let Some(input) = input {
                debug!(?input, "chord key event");
                // Receiver dropped means the app is shutting down.
                let _ = tx.send(input);
            }
        };

        if let Err(e) = listen(callback) {
            error!(error = ?e, "global key listener failed");
        }
    });

    rx
}

fn parse_modifier(name: &str) -> Result<Vec<Key>> {
    match name {
        "Command" | "Super" | "Meta" => Ok(vec![Key::MetaLeft, Key::MetaRight]),
        "Control" | "Ctrl" => Ok(vec![Key::ControlLeft, Key::ControlRight]),
        "Option" | "Alt" => Ok(vec![Key::Alt, Key::AltGr]),
        "Shift" => Ok(vec![Key::ShiftLeft, Key::ShiftRight]),
        _ => Err(anyhow!("unknown modifier: {}", name)),
    }
}

fn parse_key(name: &str) -> Result<Key> {
    match name {
        "A" => Ok(Key::KeyA),
        "B" => Ok(Key::KeyB),
        "C" => Ok(Key::KeyC),
        "D" => Ok(Key::KeyD),
        "E" => Ok(Key::KeyE),
        "F" => Ok(Key::KeyF),
        "G" => Ok(Key::KeyG),
        "H" => Ok(Key::KeyH),
        "I" => Ok(Key::KeyI),
        "J" => Ok(Key::KeyJ),
        "K" => Ok(Key::KeyK),
        "L" => Ok(Key::KeyL),
        "M" => Ok(Key::KeyM),
        "N" => Ok(Key::KeyN),
        "O" => Ok(Key::KeyO),
        "P" => Ok(Key::KeyP),
        "Q" => Ok(Key::KeyQ),
        "R" => Ok(Key::KeyR),
        "S" => Ok(Key::KeyS),
        "T" => Ok(Key::KeyT),
        "U" => Ok(Key::KeyU),
        "V" => Ok(Key::KeyV),
        "W" => Ok(Key::KeyW),
        "X" => Ok(Key::KeyX),
        "Y" => Ok(Key::KeyY),
        "Z" => Ok(Key::KeyZ),
        _ => Err(anyhow!("unsupported key: {}", name)),
    }
}
