use tracing::{debug, info};

use crate::output::OutputMode;

/// Logical key roles in the chord, resolved from config by the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySym {
    /// Modifier whose release ends the session
    PrimaryModifier,
    /// Second modifier required to start the session
    SecondaryModifier,
    /// Trigger for a notes-mode session
    NotesTrigger,
    /// Trigger for a clipboard-mode session
    ClipboardTrigger,
}

/// Discrete key event as delivered by the global listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Pressed(KeySym),
    Released(KeySym),
}

/// Side-effecting action requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Begin capturing with the given output mode
    StartSession(OutputMode),
    /// Stop capturing and run the transcription pipeline
    EndSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ModifierState {
    primary: bool,
    secondary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    ArmedCapturing,
}

/// Tracks modifier state and recognizes the start chord and the release
/// trigger. Pure: all side effects are expressed as returned [`Action`]s.
///
/// The start guard requires both modifiers held when a trigger key goes down,
/// in any order. Release is recognized off the primary modifier alone, even
/// while the secondary modifier is still held; the asymmetry with the start
/// guard is intentional.
pub struct HotkeyStateMachine {
    phase: Phase,
    modifiers: ModifierState,
}

impl Default for HotkeyStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl HotkeyStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            modifiers: ModifierState::default(),
        }
    }

    /// Whether a session is currently armed
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.phase == Phase::ArmedCapturing
    }

    /// Apply one key event; returns the action to dispatch, if any
    pub fn handle(&mut self, input: KeyInput) -> Option<Action> {
        match input {
            KeyInput::Pressed(KeySym::PrimaryModifier) => {
                self.modifiers.primary = true;
                None
            }
            KeyInput::Pressed(KeySym::SecondaryModifier) => {
                self.modifiers.secondary = true;
                None
            }
            KeyInput::Pressed(KeySym::NotesTrigger) => self.trigger(OutputMode::Notes),
            KeyInput::Pressed(KeySym::ClipboardTrigger) => self.trigger(OutputMode::Clipboard),
            KeyInput::Released(KeySym::PrimaryModifier) => match self.phase {
                Phase::ArmedCapturing => {
                    // One key ends what two keys plus a trigger started.
                    self.modifiers = ModifierState::default();
                    self.phase = Phase::Idle;
                    info!("primary modifier released: ArmedCapturing -> Idle");
                    Some(Action::EndSession)
                }
                Phase::Idle => {
                    self.modifiers.primary = false;
                    None
                }
            },
            KeyInput::Released(KeySym::SecondaryModifier) => {
                if self.phase == Phase::Idle {
                    self.modifiers.secondary = false;
                }
                None
            }
            KeyInput::Released(KeySym::NotesTrigger | KeySym::ClipboardTrigger) => None,
        }
    }

    fn trigger(&mut self, mode: OutputMode) -> Option<Action> {
        if self.phase == Phase::ArmedCapturing {
            debug!("trigger pressed while capturing (ignored)");
            return None;
        }
        if !(self.modifiers.primary && self.modifiers.secondary) {
            debug!(?mode, "trigger pressed without full chord (ignored)");
            return None;
        }
        self.phase = Phase::ArmedCapturing;
        info!(?mode, "chord recognized: Idle -> ArmedCapturing");
        Some(Action::StartSession(mode))
    }
}
