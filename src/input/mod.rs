/// Global key listener (rdev → channel)
pub mod listener;
/// Hotkey chord state machine
pub mod state_machine;
