//! Controller state snapshot.

use crate::levels::{Level, LevelTable};

/// A snapshot of the controller's cached state.
///
/// All fields come from the same refresh, so `index` always points into
/// `levels`. Use [`BrightnessController::state`](crate::BrightnessController::state)
/// to obtain a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState {
    /// Whether the device exposes brightness control.
    pub supported: bool,
    /// The supported levels, ascending.
    pub levels: LevelTable,
    /// Position in `levels` believed to match the device.
    pub index: usize,
    /// The level most recently read from or written to the device.
    pub current: Level,
}

impl ControllerState {
    /// The state used while brightness control is unavailable.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            levels: LevelTable::unsupported(),
            index: 0,
            current: 0,
        }
    }

    /// The highest supported level, or 0 when unsupported.
    pub fn max_level(&self) -> Level {
        if self.supported { self.levels.max() } else { 0 }
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::unsupported()
    }
}
