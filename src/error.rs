//! Error types for the brightness controller and its host surface.

/// Errors reported by a [`DeviceProvider`](crate::DeviceProvider) implementation.
///
/// These never escape the [`BrightnessController`](crate::BrightnessController):
/// any of them downgrades the controller to the unsupported state.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The brightness device could not be located.
    #[error("Brightness device not found")]
    DeviceNotFound,

    /// A device control request failed.
    #[error("{request} failed (error code: {code})")]
    Ioctl {
        /// The request name.
        request: &'static str,
        /// The OS error code.
        code: u32,
    },

    /// A device control request returned fewer bytes than required.
    #[error("{request} returned {actual} bytes (expected at least {expected})")]
    ShortRead {
        /// The request name.
        request: &'static str,
        /// Minimum number of bytes required.
        expected: usize,
        /// Number of bytes actually returned.
        actual: usize,
    },

    /// The device went away between probe and use.
    #[error("Brightness device disconnected")]
    Disconnected,
}

/// Errors returned when a host command cannot be applied.
///
/// A failed command never changes the controller state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The command name is not recognised.
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    /// The command requires an argument but none was given.
    #[error("Command {0:?} requires an argument")]
    MissingArgument(&'static str),

    /// The argument could not be parsed for the command.
    #[error("Invalid argument {arg:?} for {command:?} (expected an integer in 0-255)")]
    InvalidArgument {
        /// The command name.
        command: &'static str,
        /// The offending argument text.
        arg: String,
    },
}

/// Errors returned while parsing measure options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    /// An option value could not be interpreted.
    #[error("Invalid value {value:?} for option {key}")]
    InvalidValue {
        /// The option key.
        key: &'static str,
        /// The offending value.
        value: String,
    },
}
