//! Display brightness control over a discrete set of device levels.
//!
//! Many panels only accept a sparse, driver-defined list of brightness
//! levels rather than any value in 0-100. This crate quantizes arbitrary
//! requests onto that list, tracks which level is active so brightness can be
//! stepped up and down one level at a time, and keeps that bookkeeping in
//! sync with the live device.
//!
//! # Requirements
//!
//! - [`LcdProvider`] requires Windows and a panel whose video driver reports
//!   supported brightness levels (most laptop panels)
//! - Any other device can be plugged in through [`DeviceProvider`]
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> Result<(), screen_brightness::CommandError> {
//! use screen_brightness::{BrightnessMeasure, LcdProvider, MeasureOptions};
//!
//! let mut measure = BrightnessMeasure::new(LcdProvider::new(), MeasureOptions::default());
//!
//! // Query the supported levels
//! let (max, supported) = measure.reload();
//! println!("supported={} max={}", supported, max);
//!
//! // Poll the live level
//! println!("current: {}", measure.current_value());
//!
//! // Step and set
//! measure.apply_command("raise", None)?;
//! measure.apply_command("set", Some("40"))?;
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! # Testing
//!
//! Use [`MockProvider`] to test code without hardware:
//!
//! ```
//! use screen_brightness::{BrightnessController, MockProvider};
//!
//! let controller = BrightnessController::new(MockProvider::new(vec![20, 40, 60, 80, 100], 60));
//! controller.reload();
//! controller.lower();
//! assert_eq!(controller.provider().writes(), vec![40]);
//! ```

#![warn(missing_docs)]

mod command;
mod controller;
mod error;
#[cfg(windows)]
mod lcd;
mod levels;
mod measure;
mod mock;
mod options;
mod provider;
mod state;

// Re-export public API
pub use command::Command;
pub use controller::{BrightnessController, RefreshKind};
pub use error::{CommandError, OptionError, ProviderError};
#[cfg(windows)]
pub use lcd::{LCD_DEVICE_PATH, LcdHandle, LcdProvider};
pub use levels::{Level, LevelTable, nearest_index};
pub use measure::{ActionRunner, BrightnessMeasure};
pub use mock::{MockHandle, MockProvider};
pub use options::MeasureOptions;
pub use provider::{DeviceHandle, DeviceProvider};
pub use state::ControllerState;
