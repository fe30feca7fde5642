//! Host-facing brightness measure.

use crate::command::Command;
use crate::controller::{BrightnessController, RefreshKind};
use crate::error::CommandError;
use crate::levels::Level;
use crate::options::MeasureOptions;
use crate::provider::DeviceProvider;

use log::{debug, info, warn};

/// Callback that hands an action string back to the host for execution.
pub type ActionRunner = Box<dyn Fn(&str) + Send + Sync>;

/// The surface a plugin host drives: reload, poll, and commands.
///
/// Wraps a [`BrightnessController`] with the host's [`MeasureOptions`], keeps
/// track of support transitions, and remembers the level seen at the last
/// reload so it can be restored with the `revert` command.
///
/// # Example
///
/// ```
/// use screen_brightness::{BrightnessMeasure, MeasureOptions, MockProvider};
///
/// let mut measure = BrightnessMeasure::new(
///     MockProvider::new(vec![20, 40, 60, 80, 100], 60),
///     MeasureOptions::default(),
/// );
/// assert_eq!(measure.reload(), (100.0, true));
///
/// measure.execute_bang("set 50")?;
/// assert_eq!(measure.current_value(), 40.0);
/// # Ok::<(), screen_brightness::CommandError>(())
/// ```
pub struct BrightnessMeasure<P> {
    controller: BrightnessController<P>,
    options: MeasureOptions,
    last_supported: Option<bool>,
    baseline: Option<Level>,
    action_runner: Option<ActionRunner>,
}

impl<P: DeviceProvider + 'static> BrightnessMeasure<P> {
    /// Create a measure over `provider`.
    ///
    /// The device is not queried until [`reload`](Self::reload).
    pub fn new(provider: P, options: MeasureOptions) -> Self {
        Self {
            controller: BrightnessController::new(provider),
            options,
            last_supported: None,
            baseline: None,
            action_runner: None,
        }
    }

    /// Set the callback that executes `IfSupportedAction` / `IfNotSupportedAction`.
    pub fn with_action_runner(mut self, runner: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.action_runner = Some(Box::new(runner));
        self
    }

    /// The underlying controller.
    pub fn controller(&self) -> &BrightnessController<P> {
        &self.controller
    }

    /// The options this measure was created with.
    pub fn options(&self) -> &MeasureOptions {
        &self.options
    }

    /// Replace the options, e.g. after the host re-reads its configuration.
    pub fn set_options(&mut self, options: MeasureOptions) {
        self.options = options;
    }

    /// Reload the device and return `(max_level, supported)`.
    ///
    /// The level read here becomes the target of `revert`.
    pub fn reload(&mut self) -> (f64, bool) {
        let (max, supported) = self.controller.reload();
        self.baseline = supported.then(|| self.controller.cached_value());
        self.note_support(supported);
        (f64::from(max), supported)
    }

    /// The value to report for this poll.
    ///
    /// In background mode this starts a refresh (unless one is already
    /// running) and returns the level from the last completed one.
    pub fn current_value(&mut self) -> f64 {
        let level = if self.options.update_in_background {
            let kind = if self.options.requery_every_update {
                RefreshKind::Reload
            } else {
                RefreshKind::Resynchronize
            };
            self.controller.request_refresh(kind);
            self.controller.cached_value()
        } else if self.options.requery_every_update {
            self.controller.reload();
            self.controller.cached_value()
        } else {
            self.controller.current_value()
        };

        let supported = self.controller.is_supported();
        self.note_support(supported);
        f64::from(level)
    }

    /// The highest supported level, or 0 when unsupported.
    pub fn max_value(&self) -> f64 {
        f64::from(self.controller.max_level())
    }

    /// Apply a named command with an optional argument.
    ///
    /// Unknown names and malformed arguments are rejected without touching
    /// the device.
    pub fn apply_command(&self, name: &str, arg: Option<&str>) -> Result<(), CommandError> {
        let command = Command::parse(name, arg)
            .inspect_err(|e| warn!("rejected brightness command: {}", e))?;
        self.execute(command);
        Ok(())
    }

    /// Apply a raw command line such as `"raise"` or `"set 40"`.
    pub fn execute_bang(&self, args: &str) -> Result<(), CommandError> {
        let command = Command::parse_line(args)
            .inspect_err(|e| warn!("rejected brightness command: {}", e))?;
        self.execute(command);
        Ok(())
    }

    /// Execute a parsed command. Returns `true` if a level was written.
    pub fn execute(&self, command: Command) -> bool {
        debug!("executing {:?}", command);
        match command {
            Command::Raise => {
                self.resync_for_step();
                self.controller.raise()
            }
            Command::Lower => {
                self.resync_for_step();
                self.controller.lower()
            }
            Command::Set(level) => self.controller.set_nearest(level),
            Command::Revert => match self.baseline {
                Some(level) => self.controller.set_nearest(level),
                None => {
                    debug!("nothing to revert to");
                    false
                }
            },
        }
    }

    fn resync_for_step(&self) {
        if self.options.resync_before_step {
            self.controller.resynchronize();
        }
    }

    fn note_support(&mut self, supported: bool) {
        let previous = self.last_supported.replace(supported);
        if previous == Some(supported) {
            return;
        }

        if supported {
            info!(
                "brightness control available (max level {})",
                self.controller.max_level()
            );
            // Gaining support at startup is not a transition.
            if previous.is_some() {
                self.run_action(self.options.if_supported_action.as_deref());
            }
        } else {
            warn!("brightness control is not supported on this display");
            self.run_action(self.options.if_not_supported_action.as_deref());
        }
    }

    fn run_action(&self, action: Option<&str>) {
        if let (Some(action), Some(runner)) = (action, &self.action_runner) {
            debug!("running action {:?}", action);
            runner(action);
        }
    }
}
