//! Measure options supplied by the host.

use crate::error::OptionError;
use log::debug;

/// Options controlling how [`BrightnessMeasure`](crate::BrightnessMeasure)
/// polls and steps the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureOptions {
    /// Reload the level table on every poll to notice devices coming and going.
    pub requery_every_update: bool,
    /// Query the device on a worker thread and report the cached level.
    pub update_in_background: bool,
    /// Read the live level before `raise`/`lower` so steps start from the
    /// device's real brightness rather than the cached index.
    pub resync_before_step: bool,
    /// Action handed to the host when the device becomes unsupported.
    pub if_not_supported_action: Option<String>,
    /// Action handed to the host when the device becomes supported.
    pub if_supported_action: Option<String>,
}

impl Default for MeasureOptions {
    fn default() -> Self {
        Self {
            requery_every_update: false,
            update_in_background: false,
            resync_before_step: true,
            if_not_supported_action: None,
            if_supported_action: None,
        }
    }
}

impl MeasureOptions {
    /// Parse options from host key/value pairs.
    ///
    /// Keys are case-insensitive and unknown keys are ignored. Empty action
    /// strings count as unset.
    ///
    /// # Example
    ///
    /// ```
    /// use screen_brightness::MeasureOptions;
    ///
    /// let options = MeasureOptions::from_pairs([
    ///     ("UpdateInBackground", "1"),
    ///     ("IfNotSupportedAction", "[!HideMeter Brightness]"),
    /// ])?;
    /// assert!(options.update_in_background);
    /// assert!(options.resync_before_step);
    /// # Ok::<(), screen_brightness::OptionError>(())
    /// ```
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "requeryeveryupdate" => {
                    options.requery_every_update = parse_bool("RequeryEveryUpdate", value)?
                }
                "updateinbackground" => {
                    options.update_in_background = parse_bool("UpdateInBackground", value)?
                }
                "resyncbeforestep" => {
                    options.resync_before_step = parse_bool("ResyncBeforeStep", value)?
                }
                "ifnotsupportedaction" => options.if_not_supported_action = non_empty(value),
                "ifsupportedaction" => options.if_supported_action = non_empty(value),
                _ => debug!("ignoring unknown option {}={}", key, value),
            }
        }
        Ok(options)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, OptionError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(OptionError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
