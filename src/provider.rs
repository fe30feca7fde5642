//! Device provider traits.

use crate::error::ProviderError;
use crate::levels::Level;

/// Trait for brightness device providers.
///
/// A provider only knows how to locate the device. Every controller operation
/// probes afresh and drops the returned handle when done, so no device handle
/// outlives a single call.
///
/// This allows for mock implementations in tests.
pub trait DeviceProvider: Send + Sync {
    /// Handle to an opened brightness device.
    type Handle: DeviceHandle;

    /// Locate the brightness device.
    ///
    /// Returns `None` when the device does not exist or cannot be opened.
    fn probe(&self) -> Option<Self::Handle>;

    /// Whether the device can currently be located.
    fn is_supported(&self) -> bool {
        self.probe().is_some()
    }
}

/// An opened brightness device.
///
/// Implementations release the underlying OS resource on drop.
pub trait DeviceHandle {
    /// Read the device's current brightness level.
    fn read_current(&self) -> Result<Level, ProviderError>;

    /// Read the levels the device accepts.
    ///
    /// The result may be unsorted and contain duplicates.
    fn read_levels(&self) -> Result<Vec<Level>, ProviderError>;

    /// Write a brightness level to the device.
    fn write(&self, level: Level) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    #[test]
    fn test_is_supported_follows_probe() {
        let mock = MockProvider::new(vec![10, 20], 10);
        assert!(mock.is_supported());

        mock.set_supported(false);
        assert!(!mock.is_supported());

        assert!(!MockProvider::unsupported().is_supported());
    }
}
