//! Mock device provider for testing.

use crate::error::ProviderError;
use crate::levels::Level;
use crate::provider::{DeviceHandle, DeviceProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct GateState {
    closed: bool,
    waiting: usize,
}

/// Holds callers until opened, counting how many are parked.
#[derive(Debug, Default)]
struct Gate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

impl Gate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        self.lock().closed = true;
    }

    fn open(&self) {
        self.lock().closed = false;
        self.condvar.notify_all();
    }

    fn waiting(&self) -> usize {
        self.lock().waiting
    }

    fn pass(&self) {
        let mut state = self.lock();
        if !state.closed {
            return;
        }
        state.waiting += 1;
        while state.closed {
            state = self.condvar.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.waiting -= 1;
    }
}

#[derive(Debug, Clone, Default)]
struct MockDevice {
    supported: bool,
    levels: Vec<Level>,
    current: Level,
    writes: Vec<Level>,
    fail_reads: bool,
    fail_writes: bool,
}

/// A mock brightness device for testing.
///
/// This allows testing code that depends on [`DeviceProvider`] without
/// requiring a real display. Levels are reported exactly as given, so
/// unsorted or duplicated input reaches the controller unchanged. Every
/// successful write is recorded and becomes the device's current level.
///
/// # Example
///
/// ```
/// use screen_brightness::{BrightnessController, MockProvider};
///
/// let controller = BrightnessController::new(MockProvider::new(vec![0, 50, 100], 50));
/// controller.reload();
/// controller.raise();
/// assert_eq!(controller.provider().writes(), vec![100]);
/// ```
pub struct MockProvider {
    device: Arc<Mutex<MockDevice>>,
    probe_gate: Gate,
    read_gate: Arc<Gate>,
    probes: AtomicUsize,
}

impl MockProvider {
    /// Create a supported mock device with the given raw levels and current level.
    pub fn new(levels: Vec<Level>, current: Level) -> Self {
        Self::with_device(MockDevice {
            supported: true,
            levels,
            current,
            ..Default::default()
        })
    }

    /// Create a mock device that cannot be probed.
    pub fn unsupported() -> Self {
        Self::with_device(MockDevice::default())
    }

    fn with_device(device: MockDevice) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            probe_gate: Gate::default(),
            read_gate: Arc::new(Gate::default()),
            probes: AtomicUsize::new(0),
        }
    }

    fn device(&self) -> MutexGuard<'_, MockDevice> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the device's brightness as another agent would.
    pub fn set_current(&self, level: Level) {
        self.device().current = level;
    }

    /// The device's actual brightness level.
    pub fn current(&self) -> Level {
        self.device().current
    }

    /// Replace the raw levels the device reports.
    pub fn set_levels(&self, levels: Vec<Level>) {
        self.device().levels = levels;
    }

    /// Attach or detach the device.
    pub fn set_supported(&self, supported: bool) {
        self.device().supported = supported;
    }

    /// Make every read fail until cleared.
    pub fn fail_reads(&self, fail: bool) {
        self.device().fail_reads = fail;
    }

    /// Make every write fail until cleared.
    pub fn fail_writes(&self, fail: bool) {
        self.device().fail_writes = fail;
    }

    /// All levels written so far, oldest first.
    pub fn writes(&self) -> Vec<Level> {
        self.device().writes.clone()
    }

    /// Forget the recorded writes.
    pub fn clear_writes(&self) {
        self.device().writes.clear();
    }

    /// How many times the device has been probed.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Make probes wait until [`unblock_probes`](Self::unblock_probes) is called.
    ///
    /// Used to hold a background refresh in flight.
    pub fn block_probes(&self) {
        self.probe_gate.close();
    }

    /// Release any probes held by [`block_probes`](Self::block_probes).
    pub fn unblock_probes(&self) {
        self.probe_gate.open();
    }

    /// Make `read_current` park after sampling the level, until
    /// [`release_reads`](Self::release_reads) is called.
    ///
    /// Used to land a write between a refresh's device read and its commit.
    pub fn hold_reads(&self) {
        self.read_gate.close();
    }

    /// Release any reads parked by [`hold_reads`](Self::hold_reads).
    pub fn release_reads(&self) {
        self.read_gate.open();
    }

    /// How many reads are currently parked.
    pub fn held_reads(&self) -> usize {
        self.read_gate.waiting()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(vec![0, 25, 50, 75, 100], 50)
    }
}

impl DeviceProvider for MockProvider {
    type Handle = MockHandle;

    fn probe(&self) -> Option<MockHandle> {
        self.probe_gate.pass();
        self.probes.fetch_add(1, Ordering::SeqCst);
        if !self.device().supported {
            return None;
        }
        Some(MockHandle {
            device: Arc::clone(&self.device),
            read_gate: Arc::clone(&self.read_gate),
        })
    }
}

/// Handle returned by [`MockProvider::probe`].
pub struct MockHandle {
    device: Arc<Mutex<MockDevice>>,
    read_gate: Arc<Gate>,
}

impl MockHandle {
    fn device(&self) -> Result<MutexGuard<'_, MockDevice>, ProviderError> {
        let device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        if !device.supported {
            return Err(ProviderError::Disconnected);
        }
        Ok(device)
    }
}

impl DeviceHandle for MockHandle {
    fn read_current(&self) -> Result<Level, ProviderError> {
        let current = {
            let device = self.device()?;
            if device.fail_reads {
                return Err(ProviderError::Ioctl {
                    request: "mock read",
                    code: 0,
                });
            }
            device.current
        };
        self.read_gate.pass();
        Ok(current)
    }

    fn read_levels(&self) -> Result<Vec<Level>, ProviderError> {
        let device = self.device()?;
        if device.fail_reads {
            return Err(ProviderError::Ioctl {
                request: "mock read",
                code: 0,
            });
        }
        Ok(device.levels.clone())
    }

    fn write(&self, level: Level) -> Result<(), ProviderError> {
        let mut device = self.device()?;
        if device.fail_writes {
            return Err(ProviderError::Ioctl {
                request: "mock write",
                code: 0,
            });
        }
        device.writes.push(level);
        device.current = level;
        Ok(())
    }
}
