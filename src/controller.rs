//! Brightness controller implementation.

use crate::error::ProviderError;
use crate::levels::{Level, LevelTable};
use crate::provider::{DeviceHandle, DeviceProvider};
use crate::state::ControllerState;

use log::{debug, trace, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// The work performed by a background refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// Re-read the level table and the current level, like [`BrightnessController::reload`].
    Reload,
    /// Re-read the current level only, like [`BrightnessController::resynchronize`].
    Resynchronize,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Up,
    Down,
}

// =============================================================================
// BrightnessController
// =============================================================================

/// Maps arbitrary brightness requests onto the discrete levels a device accepts.
///
/// The controller caches the device's level table, the index of the level it
/// believes is active, and whether the device is supported at all. Device
/// failures never escape: they downgrade the controller to the unsupported
/// state, where reads return 0 and writes do nothing until the next
/// [`reload`](Self::reload) succeeds.
///
/// # Example
///
/// ```
/// use screen_brightness::{BrightnessController, MockProvider};
///
/// let controller = BrightnessController::new(MockProvider::new(vec![20, 40, 60, 80, 100], 60));
/// assert_eq!(controller.reload(), (100, true));
///
/// controller.raise();
/// assert_eq!(controller.current_value(), 80);
///
/// controller.set_nearest(50);
/// assert_eq!(controller.current_value(), 40);
/// ```
pub struct BrightnessController<P> {
    shared: Arc<Shared<P>>,
}

struct Shared<P> {
    provider: P,
    state: Mutex<ControllerState>,
    refresh_in_flight: AtomicBool,
    /// Bumped under the state lock by every device write.
    write_generation: AtomicU64,
}

impl<P: DeviceProvider> BrightnessController<P> {
    /// Create a controller in the unsupported state.
    ///
    /// Call [`reload`](Self::reload) to populate it from the device.
    pub fn new(provider: P) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                state: Mutex::new(ControllerState::unsupported()),
                refresh_in_flight: AtomicBool::new(false),
                write_generation: AtomicU64::new(0),
            }),
        }
    }

    /// The device provider backing this controller.
    pub fn provider(&self) -> &P {
        &self.shared.provider
    }

    /// Re-query the device and replace all cached state.
    ///
    /// Returns the highest supported level and whether the device is
    /// supported; `(0, false)` when it is not.
    pub fn reload(&self) -> (Level, bool) {
        self.shared.refresh()
    }

    /// Read the device's live level and realign the cached index with it.
    ///
    /// Returns the level read, or `None` when unsupported. A failed read
    /// downgrades the controller to unsupported.
    pub fn resynchronize(&self) -> Option<Level> {
        self.shared.resynchronize()
    }

    /// The device's live brightness level, or 0 when unsupported.
    pub fn current_value(&self) -> Level {
        self.resynchronize().unwrap_or(0)
    }

    /// Step one level up from the cached index.
    ///
    /// Returns `true` if a level was written. Saturates at the top level.
    pub fn raise(&self) -> bool {
        self.shared.step(Step::Up)
    }

    /// Step one level down from the cached index.
    ///
    /// Returns `true` if a level was written. Saturates at the lowest level.
    pub fn lower(&self) -> bool {
        self.shared.step(Step::Down)
    }

    /// Write the supported level closest to `target`.
    ///
    /// Returns `true` if a level was written.
    pub fn set_nearest(&self, target: Level) -> bool {
        let shared = &self.shared;
        let mut state = shared.lock();
        if !state.supported {
            return false;
        }
        let index = state.levels.nearest_index(target);
        trace!("set_nearest: target={} -> index {}", target, index);
        shared.write_index(&mut state, index)
    }

    /// The highest supported level, or 0 when unsupported.
    pub fn max_level(&self) -> Level {
        self.shared.lock().max_level()
    }

    /// Whether the device exposed brightness control at the last refresh.
    pub fn is_supported(&self) -> bool {
        self.shared.lock().supported
    }

    /// The cached index into the level table.
    pub fn index(&self) -> usize {
        self.shared.lock().index
    }

    /// The level recorded by the most recent device read or write.
    ///
    /// Unlike [`current_value`](Self::current_value) this does not touch the
    /// device.
    pub fn cached_value(&self) -> Level {
        self.shared.lock().current
    }

    /// Get a consistent snapshot of the cached state.
    pub fn state(&self) -> ControllerState {
        self.shared.lock().clone()
    }

    /// Whether a background refresh is currently running.
    pub fn is_refresh_in_flight(&self) -> bool {
        self.shared.refresh_in_flight.load(Ordering::Acquire)
    }
}

impl<P: DeviceProvider + 'static> BrightnessController<P> {
    /// Run a refresh on a worker thread.
    ///
    /// At most one refresh runs at a time. If one is already in flight the
    /// request is dropped and `None` is returned. The refreshed state is
    /// published atomically when the worker completes; a level written by
    /// [`raise`](BrightnessController::raise), [`lower`](BrightnessController::lower)
    /// or [`set_nearest`](BrightnessController::set_nearest) while the worker
    /// was reading takes precedence over the level it read.
    pub fn request_refresh(&self, kind: RefreshKind) -> Option<JoinHandle<()>> {
        if self
            .shared
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("refresh already in flight, dropping {:?} request", kind);
            return None;
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("brightness-refresh".into())
            .spawn(move || {
                let _in_flight = InFlightGuard(&shared.refresh_in_flight);
                match kind {
                    RefreshKind::Reload => {
                        shared.refresh();
                    }
                    RefreshKind::Resynchronize => {
                        shared.resynchronize();
                    }
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("failed to spawn brightness refresh thread: {}", e);
                self.shared.refresh_in_flight.store(false, Ordering::Release);
                None
            }
        }
    }
}

/// Clears the in-flight flag when the worker finishes, even on panic.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Shared state and device access
// =============================================================================

impl<P: DeviceProvider> Shared<P> {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build a complete state from the device without touching the cache.
    fn query_device(&self) -> ControllerState {
        let Some(handle) = self.provider.probe() else {
            debug!("brightness device not found");
            return ControllerState::unsupported();
        };

        let raw = match handle.read_levels() {
            Ok(raw) if raw.is_empty() => {
                debug!("brightness device reported no levels");
                return ControllerState::unsupported();
            }
            Ok(raw) => raw,
            Err(e) => {
                debug!("failed to read brightness levels: {}", e);
                return ControllerState::unsupported();
            }
        };
        let levels = LevelTable::from_levels(raw);

        let current = match handle.read_current() {
            Ok(current) => current,
            Err(e) => {
                debug!("failed to read current brightness: {}", e);
                return ControllerState::unsupported();
            }
        };

        let index = levels.nearest_index(current);
        ControllerState {
            supported: true,
            levels,
            index,
            current,
        }
    }

    fn write_generation(&self) -> u64 {
        self.write_generation.load(Ordering::Acquire)
    }

    /// Query the device and publish the result.
    ///
    /// If a write landed while the device was being queried, the written level
    /// is kept and only the fresher level table is taken over.
    fn refresh(&self) -> (Level, bool) {
        let generation = self.write_generation();
        let next = self.query_device();

        let mut state = self.lock();
        if self.write_generation() == generation {
            debug!(
                "brightness state replaced: supported={}, levels={:?}, index={}, current={}",
                next.supported,
                next.levels.as_slice(),
                next.index,
                next.current
            );
            *state = next;
        } else if next.supported && state.supported {
            debug!(
                "write landed during refresh, keeping level {} with levels {:?}",
                state.current,
                next.levels.as_slice()
            );
            state.index = next.levels.nearest_index(state.current);
            state.levels = next.levels;
        } else {
            debug!("write landed during refresh, discarding refreshed state");
        }
        (state.max_level(), state.supported)
    }

    fn resynchronize(&self) -> Option<Level> {
        let generation = {
            let state = self.lock();
            if !state.supported {
                return None;
            }
            self.write_generation()
        };

        let read = self
            .provider
            .probe()
            .ok_or(ProviderError::DeviceNotFound)
            .and_then(|handle| handle.read_current());

        let mut state = self.lock();
        if self.write_generation() != generation {
            trace!("write landed during resynchronize, keeping level {}", state.current);
            return state.supported.then_some(state.current);
        }
        match read {
            // A concurrent refresh may have dropped support while we were reading.
            Ok(_) if !state.supported => None,
            Ok(current) => {
                state.index = state.levels.nearest_index(current);
                state.current = current;
                trace!("resynchronized: current={}, index={}", current, state.index);
                Some(current)
            }
            Err(e) => {
                debug!("resynchronize failed, brightness unsupported: {}", e);
                *state = ControllerState::unsupported();
                None
            }
        }
    }

    fn step(&self, step: Step) -> bool {
        let mut state = self.lock();
        if !state.supported {
            return false;
        }

        let index = match step {
            Step::Up if state.index < state.levels.last_index() => state.index + 1,
            Step::Down if state.index > 0 => state.index - 1,
            _ => {
                trace!("{:?} at boundary (index {}), nothing to do", step, state.index);
                return false;
            }
        };
        self.write_index(&mut state, index)
    }

    /// Write `levels[index]` to the device; the caller holds the state lock.
    fn write_index(&self, state: &mut ControllerState, index: usize) -> bool {
        let Some(level) = state.levels.get(index) else {
            return false;
        };

        // The state lock stays held across the device write, so cached readers
        // wait for the write to finish and never see the old index after it.
        self.write_generation.fetch_add(1, Ordering::AcqRel);

        let written = self
            .provider
            .probe()
            .ok_or(ProviderError::DeviceNotFound)
            .and_then(|handle| handle.write(level));

        match written {
            Ok(()) => {
                debug!("set brightness to {} (index {})", level, index);
                state.index = index;
                state.current = level;
                true
            }
            Err(e) => {
                debug!("failed to set brightness to {}, brightness unsupported: {}", level, e);
                *state = ControllerState::unsupported();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use std::time::Duration;

    fn wait_for_held_read(mock: &MockProvider) {
        while mock.held_reads() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn scenario() -> BrightnessController<MockProvider> {
        let controller = BrightnessController::new(MockProvider::new(vec![20, 40, 60, 80, 100], 60));
        assert_eq!(controller.reload(), (100, true));
        assert_eq!(controller.index(), 2);
        controller
    }

    #[test]
    fn test_starts_unsupported() {
        let controller = BrightnessController::new(MockProvider::new(vec![20, 40], 40));
        assert!(!controller.is_supported());
        assert_eq!(controller.max_level(), 0);
        assert_eq!(controller.current_value(), 0);
        assert!(!controller.raise());
        assert!(controller.provider().writes().is_empty());
    }

    #[test]
    fn test_step_scenario() {
        let controller = scenario();
        let mock = controller.provider();

        assert!(controller.raise());
        assert_eq!(controller.index(), 3);
        assert_eq!(mock.writes(), vec![80]);

        assert!(controller.lower());
        assert!(controller.lower());
        assert!(controller.lower());
        assert_eq!(controller.index(), 0);
        assert_eq!(mock.writes(), vec![80, 60, 40, 20]);
    }

    #[test]
    fn test_set_nearest_scenario() {
        let controller = scenario();
        let mock = controller.provider();

        assert!(controller.set_nearest(55));
        assert_eq!(controller.index(), 2);
        assert!(controller.set_nearest(50));
        assert_eq!(controller.index(), 1);
        assert_eq!(mock.writes(), vec![60, 40]);
        assert_eq!(mock.current(), 40);
    }

    #[test]
    fn test_set_nearest_exact_level() {
        let controller = scenario();
        let levels = controller.state().levels;

        for (i, &level) in levels.as_slice().iter().enumerate() {
            controller.provider().clear_writes();
            assert!(controller.set_nearest(level));
            assert_eq!(controller.index(), i);
            assert_eq!(controller.provider().writes(), vec![level]);
        }
    }

    #[test]
    fn test_boundaries_do_not_write() {
        let controller = scenario();
        let mock = controller.provider();

        controller.set_nearest(255);
        mock.clear_writes();
        assert!(!controller.raise());
        assert_eq!(controller.index(), 4);

        controller.set_nearest(0);
        mock.clear_writes();
        assert!(!controller.lower());
        assert_eq!(controller.index(), 0);
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_single_level_table() {
        let controller = BrightnessController::new(MockProvider::new(vec![70, 70, 70], 70));
        assert_eq!(controller.reload(), (70, true));
        assert!(!controller.raise());
        assert!(!controller.lower());
        assert!(controller.provider().writes().is_empty());
    }

    #[test]
    fn test_reload_is_idempotent() {
        let controller = scenario();
        let first = controller.state();
        assert_eq!(controller.reload(), (100, true));
        assert_eq!(controller.state(), first);
    }

    #[test]
    fn test_reload_dedups_unsorted_levels() {
        let controller =
            BrightnessController::new(MockProvider::new(vec![100, 0, 50, 50, 25, 100, 75], 51));
        assert_eq!(controller.reload(), (100, true));

        let state = controller.state();
        assert_eq!(state.levels.as_slice(), &[0, 25, 50, 75, 100]);
        assert_eq!(state.index, 2);
        assert_eq!(state.current, 51);
    }

    #[test]
    fn test_current_value_tracks_external_changes() {
        let controller = scenario();
        controller.provider().set_current(90);

        assert_eq!(controller.current_value(), 90);
        // 90 ties between 80 and 100, lower wins
        assert_eq!(controller.index(), 3);
    }

    #[test]
    fn test_steps_are_relative_to_cached_index() {
        let controller = scenario();
        controller.provider().set_current(20);

        // No resynchronize: the step starts from the stale index 2.
        assert!(controller.raise());
        assert_eq!(controller.provider().writes(), vec![80]);

        controller.provider().set_current(20);
        controller.resynchronize();
        assert!(controller.raise());
        assert_eq!(controller.provider().writes(), vec![80, 40]);
    }

    #[test]
    fn test_unsupported_device() {
        let controller = BrightnessController::new(MockProvider::unsupported());
        assert_eq!(controller.reload(), (0, false));
        assert_eq!(controller.current_value(), 0);
        assert!(!controller.raise());
        assert!(!controller.lower());
        assert!(!controller.set_nearest(128));
        assert!(controller.provider().writes().is_empty());
        assert_eq!(controller.state(), ControllerState::unsupported());
    }

    #[test]
    fn test_empty_level_set_is_unsupported() {
        let controller = BrightnessController::new(MockProvider::new(Vec::new(), 10));
        assert_eq!(controller.reload(), (0, false));
        assert_eq!(controller.state().levels, LevelTable::unsupported());
    }

    #[test]
    fn test_read_failure_downgrades_until_reload() {
        let controller = scenario();
        let mock = controller.provider();

        mock.fail_reads(true);
        assert_eq!(controller.current_value(), 0);
        assert!(!controller.is_supported());
        assert!(!controller.raise());
        assert!(!controller.set_nearest(80));
        assert!(mock.writes().is_empty());

        mock.fail_reads(false);
        assert_eq!(controller.reload(), (100, true));
        assert_eq!(controller.current_value(), 60);
    }

    #[test]
    fn test_write_failure_downgrades() {
        let controller = scenario();
        controller.provider().fail_writes(true);

        assert!(!controller.raise());
        assert!(!controller.is_supported());
        assert_eq!(controller.max_level(), 0);
    }

    #[test]
    fn test_hot_unplug_and_replug() {
        let controller = scenario();
        let mock = controller.provider();

        mock.set_supported(false);
        assert_eq!(controller.reload(), (0, false));
        assert_eq!(controller.current_value(), 0);

        mock.set_supported(true);
        assert_eq!(controller.reload(), (100, true));
        assert_eq!(controller.current_value(), 60);
    }

    #[test]
    fn test_every_operation_probes_afresh() {
        let controller = scenario();
        let before = controller.provider().probe_count();

        controller.current_value();
        controller.raise();
        controller.set_nearest(20);
        assert_eq!(controller.provider().probe_count(), before + 3);
    }

    #[test]
    fn test_background_reload() {
        let controller = BrightnessController::new(MockProvider::new(vec![10, 20, 30], 20));
        let handle = controller.request_refresh(RefreshKind::Reload).unwrap();
        handle.join().unwrap();

        assert!(controller.is_supported());
        assert_eq!(controller.max_level(), 30);
        assert_eq!(controller.index(), 1);
        assert_eq!(controller.cached_value(), 20);
        assert!(!controller.is_refresh_in_flight());
    }

    #[test]
    fn test_background_resynchronize() {
        let controller = scenario();
        controller.provider().set_current(100);

        let handle = controller.request_refresh(RefreshKind::Resynchronize).unwrap();
        handle.join().unwrap();
        assert_eq!(controller.cached_value(), 100);
        assert_eq!(controller.index(), 4);
    }

    #[test]
    fn test_refresh_requests_are_dropped_while_in_flight() {
        let controller = scenario();
        controller.provider().block_probes();

        let handle = controller.request_refresh(RefreshKind::Reload).unwrap();
        assert!(controller.is_refresh_in_flight());
        assert!(controller.request_refresh(RefreshKind::Reload).is_none());
        assert!(controller.request_refresh(RefreshKind::Resynchronize).is_none());

        controller.provider().unblock_probes();
        handle.join().unwrap();
        assert!(!controller.is_refresh_in_flight());
        assert!(controller.request_refresh(RefreshKind::Reload).is_some());
    }

    #[test]
    fn test_write_during_background_resynchronize_wins() {
        let controller = scenario();
        let mock = controller.provider();
        mock.hold_reads();

        let handle = controller.request_refresh(RefreshKind::Resynchronize).unwrap();
        // The worker has read 60 and is parked before committing it.
        wait_for_held_read(mock);
        assert!(controller.set_nearest(100));
        assert_eq!(controller.index(), 4);

        mock.release_reads();
        handle.join().unwrap();

        assert_eq!(mock.current(), 100);
        assert_eq!(controller.index(), 4);
        assert_eq!(controller.cached_value(), 100);
        assert!(!controller.raise());
        assert!(controller.lower());
        assert_eq!(mock.writes(), vec![100, 80]);
    }

    #[test]
    fn test_write_during_background_reload_keeps_level_and_takes_new_table() {
        let controller = scenario();
        let mock = controller.provider();
        mock.set_levels(vec![20, 40, 60, 80, 100, 120]);
        mock.hold_reads();

        let handle = controller.request_refresh(RefreshKind::Reload).unwrap();
        wait_for_held_read(mock);
        assert!(controller.set_nearest(100));

        mock.release_reads();
        handle.join().unwrap();

        assert!(controller.is_supported());
        assert_eq!(controller.max_level(), 120);
        assert_eq!(controller.index(), 4);
        assert_eq!(controller.cached_value(), 100);
        assert!(controller.raise());
        assert_eq!(mock.writes(), vec![100, 120]);
    }

    #[test]
    fn test_background_reload_without_concurrent_write_replaces_state() {
        let controller = scenario();
        let mock = controller.provider();
        mock.set_levels(vec![30, 60, 90]);
        mock.set_current(90);
        mock.hold_reads();

        let handle = controller.request_refresh(RefreshKind::Reload).unwrap();
        wait_for_held_read(mock);
        mock.release_reads();
        handle.join().unwrap();

        assert_eq!(controller.max_level(), 90);
        assert_eq!(controller.index(), 2);
        assert_eq!(controller.cached_value(), 90);
    }
}
