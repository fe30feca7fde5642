//! Supported brightness levels and nearest-level search.

use std::collections::BTreeSet;

/// A brightness level as reported by the device (typically 0-100).
pub type Level = u8;

/// The sorted, deduplicated set of levels a device accepts.
///
/// Always ascending and never empty. A table of `{0}` stands in for a device
/// that is unsupported or reports no levels at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    levels: Vec<Level>,
}

impl LevelTable {
    /// The fallback table used while brightness control is unavailable.
    pub fn unsupported() -> Self {
        Self { levels: vec![0] }
    }

    /// Build a table from the raw levels reported by a device.
    ///
    /// The input may be unsorted and contain duplicates. An empty input
    /// yields the `{0}` fallback table.
    pub fn from_levels(raw: impl IntoIterator<Item = Level>) -> Self {
        let levels: Vec<Level> = raw.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        if levels.is_empty() {
            return Self::unsupported();
        }
        Self { levels }
    }

    /// Number of distinct levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always `false`; a table holds at least one level.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The level at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<Level> {
        self.levels.get(index).copied()
    }

    /// The highest supported level.
    pub fn max(&self) -> Level {
        self.levels[self.levels.len() - 1]
    }

    /// The index of the last level.
    pub fn last_index(&self) -> usize {
        self.levels.len() - 1
    }

    /// Index of the supported level closest to `target`.
    ///
    /// See [`nearest_index`].
    pub fn nearest_index(&self, target: Level) -> usize {
        nearest_index(target, &self.levels)
    }

    /// The levels as an ascending slice.
    pub fn as_slice(&self) -> &[Level] {
        &self.levels
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::unsupported()
    }
}

/// Find the index of the entry in `table` closest to `target`.
///
/// `table` must be sorted ascending and non-empty. Targets at or below the
/// first entry map to 0, targets at or above the last entry map to the last
/// index. When `target` sits exactly halfway between two neighbours the lower
/// one wins.
///
/// # Example
///
/// ```
/// use screen_brightness::nearest_index;
///
/// let table = [20, 40, 60, 80, 100];
/// assert_eq!(nearest_index(55, &table), 2);
/// assert_eq!(nearest_index(50, &table), 1);
/// assert_eq!(nearest_index(0, &table), 0);
/// assert_eq!(nearest_index(255, &table), 4);
/// ```
pub fn nearest_index(target: Level, table: &[Level]) -> usize {
    debug_assert!(!table.is_empty(), "level table must not be empty");
    let last = table.len().saturating_sub(1);

    if table.is_empty() || target <= table[0] {
        return 0;
    }
    if target >= table[last] {
        return last;
    }

    // table[0] < target < table[last], so 1 <= k <= last
    let k = table.partition_point(|&level| level < target);
    let below = target - table[k - 1];
    let above = table[k] - target;

    if below <= above { k - 1 } else { k }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: [Level; 5] = [20, 40, 60, 80, 100];

    #[test]
    fn test_from_levels_sorts_and_dedups() {
        let table = LevelTable::from_levels([60, 20, 100, 20, 40, 60, 80, 100]);
        assert_eq!(table.as_slice(), &TABLE);
        assert_eq!(table.len(), 5);
        assert_eq!(table.max(), 100);
    }

    #[test]
    fn test_from_empty_levels_falls_back() {
        let table = LevelTable::from_levels(std::iter::empty());
        assert_eq!(table, LevelTable::unsupported());
        assert_eq!(table.as_slice(), &[0]);
        assert_eq!(table.max(), 0);
    }

    #[test]
    fn test_nearest_below_and_above_range() {
        for target in 0..=20 {
            assert_eq!(nearest_index(target, &TABLE), 0, "target {}", target);
        }
        for target in 100..=255 {
            assert_eq!(nearest_index(target, &TABLE), 4, "target {}", target);
        }
    }

    #[test]
    fn test_nearest_exact_matches() {
        for (i, &level) in TABLE.iter().enumerate() {
            assert_eq!(nearest_index(level, &TABLE), i);
        }
    }

    #[test]
    fn test_nearest_prefers_closer_neighbour() {
        assert_eq!(nearest_index(55, &TABLE), 2);
        assert_eq!(nearest_index(45, &TABLE), 1);
        assert_eq!(nearest_index(41, &TABLE), 1);
        assert_eq!(nearest_index(79, &TABLE), 3);
    }

    #[test]
    fn test_nearest_tie_prefers_lower() {
        assert_eq!(nearest_index(30, &TABLE), 0);
        assert_eq!(nearest_index(50, &TABLE), 1);
        assert_eq!(nearest_index(70, &TABLE), 2);
        assert_eq!(nearest_index(90, &TABLE), 3);
    }

    #[test]
    fn test_nearest_sparse_uneven_table() {
        let table = [0, 5, 30, 31, 100];
        assert_eq!(nearest_index(17, &table), 1);
        assert_eq!(nearest_index(18, &table), 2);
        assert_eq!(nearest_index(65, &table), 3);
        assert_eq!(nearest_index(66, &table), 4);
    }

    #[test]
    fn test_nearest_single_entry_table() {
        let table = [50];
        assert_eq!(nearest_index(0, &table), 0);
        assert_eq!(nearest_index(50, &table), 0);
        assert_eq!(nearest_index(255, &table), 0);
    }

    #[test]
    fn test_nearest_is_always_in_range() {
        let table = LevelTable::from_levels([3, 9, 27, 81, 243]);
        for target in 0..=255u8 {
            let i = table.nearest_index(target);
            assert!(i < table.len());
            // No other entry is strictly closer.
            let chosen = table.get(i).map(|l| l.abs_diff(target));
            for &other in table.as_slice() {
                assert!(Some(other.abs_diff(target)) >= chosen);
            }
        }
    }
}
