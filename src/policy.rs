//! Tuning constants that decide when the slot array grows or shrinks.

use crate::error::Error;
use crate::error::Result;

const DEFAULT_INITIAL_CAPACITY: usize = 8;
const DEFAULT_GROW_RATIO: f64 = 2.0;
const DEFAULT_SHRINK_RATIO: f64 = 0.125;

/// `f64 -> usize` rounding for non-negative inputs. `core` has no `f64::round`.
#[inline(always)]
fn round(value: f64) -> usize {
    (value + 0.5) as usize
}

#[inline(always)]
fn ceil(value: f64) -> usize {
    let truncated = value as usize;
    if (truncated as f64) < value {
        truncated.saturating_add(1)
    } else {
        truncated
    }
}

/// Resize policy of a [`HashTable`](crate::HashTable).
///
/// - The table grows by `grow_ratio` before an insertion whenever
///   `(occupied + 1) * grow_ratio > capacity`, where `occupied` counts live
///   values *and* tombstones.
/// - The table shrinks by `shrink_ratio` after a removal whenever
///   `capacity > len / shrink_ratio`.
/// - The capacity never drops below `initial_capacity`, which is also the
///   capacity a table returns to on `clear`.
///
/// The defaults are an initial capacity of 8, a grow ratio of 2 (at most
/// half of the slots are ever non-empty) and a shrink ratio of 0.125.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizePolicy {
    initial_capacity: usize,
    grow_ratio: f64,
    shrink_ratio: f64,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            grow_ratio: DEFAULT_GROW_RATIO,
            shrink_ratio: DEFAULT_SHRINK_RATIO,
        }
    }
}

impl ResizePolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] if `grow_ratio` is not a finite value
    /// greater than 1, if `shrink_ratio` is not in `(0, 1)`, if
    /// `shrink_ratio * grow_ratio²` is not below 1, or if `initial_capacity`
    /// cannot take a single insertion without growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use light_set::ResizePolicy;
    ///
    /// let policy = ResizePolicy::new(16, 1.5, 0.25).unwrap();
    /// assert_eq!(policy.initial_capacity(), 16);
    ///
    /// assert!(ResizePolicy::new(16, 1.0, 0.25).is_err());
    /// assert!(ResizePolicy::new(1, 2.0, 0.2).is_err());
    /// // Shrinking right after a grow would undo it.
    /// assert!(ResizePolicy::new(16, 1.5, 0.9).is_err());
    /// ```
    pub fn new(initial_capacity: usize, grow_ratio: f64, shrink_ratio: f64) -> Result<Self> {
        if !grow_ratio.is_finite() || grow_ratio <= 1.0 {
            return Err(Error::InvalidPolicy("grow ratio must be finite and greater than 1"));
        }
        if !shrink_ratio.is_finite() || shrink_ratio <= 0.0 || shrink_ratio >= 1.0 {
            return Err(Error::InvalidPolicy("shrink ratio must be between 0 and 1"));
        }
        // A grow followed by a shrink must not land back above the shrink
        // threshold, or a table of steady size rehashes on every removal.
        if shrink_ratio * grow_ratio * grow_ratio >= 1.0 {
            return Err(Error::InvalidPolicy(
                "shrink ratio times grow ratio squared must be below 1",
            ));
        }
        if initial_capacity == 0 || grow_ratio > initial_capacity as f64 {
            return Err(Error::InvalidPolicy(
                "initial capacity must hold one value under the grow ratio",
            ));
        }

        Ok(Self {
            initial_capacity,
            grow_ratio,
            shrink_ratio,
        })
    }

    /// The capacity of a fresh or cleared table, and the capacity floor.
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// The factor the capacity is multiplied by when growing.
    pub fn grow_ratio(&self) -> f64 {
        self.grow_ratio
    }

    /// The factor the capacity is multiplied by when shrinking.
    pub fn shrink_ratio(&self) -> f64 {
        self.shrink_ratio
    }

    #[inline]
    pub(crate) fn needs_grow(&self, occupied: usize, capacity: usize) -> bool {
        (occupied as f64 + 1.0) * self.grow_ratio > capacity as f64
    }

    #[inline]
    pub(crate) fn needs_shrink(&self, len: usize, capacity: usize) -> bool {
        capacity > self.initial_capacity && capacity as f64 > len as f64 / self.shrink_ratio
    }

    /// Smallest capacity that takes `len` insertions into an empty table
    /// without growing.
    pub(crate) fn capacity_for(&self, len: usize) -> usize {
        ceil(len as f64 * self.grow_ratio).max(self.initial_capacity)
    }

    /// Target of a grow/shrink resize: `capacity * ratio` rounded, floored at
    /// the initial capacity, and widened until the next insertion into a
    /// rehashed table holding `len` values stays under the grow threshold.
    pub(crate) fn scaled_capacity(&self, capacity: usize, ratio: f64, len: usize) -> usize {
        let mut target = round(capacity as f64 * ratio).max(self.initial_capacity);
        while self.needs_grow(len, target) {
            target = round(target as f64 * self.grow_ratio).max(target.saturating_add(1));
        }
        target
    }
}
