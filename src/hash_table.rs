//! The raw slot table backing [`HashSet`](crate::HashSet).
//!
//! `HashTable<V>` never hashes values itself. Callers pass a precomputed
//! `u64` hash and an equality predicate to every operation, plus a rehash
//! closure to operations that may resize the slot array.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::IntoIter as VecIntoIter;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::marker::PhantomData;

use tracing::debug;
use tracing::trace;

use crate::error::Error;
use crate::error::Result;
use crate::policy::ResizePolicy;

/// A position in the slot array.
#[derive(Clone)]
enum Slot<V> {
    /// Never written since the last rehash. Terminates probing.
    Empty,
    Occupied(V),
    /// Removed value. Probing continues past it, insertion may reuse it.
    Tombstone,
}

fn empty_slots<V>(capacity: usize) -> Box<[Slot<V>]> {
    (0..capacity).map(|_| Slot::Empty).collect()
}

/// Like [`empty_slots`], but reports a failed allocation instead of aborting.
fn try_empty_slots<V>(capacity: usize) -> Result<Box<[Slot<V>]>> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| Error::CapacityOverflow)?;
    slots.extend((0..capacity).map(|_| Slot::Empty));
    Ok(slots.into_boxed_slice())
}

#[cold]
#[inline(never)]
fn probe_exhausted(capacity: usize) -> ! {
    panic!("probe sequence exceeded {capacity} slots without reaching an empty slot")
}

/// Statistics for slot table analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live values.
    pub len: usize,
    /// Length of the slot array.
    pub capacity: usize,
    /// Live values plus tombstones.
    pub occupied: usize,
    /// Removed slots not yet reclaimed by a rehash.
    pub tombstones: usize,
    /// Slots that terminate probing.
    pub empty: usize,
    /// `occupied / capacity`, the ratio the grow threshold is checked against.
    pub load_factor: f64,
    /// `len / capacity`, the ratio the shrink threshold is checked against.
    pub live_ratio: f64,
    /// Bytes held by the slot array.
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Slot Table Statistics ===");
        println!(
            "Live: {}/{} ({:.2}% live ratio)",
            self.len,
            self.capacity,
            self.live_ratio * 100.0
        );
        println!(
            "Occupied: {}/{} ({:.2}% load factor, {} tombstones)",
            self.occupied,
            self.capacity,
            self.load_factor * 100.0,
            self.tombstones
        );
        println!("Empty: {} slots", self.empty);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Probe-length histogram: `counts[d]` is the number of live values stored
/// `d` slots past their home slot.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, Default)]
pub struct ProbeHistogram {
    /// Values per probe distance.
    pub counts: alloc::vec::Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// The longest probe distance of any live value.
    pub fn max_probe(&self) -> usize {
        self.counts.len().saturating_sub(1)
    }

    /// Mean probe distance over all live values.
    pub fn mean(&self) -> f64 {
        let total: usize = self.counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        let weighted: usize = self.counts.iter().enumerate().map(|(d, c)| d * c).sum();
        weighted as f64 / total as f64
    }

    /// Pretty-prints the histogram as horizontal bars.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.counts.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!("probe histogram (mean {:.3}):", self.mean());
        for (distance, &count) in self.counts.iter().enumerate() {
            let width = (count * max_bar).div_ceil(max);
            println!("{:>3} | {} ({})", distance, "█".repeat(width), count);
        }
    }
}

/// An open-addressing hash table with linear probing and tombstones.
///
/// Each slot is empty, occupied by one value, or a tombstone left behind by
/// a removal. Lookups walk forward from `hash % capacity`, wrapping around,
/// until they find a matching value or an empty slot. Insertions reuse the
/// first tombstone on the probe path.
///
/// Growth and shrinkage follow the table's [`ResizePolicy`]. Tombstones
/// count towards the grow threshold and are only reclaimed by a rehash.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use light_set::hash_table::Entry;
/// # use light_set::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::with_capacity(100);
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123, |p| hash_id(p.id)) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
///
/// assert_eq!(table.find(hash, |p| p.id == 123).unwrap().name, "Alice");
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    slots: Box<[Slot<V>]>,

    populated: usize,
    occupied: usize,

    policy: ResizePolicy,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let slotmap: String = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Empty => '.',
                Slot::Occupied(_) => '#',
                Slot::Tombstone => 'x',
            })
            .collect();

        f.debug_struct("HashTable")
            .field("slots", &slotmap)
            .field("populated", &self.populated)
            .field("occupied", &self.occupied)
            .field("capacity", &self.slots.len())
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::with_policy(ResizePolicy::default())
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table that takes `capacity` insertions without
    /// growing, using the default [`ResizePolicy`].
    ///
    /// ```rust
    /// # use light_set::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 200);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_policy(capacity, ResizePolicy::default())
    }

    /// Creates an empty table at the policy's initial capacity.
    pub fn with_policy(policy: ResizePolicy) -> Self {
        Self::with_capacity_and_policy(0, policy)
    }

    /// Creates an empty table that takes `capacity` insertions without
    /// growing under `policy`.
    pub fn with_capacity_and_policy(capacity: usize, policy: ResizePolicy) -> Self {
        Self {
            slots: empty_slots(policy.capacity_for(capacity)),
            populated: 0,
            occupied: 0,
            policy,
        }
    }

    /// The resize policy of this table.
    pub fn policy(&self) -> &ResizePolicy {
        &self.policy
    }

    /// Returns the number of live values.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table holds no live values.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the length of the slot array.
    ///
    /// At most `capacity / grow_ratio` of the slots are live or tombstoned
    /// at any time, so this is larger than the number of values the table
    /// holds before growing.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of tombstones waiting for the next rehash.
    pub fn tombstones(&self) -> usize {
        self.occupied - self.populated
    }

    #[inline(always)]
    fn home_index(&self, hash: u64) -> usize {
        (hash % self.slots.len() as u64) as usize
    }

    /// Walks the probe sequence of `hash` until `eq` matches a live value or
    /// an empty slot ends the chain.
    ///
    /// Returns `Ok(index)` of the match, or `Err(index)` of the slot an
    /// insertion would use: the first tombstone on the path, else the empty
    /// slot that ended it.
    fn probe(&self, hash: u64, eq: impl Fn(&V) -> bool) -> core::result::Result<usize, usize> {
        let capacity = self.slots.len();
        let mut index = self.home_index(hash);
        let mut first_tombstone = None;

        for _ in 0..capacity {
            match &self.slots[index] {
                Slot::Empty => return Err(first_tombstone.unwrap_or(index)),
                Slot::Occupied(value) if eq(value) => return Ok(index),
                Slot::Occupied(_) => {}
                Slot::Tombstone => {
                    first_tombstone.get_or_insert(index);
                }
            }
            index += 1;
            if index == capacity {
                index = 0;
            }
        }

        probe_exhausted(capacity)
    }

    /// First empty or tombstoned slot on the probe path of `hash`.
    fn free_slot(&self, hash: u64) -> usize {
        let capacity = self.slots.len();
        let mut index = self.home_index(hash);

        for _ in 0..capacity {
            if !matches!(self.slots[index], Slot::Occupied(_)) {
                return index;
            }
            index += 1;
            if index == capacity {
                index = 0;
            }
        }

        probe_exhausted(capacity)
    }

    /// Finds the value matching `eq` on the probe path of `hash`.
    ///
    /// ```rust
    /// # use light_set::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(4);
    /// table.entry(7, |&v| v == 70, |&v| v / 10).or_insert(70);
    ///
    /// assert_eq!(table.find(7, |&v| v == 70), Some(&70));
    /// assert_eq!(table.find(8, |&v| v == 80), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        match self.probe(hash, eq) {
            Ok(index) => match &self.slots[index] {
                Slot::Occupied(value) => Some(value),
                _ => unreachable!(),
            },
            Err(_) => None,
        }
    }

    /// Finds the value matching `eq` and returns a mutable reference to it.
    ///
    /// The caller must not change the value in a way that changes its hash.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        match self.probe(hash, eq) {
            Ok(index) => match &mut self.slots[index] {
                Slot::Occupied(value) => Some(value),
                _ => unreachable!(),
            },
            Err(_) => None,
        }
    }

    /// Looks up the value matching `eq` for in-place insertion.
    ///
    /// When no value matches and one more insertion would cross the grow
    /// threshold, the table grows here (rehashing every value with `hasher`)
    /// so the returned [`VacantEntry`] points into the resized array.
    pub fn entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Entry<'_, V> {
        match self.probe(hash, eq) {
            Ok(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            Err(index) => {
                let index = if self.policy.needs_grow(self.occupied, self.slots.len()) {
                    self.grow(&hasher);
                    self.free_slot(hash)
                } else {
                    index
                };
                Entry::Vacant(VacantEntry { table: self, index })
            }
        }
    }

    /// Removes and returns the value matching `eq`, leaving a tombstone.
    ///
    /// Shrinks the table afterwards if the live ratio fell below the shrink
    /// threshold.
    ///
    /// ```rust
    /// # use light_set::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(4);
    /// table.entry(1, |&v| v == 1, |&v| v).or_insert(1);
    ///
    /// assert_eq!(table.remove(1, |&v| v == 1, |&v| v), Some(1));
    /// assert_eq!(table.remove(1, |&v| v == 1, |&v| v), None);
    /// assert_eq!(table.tombstones(), 1);
    /// ```
    pub fn remove(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Option<V> {
        let index = self.probe(hash, eq).ok()?;
        let Slot::Occupied(value) = core::mem::replace(&mut self.slots[index], Slot::Tombstone)
        else {
            unreachable!()
        };
        self.populated -= 1;

        if self.policy.needs_shrink(self.populated, self.slots.len()) {
            self.shrink(&hasher);
        }

        Some(value)
    }

    /// Removes every value and returns the slot array to the policy's
    /// initial capacity.
    pub fn clear(&mut self) {
        trace!(
            capacity = self.slots.len(),
            len = self.populated,
            "clearing slot table"
        );
        self.slots = empty_slots(self.policy.initial_capacity());
        self.populated = 0;
        self.occupied = 0;
    }

    /// Keeps only the values for which `f` returns `true`.
    ///
    /// The shrink threshold is checked once after all removals.
    pub fn retain(&mut self, mut f: impl FnMut(&V) -> bool, hasher: impl Fn(&V) -> u64) {
        for slot in self.slots.iter_mut() {
            if let Slot::Occupied(value) = slot {
                if !f(value) {
                    *slot = Slot::Tombstone;
                    self.populated -= 1;
                }
            }
        }

        if self.policy.needs_shrink(self.populated, self.slots.len()) {
            self.shrink(&hasher);
        }
    }

    /// Rehashes into the smallest capacity that holds the current values,
    /// dropping all tombstones.
    pub fn shrink_to_fit(&mut self, hasher: impl Fn(&V) -> u64) {
        let capacity = self.policy.capacity_for(self.populated);
        if capacity == self.slots.len() && self.occupied == self.populated {
            return;
        }
        trace!(from = self.slots.len(), to = capacity, "shrinking slot table to fit");
        self.rehash(capacity, &hasher);
    }

    /// Reserves room for at least `additional` more insertions.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows.
    pub fn reserve(&mut self, additional: usize, hasher: impl Fn(&V) -> u64) {
        if let Err(err) = self.try_reserve(additional, hasher) {
            panic!("{err}");
        }
    }

    /// Reserves room for at least `additional` more insertions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`] if the new capacity overflows or
    /// the new slot array cannot be allocated. The table is left unchanged.
    pub fn try_reserve(&mut self, additional: usize, hasher: impl Fn(&V) -> u64) -> Result<()> {
        let wanted = self
            .occupied
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;
        if self.policy.capacity_for(wanted) <= self.slots.len() {
            return Ok(());
        }

        let target = self
            .populated
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;
        let slots = try_empty_slots(self.policy.capacity_for(target))?;
        self.rehash_into(slots, &hasher);
        Ok(())
    }

    #[cold]
    fn grow(&mut self, hasher: &impl Fn(&V) -> u64) {
        let current = self.slots.len();
        let capacity = self
            .policy
            .scaled_capacity(current, self.policy.grow_ratio(), self.populated)
            .max(current + 1);
        self.rehash(capacity, hasher);
    }

    #[cold]
    fn shrink(&mut self, hasher: &impl Fn(&V) -> u64) {
        let capacity = self.policy.scaled_capacity(
            self.slots.len(),
            self.policy.shrink_ratio(),
            self.populated,
        );
        // Widening to fit the live values can reach the current size.
        if capacity < self.slots.len() {
            self.rehash(capacity, hasher);
        }
    }

    /// Moves every live value into a fresh array of `capacity` empty slots.
    fn rehash(&mut self, capacity: usize, hasher: &impl Fn(&V) -> u64) {
        self.rehash_into(empty_slots(capacity), hasher);
    }

    fn rehash_into(&mut self, slots: Box<[Slot<V>]>, hasher: &impl Fn(&V) -> u64) {
        debug_assert!(slots.len() > self.populated);
        debug!(
            from = self.slots.len(),
            to = slots.len(),
            len = self.populated,
            tombstones = self.occupied - self.populated,
            "rehashing slot table"
        );

        let old_slots = core::mem::replace(&mut self.slots, slots);
        for slot in old_slots.into_vec() {
            if let Slot::Occupied(value) = slot {
                let index = self.free_slot(hasher(&value));
                self.slots[index] = Slot::Occupied(value);
            }
        }
        self.occupied = self.populated;
    }

    /// Returns an iterator over the live values, in slot order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.slots.iter(),
            remaining: self.populated,
        }
    }

    /// Removes every value, yielding them by value.
    ///
    /// The table is reset to the policy's initial capacity as soon as this is
    /// called; dropping the iterator early drops the remaining values.
    pub fn drain(&mut self) -> Drain<'_, V> {
        let slots = core::mem::replace(
            &mut self.slots,
            empty_slots(self.policy.initial_capacity()),
        );
        let remaining = core::mem::take(&mut self.populated);
        self.occupied = 0;

        Drain {
            inner: IntoIter {
                inner: slots.into_vec().into_iter(),
                remaining,
            },
            _table: PhantomData,
        }
    }

    /// Counts slots by state.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let capacity = self.slots.len();
        let empty = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Empty))
            .count();

        DebugStats {
            len: self.populated,
            capacity,
            occupied: self.occupied,
            tombstones: self.occupied - self.populated,
            empty,
            load_factor: self.occupied as f64 / capacity as f64,
            live_ratio: self.populated as f64 / capacity as f64,
            total_bytes: capacity * core::mem::size_of::<Slot<V>>(),
        }
    }

    /// Computes how far each live value sits from its home slot.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self, hasher: impl Fn(&V) -> u64) -> ProbeHistogram {
        let capacity = self.slots.len();
        let mut counts = alloc::vec::Vec::new();

        for (index, slot) in self.slots.iter().enumerate() {
            if let Slot::Occupied(value) = slot {
                let home = self.home_index(hasher(value));
                let distance = (index + capacity - home) % capacity;
                if counts.len() <= distance {
                    counts.resize(distance + 1, 0);
                }
                counts[distance] += 1;
            }
        }

        ProbeHistogram { counts }
    }
}

/// A view into a single entry in the table, which may be vacant or occupied.
///
/// This enum is constructed from [`HashTable::entry`].
pub enum Entry<'a, V> {
    /// A live value matched the lookup.
    Occupied(OccupiedEntry<'a, V>),
    /// No value matched; the entry points at the slot an insertion will use.
    Vacant(VacantEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Returns the matched value, inserting `default` first if vacant.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Returns the matched value, inserting `default()` first if vacant.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }
}

/// A vacant entry of a [`HashTable`].
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Stores `value` in the slot this entry points at.
    ///
    /// Filling an empty slot counts towards the grow threshold; reusing a
    /// tombstone does not.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        let slot = &mut table.slots[self.index];
        if matches!(slot, Slot::Empty) {
            table.occupied += 1;
        }
        table.populated += 1;

        *slot = Slot::Occupied(value);
        match slot {
            Slot::Occupied(value) => value,
            _ => unreachable!(),
        }
    }
}

/// An occupied entry of a [`HashTable`].
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Returns the matched value.
    pub fn get(&self) -> &V {
        match &self.table.slots[self.index] {
            Slot::Occupied(value) => value,
            _ => unreachable!(),
        }
    }

    /// Returns the matched value mutably.
    ///
    /// The caller must not change the value in a way that changes its hash.
    pub fn get_mut(&mut self) -> &mut V {
        match &mut self.table.slots[self.index] {
            Slot::Occupied(value) => value,
            _ => unreachable!(),
        }
    }

    /// Converts the entry into a mutable reference with the table's lifetime.
    pub fn into_mut(self) -> &'a mut V {
        match &mut self.table.slots[self.index] {
            Slot::Occupied(value) => value,
            _ => unreachable!(),
        }
    }
}

/// An iterator over the live values of a [`HashTable`].
pub struct Iter<'a, V> {
    inner: core::slice::Iter<'a, Slot<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for slot in self.inner.by_ref() {
            if let Slot::Occupied(value) = slot {
                self.remaining -= 1;
                return Some(value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<V> {
    inner: VecIntoIter<Slot<V>>,
    remaining: usize,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for slot in self.inner.by_ref() {
            if let Slot::Occupied(value) = slot {
                self.remaining -= 1;
                return Some(value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}

impl<V> IntoIterator for HashTable<V> {
    type IntoIter = IntoIter<V>;
    type Item = V;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.slots.into_vec().into_iter(),
            remaining: self.populated,
        }
    }
}

/// A draining iterator over the values of a [`HashTable`].
///
/// This struct is created by [`HashTable::drain`].
pub struct Drain<'a, V> {
    inner: IntoIter<V>,
    _table: PhantomData<&'a mut HashTable<V>>,
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn hash(&self, key: u64) -> u64 {
            let mut h = SipHasher::new_with_keys(self.k0, self.k1);
            h.write_u64(key);
            h.finish()
        }
    }

    fn insert(table: &mut HashTable<u64>, state: &HashState, key: u64) -> bool {
        match table.entry(state.hash(key), |&v| v == key, |&v| state.hash(v)) {
            Entry::Vacant(entry) => {
                entry.insert(key);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    fn remove(table: &mut HashTable<u64>, state: &HashState, key: u64) -> Option<u64> {
        table.remove(state.hash(key), |&v| v == key, |&v| state.hash(v))
    }

    fn find<'a>(table: &'a HashTable<u64>, state: &HashState, key: u64) -> Option<&'a u64> {
        table.find(state.hash(key), |&v| v == key)
    }

    fn check_invariants<V>(table: &HashTable<V>) {
        let stats = table.debug_stats();
        assert_eq!(
            stats.occupied + stats.empty,
            stats.capacity,
            "{:?}",
            table
        );
        assert!(stats.empty > 0, "{:?}", table);
        assert!(stats.capacity >= table.policy().initial_capacity());
        assert_eq!(table.iter().count(), table.len());
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table = HashTable::with_capacity(0);
        for k in 0..32u64 {
            assert!(insert(&mut table, &state, k));
            assert_eq!(find(&table, &state, k), Some(&k), "{:#?}", table);
            check_invariants(&table);
        }
        for k in 0..32u64 {
            assert_eq!(find(&table, &state, k), Some(&k));
        }
        assert_eq!(find(&table, &state, 32), None);
        assert_eq!(table.len(), 32);
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table = HashTable::with_capacity(0);
        assert!(insert(&mut table, &state, 5));
        match table.entry(state.hash(5), |&v| v == 5, |&v| state.hash(v)) {
            Entry::Occupied(entry) => assert_eq!(entry.get(), &5),
            Entry::Vacant(_) => panic!("expected occupied entry"),
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn starts_at_initial_capacity() {
        let table: HashTable<u64> = HashTable::default();
        assert_eq!(table.capacity(), 8);
        assert!(table.is_empty());

        let table: HashTable<u64> = HashTable::with_capacity(100);
        assert_eq!(table.capacity(), 200);
    }

    #[test]
    fn grows_before_crossing_threshold() {
        let state = HashState::default();
        let mut table = HashTable::default();
        for k in 0..4u64 {
            insert(&mut table, &state, k);
        }
        assert_eq!(table.capacity(), 8);

        insert(&mut table, &state, 4);
        assert_eq!(table.capacity(), 16);
        for k in 0..5u64 {
            assert_eq!(find(&table, &state, k), Some(&k));
        }
        check_invariants(&table);
    }

    #[test]
    fn remove_leaves_tombstone() {
        let state = HashState::default();
        let mut table = HashTable::default();
        insert(&mut table, &state, 1);
        insert(&mut table, &state, 2);

        assert_eq!(remove(&mut table, &state, 1), Some(1));
        assert_eq!(table.len(), 1);
        assert_eq!(table.tombstones(), 1);
        assert_eq!(find(&table, &state, 1), None);
        assert_eq!(find(&table, &state, 2), Some(&2));
        assert_eq!(remove(&mut table, &state, 1), None);
        check_invariants(&table);
    }

    #[test]
    fn probing_continues_past_tombstones() {
        // Every value shares home slot 6, forcing a single probe chain that
        // wraps around the end of the array.
        let mut table: HashTable<u64> = HashTable::default();
        for k in 0..3u64 {
            table.entry(6, |&v| v == k, |_| 6).or_insert(k);
        }
        assert_eq!(table.capacity(), 8);

        assert_eq!(table.remove(6, |&v| v == 0, |_| 6), Some(0));
        assert_eq!(table.find(6, |&v| v == 1), Some(&1));
        assert_eq!(table.find(6, |&v| v == 2), Some(&2));
        assert_eq!(table.find(6, |&v| v == 0), None);
    }

    #[test]
    fn insertion_reuses_first_tombstone() {
        let mut table: HashTable<u64> = HashTable::default();
        for k in 0..3u64 {
            table.entry(7, |&v| v == k, |_| 7).or_insert(k);
        }
        assert_eq!(table.remove(7, |&v| v == 1, |_| 7), Some(1));
        let occupied_before = table.debug_stats().occupied;

        table.entry(7, |&v| v == 9, |_| 7).or_insert(9);
        let stats = table.debug_stats();
        assert_eq!(stats.tombstones, 0);
        assert_eq!(stats.occupied, occupied_before);
        assert_eq!(table.len(), 3);

        // 7 -> 0 -> 1 wraps around; 9 took the tombstone at slot 0.
        assert_eq!(format!("{:?}", table.iter().collect::<Vec<_>>()), "[9, 2, 0]");
    }

    #[test]
    fn tombstones_count_towards_growth() {
        let mut table: HashTable<u64> = HashTable::default();
        for k in 0..4u64 {
            table.entry(k, |&v| v == k, |&v| v).or_insert(k);
        }
        for k in 0..3u64 {
            assert_eq!(table.remove(k, |&v| v == k, |&v| v), Some(k));
        }
        assert_eq!(table.len(), 1);
        assert_eq!(table.tombstones(), 3);
        assert_eq!(table.capacity(), 8);

        // One live value, but tombstones keep occupancy at the threshold.
        table.entry(4, |&v| v == 4, |&v| v).or_insert(4);
        assert_eq!(table.capacity(), 16);
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.find(3, |&v| v == 3), Some(&3));
        check_invariants(&table);
    }

    #[test]
    fn shrinks_after_removals() {
        let state = HashState::default();
        let mut table = HashTable::default();
        for k in 0..64u64 {
            insert(&mut table, &state, k);
        }
        assert_eq!(table.capacity(), 128);

        for k in 0..64u64 {
            assert_eq!(remove(&mut table, &state, k), Some(k));
            let stats = table.debug_stats();
            if stats.capacity > 8 {
                assert!(stats.len * 8 >= stats.capacity, "{:?}", stats);
            }
            check_invariants(&table);
            for rest in k + 1..64 {
                assert_eq!(find(&table, &state, rest), Some(&rest));
            }
        }
        assert_eq!(table.capacity(), 8);
        assert!(table.is_empty());
    }

    #[test]
    fn clear_resets_capacity() {
        let state = HashState::default();
        let mut table = HashTable::with_capacity(100);
        for k in 0..100u64 {
            insert(&mut table, &state, k);
        }
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.tombstones(), 0);
        assert_eq!(find(&table, &state, 1), None);

        table.clear();
        assert!(table.is_empty());
    }

    #[test]
    fn retain_checks_shrink_once() {
        let state = HashState::default();
        let mut table = HashTable::default();
        for k in 0..200u64 {
            insert(&mut table, &state, k);
        }
        table.retain(|&v| v < 10, |&v| state.hash(v));
        assert_eq!(table.len(), 10);
        assert_eq!(table.tombstones(), 0);
        assert!(table.capacity() < 400);
        for k in 0..10u64 {
            assert_eq!(find(&table, &state, k), Some(&k));
        }
        check_invariants(&table);
    }

    #[test]
    fn shrink_to_fit_drops_tombstones() {
        let state = HashState::default();
        let mut table = HashTable::default();
        for k in 0..6u64 {
            insert(&mut table, &state, k);
        }
        remove(&mut table, &state, 0);
        assert_eq!(table.tombstones(), 1);

        table.shrink_to_fit(|&v| state.hash(v));
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.capacity(), 10);
        for k in 1..6u64 {
            assert_eq!(find(&table, &state, k), Some(&k));
        }
    }

    #[test]
    fn reserve_avoids_growth() {
        let state = HashState::default();
        let mut table = HashTable::default();
        table.reserve(1000, |&v| state.hash(v));
        let capacity = table.capacity();
        assert!(capacity >= 2000);

        for k in 0..1000u64 {
            insert(&mut table, &state, k);
        }
        assert_eq!(table.capacity(), capacity);
    }

    #[test]
    fn try_reserve_overflow() {
        let mut table: HashTable<u64> = HashTable::default();
        assert_eq!(
            table.try_reserve(usize::MAX, |&v| v),
            Err(Error::CapacityOverflow)
        );
        assert_eq!(table.capacity(), 8);
    }

    #[test]
    fn try_reserve_reports_unallocatable_capacity() {
        let state = HashState::default();
        let mut table = HashTable::default();
        insert(&mut table, &state, 1);

        // The count fits in usize but the slot array does not fit in memory.
        assert_eq!(
            table.try_reserve(usize::MAX / 4, |&v| state.hash(v)),
            Err(Error::CapacityOverflow)
        );
        assert_eq!(table.capacity(), 8);
        assert_eq!(find(&table, &state, 1), Some(&1));
    }

    #[test]
    fn fill_then_drain_resizes_logarithmically() {
        let state = HashState::default();
        let policy = ResizePolicy::new(8, 1.5, 0.4).unwrap();
        let mut table = HashTable::with_policy(policy);

        let mut grows = 0;
        for k in 0..1000u64 {
            let before = table.capacity();
            insert(&mut table, &state, k);
            if table.capacity() != before {
                assert!(table.capacity() > before);
                grows += 1;
            }
        }

        let mut shrinks = 0;
        for k in 0..1000u64 {
            let before = table.capacity();
            remove(&mut table, &state, k);
            assert!(table.capacity() <= before, "removal grew the table");
            if table.capacity() != before {
                shrinks += 1;
            }
        }

        assert!(grows <= 16, "{grows} grows");
        assert!(shrinks <= 16, "{shrinks} shrinks");
        assert_eq!(table.capacity(), 8);
    }

    #[test]
    fn steady_churn_does_not_resize_every_removal() {
        let state = HashState::default();
        let policy = ResizePolicy::new(8, 1.5, 0.4).unwrap();
        let mut table = HashTable::with_policy(policy);
        for k in 0..100u64 {
            insert(&mut table, &state, k);
        }

        let mut resizes = 0;
        for k in 100..1100u64 {
            let before = table.capacity();
            insert(&mut table, &state, k);
            remove(&mut table, &state, k - 100);
            if table.capacity() != before {
                resizes += 1;
            }
            assert_eq!(table.len(), 100);
        }
        assert!(resizes < 100, "{resizes} resizes in 1000 insert+remove pairs");
    }

    #[test]
    fn custom_policy() {
        let policy = ResizePolicy::new(4, 1.5, 0.25).unwrap();
        let mut table: HashTable<u64> = HashTable::with_policy(policy);
        assert_eq!(table.capacity(), 4);

        for k in 0..100u64 {
            table.entry(k, |&v| v == k, |&v| v).or_insert(k);
            check_invariants(&table);
        }
        for k in 0..100u64 {
            assert_eq!(table.remove(k, |&v| v == k, |&v| v), Some(k));
            check_invariants(&table);
        }
        assert_eq!(table.capacity(), 4);
    }

    #[test]
    fn iter_and_drain() {
        let state = HashState::default();
        let mut table = HashTable::default();
        for k in 0..20u64 {
            insert(&mut table, &state, k);
        }

        let mut seen: Vec<u64> = table.iter().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
        assert_eq!(table.iter().len(), 20);

        let drain = table.drain();
        assert_eq!(drain.len(), 20);
        let mut drained: Vec<u64> = drain.collect();
        drained.sort_unstable();
        assert_eq!(drained, (0..20).collect::<Vec<_>>());
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 8);
    }

    #[test]
    fn into_iter_yields_owned_values() {
        let mut table: HashTable<String> = HashTable::default();
        for word in ["alpha", "beta", "gamma"] {
            let owned = word.to_string();
            table
                .entry(owned.len() as u64, |v: &String| v == word, |v| v.len() as u64)
                .or_insert(owned);
        }
        let mut words: Vec<String> = table.into_iter().collect();
        words.sort();
        assert_eq!(words, ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn find_mut_and_or_insert_with() {
        let mut table: HashTable<(u64, i32)> = HashTable::default();
        *table.entry(1, |v| v.0 == 1, |v| v.0).or_insert_with(|| (1, 10)) = (1, 11);
        if let Some(v) = table.find_mut(1, |v| v.0 == 1) {
            v.1 += 1;
        }
        assert_eq!(table.find(1, |v| v.0 == 1), Some(&(1, 12)));
    }

    #[test]
    fn probe_histogram_counts_displacement() {
        let mut table: HashTable<u64> = HashTable::default();
        for k in 0..3u64 {
            table.entry(0, |&v| v == k, |_| 0).or_insert(k);
        }
        let histogram = table.probe_histogram(|_| 0);
        assert_eq!(histogram.counts, [1, 1, 1]);
        assert_eq!(histogram.max_probe(), 2);
        assert_eq!(histogram.mean(), 1.0);
    }

    #[test]
    fn clone_is_independent() {
        let state = HashState::default();
        let mut table = HashTable::default();
        for k in 0..10u64 {
            insert(&mut table, &state, k);
        }
        let snapshot = table.clone();
        remove(&mut table, &state, 3);

        assert_eq!(find(&snapshot, &state, 3), Some(&3));
        assert_eq!(snapshot.len(), 10);
        assert_eq!(table.len(), 9);
    }

    #[test]
    fn debug_shows_slot_states() {
        let mut table: HashTable<u64> = HashTable::default();
        table.entry(1, |&v| v == 1, |&v| v).or_insert(1);
        table.entry(2, |&v| v == 2, |&v| v).or_insert(2);
        table.remove(1, |&v| v == 1, |&v| v);

        let debug = format!("{:?}", table);
        assert!(debug.contains(".x#....."), "{debug}");
    }
}
