use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::DefaultHashBuilder;
use crate::error::Error;
use crate::error::Result;
use crate::hash_table::Entry;
use crate::hash_table::HashTable;
use crate::policy::ResizePolicy;

/// Rejects values that are not equal to themselves. Such a value could be
/// inserted any number of times and never found again.
#[allow(clippy::eq_op)]
#[inline]
fn check_comparable<T: PartialEq>(value: &T) -> Result<()> {
    if value == value {
        Ok(())
    } else {
        Err(Error::InvalidValue)
    }
}

/// A hash set stored in a linear-probing [`HashTable`].
///
/// `HashSet<T, S>` stores values of type `T` where `T` implements `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash values. The home slot
/// of a value is its hash modulo the current capacity; collisions probe
/// forward one slot at a time.
///
/// The set grows before an insertion would push live values plus tombstones
/// past the policy's load factor, and shrinks after a removal leaves it
/// sparser than the policy's minimum. See [`ResizePolicy`].
///
/// Iteration order is unspecified and changes across resizes.
///
/// # Thread safety
///
/// Every mutation takes `&mut self`. Sharing a set between threads requires
/// external synchronization such as a `Mutex<HashSet<T>>`.
#[derive(Clone)]
pub struct HashSet<T, S = DefaultHashBuilder> {
    table: HashTable<T>,
    hash_builder: S,
}

impl<T, S> PartialEq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl<T, S> Eq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S> Debug for HashSet<T, S>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.table.iter()).finish()
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty set at the default initial capacity with the given
    /// hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::hash::RandomState;
    ///
    /// use light_set::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_hasher(RandomState::new());
    /// assert!(set.is_empty());
    /// assert_eq!(set.capacity(), 8);
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_policy_and_hasher(ResizePolicy::default(), hash_builder)
    }

    /// Creates an empty set that takes `capacity` insertions without growing.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Creates an empty set that resizes according to `policy`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::hash::RandomState;
    ///
    /// use light_set::HashSet;
    /// use light_set::ResizePolicy;
    ///
    /// let policy = ResizePolicy::new(32, 4.0, 0.05).unwrap();
    /// let mut set = HashSet::with_policy_and_hasher(policy, RandomState::new());
    /// set.insert("a");
    /// assert_eq!(set.capacity(), 32);
    /// # }
    /// ```
    pub fn with_policy_and_hasher(policy: ResizePolicy, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_policy(policy),
            hash_builder,
        }
    }

    /// Returns the number of values in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use light_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no values.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the underlying table.
    ///
    /// This is a diagnostic: with the default policy at most half of the
    /// slots hold values or tombstones.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the number of removed slots not yet reclaimed by a rehash.
    ///
    /// Tombstones count towards the grow threshold together with [`len`](Self::len).
    pub fn tombstones(&self) -> usize {
        self.table.tombstones()
    }

    /// Returns the resize policy of the set.
    pub fn policy(&self) -> &ResizePolicy {
        self.table.policy()
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all values and returns the set to its initial capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use light_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = (0..100).collect();
    /// assert!(set.capacity() > 8);
    /// set.clear();
    /// assert!(set.is_empty());
    /// assert_eq!(set.capacity(), 8);
    /// # }
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Shrinks the table to the smallest capacity that holds the current
    /// values, discarding all tombstones.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit(|v| self.hash_builder.hash_one(v));
    }

    /// Reserves room for at least `additional` more insertions.
    ///
    /// Removals may still shrink the set below the reserved size.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows.
    pub fn reserve(&mut self, additional: usize) {
        self.table
            .reserve(additional, |v| self.hash_builder.hash_one(v));
    }

    /// Reserves room for at least `additional` more insertions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`] if the new capacity overflows or
    /// cannot be allocated; the set is left unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.table
            .try_reserve(additional, |v| self.hash_builder.hash_one(v))
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. That is:
    ///
    /// - If the set did not previously contain this value, `true` is returned.
    /// - If the set already contained this value, `false` is returned and
    ///   the set is not modified.
    ///
    /// A value that is not equal to itself is stored but can never be found
    /// again; use [`try_insert`](Self::try_insert) to reject it instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use light_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.insert(37), true);
    /// assert_eq!(set.insert(37), false);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.hash_builder.hash_one(&value);
        match self
            .table
            .entry(hash, |v| v == &value, |v| self.hash_builder.hash_one(v))
        {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Adds a value to the set, rejecting values without a well-defined
    /// equality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if `value != value`; the set is left
    /// unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use std::hash::Hash;
    /// use std::hash::Hasher;
    ///
    /// use light_set::Error;
    /// use light_set::HashSet;
    ///
    /// #[derive(PartialEq)]
    /// struct Celsius(f64);
    ///
    /// impl Eq for Celsius {}
    ///
    /// impl Hash for Celsius {
    ///     fn hash<H: Hasher>(&self, state: &mut H) {
    ///         self.0.to_bits().hash(state);
    ///     }
    /// }
    ///
    /// let mut set: HashSet<Celsius> = HashSet::new();
    /// assert_eq!(set.try_insert(Celsius(21.5)), Ok(true));
    /// assert_eq!(set.try_insert(Celsius(f64::NAN)), Err(Error::InvalidValue));
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn try_insert(&mut self, value: T) -> Result<bool> {
        check_comparable(&value)?;
        Ok(self.insert(value))
    }

    /// Returns `true` if the set contains a value equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use light_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert!(set.contains(&1));
    /// assert!(!set.contains(&2));
    /// # }
    /// ```
    pub fn contains(&self, value: &T) -> bool {
        self.get(value).is_some()
    }

    /// Checked [`contains`](Self::contains).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if `value != value`.
    pub fn try_contains(&self, value: &T) -> Result<bool> {
        check_comparable(value)?;
        Ok(self.contains(value))
    }

    /// Returns the stored value equal to `value`, if any.
    ///
    /// When equality does not cover every field, this hands back the value
    /// that was originally inserted rather than the probe.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use light_set::HashSet;
    ///
    /// let mut set: HashSet<String> = HashSet::new();
    /// set.insert("apple".to_string());
    /// assert_eq!(set.get(&"apple".to_string()).map(String::as_str), Some("apple"));
    /// assert_eq!(set.get(&"pear".to_string()), None);
    /// # }
    /// ```
    pub fn get(&self, value: &T) -> Option<&T> {
        let hash = self.hash_builder.hash_one(value);
        self.table.find(hash, |v| v == value)
    }

    /// Checked [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if `value != value`.
    pub fn try_get(&self, value: &T) -> Result<Option<&T>> {
        check_comparable(value)?;
        Ok(self.get(value))
    }

    /// Removes a value from the set. Returns whether the value was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use light_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert_eq!(set.remove(&1), true);
    /// assert_eq!(set.remove(&1), false);
    /// # }
    /// ```
    pub fn remove(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Checked [`remove`](Self::remove).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if `value != value`; the set is left
    /// unchanged.
    pub fn try_remove(&mut self, value: &T) -> Result<bool> {
        check_comparable(value)?;
        Ok(self.remove(value))
    }

    /// Removes and returns the stored value equal to `value`, if any.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let hash = self.hash_builder.hash_one(value);
        self.table
            .remove(hash, |v| v == value, |v| self.hash_builder.hash_one(v))
    }

    /// Adds a value to the set, replacing and returning the stored value
    /// equal to it, if any.
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = self.hash_builder.hash_one(&value);
        match self
            .table
            .entry(hash, |v| v == &value, |v| self.hash_builder.hash_one(v))
        {
            Entry::Occupied(mut entry) => Some(core::mem::replace(entry.get_mut(), value)),
            Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns an iterator over the values of the set, in unspecified order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Removes all values, yielding them by value. The set is left at its
    /// initial capacity.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the values for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use light_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = (0..1000).collect();
    /// set.retain(|&x| x % 100 == 0);
    /// assert_eq!(set.len(), 10);
    /// assert!(set.capacity() < 1000);
    /// # }
    /// ```
    pub fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        self.table.retain(f, |v| self.hash_builder.hash_one(v));
    }

    /// Returns `true` if `self` and `other` have no values in common.
    pub fn is_disjoint(&self, other: &HashSet<T, S>) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().all(|v| !large.contains(v))
    }

    /// Returns `true` if every value of `self` is also in `other`.
    pub fn is_subset(&self, other: &HashSet<T, S>) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every value of `other` is also in `self`.
    pub fn is_superset(&self, other: &HashSet<T, S>) -> bool {
        other.is_subset(self)
    }

    /// Returns slot-level statistics of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }

    /// Returns the probe-length histogram of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> crate::hash_table::ProbeHistogram {
        self.table
            .probe_histogram(|v| self.hash_builder.hash_one(v))
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates an empty set using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use light_set::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty set that takes `capacity` insertions without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }

    /// Creates an empty set that resizes according to `policy`.
    pub fn with_policy(policy: ResizePolicy) -> Self {
        Self::with_policy_and_hasher(policy, S::default())
    }
}

impl<T, S> Default for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T> {
    inner: crate::hash_table::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T> {
    inner: crate::hash_table::Drain<'a, T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A consuming iterator over the values of a `HashSet`.
pub struct IntoIter<T> {
    inner: crate::hash_table::IntoIter<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, S> IntoIterator for HashSet<T, S> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S> IntoIterator for &'a HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = HashSet::new();
        set.extend(iter);
        set
    }
}

impl<T, S> Extend<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}
