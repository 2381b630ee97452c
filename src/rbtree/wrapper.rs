//! Ergonomic wrapper for the red-black tree map.
//!
//! This module provides [`RbTreeMap<K, V, C, A>`], a wrapper around
//! [`AllocatedRbTreeMap`] that owns an allocator, making it safe and
//! ergonomic to use.

use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem;
use core::mem::ManuallyDrop;
use core::ops::{Index, RangeBounds};
use core::ptr;

#[cfg(feature = "std")]
use alloc::boxed::Box;
#[cfg(feature = "std")]
use alloc::string::String;
#[cfg(feature = "std")]
use std::error::Error as StdError;

use allocated::DropIn;
use allocator_api2::alloc::{Allocator, Global};

use crate::compare::{Comparator, Natural, ValueCompare};
use crate::error::Result;

use super::{
    AllocatedRbTreeMap, IntoIter, IntoKeys, IntoValues, Iter, IterMut, Keys, Position, Range,
    Values, ValuesMut,
};

/// An ordered map backed by a red-black tree that owns its allocator.
///
/// This is the recommended type for most use cases. It wraps
/// [`AllocatedRbTreeMap`] and provides safe methods without requiring
/// `unsafe` blocks or passing allocators manually.
///
/// Keys are ordered by the comparator `C`; two keys are the same key when the
/// comparator reports them equal. Besides the usual map methods, the map hands
/// out [`Position`]s, copyable handles that stay valid while other elements
/// come and go.
///
/// # Example
///
/// ```
/// use allocated_rbtree::RbTreeMap;
///
/// let mut map = RbTreeMap::new();
/// map.insert(1, "one")?;
/// map.insert(2, "two")?;
///
/// assert_eq!(map.get(&1), Some(&"one"));
/// assert_eq!(map.len(), 2);
///
/// let pos = map.find(&2);
/// assert_eq!(map.key_value_at(pos), Some((&2, &"two")));
/// assert!(map.next(pos).is_end());
/// # Ok::<(), allocated_rbtree::Error>(())
/// ```
pub struct RbTreeMap<K, V, C = Natural, A: Allocator = Global> {
    alloc: A,
    raw: ManuallyDrop<AllocatedRbTreeMap<K, V, C>>,
}

impl<K, V> RbTreeMap<K, V> {
    /// Create a new empty map using the global allocator and `Ord`.
    ///
    /// # Panics
    ///
    /// Panics if allocation fails.
    #[inline]
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<K, V, C> RbTreeMap<K, V, C> {
    /// Create a new empty map ordered by `comp`, using the global allocator.
    ///
    /// # Panics
    ///
    /// Panics if allocation fails.
    pub fn with_comparator(comp: C) -> Self {
        Self::with_comparator_in(comp, Global).unwrap_or_else(|e| e.handle_alloc_error())
    }
}

impl<K, V, C: Default, A: Allocator + Default> Default for RbTreeMap<K, V, C, A> {
    fn default() -> Self {
        Self::with_comparator_in(C::default(), A::default())
            .unwrap_or_else(|e| e.handle_alloc_error())
    }
}

impl<K, V, C, A: Allocator> Drop for RbTreeMap<K, V, C, A> {
    fn drop(&mut self) {
        // SAFETY: `self.raw` was allocated by `self.alloc`
        unsafe {
            self.raw.drop_in(&self.alloc);
        }
    }
}

impl<K, V, A: Allocator> RbTreeMap<K, V, Natural, A> {
    /// Create a new empty map using the provided allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn new_in(alloc: A) -> Result<Self> {
        Self::with_comparator_in(Natural, alloc)
    }
}

impl<K, V, C, A: Allocator> RbTreeMap<K, V, C, A> {
    /// Create a new empty map ordered by `comp`, using the provided allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn with_comparator_in(comp: C, alloc: A) -> Result<Self> {
        Self::with_capacity_in(0, comp, alloc)
    }

    /// Create a new empty map with room for `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails or `capacity` exceeds
    /// [`max_size`](Self::max_size).
    pub fn with_capacity_in(capacity: usize, comp: C, alloc: A) -> Result<Self> {
        let raw = AllocatedRbTreeMap::with_capacity_in(&alloc, capacity, comp)?.into_inner();
        Ok(Self { alloc, raw })
    }

    /// Build a map from `iter` with the given comparator and allocator.
    /// When a key repeats, the first pair wins.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn from_iter_in<I>(iter: I, comp: C, alloc: A) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        C: Comparator<K>,
    {
        let mut map = Self::with_comparator_in(comp, alloc)?;
        map.try_extend(iter)?;
        Ok(map)
    }

    /// Returns a reference to the underlying allocator.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns the number of elements in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Upper bound on the number of elements the map can hold.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.raw.max_size()
    }

    /// Number of elements the map can hold without allocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// The comparator ordering the keys.
    pub fn key_comp(&self) -> &C {
        self.raw.key_comp()
    }

    /// A comparator over `(key, value)` pairs that looks at keys only.
    pub fn value_comp(&self) -> ValueCompare<'_, C> {
        self.raw.value_comp()
    }

    /// Position of the smallest element, or [`end`](Self::end) if empty.
    pub fn begin(&self) -> Position {
        self.raw.begin()
    }

    /// The past-the-end position.
    pub fn end(&self) -> Position {
        self.raw.end()
    }

    /// Position of the largest element, or [`rend`](Self::rend) if empty.
    pub fn rbegin(&self) -> Position {
        self.raw.rbegin()
    }

    /// The before-the-first position.
    pub fn rend(&self) -> Position {
        self.raw.rend()
    }

    /// See [`AllocatedRbTreeMap::next`].
    pub fn next(&self, pos: Position) -> Position {
        self.raw.next(pos)
    }

    /// See [`AllocatedRbTreeMap::prev`].
    pub fn prev(&self, pos: Position) -> Position {
        self.raw.prev(pos)
    }

    /// The key-value pair at `pos`, or `None` for sentinels and stale positions.
    pub fn key_value_at(&self, pos: Position) -> Option<(&K, &V)> {
        self.raw.key_value_at(pos)
    }

    /// The key and a mutable value at `pos`.
    pub fn key_value_at_mut(&mut self, pos: Position) -> Option<(&K, &mut V)> {
        self.raw.key_value_at_mut(pos)
    }

    /// A mutable reference to the value at `pos`.
    pub fn value_at_mut(&mut self, pos: Position) -> Option<&mut V> {
        self.raw.value_at_mut(pos)
    }

    /// Position of the element with key `key`, or [`end`](Self::end).
    pub fn find<Q>(&self, key: &Q) -> Position
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.find(key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.contains_key(key)
    }

    /// Number of elements with key `key`: `0` or `1`.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.count(key)
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.get(key)
    }

    /// Returns the key-value pair corresponding to the supplied key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.get_key_value(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.get_mut(key)
    }

    /// Returns the first key-value pair in the map.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first_key_value()
    }

    /// Returns the last key-value pair in the map.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last_key_value()
    }

    /// Position of the first element whose key is not less than `key`.
    pub fn lower_bound<Q>(&self, key: &Q) -> Position
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.lower_bound(key)
    }

    /// Position of the first element whose key is greater than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> Position
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.upper_bound(key)
    }

    /// `(lower_bound(key), upper_bound(key))`.
    pub fn equal_range<Q>(&self, key: &Q) -> (Position, Position)
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.equal_range(key)
    }

    /// Inserts a key-value pair unless the key is already present.
    ///
    /// Returns the position of the element with that key and `true` if it was
    /// inserted. If the key was present its value is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails; the map is then unchanged.
    pub fn insert(&mut self, key: K, value: V) -> Result<(Position, bool)>
    where
        C: Comparator<K>,
    {
        // SAFETY: `self.raw` was allocated by `self.alloc`
        unsafe { self.raw.insert_in(&self.alloc, key, value) }
    }

    /// Inserts a key-value pair and returns its position; `hint` is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails; the map is then unchanged.
    pub fn insert_hint(&mut self, hint: Position, key: K, value: V) -> Result<Position>
    where
        C: Comparator<K>,
    {
        // SAFETY: `self.raw` was allocated by `self.alloc`
        unsafe { self.raw.insert_hint_in(&self.alloc, hint, key, value) }
    }

    /// Returns the value for `key`, inserting `default()` first if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails; the map is then unchanged.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, default: F) -> Result<&mut V>
    where
        C: Comparator<K>,
    {
        // SAFETY: `self.raw` was allocated by `self.alloc`
        unsafe { self.raw.get_or_insert_with_in(&self.alloc, key, default) }
    }

    /// Returns the value for `key`, inserting `V::default()` first if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails; the map is then unchanged.
    pub fn get_or_insert_default(&mut self, key: K) -> Result<&mut V>
    where
        V: Default,
        C: Comparator<K>,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Inserts every pair of `iter`; keys already present keep their value.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails. Pairs inserted before the failure
    /// stay in the map.
    pub fn try_extend<I>(&mut self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        C: Comparator<K>,
    {
        // SAFETY: `self.raw` was allocated by `self.alloc`
        unsafe { self.raw.extend_in(&self.alloc, iter) }
    }

    /// Erases the element at `pos` and returns it.
    pub fn erase(&mut self, pos: Position) -> Option<(K, V)> {
        self.raw.erase(pos)
    }

    /// Erases the elements in `[first, last)`; returns how many were removed.
    pub fn erase_range(&mut self, first: Position, last: Position) -> usize {
        self.raw.erase_range(first, last)
    }

    /// Erases the element with key `key`; returns the number removed (0 or 1).
    pub fn erase_key<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.erase_key(key)
    }

    /// Removes a key from the map, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.remove(key)
    }

    /// Removes a key from the map, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.remove_entry(key)
    }

    /// Removes and returns the first element in the map.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.raw.pop_first()
    }

    /// Removes and returns the last element in the map.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.raw.pop_last()
    }

    /// Clears the map, removing all elements.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Exchanges the contents (and allocators) of two maps without touching
    /// any element.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.raw.iter()
    }

    /// Gets a mutable iterator over the entries of the map, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.raw.iter_mut()
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        self.raw.keys()
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        self.raw.values()
    }

    /// Gets a mutable iterator over the values of the map, in order by key.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        self.raw.values_mut()
    }

    /// Gets an iterator over the entries whose keys fall in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the start of the range sorts after its end.
    pub fn range<Q, R>(&self, range: R) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        R: RangeBounds<Q>,
        C: Comparator<Q>,
    {
        self.raw.range(range)
    }

    /// Creates a consuming iterator visiting all the keys, in sorted order.
    pub fn into_keys(self) -> IntoKeys<K, V, A> {
        IntoKeys {
            inner: self.into_iter(),
        }
    }

    /// Creates a consuming iterator visiting all the values, in order by key.
    pub fn into_values(self) -> IntoValues<K, V, A> {
        IntoValues {
            inner: self.into_iter(),
        }
    }

    /// Copies the map into a new allocation from a clone of its allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn try_clone(&self) -> Result<Self>
    where
        K: Clone,
        V: Clone,
        C: Clone + Comparator<K>,
        A: Clone,
    {
        let alloc = self.alloc.clone();
        // SAFETY: the copy is allocated with, and owned together with, `alloc`
        let raw = unsafe { self.raw.clone_in(&alloc) }?.into_inner();
        Ok(Self { alloc, raw })
    }

    #[cfg(test)]
    pub(crate) fn as_allocated(&self) -> &AllocatedRbTreeMap<K, V, C> {
        &self.raw
    }
}

#[cfg(feature = "std")]
impl<K: fmt::Debug, V: fmt::Debug, C, A: Allocator> RbTreeMap<K, V, C, A> {
    /// See [`AllocatedRbTreeMap::to_dot`].
    ///
    /// # Errors
    ///
    /// Will return `Err` if the output cannot be produced.
    pub fn to_dot(&self) -> Result<String, Box<dyn StdError>> {
        self.raw.to_dot()
    }
}

impl<K, V, C, A> Clone for RbTreeMap<K, V, C, A>
where
    K: Clone,
    V: Clone,
    C: Clone + Comparator<K>,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|e| e.handle_alloc_error())
    }

    fn clone_from(&mut self, source: &Self) {
        // SAFETY: `self.raw` was allocated by `self.alloc`
        unsafe { self.raw.clone_from_in(&self.alloc, &*source.raw) }
            .unwrap_or_else(|e| e.handle_alloc_error());
    }
}

impl<K, V, C, A: Allocator> IntoIterator for RbTreeMap<K, V, C, A> {
    type IntoIter = IntoIter<K, V, A>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so each field is moved out once.
        let (raw, alloc) = unsafe { (ManuallyDrop::take(&mut this.raw), ptr::read(&this.alloc)) };
        // SAFETY: `raw` was allocated by `alloc`
        unsafe { raw.into_iter_in(alloc) }
    }
}

impl<'s, K, V, C, A: Allocator> IntoIterator for &'s RbTreeMap<K, V, C, A> {
    type IntoIter = Iter<'s, K, V>;
    type Item = (&'s K, &'s V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'s, K, V, C, A: Allocator> IntoIterator for &'s mut RbTreeMap<K, V, C, A> {
    type IntoIter = IterMut<'s, K, V>;
    type Item = (&'s K, &'s mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, C: Comparator<K>, A: Allocator> Extend<(K, V)> for RbTreeMap<K, V, C, A> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.try_extend(iter).unwrap_or_else(|e| e.handle_alloc_error());
    }
}

impl<K, V, C: Comparator<K> + Default> FromIterator<(K, V)> for RbTreeMap<K, V, C> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_iter_in(iter, C::default(), Global).unwrap_or_else(|e| e.handle_alloc_error())
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for RbTreeMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        Self::from_iter(arr)
    }
}

impl<K, Q, V, C, A> Index<&Q> for RbTreeMap<K, V, C, A>
where
    K: Borrow<Q>,
    Q: ?Sized,
    C: Comparator<Q>,
    A: Allocator,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C, A: Allocator> fmt::Debug for RbTreeMap<K, V, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.raw, f)
    }
}

impl<K, V, C, A, C2, A2> PartialEq<RbTreeMap<K, V, C2, A2>> for RbTreeMap<K, V, C, A>
where
    K: PartialEq,
    V: PartialEq,
    A: Allocator,
    A2: Allocator,
{
    fn eq(&self, other: &RbTreeMap<K, V, C2, A2>) -> bool {
        *self.raw == *other.raw
    }
}

impl<K: Eq, V: Eq, C, A: Allocator> Eq for RbTreeMap<K, V, C, A> {}

impl<K: PartialOrd, V: PartialOrd, C, A: Allocator> PartialOrd for RbTreeMap<K, V, C, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.raw.partial_cmp(&other.raw)
    }
}

impl<K: Ord, V: Ord, C, A: Allocator> Ord for RbTreeMap<K, V, C, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<K: Hash, V: Hash, C, A: Allocator> Hash for RbTreeMap<K, V, C, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}
