use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::fmt::Debug;
use core::hash::{Hash, Hasher};
use core::ops::{Bound, RangeBounds};

#[cfg(feature = "std")]
use alloc::boxed::Box;
#[cfg(feature = "std")]
use alloc::format;
#[cfg(feature = "std")]
use alloc::string::String;
#[cfg(feature = "std")]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::error::Error as StdError;
#[cfg(feature = "std")]
use std::io::Write;

use allocated::{DropGuard, DropIn};
use allocator_api2::alloc::Allocator;

use crate::compare::{Comparator, Natural, ValueCompare};
use crate::error::{Error, Result};

mod arena;
mod balance;
mod iters;
mod node;
mod position;
mod raw;
mod wrapper;

#[cfg(test)]
mod tests;

pub use iters::{IntoIter, IntoKeys, IntoValues, Iter, IterMut, Keys, Range, Values, ValuesMut};
pub use position::Position;
pub use wrapper::RbTreeMap;

use arena::Arena;
use node::{Dir, NodeId, HIGH, LOW};
use raw::RawTree;

/// Outcome of a comparator-guided descent.
enum Search {
    Found(NodeId),
    /// The key would be stored as the `Dir` child of the node (or as the
    /// root when there is no node).
    Vacant(Option<NodeId>, Dir),
}

/// A red-black tree map using the allocated pattern.
///
/// This is the low-level "allocated" type: it does not own its allocator, and
/// every operation that may allocate takes the allocator as an argument.
/// Operations that never allocate (lookups, erasure, iteration, `clear`) are
/// safe. For most use cases prefer the [`RbTreeMap`] wrapper, which owns its
/// allocator and provides a safe, ergonomic API.
///
/// # Type Parameters
///
/// - `K`: Key type
/// - `V`: Value type
/// - `C`: [`Comparator`] ordering the keys (defaults to [`Natural`], i.e. `Ord`)
///
/// # Examples
///
/// ```
/// use allocated::CountingAllocator;
/// use allocated_rbtree::{AllocatedRbTreeMap, Natural};
///
/// let alloc = CountingAllocator::default();
/// let mut map = AllocatedRbTreeMap::<u32, String>::new_in(&alloc, Natural)?;
///
/// unsafe {
///     map.insert_in(&alloc, 1, "one".to_string())?;
///     map.insert_in(&alloc, 2, "two".to_string())?;
/// }
///
/// assert_eq!(map.len(), 2);
/// # Ok::<(), allocated_rbtree::Error>(())
/// ```
pub struct AllocatedRbTreeMap<K, V, C = Natural> {
    tree: RawTree<K, V>,
    comp: C,
}

impl<K, V, C> AllocatedRbTreeMap<K, V, C> {
    /// Creates an empty map ordered by `comp`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the allocation fails.
    pub fn new_in<A: Allocator>(alloc: &A, comp: C) -> Result<DropGuard<Self, &A>> {
        Self::with_capacity_in(alloc, 0, comp)
    }

    /// Creates an empty map with room for `capacity` elements.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the allocation fails or `capacity` exceeds
    /// [`max_size`](Self::max_size).
    pub fn with_capacity_in<A: Allocator>(
        alloc: &A,
        capacity: usize,
        comp: C,
    ) -> Result<DropGuard<Self, &A>> {
        if capacity > Self::max_size_static() {
            return Err(Error::CapacityOverflow {
                max: Self::max_size_static(),
            });
        }
        let tree = RawTree::with_capacity_in(alloc, capacity)?;
        // SAFETY: `tree` was allocated with `alloc` just above.
        unsafe { Ok(DropGuard::new(AllocatedRbTreeMap { tree, comp }, alloc)) }
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.tree.len == 0
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.tree.len
    }

    fn max_size_static() -> usize {
        Arena::<K, V>::max_nodes()
    }

    /// Upper bound on the number of elements, derived from the size of a node.
    pub fn max_size(&self) -> usize {
        Self::max_size_static()
    }

    /// Number of elements the map can hold without allocating.
    pub fn capacity(&self) -> usize {
        self.tree.arena.capacity()
    }

    /// The comparator ordering the keys.
    pub fn key_comp(&self) -> &C {
        &self.comp
    }

    /// A comparator over `(key, value)` pairs that looks at keys only.
    pub fn value_comp(&self) -> ValueCompare<'_, C> {
        ValueCompare::new(&self.comp)
    }

    fn position(&self, id: NodeId) -> Position {
        Position {
            id,
            generation: self.tree.arena.generation(id).unwrap_or(0),
        }
    }

    /// The data node named by `pos`, if it is still alive.
    fn resolve(&self, pos: Position) -> Option<NodeId> {
        if !pos.is_element() {
            return None;
        }
        (self.tree.arena.generation(pos.id) == Some(pos.generation)).then_some(pos.id)
    }

    /// Position of the smallest element, or [`end`](Self::end) if empty.
    pub fn begin(&self) -> Position {
        self.tree
            .first()
            .map_or(Position::END, |id| self.position(id))
    }

    /// The past-the-end position.
    pub fn end(&self) -> Position {
        Position::END
    }

    /// Position of the largest element, or [`rend`](Self::rend) if empty.
    pub fn rbegin(&self) -> Position {
        self.tree
            .last()
            .map_or(Position::REND, |id| self.position(id))
    }

    /// The before-the-first position, where reverse traversal stops.
    pub fn rend(&self) -> Position {
        Position::REND
    }

    /// The position following `pos` in key order.
    ///
    /// `next(end())` is `end()` and `next(rend())` is `begin()`. A stale
    /// position yields `end()`.
    pub fn next(&self, pos: Position) -> Position {
        match pos.id {
            LOW | HIGH => self.position(self.tree.successor(pos.id)),
            _ => match self.resolve(pos) {
                Some(id) => self.position(self.tree.successor(id)),
                None => Position::END,
            },
        }
    }

    /// The position preceding `pos` in key order.
    ///
    /// `prev(rend())` is `rend()` and `prev(end())` is `rbegin()`. A stale
    /// position yields `rend()`.
    pub fn prev(&self, pos: Position) -> Position {
        match pos.id {
            LOW | HIGH => self.position(self.tree.predecessor(pos.id)),
            _ => match self.resolve(pos) {
                Some(id) => self.position(self.tree.predecessor(id)),
                None => Position::REND,
            },
        }
    }

    /// The key-value pair at `pos`, or `None` for sentinels and stale positions.
    pub fn key_value_at(&self, pos: Position) -> Option<(&K, &V)> {
        self.tree.key_value(self.resolve(pos)?)
    }

    /// The key and a mutable value at `pos`, or `None` for sentinels and stale
    /// positions.
    pub fn key_value_at_mut(&mut self, pos: Position) -> Option<(&K, &mut V)> {
        let id = self.resolve(pos)?;
        self.tree.key_value_mut(id)
    }

    /// A mutable reference to the value at `pos`.
    pub fn value_at_mut(&mut self, pos: Position) -> Option<&mut V> {
        self.key_value_at_mut(pos).map(|(_, v)| v)
    }

    fn search<Q>(&self, key: &Q) -> Search
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let mut parent = None;
        let mut dir = Dir::Left;
        let mut cur = self.tree.root;
        while let Some(id) = cur {
            let Some(k) = self.tree.arena.get(id).key() else {
                break;
            };
            dir = match self.comp.compare(key, k.borrow()) {
                Ordering::Less => Dir::Left,
                Ordering::Greater => Dir::Right,
                Ordering::Equal => return Search::Found(id),
            };
            parent = Some(id);
            cur = self.tree.child(id, dir);
        }
        Search::Vacant(parent, dir)
    }

    fn find_node<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        match self.search(key) {
            Search::Found(id) => Some(id),
            Search::Vacant(..) => None,
        }
    }

    /// Position of the element with key `key`, or [`end`](Self::end).
    pub fn find<Q>(&self, key: &Q) -> Position
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.find_node(key)
            .map_or(Position::END, |id| self.position(id))
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.find_node(key).is_some()
    }

    /// Number of elements with key `key`: `0` or `1`.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        usize::from(self.contains_key(key))
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the key-value pair corresponding to the supplied key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.tree.key_value(self.find_node(key)?)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let id = self.find_node(key)?;
        self.tree.key_value_mut(id).map(|(_, v)| v)
    }

    /// Returns the first key-value pair in the map.
    /// The key in this pair is the minimum key in the map.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.key_value(self.tree.first()?)
    }

    /// Returns the last key-value pair in the map.
    /// The key in this pair is the maximum key in the map.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.key_value(self.tree.last()?)
    }

    /// First node whose key is not less than `key` (`strict == false`) or
    /// strictly greater than `key` (`strict == true`).
    fn bound_node<Q>(&self, key: &Q, strict: bool) -> NodeId
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let mut best = HIGH;
        let mut cur = self.tree.root;
        while let Some(id) = cur {
            let Some(k) = self.tree.arena.get(id).key() else {
                break;
            };
            let goes_left = match self.comp.compare(k.borrow(), key) {
                Ordering::Less => false,
                Ordering::Equal => !strict,
                Ordering::Greater => true,
            };
            if goes_left {
                best = id;
                cur = self.tree.child(id, Dir::Left);
            } else {
                cur = self.tree.child(id, Dir::Right);
            }
        }
        best
    }

    /// Position of the first element whose key is not less than `key`.
    pub fn lower_bound<Q>(&self, key: &Q) -> Position
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.position(self.bound_node(key, false))
    }

    /// Position of the first element whose key is greater than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> Position
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.position(self.bound_node(key, true))
    }

    /// `(lower_bound(key), upper_bound(key))`.
    pub fn equal_range<Q>(&self, key: &Q) -> (Position, Position)
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// # Safety
    ///
    /// `alloc` MUST be the allocator used to allocate this object.
    unsafe fn reserve_one_in<A: Allocator>(&mut self, alloc: &A) -> Result<()> {
        if self.len() >= self.max_size() {
            return Err(Error::CapacityOverflow {
                max: self.max_size(),
            });
        }
        // SAFETY: requirements match function requirements
        unsafe { self.tree.arena.reserve_in(alloc, 1) }
    }

    /// Inserts `key` with `value` unless an equivalent key is present.
    ///
    /// Returns the position of the element with that key and whether it was
    /// newly inserted. An existing element is left untouched.
    ///
    /// # Safety
    ///
    /// `alloc` MUST be the allocator used to allocate this object.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the allocation fails; the map is then unchanged.
    pub unsafe fn insert_in<A: Allocator>(
        &mut self,
        alloc: &A,
        key: K,
        value: V,
    ) -> Result<(Position, bool)>
    where
        C: Comparator<K>,
    {
        match self.search(&key) {
            Search::Found(id) => Ok((self.position(id), false)),
            Search::Vacant(parent, dir) => {
                // SAFETY: requirements match function requirements
                unsafe { self.reserve_one_in(alloc)? };
                let id = self.tree.attach(parent, dir, key, value);
                Ok((self.position(id), true))
            }
        }
    }

    /// Inserts like [`insert_in`](Self::insert_in) and returns only the position.
    ///
    /// The hint is accepted for interface compatibility and does not change
    /// where the descent starts.
    ///
    /// # Safety
    ///
    /// `alloc` MUST be the allocator used to allocate this object.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the allocation fails; the map is then unchanged.
    pub unsafe fn insert_hint_in<A: Allocator>(
        &mut self,
        alloc: &A,
        _hint: Position,
        key: K,
        value: V,
    ) -> Result<Position>
    where
        C: Comparator<K>,
    {
        // SAFETY: requirements match function requirements
        unsafe { self.insert_in(alloc, key, value) }.map(|(pos, _)| pos)
    }

    /// Returns the value for `key`, inserting `default()` first if absent.
    ///
    /// # Safety
    ///
    /// `alloc` MUST be the allocator used to allocate this object.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the allocation fails; the map is then unchanged.
    pub unsafe fn get_or_insert_with_in<A: Allocator, F: FnOnce() -> V>(
        &mut self,
        alloc: &A,
        key: K,
        default: F,
    ) -> Result<&mut V>
    where
        C: Comparator<K>,
    {
        let id = match self.search(&key) {
            Search::Found(id) => id,
            Search::Vacant(parent, dir) => {
                // SAFETY: requirements match function requirements
                unsafe { self.reserve_one_in(alloc)? };
                self.tree.attach(parent, dir, key, default())
            }
        };
        match self.tree.key_value_mut(id) {
            Some((_, v)) => Ok(v),
            None => unreachable!("data nodes carry a payload"),
        }
    }

    /// Inserts every pair of `iter`, skipping keys already present.
    ///
    /// # Safety
    ///
    /// `alloc` MUST be the allocator used to allocate this object.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an allocation fails; pairs inserted before the
    /// failure stay in the map.
    pub unsafe fn extend_in<A: Allocator, I>(&mut self, alloc: &A, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        C: Comparator<K>,
    {
        for (k, v) in iter {
            // SAFETY: requirements match function requirements
            unsafe { self.insert_in(alloc, k, v)? };
        }
        Ok(())
    }

    /// Builds a map from `iter`; later duplicates of a key are ignored.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an allocation fails.
    pub fn from_iter_in<'a, A: Allocator, I>(
        alloc: &'a A,
        comp: C,
        iter: I,
    ) -> Result<DropGuard<Self, &'a A>>
    where
        I: IntoIterator<Item = (K, V)>,
        C: Comparator<K>,
    {
        let mut map = Self::new_in(alloc, comp)?;
        // Safety: `alloc` was used to create `map`
        unsafe { map.extend_in(alloc, iter)? };
        Ok(map)
    }

    /// Erases the element at `pos` and returns it.
    ///
    /// Returns `None` (and does nothing) for sentinels and stale positions.
    /// Positions naming other elements stay valid.
    pub fn erase(&mut self, pos: Position) -> Option<(K, V)> {
        let id = self.resolve(pos)?;
        self.tree.detach(id)
    }

    /// Erases the elements in `[first, last)` and returns how many were removed.
    ///
    /// `last` must be reachable from `first` by [`next`](Self::next); the walk
    /// also stops at `end()` or at a stale position.
    pub fn erase_range(&mut self, first: Position, last: Position) -> usize {
        let mut n = 0;
        let mut cur = first;
        while cur != last {
            let Some(id) = self.resolve(cur) else {
                break;
            };
            let next = self.tree.successor(id);
            self.tree.detach(id);
            n += 1;
            cur = self.position(next);
        }
        n
    }

    /// Erases the element with key `key`; returns the number removed (0 or 1).
    pub fn erase_key<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        usize::from(self.remove_entry(key).is_some())
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value if the
    /// key was previously in the map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let id = self.find_node(key)?;
        self.tree.detach(id)
    }

    /// Removes and returns the first element in the map.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let id = self.tree.first()?;
        self.tree.detach(id)
    }

    /// Removes and returns the last element in the map.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let id = self.tree.last()?;
        self.tree.detach(id)
    }

    /// Clears the map, removing all elements. The node storage is kept.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Builds an independent copy by re-inserting every element in order.
    ///
    /// # Safety
    ///
    /// `alloc` MUST be the allocator the copy will be released with; it need
    /// not be the allocator of `self`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the allocation fails.
    pub unsafe fn clone_in<'a, A: Allocator>(&self, alloc: &'a A) -> Result<DropGuard<Self, &'a A>>
    where
        K: Clone,
        V: Clone,
        C: Clone + Comparator<K>,
    {
        let mut copy = Self::with_capacity_in(alloc, self.len(), self.comp.clone())?;
        for (k, v) in self {
            // Safety: `alloc` was used to create `copy`
            unsafe { copy.insert_in(alloc, k.clone(), v.clone())? };
        }
        Ok(copy)
    }

    /// Replaces the contents of `self` with copies of `source`'s elements,
    /// ordered by `self`'s comparator.
    ///
    /// # Safety
    ///
    /// `alloc` MUST be the allocator used to allocate this object.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the allocation fails; `self` then holds the
    /// elements copied so far.
    pub unsafe fn clone_from_in<A: Allocator, C2>(
        &mut self,
        alloc: &A,
        source: &AllocatedRbTreeMap<K, V, C2>,
    ) -> Result<()>
    where
        K: Clone,
        V: Clone,
        C: Comparator<K>,
    {
        self.clear();
        // Safety: requirements match function requirements
        unsafe {
            self.tree.arena.reserve_in(alloc, source.len())?;
            self.extend_in(alloc, source.iter().map(|(k, v)| (k.clone(), v.clone())))
        }
    }

    /// Returns an iterator over the key-value pairs of the map, in sorted order by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.tree)
    }

    /// Returns an iterator over the key-value pairs with mutable values, in
    /// sorted order by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.tree)
    }

    /// Returns an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Returns a mutable iterator over the values of the map, in order by key.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Returns an iterator over the elements whose keys fall in `range`.
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
        let start = range.start_bound();
        let end = range.end_bound();
        if let (
            Bound::Included(s) | Bound::Excluded(s),
            Bound::Included(e) | Bound::Excluded(e),
        ) = (start, end)
        {
            match self.comp.compare(s, e) {
                Ordering::Greater => panic!("range start is greater than range end"),
                Ordering::Equal
                    if matches!(start, Bound::Excluded(_)) || matches!(end, Bound::Excluded(_)) =>
                {
                    return Range::new(&self.tree, HIGH, HIGH);
                }
                _ => {}
            }
        }

        let front = match start {
            Bound::Included(s) => self.bound_node(s, false),
            Bound::Excluded(s) => self.bound_node(s, true),
            Bound::Unbounded => self.tree.first().unwrap_or(HIGH),
        };
        let back = match end {
            Bound::Included(e) => self.bound_node(e, true),
            Bound::Excluded(e) => self.bound_node(e, false),
            Bound::Unbounded => HIGH,
        };
        Range::new(&self.tree, front, back)
    }

    /// Converts the map into an owning iterator.
    ///
    /// # Safety
    ///
    /// `alloc` MUST be the allocator used to allocate this object.
    pub unsafe fn into_iter_in<A: Allocator>(self, alloc: A) -> IntoIter<K, V, A> {
        IntoIter::new(self.tree, alloc)
    }

    #[cfg(test)]
    pub(crate) fn raw(&self) -> &RawTree<K, V> {
        &self.tree
    }
}

#[cfg(feature = "std")]
impl<K: Debug, V: Debug, C> AllocatedRbTreeMap<K, V, C> {
    /// Renders the tree, including the sentinel frame, as a Graphviz digraph.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the output cannot be produced.
    pub fn to_dot(&self) -> Result<String, Box<dyn StdError>> {
        let mut data = Vec::default();

        data.write_all(b"digraph G {\n")?;
        data.write_all(b"node [style=filled; fontcolor=white];\n")?;
        data.write_all(b"\"LOW\" [shape=box; fillcolor=gray];\n")?;
        data.write_all(b"\"HIGH\" [shape=box; fillcolor=gray];\n")?;

        let mut stack: Vec<NodeId> = self.tree.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.tree.arena.get(id);
            let fill = match node.color {
                node::Color::Red => "red",
                node::Color::Black => "black",
            };
            if let Some((k, v)) = node.payload.as_ref() {
                data.write_all(
                    format!("\"{id:?}\" [label=\"{k:?}|{v:?}\"; shape=record; fillcolor={fill}];\n")
                        .as_bytes(),
                )?;
            }
            for child in [node.links.left, node.links.right].into_iter().flatten() {
                data.write_all(format!("\"{id:?}\" -> \"{child:?}\";\n").as_bytes())?;
                stack.push(child);
            }
        }

        if let Some(first) = self.tree.first() {
            data.write_all(format!("\"LOW\" -> \"{first:?}\" [style=dashed];\n").as_bytes())?;
        }
        if let Some(last) = self.tree.last() {
            data.write_all(format!("\"HIGH\" -> \"{last:?}\" [style=dashed];\n").as_bytes())?;
        }
        data.write_all(b"}\n")?;

        Ok(String::from_utf8(data)?)
    }
}

impl<K, V, C> DropIn for AllocatedRbTreeMap<K, V, C> {
    /// # Safety
    ///
    /// `alloc` must be the allocator used to allocate this object.
    unsafe fn drop_in<A: Allocator>(&mut self, alloc: &A) {
        // SAFETY: requirements match function requirements
        unsafe { self.tree.drop_in(alloc) }
    }
}

impl<K: Debug, V: Debug, C> Debug for AllocatedRbTreeMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq, C, C2> PartialEq<AllocatedRbTreeMap<K, V, C2>>
    for AllocatedRbTreeMap<K, V, C>
{
    fn eq(&self, other: &AllocatedRbTreeMap<K, V, C2>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C> Eq for AllocatedRbTreeMap<K, V, C> {}

impl<K: PartialOrd, V: PartialOrd, C> PartialOrd for AllocatedRbTreeMap<K, V, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord, C> Ord for AllocatedRbTreeMap<K, V, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K: Hash, V: Hash, C> Hash for AllocatedRbTreeMap<K, V, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for (k, v) in self {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl<'s, K, V, C> IntoIterator for &'s AllocatedRbTreeMap<K, V, C> {
    type IntoIter = Iter<'s, K, V>;
    type Item = (&'s K, &'s V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'s, K, V, C> IntoIterator for &'s mut AllocatedRbTreeMap<K, V, C> {
    type IntoIter = IterMut<'s, K, V>;
    type Item = (&'s K, &'s mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
