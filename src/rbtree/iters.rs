use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use allocated::DropIn;
use allocator_api2::alloc::Allocator;

use super::arena::RawSlots;
use super::node::{NodeId, HIGH, LOW};
use super::position;
use super::raw::RawTree;

/// An iterator over the key-value pairs of a map, in sorted order by key.
///
/// This struct is created by the [`iter`](super::AllocatedRbTreeMap::iter) method on
/// [`AllocatedRbTreeMap`](super::AllocatedRbTreeMap). See its documentation for more.
pub struct Iter<'a, K, V> {
    tree: &'a RawTree<K, V>,
    front: NodeId,
    back: NodeId,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(tree: &'a RawTree<K, V>) -> Self {
        Self {
            tree,
            front: tree.first().unwrap_or(HIGH),
            back: HIGH,
            remaining: tree.len,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front;
        self.front = self.tree.successor(id);
        self.remaining -= 1;
        self.tree.key_value(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.back = self.tree.predecessor(self.back);
        self.remaining -= 1;
        self.tree.key_value(self.back)
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the key-value pairs of a map, in sorted order by key.
///
/// This struct is created by the [`iter_mut`](super::AllocatedRbTreeMap::iter_mut) method on
/// [`AllocatedRbTreeMap`](super::AllocatedRbTreeMap). See its documentation for more.
pub struct IterMut<'a, K, V> {
    slots: RawSlots<K, V>,
    front: NodeId,
    back: NodeId,
    remaining: usize,
    marker: PhantomData<(&'a K, &'a mut V)>,
}

// SAFETY: behaves like `(&K, &mut V)` items handed out from a unique borrow.
unsafe impl<K: Sync, V: Send> Send for IterMut<'_, K, V> {}
// SAFETY: as above; shared access to the iterator exposes nothing.
unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(super) fn new(tree: &'a mut RawTree<K, V>) -> Self {
        let front = tree.first().unwrap_or(HIGH);
        let remaining = tree.len;
        Self {
            slots: tree.arena.raw(),
            front,
            back: HIGH,
            remaining,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front;
        let slots = self.slots;
        // SAFETY: the tree is uniquely borrowed for `'a`, so the buffer stays
        // put and no link is written while we walk.
        self.front = position::successor(|n| unsafe { slots.links(n) }, id);
        self.remaining -= 1;
        // SAFETY: `front` and `back` never cross, so each payload is handed
        // out at most once.
        unsafe { slots.payload_mut(id) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slots = self.slots;
        // SAFETY: see `next`.
        self.back = position::predecessor(|n| unsafe { slots.links(n) }, self.back);
        self.remaining -= 1;
        // SAFETY: see `next`.
        unsafe { slots.payload_mut(self.back) }
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a map, in sorted order.
///
/// This struct is created by the [`keys`](super::AllocatedRbTreeMap::keys) method on
/// [`AllocatedRbTreeMap`](super::AllocatedRbTreeMap). See its documentation for more.
pub struct Keys<'a, K, V> {
    pub(super) inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// An iterator over the values of a map, in order by key.
///
/// This struct is created by the [`values`](super::AllocatedRbTreeMap::values) method on
/// [`AllocatedRbTreeMap`](super::AllocatedRbTreeMap). See its documentation for more.
pub struct Values<'a, K, V> {
    pub(super) inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a map, in order by key.
///
/// This struct is created by the [`values_mut`](super::AllocatedRbTreeMap::values_mut) method on
/// [`AllocatedRbTreeMap`](super::AllocatedRbTreeMap). See its documentation for more.
pub struct ValuesMut<'a, K, V> {
    pub(super) inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

/// An iterator over a sub-range of the key-value pairs of a map.
///
/// This struct is created by the [`range`](super::AllocatedRbTreeMap::range) method on
/// [`AllocatedRbTreeMap`](super::AllocatedRbTreeMap). See its documentation for more.
pub struct Range<'a, K, V> {
    tree: &'a RawTree<K, V>,
    /// Next node to yield from the front.
    front: NodeId,
    /// One past the next node to yield from the back.
    back: NodeId,
}

impl<'a, K, V> Range<'a, K, V> {
    pub(super) fn new(tree: &'a RawTree<K, V>, front: NodeId, back: NodeId) -> Self {
        Self { tree, front, back }
    }
}

impl<K, V> Clone for Range<'_, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.tree, self.front, self.back)
    }
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back || self.front == HIGH {
            return None;
        }
        let id = self.front;
        self.front = self.tree.successor(id);
        self.tree.key_value(id)
    }
}

impl<K, V> DoubleEndedIterator for Range<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let id = self.tree.predecessor(self.back);
        if id == LOW {
            return None;
        }
        self.back = id;
        self.tree.key_value(id)
    }
}

impl<K, V> FusedIterator for Range<'_, K, V> {}

/// An owning iterator over the key-value pairs of a map, in sorted order by key.
///
/// This struct is created by the [`into_iter`](core::iter::IntoIterator::into_iter) method on
/// [`RbTreeMap`](super::RbTreeMap) (provided by the [`IntoIterator`] trait). Elements
/// not consumed are dropped together with the node storage.
pub struct IntoIter<K, V, A: Allocator> {
    tree: RawTree<K, V>,
    alloc: A,
    front: NodeId,
    back: NodeId,
    remaining: usize,
}

impl<K, V, A: Allocator> IntoIter<K, V, A> {
    /// `alloc` must be the allocator of `tree`.
    pub(super) fn new(tree: RawTree<K, V>, alloc: A) -> Self {
        let front = tree.first().unwrap_or(HIGH);
        let remaining = tree.len;
        Self {
            tree,
            alloc,
            front,
            back: HIGH,
            remaining,
        }
    }

    fn take(&mut self, id: NodeId) -> Option<(K, V)> {
        // Links stay untouched, so neighbours remain reachable.
        self.tree.arena.get_mut(id).payload.take()
    }
}

impl<K, V, A: Allocator> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front;
        self.front = self.tree.successor(id);
        self.remaining -= 1;
        self.take(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, A: Allocator> DoubleEndedIterator for IntoIter<K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.back = self.tree.predecessor(self.back);
        self.remaining -= 1;
        self.take(self.back)
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for IntoIter<K, V, A> {}

impl<K, V, A: Allocator> FusedIterator for IntoIter<K, V, A> {}

impl<K, V, A: Allocator> Drop for IntoIter<K, V, A> {
    fn drop(&mut self) {
        // SAFETY: `new` requires `alloc` to be the allocator of `tree`
        unsafe { self.tree.drop_in(&self.alloc) }
    }
}

/// An owning iterator over the keys of a map, in sorted order.
///
/// This struct is created by the [`into_keys`](super::RbTreeMap::into_keys) method on
/// [`RbTreeMap`](super::RbTreeMap).
pub struct IntoKeys<K, V, A: Allocator> {
    pub(super) inner: IntoIter<K, V, A>,
}

impl<K, V, A: Allocator> Iterator for IntoKeys<K, V, A> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> DoubleEndedIterator for IntoKeys<K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for IntoKeys<K, V, A> {}

/// An owning iterator over the values of a map, in order by key.
///
/// This struct is created by the [`into_values`](super::RbTreeMap::into_values) method on
/// [`RbTreeMap`](super::RbTreeMap).
pub struct IntoValues<K, V, A: Allocator> {
    pub(super) inner: IntoIter<K, V, A>,
}

impl<K, V, A: Allocator> Iterator for IntoValues<K, V, A> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> DoubleEndedIterator for IntoValues<K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for IntoValues<K, V, A> {}
