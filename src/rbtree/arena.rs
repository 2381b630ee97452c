//! Slot storage for tree nodes.
//!
//! Every node of a map lives in one buffer obtained from the map's allocator
//! and is addressed by its [`NodeId`]. Ids are stable: the buffer may move
//! when it grows but the index of a node never changes. Freed slots are
//! threaded on a free list and reused by later inserts; their generation
//! counter is bumped so stale positions can be detected.

use core::mem;
use core::mem::size_of;
use core::ptr;
use core::ptr::NonNull;
use core::slice;

use allocated::{AllocResult, AllocatorExt, DropIn};
use allocator_api2::alloc::{Allocator, Layout};

use super::node::{Links, Node, NodeId, FIRST_DATA, HIGH, LOW};
use crate::error::{Error, Result};

const MIN_NON_ZERO_CAP: usize = 4;

pub struct Slot<K, V> {
    generation: u32,
    occupied: bool,
    next_free: Option<NodeId>,
    node: Node<K, V>,
}

pub struct Arena<K, V> {
    ptr: NonNull<Slot<K, V>>,
    cap: usize,
    len: usize,
    free: Option<NodeId>,
    n_free: usize,
}

// SAFETY: the arena uniquely owns its slots, like a `Vec<Slot<K, V>>`.
unsafe impl<K: Send, V: Send> Send for Arena<K, V> {}
// SAFETY: shared access only hands out shared references to slots.
unsafe impl<K: Sync, V: Sync> Sync for Arena<K, V> {}

impl<K, V> Arena<K, V> {
    /// Largest number of slots a buffer can describe.
    pub fn max_slots() -> usize {
        isize::MAX as usize / size_of::<Slot<K, V>>()
    }

    /// Largest number of data nodes an arena can hold.
    pub fn max_nodes() -> usize {
        Self::max_slots() - FIRST_DATA
    }

    fn layout(cap: usize) -> Result<Layout> {
        Layout::array::<Slot<K, V>>(cap).map_err(|_| Error::CapacityOverflow {
            max: Self::max_nodes(),
        })
    }

    /// Allocates room for `n_nodes` data nodes and installs both sentinels.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the allocation fails.
    pub fn with_capacity_in<A: Allocator>(alloc: &A, n_nodes: usize) -> Result<Self> {
        let cap = n_nodes
            .checked_add(FIRST_DATA)
            .ok_or(Error::CapacityOverflow {
                max: Self::max_nodes(),
            })?;
        let ptr = Self::allocate_slots(alloc, cap)?;

        let mut arena = Self {
            ptr,
            cap,
            len: 0,
            free: None,
            n_free: 0,
        };
        for _ in 0..FIRST_DATA {
            // SAFETY: `cap >= FIRST_DATA`, so both writes are within the buffer.
            unsafe { arena.push_unchecked(Node::sentinel()) };
        }
        Ok(arena)
    }

    fn allocate_slots<A: Allocator>(alloc: &A, cap: usize) -> Result<NonNull<Slot<K, V>>> {
        let layout = Self::layout(cap)?;
        let slots: AllocResult<_> = alloc.allocate_array::<Slot<K, V>>(cap);
        match slots {
            // The slots are uninitialised, so the guard must not drop them.
            Ok(guard) => Ok(guard.into_inner()),
            Err(e) => {
                log::debug!("allocator refused {} bytes for {} node slots", layout.size(), cap);
                Err(e.into())
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap - FIRST_DATA
    }

    /// Makes sure at least `additional` more nodes can be stored without
    /// allocating.
    ///
    /// # Safety
    ///
    /// `alloc` MUST be the allocator used to allocate this arena.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the allocation fails or the arena would exceed
    /// [`Arena::max_nodes`].
    pub unsafe fn reserve_in<A: Allocator>(&mut self, alloc: &A, additional: usize) -> Result<()> {
        let fresh = additional.saturating_sub(self.n_free);
        if self.cap - self.len >= fresh {
            return Ok(());
        }

        let overflow = Error::CapacityOverflow {
            max: Self::max_nodes(),
        };
        let required = self.len.checked_add(fresh).ok_or(overflow)?;
        if required > Self::max_slots() {
            return Err(overflow);
        }
        let new_cap = required
            .max(self.cap.saturating_mul(2))
            .max(MIN_NON_ZERO_CAP)
            .min(Self::max_slots());

        // SAFETY: requirements match function requirements
        unsafe { self.grow_in(alloc, new_cap) }
    }

    /// # Safety
    ///
    /// `alloc` MUST be the allocator used to allocate this arena.
    unsafe fn grow_in<A: Allocator>(&mut self, alloc: &A, new_cap: usize) -> Result<()> {
        debug_assert!(new_cap > self.cap);
        let new_ptr = Self::allocate_slots(alloc, new_cap)?;
        log::trace!("growing node arena from {} to {} slots", self.cap, new_cap);

        // SAFETY: both buffers hold at least `len` slots and are distinct allocations.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
        }
        // SAFETY: the old buffer came from `alloc` with this capacity and its
        // slots were moved out bitwise above.
        unsafe {
            alloc.deallocate_array(self.ptr, self.cap);
        }

        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }

    /// # Safety
    ///
    /// `self.len < self.cap`.
    unsafe fn push_unchecked(&mut self, node: Node<K, V>) -> NodeId {
        let id = NodeId(self.len);
        // SAFETY: caller guarantees the slot at `len` lies within the buffer.
        unsafe {
            self.ptr.as_ptr().add(self.len).write(Slot {
                generation: 0,
                occupied: true,
                next_free: None,
                node,
            });
        }
        self.len += 1;
        id
    }

    /// Stores `node` in a free slot.
    ///
    /// # Panics
    ///
    /// Panics if no slot is available; call [`Arena::reserve_in`] first.
    pub fn insert(&mut self, node: Node<K, V>) -> NodeId {
        if let Some(id) = self.free {
            let slot = &mut self.slots_mut()[id.index()];
            debug_assert!(!slot.occupied);
            let next = slot.next_free.take();
            slot.occupied = true;
            slot.node = node;
            self.free = next;
            self.n_free -= 1;
            return id;
        }

        assert!(self.len < self.cap, "node arena is full");
        // SAFETY: checked above
        unsafe { self.push_unchecked(node) }
    }

    /// Releases the slot of a data node and returns its contents.
    pub fn remove(&mut self, id: NodeId) -> Node<K, V> {
        assert!(id.index() >= FIRST_DATA, "sentinels are never freed");
        let free = self.free;
        let slot = &mut self.slots_mut()[id.index()];
        assert!(slot.occupied, "double free of {id:?}");
        let node = mem::replace(&mut slot.node, Node::sentinel());
        slot.occupied = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.next_free = free;
        self.free = Some(id);
        self.n_free += 1;
        node
    }

    /// Frees every data node and detaches both sentinels.
    ///
    /// The buffer is kept; freed slots are reused in ascending order.
    pub fn clear(&mut self) {
        log::trace!("clearing {} node slots", self.len - FIRST_DATA);
        self.free = None;
        self.n_free = 0;
        for i in (FIRST_DATA..self.len).rev() {
            let next = self.free;
            let slot = &mut self.slots_mut()[i];
            if slot.occupied {
                slot.node = Node::sentinel();
                slot.occupied = false;
                slot.generation = slot.generation.wrapping_add(1);
            }
            slot.next_free = next;
            self.free = Some(NodeId(i));
            self.n_free += 1;
        }
        self.get_mut(LOW).links = Links::default();
        self.get_mut(HIGH).links = Links::default();
    }

    fn slots(&self) -> &[Slot<K, V>] {
        // SAFETY: the first `len` slots are initialised.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn slots_mut(&mut self) -> &mut [Slot<K, V>] {
        // SAFETY: the first `len` slots are initialised and uniquely borrowed.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<K, V> {
        let slot = &self.slots()[id.index()];
        debug_assert!(slot.occupied, "{id:?} is vacant");
        &slot.node
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        let slot = &mut self.slots_mut()[id.index()];
        debug_assert!(slot.occupied, "{id:?} is vacant");
        &mut slot.node
    }

    #[inline]
    pub fn links(&self, id: NodeId) -> Links {
        self.get(id).links
    }

    /// Returns the generation of `id` if it names a live node.
    pub fn generation(&self, id: NodeId) -> Option<u32> {
        self.slots()
            .get(id.index())
            .filter(|slot| slot.occupied)
            .map(|slot| slot.generation)
    }

    /// Raw access to the slot buffer, for iterators that hand out disjoint
    /// mutable borrows of payloads.
    pub fn raw(&mut self) -> RawSlots<K, V> {
        RawSlots {
            ptr: self.ptr,
            len: self.len,
        }
    }
}

impl<K, V> DropIn for Arena<K, V> {
    /// # Safety
    ///
    /// `alloc` must be the allocator used to allocate this object.
    unsafe fn drop_in<A: Allocator>(&mut self, alloc: &A) {
        if self.cap == 0 {
            return;
        }
        // SAFETY: the first `len` slots are initialised and dropped exactly once.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len));
        }
        // SAFETY: the buffer was allocated by `alloc` with this capacity.
        unsafe { alloc.deallocate_array(self.ptr, self.cap) };
        self.ptr = NonNull::dangling();
        self.cap = 0;
        self.len = 0;
        self.free = None;
        self.n_free = 0;
    }
}

/// A copy of the slot buffer's address.
///
/// Reads go through raw places so that only the touched field is borrowed:
/// links can be followed while payloads of other nodes are mutably borrowed.
pub struct RawSlots<K, V> {
    ptr: NonNull<Slot<K, V>>,
    len: usize,
}

impl<K, V> Clone for RawSlots<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for RawSlots<K, V> {}

impl<K, V> RawSlots<K, V> {
    /// # Safety
    ///
    /// `id` must name a live node and the buffer must not have moved.
    #[inline]
    pub unsafe fn links(self, id: NodeId) -> Links {
        debug_assert!(id.index() < self.len);
        // SAFETY: caller guarantees `id` is in bounds and initialised; only
        // the `links` field is read.
        unsafe { (*self.ptr.as_ptr().add(id.index())).node.links }
    }

    /// # Safety
    ///
    /// `id` must name a live node, the buffer must not have moved, and no
    /// other borrow of this node's payload may be alive for `'a`.
    #[inline]
    pub unsafe fn payload_mut<'a>(self, id: NodeId) -> Option<(&'a K, &'a mut V)> {
        debug_assert!(id.index() < self.len);
        // SAFETY: caller guarantees exclusivity of this payload for `'a`.
        let payload = unsafe { &mut (*self.ptr.as_ptr().add(id.index())).node.payload };
        payload.as_mut().map(|(k, v)| (&*k, v))
    }
}
