//! An ordered map backed by a red-black tree, using the _allocated_ pattern for
//! explicit allocator control.
//!
//! Keys are kept sorted by a [`Comparator`] chosen when the map is built. Every
//! lookup, insertion and removal runs in O(log n), and the smallest and
//! largest elements are reachable in O(1).
//!
//! # Quick Start
//!
//! ```
//! use allocated_rbtree::RbTreeMap;
//!
//! let mut map = RbTreeMap::new();
//! map.insert(3, "three")?;
//! map.insert(1, "one")?;
//! map.insert(2, "two")?;
//!
//! assert_eq!(map.get(&2), Some(&"two"));
//! assert!(map.keys().copied().eq([1, 2, 3]));
//! # Ok::<(), allocated_rbtree::Error>(())
//! ```
//!
//! # Positions
//!
//! Besides the usual map API, a map hands out [`Position`]s: small `Copy`
//! handles naming an element, the past-the-end sentinel ([`end`]) or the
//! before-the-first sentinel ([`rend`]). Positions do not borrow the map and
//! stay valid while other elements are inserted or erased:
//!
//! ```
//! use allocated_rbtree::RbTreeMap;
//!
//! let mut map: RbTreeMap<u32, char> = [(1, 'a'), (5, 'e'), (7, 'g')].into();
//!
//! let pos = map.lower_bound(&4);
//! assert_eq!(map.key_value_at(pos), Some((&5, &'e')));
//!
//! map.remove(&1);
//! map.insert(6, 'f')?;
//! assert_eq!(map.key_value_at(map.next(pos)), Some((&6, &'f')));
//!
//! map.erase(pos);
//! assert_eq!(map.key_value_at(pos), None);
//! # Ok::<(), allocated_rbtree::Error>(())
//! ```
//!
//! [`end`]: RbTreeMap::end
//! [`rend`]: RbTreeMap::rend
//!
//! # The Allocated Pattern
//!
//! This crate provides two types:
//!
//! ## Wrapper Type (Recommended)
//!
//! - [`RbTreeMap<K, V, C, A>`] - Owns allocator, safe API
//!
//! ```
//! use allocated_rbtree::RbTreeMap;
//!
//! let mut map = RbTreeMap::new();
//! map.insert(42, "answer")?;  // No unsafe blocks needed!
//! # Ok::<(), allocated_rbtree::Error>(())
//! ```
//!
//! ## Allocated Type (Advanced)
//!
//! - [`AllocatedRbTreeMap<K, V, C>`] - Low-level, requires manual allocator passing
//!
//! This is for building composite data structures or when you need fine control:
//!
//! ```
//! use allocated::CountingAllocator;
//! use allocated_rbtree::{AllocatedRbTreeMap, Natural};
//!
//! let alloc = CountingAllocator::default();
//! let mut map = AllocatedRbTreeMap::<u32, String>::new_in(&alloc, Natural)?;
//!
//! unsafe {
//!     map.insert_in(&alloc, 1, "one".to_string())?;
//! }
//!
//! // Track memory usage
//! println!("Allocations: {}", alloc.n_allocations());
//! # Ok::<(), allocated_rbtree::Error>(())
//! ```
//!
//! # Features
//!
//! - `std`: enables `to_dot()`, which renders a tree as a Graphviz digraph.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(any(feature = "std", test))]
extern crate std;

extern crate alloc;

/// Key orderings.
pub mod compare;
mod error;
/// Red-black tree map implementation.
///
/// This module provides [`rbtree::AllocatedRbTreeMap`] and its wrapper
/// [`rbtree::RbTreeMap`], together with their iterators and [`Position`].
pub mod rbtree;

pub use compare::{Comparator, FnComparator, Natural, Reverse, ValueCompare};
pub use error::{Error, Result};

// Re-export the allocated type for advanced use cases
pub use rbtree::AllocatedRbTreeMap;

// Re-export the wrapper type (recommended for most use cases)
pub use rbtree::RbTreeMap;

pub use rbtree::Position;
