//! Key orderings used to arrange a map.
//!
//! A map is parameterised by a [`Comparator`] chosen at construction time and
//! kept for the map's whole life. Two keys are considered the same key when
//! the comparator reports [`Ordering::Equal`]; the comparator must therefore be
//! a total order (or at least a strict weak ordering whose equivalence classes
//! are the keys you want to merge).

use core::cmp::Ordering;
use core::fmt;

/// A total ordering over `T`.
pub trait Comparator<T: ?Sized> {
    fn compare(&self, a: &T, b: &T) -> Ordering;

    /// Returns `true` if `a` sorts strictly before `b`.
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

/// The ordering given by [`Ord`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Natural;

impl<T: Ord + ?Sized> Comparator<T> for Natural {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Inverts another comparator.
///
/// ```
/// use allocated_rbtree::{Natural, RbTreeMap, Reverse};
///
/// let mut map = RbTreeMap::with_comparator(Reverse(Natural));
/// map.insert(1, ())?;
/// map.insert(3, ())?;
/// map.insert(2, ())?;
/// assert!(map.keys().copied().eq([3, 2, 1]));
/// # Ok::<(), allocated_rbtree::Error>(())
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reverse<C>(pub C);

impl<T: ?Sized, C: Comparator<T>> Comparator<T> for Reverse<C> {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self.0.compare(b, a)
    }
}

/// Adapts a closure `Fn(&T, &T) -> Ordering` into a [`Comparator`].
#[derive(Clone, Copy, Default)]
pub struct FnComparator<F>(pub F);

impl<F> fmt::Debug for FnComparator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnComparator")
    }
}

impl<T: ?Sized, F: Fn(&T, &T) -> Ordering> Comparator<T> for FnComparator<F> {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.0)(a, b)
    }
}

/// Orders `(key, value)` pairs by key alone, using the map's comparator.
///
/// Returned by `value_comp()`.
pub struct ValueCompare<'c, C> {
    comp: &'c C,
}

impl<'c, C> ValueCompare<'c, C> {
    pub(crate) fn new(comp: &'c C) -> Self {
        Self { comp }
    }

    /// Compares two pairs by their keys; values are ignored.
    pub fn compare<K, V>(&self, a: (&K, &V), b: (&K, &V)) -> Ordering
    where
        C: Comparator<K>,
    {
        self.comp.compare(a.0, b.0)
    }

    /// Returns `true` if `a`'s key sorts strictly before `b`'s key.
    pub fn less<K, V>(&self, a: (&K, &V), b: (&K, &V)) -> bool
    where
        C: Comparator<K>,
    {
        self.compare(a, b) == Ordering::Less
    }
}

impl<C> Clone for ValueCompare<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for ValueCompare<'_, C> {}

impl<C: fmt::Debug> fmt::Debug for ValueCompare<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCompare")
            .field("comp", self.comp)
            .finish()
    }
}
