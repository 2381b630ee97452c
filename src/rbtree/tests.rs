#![allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block
)]

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use core::cell::Cell;
use core::fmt::Debug;
use core::ptr::NonNull;
use std::collections::hash_map::DefaultHasher;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};

use allocated::CountingAllocator;
use allocator_api2::alloc::{AllocError, Allocator, Global, Layout};
use proptest::prelude::*;

use itertools::assert_equal;
use itertools::Itertools;

use crate::compare::{FnComparator, Reverse};

use super::node::{Dir, NodeId};
use super::*;

/// Asserts every structural property of the tree: colour rules, parent
/// links, strict key order, element count and the sentinel frame.
fn check<K: Debug, V, C: Comparator<K>>(map: &AllocatedRbTreeMap<K, V, C>) {
    let tree = map.raw();

    for sentinel in [LOW, HIGH] {
        let node = tree.arena.get(sentinel);
        assert!(node.is_sentinel(), "{sentinel:?} carries a payload");
        assert!(!node.is_red(), "{sentinel:?} must be black");
        assert_eq!(node.links.left, None);
        assert_eq!(node.links.right, None);
    }

    match tree.root {
        None => {
            assert_eq!(tree.len, 0);
            assert_eq!(tree.first(), None);
            assert_eq!(tree.last(), None);
        }
        Some(root) => {
            assert_eq!(tree.parent(root), None);
            assert!(!tree.is_red(Some(root)), "root must be black");
            black_height(tree, Some(root));
            let links = |id| tree.links(id);
            assert_eq!(tree.first(), Some(position::extreme(links, root, Dir::Left)));
            assert_eq!(tree.last(), Some(position::extreme(links, root, Dir::Right)));
        }
    }

    assert_eq!(tree.count_from(tree.root), tree.len);
    assert_eq!(map.iter().count(), map.len());
    assert_eq!(map.iter().rev().count(), map.len());
    for ((a, _), (b, _)) in map.iter().tuple_windows() {
        assert!(map.key_comp().less(a, b), "{a:?} is not before {b:?}");
    }
}

fn black_height<K, V>(tree: &RawTree<K, V>, id: Option<NodeId>) -> usize {
    let Some(id) = id else {
        return 1;
    };
    let links = tree.links(id);
    for child in [links.left, links.right].into_iter().flatten() {
        assert_eq!(tree.parent(child), Some(id), "broken parent link");
        if tree.is_red(Some(id)) {
            assert!(!tree.is_red(Some(child)), "red {id:?} has a red child");
        }
    }
    let left = black_height(tree, links.left);
    let right = black_height(tree, links.right);
    assert_eq!(left, right, "black heights differ below {id:?}");
    left + usize::from(!tree.is_red(Some(id)))
}

fn height<K, V>(tree: &RawTree<K, V>, id: Option<NodeId>) -> usize {
    id.map_or(0, |id| {
        let links = tree.links(id);
        1 + height(tree, links.left).max(height(tree, links.right))
    })
}

fn root_key<K: Copy, V, C>(map: &AllocatedRbTreeMap<K, V, C>) -> Option<K> {
    let tree = map.raw();
    tree.key_value(tree.root?).map(|(k, _)| *k)
}

/// Serves a fixed number of allocations from [`Global`], then refuses.
struct FailingAllocator {
    remaining: Cell<usize>,
}

impl FailingAllocator {
    fn new(n: usize) -> Self {
        Self {
            remaining: Cell::new(n),
        }
    }
}

unsafe impl Allocator for FailingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let n = self.remaining.get();
        if n == 0 {
            return Err(AllocError);
        }
        self.remaining.set(n - 1);
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { Global.deallocate(ptr, layout) }
    }
}

const SAMPLE: [u32; 7] = [5, 3, 8, 1, 4, 7, 9];

fn sample_in<A: Allocator>(alloc: A) -> Result<RbTreeMap<u32, u32, Natural, A>, Box<dyn Error>> {
    let mut map = RbTreeMap::new_in(alloc)?;
    for k in SAMPLE {
        map.insert(k, k * 10)?;
        check(map.as_allocated());
    }
    Ok(map)
}

#[test]
fn test_constructor() -> Result<(), Box<dyn Error>> {
    let alloc = CountingAllocator::default();
    let mut map = AllocatedRbTreeMap::<u32, u32>::new_in(&alloc, Natural)?.into_inner();

    assert_equal(map.iter().map(|(k, v)| (*k, *v)), vec![]);
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());
    assert_eq!(map.capacity(), 0);
    assert!(map.max_size() > 0);

    assert!(!map.contains_key(&1));
    assert_eq!(map.get(&1), None);
    assert_eq!(map.first_key_value(), None);
    assert_eq!(map.last_key_value(), None);

    assert_eq!(map.begin(), map.end());
    assert_eq!(map.rbegin(), map.rend());
    assert!(map.find(&1).is_end());
    check(&*map);

    unsafe {
        map.drop_in(&alloc);
    }

    assert_eq!(alloc.n_allocations(), 1);
    assert_eq!(alloc.net_allocations(), 0);
    assert_eq!(alloc.net_bytes_allocated(), 0);

    Ok(())
}

#[test]
fn test_one() -> Result<(), Box<dyn Error>> {
    let alloc = CountingAllocator::default();
    let mut map = AllocatedRbTreeMap::<u32, u32>::new_in(&alloc, Natural)?;

    unsafe {
        let (pos, inserted) = map.insert_in(&alloc, 1, 1)?;
        assert!(inserted);
        assert_eq!(map.key_value_at(pos), Some((&1, &1)));
    }

    assert_eq!(map.len(), 1);
    assert_equal(map.iter().map(|(k, v)| (*k, *v)), vec![(1, 1)]);
    assert_eq!(map.get(&1), Some(&1));
    assert_eq!(map.first_key_value(), Some((&1, &1)));
    assert_eq!(map.last_key_value(), Some((&1, &1)));
    assert_eq!(map.begin(), map.rbegin());
    check(&*map);

    core::mem::drop(map);

    assert_eq!(alloc.net_allocations(), 0);
    assert_eq!(alloc.net_bytes_allocated(), 0);

    Ok(())
}

#[test]
fn test_sorted_after_unordered_inserts() -> Result<(), Box<dyn Error>> {
    let map = sample_in(Global)?;

    assert_equal(map.keys().copied(), [1, 3, 4, 5, 7, 8, 9]);
    let raw = map.as_allocated().raw();
    let n = map.len();
    assert!(height(raw, raw.root) <= 2 * (n + 1).ilog2() as usize);

    Ok(())
}

#[test]
fn test_erase_root() -> Result<(), Box<dyn Error>> {
    let mut map = sample_in(Global)?;
    let root = root_key(map.as_allocated()).ok_or("empty tree")?;

    assert_eq!(map.remove(&root), Some(root * 10));
    check(map.as_allocated());

    assert_eq!(map.len(), 6);
    assert_equal(
        map.keys().copied(),
        SAMPLE.iter().copied().filter(|&k| k != root).sorted(),
    );

    Ok(())
}

#[test]
fn test_erase_two_children_keeps_successor_position() -> Result<(), Box<dyn Error>> {
    let mut map = sample_in(Global)?;
    assert_eq!(root_key(map.as_allocated()), Some(5));

    let seven = map.find(&7);
    let erased = map.erase(map.find(&5));
    check(map.as_allocated());

    assert_eq!(erased, Some((5, 50)));
    assert!(map.find(&5).is_end());
    assert_eq!(root_key(map.as_allocated()), Some(7));
    assert_eq!(map.key_value_at(seven), Some((&7, &70)));
    assert_eq!(map.key_value_at(map.prev(seven)), Some((&4, &40)));

    Ok(())
}

#[test]
fn test_bounds() -> Result<(), Box<dyn Error>> {
    let map = sample_in(Global)?;

    assert_eq!(map.key_value_at(map.lower_bound(&6)), Some((&7, &70)));
    assert_eq!(map.key_value_at(map.upper_bound(&5)), Some((&7, &70)));
    assert_eq!(map.key_value_at(map.lower_bound(&5)), Some((&5, &50)));

    let (lo, hi) = map.equal_range(&5);
    assert_eq!(map.key_value_at(lo), Some((&5, &50)));
    assert_eq!(map.key_value_at(hi), Some((&7, &70)));
    assert_eq!(map.next(lo), hi);

    let (lo, hi) = map.equal_range(&6);
    assert_eq!(lo, hi);

    assert_eq!(map.lower_bound(&0), map.begin());
    assert!(map.lower_bound(&10).is_end());
    assert!(map.upper_bound(&9).is_end());

    Ok(())
}

#[test]
fn test_erase_single_element() -> Result<(), Box<dyn Error>> {
    let alloc = CountingAllocator::default();
    let mut map = RbTreeMap::new_in(&alloc)?;
    map.insert(42, "answer")?;

    assert_eq!(map.erase(map.begin()), Some((42, "answer")));
    check(map.as_allocated());
    assert_eq!(map.len(), 0);
    assert_eq!(map.begin(), map.end());
    assert_eq!(map.rbegin(), map.rend());

    let (pos, inserted) = map.insert(7, "seven")?;
    assert!(inserted);
    assert_eq!(map.begin(), pos);
    assert_eq!(map.rbegin(), pos);
    check(map.as_allocated());

    core::mem::drop(map);
    assert_eq!(alloc.net_allocations(), 0);

    Ok(())
}

#[test]
fn test_get_or_insert_default() -> Result<(), Box<dyn Error>> {
    let mut map = RbTreeMap::<&str, u32>::new();

    *map.get_or_insert_default("apples")? += 3;
    *map.get_or_insert_default("apples")? += 2;
    *map.get_or_insert_default("pears")? += 1;

    assert_eq!(map.key_value_at(map.find("apples")), Some((&"apples", &5)));
    assert_eq!(map["pears"], 1);
    assert_eq!(map.len(), 2);

    let v = map.get_or_insert_with("plums", || 9)?;
    assert_eq!(*v, 9);
    check(map.as_allocated());

    Ok(())
}

#[test]
fn test_insert_existing_key() -> Result<(), Box<dyn Error>> {
    let mut map = RbTreeMap::new();

    let (first, inserted) = map.insert(1, "a")?;
    assert!(inserted);
    let (again, inserted) = map.insert(1, "b")?;
    assert!(!inserted);

    assert_eq!(first, again);
    assert_eq!(map.get(&1), Some(&"a"));
    assert_eq!(map.len(), 1);

    let hinted = map.insert_hint(map.end(), 2, "c")?;
    assert_eq!(map.key_value_at(hinted), Some((&2, &"c")));
    assert_eq!(map.insert_hint(map.begin(), 1, "d")?, first);
    assert_eq!(map.get(&1), Some(&"a"));

    Ok(())
}

#[test]
fn test_position_navigation() -> Result<(), Box<dyn Error>> {
    let empty = RbTreeMap::<u32, u32>::new();
    assert_eq!(empty.next(empty.rend()), empty.end());
    assert_eq!(empty.prev(empty.end()), empty.rend());

    let map = sample_in(Global)?;

    assert_eq!(map.next(map.end()), map.end());
    assert_eq!(map.prev(map.rend()), map.rend());
    assert_eq!(map.next(map.rend()), map.begin());
    assert_eq!(map.prev(map.end()), map.rbegin());
    assert!(map.end().is_end());
    assert!(map.rend().is_rend());
    assert!(map.begin().is_element());

    let mut forward = Vec::new();
    let mut pos = map.begin();
    while pos != map.end() {
        forward.push(*map.key_value_at(pos).ok_or("dangling position")?.0);
        pos = map.next(pos);
    }
    assert_eq!(forward, [1, 3, 4, 5, 7, 8, 9]);

    let mut backward = Vec::new();
    let mut pos = map.rbegin();
    while pos != map.rend() {
        backward.push(*map.key_value_at(pos).ok_or("dangling position")?.0);
        pos = map.prev(pos);
    }
    assert_eq!(backward, [9, 8, 7, 5, 4, 3, 1]);

    assert_eq!(map.key_value_at(map.end()), None);
    assert_eq!(map.key_value_at(map.rend()), None);

    Ok(())
}

#[test]
fn test_stale_position() -> Result<(), Box<dyn Error>> {
    let mut map = sample_in(Global)?;

    let four = map.find(&4);
    let eight = map.find(&8);
    assert_eq!(map.erase(four), Some((4, 40)));

    assert_eq!(map.key_value_at(four), None);
    assert_eq!(map.value_at_mut(four), None);
    assert_eq!(map.erase(four), None);
    assert_eq!(map.next(four), map.end());
    assert_eq!(map.prev(four), map.rend());

    // The freed slot is reused, but the old position stays dead.
    let (again, _) = map.insert(4, 41)?;
    assert_ne!(again, four);
    assert_eq!(map.key_value_at(four), None);
    assert_eq!(map.key_value_at(again), Some((&4, &41)));

    assert_eq!(map.key_value_at(eight), Some((&8, &80)));
    *map.value_at_mut(eight).ok_or("lost 8")? = 88;
    assert_eq!(map.get(&8), Some(&88));

    Ok(())
}

#[test]
fn test_erase_range() -> Result<(), Box<dyn Error>> {
    let mut map = sample_in(Global)?;

    let n = map.erase_range(map.lower_bound(&3), map.upper_bound(&7));
    check(map.as_allocated());
    assert_eq!(n, 4);
    assert_equal(map.keys().copied(), [1, 8, 9]);

    assert_eq!(map.erase_range(map.begin(), map.begin()), 0);
    assert_eq!(map.erase_range(map.begin(), map.end()), 3);
    assert!(map.is_empty());
    check(map.as_allocated());

    Ok(())
}

#[test]
fn test_removals() -> Result<(), Box<dyn Error>> {
    let mut map = sample_in(Global)?;

    assert_eq!(map.erase_key(&3), 1);
    assert_eq!(map.erase_key(&3), 0);
    assert_eq!(map.remove(&4), Some(40));
    assert_eq!(map.remove(&4), None);
    assert_eq!(map.remove_entry(&5), Some((5, 50)));
    assert_eq!(map.pop_first(), Some((1, 10)));
    assert_eq!(map.pop_last(), Some((9, 90)));
    check(map.as_allocated());

    assert_equal(map.iter(), [(&7, &70), (&8, &80)]);
    assert_eq!(map.count(&7), 1);
    assert_eq!(map.count(&5), 0);

    assert_eq!(map.pop_last(), Some((8, 80)));
    assert_eq!(map.pop_last(), Some((7, 70)));
    assert_eq!(map.pop_last(), None);
    assert_eq!(map.pop_first(), None);
    check(map.as_allocated());

    Ok(())
}

#[test]
fn test_iterators() -> Result<(), Box<dyn Error>> {
    let mut map = sample_in(Global)?;

    assert_eq!(map.iter().len(), 7);
    assert_equal(map.iter().rev().map(|(k, _)| *k), [9, 8, 7, 5, 4, 3, 1]);
    assert_equal(map.values().copied(), [10, 30, 40, 50, 70, 80, 90]);

    let mut it = map.iter();
    assert_eq!(it.next(), Some((&1, &10)));
    assert_eq!(it.next_back(), Some((&9, &90)));
    assert_eq!(it.len(), 5);
    assert_equal(it.map(|(k, _)| *k), [3, 4, 5, 7, 8]);

    for (k, v) in map.iter_mut() {
        *v += k;
    }
    for v in map.values_mut().rev().take(2) {
        *v = 0;
    }
    assert_equal(map.values().copied(), [11, 33, 44, 55, 77, 0, 0]);

    let mut total = 0u32;
    for (_, v) in &map {
        total += v;
    }
    assert_eq!(total, 220);

    for (_, v) in &mut map {
        *v = 1;
    }
    assert!(map.values().all(|&v| v == 1));

    Ok(())
}

#[test]
fn test_range() -> Result<(), Box<dyn Error>> {
    let map = sample_in(Global)?;
    let keys = |r: Range<'_, u32, u32>| r.map(|(k, _)| *k).collect::<Vec<_>>();

    assert_eq!(keys(map.range(3..8)), [3, 4, 5, 7]);
    assert_eq!(keys(map.range(3..=8)), [3, 4, 5, 7, 8]);
    assert_eq!(keys(map.range(2..6)), [3, 4, 5]);
    assert_eq!(keys(map.range(..4)), [1, 3]);
    assert_eq!(keys(map.range(6..)), [7, 8, 9]);
    assert_eq!(keys(map.range(..)), [1, 3, 4, 5, 7, 8, 9]);
    assert!(keys(map.range(5..5)).is_empty());
    assert_eq!(keys(map.range(5..=5)), [5]);
    assert!(keys(map.range(10..)).is_empty());
    assert_eq!(
        keys(map.range((Bound::Excluded(3), Bound::Excluded(8)))),
        [4, 5, 7]
    );
    assert!(keys(map.range((Bound::Excluded(5), Bound::Included(5)))).is_empty());

    assert_equal(map.range(2..=7).rev().map(|(k, _)| *k), [7, 5, 4, 3]);

    let mut r = map.range(3..=8);
    assert_eq!(r.next(), Some((&3, &30)));
    assert_eq!(r.next_back(), Some((&8, &80)));
    assert_eq!(r.next_back(), Some((&7, &70)));
    assert_eq!(r.next(), Some((&4, &40)));
    assert_eq!(r.next(), Some((&5, &50)));
    assert_eq!(r.next(), None);
    assert_eq!(r.next_back(), None);

    Ok(())
}

#[test]
#[should_panic(expected = "range start is greater than range end")]
fn test_range_backwards_panics() {
    let map: RbTreeMap<u32, ()> = [(1, ()), (2, ())].into();
    let _ = map.range(2..1);
}

#[test]
fn test_into_iter() -> Result<(), Box<dyn Error>> {
    let alloc = CountingAllocator::default();
    let mut map = RbTreeMap::new_in(&alloc)?;
    for i in 0..20u32 {
        map.insert(i, i.to_string())?;
    }

    let mut it = map.into_iter();
    assert_eq!(it.len(), 20);
    assert_eq!(it.next(), Some((0, "0".to_string())));
    assert_eq!(it.next_back(), Some((19, "19".to_string())));
    assert_equal(it.by_ref().take(3).map(|(k, _)| k), [1, 2, 3]);
    assert_eq!(it.len(), 15);
    core::mem::drop(it);

    assert_eq!(alloc.net_allocations(), 0);
    assert_eq!(alloc.net_bytes_allocated(), 0);

    let map: RbTreeMap<u32, char> = [(2, 'b'), (1, 'a'), (3, 'c')].into();
    assert_equal(map.clone().into_keys().rev(), [3, 2, 1]);
    assert_equal(map.into_values(), ['a', 'b', 'c']);

    Ok(())
}

#[test]
fn test_clone() -> Result<(), Box<dyn Error>> {
    let alloc = CountingAllocator::default();
    {
        let mut map = sample_in(&alloc)?;
        let copy = map.try_clone()?;
        check(copy.as_allocated());

        map.insert(2, 20)?;
        map.remove(&9);
        *map.get_mut(&1).ok_or("lost 1")? = 0;

        assert_equal(copy.keys().copied(), [1, 3, 4, 5, 7, 8, 9]);
        assert_eq!(copy.get(&1), Some(&10));
        assert_ne!(map, copy);

        let mut target = RbTreeMap::new_in(&alloc)?;
        target.insert(100, 100)?;
        target.clone_from(&map);
        check(target.as_allocated());
        assert_eq!(target, map);
        assert!(!target.contains_key(&100));

        let cloned = copy.clone();
        assert_eq!(cloned, copy);
    }
    assert_eq!(alloc.net_allocations(), 0);
    assert_eq!(alloc.net_bytes_allocated(), 0);

    Ok(())
}

#[test]
fn test_relational() -> Result<(), Box<dyn Error>> {
    let a: RbTreeMap<u32, u32> = [(1, 1), (2, 2)].into();
    let b: RbTreeMap<u32, u32> = [(2, 2), (1, 1)].into();
    let c: RbTreeMap<u32, u32> = [(1, 1), (3, 0)].into();
    let d: RbTreeMap<u32, u32> = [(1, 1)].into();

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, d);
    assert!(a < c);
    assert!(d < a);
    assert!(c > d);
    assert_eq!(a.cmp(&b), Ordering::Equal);

    let hash = |m: &RbTreeMap<u32, u32>| {
        let mut h = DefaultHasher::new();
        m.hash(&mut h);
        h.finish()
    };
    assert_eq!(hash(&a), hash(&b));

    // Each side is walked in its own key order.
    let reversed = RbTreeMap::from_iter_in([(1, 1), (2, 2)], Reverse(Natural), Global)?;
    assert_ne!(a, reversed);

    Ok(())
}

#[test]
fn test_reverse_comparator() -> Result<(), Box<dyn Error>> {
    let mut map = RbTreeMap::with_comparator(Reverse(Natural));
    for k in SAMPLE {
        map.insert(k, ())?;
        check(map.as_allocated());
    }

    assert_equal(map.keys().copied(), [9, 8, 7, 5, 4, 3, 1]);
    assert_eq!(map.key_value_at(map.lower_bound(&6)), Some((&5, &())));
    assert_eq!(map.key_value_at(map.upper_bound(&7)), Some((&5, &())));
    assert_eq!(map.first_key_value(), Some((&9, &())));
    assert_equal(map.range(8..=4).map(|(k, _)| *k), [8, 7, 5, 4]);

    Ok(())
}

#[test]
fn test_comparator_equivalence() -> Result<(), Box<dyn Error>> {
    let by_last_digit = FnComparator(|a: &u32, b: &u32| (a % 10).cmp(&(b % 10)));
    let mut map = RbTreeMap::with_comparator(by_last_digit);

    assert!(map.insert(13, "thirteen")?.1);
    assert!(!map.insert(3, "three")?.1);
    assert!(map.insert(21, "twenty-one")?.1);

    assert_eq!(map.len(), 2);
    assert_eq!(map.get_key_value(&33), Some((&13, &"thirteen")));
    assert_equal(map.keys().copied(), [21, 13]);

    let vc = map.value_comp();
    assert!(vc.less((&21, &"x"), (&3, &"a")));
    assert_eq!(vc.compare((&13, &"x"), (&3, &"a")), Ordering::Equal);

    Ok(())
}

#[test]
fn test_comparator_panic_leaves_map_intact() -> Result<(), Box<dyn Error>> {
    for panic_at in 1..=2 {
        let calls = Cell::new(0usize);
        let armed = Cell::new(false);
        let cmp = FnComparator(|a: &u32, b: &u32| {
            if armed.get() {
                calls.set(calls.get() + 1);
                assert!(calls.get() < panic_at, "comparator gave up");
            }
            a.cmp(b)
        });
        let mut map = RbTreeMap::with_comparator(cmp);
        for k in 1..=9 {
            map.insert(k, k * k)?;
        }

        armed.set(true);
        let result = catch_unwind(AssertUnwindSafe(|| map.insert(10, 100)));
        armed.set(false);

        assert!(result.is_err());
        assert_eq!(map.len(), 9);
        check(map.as_allocated());
        assert_equal(map.iter().map(|(k, v)| (*k, *v)), (1..=9).map(|k| (k, k * k)));
        assert!(!map.contains_key(&10));

        // The map stays usable afterwards.
        map.insert(10, 100)?;
        check(map.as_allocated());
        assert_eq!(map.last_key_value(), Some((&10, &100)));
    }

    Ok(())
}

#[test]
fn test_swap() -> Result<(), Box<dyn Error>> {
    let mut a: RbTreeMap<u32, u32> = [(1, 1), (2, 2)].into();
    let mut b: RbTreeMap<u32, u32> = [(9, 9)].into();
    let nine = b.find(&9);

    a.swap(&mut b);

    assert_equal(a.keys().copied(), [9]);
    assert_equal(b.keys().copied(), [1, 2]);
    assert_eq!(a.key_value_at(nine), Some((&9, &9)));
    check(a.as_allocated());
    check(b.as_allocated());

    Ok(())
}

#[test]
fn test_alloc_failure_leaves_map_unchanged() -> Result<(), Box<dyn Error>> {
    let alloc = FailingAllocator::new(1);
    let mut map = RbTreeMap::new_in(&alloc)?;

    let err = map.insert(1, 1).err().ok_or("insert should fail")?;
    assert!(matches!(err, crate::Error::AllocError(_)));
    assert!(map.is_empty());
    check(map.as_allocated());

    alloc.remaining.set(1);
    map.insert(1, 1)?;
    map.insert(2, 2)?;
    assert_eq!(map.len(), 2);

    Ok(())
}

#[test]
fn test_capacity_overflow() {
    let result = RbTreeMap::<u64, u64>::with_capacity_in(usize::MAX, Natural, Global);
    assert!(matches!(
        result,
        Err(crate::Error::CapacityOverflow { .. })
    ));
}

#[test]
fn test_with_capacity_does_not_reallocate() -> Result<(), Box<dyn Error>> {
    let alloc = CountingAllocator::default();
    let mut map = RbTreeMap::with_capacity_in(10, Natural, &alloc)?;
    assert_eq!(map.capacity(), 10);

    for i in 0..10 {
        map.insert(i, i)?;
    }
    assert_eq!(alloc.n_allocations(), 1);

    map.insert(10, 10)?;
    assert_eq!(alloc.n_allocations(), 2);
    assert_eq!(alloc.net_allocations(), 1);

    Ok(())
}

#[test]
fn test_freed_slots_are_reused() -> Result<(), Box<dyn Error>> {
    let alloc = CountingAllocator::default();
    let mut map = RbTreeMap::new_in(&alloc)?;
    for i in 0..16 {
        map.insert(i, i)?;
    }
    let capacity = map.capacity();
    let allocations = alloc.n_allocations();

    for i in (0..16).step_by(2) {
        map.remove(&i);
    }
    for i in 100..108 {
        map.insert(i, i)?;
    }
    check(map.as_allocated());
    assert_eq!(map.capacity(), capacity);
    assert_eq!(alloc.n_allocations(), allocations);

    map.clear();
    check(map.as_allocated());
    assert!(map.is_empty());
    assert_eq!(map.capacity(), capacity);
    for i in 0..16 {
        map.insert(i, i)?;
    }
    assert_eq!(alloc.n_allocations(), allocations);
    check(map.as_allocated());

    Ok(())
}

#[test]
fn test_index() -> Result<(), Box<dyn Error>> {
    let map = sample_in(Global)?;
    assert_eq!(map[&4], 40);
    Ok(())
}

#[test]
#[should_panic(expected = "no entry found for key")]
fn test_index_missing_panics() {
    let map: RbTreeMap<u32, u32> = [(1, 1)].into();
    let _missing: u32 = map[&2];
}

#[test]
fn test_debug() {
    let map: RbTreeMap<u32, &str> = [(2, "b"), (1, "a")].into();
    assert_eq!(format!("{map:?}"), r#"{1: "a", 2: "b"}"#);
    assert_eq!(format!("{:?}", map.iter()), r#"[(1, "a"), (2, "b")]"#);
}

#[cfg(feature = "std")]
#[test]
fn test_to_dot() -> Result<(), Box<dyn Error>> {
    let map = sample_in(Global)?;
    let dot = map.to_dot()?;
    assert!(dot.starts_with("digraph G {"));
    assert!(dot.contains("\"LOW\" ->"));
    assert!(dot.contains("\"HIGH\" ->"));
    assert_eq!(dot.matches("shape=record").count(), 7);
    Ok(())
}

#[test]
fn test_extend_and_collect() -> Result<(), Box<dyn Error>> {
    let mut map: RbTreeMap<u32, char> = [(1, 'a'), (1, 'z'), (2, 'b')].into_iter().collect();
    assert_equal(map.iter(), [(&1, &'a'), (&2, &'b')]);

    map.extend([(3, 'c'), (2, 'y')]);
    map.try_extend((4..6).map(|k| (k, 'x')))?;
    assert_equal(map.keys().copied(), 1..6);
    assert_eq!(map.get(&2), Some(&'b'));
    check(map.as_allocated());

    let d: RbTreeMap<u32, char> = RbTreeMap::default();
    assert!(d.is_empty());

    Ok(())
}

#[test]
fn test_ascending_then_descending_erase() -> Result<(), Box<dyn Error>> {
    let alloc = CountingAllocator::default();
    {
        let mut map = RbTreeMap::new_in(&alloc)?;
        for i in 0..512u32 {
            map.insert(i, i)?;
            check(map.as_allocated());
        }
        let raw = map.as_allocated().raw();
        assert!(height(raw, raw.root) <= 2 * 513usize.ilog2() as usize);

        for i in (0..512u32).rev().step_by(3) {
            assert_eq!(map.remove(&i), Some(i));
            check(map.as_allocated());
        }
        while let Some((k, _)) = map.pop_first() {
            assert!(!map.contains_key(&k));
            check(map.as_allocated());
        }
    }
    assert_eq!(alloc.net_allocations(), 0);
    assert_eq!(alloc.net_bytes_allocated(), 0);

    Ok(())
}

#[test]
fn test_strings() -> Result<(), Box<dyn Error>> {
    let alloc = CountingAllocator::default();
    let mut map = AllocatedRbTreeMap::<String, usize>::new_in(&alloc, Natural)?;

    let words = ["pear", "apple", "fig", "banana", "cherry", "apple"];
    unsafe {
        map.extend_in(&alloc, words.iter().enumerate().map(|(i, w)| (w.to_string(), i)))?;
    }
    check(&*map);

    assert_equal(
        map.keys().map(String::as_str),
        ["apple", "banana", "cherry", "fig", "pear"],
    );
    assert_eq!(map.get("apple"), Some(&1));
    assert_eq!(map.remove("fig"), Some(2));
    assert!(map.contains_key("pear"));

    let copy = unsafe { map.clone_in(&alloc)? };
    assert_eq!(*copy, *map);

    core::mem::drop(copy);
    core::mem::drop(map);
    assert_eq!(alloc.net_allocations(), 0);

    Ok(())
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, u16),
    Remove(u16),
    PopFirst,
    PopLast,
    EraseNth(usize),
    EraseRange(u16, u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..200u16, any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => (0..200u16).prop_map(Op::Remove),
        1 => Just(Op::PopFirst),
        1 => Just(Op::PopLast),
        2 => any::<usize>().prop_map(Op::EraseNth),
        1 => (0..200u16, 0..20u16).prop_map(|(lo, n)| Op::EraseRange(lo, lo + n)),
    ]
}

proptest! {
    #[test]
    fn test_against_btreemap(ops in prop::collection::vec(op_strategy(), 1..300)) {
        let alloc = CountingAllocator::default();
        {
            let mut map = RbTreeMap::new_in(&alloc)?;
            let mut model = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Insert(k, v) => {
                        let expected = !model.contains_key(&k);
                        model.entry(k).or_insert(v);
                        let (pos, inserted) = map.insert(k, v)?;
                        prop_assert_eq!(inserted, expected);
                        prop_assert_eq!(map.key_value_at(pos), model.get_key_value(&k));
                    }
                    Op::Remove(k) => {
                        prop_assert_eq!(map.remove(&k), model.remove(&k));
                    }
                    Op::PopFirst => {
                        prop_assert_eq!(map.pop_first(), model.pop_first());
                    }
                    Op::PopLast => {
                        prop_assert_eq!(map.pop_last(), model.pop_last());
                    }
                    Op::EraseNth(n) => {
                        if !model.is_empty() {
                            let n = n % model.len();
                            let mut pos = map.begin();
                            for _ in 0..n {
                                pos = map.next(pos);
                            }
                            let key = *model.keys().nth(n).unwrap();
                            let expected = model.remove_entry(&key);
                            prop_assert_eq!(map.erase(pos), expected);
                        }
                    }
                    Op::EraseRange(lo, hi) => {
                        let doomed: Vec<u16> = model.range(lo..hi).map(|(k, _)| *k).collect();
                        for k in &doomed {
                            model.remove(k);
                        }
                        let n = map.erase_range(map.lower_bound(&lo), map.lower_bound(&hi));
                        prop_assert_eq!(n, doomed.len());
                    }
                }
                check(map.as_allocated());
                assert_equal(map.iter(), model.iter());
            }

            let lo = model.keys().next().copied().unwrap_or(0);
            assert_equal(map.range(lo..), model.range(lo..));
            assert_equal(map.iter().rev(), model.iter().rev());
        }
        prop_assert_eq!(alloc.net_allocations(), 0);
        prop_assert_eq!(alloc.net_bytes_allocated(), 0);
    }
}

proptest! {
    #[test]
    fn test_string_keys(mut words in prop::collection::vec(".*", 1..100)) {
        let alloc = CountingAllocator::default();
        {
            let mut map = RbTreeMap::new_in(&alloc)?;
            for w in &words {
                map.insert(w.clone(), w.len())?;
            }
            check(map.as_allocated());

            words.sort();
            let words: Vec<_> = words.into_iter().unique().collect();
            prop_assert_eq!(map.len(), words.len());
            assert_equal(map.keys(), words.iter());

            for w in words.iter().step_by(2) {
                prop_assert_eq!(map.remove(w), Some(w.len()));
                check(map.as_allocated());
            }
        }
        prop_assert_eq!(alloc.net_allocations(), 0);
        prop_assert_eq!(alloc.net_bytes_allocated(), 0);
    }
}

proptest! {
    #[test]
    fn test_positions_survive_other_erasures(
        keys in prop::collection::btree_set(0..500u32, 2..80),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut map = RbTreeMap::new();
        for &k in &keys {
            map.insert(k, k)?;
        }
        let keys: Vec<u32> = keys.into_iter().collect();
        let kept = keys[pick.index(keys.len())];
        let pos = map.find(&kept);

        for &k in keys.iter().filter(|&&k| k != kept) {
            map.remove(&k);
            prop_assert_eq!(map.key_value_at(pos), Some((&kept, &kept)));
        }
        prop_assert_eq!(map.begin(), pos);
        prop_assert_eq!(map.rbegin(), pos);
        check(map.as_allocated());
    }
}
