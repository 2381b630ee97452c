//! Positions in a map and in-order navigation between them.

use super::node::{Dir, Links, NodeId, HIGH, LOW};

/// A position in a map: an element, the end sentinel ([`end`]) or the
/// before-the-first sentinel ([`rend`]).
///
/// A position does not borrow the map. It stays valid while other elements
/// are inserted or erased; once the element it names is erased, reads through
/// it return `None` and navigation from it is meaningless. Positions are only
/// meaningful for the map that produced them.
///
/// [`end`]: super::AllocatedRbTreeMap::end
/// [`rend`]: super::AllocatedRbTreeMap::rend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub(super) id: NodeId,
    pub(super) generation: u32,
}

impl Position {
    pub(super) const END: Position = Position {
        id: HIGH,
        generation: 0,
    };

    pub(super) const REND: Position = Position {
        id: LOW,
        generation: 0,
    };

    /// Returns `true` for the past-the-end position.
    pub fn is_end(self) -> bool {
        self.id == HIGH
    }

    /// Returns `true` for the before-the-first position.
    pub fn is_rend(self) -> bool {
        self.id == LOW
    }

    /// Returns `true` if this position names an element rather than a sentinel.
    pub fn is_element(self) -> bool {
        !self.is_end() && !self.is_rend()
    }
}

/// Follows `dir` children from `id` as far as they go.
#[inline]
pub(super) fn extreme(links: impl Fn(NodeId) -> Links, mut id: NodeId, dir: Dir) -> NodeId {
    while let Some(child) = links(id).child(dir) {
        id = child;
    }
    id
}

/// In-order neighbour of `id` in direction `dir` (`Right` = successor).
///
/// Stepping past either extreme lands on the sentinel of that side; stepping
/// from a sentinel away from the tree stays on it.
pub(super) fn step(links: impl Fn(NodeId) -> Links, id: NodeId, dir: Dir) -> NodeId {
    let (toward, away) = match dir {
        Dir::Right => (HIGH, LOW),
        Dir::Left => (LOW, HIGH),
    };
    if id == toward {
        return toward;
    }
    if id == away {
        // The `away` sentinel caches the extreme element on its side.
        return links(away).parent.unwrap_or(toward);
    }

    let l = links(id);
    if let Some(child) = l.child(dir) {
        return extreme(&links, child, dir.opposite());
    }

    let mut cur = id;
    let mut up = l.parent;
    while let Some(p) = up {
        let pl = links(p);
        if pl.child(dir.opposite()) == Some(cur) {
            return p;
        }
        cur = p;
        up = pl.parent;
    }
    toward
}

#[inline]
pub(super) fn successor(links: impl Fn(NodeId) -> Links, id: NodeId) -> NodeId {
    step(links, id, Dir::Right)
}

#[inline]
pub(super) fn predecessor(links: impl Fn(NodeId) -> Links, id: NodeId) -> NodeId {
    step(links, id, Dir::Left)
}
