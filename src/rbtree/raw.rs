//! Comparator-free structure of the tree: linking, unlinking and the
//! sentinel frame. Ordering decisions are made by the caller.

use allocated::DropIn;
use allocator_api2::alloc::Allocator;

use super::arena::Arena;
use super::node::{Color, Dir, Links, Node, NodeId, HIGH, LOW};
use super::position;
use crate::error::Result;

pub struct RawTree<K, V> {
    pub(super) arena: Arena<K, V>,
    pub(super) root: Option<NodeId>,
    pub(super) len: usize,
}

impl<K, V> RawTree<K, V> {
    /// # Errors
    ///
    /// Will return `Err` if the allocation fails.
    pub fn with_capacity_in<A: Allocator>(alloc: &A, n_nodes: usize) -> Result<Self> {
        Ok(Self {
            arena: Arena::with_capacity_in(alloc, n_nodes)?,
            root: None,
            len: 0,
        })
    }

    #[inline]
    pub fn links(&self, id: NodeId) -> Links {
        self.arena.links(id)
    }

    #[inline]
    pub(super) fn links_mut(&mut self, id: NodeId) -> &mut Links {
        &mut self.arena.get_mut(id).links
    }

    #[inline]
    pub(super) fn child(&self, id: NodeId, dir: Dir) -> Option<NodeId> {
        self.links(id).child(dir)
    }

    #[inline]
    pub(super) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.links(id).parent
    }

    /// Absent children count as black leaves.
    #[inline]
    pub(super) fn color(&self, id: Option<NodeId>) -> Color {
        id.map_or(Color::Black, |id| self.arena.get(id).color)
    }

    #[inline]
    pub(super) fn is_red(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|id| self.arena.get(id).is_red())
    }

    #[inline]
    pub(super) fn set_color(&mut self, id: NodeId, color: Color) {
        self.arena.get_mut(id).color = color;
    }

    /// Which child of its parent `id` is, or `None` for the root.
    pub(super) fn side_of(&self, id: NodeId) -> Option<Dir> {
        let parent = self.parent(id)?;
        if self.child(parent, Dir::Left) == Some(id) {
            Some(Dir::Left)
        } else {
            Some(Dir::Right)
        }
    }

    /// The other child of `id`'s parent.
    pub fn sibling(&self, id: NodeId) -> Option<NodeId> {
        let side = self.side_of(id)?;
        self.child(self.parent(id)?, side.opposite())
    }

    pub fn has_red_child(&self, id: NodeId) -> bool {
        let links = self.links(id);
        self.is_red(links.left) || self.is_red(links.right)
    }

    /// Points the slot that holds `old` (a child link of `parent`, or the
    /// root) at `new`. The back-reference of `new` is left to the caller.
    pub(super) fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let links = self.links_mut(p);
                if links.left == Some(old) {
                    links.left = new;
                } else {
                    debug_assert_eq!(links.right, Some(old));
                    links.right = new;
                }
            }
        }
    }

    #[inline]
    pub(super) fn set_parent(&mut self, id: Option<NodeId>, parent: Option<NodeId>) {
        if let Some(id) = id {
            self.links_mut(id).parent = parent;
        }
    }

    /// The smallest data node, cached by the low sentinel.
    #[inline]
    pub fn first(&self) -> Option<NodeId> {
        self.links(LOW).parent
    }

    /// The largest data node, cached by the high sentinel.
    #[inline]
    pub fn last(&self) -> Option<NodeId> {
        self.links(HIGH).parent
    }

    #[inline]
    pub fn successor(&self, id: NodeId) -> NodeId {
        position::successor(|id| self.links(id), id)
    }

    #[inline]
    pub fn predecessor(&self, id: NodeId) -> NodeId {
        position::predecessor(|id| self.links(id), id)
    }

    pub fn key_value(&self, id: NodeId) -> Option<(&K, &V)> {
        self.arena.get(id).payload.as_ref().map(|(k, v)| (k, v))
    }

    pub fn key_value_mut(&mut self, id: NodeId) -> Option<(&K, &mut V)> {
        self.arena
            .get_mut(id)
            .payload
            .as_mut()
            .map(|(k, v)| (&*k, v))
    }

    /// Stores a new red node as the `dir` child of `parent` (or as the root
    /// when `parent` is `None`) and rebalances.
    ///
    /// A slot must have been reserved beforehand; nothing here allocates.
    pub(super) fn attach(&mut self, parent: Option<NodeId>, dir: Dir, key: K, value: V) -> NodeId {
        let id = self.arena.insert(Node::data(key, value));
        self.links_mut(id).parent = parent;

        let (becomes_first, becomes_last) = match parent {
            None => {
                debug_assert!(self.root.is_none());
                self.root = Some(id);
                (true, true)
            }
            Some(p) => {
                debug_assert!(self.child(p, dir).is_none());
                self.links_mut(p).set_child(dir, Some(id));
                (
                    dir == Dir::Left && self.first() == Some(p),
                    dir == Dir::Right && self.last() == Some(p),
                )
            }
        };
        if becomes_first {
            self.links_mut(LOW).parent = Some(id);
        }
        if becomes_last {
            self.links_mut(HIGH).parent = Some(id);
        }

        self.len += 1;
        if self.len <= 2 {
            if let Some(root) = self.root {
                self.set_color(root, Color::Black);
            }
        } else {
            self.insert_fixup(id);
        }
        id
    }

    /// Unlinks the data node `z`, rebalances, and returns its payload.
    pub(super) fn detach(&mut self, z: NodeId) -> Option<(K, V)> {
        debug_assert!(!self.arena.get(z).is_sentinel());

        if self.len == 1 {
            let node = self.arena.remove(z);
            self.clear();
            return node.payload;
        }

        if self.first() == Some(z) {
            let next = self.successor(z);
            self.links_mut(LOW).parent = Some(next);
        }
        if self.last() == Some(z) {
            let prev = self.predecessor(z);
            self.links_mut(HIGH).parent = Some(prev);
        }

        let links = self.links(z);
        if let (Some(_), Some(right)) = (links.left, links.right) {
            let y = position::extreme(|id| self.links(id), right, Dir::Left);
            self.swap_with_successor(z, y);
        }
        self.unlink_single(z);

        let node = self.arena.remove(z);
        self.len -= 1;
        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
        node.payload
    }

    /// Exchanges the structural places (links and colours) of `z` and its
    /// in-order successor `y`, the leftmost node of `z`'s right subtree.
    ///
    /// Afterwards `z` has no left child, and `y` keeps its identity: positions
    /// naming `y` stay valid.
    fn swap_with_successor(&mut self, z: NodeId, y: NodeId) {
        let zl = self.links(z);
        let yl = self.links(y);
        debug_assert!(yl.left.is_none());

        self.replace_child(zl.parent, z, Some(y));
        self.links_mut(y).parent = zl.parent;
        self.links_mut(y).left = zl.left;
        self.set_parent(zl.left, Some(y));

        if zl.right == Some(y) {
            self.links_mut(y).right = Some(z);
            self.links_mut(z).parent = Some(y);
        } else {
            self.links_mut(y).right = zl.right;
            self.set_parent(zl.right, Some(y));
            // `y` was the left child of its parent, being leftmost in a subtree
            // it doesn't root.
            let yp = yl.parent;
            if let Some(yp) = yp {
                self.links_mut(yp).left = Some(z);
            }
            self.links_mut(z).parent = yp;
        }

        self.links_mut(z).left = None;
        self.links_mut(z).right = yl.right;
        self.set_parent(yl.right, Some(z));

        let zc = self.arena.get(z).color;
        let yc = self.arena.get(y).color;
        self.set_color(z, yc);
        self.set_color(y, zc);
    }

    /// Removes `z`, which has at most one child, from the tree structure.
    fn unlink_single(&mut self, z: NodeId) {
        let links = self.links(z);
        debug_assert!(links.left.is_none() || links.right.is_none());
        let target = links.left.or(links.right);
        let parent = links.parent;
        let side = self.side_of(z);

        self.replace_child(parent, z, target);
        self.set_parent(target, parent);

        if self.arena.get(z).color == Color::Black {
            match (target, parent, side) {
                (Some(t), _, _) if self.is_red(Some(t)) => self.set_color(t, Color::Black),
                (_, Some(parent), Some(side)) => self.erase_fixup(parent, side),
                // `z` was the root; its replacement (if any) is black.
                _ => {}
            }
        }
        self.links_mut(z).parent = None;
        self.links_mut(z).right = None;
        self.links_mut(z).left = None;
    }

    /// Drops every data node and reinstalls the empty sentinel frame.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.len = 0;
    }

    /// Number of data nodes in the subtree rooted at `id`, counted without
    /// recursion.
    #[cfg(test)]
    pub fn count_from(&self, id: Option<NodeId>) -> usize {
        let mut n = 0;
        let mut stack = alloc::vec::Vec::new();
        stack.extend(id);
        while let Some(id) = stack.pop() {
            n += 1;
            let links = self.links(id);
            stack.extend(links.left);
            stack.extend(links.right);
        }
        n
    }
}

impl<K, V> DropIn for RawTree<K, V> {
    /// # Safety
    ///
    /// `alloc` must be the allocator used to allocate this object.
    unsafe fn drop_in<A: Allocator>(&mut self, alloc: &A) {
        // SAFETY: requirements match function requirements
        unsafe { self.arena.drop_in(alloc) };
        self.root = None;
        self.len = 0;
    }
}
