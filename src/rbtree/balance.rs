//! Rotations and the red-black repair loops run after insertion and deletion.

use super::node::{Color, Dir, NodeId};
use super::raw::RawTree;

impl<K, V> RawTree<K, V> {
    /// Single rotation at `x` in direction `dir`.
    ///
    /// `rotate(x, Dir::Left)` lifts `x`'s right child into `x`'s place and
    /// makes `x` its left child. The in-order sequence is preserved and no
    /// payload moves.
    pub(super) fn rotate(&mut self, x: NodeId, dir: Dir) {
        let opp = dir.opposite();
        let y = self
            .child(x, opp)
            .expect("rotation needs a child on the rising side");

        let inner = self.child(y, dir);
        self.links_mut(x).set_child(opp, inner);
        self.set_parent(inner, Some(x));

        let xp = self.parent(x);
        self.links_mut(y).parent = xp;
        self.replace_child(xp, x, Some(y));

        self.links_mut(y).set_child(dir, Some(x));
        self.links_mut(x).parent = Some(y);
    }

    #[inline]
    pub(super) fn rotate_left(&mut self, x: NodeId) {
        self.rotate(x, Dir::Left);
    }

    #[inline]
    pub(super) fn rotate_right(&mut self, x: NodeId) {
        self.rotate(x, Dir::Right);
    }

    /// Restores the red-black rules after the red node `k` was linked in.
    pub(super) fn insert_fixup(&mut self, mut k: NodeId) {
        while let Some(p) = self.parent(k) {
            if !self.is_red(Some(p)) {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let (Some(g), Some(p_side)) = (self.parent(p), self.side_of(p)) else {
                break;
            };
            let uncle = self.sibling(p);

            if self.is_red(uncle) {
                self.set_color(p, Color::Black);
                if let Some(u) = uncle {
                    self.set_color(u, Color::Black);
                }
                self.set_color(g, Color::Red);
                k = g;
            } else {
                if self.child(p, p_side.opposite()) == Some(k) {
                    // zig-zag: straighten the line first
                    k = p;
                    self.rotate(k, p_side);
                }
                let p = self.parent(k).expect("red node has a parent");
                let g = self.parent(p).expect("red parent has a parent");
                self.set_color(p, Color::Black);
                self.set_color(g, Color::Red);
                self.rotate(g, p_side.opposite());
            }

            if Some(k) == self.root {
                break;
            }
        }

        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    /// Repairs a black-height deficit on the `side` child of `parent`.
    ///
    /// The deficient subtree may be empty, which is why it is named by its
    /// parent and side rather than by node.
    pub(super) fn erase_fixup(&mut self, mut parent: NodeId, mut side: Dir) {
        loop {
            let Some(sibling) = self.child(parent, side.opposite()) else {
                // Nothing to borrow from here: push the deficit up a level.
                match self.side_of(parent) {
                    Some(up) => {
                        side = up;
                        parent = self.parent(parent).expect("non-root has a parent");
                        continue;
                    }
                    None => return,
                }
            };

            if self.is_red(Some(sibling)) {
                self.set_color(parent, Color::Red);
                self.set_color(sibling, Color::Black);
                self.rotate(parent, side);
                continue;
            }

            if self.has_red_child(sibling) {
                let parent_color = self.color(Some(parent));
                let sl = self.child(sibling, Dir::Left);
                let sr = self.child(sibling, Dir::Right);
                let red_left = sl.filter(|&n| self.is_red(Some(n)));
                let sibling_on_left = side == Dir::Right;

                match (red_left, sibling_on_left) {
                    (Some(sl), true) => {
                        // left-left
                        self.set_color(sl, Color::Black);
                        self.set_color(sibling, parent_color);
                        self.rotate_right(parent);
                    }
                    (Some(sl), false) => {
                        // right-left
                        self.set_color(sl, parent_color);
                        self.rotate_right(sibling);
                        self.rotate_left(parent);
                    }
                    (None, true) => {
                        // left-right
                        let sr = sr.expect("sibling has a red child");
                        self.set_color(sr, parent_color);
                        self.rotate_left(sibling);
                        self.rotate_right(parent);
                    }
                    (None, false) => {
                        // right-right
                        let sr = sr.expect("sibling has a red child");
                        self.set_color(sr, Color::Black);
                        self.set_color(sibling, parent_color);
                        self.rotate_left(parent);
                    }
                }
                self.set_color(parent, Color::Black);
                return;
            }

            self.set_color(sibling, Color::Red);
            if self.is_red(Some(parent)) {
                self.set_color(parent, Color::Black);
                return;
            }
            match self.side_of(parent) {
                Some(up) => {
                    side = up;
                    parent = self.parent(parent).expect("non-root has a parent");
                }
                None => return,
            }
        }
    }
}
