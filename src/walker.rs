//! Directed traversal of the leaf octants a ray crosses in an octree.
//!
//! The walker is an explicit pull-only iterator: all traversal state lives
//! in its fields and advancing it costs one slab test per octant boundary.
//! Octants are yielded in the order the ray first enters them, each at most
//! once, with ties at shared faces and corners resolved by the closed-open
//! space convention and the slab test's axis ordering.

use glam::Vec3A;

use crate::geom::slab_hits;
use crate::octree::{NodeId, Octree, Slot};
use crate::ray::Ray;
use crate::space::octant_from_bits;

/// Location of a child slot within its parent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPos {
    /// The parent node.
    pub tree: NodeId,
    /// Octant index of the slot within `tree`.
    pub octant: u8,
}

/// One item of a walk: a visit to a child slot, or to the root itself when
/// the ray approaches the tree from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stop {
    /// The subtree entered at this stop. `None` for empty and leaf slots;
    /// callers that need payload-bearing nodes filter on it.
    pub node: Option<NodeId>,
    /// The visited slot; `None` when the visited node is the root itself.
    pub pos: Option<SlotPos>,
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    /// About to enter the root node from outside.
    Root,
    /// Visiting a child slot.
    Slot(SlotPos),
}

/// Iterator over the leaf octants crossed by a ray.
///
/// Created unseated; [`Walker::set_pos_and_dir`] places it on a ray and
/// resets all traversal state, so one walker can serve every bounce of a
/// traced ray. Dropping the walker cancels the walk.
#[derive(Debug)]
pub struct Walker<'t, T> {
    tree: &'t Octree<T>,
    pos: Vec3A,
    dir: Vec3A,
    include_empty: bool,
    cur: Option<Cursor>,
    /// Whether the current slot has already been offered to the caller.
    cur_returned: bool,
    /// Whether the current slot's subtree interior has been consumed.
    stepped_in: bool,
    /// The boundary crossing that led into the current slot, or the one
    /// about to be taken out of it: crossing point and the axis-aligned
    /// step toward the neighbor octant.
    next_pos: Option<(Vec3A, Vec3A)>,
    /// Set when stepping back out of a node: the stored crossing already
    /// lies on the parent slot's boundary, so the exit needs no
    /// recomputation.
    next_pos_is_ahead: bool,
    depth: u32,
    done: bool,
}

impl<'t, T> Walker<'t, T> {
    /// Create an unseated walker over `tree`. It yields nothing until
    /// seated with [`Walker::set_pos_and_dir`].
    pub fn new(tree: &'t Octree<T>) -> Self {
        Self {
            tree,
            pos: Vec3A::ZERO,
            dir: Vec3A::X,
            include_empty: false,
            cur: None,
            cur_returned: true,
            stepped_in: false,
            next_pos: None,
            next_pos_is_ahead: false,
            depth: 0,
            done: true,
        }
    }

    /// Also yield stops for empty child slots.
    pub fn including_empty(mut self) -> Self {
        self.include_empty = true;
        self
    }

    /// Seat the walker on a ray, discarding any walk in progress.
    ///
    /// `start` optionally names a node to begin the containing-node search
    /// at; when it does not contain `pos` the search falls back to the
    /// absolute root.
    ///
    /// # Panics
    ///
    /// Panics if `pos` or `dir` is non-finite, or if `dir` is zero: a walk
    /// without a direction has no well-defined next boundary.
    pub fn set_pos_and_dir(&mut self, pos: Vec3A, dir: Vec3A, start: Option<NodeId>) {
        assert!(
            pos.is_finite() && dir.is_finite(),
            "walker position and direction must be finite"
        );
        assert!(dir != Vec3A::ZERO, "walker direction must be non-zero");

        self.pos = pos;
        self.dir = dir;
        self.cur = None;
        self.cur_returned = false;
        self.stepped_in = false;
        self.next_pos = None;
        self.next_pos_is_ahead = false;
        self.depth = 0;
        self.done = false;

        let root = self.tree.root();
        let placed = match start {
            Some(hint) => self
                .tree
                .node_at_pos_from(hint, pos)
                .or_else(|| self.tree.node_at_pos(pos)),
            None => self.tree.node_at_pos(pos),
        };

        if let Some((node, octant)) = placed {
            self.cur = Some(Cursor::Slot(SlotPos { tree: node, octant }));
            self.depth = self.tree.level(node);
            return;
        }

        // Starting outside the tree: the first stop is the root itself,
        // entered at the forward slab hit of the root box.
        let ray = Ray::new(pos, dir);
        match slab_hits(&ray, &self.tree.cube(root).aabb()) {
            Some((entry, exit)) if entry.t >= 0.0 && entry.t <= exit.t => {
                self.cur = Some(Cursor::Root);
                // Inward normal: the step that carried the ray inside.
                self.next_pos = Some((ray.at(entry.t), -entry.normal()));
            }
            _ => self.done = true,
        }
    }

    /// Depth of the slot currently being visited, relative to the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

impl<T> Iterator for Walker<'_, T> {
    type Item = Stop;

    fn next(&mut self) -> Option<Stop> {
        loop {
            if self.done {
                return None;
            }
            let cur = match self.cur {
                Some(c) => c,
                None => {
                    self.done = true;
                    return None;
                }
            };

            // Offer the current slot once.
            if !self.cur_returned {
                self.cur_returned = true;
                match cur {
                    Cursor::Root => {
                        return Some(Stop {
                            node: Some(self.tree.root()),
                            pos: None,
                        });
                    }
                    Cursor::Slot(p) => match self.tree.child(p.tree, p.octant) {
                        Slot::Tree(c) if !self.tree.is_invalid(*c) => {
                            return Some(Stop {
                                node: Some(*c),
                                pos: Some(p),
                            });
                        }
                        // Invalidated subtrees are passed over entirely.
                        Slot::Tree(_) => {}
                        Slot::Leaf(_) => {
                            return Some(Stop {
                                node: None,
                                pos: Some(p),
                            });
                        }
                        Slot::Empty => {
                            if self.include_empty {
                                return Some(Stop {
                                    node: None,
                                    pos: Some(p),
                                });
                            }
                        }
                    },
                }
                continue;
            }

            // Descend into a subtree whose interior is not yet consumed.
            if !self.stepped_in {
                let target = match cur {
                    Cursor::Root => Some(self.tree.root()),
                    Cursor::Slot(p) => self.tree.child(p.tree, p.octant).as_tree(),
                };
                if let (Some(child), Some((entry, _))) = (target, self.next_pos) {
                    if !self.tree.is_invalid(child) {
                        let octant = self.tree.cube(child).octant_toward(entry);
                        self.cur = Some(Cursor::Slot(SlotPos { tree: child, octant }));
                        self.cur_returned = false;
                        self.stepped_in = false;
                        self.depth += 1;
                        continue;
                    }
                }
            }

            // Move sideways to the neighbor octant, or back out of the
            // parent when the neighbor would fall outside it.
            let p = match cur {
                Cursor::Slot(p) => p,
                // The root was entered but holds nothing to step through.
                Cursor::Root => {
                    self.done = true;
                    return None;
                }
            };

            let step = if self.next_pos_is_ahead {
                self.next_pos_is_ahead = false;
                match self.next_pos {
                    Some((_, step)) => step,
                    None => {
                        self.done = true;
                        return None;
                    }
                }
            } else {
                let cube = self.tree.cube(p.tree).child(p.octant);
                let ray = Ray::new(self.pos, self.dir);
                match slab_hits(&ray, &cube.aabb()) {
                    Some((_, exit)) => {
                        let step = exit.normal();
                        self.next_pos = Some((ray.at(exit.t), step));
                        step
                    }
                    None => {
                        // The current octant no longer intersects the ray;
                        // only reachable through float breakdown.
                        self.done = true;
                        return None;
                    }
                }
            };

            let bits = [
                (p.octant & 1) as i32 + step.x as i32,
                ((p.octant >> 1) & 1) as i32 + step.y as i32,
                ((p.octant >> 2) & 1) as i32 + step.z as i32,
            ];
            match octant_from_bits(bits) {
                Some(neighbor) => {
                    self.cur = Some(Cursor::Slot(SlotPos {
                        tree: p.tree,
                        octant: neighbor,
                    }));
                    self.cur_returned = false;
                    self.stepped_in = false;
                }
                None => match self.tree.parent(p.tree) {
                    Some((parent, octant)) => {
                        self.cur = Some(Cursor::Slot(SlotPos {
                            tree: parent,
                            octant,
                        }));
                        // The parent slot was already offered on the way
                        // in, and its interior is now consumed.
                        self.cur_returned = true;
                        self.stepped_in = true;
                        self.next_pos_is_ahead = true;
                        self.depth = self.depth.saturating_sub(1);
                    }
                    None => {
                        self.done = true;
                        return None;
                    }
                },
            }
        }
    }
}

impl<T> std::iter::FusedIterator for Walker<'_, T> {}
