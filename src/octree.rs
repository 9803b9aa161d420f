//! Arena-owned octree with parent back-links and tagged child slots.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]; the
//! tree owns every node it ever created, and `parent` is a non-owning
//! back-index. This makes outside growth (wrapping the current root in a
//! new, twice-as-large parent) a matter of re-seating the arena's
//! designated root. Removed subtrees are never freed, only marked
//! invalidated; traversals skip them.

use std::array;

use glam::Vec3A;
use thiserror::Error;

use crate::space::Cube;

/// Handle to a node inside an [`Octree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// Content of one of a node's eight child slots.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    /// Nothing is stored at this octant.
    Empty,
    /// The octant is subdivided further.
    Tree(NodeId),
    /// The octant holds a bare payload without further subdivision.
    Leaf(T),
}

impl<T> Slot<T> {
    /// The subtree id, if this slot holds one.
    pub fn as_tree(&self) -> Option<NodeId> {
        match self {
            Slot::Tree(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether the slot is [`Slot::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }
}

/// Structural errors raised by child-slot operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OctreeError {
    /// A subtree was requested at a slot that is already occupied.
    #[error("child slot {octant} of {node:?} is already occupied")]
    SlotOccupied {
        /// Parent node of the contested slot.
        node: NodeId,
        /// Octant index of the contested slot.
        octant: u8,
    },
    /// A slot was expected to hold a subtree but does not.
    #[error("child slot {octant} of {node:?} does not hold a subtree")]
    NotASubtree {
        /// Parent node of the offending slot.
        node: NodeId,
        /// Octant index of the offending slot.
        octant: u8,
    },
}

#[derive(Debug)]
struct Node<T> {
    cube: Cube,
    parent: Option<(NodeId, u8)>,
    children: [Slot<T>; 8],
    value: T,
    invalid: bool,
}

/// A space-partitioned octree carrying a payload of type `T` on every node.
#[derive(Debug)]
pub struct Octree<T> {
    nodes: Vec<Node<T>>,
    root: NodeId,
}

impl<T> Octree<T> {
    /// Create a tree whose root covers `cube` and carries `value`.
    pub fn new(cube: Cube, value: T) -> Self {
        Self {
            nodes: vec![Node {
                cube,
                parent: None,
                children: array::from_fn(|_| Slot::Empty),
                value,
                invalid: false,
            }],
            root: NodeId(0),
        }
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id.0 as usize]
    }

    /// The current absolute root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Geometric dimension of a node.
    pub fn cube(&self, id: NodeId) -> Cube {
        self.node(id).cube
    }

    /// Payload of a node.
    pub fn value(&self, id: NodeId) -> &T {
        &self.node(id).value
    }

    /// Mutable payload of a node.
    pub fn value_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.node_mut(id).value
    }

    /// The node's parent and its octant within it; `None` for a root.
    pub fn parent(&self, id: NodeId) -> Option<(NodeId, u8)> {
        self.node(id).parent
    }

    /// The slot content at `octant`.
    ///
    /// # Panics
    ///
    /// Panics if `octant >= 8`.
    pub fn child(&self, id: NodeId, octant: u8) -> &Slot<T> {
        &self.node(id).children[usize::from(octant)]
    }

    /// Replace the slot at `octant`, returning the previous content.
    ///
    /// A subtree that gets displaced is detached from its parent and
    /// invalidated recursively; its nodes remain in the arena so an
    /// in-flight traversal can still observe (and skip) them.
    pub fn set_child(&mut self, id: NodeId, octant: u8, slot: Slot<T>) -> Slot<T> {
        if let Slot::Tree(new) = &slot {
            self.node_mut(*new).parent = Some((id, octant));
        }
        let old = std::mem::replace(&mut self.node_mut(id).children[usize::from(octant)], slot);
        if let Slot::Tree(old_id) = &old {
            self.node_mut(*old_id).parent = None;
            self.invalidate(*old_id, true);
        }
        old
    }

    /// The subtree at `octant`, or an error when the slot holds anything
    /// else.
    pub fn subtree(&self, id: NodeId, octant: u8) -> Result<NodeId, OctreeError> {
        self.child(id, octant)
            .as_tree()
            .ok_or(OctreeError::NotASubtree { node: id, octant })
    }

    /// Whether the node has been scheduled for removal.
    pub fn is_invalid(&self, id: NodeId) -> bool {
        self.node(id).invalid
    }

    /// Mark a node (and, if `recursive`, its whole subtree) invalidated.
    pub fn invalidate(&mut self, id: NodeId, recursive: bool) {
        self.node_mut(id).invalid = true;
        if recursive {
            for octant in 0..8 {
                if let Some(child) = self.child(id, octant).as_tree() {
                    self.invalidate(child, true);
                }
            }
        }
    }

    /// Walk the parent chain to the owning root. A node whose subtree was
    /// detached is its own root.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some((parent, _)) = self.node(cur).parent {
            cur = parent;
        }
        cur
    }

    /// Depth of the node below its owning root (a root is level 0).
    pub fn level(&self, id: NodeId) -> u32 {
        let mut level = 0;
        let mut cur = id;
        while let Some((parent, _)) = self.node(cur).parent {
            level += 1;
            cur = parent;
        }
        level
    }

    /// Depth of the node below `ancestor`, or `None` when `ancestor` is
    /// not on the node's parent chain.
    pub fn relative_level(&self, id: NodeId, ancestor: NodeId) -> Option<u32> {
        let mut level = 0;
        let mut cur = id;
        loop {
            if cur == ancestor {
                return Some(level);
            }
            let (parent, _) = self.node(cur).parent?;
            level += 1;
            cur = parent;
        }
    }

    /// Deepest node containing `p`, with the octant of `p` inside it.
    ///
    /// Descends from the absolute root while the selected octant holds a
    /// live subtree. Returns `None` when `p` is outside the root under the
    /// closed-open convention.
    pub fn node_at_pos(&self, p: Vec3A) -> Option<(NodeId, u8)> {
        self.node_at_pos_from(self.root, p)
    }

    /// [`Octree::node_at_pos`] starting the descent at `start` instead of
    /// the absolute root.
    pub fn node_at_pos_from(&self, start: NodeId, p: Vec3A) -> Option<(NodeId, u8)> {
        let mut id = start;
        loop {
            let node = self.node(id);
            let octant = node.cube.octant_of(p)?;
            match node.children[usize::from(octant)] {
                Slot::Tree(child) if !self.node(child).invalid => id = child,
                _ => return Some((id, octant)),
            }
        }
    }

    /// Number of nodes ever allocated, including invalidated ones.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl<T: Default> Octree<T> {
    /// Subdivide the slot at `octant` into a fresh subtree with the
    /// canonical child dimension and a default payload.
    ///
    /// Errors with [`OctreeError::SlotOccupied`] when the slot is not
    /// empty; use [`Octree::set_child`] to replace deliberately.
    pub fn new_subtree(&mut self, id: NodeId, octant: u8) -> Result<NodeId, OctreeError> {
        if !self.child(id, octant).is_empty() {
            return Err(OctreeError::SlotOccupied { node: id, octant });
        }
        let cube = self.node(id).cube.child(octant);
        let child = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            cube,
            parent: Some((id, octant)),
            children: array::from_fn(|_| Slot::Empty),
            value: T::default(),
            invalid: false,
        });
        self.node_mut(id).children[usize::from(octant)] = Slot::Tree(child);
        Ok(child)
    }

    /// Outside growth: wrap the absolute root in a new parent of twice the
    /// size, positioned so the box moves toward `p`, and make it the new
    /// absolute root. Returns the new root's id.
    ///
    /// On each axis the new parent extends downward exactly when `p` lies
    /// below the current root's origin; the old root then occupies the
    /// positive half of that axis.
    pub fn grow_root_toward(&mut self, p: Vec3A) -> NodeId {
        let old_root = self.root;
        let cube = self.node(old_root).cube;
        let ratio = (p - cube.pos) / cube.size;

        let mut octant = 0u8;
        let mut shift = Vec3A::ZERO;
        for a in 0..3 {
            if (ratio[a].floor() as i32).clamp(-1, 0) == -1 {
                shift[a] = -cube.size;
                octant |= 1 << a;
            }
        }

        let new_root = NodeId(self.nodes.len() as u32);
        let mut children: [Slot<T>; 8] = array::from_fn(|_| Slot::Empty);
        children[usize::from(octant)] = Slot::Tree(old_root);
        self.nodes.push(Node {
            cube: Cube::new(cube.pos + shift, cube.size * 2.0),
            parent: None,
            children,
            value: T::default(),
            invalid: false,
        });
        self.node_mut(old_root).parent = Some((new_root, octant));
        self.root = new_root;
        new_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tree() -> Octree<u32> {
        Octree::new(Cube::new(Vec3A::ZERO, 1.0), 0)
    }

    #[test]
    fn subtrees_carry_canonical_dimensions() {
        let mut tree = unit_tree();
        let root = tree.root();
        let s3 = tree.new_subtree(root, 3).unwrap();
        assert_eq!(tree.cube(s3), Cube::new(Vec3A::new(0.5, 0.5, 0.0), 0.5));
        let s35 = tree.new_subtree(s3, 5).unwrap();
        assert_eq!(tree.cube(s35), Cube::new(Vec3A::new(0.75, 0.5, 0.25), 0.25));
        assert_eq!(tree.level(s35), 2);
        assert_eq!(tree.relative_level(s35, s3), Some(1));
        assert_eq!(tree.relative_level(s3, s35), None);
        assert_eq!(tree.root_of(s35), root);
    }

    #[test]
    fn occupied_slot_is_an_error() {
        let mut tree = unit_tree();
        let root = tree.root();
        tree.new_subtree(root, 0).unwrap();
        assert_eq!(
            tree.new_subtree(root, 0),
            Err(OctreeError::SlotOccupied {
                node: root,
                octant: 0
            })
        );
    }

    #[test]
    fn subtree_accessor_rejects_non_subtrees() {
        let mut tree = unit_tree();
        let root = tree.root();
        assert_eq!(
            tree.subtree(root, 2),
            Err(OctreeError::NotASubtree {
                node: root,
                octant: 2
            })
        );
        tree.set_child(root, 2, Slot::Leaf(7));
        assert!(tree.subtree(root, 2).is_err());
    }

    #[test]
    fn node_at_pos_descends_to_the_deepest_subtree() {
        let mut tree = unit_tree();
        let root = tree.root();
        let s3 = tree.new_subtree(root, 3).unwrap();
        let s35 = tree.new_subtree(s3, 5).unwrap();
        assert_eq!(
            tree.node_at_pos(Vec3A::new(0.75, 0.5, 0.25)),
            Some((s35, 0))
        );
        // Outside the root under the closed-open convention.
        assert_eq!(tree.node_at_pos(Vec3A::new(1.0, 0.5, 0.5)), None);
        assert_eq!(tree.node_at_pos(Vec3A::new(0.5, -0.1, 0.5)), None);
    }

    #[test]
    fn node_at_pos_is_stable_under_unrelated_growth() {
        let mut tree = unit_tree();
        let root = tree.root();
        let s3 = tree.new_subtree(root, 3).unwrap();
        let s35 = tree.new_subtree(s3, 5).unwrap();
        let p = Vec3A::new(0.75, 0.5, 0.25);
        let before = tree.node_at_pos(p);
        tree.new_subtree(root, 6).unwrap();
        tree.new_subtree(s3, 0).unwrap();
        assert_eq!(tree.node_at_pos(p), before);
        assert_eq!(before, Some((s35, 0)));
    }

    #[test]
    fn replacing_a_subtree_invalidates_and_detaches_it() {
        let mut tree = unit_tree();
        let root = tree.root();
        let s0 = tree.new_subtree(root, 0).unwrap();
        let s00 = tree.new_subtree(s0, 0).unwrap();
        let old = tree.set_child(root, 0, Slot::Leaf(9));
        assert_eq!(old, Slot::Tree(s0));
        assert!(tree.is_invalid(s0));
        assert!(tree.is_invalid(s00));
        assert_eq!(tree.root_of(s0), s0);
        // node_at_pos no longer descends into the displaced subtree.
        assert_eq!(tree.node_at_pos(Vec3A::splat(0.1)), Some((root, 0)));
    }

    #[test]
    fn growing_upward_keeps_the_origin() {
        let mut tree = unit_tree();
        let old_root = tree.root();
        let new_root = tree.grow_root_toward(Vec3A::new(1.5, 0.5, 0.5));
        assert_eq!(tree.cube(new_root), Cube::new(Vec3A::ZERO, 2.0));
        assert_eq!(tree.child(new_root, 0).as_tree(), Some(old_root));
        assert_eq!(tree.parent(old_root), Some((new_root, 0)));
        assert_eq!(tree.root(), new_root);
    }

    #[test]
    fn growing_downward_shifts_the_origin() {
        let mut tree = unit_tree();
        let old_root = tree.root();
        let new_root = tree.grow_root_toward(Vec3A::new(-0.2, 0.5, 0.5));
        assert_eq!(tree.cube(new_root), Cube::new(Vec3A::new(-1.0, 0.0, 0.0), 2.0));
        // The old root sits in the positive-x half of the new parent.
        assert_eq!(tree.child(new_root, 1).as_tree(), Some(old_root));
        assert_eq!(tree.root_of(old_root), new_root);
    }
}
