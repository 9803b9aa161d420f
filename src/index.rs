//! Entity index: octree placement of scene entities.
//!
//! Every octree node carries a set of entity ids; an entity belongs to the
//! set of the deepest node whose sub-box wholly contains its bounding box.
//! Insertion grows the tree both ways to honor that invariant: outward by
//! wrapping the root while the box escapes it, inward by subdividing while
//! a single child still contains the box.

use glam::Vec3A;
use thiserror::Error;

use crate::entity::Entity;
use crate::material::Substance;
use crate::octree::{NodeId, Octree};
use crate::space::{Aabb, Cube};

/// Handle to an entity stored in a [`SceneIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(u32);

/// The entities attached to one octree node.
pub type EntitySet = Vec<EntityId>;

/// Depth budgets for entity insertion.
#[derive(Debug, Clone, Copy)]
pub struct GrowthBudget {
    /// Deepest node level subdivision may reach below the absolute root.
    pub max_in_depth: u32,
    /// Most outside-growth steps a single insertion may take.
    pub max_out_depth: u32,
}

impl Default for GrowthBudget {
    fn default() -> Self {
        Self {
            max_in_depth: 10,
            max_out_depth: 10,
        }
    }
}

/// An entity's bounding box still escaped the root after the outward
/// growth budget was spent. The caller may retry with a larger budget
/// against the returned root, or reject the entity.
#[derive(Debug, Error)]
#[error("entity bounds escape the scene root after {steps} outward growth steps")]
pub struct RootEscapeError {
    /// The absolute root as of the failed insertion.
    pub abs_root: NodeId,
    /// Outward growth steps actually taken.
    pub steps: u32,
}

/// Spatial index of the scene's entities.
pub struct SceneIndex {
    tree: Octree<EntitySet>,
    entities: Vec<Box<dyn Entity>>,
}

impl SceneIndex {
    /// An empty index whose root covers `dim`.
    pub fn new(dim: Cube) -> Self {
        Self {
            tree: Octree::new(dim, EntitySet::new()),
            entities: Vec::new(),
        }
    }

    /// The underlying octree.
    pub fn tree(&self) -> &Octree<EntitySet> {
        &self.tree
    }

    /// Number of indexed entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The entity behind a handle.
    pub fn entity(&self, id: EntityId) -> &dyn Entity {
        self.entities[id.0 as usize].as_ref()
    }

    /// The entities attached to `node`, with their handles.
    pub fn entities_at(&self, node: NodeId) -> impl Iterator<Item = (EntityId, &dyn Entity)> {
        self.tree
            .value(node)
            .iter()
            .map(move |&id| (id, self.entity(id)))
    }

    /// Deepest existing node whose sub-box wholly contains `aabb`, found
    /// by climbing from the node containing the box's origin corner.
    /// `None` when the box escapes the root.
    pub fn covering_node(&self, aabb: &Aabb) -> Option<NodeId> {
        let (mut node, _) = self.tree.node_at_pos(aabb.min())?;
        loop {
            if self.tree.cube(node).contains_aabb(aabb) {
                return Some(node);
            }
            node = self.tree.parent(node)?.0;
        }
    }

    /// Index an entity, growing the tree as needed, and return the node
    /// it now belongs to.
    pub fn add_entity(
        &mut self,
        entity: Box<dyn Entity>,
        budget: GrowthBudget,
    ) -> Result<NodeId, RootEscapeError> {
        let aabb = entity.aabb();
        let pos = entity.pos();

        // Outside growth: wrap the root toward the entity until the box
        // fits somewhere.
        let mut steps = 0;
        let covering = loop {
            if let Some(node) = self.covering_node(&aabb) {
                break node;
            }
            if steps >= budget.max_out_depth {
                return Err(RootEscapeError {
                    abs_root: self.tree.root(),
                    steps,
                });
            }
            self.tree.grow_root_toward(pos);
            steps += 1;
        };

        // Inside growth: subdivide while one child still contains the
        // whole box and the depth budget allows.
        let mut node = covering;
        while self.tree.level(node) < budget.max_in_depth {
            let cube = self.tree.cube(node);
            let octant = match cube.octant_of(aabb.min()) {
                Some(octant) if cube.child(octant).contains_aabb(&aabb) => octant,
                _ => break,
            };
            node = if let Some(child) = self.tree.child(node, octant).as_tree() {
                if self.tree.is_invalid(child) {
                    break;
                }
                child
            } else if self.tree.child(node, octant).is_empty() {
                match self.tree.new_subtree(node, octant) {
                    Ok(child) => child,
                    Err(_) => break,
                }
            } else {
                break;
            };
        }

        let id = EntityId(self.entities.len() as u32);
        self.entities.push(entity);
        self.tree.value_mut(node).push(id);
        Ok(node)
    }

    /// The first indexed entity whose volume contains `p`, found by
    /// scanning entity sets from the deepest containing node upward.
    pub fn entity_at_pos(&self, p: Vec3A) -> Option<EntityId> {
        let (mut node, _) = self.tree.node_at_pos(p)?;
        loop {
            for &id in self.tree.value(node) {
                if self.entity(id).is_within(p) {
                    return Some(id);
                }
            }
            node = self.tree.parent(node)?.0;
        }
    }

    /// The substance filling space at `p`, if some entity claims it.
    pub fn substance_at(&self, p: Vec3A) -> Option<Substance> {
        self.entity_at_pos(p)
            .map(|id| self.entity(id).get_substance())
    }
}
