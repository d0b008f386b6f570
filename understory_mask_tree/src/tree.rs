// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: structure, updates, and the scene view used by masks.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::{Affine, Vec2};
use understory_inverse_mask::{
    CanvasSorting, Graphic, MaskHierarchy, MaskScene, MaterialModifier, RectTransform,
    StencilMaterialCache,
};

use crate::render::TreeGraphic;
use crate::types::{LocalNode, NodeFlags, NodeId, TreeMaterial};

/// A material modifier shared between the tree and its owner.
///
/// The owner keeps a typed handle (for example `Rc<RefCell<InverseMask<MaskTree>>>`)
/// and registers a clone with [`MaskTree::add_modifier`].
pub type SharedModifier = Rc<RefCell<dyn MaterialModifier<MaskTree, TreeMaterial>>>;

impl Default for MaskTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Node tree with rect layout, masks, canvases, and graphics.
pub struct MaskTree {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
}

impl core::fmt::Debug for MaskTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("MaskTree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .finish_non_exhaustive()
    }
}

pub(crate) struct Node {
    generation: u32,
    parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) local: LocalNode,
    pub(crate) graphic: Option<Rc<RefCell<TreeGraphic>>>,
    pub(crate) modifiers: Vec<SharedModifier>,
    // Hierarchy activity reported to the modifiers.
    was_active: bool,
}

impl Node {
    fn new(generation: u32, local: LocalNode) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            local,
            graphic: None,
            modifiers: Vec::new(),
            was_active: true,
        }
    }
}

impl MaskTree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Insert a new node as a child of `parent` (or as a root if `None`).
    pub fn insert(&mut self, parent: Option<NodeId>, local: LocalNode) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, local));
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, local)));
            self.generations.push(generation);
            (self.nodes.len() - 1, generation)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "NodeId uses 32-bit indices by design."
        )]
        let idx = idx as u32;
        let id = NodeId::new(idx, generation);
        if let Some(p) = parent {
            self.link_parent(id, p);
        }
        id
    }

    /// Remove a node (and its subtree) from the tree.
    ///
    /// Graphics and modifiers on removed nodes are dropped with them. Inverse
    /// masks registered there keep their cache references until disabled.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
        }
        let children = self.node(id).children.clone();
        for child in children {
            self.remove(child);
        }
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Reparent `id` under `new_parent`.
    ///
    /// Moving a node under its own subtree is refused.
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(p) = new_parent {
            if self.is_ancestor_or_self(id, p) {
                log::warn!("refusing to reparent {id:?} under its own descendant {p:?}");
                return;
            }
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
        }
        if let Some(p) = new_parent {
            self.link_parent(id, p);
        }
    }

    /// Update node flags.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.flags = flags;
            mark_dirty(n);
        }
    }

    /// Node flags, if the identifier is live.
    pub fn flags(&self, id: NodeId) -> Option<NodeFlags> {
        self.node_opt(id).map(|n| n.local.flags)
    }

    /// Parent of a live node.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id)?.parent
    }

    /// Children of a live node, in insertion order.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        match self.node_opt(id) {
            Some(n) => &n.children,
            None => &[],
        }
    }

    /// Root nodes in slot order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match n {
                Some(n) if n.parent.is_none() => {
                    #[allow(
                        clippy::cast_possible_truncation,
                        reason = "NodeId uses 32-bit indices by design."
                    )]
                    let i = i as u32;
                    Some(NodeId::new(i, n.generation))
                }
                _ => None,
            })
            .collect()
    }

    /// Attach a graphic drawing `material`, replacing any previous one.
    pub fn attach_graphic(
        &mut self,
        id: NodeId,
        material: TreeMaterial,
    ) -> Rc<RefCell<TreeGraphic>> {
        let graphic = Rc::new(RefCell::new(TreeGraphic::new(material)));
        self.node_mut(id).graphic = Some(graphic.clone());
        graphic
    }

    /// Remove the graphic from a node.
    pub fn detach_graphic(&mut self, id: NodeId) {
        if let Some(n) = self.node_opt_mut(id) {
            n.graphic = None;
        }
    }

    /// Report hierarchy activity changes to material modifiers.
    ///
    /// Every node whose activity in the hierarchy flipped since the last call has
    /// its modifiers' [`hierarchy_deactivated`] or [`hierarchy_activated`] hook run.
    /// [`draw_list`](Self::draw_list) calls this first; hosts that skip drawing for a
    /// while can call it directly.
    ///
    /// [`hierarchy_deactivated`]: MaterialModifier::hierarchy_deactivated
    /// [`hierarchy_activated`]: MaterialModifier::hierarchy_activated
    pub fn update_activity(&mut self, cache: &mut StencilMaterialCache<TreeMaterial>) {
        for idx in 0..self.nodes.len() {
            let Some(n) = &self.nodes[idx] else {
                continue;
            };
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            let id = NodeId::new(idx as u32, n.generation);
            let active = self.is_active_in_hierarchy(id);
            if active == n.was_active {
                continue;
            }
            let modifiers = n.modifiers.clone();
            self.node_mut(id).was_active = active;
            for modifier in modifiers {
                if active {
                    modifier.borrow_mut().hierarchy_activated(self);
                } else {
                    modifier.borrow_mut().hierarchy_deactivated(self, cache);
                }
            }
        }
    }

    /// Register a material modifier. Modifiers run in registration order.
    pub fn add_modifier(&mut self, id: NodeId, modifier: SharedModifier) {
        let n = self.node_mut(id);
        n.modifiers.push(modifier);
        mark_dirty(n);
    }

    /// Product of local scales from the root down to `id`.
    pub fn lossy_scale(&self, id: NodeId) -> Vec2 {
        let mut scale = Vec2::new(1.0, 1.0);
        let mut current = Some(id);
        while let Some(n) = current.and_then(|c| self.node_opt(c)) {
            let s = n.local.rect.local_scale;
            scale = Vec2::new(scale.x * s.x, scale.y * s.y);
            current = n.parent;
        }
        scale
    }

    /// Returns true if `id` refers to a live node.
    ///
    /// A `NodeId` is considered live if its slot exists and its generation matches
    /// the current generation stored in that slot.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node_opt(id).is_some()
    }

    // --- internals ---

    /// Access a node; panics if `id` is stale.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.node_opt(id).expect("dangling NodeId")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.node_opt_mut(id).expect("dangling NodeId")
    }

    fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn link_parent(&mut self, id: NodeId, parent: NodeId) {
        let parent_node = self.node_mut(parent);
        parent_node.children.push(id);
        self.node_mut(id).parent = Some(parent);
    }

    fn unlink_parent(&mut self, id: NodeId, parent: NodeId) {
        let p = self.node_mut(parent);
        p.children.retain(|c| *c != id);
        self.node_mut(id).parent = None;
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent_of(id) {
                Some(p) => id = p,
                None => return false,
            }
        }
    }
}

fn mark_dirty(node: &Node) {
    if let Some(graphic) = &node.graphic {
        if let Ok(mut graphic) = graphic.try_borrow_mut() {
            graphic.set_material_dirty();
        }
    }
}

impl MaskHierarchy for MaskTree {
    type Node = NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent_of(node)
    }

    /// A mask counts when it is flagged, has a graphic, and is active in the hierarchy.
    fn is_active_mask(&self, node: NodeId) -> bool {
        self.node_opt(node).is_some_and(|n| {
            n.local.flags.contains(NodeFlags::MASK) && n.graphic.is_some()
        }) && self.is_active_in_hierarchy(node)
    }

    fn canvas(&self, node: NodeId) -> Option<CanvasSorting> {
        let flags = self.flags(node)?;
        if !flags.contains(NodeFlags::CANVAS) {
            return None;
        }
        Some(if flags.contains(NodeFlags::OVERRIDE_SORTING) {
            CanvasSorting::Override
        } else {
            CanvasSorting::Inherit
        })
    }
}

impl MaskScene for MaskTree {
    type Graphic = TreeGraphic;

    fn is_active_in_hierarchy(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(n) = self.node_opt(id) else {
                return false;
            };
            if !n.local.flags.contains(NodeFlags::ACTIVE) {
                return false;
            }
            current = n.parent;
        }
        true
    }

    fn rect_transform(&self, node: NodeId) -> Option<RectTransform> {
        self.node_opt(node).map(|n| n.local.rect)
    }

    fn set_rect_transform(&mut self, node: NodeId, transform: RectTransform) {
        if let Some(n) = self.node_opt_mut(node) {
            n.local.rect = transform;
        }
    }

    /// Translation to the world position, then rotation, then the lossy scale.
    fn world_transform(&self, node: NodeId) -> Affine {
        let Some(n) = self.node_opt(node) else {
            return Affine::IDENTITY;
        };
        let rect = &n.local.rect;
        let scale = self.lossy_scale(node);
        Affine::translate(rect.position.to_vec2())
            * Affine::rotate(rect.rotation)
            * Affine::scale_non_uniform(scale.x, scale.y)
    }

    fn graphic(&self, node: NodeId) -> Option<Rc<RefCell<TreeGraphic>>> {
        self.node_opt(node)?.graphic.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Size};
    use understory_inverse_mask::stencil_depth;

    fn masked(flags: NodeFlags) -> LocalNode {
        LocalNode {
            flags,
            ..LocalNode::default()
        }
    }

    #[test]
    fn insert_reuses_slots_with_new_generation() {
        let mut tree = MaskTree::new();
        let root = tree.insert(None, LocalNode::default());
        let a = tree.insert(Some(root), LocalNode::default());
        tree.remove(a);
        assert!(!tree.is_alive(a));
        let b = tree.insert(Some(root), LocalNode::default());
        assert_eq!(a.idx(), b.idx());
        assert_ne!(a, b, "stale id must not alias the new node");
        assert_eq!(tree.children_of(root), &[b]);
        assert!(tree.flags(a).is_none());
    }

    #[test]
    fn remove_drops_subtree() {
        let mut tree = MaskTree::new();
        let root = tree.insert(None, LocalNode::default());
        let a = tree.insert(Some(root), LocalNode::default());
        let b = tree.insert(Some(a), LocalNode::default());
        tree.remove(a);
        assert!(!tree.is_alive(b));
        assert!(tree.children_of(root).is_empty());
        assert_eq!(tree.roots(), [root]);
    }

    #[test]
    fn reparent_refuses_cycles() {
        let mut tree = MaskTree::new();
        let root = tree.insert(None, LocalNode::default());
        let a = tree.insert(Some(root), LocalNode::default());
        let b = tree.insert(Some(a), LocalNode::default());
        tree.reparent(a, Some(b));
        assert_eq!(tree.parent_of(a), Some(root));

        tree.reparent(b, Some(root));
        assert_eq!(tree.children_of(root), &[a, b]);
        tree.reparent(b, None);
        assert_eq!(tree.roots(), [root, b]);
    }

    #[test]
    fn masks_need_a_graphic_and_activity() {
        let mut tree = MaskTree::new();
        let root = tree.insert(None, masked(NodeFlags::ACTIVE | NodeFlags::CANVAS));
        let mask = tree.insert(Some(root), masked(NodeFlags::ACTIVE | NodeFlags::MASK));
        let leaf = tree.insert(Some(mask), LocalNode::default());
        assert!(!tree.is_active_mask(mask), "no graphic yet");
        assert_eq!(stencil_depth(&tree, leaf, Some(root)), 0);

        let _ = tree.attach_graphic(mask, TreeMaterial::new("ui"));
        assert!(tree.is_active_mask(mask));
        assert_eq!(stencil_depth(&tree, leaf, Some(root)), 1);

        tree.set_flags(root, NodeFlags::CANVAS);
        assert!(!tree.is_active_mask(mask), "inactive ancestor");
        assert!(!tree.is_active_in_hierarchy(leaf));
    }

    #[test]
    fn canvas_flags_map_to_sorting() {
        let mut tree = MaskTree::new();
        let plain = tree.insert(None, LocalNode::default());
        let nested = tree.insert(None, masked(NodeFlags::ACTIVE | NodeFlags::CANVAS));
        let root = tree.insert(
            None,
            masked(NodeFlags::ACTIVE | NodeFlags::CANVAS | NodeFlags::OVERRIDE_SORTING),
        );
        assert_eq!(tree.canvas(plain), None);
        assert_eq!(tree.canvas(nested), Some(CanvasSorting::Inherit));
        assert_eq!(tree.canvas(root), Some(CanvasSorting::Override));
    }

    #[test]
    fn world_transform_uses_lossy_scale() {
        let mut tree = MaskTree::new();
        let mut parent_local = LocalNode::default();
        parent_local.rect.local_scale = Vec2::new(2.0, 2.0);
        let parent = tree.insert(None, parent_local);
        let child = tree.insert(
            Some(parent),
            LocalNode {
                rect: RectTransform::centered(Point::new(10.0, 20.0), Size::new(4.0, 4.0)),
                ..LocalNode::default()
            },
        );
        assert_eq!(tree.lossy_scale(child), Vec2::new(2.0, 2.0));
        let world = tree.world_transform(child);
        assert_eq!(world * Point::new(1.0, 1.0), Point::new(12.0, 22.0));
    }

    #[test]
    fn detach_graphic_leaves_the_node() {
        let mut tree = MaskTree::new();
        let node = tree.insert(None, masked(NodeFlags::ACTIVE | NodeFlags::MASK));
        let _ = tree.attach_graphic(node, TreeMaterial::new("ui"));
        assert!(tree.is_active_mask(node));

        tree.detach_graphic(node);
        assert!(tree.graphic(node).is_none());
        assert!(!tree.is_active_mask(node), "a mask without a graphic clips nothing");
        assert!(tree.is_alive(node));
    }

    #[test]
    fn set_flags_marks_graphic_dirty() {
        let mut tree = MaskTree::new();
        let node = tree.insert(None, LocalNode::default());
        let graphic = tree.attach_graphic(node, TreeMaterial::new("ui"));
        graphic.borrow_mut().clear_material_dirty();
        tree.set_flags(node, NodeFlags::ACTIVE | NodeFlags::MASK);
        assert!(graphic.borrow().is_material_dirty());
    }
}
