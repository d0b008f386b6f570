// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graphics and the stencil-aware draw list.
//!
//! [`MaskTree::draw_list`] walks the tree depth-first and resolves each graphic's
//! material in three layers:
//!
//! 1. Content inside `d` masks tests equal against the low `d` stencil bits.
//! 2. A regular mask replaces that with its push state and registers a pop pass
//!    that clears its bit again after the children.
//! 3. Registered [`MaterialModifier`](understory_inverse_mask::MaterialModifier)s
//!    run last, in order.

use alloc::vec::Vec;

use kurbo::{Affine, Point, Rect};
use understory_inverse_mask::{
    CanvasRenderer, ColorWriteMask, CompareFunction, Graphic, MAX_STENCIL_DEPTH, MaskHierarchy,
    MaskScene, Material, MaterialContext, MaterialModifier, PopInstructions, StencilConfig,
    StencilMaterialCache, StencilOp, buffer_mask, find_root_sort_override_canvas, stencil_depth,
};

use crate::tree::MaskTree;
use crate::types::{NodeFlags, NodeId, TreeMaterial};

/// Renderable component of a node.
#[derive(Clone, Debug)]
pub struct TreeGraphic {
    material: TreeMaterial,
    pop: PopInstructions<TreeMaterial>,
    dirty: bool,
}

impl TreeGraphic {
    /// A graphic drawing `material`; starts dirty.
    pub fn new(material: TreeMaterial) -> Self {
        Self {
            material,
            pop: PopInstructions::default(),
            dirty: true,
        }
    }

    /// The unmodified material.
    pub fn material(&self) -> &TreeMaterial {
        &self.material
    }

    /// Replace the unmodified material.
    pub fn set_material(&mut self, material: TreeMaterial) {
        self.material = material;
        self.dirty = true;
    }

    /// Pop passes registered during the last resolution.
    pub fn pop_instructions(&self) -> &PopInstructions<TreeMaterial> {
        &self.pop
    }

    /// Whether the material needs resolving.
    pub fn is_material_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the material as resolved.
    pub fn clear_material_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Graphic for TreeGraphic {
    type Material = TreeMaterial;

    fn canvas_renderer(&mut self) -> &mut dyn CanvasRenderer<TreeMaterial> {
        &mut self.pop
    }

    fn set_material_dirty(&mut self) {
        self.dirty = true;
    }
}

/// Which pass a [`DrawCommand`] belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DrawPass {
    /// The node's graphic.
    Graphic,
    /// A post-children pass registered on the node's canvas renderer.
    Pop,
}

/// One draw of a node's rect with a resolved material.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCommand {
    /// Node whose geometry is drawn.
    pub node: NodeId,
    /// Graphic or pop pass.
    pub pass: DrawPass,
    /// Resolved material.
    pub material: TreeMaterial,
    /// Local-to-world transform.
    pub transform: Affine,
    /// Local rect, pivot at the origin.
    pub shape: Rect,
}

impl DrawCommand {
    /// Whether the draw covers a world-space point. Edges are half-open.
    pub fn covers(&self, world_point: Point) -> bool {
        self.shape.contains(self.transform.inverse() * world_point)
    }
}

/// Stencil state of content inside `depth` masks: draw only where all claimed bits are set.
pub fn maskable_stencil(depth: u32) -> StencilConfig {
    let bits = buffer_mask(depth.min(MAX_STENCIL_DEPTH));
    StencilConfig {
        write_mask: 0,
        op: StencilOp::Keep,
        compare: CompareFunction::Equal,
        color_write_mask: ColorWriteMask::ALL,
        read_mask: bits,
        reference: bits,
    }
}

/// Push and pop stencil state of a regular mask at `depth`.
///
/// The push claims bit `depth` inside the mask's shape (where the enclosing bits
/// are already set); the pop clears it again. Returns `None` once all eight bits
/// are taken.
pub fn regular_mask_stencils(
    depth: u32,
    show_graphic: bool,
) -> Option<(StencilConfig, StencilConfig)> {
    if depth >= MAX_STENCIL_DEPTH {
        return None;
    }
    let color = if show_graphic {
        ColorWriteMask::ALL
    } else {
        ColorWriteMask::empty()
    };
    if depth == 0 {
        let push = StencilConfig {
            write_mask: 0xFF,
            op: StencilOp::Replace,
            compare: CompareFunction::Always,
            color_write_mask: color,
            read_mask: 0xFF,
            reference: 1,
        };
        let pop = StencilConfig {
            op: StencilOp::Zero,
            color_write_mask: ColorWriteMask::empty(),
            ..push
        };
        return Some((push, pop));
    }
    let below = buffer_mask(depth);
    let with_bit = buffer_mask(depth + 1);
    let push = StencilConfig {
        write_mask: with_bit,
        op: StencilOp::Replace,
        compare: CompareFunction::Equal,
        color_write_mask: color,
        read_mask: below,
        reference: with_bit,
    };
    let pop = StencilConfig {
        color_write_mask: ColorWriteMask::empty(),
        reference: below,
        ..push
    };
    Some((push, pop))
}

impl MaskTree {
    /// Resolve every visible graphic and flatten the tree into draw order.
    ///
    /// Activity changes are reported to modifiers first (see
    /// [`update_activity`](Self::update_activity)). Roots are visited in slot order
    /// and children in insertion order. Each node with a graphic emits its graphic
    /// draw, then its subtree, then its pop passes. Inactive nodes hide their
    /// subtree.
    pub fn draw_list(
        &mut self,
        cache: &mut StencilMaterialCache<TreeMaterial>,
    ) -> Vec<DrawCommand> {
        self.update_activity(cache);
        let mut out = Vec::new();
        for root in self.roots() {
            self.emit(root, cache, &mut out);
        }
        out
    }

    fn emit(
        &self,
        id: NodeId,
        cache: &mut StencilMaterialCache<TreeMaterial>,
        out: &mut Vec<DrawCommand>,
    ) {
        let node = self.node(id);
        if !node.local.flags.contains(NodeFlags::ACTIVE) {
            return;
        }
        let transform = self.world_transform(id);
        let shape = node.local.rect.rect();
        let command = |pass, material| DrawCommand {
            node: id,
            pass,
            material,
            transform,
            shape,
        };

        let mut pops = Vec::new();
        if let Some(graphic) = &node.graphic {
            let mut graphic = graphic.borrow_mut();
            let material = self.resolve_material(id, &mut graphic, cache);
            out.push(command(DrawPass::Graphic, material));
            pops.extend(graphic.pop.active().cloned());
        }
        for &child in &node.children {
            self.emit(child, cache, out);
        }
        for material in pops {
            out.push(command(DrawPass::Pop, material));
        }
    }

    fn resolve_material(
        &self,
        id: NodeId,
        graphic: &mut TreeGraphic,
        cache: &mut StencilMaterialCache<TreeMaterial>,
    ) -> TreeMaterial {
        graphic.pop.set_has_pop_instruction(false);
        graphic.pop.set_pop_material_count(0);

        let stop_at = find_root_sort_override_canvas(self, id);
        let depth = stencil_depth(self, id, stop_at);
        let mut material = graphic.material.clone();
        if depth > 0 {
            material.apply_stencil(&maskable_stencil(depth));
        }

        if self.is_active_mask(id) {
            let flags = self.node(id).local.flags;
            match regular_mask_stencils(depth, flags.contains(NodeFlags::SHOW_MASK_GRAPHIC)) {
                Some((push, pop)) => {
                    let mut pop_material = graphic.material.clone();
                    pop_material.apply_stencil(&pop);
                    material.apply_stencil(&push);
                    graphic.pop.set_has_pop_instruction(true);
                    graphic.pop.set_pop_material_count(1);
                    graphic.pop.set_pop_material(pop_material, 0);
                }
                None => {
                    log::warn!("mask on {id:?} is nested {depth} deep; stencil bits exhausted");
                }
            }
        }

        for modifier in &self.node(id).modifiers {
            let mut cx = MaterialContext {
                scene: self,
                cache: &mut *cache,
                canvas: &mut graphic.pop,
            };
            material = modifier.borrow_mut().modified_material(&material, &mut cx);
        }

        graphic.clear_material_dirty();
        material
    }
}
