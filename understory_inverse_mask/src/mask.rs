// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The inverse mask controller.
//!
//! ## Stencil allocation
//!
//! A node at stencil depth `d` sits inside `d` masks, which together claimed the
//! low `d` bits of the stencil buffer ([`buffer_mask`]). Content inside those masks
//! draws only where all claimed bits are set.
//!
//! The inverse mask draws its own shape with a material that always passes and
//! zeroes the claimed bits. Later content enclosed by the same masks then fails
//! its stencil test inside the shape: it shows everywhere except there.
//!
//! With [`only_for_children`](InverseMaskSettings::only_for_children) the hole is
//! temporary. A pop pass, run after the node's children, writes the reference
//! back into the claimed bits wherever they no longer match, so siblings drawn
//! afterwards see the stencil buffer as it was.

use alloc::rc::Rc;
use core::cell::RefCell;

use crate::cache::{Material, StencilMaterialCache, StencilMaterialId};
use crate::canvas::{CanvasRenderer, Graphic, GraphicLink};
use crate::depth::{find_root_sort_override_canvas, stencil_depth};
use crate::scene::MaskScene;
use crate::stencil::{ColorWriteMask, CompareFunction, StencilConfig, StencilOp, buffer_mask};

/// Stencil state of the inverse mask's own draw at `depth`.
///
/// Always passes and zeroes the claimed bits. Color output is off unless
/// `show_graphic` is set, which reveals the otherwise invisible mask shape.
pub fn inverse_mask_stencil(depth: u32, show_graphic: bool) -> StencilConfig {
    let bits = buffer_mask(depth);
    StencilConfig {
        write_mask: bits,
        op: StencilOp::Zero,
        compare: CompareFunction::Always,
        color_write_mask: if show_graphic {
            ColorWriteMask::ALL
        } else {
            ColorWriteMask::empty()
        },
        read_mask: 0,
        reference: bits,
    }
}

/// Stencil state of the pass that restores the claimed bits after the children.
///
/// Replaces the claimed bits with the reference wherever the stored value differs.
/// The test reads the whole stencil value: with a zero read mask a not-equal test
/// compares `0 != 0` and never passes.
pub fn inverse_mask_pop_stencil(depth: u32) -> StencilConfig {
    let bits = buffer_mask(depth);
    StencilConfig {
        write_mask: bits,
        op: StencilOp::Replace,
        compare: CompareFunction::NotEqual,
        color_write_mask: ColorWriteMask::empty(),
        read_mask: 0xFF,
        reference: bits,
    }
}

/// Host capability: rewrite the material a graphic is about to render with.
///
/// The host calls every modifier on a node in order, feeding each the previous
/// result, whenever the node's material is dirty.
pub trait MaterialModifier<S: MaskScene, M: Material> {
    /// Return the material to render with in place of `base`.
    fn modified_material(&mut self, base: &M, cx: &mut MaterialContext<'_, S, M>) -> M;

    /// The modified node became active in the hierarchy again.
    fn hierarchy_activated(&mut self, _scene: &mut S) {}

    /// The modified node (or an ancestor) became inactive.
    ///
    /// Anything held for rendering should be released here; the host stops
    /// resolving materials for inactive nodes.
    fn hierarchy_deactivated(&mut self, _scene: &S, _cache: &mut StencilMaterialCache<M>) {}
}

/// Host resources lent to a [`MaterialModifier`] for one call.
pub struct MaterialContext<'a, S, M> {
    /// The scene the modified node lives in.
    pub scene: &'a S,
    /// Shared configured materials.
    pub cache: &'a mut StencilMaterialCache<M>,
    /// Canvas renderer of the graphic being resolved.
    pub canvas: &'a mut dyn CanvasRenderer<M>,
}

impl<S, M> core::fmt::Debug for MaterialContext<'_, S, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MaterialContext")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Inspector-facing options of an [`InverseMask`].
#[derive(Clone, Debug, PartialEq)]
pub struct InverseMaskSettings<N> {
    /// Node whose rect this mask copies.
    pub fit_target: Option<N>,
    /// Re-fit to the target on every late update.
    pub fit_on_late_update: bool,
    /// Restore the stencil after the children so the hole only affects them.
    pub only_for_children: bool,
    /// Draw the mask shape itself (debugging aid).
    pub show_inverse_mask_graphic: bool,
}

impl<N> Default for InverseMaskSettings<N> {
    fn default() -> Self {
        Self {
            fit_target: None,
            fit_on_late_update: false,
            only_for_children: false,
            show_inverse_mask_graphic: false,
        }
    }
}

/// Lifecycle of an [`InverseMask`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum InverseMaskState {
    /// Disabled; holds no materials.
    Disabled,
    /// Enabled, no material resolved yet.
    Active,
    /// Enabled and holding configured materials.
    Bound,
}

/// Punches a hole of its node's shape into the enclosing masks.
///
/// Attach one to a node with a graphic and register it as a [`MaterialModifier`]
/// of that graphic. Call [`enable`](Self::enable) / [`disable`](Self::disable)
/// with the component lifecycle and [`late_update`](Self::late_update) once per
/// frame. Hosts also report hierarchy activity changes through
/// [`MaterialModifier::hierarchy_deactivated`] and
/// [`MaterialModifier::hierarchy_activated`], which release and re-request the
/// materials without touching the component's own enabled flag.
pub struct InverseMask<S: MaskScene> {
    node: S::Node,
    settings: InverseMaskSettings<S::Node>,
    enabled: bool,
    mask_material: Option<StencilMaterialId>,
    pop_material: Option<StencilMaterialId>,
    graphic: GraphicLink<S::Graphic>,
}

impl<S: MaskScene> core::fmt::Debug for InverseMask<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InverseMask")
            .field("node", &self.node)
            .field("enabled", &self.enabled)
            .field("mask_material", &self.mask_material)
            .field("pop_material", &self.pop_material)
            .field("graphic", &self.graphic)
            .finish_non_exhaustive()
    }
}

impl<S: MaskScene> InverseMask<S> {
    /// A disabled inverse mask on `node` with default settings.
    pub fn new(node: S::Node) -> Self {
        Self::with_settings(node, InverseMaskSettings::default())
    }

    /// A disabled inverse mask on `node`.
    pub fn with_settings(node: S::Node, settings: InverseMaskSettings<S::Node>) -> Self {
        Self {
            node,
            settings,
            enabled: false,
            mask_material: None,
            pop_material: None,
            graphic: GraphicLink::default(),
        }
    }

    /// The node this mask is attached to.
    pub fn node(&self) -> S::Node {
        self.node
    }

    /// Current settings.
    pub fn settings(&self) -> &InverseMaskSettings<S::Node> {
        &self.settings
    }

    /// Whether the component itself is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enabled, and its node is active in the hierarchy.
    pub fn is_active_and_enabled(&self, scene: &S) -> bool {
        self.enabled && scene.is_active_in_hierarchy(self.node)
    }

    /// Where this mask is in its lifecycle.
    pub fn state(&self) -> InverseMaskState {
        match (self.enabled, self.mask_material.is_some()) {
            (false, _) => InverseMaskState::Disabled,
            (true, false) => InverseMaskState::Active,
            (true, true) => InverseMaskState::Bound,
        }
    }

    /// The primary material currently held, if any.
    pub fn mask_material(&self) -> Option<StencilMaterialId> {
        self.mask_material
    }

    /// The restoration material currently held, if any.
    pub fn pop_material(&self) -> Option<StencilMaterialId> {
        self.pop_material
    }

    /// Component enabled: fit to the target if there is one and request a material refresh.
    pub fn enable(&mut self, scene: &mut S) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        log::debug!("inverse mask on {:?} enabled", self.node);
        self.refresh(scene);
    }

    /// Component disabled: release held materials and withdraw the pop pass.
    ///
    /// Safe to call when nothing was ever resolved.
    pub fn disable<M>(&mut self, scene: &S, cache: &mut StencilMaterialCache<M>)
    where
        S::Graphic: Graphic<Material = M>,
    {
        self.enabled = false;
        log::debug!("inverse mask on {:?} disabled", self.node);
        self.release(scene, cache);
    }

    /// Per-frame hook, run after all regular updates.
    ///
    /// Re-fits to the target when [`fit_on_late_update`](InverseMaskSettings::fit_on_late_update)
    /// is set, or always while the host is in preview (edit) mode.
    pub fn late_update(&mut self, scene: &mut S, preview_mode_active: bool) {
        if !self.is_active_and_enabled(scene) {
            return;
        }
        let Some(target) = self.settings.fit_target else {
            return;
        };
        if self.settings.fit_on_late_update || preview_mode_active {
            self.fit_to(scene, target);
        }
    }

    /// Copy `target`'s rect onto this node's rect.
    ///
    /// Does nothing if either node lacks a rect transform.
    pub fn fit_to(&self, scene: &mut S, target: S::Node) {
        let Some(target_rect) = scene.rect_transform(target) else {
            return;
        };
        let Some(mut rect) = scene.rect_transform(self.node) else {
            return;
        };
        rect.fit_to(&target_rect);
        scene.set_rect_transform(self.node, rect);
    }

    /// Change the fit target and fit to it immediately.
    pub fn set_fit_target(&mut self, scene: &mut S, target: Option<S::Node>) {
        self.settings.fit_target = target;
        if let Some(target) = target {
            self.fit_to(scene, target);
        }
    }

    /// Toggle per-frame fitting.
    pub fn set_fit_on_late_update(&mut self, fit_on_late_update: bool) {
        self.settings.fit_on_late_update = fit_on_late_update;
    }

    /// Toggle drawing of the mask shape.
    pub fn set_show_inverse_mask_graphic(&mut self, scene: &S, show: bool) {
        self.settings.show_inverse_mask_graphic = show;
        self.set_dirty(scene);
    }

    /// Toggle restoring the stencil after the children.
    pub fn set_only_for_children(&mut self, scene: &S, only_for_children: bool) {
        self.settings.only_for_children = only_for_children;
        self.set_dirty(scene);
    }

    /// Host hook for "a serialized value changed".
    pub fn validate(&mut self, scene: &S) {
        self.set_dirty(scene);
    }

    fn refresh(&mut self, scene: &mut S) {
        if let Some(target) = self.settings.fit_target {
            self.fit_to(scene, target);
        }
        self.set_dirty(scene);
    }

    fn release<M>(&mut self, scene: &S, cache: &mut StencilMaterialCache<M>)
    where
        S::Graphic: Graphic<Material = M>,
    {
        cache.remove(self.mask_material.take());
        cache.remove(self.pop_material.take());

        if let Some(graphic) = self.graphic(scene) {
            let mut graphic = graphic.borrow_mut();
            let canvas = graphic.canvas_renderer();
            canvas.set_has_pop_instruction(false);
            canvas.set_pop_material_count(0);
            graphic.set_material_dirty();
        }
    }

    fn set_dirty(&mut self, scene: &S) {
        if let Some(graphic) = self.graphic(scene) {
            graphic.borrow_mut().set_material_dirty();
        }
    }

    fn graphic(&mut self, scene: &S) -> Option<Rc<RefCell<S::Graphic>>> {
        let node = self.node;
        self.graphic.get(|| scene.graphic(node))
    }
}

impl<S, M> MaterialModifier<S, M> for InverseMask<S>
where
    S: MaskScene,
    S::Graphic: Graphic<Material = M>,
    M: Material,
{
    fn modified_material(&mut self, base: &M, cx: &mut MaterialContext<'_, S, M>) -> M {
        if !self.is_active_and_enabled(cx.scene) {
            return base.clone();
        }

        let stop_at = find_root_sort_override_canvas(cx.scene, self.node);
        let depth = stencil_depth(cx.scene, self.node, stop_at);
        log::trace!(
            "inverse mask on {:?}: depth {depth}, claimed bits {:#010b}",
            self.node,
            buffer_mask(depth)
        );

        cx.cache.remove(self.mask_material.take());
        let mask = cx.cache.add(
            base,
            inverse_mask_stencil(depth, self.settings.show_inverse_mask_graphic),
        );
        self.mask_material = Some(mask);

        cx.cache.remove(self.pop_material.take());
        if self.settings.only_for_children {
            let pop = cx.cache.add(base, inverse_mask_pop_stencil(depth));
            self.pop_material = Some(pop);
            cx.canvas.set_has_pop_instruction(true);
            cx.canvas.set_pop_material_count(1);
            cx.canvas.set_pop_material(cx.cache[pop].clone(), 0);
        } else {
            cx.canvas.set_has_pop_instruction(false);
            cx.canvas.set_pop_material_count(0);
        }

        cx.cache[mask].clone()
    }

    fn hierarchy_activated(&mut self, scene: &mut S) {
        if self.enabled {
            log::debug!("inverse mask on {:?} reactivated", self.node);
            self.refresh(scene);
        }
    }

    fn hierarchy_deactivated(&mut self, scene: &S, cache: &mut StencilMaterialCache<M>) {
        if self.enabled {
            log::debug!("inverse mask on {:?} deactivated", self.node);
            self.release(scene, cache);
        }
    }
}
