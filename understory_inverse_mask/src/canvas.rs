// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node render state: pop instructions and the graphic back-reference.
//!
//! A pop instruction is an extra draw of a node's geometry that the renderer runs
//! after the node's children. Masks use it to undo the stencil writes they made
//! for their subtree.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;

/// The draw-batch side of a graphic: where post-children passes are registered.
pub trait CanvasRenderer<M> {
    /// Whether the renderer should run pop materials after this node's children.
    fn set_has_pop_instruction(&mut self, has_pop_instruction: bool);

    /// Number of pop material slots.
    fn set_pop_material_count(&mut self, count: usize);

    /// Fill pop material slot `index`.
    fn set_pop_material(&mut self, material: M, index: usize);
}

/// A renderable component attached to a scene node.
pub trait Graphic {
    /// Material type submitted by this graphic.
    type Material;

    /// The canvas renderer batching this graphic.
    fn canvas_renderer(&mut self) -> &mut dyn CanvasRenderer<Self::Material>;

    /// Request that the renderer re-resolve this graphic's material.
    fn set_material_dirty(&mut self);
}

/// Recorded pop instructions for one node.
///
/// A plain [`CanvasRenderer`] implementation hosts can embed in their graphics.
#[derive(Clone, Debug, PartialEq)]
pub struct PopInstructions<M> {
    has_pop_instruction: bool,
    slots: Vec<Option<M>>,
}

impl<M> Default for PopInstructions<M> {
    fn default() -> Self {
        Self {
            has_pop_instruction: false,
            slots: Vec::new(),
        }
    }
}

impl<M> PopInstructions<M> {
    /// Whether a pop pass is registered.
    pub fn has_pop_instruction(&self) -> bool {
        self.has_pop_instruction
    }

    /// Number of pop material slots.
    pub fn pop_material_count(&self) -> usize {
        self.slots.len()
    }

    /// Material in slot `index`, if it was filled.
    pub fn pop_material(&self, index: usize) -> Option<&M> {
        self.slots.get(index)?.as_ref()
    }

    /// Materials the renderer should draw after the node's children, in order.
    ///
    /// Empty unless a pop instruction is registered.
    pub fn active(&self) -> impl Iterator<Item = &M> + '_ {
        self.slots
            .iter()
            .filter(|_| self.has_pop_instruction)
            .flatten()
    }
}

impl<M> CanvasRenderer<M> for PopInstructions<M> {
    fn set_has_pop_instruction(&mut self, has_pop_instruction: bool) {
        self.has_pop_instruction = has_pop_instruction;
    }

    fn set_pop_material_count(&mut self, count: usize) {
        self.slots.truncate(count);
        self.slots.resize_with(count, || None);
    }

    fn set_pop_material(&mut self, material: M, index: usize) {
        debug_assert!(
            index < self.slots.len(),
            "pop material slot {index} out of range ({} slots)",
            self.slots.len()
        );
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(material);
        }
    }
}

/// Non-owning reference to a node's graphic, checked against the host on use.
///
/// [`get`](Self::get) asks the host for the node's current graphic and keeps a
/// weak reference to it. A cached graphic that the host has since replaced is
/// dropped from the link even while other owners keep it alive, so callers never
/// act on a stale one.
pub struct GraphicLink<G> {
    cached: Option<Weak<RefCell<G>>>,
}

impl<G> core::fmt::Debug for GraphicLink<G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let live = self
            .cached
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0);
        f.debug_struct("GraphicLink").field("live", &live).finish()
    }
}

impl<G> Default for GraphicLink<G> {
    fn default() -> Self {
        Self { cached: None }
    }
}

impl<G> GraphicLink<G> {
    /// The node's current graphic, as reported by `resolve`.
    ///
    /// Returns `None` and forgets the cached graphic once the host no longer
    /// reports one.
    pub fn get(
        &mut self,
        resolve: impl FnOnce() -> Option<Rc<RefCell<G>>>,
    ) -> Option<Rc<RefCell<G>>> {
        let current = resolve();
        if !self.is_cached(current.as_ref()) {
            self.cached = current.as_ref().map(Rc::downgrade);
        }
        current
    }

    /// Whether the link last saw `graphic`.
    pub fn is_cached(&self, graphic: Option<&Rc<RefCell<G>>>) -> bool {
        match (self.cached.as_ref(), graphic) {
            (Some(weak), Some(graphic)) => weak.upgrade().is_some_and(|c| Rc::ptr_eq(&c, graphic)),
            (None, None) => true,
            _ => false,
        }
    }

    /// Forget the cached reference.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
