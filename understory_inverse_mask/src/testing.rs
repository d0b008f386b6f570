// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A minimal in-memory scene for unit tests.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::Affine;

use crate::cache::Material;
use crate::canvas::{CanvasRenderer, Graphic, PopInstructions};
use crate::rect::RectTransform;
use crate::scene::{CanvasSorting, MaskHierarchy, MaskScene};
use crate::stencil::StencilConfig;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TestMaterial {
    pub(crate) name: &'static str,
    pub(crate) stencil: Option<StencilConfig>,
}

impl TestMaterial {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            stencil: None,
        }
    }
}

impl Material for TestMaterial {
    fn apply_stencil(&mut self, stencil: &StencilConfig) {
        self.stencil = Some(*stencil);
    }
}

#[derive(Debug, Default)]
pub(crate) struct TestGraphic {
    pub(crate) pop: PopInstructions<TestMaterial>,
    pub(crate) dirty_count: u32,
}

impl Graphic for TestGraphic {
    type Material = TestMaterial;

    fn canvas_renderer(&mut self) -> &mut dyn CanvasRenderer<TestMaterial> {
        &mut self.pop
    }

    fn set_material_dirty(&mut self) {
        self.dirty_count += 1;
    }
}

#[derive(Debug)]
pub(crate) struct TestNode {
    pub(crate) parent: Option<usize>,
    pub(crate) active: bool,
    pub(crate) mask: bool,
    pub(crate) mask_enabled: bool,
    pub(crate) canvas: Option<CanvasSorting>,
    pub(crate) rect: Option<RectTransform>,
    pub(crate) world: Affine,
    pub(crate) graphic: Option<Rc<RefCell<TestGraphic>>>,
}

#[derive(Debug, Default)]
pub(crate) struct TestScene {
    nodes: Vec<TestNode>,
}

impl TestScene {
    pub(crate) fn add(&mut self, parent: Option<usize>) -> usize {
        self.nodes.push(TestNode {
            parent,
            active: true,
            mask: false,
            mask_enabled: true,
            canvas: None,
            rect: None,
            world: Affine::IDENTITY,
            graphic: None,
        });
        self.nodes.len() - 1
    }

    pub(crate) fn node_mut(&mut self, node: usize) -> &mut TestNode {
        &mut self.nodes[node]
    }

    pub(crate) fn node(&self, node: usize) -> &TestNode {
        &self.nodes[node]
    }

    /// Attach a fresh graphic to `node` and return it.
    pub(crate) fn attach_graphic(&mut self, node: usize) -> Rc<RefCell<TestGraphic>> {
        let graphic = Rc::new(RefCell::new(TestGraphic::default()));
        self.nodes[node].graphic = Some(graphic.clone());
        graphic
    }
}

impl MaskHierarchy for TestScene {
    type Node = usize;

    fn parent(&self, node: usize) -> Option<usize> {
        self.nodes[node].parent
    }

    fn is_active_mask(&self, node: usize) -> bool {
        let n = &self.nodes[node];
        n.mask && n.mask_enabled && self.is_active_in_hierarchy(node)
    }

    fn canvas(&self, node: usize) -> Option<CanvasSorting> {
        self.nodes[node].canvas
    }
}

impl MaskScene for TestScene {
    type Graphic = TestGraphic;

    fn is_active_in_hierarchy(&self, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if !self.nodes[n].active {
                return false;
            }
            current = self.nodes[n].parent;
        }
        true
    }

    fn rect_transform(&self, node: usize) -> Option<RectTransform> {
        self.nodes[node].rect
    }

    fn set_rect_transform(&mut self, node: usize, transform: RectTransform) {
        self.nodes[node].rect = Some(transform);
    }

    fn world_transform(&self, node: usize) -> Affine {
        self.nodes[node].world
    }

    fn graphic(&self, node: usize) -> Option<Rc<RefCell<TestGraphic>>> {
        self.nodes[node].graphic.clone()
    }
}
