// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the mask tree: node identifiers, flags, materials, and local data.

use understory_inverse_mask::{Material, RectTransform, StencilConfig};

/// Identifier for a node in the tree.
///
/// A slot index plus a generation counter. On insert, a fresh slot starts at
/// generation `1`; reusing a freed slot increments its generation, so a stale
/// `NodeId` never aliases a newer node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Per-node components and state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is active. Inactive nodes hide their whole subtree.
        const ACTIVE            = 0b0000_0001;
        /// Node carries a regular mask (needs a graphic to take effect).
        const MASK              = 0b0000_0010;
        /// Node is a canvas.
        const CANVAS            = 0b0000_0100;
        /// Canvas has its own sorting order (only meaningful with `CANVAS`).
        const OVERRIDE_SORTING  = 0b0000_1000;
        /// Regular mask also draws its own graphic.
        const SHOW_MASK_GRAPHIC = 0b0001_0000;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::ACTIVE | Self::SHOW_MASK_GRAPHIC
    }
}

/// Local data for a node.
#[derive(Clone, Debug, Default)]
pub struct LocalNode {
    /// Rect layout; `position` and `rotation` are world space.
    pub rect: RectTransform,
    /// Components and activity.
    pub flags: NodeFlags,
}

/// Material used by the mask tree: a shader label plus optional stencil state.
///
/// Two materials with the same label and stencil state are interchangeable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeMaterial {
    /// Shader or pipeline label.
    pub shader: &'static str,
    /// Stencil state, `None` when stenciling is off.
    pub stencil: Option<StencilConfig>,
}

impl TreeMaterial {
    /// An unstenciled material.
    pub const fn new(shader: &'static str) -> Self {
        Self {
            shader,
            stencil: None,
        }
    }

    /// Stencil state in effect, treating `None` as "always pass, write nothing".
    pub fn effective_stencil(&self) -> StencilConfig {
        self.stencil.unwrap_or_default()
    }
}

impl Material for TreeMaterial {
    fn apply_stencil(&mut self, stencil: &StencilConfig) {
        self.stencil = Some(*stencil);
    }
}
