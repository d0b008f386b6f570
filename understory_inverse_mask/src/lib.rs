// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_inverse_mask --heading-base-level=0

//! Understory Inverse Mask: stencil bookkeeping for masks that hide their inside.
//!
//! A regular mask shows content only inside its shape. An inverse mask does the
//! opposite: content enclosed by the same masks shows everywhere *except* inside
//! the inverse mask's shape. Inverse masks nest freely with regular masks because
//! both share one stencil-bit allocation scheme.
//!
//! - Each enclosing mask claims one stencil bit. A node's [stencil depth](stencil_depth)
//!   is the number of claimed bits above it, bounded by the nearest
//!   [sort-override canvas](find_root_sort_override_canvas).
//! - [`InverseMask`] is a [`MaterialModifier`]: given a graphic's base material it
//!   returns a material that clears the claimed bits inside the shape, and in
//!   child-only mode registers a pop pass that restores them after the children.
//! - [`StencilMaterialCache`] shares configured materials between holders with the
//!   same `(base, StencilConfig)` key and drops them with the last reference.
//! - [`InverseMaskHitFilter`] lets pointer input through the hole.
//!
//! ## Not a renderer
//!
//! This crate does not draw or rasterize. Hosts describe their scene through
//! [`MaskHierarchy`] and [`MaskScene`], supply a [`Material`] type, and consume
//! the configured materials and pop instructions in their own draw pipeline.
//! `understory_mask_tree` is a small reference host.
//!
//! ## Lifecycle
//!
//! - [`InverseMask::enable`] fits to the target (if any) and marks the graphic dirty.
//! - [`MaterialModifier::modified_material`] runs whenever the graphic's material
//!   is resolved. It re-derives the depth every time and replaces, never
//!   accumulates, the materials it holds.
//! - [`InverseMask::late_update`] re-fits per frame when asked to.
//! - [`InverseMask::disable`] releases both materials and withdraws the pop pass.
//!
//! ## Example
//!
//! ```
//! use understory_inverse_mask::{
//!     CanvasSorting, Material, MaskHierarchy, StencilConfig, StencilMaterialCache,
//!     buffer_mask, stencil_depth,
//! };
//!
//! // Canvas (0) → mask (1) → mask (2) → content (3).
//! struct Chain;
//!
//! impl MaskHierarchy for Chain {
//!     type Node = u32;
//!     fn parent(&self, node: u32) -> Option<u32> {
//!         node.checked_sub(1)
//!     }
//!     fn is_active_mask(&self, node: u32) -> bool {
//!         node == 1 || node == 2
//!     }
//!     fn canvas(&self, node: u32) -> Option<CanvasSorting> {
//!         (node == 0).then_some(CanvasSorting::Inherit)
//!     }
//! }
//!
//! let depth = stencil_depth(&Chain, 3, Some(0));
//! assert_eq!(depth, 2);
//! assert_eq!(buffer_mask(depth), 0b11);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod cache;
mod canvas;
mod depth;
mod hit;
mod mask;
mod rect;
mod scene;
mod stencil;

#[cfg(test)]
mod testing;

pub use cache::{Material, StencilMaterialCache, StencilMaterialId};
pub use canvas::{CanvasRenderer, Graphic, GraphicLink, PopInstructions};
pub use depth::{find_root_sort_override_canvas, stencil_depth};
pub use hit::{Camera, InverseMaskHitFilter, rectangle_contains_screen_point};
pub use mask::{
    InverseMask, InverseMaskSettings, InverseMaskState, MaterialContext, MaterialModifier,
    inverse_mask_pop_stencil, inverse_mask_stencil,
};
pub use rect::{PIVOT_CENTER, RectTransform};
pub use scene::{CanvasSorting, MaskHierarchy, MaskScene};
pub use stencil::{
    ColorWriteMask, CompareFunction, MAX_STENCIL_DEPTH, StencilConfig, StencilOp, buffer_mask,
};
