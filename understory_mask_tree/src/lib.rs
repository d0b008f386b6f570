// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_mask_tree --heading-base-level=0

//! Understory Mask Tree: a small host for [`understory_inverse_mask`].
//!
//! - A generational node tree with rect layout, activity, regular masks, and canvases.
//! - Graphics that carry pop instructions, plus per-node material modifiers such as
//!   [`InverseMask`](understory_inverse_mask::InverseMask).
//! - [`MaskTree::draw_list`] resolves materials depth-first and emits pop passes
//!   after each subtree, the way a UI batcher would.
//! - [`StencilTrace`] replays a draw list at one point to show what would be visible.
//!
//! ## Example
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//!
//! use kurbo::{Point, Size};
//! use understory_inverse_mask::{InverseMask, RectTransform, StencilMaterialCache};
//! use understory_mask_tree::{LocalNode, MaskTree, NodeFlags, StencilTrace, TreeMaterial};
//!
//! let node = |flags, center: (f64, f64), size: f64| LocalNode {
//!     rect: RectTransform::centered(Point::new(center.0, center.1), Size::new(size, size)),
//!     flags,
//! };
//! let mut tree = MaskTree::new();
//! let canvas = tree.insert(None, node(NodeFlags::ACTIVE | NodeFlags::CANVAS, (0.0, 0.0), 0.0));
//! let mask_flags = NodeFlags::default() | NodeFlags::MASK;
//! let mask = tree.insert(Some(canvas), node(mask_flags, (50.0, 50.0), 100.0));
//! let hole = tree.insert(Some(mask), node(NodeFlags::ACTIVE, (50.0, 50.0), 20.0));
//! let panel = tree.insert(Some(mask), node(NodeFlags::ACTIVE, (50.0, 50.0), 100.0));
//! for id in [mask, hole, panel] {
//!     tree.attach_graphic(id, TreeMaterial::new("ui"));
//! }
//!
//! let inverse = Rc::new(RefCell::new(InverseMask::<MaskTree>::new(hole)));
//! inverse.borrow_mut().enable(&mut tree);
//! tree.add_modifier(hole, inverse.clone());
//!
//! let mut cache = StencilMaterialCache::new();
//! let draws = tree.draw_list(&mut cache);
//! assert!(StencilTrace::at(&draws, Point::new(20.0, 20.0)).painted(panel));
//! assert!(!StencilTrace::at(&draws, Point::new(50.0, 50.0)).painted(panel));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod render;
mod trace;
mod tree;
mod types;

pub use render::{DrawCommand, DrawPass, TreeGraphic, maskable_stencil, regular_mask_stencils};
pub use trace::StencilTrace;
pub use tree::{MaskTree, SharedModifier};
pub use types::{LocalNode, NodeFlags, NodeId, TreeMaterial};
