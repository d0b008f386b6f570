// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host scene interfaces consumed by the inverse mask.
//!
//! The inverse mask does not own a scene graph. Hosts describe theirs through two
//! small traits:
//!
//! - [`MaskHierarchy`]: parent links, which nodes are active masks, and canvas
//!   boundaries. Enough for [stencil depth](crate::stencil_depth) resolution.
//! - [`MaskScene`]: adds activity, rect transforms, world transforms, and the
//!   graphic attached to a node.

use alloc::rc::Rc;
use core::cell::RefCell;

use kurbo::Affine;

use crate::canvas::Graphic;
use crate::rect::RectTransform;

/// How a canvas participates in stencil nesting.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CanvasSorting {
    /// A nested canvas that shares its parent's stencil buffer.
    Inherit,
    /// A canvas with its own sorting order. Masks above it do not enclose its content.
    Override,
}

/// Read-only view of a node hierarchy, as needed to count enclosing masks.
pub trait MaskHierarchy {
    /// Node handle. Cheap to copy and compare.
    type Node: Copy + Eq + core::fmt::Debug;

    /// Parent of `node`, or `None` for a root.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Whether `node` is an enabled mask whose graphic is active.
    fn is_active_mask(&self, node: Self::Node) -> bool;

    /// The canvas on `node`, if any.
    fn canvas(&self, node: Self::Node) -> Option<CanvasSorting>;
}

/// Everything an [`InverseMask`](crate::InverseMask) needs from its host.
pub trait MaskScene: MaskHierarchy {
    /// The renderable component attached to a node.
    type Graphic: Graphic;

    /// Whether `node` and all of its ancestors are active.
    fn is_active_in_hierarchy(&self, node: Self::Node) -> bool;

    /// Rect transform of `node`, or `None` if the node has no rect layout.
    fn rect_transform(&self, node: Self::Node) -> Option<RectTransform>;

    /// Overwrite the rect transform of `node`.
    fn set_rect_transform(&mut self, node: Self::Node, transform: RectTransform);

    /// Local-to-world transform of `node`.
    fn world_transform(&self, node: Self::Node) -> Affine;

    /// The graphic attached to `node`, if it has one.
    ///
    /// Callers keep only a weak reference to the result.
    fn graphic(&self, node: Self::Node) -> Option<Rc<RefCell<Self::Graphic>>>;
}
