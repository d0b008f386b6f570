// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stencil depth: how many masks enclose a node.

use crate::scene::{CanvasSorting, MaskHierarchy};

/// Count the active masks strictly between `node` and `stop_at`.
///
/// Walks from `node`'s parent towards the root. The walk ends at `stop_at`, which is
/// not counted, or after the root. `node == stop_at` yields `0`, as does a node with
/// no masking ancestors.
///
/// The result is the number of stencil bits already claimed above `node`; see
/// [`buffer_mask`](crate::buffer_mask).
pub fn stencil_depth<H: MaskHierarchy + ?Sized>(
    hierarchy: &H,
    node: H::Node,
    stop_at: Option<H::Node>,
) -> u32 {
    if stop_at == Some(node) {
        return 0;
    }
    let mut depth = 0;
    let mut current = hierarchy.parent(node);
    while let Some(ancestor) = current {
        if stop_at == Some(ancestor) {
            break;
        }
        if hierarchy.is_active_mask(ancestor) {
            depth += 1;
        }
        current = hierarchy.parent(ancestor);
    }
    depth
}

/// The canvas that bounds stencil nesting for `node`.
///
/// Walks from `node` itself towards the root. The first canvas that overrides
/// sorting wins; otherwise the outermost canvas is returned. `None` if `node` is
/// not under any canvas.
pub fn find_root_sort_override_canvas<H: MaskHierarchy + ?Sized>(
    hierarchy: &H,
    node: H::Node,
) -> Option<H::Node> {
    let mut found = None;
    let mut current = Some(node);
    while let Some(n) = current {
        match hierarchy.canvas(n) {
            Some(CanvasSorting::Override) => return Some(n),
            Some(CanvasSorting::Inherit) => found = Some(n),
            None => {}
        }
        current = hierarchy.parent(n);
    }
    found
}
