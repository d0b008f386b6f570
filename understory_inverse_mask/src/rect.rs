// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rect transforms and fitting one onto another.

use kurbo::{Point, Rect, Size, Vec2};

/// Normalized center of a rect, used as pivot and anchor.
pub const PIVOT_CENTER: Point = Point::new(0.5, 0.5);

/// Anchored rectangle layout of a node.
///
/// `position` and `rotation` are in world space; `local_scale` is relative to the
/// parent. `pivot`, `anchor_min` and `anchor_max` are normalized (`0..=1`).
/// Anchors are fractions of `parent_size`; `size_delta` is added on top of the
/// anchored span.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RectTransform {
    /// World-space position of the pivot.
    pub position: Point,
    /// World-space rotation in radians.
    pub rotation: f64,
    /// Scale relative to the parent.
    pub local_scale: Vec2,
    /// Normalized pivot inside the rect.
    pub pivot: Point,
    /// Normalized lower-left anchor in the parent rect.
    pub anchor_min: Point,
    /// Normalized upper-right anchor in the parent rect.
    pub anchor_max: Point,
    /// Size added to the span between the anchors.
    pub size_delta: Size,
    /// Size of the parent rect the anchors refer to.
    pub parent_size: Size,
}

impl Default for RectTransform {
    fn default() -> Self {
        Self {
            position: Point::ZERO,
            rotation: 0.0,
            local_scale: Vec2::new(1.0, 1.0),
            pivot: PIVOT_CENTER,
            anchor_min: PIVOT_CENTER,
            anchor_max: PIVOT_CENTER,
            size_delta: Size::ZERO,
            parent_size: Size::ZERO,
        }
    }
}

impl RectTransform {
    /// A rect of `size` centered on `position`, anchored at the parent's center.
    pub fn centered(position: Point, size: Size) -> Self {
        Self {
            position,
            size_delta: size,
            ..Default::default()
        }
    }

    /// Resolved size: the anchored span of the parent plus `size_delta`.
    pub fn size(&self) -> Size {
        let span = self.anchor_max - self.anchor_min;
        Size::new(
            span.x * self.parent_size.width + self.size_delta.width,
            span.y * self.parent_size.height + self.size_delta.height,
        )
    }

    /// The rect in local space, with the pivot at the origin.
    pub fn rect(&self) -> Rect {
        let size = self.size();
        let x0 = -self.pivot.x * size.width;
        let y0 = -self.pivot.y * size.height;
        Rect::new(x0, y0, x0 + size.width, y0 + size.height)
    }

    /// Make this rect congruent with `target`.
    ///
    /// Copies position, rotation, scale, pivot, and the resolved size. Both anchors
    /// collapse to [`PIVOT_CENTER`] so the size no longer depends on the parent.
    pub fn fit_to(&mut self, target: &Self) {
        self.position = target.position;
        self.rotation = target.rotation;
        self.local_scale = target.local_scale;
        self.pivot = target.pivot;
        self.size_delta = target.rect().size();
        self.anchor_min = PIVOT_CENTER;
        self.anchor_max = PIVOT_CENTER;
    }
}
