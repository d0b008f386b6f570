// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit-test filtering for inverse masks.
//!
//! Pointer input should reach whatever shows through the hole, so a point is
//! rejected while it is inside the inverse mask's rect. This is the opposite of
//! the usual "inside the region is a hit" rule.

use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

use kurbo::{Affine, Point};

use crate::mask::InverseMask;
use crate::scene::MaskScene;

/// Projection between world space and screen space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    /// World-to-screen transform.
    pub world_to_screen: Affine,
}

impl Camera {
    /// Map a screen-space point back into world space.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.world_to_screen.inverse() * screen_point
    }
}

/// Whether `screen_point` falls inside `node`'s rect.
///
/// Without a camera, screen space is world space (an overlay canvas). Nodes without
/// a rect transform contain nothing. The rect is half-open: its minimum edges are
/// inside, its maximum edges are not.
pub fn rectangle_contains_screen_point<S: MaskScene>(
    scene: &S,
    node: S::Node,
    screen_point: Point,
    camera: Option<&Camera>,
) -> bool {
    let Some(rect) = scene.rect_transform(node) else {
        return false;
    };
    let world_point = camera.map_or(screen_point, |c| c.screen_to_world(screen_point));
    let local_point = scene.world_transform(node).inverse() * world_point;
    rect.rect().contains(local_point)
}

/// Rejects hits inside an [`InverseMask`]'s shape.
///
/// Holds a weak reference: dropping the mask turns the filter into a pass-through.
/// The filter may sit on its own node (see [`set_owner`](Self::set_owner)); while
/// that node is inactive the filter accepts everything.
pub struct InverseMaskHitFilter<S: MaskScene> {
    enabled: bool,
    owner: Option<S::Node>,
    target: Option<Weak<RefCell<InverseMask<S>>>>,
}

impl<S: MaskScene> core::fmt::Debug for InverseMaskHitFilter<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InverseMaskHitFilter")
            .field("enabled", &self.enabled)
            .field("owner", &self.owner)
            .field("has_target", &self.target().is_some())
            .finish()
    }
}

impl<S: MaskScene> Default for InverseMaskHitFilter<S> {
    fn default() -> Self {
        Self {
            enabled: true,
            owner: None,
            target: None,
        }
    }
}

impl<S: MaskScene> InverseMaskHitFilter<S> {
    /// An enabled filter querying `target`.
    pub fn new(target: &Rc<RefCell<InverseMask<S>>>) -> Self {
        Self {
            enabled: true,
            owner: None,
            target: Some(Rc::downgrade(target)),
        }
    }

    /// Whether the filter is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the filter. A disabled filter accepts every point.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Node the filter itself is attached to, if any.
    pub fn owner(&self) -> Option<S::Node> {
        self.owner
    }

    /// Attach the filter to a node whose activity gates it.
    pub fn set_owner(&mut self, owner: Option<S::Node>) {
        self.owner = owner;
    }

    /// Enabled, and its owner node (if any) is active in the hierarchy.
    pub fn is_active_and_enabled(&self, scene: &S) -> bool {
        self.enabled && self.owner.is_none_or(|n| scene.is_active_in_hierarchy(n))
    }

    /// The mask being queried, if it is still alive.
    pub fn target(&self) -> Option<Rc<RefCell<InverseMask<S>>>> {
        self.target.as_ref().and_then(Weak::upgrade)
    }

    /// Change the mask being queried.
    pub fn set_target(&mut self, target: Option<&Rc<RefCell<InverseMask<S>>>>) {
        self.target = target.map(Rc::downgrade);
    }

    /// Whether a hit at `screen_point` should be accepted.
    ///
    /// Accepts everything while the filter is disabled or inactive, or its mask is
    /// missing, dropped, or inactive. Otherwise accepts exactly the points outside
    /// the mask's rect.
    ///
    /// Panics if the mask is mutably borrowed.
    pub fn is_point_valid(&self, scene: &S, screen_point: Point, camera: Option<&Camera>) -> bool {
        if !self.is_active_and_enabled(scene) {
            return true;
        }
        let Some(mask) = self.target() else {
            return true;
        };
        let mask = mask.borrow();
        if !mask.is_active_and_enabled(scene) {
            return true;
        }
        !rectangle_contains_screen_point(scene, mask.node(), screen_point, camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::RectTransform;
    use crate::testing::TestScene;
    use kurbo::{Size, Vec2};

    /// A 100×50 rect centered at (200, 100).
    fn scene_with_mask() -> (TestScene, Rc<RefCell<InverseMask<TestScene>>>) {
        let mut scene = TestScene::default();
        let root = scene.add(None);
        let node = scene.add(Some(root));
        scene.node_mut(node).rect = Some(RectTransform::centered(
            Point::new(200.0, 100.0),
            Size::new(100.0, 50.0),
        ));
        scene.node_mut(node).world = Affine::translate(Vec2::new(200.0, 100.0));
        let mask = Rc::new(RefCell::new(InverseMask::new(node)));
        mask.borrow_mut().enable(&mut scene);
        (scene, mask)
    }

    #[test]
    fn inside_is_rejected_outside_is_accepted() {
        let (scene, mask) = scene_with_mask();
        let filter = InverseMaskHitFilter::new(&mask);
        assert!(!filter.is_point_valid(&scene, Point::new(200.0, 100.0), None));
        assert!(!filter.is_point_valid(&scene, Point::new(160.0, 80.0), None));
        assert!(filter.is_point_valid(&scene, Point::new(260.0, 100.0), None));
        assert!(filter.is_point_valid(&scene, Point::new(200.0, 130.0), None));
    }

    #[test]
    fn disabled_filter_or_mask_accepts_everything() {
        let (mut scene, mask) = scene_with_mask();
        let inside = Point::new(200.0, 100.0);
        let mut filter = InverseMaskHitFilter::new(&mask);

        filter.set_enabled(false);
        assert!(filter.is_point_valid(&scene, inside, None));
        filter.set_enabled(true);

        let node = mask.borrow().node();
        scene.node_mut(node).active = false;
        assert!(filter.is_point_valid(&scene, inside, None));
        scene.node_mut(node).active = true;
        assert!(!filter.is_point_valid(&scene, inside, None));

        let mut cache = crate::StencilMaterialCache::new();
        mask.borrow_mut().disable(&scene, &mut cache);
        assert!(filter.is_point_valid(&scene, inside, None));
    }

    #[test]
    fn inactive_owner_accepts_everything() {
        let (mut scene, mask) = scene_with_mask();
        let inside = Point::new(200.0, 100.0);
        let owner = scene.add(None);
        let mut filter = InverseMaskHitFilter::new(&mask);
        filter.set_owner(Some(owner));
        assert!(!filter.is_point_valid(&scene, inside, None));

        scene.node_mut(owner).active = false;
        assert!(!filter.is_active_and_enabled(&scene));
        assert!(filter.is_point_valid(&scene, inside, None));
    }

    #[test]
    fn missing_or_dropped_target_accepts_everything() {
        let (scene, mask) = scene_with_mask();
        let inside = Point::new(200.0, 100.0);
        let none: InverseMaskHitFilter<TestScene> = InverseMaskHitFilter::default();
        assert!(none.is_point_valid(&scene, inside, None));

        let filter = InverseMaskHitFilter::new(&mask);
        drop(mask);
        assert!(filter.target().is_none());
        assert!(filter.is_point_valid(&scene, inside, None));
    }

    #[test]
    fn camera_maps_screen_to_world() {
        let (scene, mask) = scene_with_mask();
        let filter = InverseMaskHitFilter::new(&mask);
        // Screen is the world scaled by two.
        let camera = Camera {
            world_to_screen: Affine::scale(2.0),
        };
        assert!(!filter.is_point_valid(&scene, Point::new(400.0, 200.0), Some(&camera)));
        assert!(filter.is_point_valid(&scene, Point::new(200.0, 100.0), Some(&camera)));
    }

    #[test]
    fn rotated_mask_uses_local_space() {
        let (mut scene, mask) = scene_with_mask();
        let node = mask.borrow().node();
        scene.node_mut(node).world = Affine::translate(Vec2::new(200.0, 100.0))
            * Affine::rotate(core::f64::consts::FRAC_PI_2);
        let filter = InverseMaskHitFilter::new(&mask);
        // The 100×50 rect now spans 50 wide and 100 tall in world space.
        assert!(!filter.is_point_valid(&scene, Point::new(200.0, 140.0), None));
        assert!(filter.is_point_valid(&scene, Point::new(240.0, 100.0), None));
    }

    #[test]
    fn rect_edges_are_half_open() {
        let (scene, mask) = scene_with_mask();
        let node = mask.borrow().node();
        assert!(rectangle_contains_screen_point(&scene, node, Point::new(150.0, 75.0), None));
        assert!(!rectangle_contains_screen_point(&scene, node, Point::new(250.0, 125.0), None));
    }
}
