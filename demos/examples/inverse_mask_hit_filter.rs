// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit filtering through an inverse mask.
//!
//! Pointer input inside the hole should reach whatever shows through it, so
//! the filter rejects exactly the points inside the mask's rect. A camera maps
//! screen space to world space.
//!
//! Run:
//! - `cargo run -p understory_demos --example inverse_mask_hit_filter`

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Affine, Point, Size, Vec2};
use understory_inverse_mask::{
    Camera, InverseMask, InverseMaskHitFilter, InverseMaskSettings, MaskScene, RectTransform,
};
use understory_mask_tree::{LocalNode, MaskTree, NodeFlags, TreeMaterial};

fn main() {
    env_logger::init();

    let mut tree = MaskTree::new();
    let canvas = tree.insert(
        None,
        LocalNode {
            flags: NodeFlags::ACTIVE | NodeFlags::CANVAS,
            ..LocalNode::default()
        },
    );
    // The hole follows a button that moves every frame.
    let button = tree.insert(
        Some(canvas),
        LocalNode {
            rect: RectTransform::centered(Point::new(50.0, 50.0), Size::new(40.0, 20.0)),
            ..LocalNode::default()
        },
    );
    let hole = tree.insert(Some(canvas), LocalNode::default());
    let _ = tree.attach_graphic(hole, TreeMaterial::new("hole"));

    let inverse = Rc::new(RefCell::new(InverseMask::with_settings(
        hole,
        InverseMaskSettings {
            fit_target: Some(button),
            fit_on_late_update: true,
            ..InverseMaskSettings::default()
        },
    )));
    inverse.borrow_mut().enable(&mut tree);
    let filter = InverseMaskHitFilter::new(&inverse);

    // Screen is the world scaled by two and shifted right.
    let camera = Camera {
        world_to_screen: Affine::translate(Vec2::new(10.0, 0.0)) * Affine::scale(2.0),
    };

    for frame in 0..3 {
        let x = 50.0 + 30.0 * f64::from(frame);
        let mut rect = tree.rect_transform(button).unwrap_or_default();
        rect.position = Point::new(x, 50.0);
        tree.set_rect_transform(button, rect);
        inverse.borrow_mut().late_update(&mut tree, false);

        let center = camera.world_to_screen * Point::new(x, 50.0);
        let beside = camera.world_to_screen * Point::new(x + 40.0, 50.0);
        println!(
            "frame {frame}: hit at {center:?} valid = {}, at {beside:?} valid = {}",
            filter.is_point_valid(&tree, center, Some(&camera)),
            filter.is_point_valid(&tree, beside, Some(&camera)),
        );
    }

    drop(inverse);
    log::info!("mask dropped; filter now passes everything");
    println!(
        "after drop: valid = {}",
        filter.is_point_valid(&tree, Point::new(110.0, 100.0), Some(&camera))
    );
}
