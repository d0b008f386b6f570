// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inverse mask basics.
//!
//! Punch a hole into a masked panel, print the draw list, then sample a few
//! points with and without child-only mode.
//!
//! Run:
//! - `RUST_LOG=trace cargo run -p understory_demos --example inverse_mask_basics`

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Point, Size};
use understory_inverse_mask::{InverseMask, RectTransform, StencilMaterialCache};
use understory_mask_tree::{LocalNode, MaskTree, NodeFlags, NodeId, StencilTrace, TreeMaterial};

fn square(flags: NodeFlags, x: f64, y: f64, size: f64) -> LocalNode {
    LocalNode {
        rect: RectTransform::centered(Point::new(x, y), Size::new(size, size)),
        flags,
    }
}

fn main() {
    env_logger::init();

    // Canvas → mask → { hole → badge, panel }
    let mut tree = MaskTree::new();
    let canvas = tree.insert(
        None,
        square(NodeFlags::ACTIVE | NodeFlags::CANVAS, 0.0, 0.0, 0.0),
    );
    let mask = tree.insert(
        Some(canvas),
        square(NodeFlags::ACTIVE | NodeFlags::MASK, 100.0, 100.0, 200.0),
    );
    let hole = tree.insert(Some(mask), square(NodeFlags::ACTIVE, 100.0, 100.0, 60.0));
    let badge = tree.insert(Some(hole), square(NodeFlags::ACTIVE, 100.0, 100.0, 200.0));
    let panel = tree.insert(Some(mask), square(NodeFlags::ACTIVE, 100.0, 100.0, 200.0));
    let names = [(mask, "mask"), (hole, "hole"), (badge, "badge"), (panel, "panel")];
    for (id, shader) in names {
        let _ = tree.attach_graphic(id, TreeMaterial::new(shader));
    }

    let inverse = Rc::new(RefCell::new(InverseMask::<MaskTree>::new(hole)));
    inverse.borrow_mut().enable(&mut tree);
    tree.add_modifier(hole, inverse.clone());

    let mut cache = StencilMaterialCache::new();
    let name = |id: NodeId| names.iter().find(|(n, _)| *n == id).map_or("?", |(_, s)| *s);

    for only_for_children in [false, true] {
        inverse
            .borrow_mut()
            .set_only_for_children(&tree, only_for_children);
        let draws = tree.draw_list(&mut cache);
        println!("only_for_children = {only_for_children}");
        for draw in &draws {
            let stencil = draw
                .material
                .stencil
                .map(|s| (s.op, s.compare, s.reference, s.write_mask));
            println!("  {:>5} {:?}: {:?}", name(draw.node), draw.pass, stencil);
        }
        for point in [Point::new(100.0, 100.0), Point::new(20.0, 20.0)] {
            let trace = StencilTrace::at(&draws, point);
            let painted: Vec<_> = trace.painted.iter().map(|id| name(*id)).collect();
            println!("  at {point:?}: painted {painted:?}, stencil {}", trace.stencil);
        }
        println!("  cached materials: {}", cache.len());
    }

    inverse.borrow_mut().disable(&tree, &mut cache);
    println!("after disable: cached materials: {}", cache.len());
}
