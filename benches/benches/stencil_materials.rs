// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::rc::Rc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Size};
use understory_inverse_mask::{
    InverseMask, InverseMaskSettings, RectTransform, StencilMaterialCache, inverse_mask_stencil,
};
use understory_mask_tree::{LocalNode, MaskTree, NodeFlags, NodeId, TreeMaterial};

const SHADERS: [&str; 4] = ["ui", "text", "image", "gradient"];

fn gen_bases(n: usize) -> Vec<TreeMaterial> {
    (0..n).map(|i| TreeMaterial::new(SHADERS[i % SHADERS.len()])).collect()
}

fn square(flags: NodeFlags, x: f64, y: f64, size: f64) -> LocalNode {
    LocalNode {
        rect: RectTransform::centered(Point::new(x, y), Size::new(size, size)),
        flags,
    }
}

/// A canvas with `n` side-by-side masks, each holding an inverse mask and a panel.
fn gen_masked_panels(
    n: usize,
    only_for_children: bool,
) -> (MaskTree, Vec<Rc<RefCell<InverseMask<MaskTree>>>>) {
    let mut tree = MaskTree::new();
    let canvas = tree.insert(
        None,
        square(NodeFlags::ACTIVE | NodeFlags::CANVAS, 0.0, 0.0, 0.0),
    );
    let mut inverses = Vec::with_capacity(n);
    for i in 0..n {
        let x = i as f64 * 120.0;
        let mask = tree.insert(
            Some(canvas),
            square(NodeFlags::ACTIVE | NodeFlags::MASK, x, 0.0, 100.0),
        );
        let hole = tree.insert(Some(mask), square(NodeFlags::ACTIVE, x, 0.0, 30.0));
        let panel: NodeId = tree.insert(Some(hole), square(NodeFlags::ACTIVE, x, 0.0, 100.0));
        for id in [mask, hole, panel] {
            let _ = tree.attach_graphic(id, TreeMaterial::new(SHADERS[i % SHADERS.len()]));
        }
        let inverse = Rc::new(RefCell::new(InverseMask::with_settings(
            hole,
            InverseMaskSettings {
                only_for_children,
                ..InverseMaskSettings::default()
            },
        )));
        inverse.borrow_mut().enable(&mut tree);
        tree.add_modifier(hole, inverse.clone());
        inverses.push(inverse);
    }
    (tree, inverses)
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    for &n in &[16usize, 256, 1024] {
        let bases = gen_bases(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("add_remove_distinct_n{}", n), |b| {
            b.iter_batched(
                StencilMaterialCache::<TreeMaterial>::new,
                |mut cache| {
                    let ids: Vec<_> = bases
                        .iter()
                        .enumerate()
                        .map(|(i, base)| {
                            cache.add(base, inverse_mask_stencil((i % 9) as u32, i % 2 == 0))
                        })
                        .collect();
                    black_box(cache.len());
                    for id in ids {
                        cache.remove(Some(id));
                    }
                    black_box(cache.is_empty());
                },
                BatchSize::SmallInput,
            )
        });
    }
    let base = TreeMaterial::new("ui");
    group.bench_function("replace_shared_key", |b| {
        let mut cache = StencilMaterialCache::new();
        let mut held = cache.add(&base, inverse_mask_stencil(3, false));
        b.iter(|| {
            cache.remove(Some(held));
            held = cache.add(&base, inverse_mask_stencil(3, false));
            black_box(held);
        })
    });
    group.finish();
}

fn bench_draw_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_list");
    for &n in &[8usize, 64, 256] {
        group.throughput(Throughput::Elements(n as u64));
        for only_for_children in [false, true] {
            let (mut tree, _inverses) = gen_masked_panels(n, only_for_children);
            let mut cache = StencilMaterialCache::new();
            let name = if only_for_children { "child_only" } else { "plain" };
            group.bench_function(format!("{}_n{}", name, n), |b| {
                b.iter(|| {
                    let draws = tree.draw_list(&mut cache);
                    black_box(draws.len());
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_cache, bench_draw_list);
criterion_main!(benches);
