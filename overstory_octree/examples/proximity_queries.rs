// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sphere and ray queries over a self-balancing point octree.
//!
//! This example shows:
//! - inserting labeled points, including one far outside the initial bounds
//!   (the tree grows to take it in),
//! - both query geometries, allocating and buffer-reusing,
//! - removals shrinking the tree back down,
//! - `visit_nodes` as a debug overlay over the node structure.
//!
//! Run:
//! - `cargo run -p overstory_octree --example proximity_queries`

use glam::Vec3;
use overstory_octree::{PointOctree, Ray};

fn main() {
    // A 32-unit world around the origin; nodes never subdivide below 1 unit.
    let mut tree = PointOctree::new(32.0, Vec3::ZERO, 1.0);

    let scene = [
        ("torch", Vec3::new(2.0, 1.0, -3.0)),
        ("chest", Vec3::new(3.5, 0.0, -2.0)),
        ("pillar", Vec3::new(-6.0, 0.0, -3.0)),
        ("fountain", Vec3::new(-5.0, 0.0, 4.0)),
        ("statue", Vec3::new(-4.5, 1.5, 4.5)),
        ("gate", Vec3::new(0.0, 0.0, 14.0)),
        ("lantern", Vec3::new(1.0, 3.0, -2.5)),
        ("bench", Vec3::new(-7.0, 0.0, 3.0)),
        ("well", Vec3::new(8.0, 0.0, 8.0)),
    ];
    for (label, position) in scene {
        tree.add(label, position);
    }

    // Out of bounds: the root doubles until the beacon fits.
    tree.add("beacon", Vec3::new(90.0, 10.0, 0.0));
    println!("{} entries in {:?}", tree.len(), tree.bounds());

    // Everything within 3 units of the torch.
    let near_torch = tree.query_sphere(Vec3::new(2.0, 1.0, -3.0), 3.0);
    println!("near the torch: {near_torch:?}");

    // Line of sight down -z at x=-5: reuses one buffer across queries.
    let mut hits = Vec::new();
    let sight = Ray::new(Vec3::new(-5.0, 0.5, 20.0), Vec3::NEG_Z);
    if tree.query_ray_into(sight, 2.0, &mut hits) {
        println!("along the sight line: {hits:?}");
    }

    // Tear down the far content; the tree shrinks back toward its
    // construction-time extent.
    tree.remove(&"beacon");
    tree.remove_at(&"gate", Vec3::new(0.0, 0.0, 14.0));
    println!("after removals: {:?}", tree.bounds());

    // Debug overlay: one line per node.
    tree.visit_nodes(|view| {
        let labels: Vec<&str> = view.entries.iter().map(|e| e.payload).collect();
        println!(
            "{:indent$}side {:>5} at {:>6.1?}  {labels:?}",
            "",
            view.side_length,
            view.center,
            indent = view.depth * 2,
        );
    });
}
