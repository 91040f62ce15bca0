// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=overstory_octree --heading-base-level=0

//! Overstory Octree: a dynamic point octree for 3D proximity queries.
//!
//! Overstory Octree is a reusable building block for spatial lookups over
//! moving sets of 3D points.
//!
//! - Store arbitrary payloads at [`glam::Vec3`] positions, remove them again
//!   by payload equality.
//! - Query by sphere range or by proximity to a ray, each with an allocating
//!   and a buffer-reusing variant.
//! - The tree maintains itself: octants split past a fixed occupancy, merge
//!   back as they empty, and the root grows to take in out-of-bounds
//!   insertions and shrinks again after removals.
//!
//! Nodes form a strict ownership tree (each split node exclusively owns its
//! eight octants), so there is no interior sharing and no synchronization;
//! mutation requires `&mut` access, as usual.
//!
//! # Example
//!
//! ```rust
//! use glam::Vec3;
//! use overstory_octree::{PointOctree, Ray};
//!
//! // A 16-unit world around the origin; nodes never shrink below 1 unit.
//! let mut tree = PointOctree::new(16.0, Vec3::ZERO, 1.0);
//! tree.add("lamp", Vec3::new(2.0, 0.5, -1.0));
//! tree.add("door", Vec3::new(-6.0, 0.0, 3.0));
//! tree.add("key", Vec3::new(2.5, 0.0, -1.5));
//!
//! // Sphere range: everything within 2 units of the lamp.
//! let mut near = tree.query_sphere(Vec3::new(2.0, 0.5, -1.0), 2.0);
//! near.sort_unstable();
//! assert_eq!(near, ["key", "lamp"]);
//!
//! // Ray proximity: everything within half a unit of a line of sight.
//! let ray = Ray::new(Vec3::new(-10.0, 0.0, 3.0), Vec3::X);
//! assert_eq!(tree.query_ray(ray, 0.5), ["door"]);
//!
//! // Positions outside the current bounds grow the tree transparently.
//! assert!(tree.add("far beacon", Vec3::new(500.0, 0.0, 0.0)));
//! assert_eq!(tree.len(), 4);
//! ```
//!
//! # Queries without allocation
//!
//! Each query has an `_into` form that reuses a caller-owned buffer and
//! returns whether anything matched:
//!
//! ```rust
//! use glam::Vec3;
//! use overstory_octree::PointOctree;
//!
//! let mut tree = PointOctree::new(8.0, Vec3::ZERO, 1.0);
//! tree.add(7_u32, Vec3::ZERO);
//!
//! let mut hits = Vec::new();
//! assert!(tree.query_sphere_into(Vec3::ZERO, 1.0, &mut hits));
//! assert_eq!(hits, [7]);
//! ```
//!
//! # Tuning
//!
//! Construction takes three parameters, fixed for the lifetime of the tree:
//! the initial side length (make it loosely cover the expected extent; growth
//! handles outliers), the initial center, and the minimum node size. The
//! minimum size caps subdivision depth: a node at the floor holds any number
//! of entries rather than splitting further, which keeps degenerate clusters
//! (many points at one spot) from recursing forever.
//!
//! # Visualization and debugging
//!
//! [`PointOctree::visit_nodes`] walks the node structure read-only, exposing
//! each node's center, side length, depth, and direct entries via
//! [`NodeView`] — enough to draw bounds and stored points in a debug overlay
//! without reaching into tree internals.
//!
//! # Float semantics
//!
//! Coordinates are `f32` and must be finite; [`PointOctree::add`] rejects
//! NaN/infinite positions by returning `false`. Distance comparisons are
//! squared and boundary-inclusive. Ray directions are unit length by
//! convention and are never normalized by this crate.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod node;
mod octree;
mod types;

pub use node::{NodeView, PointEntry};
pub use octree::PointOctree;
pub use types::{Aabb3, Ray};
