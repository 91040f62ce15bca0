// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `PointOctree` API: root ownership, growth, and shrinking.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem;

use glam::Vec3;

use crate::node::{NodeView, OctreeNode};
use crate::types::{Aabb3, Ray};

/// Growth doubles the root side length each step, so this many steps take any
/// positive side length past `f32::MAX`. Hitting the cap means the position
/// cannot be brought inside representable bounds; the add is reported as a
/// failure instead of looping.
const MAX_GROW_STEPS: usize = 128;

/// Per-axis growth direction: +1 where `direction` is non-negative, -1
/// elsewhere.
fn octant_signs(direction: Vec3) -> Vec3 {
    Vec3::new(
        if direction.x >= 0.0 { 1.0 } else { -1.0 },
        if direction.y >= 0.0 { 1.0 } else { -1.0 },
        if direction.z >= 0.0 { 1.0 } else { -1.0 },
    )
}

/// A dynamic octree over 3D points.
///
/// Payloads of type `T` are stored at [`Vec3`] positions. The tree starts as
/// a single cubic region and:
///
/// - subdivides a region into eight octants once it holds more than a fixed
///   number of entries (unless that would take it below the minimum node
///   size),
/// - folds octants back together as removals empty them out,
/// - grows outward to take in positions outside its current bounds, and
/// - shrinks back toward its construction-time extent when content allows.
///
/// Queries come in two geometries, each with an allocating and a
/// buffer-reusing form: sphere range ([`Self::query_sphere`],
/// [`Self::query_sphere_into`]) and ray proximity ([`Self::query_ray`],
/// [`Self::query_ray_into`]).
///
/// # Example
///
/// ```rust
/// use glam::Vec3;
/// use overstory_octree::PointOctree;
///
/// let mut tree = PointOctree::new(16.0, Vec3::ZERO, 1.0);
/// tree.add("a", Vec3::new(1.0, 2.0, 3.0));
/// tree.add("b", Vec3::new(-4.0, 0.0, 0.5));
///
/// let near_origin = tree.query_sphere(Vec3::ZERO, 5.0);
/// assert_eq!(near_origin.len(), 2);
///
/// assert!(tree.remove(&"a"));
/// assert_eq!(tree.len(), 1);
/// ```
///
/// # Float semantics
///
/// Positions must be finite; [`Self::add`] rejects NaN and infinite
/// coordinates by returning `false`. All distance comparisons are squared
/// and inclusive of the boundary.
pub struct PointOctree<T> {
    root: OctreeNode<T>,
    initial_size: f32,
    min_size: f32,
    len: usize,
}

impl<T> core::fmt::Debug for PointOctree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PointOctree")
            .field("len", &self.len)
            .field("center", &self.root.center)
            .field("side_length", &self.root.side_length)
            .field("initial_size", &self.initial_size)
            .field("min_size", &self.min_size)
            .finish_non_exhaustive()
    }
}

impl<T> PointOctree<T> {
    /// Create an empty octree covering a cube of side `initial_size` around
    /// `center`, never subdividing nodes below `min_node_size`.
    ///
    /// The three parameters are fixed for the lifetime of the tree; growth
    /// enlarges the root but shrinking stops at `initial_size`.
    ///
    /// # Panics
    ///
    /// Panics if `initial_size` is not strictly positive and finite, if
    /// `min_node_size` is not strictly positive and finite, if
    /// `min_node_size` is not smaller than `initial_size`, or if `center`
    /// is not finite.
    pub fn new(initial_size: f32, center: Vec3, min_node_size: f32) -> Self {
        assert!(
            initial_size.is_finite() && initial_size > 0.0,
            "initial_size must be positive and finite"
        );
        assert!(
            min_node_size.is_finite() && min_node_size > 0.0,
            "min_node_size must be positive and finite"
        );
        assert!(
            min_node_size < initial_size,
            "min_node_size must be smaller than initial_size"
        );
        assert!(center.is_finite(), "center must be finite");
        Self {
            root: OctreeNode::new(initial_size, min_node_size, center),
            initial_size,
            min_size: min_node_size,
            len: 0,
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current bounds of the root region.
    ///
    /// Growth enlarges these beyond the construction-time extent; shrinking
    /// contracts them back down, but never below it.
    pub fn bounds(&self) -> Aabb3 {
        self.root.bounds()
    }

    /// Store `payload` at `position`, growing the tree as needed.
    ///
    /// Returns `false` (and stores nothing) if the position is not finite or
    /// growth cannot bring it inside representable bounds.
    pub fn add(&mut self, payload: T, position: Vec3) -> bool {
        if !position.is_finite() {
            return false;
        }
        // Plan the growth on plain geometry first, so a position too far to
        // ever contain fails without disturbing the tree.
        let mut steps = 0;
        let mut center = self.root.center;
        let mut side = self.root.side_length;
        while !Aabb3::from_center_size(center, side).contains_point(position) {
            if steps == MAX_GROW_STEPS {
                return false;
            }
            center += octant_signs(position - center) * (side / 2.0);
            side *= 2.0;
            steps += 1;
        }
        for _ in 0..steps {
            self.grow(position - self.root.center);
        }
        let added = self.root.add(payload, position);
        if added {
            self.len += 1;
        }
        added
    }

    /// Remove the first entry whose payload equals `payload`, searching the
    /// whole tree. Returns `false` if no such entry exists.
    pub fn remove(&mut self, payload: &T) -> bool
    where
        T: PartialEq,
    {
        let removed = self.root.remove(payload);
        if removed {
            self.len -= 1;
            self.shrink();
        }
        removed
    }

    /// Remove `payload` stored at `position`.
    ///
    /// Faster than [`Self::remove`]: the search descends only the octants
    /// that can contain `position`. Returns `false` if the payload is not
    /// stored there — including when `position` lies outside the current
    /// bounds entirely.
    pub fn remove_at(&mut self, payload: &T, position: Vec3) -> bool
    where
        T: PartialEq,
    {
        let removed = self.root.remove_at(payload, position);
        if removed {
            self.len -= 1;
            self.shrink();
        }
        removed
    }

    /// Payloads within `max_distance` of `center`, boundary inclusive.
    pub fn query_sphere(&self, center: Vec3, max_distance: f32) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = Vec::new();
        self.root.nearby_in_sphere(center, max_distance, &mut out);
        out
    }

    /// Like [`Self::query_sphere`], but reusing a caller-owned buffer.
    ///
    /// Clears `out`, fills it with the matches, and returns whether any
    /// were found.
    pub fn query_sphere_into(&self, center: Vec3, max_distance: f32, out: &mut Vec<T>) -> bool
    where
        T: Clone,
    {
        out.clear();
        self.root.nearby_in_sphere(center, max_distance, out);
        !out.is_empty()
    }

    /// Payloads within `max_distance` of `ray`, boundary inclusive.
    ///
    /// Distance is measured perpendicular to the infinite line carrying the
    /// ray; the ray's direction is assumed to be unit length.
    pub fn query_ray(&self, ray: Ray, max_distance: f32) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = Vec::new();
        self.root.nearby_along_ray(&ray, max_distance, &mut out);
        out
    }

    /// Like [`Self::query_ray`], but reusing a caller-owned buffer.
    ///
    /// Clears `out`, fills it with the matches, and returns whether any
    /// were found.
    pub fn query_ray_into(&self, ray: Ray, max_distance: f32, out: &mut Vec<T>) -> bool
    where
        T: Clone,
    {
        out.clear();
        self.root.nearby_along_ray(&ray, max_distance, out);
        !out.is_empty()
    }

    /// Every stored payload, depth-first pre-order.
    pub fn collect_all(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect_all(&mut out);
        out
    }

    /// Walk every node depth-first pre-order, reporting center, side length,
    /// depth, and direct entries through [`NodeView`].
    ///
    /// This is the read-only introspection surface for visualization and
    /// debugging collaborators; node internals are not exposed otherwise.
    pub fn visit_nodes<F>(&self, mut f: F)
    where
        F: FnMut(NodeView<'_, T>),
    {
        self.root.visit_nodes(0, &mut f);
    }

    /// Double the root's extent toward `direction`, re-rooting the tree.
    ///
    /// The old root becomes the child octant it maps to under the new
    /// center; its seven new siblings start empty at the old size. An old
    /// root with no content anywhere is simply dropped.
    fn grow(&mut self, direction: Vec3) {
        let old_length = self.root.side_length;
        let new_center = self.root.center + octant_signs(direction) * (old_length / 2.0);
        let old_root = mem::replace(
            &mut self.root,
            OctreeNode::new(old_length * 2.0, self.min_size, new_center),
        );
        if old_root.has_any_entries() {
            let octant = self.root.best_fit_child(old_root.center);
            let mut old_root = Some(old_root);
            let root = &self.root;
            let children = Box::new(core::array::from_fn(|i| {
                if i == octant {
                    old_root
                        .take()
                        .expect("the old root fills exactly one octant")
                } else {
                    OctreeNode::new(old_length, self.min_size, root.child_center(i))
                }
            }));
            self.root.adopt_children(children);
        }
    }

    /// Contract the root where possible, never below the construction-time
    /// extent.
    fn shrink(&mut self) {
        self.root.shrink_if_possible(self.initial_size);
    }
}
