// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types shared by the tree and its queries.

use glam::Vec3;

/// Axis-aligned bounding box in 3D.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb3 {
    /// Create a new AABB from min/max corners.
    #[inline(always)]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a cubic AABB from its center and side length.
    #[inline]
    pub fn from_center_size(center: Vec3, size: f32) -> Self {
        let half = Vec3::splat(size * 0.5);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Whether this AABB contains the point.
    ///
    /// The faces of the box are considered part of it, so a point exactly on
    /// a face is contained.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// The point inside this AABB closest to `point`.
    #[inline]
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    /// Squared distance from `point` to this AABB (zero if inside).
    #[inline]
    pub fn distance_squared_to(&self, point: Vec3) -> f32 {
        self.closest_point(point).distance_squared(point)
    }

    /// A copy of this AABB grown outward by `amount` on every face.
    #[inline]
    pub fn inflated(&self, amount: f32) -> Self {
        let d = Vec3::splat(amount);
        Self {
            min: self.min - d,
            max: self.max + d,
        }
    }

    /// Whether `ray` intersects this AABB.
    ///
    /// The ray extends from its origin in its direction only; boxes entirely
    /// behind the origin do not intersect.
    #[inline]
    pub fn intersects_ray(&self, ray: &Ray) -> bool {
        // Slab test. A zero direction component yields ±inf slab times, and
        // an origin exactly on such a slab plane yields NaN, which the
        // min/max folds below discard.
        let inv = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv;
        let t1 = (self.max - ray.origin) * inv;
        let enter = t0.min(t1).max_element().max(0.0);
        let exit = t0.max(t1).min_element();
        enter <= exit
    }
}

/// A ray: origin plus direction.
///
/// The direction is assumed to be unit length by convention; it is stored as
/// given and never normalized. Distance comparisons below rely on that
/// convention.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    /// Ray origin.
    pub origin: Vec3,
    /// Ray direction (unit length by convention).
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray. The direction should be unit length.
    #[inline(always)]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Squared perpendicular distance from `point` to the infinite line
    /// carrying this ray.
    #[inline]
    pub fn distance_squared_to(&self, point: Vec3) -> f32 {
        self.direction.cross(point - self.origin).length_squared()
    }
}
