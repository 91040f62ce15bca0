// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The recursive octant node: storage, split/merge, and query traversal.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem;

use glam::Vec3;
use smallvec::SmallVec;

use crate::types::{Aabb3, Ray};

/// Nodes split once they hold more than this many entries (unless the size
/// floor forbids it). Values around 8-15 tend to work well; the merge
/// condition reuses the same threshold. The inline capacity of a node's entry
/// list matches it, so an unsplit node stores its entries without a heap
/// allocation.
pub(crate) const ENTRY_LIMIT: usize = 8;

/// A payload stored at a position.
#[derive(Clone, Debug, PartialEq)]
pub struct PointEntry<T> {
    /// The stored payload.
    pub payload: T,
    /// Where it is stored.
    pub position: Vec3,
}

/// Read-only view of a single node, passed to
/// [`PointOctree::visit_nodes`][crate::PointOctree::visit_nodes].
#[derive(Debug)]
pub struct NodeView<'a, T> {
    /// Center of the node's cubic region.
    pub center: Vec3,
    /// Side length of the node's cubic region.
    pub side_length: f32,
    /// Depth below the root (the root itself is depth 0).
    pub depth: usize,
    /// Entries stored directly at this node.
    pub entries: &'a [PointEntry<T>],
}

/// A cubic region of space holding entries either directly or in exactly
/// eight child octants.
pub(crate) struct OctreeNode<T> {
    pub(crate) center: Vec3,
    pub(crate) side_length: f32,
    min_size: f32,
    entries: SmallVec<[PointEntry<T>; ENTRY_LIMIT]>,
    children: Option<Box<[OctreeNode<T>; 8]>>,
}

/// Octant of `point` relative to `center`.
///
/// Bit 0 selects +x, bit 1 selects +z, bit 2 selects -y. Points exactly on a
/// splitting plane resolve deterministically: `<=` keeps x and z in the low
/// half, `>=` keeps y in the high half. [`OctreeNode::child_center`] follows
/// the same enumeration.
#[inline]
fn octant_index(center: Vec3, point: Vec3) -> usize {
    (if point.x <= center.x { 0 } else { 1 })
        + (if point.y >= center.y { 0 } else { 4 })
        + (if point.z <= center.z { 0 } else { 2 })
}

impl<T> OctreeNode<T> {
    pub(crate) fn new(side_length: f32, min_size: f32, center: Vec3) -> Self {
        Self {
            center,
            side_length,
            min_size,
            entries: SmallVec::new(),
            children: None,
        }
    }

    pub(crate) fn bounds(&self) -> Aabb3 {
        Aabb3::from_center_size(self.center, self.side_length)
    }

    /// Add an entry somewhere in this subtree. Fails only if `position` is
    /// outside this node's bounds.
    pub(crate) fn add(&mut self, payload: T, position: Vec3) -> bool {
        if !self.bounds().contains_point(position) {
            return false;
        }
        self.sub_add(payload, position);
        true
    }

    /// Add an entry known to lie within this node's bounds.
    fn sub_add(&mut self, payload: T, position: Vec3) {
        // Entries live in the deepest node that will hold them, so a split
        // node never stores directly; go straight down.
        if self.children.is_none() {
            if self.entries.len() < ENTRY_LIMIT || self.side_length / 2.0 < self.min_size {
                self.entries.push(PointEntry { payload, position });
                return;
            }
            self.split();
        }
        let octant = self.best_fit_child(position);
        let children = self
            .children
            .as_mut()
            .expect("split always produces eight children");
        children[octant].sub_add(payload, position);
    }

    /// Remove the first entry in this subtree whose payload equals `payload`.
    pub(crate) fn remove(&mut self, payload: &T) -> bool
    where
        T: PartialEq,
    {
        let mut removed = self.remove_direct(payload);
        if !removed && let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.remove(payload) {
                    removed = true;
                    break;
                }
            }
        }
        if removed && self.children.is_some() && self.should_merge() {
            self.merge();
        }
        removed
    }

    /// Remove `payload` stored at `position`, descending only along the
    /// best-fit path. Fails fast if `position` is outside this node.
    pub(crate) fn remove_at(&mut self, payload: &T, position: Vec3) -> bool
    where
        T: PartialEq,
    {
        if !self.bounds().contains_point(position) {
            return false;
        }
        self.sub_remove(payload, position)
    }

    fn sub_remove(&mut self, payload: &T, position: Vec3) -> bool
    where
        T: PartialEq,
    {
        let mut removed = self.remove_direct(payload);
        if !removed && let Some(children) = self.children.as_mut() {
            let octant = octant_index(self.center, position);
            removed = children[octant].sub_remove(payload, position);
        }
        if removed && self.children.is_some() && self.should_merge() {
            self.merge();
        }
        removed
    }

    fn remove_direct(&mut self, payload: &T) -> bool
    where
        T: PartialEq,
    {
        if let Some(index) = self.entries.iter().position(|e| e.payload == *payload) {
            self.entries.remove(index);
            true
        } else {
            false
        }
    }

    /// The octant of this node that `position` belongs to.
    pub(crate) fn best_fit_child(&self, position: Vec3) -> usize {
        octant_index(self.center, position)
    }

    /// Center of the given child octant, whether or not children exist yet.
    pub(crate) fn child_center(&self, octant: usize) -> Vec3 {
        let quarter = self.side_length / 4.0;
        let x = if octant & 1 == 0 { -quarter } else { quarter };
        let y = if octant & 4 == 0 { quarter } else { -quarter };
        let z = if octant & 2 == 0 { -quarter } else { quarter };
        self.center + Vec3::new(x, y, z)
    }

    /// Create the eight children and push every direct entry down into them.
    fn split(&mut self) {
        let half = self.side_length / 2.0;
        let children = Box::new(core::array::from_fn(|octant| {
            Self::new(half, self.min_size, self.child_center(octant))
        }));
        self.children = Some(children);

        let center = self.center;
        let entries = mem::take(&mut self.entries);
        let children = self
            .children
            .as_mut()
            .expect("split always produces eight children");
        for entry in entries {
            // Re-entering through sub_add lets a child that inherits every
            // entry split again immediately.
            let octant = octant_index(center, entry.position);
            children[octant].sub_add(entry.payload, entry.position);
        }
    }

    /// Whether this node's children can be folded back into it: the combined
    /// entry count fits the threshold and no child is itself split.
    fn should_merge(&self) -> bool {
        let mut total = self.entries.len();
        if let Some(children) = &self.children {
            for child in children.iter() {
                if child.children.is_some() {
                    // Grandchildren are never silently discarded.
                    return false;
                }
                total += child.entries.len();
            }
        }
        total <= ENTRY_LIMIT
    }

    /// Pull every child entry into this node and discard the children.
    fn merge(&mut self) {
        if let Some(children) = self.children.take() {
            for mut child in *children {
                self.entries.append(&mut child.entries);
            }
        }
    }

    /// Collect payloads within `max_distance` of `center` into `out`.
    pub(crate) fn nearby_in_sphere(&self, center: Vec3, max_distance: f32, out: &mut Vec<T>)
    where
        T: Clone,
    {
        let sqr_max_distance = max_distance * max_distance;
        if self.bounds().distance_squared_to(center) > sqr_max_distance {
            return;
        }
        for entry in &self.entries {
            if entry.position.distance_squared(center) <= sqr_max_distance {
                out.push(entry.payload.clone());
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.nearby_in_sphere(center, max_distance, out);
            }
        }
    }

    /// Collect payloads within `max_distance` of `ray` into `out`.
    pub(crate) fn nearby_along_ray(&self, ray: &Ray, max_distance: f32, out: &mut Vec<T>)
    where
        T: Clone,
    {
        // Inflating by the query distance catches entries that sit near a
        // face of the box while the ray passes just outside it.
        if !self.bounds().inflated(max_distance).intersects_ray(ray) {
            return;
        }
        let sqr_max_distance = max_distance * max_distance;
        for entry in &self.entries {
            if ray.distance_squared_to(entry.position) <= sqr_max_distance {
                out.push(entry.payload.clone());
            }
        }
        if let Some(children) = &self.children {
            // Each child repeats the bounds test on entry, so no pre-test
            // happens here.
            for child in children.iter() {
                child.nearby_along_ray(ray, max_distance, out);
            }
        }
    }

    /// Collect every payload in this subtree, depth-first pre-order.
    pub(crate) fn collect_all(&self, out: &mut Vec<T>)
    where
        T: Clone,
    {
        out.extend(self.entries.iter().map(|e| e.payload.clone()));
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_all(out);
            }
        }
    }

    pub(crate) fn has_any_entries(&self) -> bool {
        if !self.entries.is_empty() {
            return true;
        }
        self.children
            .as_ref()
            .is_some_and(|children| children.iter().any(Self::has_any_entries))
    }

    /// Walk this subtree depth-first pre-order, reporting one view per node.
    pub(crate) fn visit_nodes<F>(&self, depth: usize, f: &mut F)
    where
        F: FnMut(NodeView<'_, T>),
    {
        f(NodeView {
            center: self.center,
            side_length: self.side_length,
            depth,
            entries: &self.entries,
        });
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.visit_nodes(depth + 1, f);
            }
        }
    }

    /// Adopt a full set of children. The node must be an empty leaf.
    pub(crate) fn adopt_children(&mut self, children: Box<[Self; 8]>) {
        debug_assert!(
            self.children.is_none(),
            "adopting children over an existing split"
        );
        debug_assert!(
            self.entries.is_empty(),
            "adopting children would strand direct entries"
        );
        self.children = Some(children);
    }

    /// Contract this subtree by one level if all content sits in a single
    /// octant: a childless node re-centers on that octant at half size, a
    /// split node is replaced by the one child holding content.
    ///
    /// Does nothing when the side length is already below `2 * min_length`,
    /// when the subtree is empty, or when content spans octants.
    pub(crate) fn shrink_if_possible(&mut self, min_length: f32) {
        if self.side_length < 2.0 * min_length {
            return;
        }
        if !self.has_any_entries() {
            return;
        }

        // The single octant holding every direct entry, if there is one.
        let mut best_fit: Option<usize> = None;
        for entry in &self.entries {
            let octant = octant_index(self.center, entry.position);
            match best_fit {
                None => best_fit = Some(octant),
                Some(previous) if previous != octant => return,
                Some(_) => {}
            }
        }

        if let Some(children) = &self.children {
            let mut content_child: Option<usize> = None;
            for (octant, child) in children.iter().enumerate() {
                if child.has_any_entries() {
                    if content_child.is_some() {
                        // Two children hold content.
                        return;
                    }
                    if best_fit.is_some_and(|b| b != octant) {
                        // Direct entries sit in a different octant.
                        return;
                    }
                    content_child = Some(octant);
                }
            }
            if content_child.is_some() {
                best_fit = content_child;
            }
        }

        let Some(octant) = best_fit else {
            return;
        };

        match self.children.take() {
            None => {
                // Childless: halve in place around the occupied octant. The
                // direct entries stay put and still fit.
                let new_center = self.child_center(octant);
                self.center = new_center;
                self.side_length /= 2.0;
            }
            Some(children) => {
                debug_assert!(
                    self.entries.is_empty(),
                    "a split node must not hold direct entries"
                );
                let promoted = (*children)
                    .into_iter()
                    .nth(octant)
                    .expect("octant index is within the child array");
                *self = promoted;
            }
        }
    }

    #[cfg(test)]
    fn has_children(&self) -> bool {
        self.children.is_some()
    }

    #[cfg(test)]
    fn direct_len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{ENTRY_LIMIT, OctreeNode, octant_index};
    use crate::types::Ray;
    use alloc::{vec, vec::Vec};
    use glam::Vec3;

    fn collect(node: &OctreeNode<usize>) -> Vec<usize> {
        let mut out = Vec::new();
        node.collect_all(&mut out);
        out.sort_unstable();
        out
    }

    /// One point per octant of a node centered at the origin.
    fn corner(octant: usize, spread: f32) -> Vec3 {
        let x = if octant & 1 == 0 { -spread } else { spread };
        let y = if octant & 4 == 0 { spread } else { -spread };
        let z = if octant & 2 == 0 { -spread } else { spread };
        Vec3::new(x, y, z)
    }

    #[test]
    fn octant_index_tie_breaks() {
        let center = Vec3::ZERO;
        // Points exactly on a splitting plane resolve to the <= / >= side.
        assert_eq!(octant_index(center, Vec3::ZERO), 0);
        assert_eq!(octant_index(center, Vec3::new(1.0, 0.0, 0.0)), 1);
        assert_eq!(octant_index(center, Vec3::new(0.0, -1.0, 0.0)), 4);
        assert_eq!(octant_index(center, Vec3::new(0.0, 0.0, 1.0)), 2);
        assert_eq!(octant_index(center, Vec3::new(1.0, -1.0, 1.0)), 7);
        assert_eq!(octant_index(center, Vec3::new(-1.0, 1.0, -1.0)), 0);
    }

    #[test]
    fn child_centers_follow_octant_order() {
        let node: OctreeNode<usize> = OctreeNode::new(8.0, 1.0, Vec3::ZERO);
        assert_eq!(node.child_center(0), Vec3::new(-2.0, 2.0, -2.0));
        assert_eq!(node.child_center(1), Vec3::new(2.0, 2.0, -2.0));
        assert_eq!(node.child_center(2), Vec3::new(-2.0, 2.0, 2.0));
        assert_eq!(node.child_center(3), Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(node.child_center(4), Vec3::new(-2.0, -2.0, -2.0));
        assert_eq!(node.child_center(5), Vec3::new(2.0, -2.0, -2.0));
        assert_eq!(node.child_center(6), Vec3::new(-2.0, -2.0, 2.0));
        assert_eq!(node.child_center(7), Vec3::new(2.0, -2.0, 2.0));
        // Every child center maps back to its own octant.
        for octant in 0..8 {
            assert_eq!(octant_index(node.center, node.child_center(octant)), octant);
        }
    }

    #[test]
    fn splits_only_past_the_entry_limit() {
        let mut node = OctreeNode::new(16.0, 1.0, Vec3::ZERO);
        for octant in 0..ENTRY_LIMIT {
            assert!(node.add(octant, corner(octant, 4.0)));
        }
        assert!(!node.has_children(), "at the limit, still a leaf");
        assert_eq!(node.direct_len(), 8);

        assert!(node.add(8, Vec3::new(1.0, 1.0, 1.0)));
        assert!(node.has_children(), "one past the limit splits");
        assert_eq!(node.direct_len(), 0, "split nodes hold nothing directly");
        assert_eq!(collect(&node), (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn refuses_to_split_below_min_size() {
        let mut node = OctreeNode::new(2.0, 2.0, Vec3::ZERO);
        for i in 0..20 {
            assert!(node.add(i, Vec3::new(0.5, -0.5, 0.25)));
        }
        assert!(!node.has_children());
        assert_eq!(node.direct_len(), 20);
    }

    #[test]
    fn identical_positions_bottom_out_at_min_size() {
        let mut node = OctreeNode::new(16.0, 1.0, Vec3::ZERO);
        let position = Vec3::new(3.0, 3.0, 3.0);
        for i in 0..10 {
            assert!(node.add(i, position));
        }
        assert_eq!(collect(&node), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn add_outside_bounds_fails() {
        let mut node = OctreeNode::new(4.0, 1.0, Vec3::ZERO);
        assert!(!node.add(0, Vec3::new(3.0, 0.0, 0.0)));
        assert!(node.add(0, Vec3::new(2.0, -2.0, 2.0)), "faces are inclusive");
    }

    #[test]
    fn remove_merges_children_back() {
        let mut node = OctreeNode::new(16.0, 1.0, Vec3::ZERO);
        for octant in 0..8 {
            node.add(octant, corner(octant, 4.0));
        }
        node.add(8, Vec3::new(1.0, 1.0, 1.0));
        assert!(node.has_children());

        assert!(node.remove(&8));
        assert!(!node.has_children(), "eight entries with no grandchildren merge");
        assert_eq!(node.direct_len(), 8);
        assert_eq!(collect(&node), (0..8).collect::<Vec<_>>());

        assert!(!node.remove(&8), "already removed");
    }

    #[test]
    fn remove_at_checks_bounds_and_descends() {
        let mut node = OctreeNode::new(16.0, 1.0, Vec3::ZERO);
        for octant in 0..8 {
            node.add(octant, corner(octant, 4.0));
        }
        node.add(8, Vec3::new(1.0, 1.0, 1.0));

        assert!(!node.remove_at(&3, Vec3::new(100.0, 0.0, 0.0)), "outside bounds");
        assert!(node.remove_at(&3, corner(3, 4.0)));
        assert!(!node.remove_at(&3, corner(3, 4.0)), "absent payload");
        assert_eq!(collect(&node), vec![0, 1, 2, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn shrink_resizes_a_childless_node() {
        let mut node = OctreeNode::new(16.0, 1.0, Vec3::ZERO);
        // All entries in octant 3 (+x, +y, +z), clustered so they stay in a
        // single octant across two shrinks.
        node.add(0, Vec3::new(5.0, 6.0, 5.0));
        node.add(1, Vec3::new(6.0, 5.0, 6.0));

        node.shrink_if_possible(1.0);
        assert_eq!(node.side_length, 8.0);
        assert_eq!(node.center, Vec3::new(4.0, 4.0, 4.0));
        assert_eq!(collect(&node), vec![0, 1]);

        // Shrinks again on request, down to the floor.
        node.shrink_if_possible(4.0);
        assert_eq!(node.side_length, 4.0);
        assert_eq!(node.center, Vec3::new(6.0, 6.0, 6.0));
        node.shrink_if_possible(4.0);
        assert_eq!(node.side_length, 4.0, "below 2 * min_length nothing moves");
    }

    #[test]
    fn shrink_promotes_the_only_content_child() {
        let mut node = OctreeNode::new(16.0, 0.5, Vec3::ZERO);
        // Nine entries in one octant force a split, and the child that
        // inherits them all splits again.
        for i in 0..9 {
            node.add(i, Vec3::new(2.0 + 0.2 * i as f32, 3.0, 3.0));
        }
        assert!(node.has_children());

        node.shrink_if_possible(0.5);
        assert_eq!(node.side_length, 8.0, "child took over as the subtree root");
        assert_eq!(node.center, Vec3::new(4.0, 4.0, 4.0));
        assert_eq!(collect(&node), (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn shrink_declines_when_content_spans_octants() {
        let mut node = OctreeNode::new(16.0, 1.0, Vec3::ZERO);
        node.add(0, Vec3::new(3.0, 3.0, 3.0));
        node.add(1, Vec3::new(-3.0, 3.0, 3.0));
        node.shrink_if_possible(1.0);
        assert_eq!(node.side_length, 16.0);
        assert_eq!(node.center, Vec3::ZERO);
    }

    #[test]
    fn shrink_ignores_an_empty_subtree() {
        let mut node: OctreeNode<usize> = OctreeNode::new(16.0, 1.0, Vec3::ZERO);
        node.shrink_if_possible(1.0);
        assert_eq!(node.side_length, 16.0);
    }

    #[test]
    fn sphere_query_prunes_but_stays_exact() {
        let mut node = OctreeNode::new(16.0, 1.0, Vec3::ZERO);
        for octant in 0..8 {
            node.add(octant, corner(octant, 4.0));
        }
        node.add(8, Vec3::new(1.0, 1.0, 1.0));

        let mut out = Vec::new();
        node.nearby_in_sphere(Vec3::new(4.0, -4.0, 4.0), 0.5, &mut out);
        assert_eq!(out, vec![7]);

        out.clear();
        // Radius exactly reaching a corner point is inclusive.
        let target = Vec3::new(4.0, 4.0, 4.0);
        node.nearby_in_sphere(Vec3::new(4.0, 4.0, 1.0), 3.0, &mut out);
        assert_eq!(out, vec![3], "{target} lies exactly on the boundary");
    }

    #[test]
    fn ray_query_matches_line_distance() {
        let mut node = OctreeNode::new(16.0, 1.0, Vec3::ZERO);
        for octant in 0..8 {
            node.add(octant, corner(octant, 4.0));
        }

        // Along +x at y=4, z=-4: passes through corners 0 and 1.
        let ray = Ray::new(Vec3::new(-20.0, 4.0, -4.0), Vec3::X);
        let mut out = Vec::new();
        node.nearby_along_ray(&ray, 0.5, &mut out);
        out.sort_unstable();
        assert_eq!(out, vec![0, 1]);

        // Widening to exactly 8 reaches the four corners whose offset from
        // the line is a single 8-unit axis step; the inclusive boundary
        // keeps them, while the two diagonal corners stay out.
        out.clear();
        node.nearby_along_ray(&ray, 8.0, &mut out);
        out.sort_unstable();
        assert_eq!(out, vec![0, 1, 2, 3, 4, 5]);
    }
}
