//! A quadtree spatial index, responsible for cutting down the set of
//! bodies a single body could possibly intersect before the more accurate
//! narrow phase runs.
//!
//! The tree is rebuilt from the live body set for every query that wants
//! it, which keeps it trivially consistent with the bodies it indexes at
//! the cost of some insertion work per dispatch. This is a deliberate
//! tradeoff; do not persist the tree across steps.

use crate::{entity::BodyKey, math::Rect};

/// A region quadtree over body rectangles.
///
/// Nodes hold up to `max_objects` entries and split into four equal
/// quadrants when the next insert would overfill them, up to
/// `max_levels` deep. An entry straddling a quadrant boundary stays in
/// the node it straddles instead of being pushed down, so every entry
/// lives in exactly one node.
///
/// Retrieval returns candidates, not exact hits: everything in the nodes
/// the query rectangle touches, with no per-entry overlap filtering. The
/// caller is expected to narrow-phase the result and to tolerate
/// duplicates.
#[derive(Clone, Debug)]
pub struct QuadTree {
    max_objects: usize,
    max_levels: usize,
    level: usize,
    bounds: Rect,
    // rect cached from insertion time, so a query can't be confused by
    // bodies moving while the tree is alive
    objects: Vec<(BodyKey, Rect)>,
    // empty until split, then exactly four
    nodes: Vec<QuadTree>,
}

// child quadrant order, kept fixed so retrieval order is deterministic:
// 0 top right, 1 top left, 2 bottom left, 3 bottom right
const TOP_RIGHT: usize = 0;
const TOP_LEFT: usize = 1;
const BOTTOM_LEFT: usize = 2;
const BOTTOM_RIGHT: usize = 3;

impl QuadTree {
    pub fn new(bounds: Rect, max_objects: usize, max_levels: usize) -> Self {
        Self::with_level(bounds, max_objects, max_levels, 0)
    }

    fn with_level(bounds: Rect, max_objects: usize, max_levels: usize, level: usize) -> Self {
        Self {
            max_objects,
            max_levels,
            level,
            bounds,
            objects: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Reinitialize to an empty root covering `bounds`, keeping allocations.
    pub fn reset(&mut self, bounds: Rect, max_objects: usize, max_levels: usize) {
        self.max_objects = max_objects;
        self.max_levels = max_levels;
        self.level = 0;
        self.bounds = bounds;
        self.clear();
    }

    /// Drop all entries and children, keeping the bounds and configuration.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.nodes.clear();
    }

    /// Place one body rectangle into the tree. Degenerate rectangles are
    /// fine; recursion is bounded by the depth cap alone.
    pub fn insert(&mut self, key: BodyKey, bounds: Rect) {
        if !self.nodes.is_empty() {
            if let Some(quadrant) = self.quadrant_index(&bounds) {
                self.nodes[quadrant].insert(key, bounds);
                return;
            }
        }

        self.objects.push((key, bounds));

        if self.objects.len() > self.max_objects && self.level < self.max_levels {
            if self.nodes.is_empty() {
                self.split();
            }
            // push down everything that fits a quadrant, straddlers stay
            let mut i = 0;
            while i < self.objects.len() {
                if let Some(quadrant) = self.quadrant_index(&self.objects[i].1) {
                    let (key, rect) = self.objects.remove(i);
                    self.nodes[quadrant].insert(key, rect);
                } else {
                    i += 1;
                }
            }
        }
    }

    /// Collect every candidate that could intersect `rect` into `out`.
    pub fn retrieve(&self, rect: &Rect, out: &mut Vec<BodyKey>) {
        out.extend(self.objects.iter().map(|(key, _)| *key));
        if !self.nodes.is_empty() {
            if let Some(quadrant) = self.quadrant_index(rect) {
                self.nodes[quadrant].retrieve(rect, out);
            } else {
                // the query straddles, all quadrants are fair game
                for node in &self.nodes {
                    node.retrieve(rect, out);
                }
            }
        }
    }

    /// Convenience form of [`retrieve`][Self::retrieve] allocating a
    /// fresh result vector.
    pub fn query(&self, rect: &Rect) -> Vec<BodyKey> {
        let mut out = Vec::new();
        self.retrieve(rect, &mut out);
        out
    }

    fn split(&mut self) {
        let sub_w = self.bounds.width / 2.0;
        let sub_h = self.bounds.height / 2.0;
        let (x, y) = (self.bounds.x, self.bounds.y);
        let (mid_x, mid_y) = (x + sub_w, y + sub_h);
        let level = self.level + 1;
        let child = |cx: f64, cy: f64| {
            Self::with_level(
                Rect::new(cx, cy, sub_w, sub_h),
                self.max_objects,
                self.max_levels,
                level,
            )
        };
        self.nodes = vec![
            child(mid_x, y),
            child(x, y),
            child(x, mid_y),
            child(mid_x, mid_y),
        ];
    }

    /// Which quadrant fully contains `rect`, or `None` when it straddles
    /// the midlines (including sitting exactly on one).
    fn quadrant_index(&self, rect: &Rect) -> Option<usize> {
        let mid_x = self.bounds.x + self.bounds.width / 2.0;
        let mid_y = self.bounds.y + self.bounds.height / 2.0;

        if rect.x < mid_x && rect.right() < mid_x {
            if rect.y < mid_y && rect.bottom() < mid_y {
                Some(TOP_LEFT)
            } else if rect.y > mid_y {
                Some(BOTTOM_LEFT)
            } else {
                None
            }
        } else if rect.x > mid_x {
            if rect.y < mid_y && rect.bottom() < mid_y {
                Some(TOP_RIGHT)
            } else if rect.y > mid_y {
                Some(BOTTOM_RIGHT)
            } else {
                None
            }
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thunderdome as td;

    fn keys(n: usize) -> Vec<BodyKey> {
        let mut arena = td::Arena::new();
        (0..n).map(|i| BodyKey(arena.insert(i))).collect()
    }

    fn world_rect() -> Rect {
        Rect::new(0.0, 0.0, 800.0, 600.0)
    }

    #[test]
    fn splits_on_overflow_and_redistributes() {
        // three bodies in the root's top left quadrant, room for two per
        // node; they sit in three different sub-quadrants of that child
        let mut tree = QuadTree::new(world_rect(), 2, 4);
        let k = keys(3);
        let rects = [
            Rect::new(10.0, 10.0, 16.0, 16.0),
            Rect::new(300.0, 10.0, 16.0, 16.0),
            Rect::new(10.0, 200.0, 16.0, 16.0),
        ];
        tree.insert(k[0], rects[0]);
        tree.insert(k[1], rects[1]);
        assert_eq!(tree.nodes.len(), 0);
        tree.insert(k[2], rects[2]);
        // the root split on overflow and emptied into its top left child,
        // which overflowed once more and settled
        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(tree.objects.len(), 0);
        let child = &tree.nodes[TOP_LEFT];
        assert_eq!(child.nodes.len(), 4);
        assert_eq!(child.objects.len(), 0);
        assert!(child.nodes.iter().all(|n| n.nodes.is_empty()));
        // with the bodies settled apart, each query hits exactly its body
        for (key, rect) in k.iter().zip(rects.iter()) {
            itertools::assert_equal(tree.query(rect), [*key]);
        }
    }

    #[test]
    fn retrieve_finds_own_membership() {
        let mut tree = QuadTree::new(world_rect(), 2, 4);
        let k = keys(4);
        let rects = [
            Rect::new(10.0, 10.0, 16.0, 16.0),
            Rect::new(700.0, 10.0, 16.0, 16.0),
            Rect::new(10.0, 500.0, 16.0, 16.0),
            Rect::new(700.0, 500.0, 16.0, 16.0),
        ];
        for (key, rect) in k.iter().zip(rects.iter()) {
            tree.insert(*key, *rect);
        }
        for (key, rect) in k.iter().zip(rects.iter()) {
            let found = tree.query(rect);
            assert!(found.contains(key), "no false negatives allowed");
        }
    }

    #[test]
    fn disjoint_quadrants_do_not_leak() {
        let mut tree = QuadTree::new(world_rect(), 2, 4);
        let k = keys(3);
        // three well separated bodies force a split and land in
        // different quadrants
        tree.insert(k[0], Rect::new(10.0, 10.0, 16.0, 16.0));
        tree.insert(k[1], Rect::new(700.0, 10.0, 16.0, 16.0));
        tree.insert(k[2], Rect::new(10.0, 500.0, 16.0, 16.0));
        let found = tree.query(&Rect::new(10.0, 10.0, 16.0, 16.0));
        itertools::assert_equal(found, [k[0]]);
    }

    #[test]
    fn straddlers_stay_in_the_parent() {
        let mut tree = QuadTree::new(world_rect(), 1, 4);
        let k = keys(3);
        // sits across the vertical midline at x=400
        tree.insert(k[0], Rect::new(390.0, 10.0, 32.0, 16.0));
        tree.insert(k[1], Rect::new(10.0, 10.0, 16.0, 16.0));
        tree.insert(k[2], Rect::new(700.0, 400.0, 16.0, 16.0));
        assert_eq!(tree.nodes.len(), 4);
        assert!(tree.objects.iter().any(|(key, _)| *key == k[0]));
        // a query on either side still sees the straddler
        assert!(tree.query(&Rect::new(10.0, 10.0, 16.0, 16.0)).contains(&k[0]));
        assert!(tree
            .query(&Rect::new(700.0, 10.0, 16.0, 16.0))
            .contains(&k[0]));
    }

    #[test]
    fn degenerate_rect_is_depth_capped() {
        let mut tree = QuadTree::new(world_rect(), 1, 4);
        let k = keys(8);
        // identical zero-area rects can never be told apart by
        // subdivision, the depth cap has to stop the recursion
        for key in &k {
            tree.insert(*key, Rect::new(10.0, 10.0, 0.0, 0.0));
        }
        let found = tree.query(&Rect::new(10.0, 10.0, 0.0, 0.0));
        assert_eq!(found.len(), 8);
    }

    #[test]
    fn clear_keeps_the_bounds() {
        let mut tree = QuadTree::new(world_rect(), 1, 4);
        let k = keys(3);
        for (i, key) in k.iter().enumerate() {
            tree.insert(*key, Rect::new(i as f64 * 300.0, 10.0, 16.0, 16.0));
        }
        assert_eq!(tree.nodes.len(), 4);
        tree.clear();
        assert!(tree.query(&world_rect()).is_empty());
        assert_eq!(tree.nodes.len(), 0);
        assert_eq!(tree.bounds, world_rect());
    }

    #[test]
    fn reset_empties_and_rebounds() {
        let mut tree = QuadTree::new(world_rect(), 1, 4);
        let k = keys(3);
        for (i, key) in k.iter().enumerate() {
            tree.insert(*key, Rect::new(i as f64 * 100.0, 10.0, 16.0, 16.0));
        }
        tree.reset(Rect::new(0.0, 0.0, 100.0, 100.0), 10, 4);
        assert!(tree.query(&Rect::new(0.0, 0.0, 100.0, 100.0)).is_empty());
        assert_eq!(tree.bounds, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(tree.nodes.len(), 0);
    }
}
