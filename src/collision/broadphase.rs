//! The broad phase is responsible for deciding which pairs of bodies are
//! worth handing to the narrow phase at all, so colliding a body against
//! a large collection does not degenerate into testing every pair.
//!
//! Collections are either swept in sorted order along a configurable
//! axis, letting the scan stop as soon as no later candidate can reach
//! the probe, or routed through the quadtree. Nested groups recurse,
//! each sub-group dispatched independently against the other side.

use thunderdome as td;

use super::{narrowphase, quadtree::QuadTree, CollideTarget, ContactEvent, Group, GroupMember};
use crate::{
    body::Body,
    entity::{BodyKey, GroupKey},
    math::Rect,
    world::WorldConfig,
};

/// The axis and direction collection members are sorted along before a
/// sweep. Match this to the dominant direction bodies approach each
/// other from; a sideways scroller wants [`LeftRight`][Self::LeftRight]
/// or [`RightLeft`][Self::RightLeft], a faller [`TopBottom`][Self::TopBottom].
#[cfg_attr(feature = "serde-types", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    /// No sorting and no pruning, every candidate is tested.
    None,
    /// Sort by the left edge, ascending.
    LeftRight,
    /// Sort by the left edge, descending.
    RightLeft,
    /// Sort by the top edge, ascending.
    TopBottom,
    /// Sort by the top edge, descending.
    BottomTop,
}

impl SortDirection {
    /// Sort key order for two candidate rectangles. Used with a stable
    /// sort, so ties keep their insertion order.
    fn compare(self, a: &Rect, b: &Rect) -> std::cmp::Ordering {
        match self {
            SortDirection::None => std::cmp::Ordering::Equal,
            SortDirection::LeftRight => a.x.total_cmp(&b.x),
            SortDirection::RightLeft => b.x.total_cmp(&a.x),
            SortDirection::TopBottom => a.y.total_cmp(&b.y),
            SortDirection::BottomTop => b.y.total_cmp(&a.y),
        }
    }
}

/// What the sweep decides about one sorted candidate.
enum Sweep {
    /// May intersect the probe, run the narrow phase.
    Test,
    /// Cannot intersect, but a later candidate still can.
    Skip,
    /// Neither this candidate nor any later one can intersect.
    Break,
}

/// The sweep pruning rule. Only sound when candidates arrive sorted by
/// `direction`; the probe rectangle is re-read between candidates so the
/// verdicts track positions already adjusted earlier in the same sweep.
fn sweep_cull(direction: SortDirection, probe: &Rect, candidate: &Rect) -> Sweep {
    match direction {
        SortDirection::None => Sweep::Test,
        SortDirection::LeftRight => {
            if probe.right() < candidate.x {
                Sweep::Break
            } else if candidate.right() < probe.x {
                Sweep::Skip
            } else {
                Sweep::Test
            }
        }
        SortDirection::RightLeft => {
            if probe.x > candidate.right() {
                Sweep::Break
            } else if candidate.x > probe.right() {
                Sweep::Skip
            } else {
                Sweep::Test
            }
        }
        SortDirection::TopBottom => {
            if probe.bottom() < candidate.y {
                Sweep::Break
            } else if candidate.bottom() < probe.y {
                Sweep::Skip
            } else {
                Sweep::Test
            }
        }
        SortDirection::BottomTop => {
            if probe.y > candidate.bottom() {
                Sweep::Break
            } else if candidate.y > probe.bottom() {
                Sweep::Skip
            } else {
                Sweep::Test
            }
        }
    }
}

/// The state threaded through one collide or overlap call.
///
/// Bodies are held mutably for the narrow phase while the group topology
/// is held shared, which is what lets sub-group recursion walk the
/// topology while bodies underneath it move.
pub(crate) struct DispatchPass<'a> {
    pub config: &'a WorldConfig,
    pub bodies: &'a mut td::Arena<Body>,
    pub groups: &'a td::Arena<Group>,
    pub quadtree: &'a mut QuadTree,
    /// Invoked once per resolved pair, or per reported pair in
    /// overlap-only mode, in dispatch order.
    pub on_contact: &'a mut dyn FnMut(ContactEvent),
    /// Evaluated on each intersecting pair before resolution; returning
    /// false drops the pair. Receives the bodies in dispatch order, the
    /// single-body side first when one side is a group.
    pub process: &'a mut dyn FnMut(&Body, &Body) -> bool,
    pub overlap_only: bool,
    /// Pairs resolved or reported so far.
    pub total: u32,
}

impl<'a> DispatchPass<'a> {
    pub fn run(&mut self, first: CollideTarget, second: CollideTarget) {
        match (first, second) {
            (CollideTarget::Body(a), CollideTarget::Body(b)) => self.pair(a, b, false),
            (CollideTarget::Body(body), CollideTarget::Group(group)) => {
                self.body_vs_group(body, group, false)
            }
            (CollideTarget::Group(group), CollideTarget::Body(body)) => {
                self.body_vs_group(body, group, true)
            }
            (CollideTarget::Group(a), CollideTarget::Group(b)) => {
                if a == b {
                    self.group_vs_self(a)
                } else {
                    self.group_vs_group(a, b)
                }
            }
        }
    }

    /// Narrow-phase one pair. `flip` swaps the reported event order so
    /// callbacks always see the caller's first argument first; the
    /// separation itself is not symmetric in its arguments (the first
    /// body's gravity picks the axis order), so the probe stays first.
    fn pair(&mut self, first: BodyKey, second: BodyKey, flip: bool) {
        if first == second {
            return;
        }
        let (Some(body_a), Some(body_b)) = self.bodies.get2_mut(first.0, second.0) else {
            return;
        };
        if narrowphase::separate(
            body_a,
            body_b,
            self.config,
            self.process,
            self.overlap_only,
        ) {
            self.total += 1;
            let event = if flip {
                ContactEvent {
                    body_a: second,
                    body_b: first,
                    entity_a: body_b.entity,
                    entity_b: body_a.entity,
                }
            } else {
                ContactEvent {
                    body_a: first,
                    body_b: second,
                    entity_a: body_a.entity,
                    entity_b: body_b.entity,
                }
            };
            (self.on_contact)(event);
        }
    }

    /// One body against every member of a group, through the quadtree
    /// when both the world and the probe allow it, otherwise through the
    /// sorted sweep.
    fn body_vs_group(&mut self, probe: BodyKey, group_key: GroupKey, flip: bool) {
        let (probe_bounds, probe_skips_tree) = match self.bodies.get(probe.0) {
            Some(body) => (body.bounds(), body.skip_quad_tree),
            None => return,
        };
        let groups = self.groups;
        let Some(group) = groups.get(group_key.0) else {
            return;
        };

        for member in &group.members {
            if let GroupMember::Group(sub) = member {
                if *sub != group_key {
                    self.body_vs_group(probe, *sub, flip);
                }
            }
        }

        let mut candidates = self.collect_bodies(group);
        if candidates.is_empty() {
            return;
        }

        if !self.config.skip_quad_tree && !probe_skips_tree {
            self.quadtree.reset(
                self.config.bounds,
                self.config.max_objects,
                self.config.max_levels,
            );
            for (key, rect) in &candidates {
                self.quadtree.insert(*key, *rect);
            }
            for key in self.quadtree.query(&probe_bounds) {
                self.pair(probe, key, flip);
            }
        } else {
            let direction = group.sort_direction.unwrap_or(self.config.sort_direction);
            candidates.sort_by(|a, b| direction.compare(&a.1, &b.1));
            for (key, _) in &candidates {
                let Some(probe_body) = self.bodies.get(probe.0) else {
                    return;
                };
                let Some(candidate) = self.bodies.get(key.0) else {
                    continue;
                };
                match sweep_cull(direction, &probe_body.bounds(), &candidate.bounds()) {
                    Sweep::Break => break,
                    Sweep::Skip => continue,
                    Sweep::Test => {}
                }
                self.pair(probe, *key, flip);
            }
        }
    }

    /// Every member of `left` against the whole of `right`, in insertion
    /// order.
    fn group_vs_group(&mut self, left: GroupKey, right: GroupKey) {
        if left == right {
            self.group_vs_self(left);
            return;
        }
        let groups = self.groups;
        let Some(group) = groups.get(left.0) else {
            return;
        };
        for member in &group.members {
            match *member {
                GroupMember::Body(key) => self.body_vs_group(key, right, false),
                GroupMember::Group(sub) => {
                    if sub == right {
                        self.group_vs_self(sub);
                    } else if sub != left {
                        self.group_vs_group(sub, right);
                    }
                }
            }
        }
    }

    /// Every unordered pair within one group exactly once: direct bodies
    /// via the sorted sweep with the inner index starting past the outer,
    /// then member pairs involving a sub-group, then each sub-group
    /// against itself.
    fn group_vs_self(&mut self, key: GroupKey) {
        let groups = self.groups;
        let Some(group) = groups.get(key.0) else {
            return;
        };

        let direction = group.sort_direction.unwrap_or(self.config.sort_direction);
        let mut candidates = self.collect_bodies(group);
        candidates.sort_by(|a, b| direction.compare(&a.1, &b.1));
        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let a = candidates[i].0;
                let b = candidates[j].0;
                let (Some(body_a), Some(body_b)) = (self.bodies.get(a.0), self.bodies.get(b.0))
                else {
                    continue;
                };
                match sweep_cull(direction, &body_a.bounds(), &body_b.bounds()) {
                    Sweep::Break => break,
                    Sweep::Skip => continue,
                    Sweep::Test => {}
                }
                self.pair(a, b, false);
            }
        }

        for i in 0..group.members.len() {
            for j in (i + 1)..group.members.len() {
                match (group.members[i], group.members[j]) {
                    (GroupMember::Body(_), GroupMember::Body(_)) => {}
                    (GroupMember::Body(body), GroupMember::Group(sub)) => {
                        self.body_vs_group(body, sub, false)
                    }
                    (GroupMember::Group(sub), GroupMember::Body(body)) => {
                        self.body_vs_group(body, sub, true)
                    }
                    (GroupMember::Group(sub), GroupMember::Group(other)) => {
                        if sub != other {
                            self.group_vs_group(sub, other);
                        }
                    }
                }
            }
        }
        for member in &group.members {
            if let GroupMember::Group(sub) = member {
                if *sub != key {
                    self.group_vs_self(*sub);
                }
            }
        }
    }

    /// The direct body members that still exist, with their rectangles
    /// snapshotted for sorting and quadtree insertion.
    fn collect_bodies(&self, group: &Group) -> Vec<(BodyKey, Rect)> {
        let mut out = Vec::with_capacity(group.members.len());
        for member in &group.members {
            if let GroupMember::Body(key) = member {
                if let Some(body) = self.bodies.get(key.0) {
                    out.push((*key, body.bounds()));
                }
            }
        }
        out
    }
}
