pub mod broadphase;
pub use broadphase::SortDirection;

pub mod narrowphase;
pub use narrowphase::intersects;

pub mod quadtree;
pub use quadtree::QuadTree;

use crate::entity::{BodyKey, EntityKey, GroupKey};

/// A resolved or reported pair, handed to the collide/overlap callback in
/// dispatch order.
#[derive(Clone, Copy, Debug)]
pub struct ContactEvent {
    pub body_a: BodyKey,
    pub body_b: BodyKey,
    pub entity_a: EntityKey,
    pub entity_b: EntityKey,
}

/// Either side of a collide or overlap call: one body or a whole group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollideTarget {
    Body(BodyKey),
    Group(GroupKey),
}

impl From<BodyKey> for CollideTarget {
    #[inline]
    fn from(key: BodyKey) -> Self {
        CollideTarget::Body(key)
    }
}

impl From<GroupKey> for CollideTarget {
    #[inline]
    fn from(key: GroupKey) -> Self {
        CollideTarget::Group(key)
    }
}

/// One member of a collision group. Sub-groups are dispatched recursively;
/// a group must not contain itself, directly or through other groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupMember {
    Body(BodyKey),
    Group(GroupKey),
}

impl From<BodyKey> for GroupMember {
    #[inline]
    fn from(key: BodyKey) -> Self {
        GroupMember::Body(key)
    }
}

impl From<GroupKey> for GroupMember {
    #[inline]
    fn from(key: GroupKey) -> Self {
        GroupMember::Group(key)
    }
}

/// An ordered collection of bodies and sub-groups used as a dispatch
/// target. Insertion order is the tiebreaker for the broad phase sort, so
/// dispatch over a group is fully deterministic.
///
/// Members whose bodies have been removed are skipped silently.
#[derive(Clone, Debug, Default)]
pub struct Group {
    pub members: Vec<GroupMember>,
    /// Overrides the world's sort direction for this group when set.
    pub sort_direction: Option<SortDirection>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a body or sub-group.
    pub fn add(&mut self, member: impl Into<GroupMember>) {
        self.members.push(member.into());
    }
}
