pub mod body;
pub use body::{Body, Sides};

pub mod collision;
pub use collision::{
    intersects, CollideTarget, ContactEvent, Group, GroupMember, QuadTree, SortDirection,
};

pub mod entity;
pub use entity::{BodyKey, Entity, EntityKey, EntitySet, GroupKey};

mod integrator;

pub mod math;
pub use math::{uv, Axis, Rect, Vec2};

pub mod world;
pub use world::{ConfigError, PhysicsWorld, WorldConfig};

// Re-exported thunderdome to guarantee the version behind the key types matches
pub use thunderdome;
