use crate::{body::Body, collision::Group, integrator, math::Vec2};

use thunderdome as td;

/// Key type to look up an entity stored in the physics world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityKey(pub(crate) td::Index);

impl EntityKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    /// Useful for creating your own mappings from entities to other things.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

/// Key type to look up a body stored in the physics world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyKey(pub(crate) td::Index);

impl BodyKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

/// Key type to look up a collision group stored in the physics world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey(pub(crate) td::Index);

impl GroupKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

/// The transform record of one game object, standing in for whatever
/// scene node the host engine uses. The physics step reads this at the
/// start and writes the adjusted position and rotation back at the end.
#[derive(Clone, Copy, Debug)]
pub struct Entity {
    /// World position of the entity origin.
    pub position: Vec2,
    pub scale: Vec2,
    /// Orientation in radians.
    pub rotation: f64,
    /// Normalized pivot inside the display rectangle, (0, 0) is the top
    /// left corner and (0.5, 0.5) the center.
    pub anchor: Vec2,
    /// Unscaled display size. The attached body's rectangle defaults to
    /// this but can be resized independently with `Body::set_size`.
    pub size: Vec2,
}

impl Entity {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
            anchor: Vec2::zero(),
            size,
        }
    }

    /// Set the pivot in a builder-like chain.
    pub fn with_anchor(mut self, anchor: Vec2) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }
}

/// Storage for everything simulated by the physics world: entity
/// transforms, their bodies, and the collision groups used for dispatch.
///
/// Bodies refer to entities by key instead of reference, so removing an
/// entity simply orphans its body; orphans are swept at the start of the
/// next step.
#[derive(Default)]
pub struct EntitySet {
    pub(crate) entities: td::Arena<Entity>,
    pub(crate) bodies: td::Arena<Body>,
    pub(crate) groups: td::Arena<Group>,
}

impl EntitySet {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert an entity into the world.
    pub fn insert_entity(&mut self, entity: Entity) -> EntityKey {
        EntityKey(self.entities.insert(entity))
    }

    /// Access an [`Entity`][Entity] in the physics world, if it still exists.
    #[inline]
    pub fn get_entity(&self, entity: EntityKey) -> Option<&Entity> {
        self.entities.get(entity.0)
    }

    /// Mutably access an [`Entity`][Entity] in the physics world, if it still exists.
    #[inline]
    pub fn get_entity_mut(&mut self, entity: EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(entity.0)
    }

    /// Remove an entity from the world, returning it if it still existed.
    ///
    /// A body attached to this entity will be automatically removed at the
    /// start of the next physics step.
    #[inline]
    pub fn remove_entity(&mut self, entity: EntityKey) -> Option<Entity> {
        self.entities.remove(entity.0)
    }

    /// Attach a physics body to an entity, sized to the entity's display
    /// size and synced to its current transform. Returns `None` if the
    /// entity no longer exists.
    pub fn attach_body(&mut self, entity: EntityKey) -> Option<BodyKey> {
        let entity_ref = self.entities.get(entity.0)?;
        let mut body = Body::new(entity, entity_ref.size);
        integrator::update_bounds(&mut body, entity_ref);
        integrator::sync_position(&mut body, entity_ref);
        body.prev = body.position;
        body.rotation = entity_ref.rotation;
        body.pre_rotation = body.rotation;
        body.center = body.position + body.half;
        Some(BodyKey(self.bodies.insert(body)))
    }

    /// Access a [`Body`][crate::Body] in the physics world, if it still exists.
    #[inline]
    pub fn get_body(&self, body: BodyKey) -> Option<&Body> {
        self.bodies.get(body.0)
    }

    /// Mutably access a [`Body`][crate::Body] in the physics world, if it still exists.
    #[inline]
    pub fn get_body_mut(&mut self, body: BodyKey) -> Option<&mut Body> {
        self.bodies.get_mut(body.0)
    }

    /// Remove a body from the physics world, returning it if it still
    /// existed. The owning entity is not touched.
    #[inline]
    pub fn remove_body(&mut self, body: BodyKey) -> Option<Body> {
        self.bodies.remove(body.0)
    }

    /// Access the entity that owns the given body, if both still exist.
    #[inline]
    pub fn get_body_entity(&self, body: BodyKey) -> Option<&Entity> {
        self.bodies
            .get(body.0)
            .and_then(|b| self.entities.get(b.entity.0))
    }

    /// Insert a collision group into the world.
    pub fn insert_group(&mut self, group: Group) -> GroupKey {
        GroupKey(self.groups.insert(group))
    }

    /// Access a [`Group`][crate::Group] in the physics world, if it still exists.
    #[inline]
    pub fn get_group(&self, group: GroupKey) -> Option<&Group> {
        self.groups.get(group.0)
    }

    /// Mutably access a [`Group`][crate::Group] in the physics world, if it still exists.
    #[inline]
    pub fn get_group_mut(&mut self, group: GroupKey) -> Option<&mut Group> {
        self.groups.get_mut(group.0)
    }

    /// Remove a group from the physics world. Member bodies are not touched.
    #[inline]
    pub fn remove_group(&mut self, group: GroupKey) -> Option<Group> {
        self.groups.remove(group.0)
    }

    /// Remove bodies that have had their owning entities removed.
    pub(crate) fn remove_orphan_bodies(&mut self) {
        let entities = &self.entities;
        self.bodies.retain(|_, body| entities.contains(body.entity.0));
    }

    // not exposed to users, must use through PhysicsWorld::clear
    pub(crate) fn clear(&mut self) {
        self.entities.clear();
        self.bodies.clear();
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_body_syncs_transform() {
        let mut set = EntitySet::new();
        let entity = set.insert_entity(
            Entity::new(Vec2::new(100.0, 50.0), Vec2::new(32.0, 32.0))
                .with_anchor(Vec2::new(0.5, 0.5)),
        );
        let body = set.attach_body(entity).unwrap();
        let body = set.get_body(body).unwrap();
        // anchor-centered: top left is position minus half the display size
        assert_eq!(body.position, Vec2::new(84.0, 34.0));
        assert_eq!(body.prev, body.position);
        assert_eq!(body.size, Vec2::new(32.0, 32.0));
    }

    #[test]
    fn entity_scale_sizes_the_body() {
        let mut set = EntitySet::new();
        let entity = set.insert_entity(
            Entity::new(Vec2::new(10.0, 20.0), Vec2::new(16.0, 16.0))
                .with_scale(Vec2::new(2.0, 3.0)),
        );
        let body = set.attach_body(entity).unwrap();
        let body = set.get_body(body).unwrap();
        assert_eq!(body.size, Vec2::new(32.0, 48.0));
        assert_eq!(body.half, Vec2::new(16.0, 24.0));
    }

    #[test]
    fn orphan_bodies_are_swept() {
        let mut set = EntitySet::new();
        let kept = set.insert_entity(Entity::new(Vec2::zero(), Vec2::new(8.0, 8.0)));
        let doomed = set.insert_entity(Entity::new(Vec2::zero(), Vec2::new(8.0, 8.0)));
        let kept_body = set.attach_body(kept).unwrap();
        let doomed_body = set.attach_body(doomed).unwrap();

        set.remove_entity(doomed);
        assert!(set.get_body(doomed_body).is_some());
        set.remove_orphan_bodies();
        assert!(set.get_body(doomed_body).is_none());
        assert!(set.get_body(kept_body).is_some());
    }

    #[test]
    fn attach_to_missing_entity_is_none() {
        let mut set = EntitySet::new();
        let entity = set.insert_entity(Entity::new(Vec2::zero(), Vec2::new(8.0, 8.0)));
        set.remove_entity(entity);
        assert!(set.attach_body(entity).is_none());
    }
}
