//! The world object owning all simulation state, plus its configuration.

use crate::{
    body::{Body, Sides},
    collision::{
        broadphase::DispatchPass, narrowphase, CollideTarget, ContactEvent, QuadTree,
        SortDirection,
    },
    entity::{BodyKey, EntitySet},
    integrator,
    math::{Rect, Vec2},
};

/// Setup-time misconfiguration. Anything that goes wrong after setup is
/// a silent no-op instead, so a running step never fails mid-frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("world bounds must have a positive area")]
    EmptyBounds,
    #[error("quadtree max objects must be at least 1")]
    ZeroMaxObjects,
    #[error("quadtree max levels must be at least 1")]
    ZeroMaxLevels,
}

/// World configuration, consumed once by [`PhysicsWorld::new`][PhysicsWorld::new]
/// and immutable afterwards.
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
#[derive(Clone, Copy, Debug)]
pub struct WorldConfig {
    /// The rectangle that bodies with
    /// [`collide_world_bounds`][crate::Body::collide_world_bounds] are kept
    /// inside, and the region covered by the quadtree.
    pub bounds: Rect,
    /// Gravity applied to every body that allows it, in px/s².
    pub gravity: Vec2,
    /// Slack added to the per-step motion cap during separation, in px.
    /// Raise it if fast bodies jitter against walls, lower it if slow
    /// bodies sink into each other.
    pub overlap_bias: f64,
    /// Resolve the x axis first regardless of the gravity direction.
    pub force_x: bool,
    /// Sweep order for collection dispatch. Groups can override this
    /// per group; pick the axis bodies are most spread out along.
    pub sort_direction: SortDirection,
    /// When true, collection dispatch always uses the sorted sweep.
    /// When false, bodies that also leave their own
    /// [`skip_quad_tree`][crate::Body::skip_quad_tree] flag false are
    /// paired through the quadtree instead.
    pub skip_quad_tree: bool,
    /// How many bodies a quadtree node holds before splitting.
    pub max_objects: usize,
    /// Quadtree depth cap.
    pub max_levels: usize,
    /// Which edges of the world bounds stop bodies at all.
    pub check_collision: Sides,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, 800.0, 600.0),
            gravity: Vec2::zero(),
            overlap_bias: 4.0,
            force_x: false,
            sort_direction: SortDirection::LeftRight,
            skip_quad_tree: true,
            max_objects: 10,
            max_levels: 4,
            check_collision: Sides::ALL,
        }
    }
}

impl WorldConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        // negated comparisons so NaN dimensions fail too
        if !(self.bounds.width > 0.0) || !(self.bounds.height > 0.0) {
            return Err(ConfigError::EmptyBounds);
        }
        if self.max_objects == 0 {
            return Err(ConfigError::ZeroMaxObjects);
        }
        if self.max_levels == 0 {
            return Err(ConfigError::ZeroMaxLevels);
        }
        Ok(())
    }
}

/// The entry point of the crate, owning every entity, body and group
/// plus the scratch quadtree.
///
/// The host game loop drives a step in three phases:
/// [`pre_update`][Self::pre_update] integrates motion, any number of
/// [`collide`][Self::collide] and [`overlap`][Self::overlap] calls
/// resolve or report pairs, and [`post_update`][Self::post_update]
/// writes adjusted transforms back to the entities. A step touches no
/// other state, so the whole sequence is deterministic for a given
/// starting state and configuration.
pub struct PhysicsWorld {
    pub entity_set: EntitySet,
    config: WorldConfig,
    quadtree: QuadTree,
    /// While true, [`pre_update`][Self::pre_update] leaves all bodies
    /// where they are.
    pub paused: bool,
}

impl PhysicsWorld {
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            entity_set: EntitySet::new(),
            quadtree: QuadTree::new(config.bounds, config.max_objects, config.max_levels),
            config,
            paused: false,
        })
    }

    /// The configuration the world was created with.
    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Integrate every enabled body forward by `dt` seconds: sync from
    /// its entity transform, apply gravity, acceleration and drag, move,
    /// and clamp to the world bounds where requested.
    ///
    /// Also sweeps out bodies whose entities have been removed, which is
    /// done even while paused.
    pub fn pre_update(&mut self, dt: f64) {
        let _span = tracy_client::span!("physics pre_update");

        self.entity_set.remove_orphan_bodies();
        if self.paused {
            return;
        }
        let entities = &self.entity_set.entities;
        for (_, body) in self.entity_set.bodies.iter_mut() {
            let Some(entity) = entities.get(body.entity.0) else {
                continue;
            };
            integrator::pre_update(body, entity, &self.config, dt);
        }
    }

    /// Write every moved body's position and rotation deltas back to its
    /// entity, clamped per axis by the body's
    /// [`delta_max`][crate::Body::delta_max].
    pub fn post_update(&mut self) {
        let _span = tracy_client::span!("physics post_update");

        let entities = &mut self.entity_set.entities;
        for (_, body) in self.entity_set.bodies.iter_mut() {
            let Some(entity) = entities.get_mut(body.entity.0) else {
                continue;
            };
            integrator::post_update(body, entity);
        }
    }

    /// Collide two targets, separating every intersecting pair and
    /// exchanging velocity. Either side can be a single body or a group.
    /// Returns whether any pair collided.
    pub fn collide(
        &mut self,
        first: impl Into<CollideTarget>,
        second: impl Into<CollideTarget>,
    ) -> bool {
        self.dispatch(first.into(), second.into(), false, &mut |_| (), &mut |_, _| true)
    }

    /// [`collide`][Self::collide] with callbacks: `on_contact` runs once
    /// per resolved pair, `process` runs on each intersecting pair first
    /// and drops the pair by returning false.
    pub fn collide_with(
        &mut self,
        first: impl Into<CollideTarget>,
        second: impl Into<CollideTarget>,
        mut on_contact: impl FnMut(ContactEvent),
        mut process: impl FnMut(&Body, &Body) -> bool,
    ) -> bool {
        self.dispatch(
            first.into(),
            second.into(),
            false,
            &mut on_contact,
            &mut process,
        )
    }

    /// Report every intersecting pair without touching positions or
    /// velocities. Touching and overlap bookkeeping is still written.
    /// Returns whether any pair overlapped.
    pub fn overlap(
        &mut self,
        first: impl Into<CollideTarget>,
        second: impl Into<CollideTarget>,
    ) -> bool {
        self.dispatch(first.into(), second.into(), true, &mut |_| (), &mut |_, _| true)
    }

    /// [`overlap`][Self::overlap] with callbacks, in the same shape as
    /// [`collide_with`][Self::collide_with].
    pub fn overlap_with(
        &mut self,
        first: impl Into<CollideTarget>,
        second: impl Into<CollideTarget>,
        mut on_contact: impl FnMut(ContactEvent),
        mut process: impl FnMut(&Body, &Body) -> bool,
    ) -> bool {
        self.dispatch(
            first.into(),
            second.into(),
            true,
            &mut on_contact,
            &mut process,
        )
    }

    fn dispatch(
        &mut self,
        first: CollideTarget,
        second: CollideTarget,
        overlap_only: bool,
        on_contact: &mut dyn FnMut(ContactEvent),
        process: &mut dyn FnMut(&Body, &Body) -> bool,
    ) -> bool {
        let _span = tracy_client::span!("physics dispatch");

        let mut pass = DispatchPass {
            config: &self.config,
            bodies: &mut self.entity_set.bodies,
            groups: &self.entity_set.groups,
            quadtree: &mut self.quadtree,
            on_contact,
            process,
            overlap_only,
            total: 0,
        };
        pass.run(first, second);
        pass.total > 0
    }

    /// Exact half-open intersection test between two bodies, false if
    /// either has been removed.
    pub fn intersects(&self, a: BodyKey, b: BodyKey) -> bool {
        match (self.entity_set.get_body(a), self.entity_set.get_body(b)) {
            (Some(a), Some(b)) => narrowphase::intersects(a, b),
            _ => false,
        }
    }

    /// Teleport a body's entity so the body lands at `position`, with all
    /// motion zeroed and the previous position rewritten to match.
    pub fn reset_body(&mut self, key: BodyKey, position: Vec2) {
        let Some(body) = self.entity_set.bodies.get_mut(key.0) else {
            return;
        };
        let Some(entity) = self.entity_set.entities.get_mut(body.entity.0) else {
            return;
        };
        entity.position = position;
        body.stop();
        integrator::update_bounds(body, entity);
        integrator::sync_position(body, entity);
        body.prev = body.position;
        body.rotation = entity.rotation;
        body.pre_rotation = body.rotation;
        body.center = body.position + body.half;
    }

    /// Remove every entity, body and group.
    pub fn clear(&mut self) {
        self.entity_set.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collision::Group, entity::Entity};
    use rand::{Rng, SeedableRng};

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(WorldConfig::default()).unwrap()
    }

    fn spawn(world: &mut PhysicsWorld, x: f64, y: f64, size: f64) -> BodyKey {
        let entity = world
            .entity_set
            .insert_entity(Entity::new(Vec2::new(x, y), Vec2::new(size, size)));
        world.entity_set.attach_body(entity).unwrap()
    }

    #[test]
    fn config_validation_fails_fast() {
        let bad_levels = WorldConfig {
            max_levels: 0,
            ..WorldConfig::default()
        };
        assert_eq!(
            PhysicsWorld::new(bad_levels).err(),
            Some(ConfigError::ZeroMaxLevels)
        );

        let bad_objects = WorldConfig {
            max_objects: 0,
            ..WorldConfig::default()
        };
        assert_eq!(
            PhysicsWorld::new(bad_objects).err(),
            Some(ConfigError::ZeroMaxObjects)
        );

        let bad_bounds = WorldConfig {
            bounds: Rect::new(0.0, 0.0, 0.0, 600.0),
            ..WorldConfig::default()
        };
        assert_eq!(
            PhysicsWorld::new(bad_bounds).err(),
            Some(ConfigError::EmptyBounds)
        );
    }

    #[test]
    fn approach_touches_only_on_the_overlapping_step() {
        let mut world = world();
        let mover = spawn(&mut world, 5.0, 0.0, 32.0);
        let wall = spawn(&mut world, 40.0, 0.0, 32.0);
        world.entity_set.get_body_mut(mover).unwrap().velocity = Vec2::new(30.0, 0.0);
        world.entity_set.get_body_mut(wall).unwrap().immovable = true;

        // first step ends exactly touching, which is not a collision
        world.pre_update(0.1);
        assert!(!world.collide(mover, wall));
        world.post_update();
        {
            let body = world.entity_set.get_body(mover).unwrap();
            assert_eq!(body.right(), 40.0);
            assert!(!body.touching.any());
        }
        // half-open rectangles, an exact touch is not an intersection
        assert!(!world.intersects(mover, wall));

        // second step overlaps by three pixels and resolves
        world.pre_update(0.1);
        assert!(world.intersects(mover, wall));
        assert!(world.collide(mover, wall));
        world.post_update();
        let body = world.entity_set.get_body(mover).unwrap();
        assert!(body.touching.right);
        assert_eq!(body.right(), 40.0);
        assert_eq!(body.velocity.x, 0.0);
        let wall_body = world.entity_set.get_body(wall).unwrap();
        assert!(wall_body.touching.left);
        assert_eq!(wall_body.position.x, 40.0);
        // the write-back moved the entity along with the body
        let entity = world.entity_set.get_body_entity(mover).unwrap();
        assert_eq!(entity.position.x, 8.0);
    }

    #[test]
    fn touching_rolls_over_to_was_touching() {
        let mut world = world();
        let mover = spawn(&mut world, 5.0, 0.0, 32.0);
        let wall = spawn(&mut world, 40.0, 0.0, 32.0);
        world.entity_set.get_body_mut(mover).unwrap().velocity = Vec2::new(30.0, 0.0);
        world.entity_set.get_body_mut(wall).unwrap().immovable = true;

        for _ in 0..2 {
            world.pre_update(0.1);
            world.collide(mover, wall);
            world.post_update();
        }
        // the third pre_update clears touching into was_touching before
        // any new contact is found
        world.pre_update(0.1);
        let body = world.entity_set.get_body(mover).unwrap();
        assert!(body.was_touching.right);
        assert!(!body.touching.right);
    }

    #[test]
    fn driven_far_out_lands_exactly_on_the_boundary() {
        let mut world = world();
        let runaway = spawn(&mut world, 700.0, 100.0, 32.0);
        {
            let body = world.entity_set.get_body_mut(runaway).unwrap();
            body.velocity = Vec2::new(5000.0, 0.0);
            body.collide_world_bounds = true;
        }
        world.pre_update(0.1);
        world.post_update();
        let body = world.entity_set.get_body(runaway).unwrap();
        assert_eq!(body.position.x, 800.0 - 32.0);
        assert!(body.blocked.right);
        assert!(body.on_wall());
        let entity = world.entity_set.get_body_entity(runaway).unwrap();
        assert_eq!(entity.position.x, 768.0);
    }

    #[test]
    fn paused_world_stands_still() {
        let mut world = world();
        let key = spawn(&mut world, 100.0, 100.0, 32.0);
        world.entity_set.get_body_mut(key).unwrap().velocity = Vec2::new(50.0, 0.0);

        world.paused = true;
        world.pre_update(0.1);
        world.post_update();
        assert_eq!(
            world.entity_set.get_body(key).unwrap().position,
            Vec2::new(100.0, 100.0)
        );

        world.paused = false;
        world.pre_update(0.1);
        world.post_update();
        assert_eq!(
            world.entity_set.get_body(key).unwrap().position,
            Vec2::new(105.0, 100.0)
        );
    }

    #[test]
    fn contact_callbacks_carry_entity_keys() {
        let mut world = world();
        let mover = spawn(&mut world, 10.0, 0.0, 32.0);
        let target = spawn(&mut world, 40.0, 0.0, 32.0);
        world.entity_set.get_body_mut(mover).unwrap().velocity = Vec2::new(50.0, 0.0);

        world.pre_update(0.1);
        let mut seen = Vec::new();
        let hit = world.collide_with(
            mover,
            target,
            |event| seen.push((event.body_a, event.entity_a, event.body_b, event.entity_b)),
            |_, _| true,
        );
        assert!(hit);
        let mover_entity = world.entity_set.get_body(mover).unwrap().entity();
        let target_entity = world.entity_set.get_body(target).unwrap().entity();
        assert_eq!(seen, vec![(mover, mover_entity, target, target_entity)]);
    }

    #[test]
    fn process_veto_reaches_the_dispatcher() {
        let mut world = world();
        let mover = spawn(&mut world, 10.0, 0.0, 32.0);
        let target = spawn(&mut world, 40.0, 0.0, 32.0);
        world.entity_set.get_body_mut(mover).unwrap().velocity = Vec2::new(50.0, 0.0);

        world.pre_update(0.1);
        let before = world.entity_set.get_body(mover).unwrap().position;
        let hit = world.collide_with(mover, target, |_| (), |_, _| false);
        assert!(!hit);
        assert_eq!(world.entity_set.get_body(mover).unwrap().position, before);
    }

    #[test]
    fn group_collisions_through_the_world_api() {
        let mut world = world();
        let player = spawn(&mut world, 10.0, 0.0, 32.0);
        world.entity_set.get_body_mut(player).unwrap().velocity = Vec2::new(50.0, 0.0);
        let near = spawn(&mut world, 40.0, 0.0, 32.0);
        let far = spawn(&mut world, 300.0, 0.0, 32.0);

        let mut group = Group::new();
        group.add(near);
        let group = world.entity_set.insert_group(group);
        // membership can still change after insertion
        world.entity_set.get_group_mut(group).unwrap().add(far);

        world.pre_update(0.1);
        let mut contacts = 0;
        world.collide_with(player, group, |_| contacts += 1, |_, _| true);
        world.post_update();
        assert_eq!(contacts, 1);
    }

    #[test]
    fn removed_group_is_a_silent_no_op() {
        let mut world = world();
        let mover = spawn(&mut world, 10.0, 0.0, 32.0);
        world.entity_set.get_body_mut(mover).unwrap().velocity = Vec2::new(50.0, 0.0);
        let member = spawn(&mut world, 40.0, 0.0, 32.0);
        let mut group = Group::new();
        group.add(member);
        let group = world.entity_set.insert_group(group);

        assert!(world.entity_set.remove_group(group).is_some());
        assert!(world.entity_set.get_group(group).is_none());
        world.pre_update(0.1);
        assert!(!world.collide(mover, group));
        // the member body is not touched by the group's removal
        assert!(world.entity_set.get_body(member).is_some());
    }

    #[test]
    fn removed_entity_takes_its_body_out_of_the_step() {
        let mut world = world();
        let doomed = spawn(&mut world, 10.0, 0.0, 32.0);
        let doomed_entity = world.entity_set.get_body(doomed).unwrap().entity();
        world.entity_set.remove_entity(doomed_entity);

        // the sweep at the start of the step removes the orphan
        world.pre_update(0.1);
        assert!(world.entity_set.get_body(doomed).is_none());
        assert!(!world.collide(doomed, doomed));
        assert!(!world.intersects(doomed, doomed));
    }

    #[test]
    fn clear_empties_the_world() {
        let mut world = world();
        let key = spawn(&mut world, 10.0, 10.0, 32.0);
        let mut group = Group::new();
        group.add(key);
        world.entity_set.insert_group(group);

        world.clear();
        assert!(world.entity_set.get_body(key).is_none());
        assert_eq!(world.entity_set.entities.len(), 0);
        assert_eq!(world.entity_set.bodies.len(), 0);
        assert_eq!(world.entity_set.groups.len(), 0);

        // the world keeps working after a wipe
        let again = spawn(&mut world, 10.0, 10.0, 32.0);
        world.entity_set.get_body_mut(again).unwrap().velocity = Vec2::new(50.0, 0.0);
        world.pre_update(0.1);
        assert_eq!(
            world.entity_set.get_body(again).unwrap().position,
            Vec2::new(15.0, 10.0)
        );
    }

    #[test]
    fn reset_body_rewrites_history() {
        let mut world = world();
        let key = spawn(&mut world, 10.0, 10.0, 32.0);
        world.entity_set.get_body_mut(key).unwrap().velocity = Vec2::new(50.0, 0.0);
        world.pre_update(0.1);
        world.post_update();

        world.reset_body(key, Vec2::new(200.0, 200.0));
        let body = world.entity_set.get_body(key).unwrap();
        assert_eq!(body.position, Vec2::new(200.0, 200.0));
        assert_eq!(body.prev, body.position);
        assert_eq!(body.velocity, Vec2::zero());
        let entity = world.entity_set.get_body_entity(key).unwrap();
        assert_eq!(entity.position, Vec2::new(200.0, 200.0));
    }

    #[test]
    fn identical_runs_are_bit_identical() {
        let run = || {
            let config = WorldConfig {
                gravity: Vec2::new(0.0, 300.0),
                ..WorldConfig::default()
            };
            let mut world = PhysicsWorld::new(config).unwrap();
            let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);
            let mut group = Group::new();
            for _ in 0..30 {
                let key = spawn(
                    &mut world,
                    rng.gen_range(0.0..760.0),
                    rng.gen_range(0.0..560.0),
                    8.0 + rng.gen_range(0.0..24.0),
                );
                let body = world.entity_set.get_body_mut(key).unwrap();
                body.velocity = Vec2::new(rng.gen_range(-80.0..80.0), rng.gen_range(-80.0..80.0));
                body.bounce = Vec2::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));
                body.mass = rng.gen_range(0.5..4.0);
                body.collide_world_bounds = true;
                group.add(key);
            }
            let group = world.entity_set.insert_group(group);

            for _ in 0..60 {
                world.pre_update(1.0 / 60.0);
                world.collide(group, group);
                world.post_update();
            }

            let mut snapshot = Vec::new();
            for (_, body) in world.entity_set.bodies.iter() {
                snapshot.push((
                    body.position.x,
                    body.position.y,
                    body.velocity.x,
                    body.velocity.y,
                ));
            }
            snapshot
        };

        assert_eq!(run(), run());
    }

    #[cfg(feature = "serde-types")]
    #[test]
    fn config_reads_from_ron() {
        let config: WorldConfig = ron::from_str(
            r#"(
                bounds: (x: 0.0, y: 0.0, width: 1024.0, height: 768.0),
                gravity: (x: 0.0, y: 980.0),
                sort_direction: TopBottom,
            )"#,
        )
        .unwrap();
        assert_eq!(config.bounds.width, 1024.0);
        assert_eq!(config.gravity.y, 980.0);
        assert_eq!(config.sort_direction, SortDirection::TopBottom);
        // everything not named keeps its default
        assert_eq!(config.overlap_bias, 4.0);
        assert!(config.skip_quad_tree);
    }
}
