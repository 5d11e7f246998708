use crate::{
    entity::EntityKey,
    math::{Axis, Rect, Vec2},
};

/// Per-face boolean flags, used for contact reporting (`touching`, `blocked`)
/// and for filtering which faces may collide at all (`check_collision`).
///
/// `none` is the inverse convenience flag: true while no face is set.
#[cfg_attr(feature = "serde-types", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sides {
    pub none: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Sides {
    /// No face set. The starting state of `touching` and `blocked` each step.
    pub const NONE: Sides = Sides {
        none: true,
        up: false,
        down: false,
        left: false,
        right: false,
    };

    /// Every face set. The default collision filter.
    pub const ALL: Sides = Sides {
        none: false,
        up: true,
        down: true,
        left: true,
        right: true,
    };

    #[inline]
    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    /// The face on the positive end of the given axis (right or down).
    #[inline]
    pub(crate) fn max_face(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.right,
            Axis::Y => self.down,
        }
    }

    /// The face on the negative end of the given axis (left or up).
    #[inline]
    pub(crate) fn min_face(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.left,
            Axis::Y => self.up,
        }
    }

    #[inline]
    pub(crate) fn set_max_face(&mut self, axis: Axis) {
        self.none = false;
        match axis {
            Axis::X => self.right = true,
            Axis::Y => self.down = true,
        }
    }

    #[inline]
    pub(crate) fn set_min_face(&mut self, axis: Axis) {
        self.none = false;
        match axis {
            Axis::X => self.left = true,
            Axis::Y => self.up = true,
        }
    }
}

impl Default for Sides {
    fn default() -> Self {
        Sides::NONE
    }
}

/// The kinematic state and collision bookkeeping of one physics-enabled
/// entity. Bodies are axis-aligned rectangles; `position` is the top left
/// corner of that rectangle in world space.
///
/// A body holds a copyable handle back to its entity, never an owning
/// reference. When the entity is removed, the body is swept out at the
/// start of the next step.
#[derive(Clone, Copy, Debug)]
pub struct Body {
    pub(crate) entity: EntityKey,

    /// Disabled bodies are skipped by integration and every collision test.
    pub enable: bool,
    /// When false the body never moves on its own; it can still be
    /// repositioned through its entity.
    pub moves: bool,
    /// Immovable bodies take no position correction or velocity exchange
    /// from collisions. Platforms and walls are immovable.
    pub immovable: bool,
    pub allow_gravity: bool,
    pub allow_drag: bool,
    pub allow_rotation: bool,
    /// Clamp the body inside the world bounds, reflecting velocity by
    /// `-bounce` (or `-world_bounce` when set) on each clamped axis.
    pub collide_world_bounds: bool,
    /// Per-body override of the world's quadtree routing flag.
    pub skip_quad_tree: bool,
    /// Opt out of built-in X separation; the pair still reports touching
    /// and overlap so the caller can resolve it however it wants.
    pub custom_separate_x: bool,
    pub custom_separate_y: bool,

    /// Top left corner of the body rectangle in world space.
    pub position: Vec2,
    /// Position at the end of the previous step. The difference is the
    /// per-step delta that drives separation direction and overlap caps.
    pub prev: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    /// Deceleration applied per axis while that axis has no acceleration.
    pub drag: Vec2,
    /// Extra gravity added on top of the world's gravity vector.
    pub gravity: Vec2,
    /// Rebound energy per axis, 0 is none and 1 a full elastic bounce.
    pub bounce: Vec2,
    /// Separate rebound used against the world bounds when set.
    pub world_bounce: Option<Vec2>,
    pub max_velocity: Vec2,
    /// How strongly this body drags riders along when they stand on it
    /// while it moves. Only consulted on immovable bodies.
    pub friction: Vec2,
    pub mass: f64,

    /// Orientation in radians. Purely presentational; collision shapes
    /// do not rotate.
    pub rotation: f64,
    pub(crate) pre_rotation: f64,
    pub angular_velocity: f64,
    pub angular_acceleration: f64,
    pub angular_drag: f64,
    pub max_angular: f64,

    /// Offset of the body rectangle from the entity origin, scaled by the
    /// entity scale during transform sync.
    pub offset: Vec2,
    /// Current scaled width and height of the body rectangle.
    pub size: Vec2,
    pub(crate) source_size: Vec2,
    pub(crate) last_scale: Vec2,
    pub half: Vec2,
    pub center: Vec2,

    /// Which faces of this body are allowed to collide. Setting `none`
    /// excludes the body from separation entirely.
    pub check_collision: Sides,
    /// Faces in contact with another body this step.
    pub touching: Sides,
    /// Snapshot of `touching` from the previous step.
    pub was_touching: Sides,
    /// Faces obstructed by the world bounds this step.
    pub blocked: Sides,
    /// Set when this body overlaps another with zero relative motion on
    /// the tested axis, the spawned-inside-something state.
    pub embedded: bool,
    /// Penetration depth found by the most recent X axis separation.
    pub overlap_x: f64,
    pub overlap_y: f64,

    /// Per-axis cap on how far the entity may be moved in one write-back.
    /// Zero disables the cap.
    pub delta_max: Vec2,
    pub(crate) dirty: bool,
}

impl Body {
    /// A body owned by the given entity, sized to `source_size` before
    /// scaling. Callers normally go through `EntitySet::attach_body`,
    /// which also syncs the starting transform.
    pub fn new(entity: EntityKey, source_size: Vec2) -> Self {
        Self {
            entity,
            enable: true,
            moves: true,
            immovable: false,
            allow_gravity: true,
            allow_drag: true,
            allow_rotation: true,
            collide_world_bounds: false,
            skip_quad_tree: false,
            custom_separate_x: false,
            custom_separate_y: false,
            position: Vec2::zero(),
            prev: Vec2::zero(),
            velocity: Vec2::zero(),
            acceleration: Vec2::zero(),
            drag: Vec2::zero(),
            gravity: Vec2::zero(),
            bounce: Vec2::zero(),
            world_bounce: None,
            max_velocity: Vec2::new(10000.0, 10000.0),
            friction: Vec2::new(1.0, 0.0),
            mass: 1.0,
            rotation: 0.0,
            pre_rotation: 0.0,
            angular_velocity: 0.0,
            angular_acceleration: 0.0,
            angular_drag: 0.0,
            max_angular: 1000.0,
            offset: Vec2::zero(),
            size: source_size,
            source_size,
            last_scale: Vec2::new(1.0, 1.0),
            half: source_size * 0.5,
            center: source_size * 0.5,
            check_collision: Sides::ALL,
            touching: Sides::NONE,
            was_touching: Sides::NONE,
            blocked: Sides::NONE,
            embedded: false,
            overlap_x: 0.0,
            overlap_y: 0.0,
            delta_max: Vec2::zero(),
            dirty: false,
        }
    }

    /// Set the starting velocity in a builder-like chain.
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_bounce(mut self, bounce: Vec2) -> Self {
        self.bounce = bounce;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Make the body a wall or platform: it never takes correction from
    /// collisions and ignores gravity.
    pub fn make_static(mut self) -> Self {
        self.immovable = true;
        self.moves = false;
        self.allow_gravity = false;
        self
    }

    /// The entity this body is attached to.
    #[inline]
    pub fn entity(&self) -> EntityKey {
        self.entity
    }

    /// The body rectangle in world space.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.position.x + self.size.x
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.position.y + self.size.y
    }

    /// How far the body has moved along x this step.
    #[inline]
    pub fn delta_x(&self) -> f64 {
        self.position.x - self.prev.x
    }

    #[inline]
    pub fn delta_y(&self) -> f64 {
        self.position.y - self.prev.y
    }

    /// How far the body has rotated this step, in radians.
    #[inline]
    pub fn delta_z(&self) -> f64 {
        self.rotation - self.pre_rotation
    }

    #[inline]
    pub(crate) fn delta(&self, axis: Axis) -> f64 {
        axis.of(self.position) - axis.of(self.prev)
    }

    #[inline]
    pub(crate) fn delta_abs(&self, axis: Axis) -> f64 {
        self.delta(axis).abs()
    }

    /// Leading edge on the negative end of the axis (left or top).
    #[inline]
    pub(crate) fn min_edge(&self, axis: Axis) -> f64 {
        axis.of(self.position)
    }

    /// Trailing edge on the positive end of the axis (right or bottom).
    #[inline]
    pub(crate) fn max_edge(&self, axis: Axis) -> f64 {
        axis.of(self.position) + axis.of(self.size)
    }

    #[inline]
    pub(crate) fn custom_separate(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.custom_separate_x,
            Axis::Y => self.custom_separate_y,
        }
    }

    #[inline]
    pub(crate) fn set_overlap(&mut self, axis: Axis, overlap: f64) {
        match axis {
            Axis::X => self.overlap_x = overlap,
            Axis::Y => self.overlap_y = overlap,
        }
    }

    /// True while the body's bottom face rests on the world bounds.
    #[inline]
    pub fn on_floor(&self) -> bool {
        self.blocked.down
    }

    #[inline]
    pub fn on_ceiling(&self) -> bool {
        self.blocked.up
    }

    #[inline]
    pub fn on_wall(&self) -> bool {
        self.blocked.left || self.blocked.right
    }

    /// Zero all linear and angular motion.
    pub fn stop(&mut self) {
        self.velocity = Vec2::zero();
        self.acceleration = Vec2::zero();
        self.angular_velocity = 0.0;
        self.angular_acceleration = 0.0;
    }

    /// Resize the body rectangle independently of the entity's display
    /// size, for example to shrink a hitbox. `source_size` is the unscaled
    /// size; `offset` moves the rectangle relative to the entity origin.
    pub fn set_size(&mut self, source_size: Vec2, offset: Vec2) {
        self.source_size = source_size;
        self.size = Vec2::new(
            source_size.x * self.last_scale.x,
            source_size.y * self.last_scale.y,
        );
        self.half = self.size * 0.5;
        self.offset = offset;
        self.center = self.position + self.half;
    }
}
