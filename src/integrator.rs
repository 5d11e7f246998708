//! Per-body motion integration: the first and last thirds of a physics
//! step. [`pre_update`] refreshes bounds, syncs the transform from the
//! entity, integrates velocity and position and clamps against the world
//! bounds. [`post_update`] writes the resulting delta back to the entity.

use crate::{
    body::{Body, Sides},
    entity::Entity,
    math::Vec2,
    world::WorldConfig,
};

/// Advance one body by one fixed timestep. Disabled bodies are left
/// completely untouched.
pub(crate) fn pre_update(body: &mut Body, entity: &Entity, config: &WorldConfig, dt: f64) {
    if !body.enable {
        return;
    }
    body.dirty = true;

    update_bounds(body, entity);

    body.was_touching = body.touching;
    body.touching = Sides::NONE;
    body.blocked = Sides::NONE;
    body.embedded = false;

    sync_position(body, entity);
    body.rotation = entity.rotation;
    body.pre_rotation = body.rotation;

    if body.moves {
        update_motion(body, config, dt);
        body.position += body.velocity * dt;
        if body.collide_world_bounds {
            check_world_bounds(body, config);
        }
    }
}

/// Recompute the scaled body rectangle if the entity scale changed since
/// the last step.
pub(crate) fn update_bounds(body: &mut Body, entity: &Entity) {
    let scale = Vec2::new(entity.scale.x.abs(), entity.scale.y.abs());
    if scale != body.last_scale {
        body.size = Vec2::new(
            body.source_size.x * scale.x,
            body.source_size.y * scale.y,
        );
        body.half = body.size * 0.5;
        body.last_scale = scale;
        body.center = body.position + body.half;
    }
}

/// Derive the body's top left corner from the entity transform, anchor
/// and the body offset. A negative scale mirrors the entity around its
/// anchor, which shifts the rectangle by its own size.
pub(crate) fn sync_position(body: &mut Body, entity: &Entity) {
    let display = Vec2::new(
        entity.size.x * entity.scale.x.abs(),
        entity.size.y * entity.scale.y.abs(),
    );
    body.position.x =
        (entity.position.x - entity.anchor.x * display.x) + entity.scale.x * body.offset.x;
    if entity.scale.x < 0.0 {
        body.position.x -= body.size.x;
    }
    body.position.y =
        (entity.position.y - entity.anchor.y * display.y) + entity.scale.y * body.offset.y;
    if entity.scale.y < 0.0 {
        body.position.y -= body.size.y;
    }
}

fn update_motion(body: &mut Body, config: &WorldConfig, dt: f64) {
    if body.allow_rotation {
        body.angular_velocity = compute_velocity(
            0.0,
            body.angular_velocity,
            body.angular_acceleration,
            body.angular_drag,
            body.max_angular,
            body.allow_drag,
            dt,
        );
        body.rotation += body.angular_velocity * dt;
    }

    let gravity = if body.allow_gravity {
        config.gravity + body.gravity
    } else {
        Vec2::zero()
    };
    body.velocity.x = compute_velocity(
        gravity.x,
        body.velocity.x,
        body.acceleration.x,
        body.drag.x,
        body.max_velocity.x,
        body.allow_drag,
        dt,
    );
    body.velocity.y = compute_velocity(
        gravity.y,
        body.velocity.y,
        body.acceleration.y,
        body.drag.y,
        body.max_velocity.y,
        body.allow_drag,
        dt,
    );
}

/// One axis of the velocity update. Drag only applies while the axis has
/// no acceleration, opposes the current velocity sign, and snaps to an
/// exact zero instead of overshooting past it.
pub(crate) fn compute_velocity(
    gravity: f64,
    mut velocity: f64,
    acceleration: f64,
    drag: f64,
    max: f64,
    allow_drag: bool,
    dt: f64,
) -> f64 {
    velocity += gravity * dt;
    if acceleration != 0.0 {
        velocity += acceleration * dt;
    } else if drag != 0.0 && allow_drag {
        let drag = drag * dt;
        if velocity - drag > 0.0 {
            velocity -= drag;
        } else if velocity + drag < 0.0 {
            velocity += drag;
        } else {
            velocity = 0.0;
        }
    }

    if velocity > max {
        velocity = max;
    } else if velocity < -max {
        velocity = -max;
    }
    velocity
}

/// Clamp the body inside the world bounds, reflecting velocity on each
/// clamped axis. Returns whether any face was clamped.
pub(crate) fn check_world_bounds(body: &mut Body, config: &WorldConfig) -> bool {
    let bounds = &config.bounds;
    let check = &config.check_collision;
    let bounce = body.world_bounce.unwrap_or(body.bounce);

    if body.position.x < bounds.x && check.left {
        body.position.x = bounds.x;
        body.velocity.x *= -bounce.x;
        body.blocked.left = true;
        body.blocked.none = false;
    } else if body.right() > bounds.right() && check.right {
        body.position.x = bounds.right() - body.size.x;
        body.velocity.x *= -bounce.x;
        body.blocked.right = true;
        body.blocked.none = false;
    }

    if body.position.y < bounds.y && check.up {
        body.position.y = bounds.y;
        body.velocity.y *= -bounce.y;
        body.blocked.up = true;
        body.blocked.none = false;
    } else if body.bottom() > bounds.bottom() && check.down {
        body.position.y = bounds.bottom() - body.size.y;
        body.velocity.y *= -bounce.y;
        body.blocked.down = true;
        body.blocked.none = false;
    }

    body.blocked.any()
}

/// Mirror the step's position delta back onto the entity, clamped per
/// axis by `delta_max` when set, and snapshot state for the next step.
/// Skipped for bodies that were not integrated this step.
pub(crate) fn post_update(body: &mut Body, entity: &mut Entity) {
    if !body.enable || !body.dirty {
        return;
    }
    body.dirty = false;

    if body.moves {
        let mut dx = body.delta_x();
        let mut dy = body.delta_y();
        if body.delta_max.x != 0.0 && dx != 0.0 {
            if dx < -body.delta_max.x {
                dx = -body.delta_max.x;
            } else if dx > body.delta_max.x {
                dx = body.delta_max.x;
            }
        }
        if body.delta_max.y != 0.0 && dy != 0.0 {
            if dy < -body.delta_max.y {
                dy = -body.delta_max.y;
            } else if dy > body.delta_max.y {
                dy = body.delta_max.y;
            }
        }
        entity.position.x += dx;
        entity.position.y += dy;
    }
    if body.allow_rotation {
        entity.rotation += body.delta_z();
    }

    body.center = body.position + body.half;
    body.prev = body.position;
}
