//! The narrow phase: exact rectangle intersection and the axis-separated
//! impulse response between one pair of bodies.

use crate::{body::Body, math::Axis, world::WorldConfig};

/// Half-open rectangle overlap between two bodies. Edges that merely
/// touch do not count as an intersection.
#[inline]
pub fn intersects(a: &Body, b: &Body) -> bool {
    if a.right() <= b.position.x {
        return false;
    }
    if a.bottom() <= b.position.y {
        return false;
    }
    if a.position.x >= b.right() {
        return false;
    }
    if a.position.y >= b.bottom() {
        return false;
    }
    true
}

/// Test one pair and, unless `overlap_only` is set, push the bodies apart
/// and exchange velocity. Returns whether anything was resolved (or, in
/// overlap-only mode, whether the pair intersected at all).
///
/// `process` runs once the pair is known to intersect and can veto the
/// resolution by returning false.
pub(crate) fn separate(
    a: &mut Body,
    b: &mut Body,
    config: &WorldConfig,
    process: &mut dyn FnMut(&Body, &Body) -> bool,
    overlap_only: bool,
) -> bool {
    if !a.enable || !b.enable || a.check_collision.none || b.check_collision.none {
        return false;
    }
    // two immovable bodies can never be pushed apart
    if a.immovable && b.immovable {
        return false;
    }
    if !intersects(a, b) {
        return false;
    }
    if !process(a, b) {
        return false;
    }

    // the dominant gravity axis resolves first, then the cross axis
    // reruns on the already adjusted positions
    let gravity = config.gravity + a.gravity;
    let first = if config.force_x || gravity.y.abs() < gravity.x.abs() {
        Axis::X
    } else {
        Axis::Y
    };
    let first_hit = separate_axis(a, b, first, config.overlap_bias, overlap_only);
    let second_hit = separate_axis(a, b, first.other(), config.overlap_bias, overlap_only);

    if overlap_only {
        true
    } else {
        first_hit || second_hit
    }
}

/// One axis of the separation. The overlap is owned by whichever body
/// moved further along the axis this step and is capped at the combined
/// per-step motion plus the bias, which throws out stale deep overlaps
/// the pair cannot have caused this step.
fn separate_axis(a: &mut Body, b: &mut Body, axis: Axis, bias: f64, overlap_only: bool) -> bool {
    if !intersects(a, b) {
        return false;
    }

    let max_overlap = a.delta_abs(axis) + b.delta_abs(axis) + bias;
    let delta_a = a.delta(axis);
    let delta_b = b.delta(axis);
    let mut overlap = 0.0;

    if delta_a == 0.0 && delta_b == 0.0 {
        // overlapping without motion: spawned inside each other
        a.embedded = true;
        b.embedded = true;
    } else if delta_a > delta_b {
        overlap = a.max_edge(axis) - b.min_edge(axis);
        if overlap > max_overlap
            || !a.check_collision.max_face(axis)
            || !b.check_collision.min_face(axis)
        {
            overlap = 0.0;
        } else {
            a.touching.set_max_face(axis);
            b.touching.set_min_face(axis);
        }
    } else if delta_a < delta_b {
        // approach from the positive side, overlap comes out negative
        overlap = a.min_edge(axis) - b.max_edge(axis);
        if -overlap > max_overlap
            || !a.check_collision.min_face(axis)
            || !b.check_collision.max_face(axis)
        {
            overlap = 0.0;
        } else {
            a.touching.set_min_face(axis);
            b.touching.set_max_face(axis);
        }
    }

    a.set_overlap(axis, overlap);
    b.set_overlap(axis, overlap);

    if overlap == 0.0 {
        return false;
    }
    if overlap_only || a.custom_separate(axis) || b.custom_separate(axis) {
        return true;
    }

    let v1 = axis.of(a.velocity);
    let v2 = axis.of(b.velocity);
    if !a.immovable && !b.immovable {
        let half = overlap * 0.5;
        *axis.of_mut(&mut a.position) -= half;
        *axis.of_mut(&mut b.position) += half;
        let mut nv1 = exchange_velocity(v2, b.mass, a.mass);
        let mut nv2 = exchange_velocity(v1, a.mass, b.mass);
        let average = (nv1 + nv2) * 0.5;
        nv1 -= average;
        nv2 -= average;
        *axis.of_mut(&mut a.velocity) = average + nv1 * axis.of(a.bounce);
        *axis.of_mut(&mut b.velocity) = average + nv2 * axis.of(b.bounce);
    } else if !a.immovable {
        *axis.of_mut(&mut a.position) -= overlap;
        *axis.of_mut(&mut a.velocity) = v2 - v1 * axis.of(a.bounce);
        // standing on a platform that moved on the other axis drags the
        // rider along with it
        if b.moves {
            let ride = axis.other();
            *ride.of_mut(&mut a.position) += b.delta(ride) * ride.of(b.friction);
        }
    } else if !b.immovable {
        *axis.of_mut(&mut b.position) += overlap;
        *axis.of_mut(&mut b.velocity) = v1 - v2 * axis.of(b.bounce);
        if a.moves {
            let ride = axis.other();
            *ride.of_mut(&mut b.position) += a.delta(ride) * ride.of(a.friction);
        }
    }
    true
}

/// The mass-weighted elastic exchange term: the velocity one body would
/// take on from the other in a simplified head-on elastic collision.
///
/// A zero or negative mass pushes the ratio under the square root out of
/// its domain, which would quietly turn every later position into NaN,
/// so those inputs are defined to exchange nothing instead.
pub(crate) fn exchange_velocity(v_other: f64, m_other: f64, m_self: f64) -> f64 {
    let ratio = v_other * v_other * m_other / m_self;
    if !ratio.is_finite() || ratio <= 0.0 {
        return 0.0;
    }
    let magnitude = ratio.sqrt();
    if v_other > 0.0 {
        magnitude
    } else {
        -magnitude
    }
}
