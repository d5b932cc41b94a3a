//! PID steering for autonomous ships.
//!
//! Every AI-driven ship calls [`compute_thrust`] once per tick with the point
//! it wants to head towards. The controller turns the heading error into an
//! angular thrust and switches forward thrust on once the ship roughly faces
//! its target. The result is later clamped by [`crate::ships::Ship::set_thrust`]
//! and applied as acceleration on the next physics step.
//!
//! # Known limitation
//!
//! The integral term has no anti-windup and is never reset when a target
//! is reached. Heading is not normalized either, so a ship that has spun
//! several full turns keeps a large error until it unwinds. Both are kept
//! for behavioural fidelity with the tuned constants below.

use std::f32::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Proportional gain.
pub const KP: f32 = 50.0;
/// Integral gain.
pub const KI: f32 = 0.01;
/// Derivative gain.
pub const KD: f32 = 20.0;

/// Heading error below which forward thrust is engaged.
pub const FORWARD_CONE: f32 = FRAC_PI_4;

/// Per-ship PID memory.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidState {
    /// Error seen on the previous update.
    pub prev_error: f32,
    /// Accumulated error (unbounded).
    pub integral: f32,
}

/// Raw thrust request, before ship limits are applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Thrust {
    /// Forward thrust along the ship's heading.
    pub forward: f32,
    /// Angular thrust (positive turns counter-clockwise).
    pub angular: f32,
}

/// Compute the thrust that pushes a ship at `position`/`heading` towards `target`.
///
/// `max_forward` is the ship's maximum forward velocity, requested in full
/// whenever the heading error is inside [`FORWARD_CONE`]. A non-positive
/// `dt` returns zero thrust and leaves `pid` untouched.
pub fn compute_thrust(
    position: Vec2,
    heading: f32,
    target: Vec2,
    max_forward: f32,
    dt: f32,
    pid: &mut PidState,
) -> Thrust {
    if dt <= 0.0 {
        return Thrust::default();
    }

    let bearing = (target - position).normalize_or_zero().angle();
    let error = bearing - heading;

    pid.integral += error * dt;
    let derivative = (error - pid.prev_error) / dt;
    pid.prev_error = error;

    let angular = KP * error + KI * pid.integral + KD * derivative;
    let forward = if error.abs() < FORWARD_CONE {
        max_forward
    } else {
        0.0
    };

    Thrust { forward, angular }
}
