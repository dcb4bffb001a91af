// Agent (vehicle) integration: one Euler step per tick turning the
// combined steering force into velocity, position, and heading.

use glam::{Quat, Vec3};

use super::components::{Transform, UnitAgent, Velocity};

/// XZ speed² below which the heading is left untouched. A heading is never
/// derived from a near-zero velocity.
const HEADING_EPSILON_SQ: f32 = 1e-6;

/// Spawn-time description of one agent.
#[derive(Debug, Clone)]
pub struct AgentParams {
    pub position: Vec3,
    pub scale: Vec3,
    pub tuning: UnitAgent,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            tuning: UnitAgent::default(),
        }
    }
}

impl AgentParams {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// Advance one agent by `dt` seconds under `force`.
///
/// Order: clamp force to max force → integrate velocity (clamped to max
/// speed) → integrate position → rewrite heading from the direction of
/// travel. `max_speed == 0` degenerates to a stationary prop without NaNs.
pub fn integrate(
    transform: &mut Transform,
    velocity: &mut Velocity,
    tuning: &UnitAgent,
    force: Vec3,
    dt: f32,
) {
    let force = force.clamp_length_max(tuning.max_force.max(0.0));
    velocity.linear += force * dt;
    velocity.linear = velocity.linear.clamp_length_max(tuning.max_speed.max(0.0));
    transform.position += velocity.linear * dt;

    let planar_speed_sq =
        velocity.linear.x * velocity.linear.x + velocity.linear.z * velocity.linear.z;
    if planar_speed_sq > HEADING_EPSILON_SQ {
        transform.heading = heading_from_velocity(velocity.linear);
    }
}

/// Yaw-only heading: rotate model-forward (+Z) to face the XZ direction of
/// travel.
pub fn heading_from_velocity(velocity: Vec3) -> Quat {
    Quat::from_rotation_y(velocity.x.atan2(velocity.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn velocity_is_clamped_to_max_speed() {
        let mut transform = Transform::default();
        let mut velocity = Velocity::default();
        let tuning = UnitAgent {
            max_speed: 2.0,
            max_force: 1000.0,
            arrive_tolerance: 0.1,
        };
        integrate(
            &mut transform,
            &mut velocity,
            &tuning,
            Vec3::new(500.0, 0.0, 0.0),
            1.0,
        );
        assert_relative_eq!(velocity.linear.length(), 2.0);
    }

    #[test]
    fn force_is_clamped_before_integration() {
        let mut transform = Transform::default();
        let mut velocity = Velocity::default();
        let tuning = UnitAgent {
            max_speed: 100.0,
            max_force: 1.0,
            arrive_tolerance: 0.1,
        };
        integrate(
            &mut transform,
            &mut velocity,
            &tuning,
            Vec3::new(500.0, 0.0, 0.0),
            1.0,
        );
        assert_relative_eq!(velocity.linear.x, 1.0);
    }

    #[test]
    fn heading_follows_travel_direction() {
        let mut transform = Transform::default();
        let mut velocity = Velocity::default();
        let tuning = UnitAgent::default();
        integrate(
            &mut transform,
            &mut velocity,
            &tuning,
            Vec3::new(10.0, 0.0, 0.0),
            0.1,
        );
        let (axis, angle) = transform.heading.to_axis_angle();
        assert_relative_eq!(angle, FRAC_PI_2, epsilon = 1e-5);
        assert_relative_eq!(axis.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_velocity_keeps_prior_heading() {
        let prior = Quat::from_rotation_y(1.2);
        let mut transform = Transform {
            heading: prior,
            ..Default::default()
        };
        let mut velocity = Velocity::default();
        let tuning = UnitAgent::default();
        integrate(&mut transform, &mut velocity, &tuning, Vec3::ZERO, 0.1);
        assert_eq!(transform.heading, prior);
    }

    #[test]
    fn zero_max_speed_is_a_finite_noop() {
        let mut transform = Transform::from_position(Vec3::new(1.0, 0.0, 1.0));
        let mut velocity = Velocity::default();
        let tuning = UnitAgent {
            max_speed: 0.0,
            max_force: 10.0,
            arrive_tolerance: 0.1,
        };
        integrate(
            &mut transform,
            &mut velocity,
            &tuning,
            Vec3::new(3.0, 0.0, 0.0),
            0.1,
        );
        assert_eq!(velocity.linear, Vec3::ZERO);
        assert_eq!(transform.position, Vec3::new(1.0, 0.0, 1.0));
        assert!(transform.world_matrix().is_finite());
    }
}
