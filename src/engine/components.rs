// Core ECS components for the locomotion simulation.
// Components stay plain data; the algorithms that drive them live in
// `steering`, `agent`, and `animation`.

use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3};

/// Position, heading, and scale of an entity in 3D space.
#[derive(Component, Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
    /// Orientation of the entity. Rewritten from the velocity direction
    /// while the entity is actually translating; otherwise left untouched.
    pub heading: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            heading: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// World transform pushed to the render-sync hook once per tick.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.heading, self.position)
    }
}

/// Velocity of an entity in 3D space (units per second)
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Velocity {
    pub linear: Vec3,
}

/// Kinematic tuning for one steered agent.
///
/// `max_speed` — speed cap in world units/sec. 0 degenerates the agent to
///               a stationary prop (it still ticks, nothing NaNs).
/// `max_force` — cap applied once to the combined steering force per tick.
#[derive(Component, Debug, Clone, Copy)]
pub struct UnitAgent {
    pub max_speed: f32,
    pub max_force: f32,
    /// Distance at which an Arrive behavior considers this agent arrived.
    pub arrive_tolerance: f32,
}

impl Default for UnitAgent {
    fn default() -> Self {
        Self {
            max_speed: 2.0,
            max_force: 20.0,
            arrive_tolerance: 0.1,
        }
    }
}

/// Assigns an entity to a movement group.
#[derive(Component, Debug, Clone, Copy)]
pub struct GroupMembership {
    pub group_id: u32,
}

/// Fixed XZ offset from the group anchor assigned at spawn time.
///
/// The group spawns one member per offset and keeps the offset around so
/// the original formation shape can be reconstructed later.
#[derive(Component, Debug, Clone, Copy)]
pub struct FormationOffset {
    pub offset: glam::Vec2,
}

/// Callback that pushes a world matrix to the external renderer.
pub type RenderSyncFn = Box<dyn FnMut(Mat4) + Send + Sync>;

/// Per-tick world-matrix push to an external visual representation.
///
/// Side-effect-only: the renderer never feeds anything back into the
/// simulation through this hook.
#[derive(Component)]
pub struct RenderSync {
    sync: RenderSyncFn,
}

impl RenderSync {
    pub fn new(sync: impl FnMut(Mat4) + Send + Sync + 'static) -> Self {
        Self {
            sync: Box::new(sync),
        }
    }

    pub fn from_boxed(sync: RenderSyncFn) -> Self {
        Self { sync }
    }

    pub fn push(&mut self, matrix: Mat4) {
        (self.sync)(matrix);
    }
}
