// Entity manager: the authoritative roster of live agents and the shared
// per-tick scheduler.
//
// Owns the bevy_ecs World. Membership changes are queued and applied at
// the next update boundary, so an in-progress pass never observes them;
// within one pass agents run in registration order, which makes a tick
// sequence reproducible for a given input history.

use bevy_ecs::prelude::*;
use glam::Vec3;
use log::debug;

use super::agent::{self, AgentParams};
use super::animation::{AnimationLink, MotionSync};
use super::components::{RenderSync, Transform, UnitAgent, Velocity};
use super::steering::{PositionLookup, SteerContext, Steering};

pub struct EntityManager {
    world: World,
    /// Live agents in registration order — the per-tick processing order.
    roster: Vec<Entity>,
    pending_add: Vec<Entity>,
    pending_remove: Vec<Entity>,
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityManager {
    pub fn new() -> Self {
        Self::with_world(World::new())
    }

    /// Build around an existing world (embedders that already own one).
    pub fn with_world(world: World) -> Self {
        Self {
            world,
            roster: Vec::new(),
            pending_add: Vec::new(),
            pending_remove: Vec::new(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Agents currently on the roster (pending changes not yet applied).
    pub fn agent_count(&self) -> usize {
        self.roster.len()
    }

    /// Spawn a steerable agent. The entity exists — and can receive render
    /// and animation attachments — immediately; it joins the roster at the
    /// next update boundary.
    pub fn spawn_agent(&mut self, params: AgentParams) -> Entity {
        let entity = self
            .world
            .spawn((
                Transform {
                    position: params.position,
                    scale: params.scale,
                    ..Default::default()
                },
                Velocity::default(),
                params.tuning,
                Steering::default(),
                MotionSync::default(),
            ))
            .id();
        self.add(entity);
        entity
    }

    /// Spawn a free-standing target: position only, never on the roster,
    /// so it is readable by steering but never integrated.
    pub fn spawn_target(&mut self, position: Vec3) -> Entity {
        self.world.spawn(Transform::from_position(position)).id()
    }

    /// Queue roster membership. Double-adds are no-ops.
    pub fn add(&mut self, entity: Entity) {
        if self.roster.contains(&entity) || self.pending_add.contains(&entity) {
            return;
        }
        self.pending_add.push(entity);
    }

    /// Queue removal from the roster. Unknown entities are a no-op. The
    /// entity itself stays alive in the world; see [`Self::despawn`].
    pub fn remove(&mut self, entity: Entity) {
        if !self.pending_remove.contains(&entity) {
            self.pending_remove.push(entity);
        }
    }

    /// Remove from the roster and destroy the entity. Safe to call on
    /// targets and on entities that were never registered.
    pub fn despawn(&mut self, entity: Entity) {
        self.remove(entity);
        self.world.despawn(entity);
    }

    /// Advance the simulation by `dt` seconds. Non-positive or non-finite
    /// timesteps are no-op ticks (membership changes still apply).
    pub fn update(&mut self, dt: f32) {
        self.apply_pending();
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let lookup = self.position_lookup();
        // Snapshot the membership for this pass; any add/remove requested
        // from here on waits for the next tick.
        let roster = self.roster.clone();
        for entity in roster {
            self.step_agent(entity, dt, &lookup);
        }
    }

    fn apply_pending(&mut self) {
        if self.pending_remove.is_empty() && self.pending_add.is_empty() {
            return;
        }
        let removals = std::mem::take(&mut self.pending_remove);
        for entity in &removals {
            self.roster.retain(|live| live != entity);
        }
        // A removal also cancels a queued add for the same entity.
        self.pending_add.retain(|queued| !removals.contains(queued));
        for entity in self.pending_add.drain(..) {
            if !self.roster.contains(&entity) {
                self.roster.push(entity);
            }
        }
        debug!("roster now holds {} agent(s)", self.roster.len());
    }

    /// Snapshot of every positioned entity, read by entity-targeted
    /// steering behaviors during the pass.
    fn position_lookup(&mut self) -> PositionLookup {
        let mut lookup = PositionLookup::new();
        let mut query = self.world.query::<(Entity, &Transform)>();
        for (entity, transform) in query.iter(&self.world) {
            lookup.insert(entity, transform.position);
        }
        lookup
    }

    /// One agent's tick: steering → integration → render sync → animation
    /// sync. Entities that lost their kinematic components are skipped.
    fn step_agent(&mut self, entity: Entity, dt: f32, lookup: &PositionLookup) {
        let Some(transform) = self.world.get::<Transform>(entity) else {
            return;
        };
        let mut transform = *transform;
        let Some(velocity) = self.world.get::<Velocity>(entity) else {
            return;
        };
        let mut velocity = *velocity;
        let Some(tuning) = self.world.get::<UnitAgent>(entity).copied() else {
            return;
        };

        let ctx = SteerContext {
            position: transform.position,
            velocity: velocity.linear,
            max_speed: tuning.max_speed,
        };
        let force = match self.world.get_mut::<Steering>(entity) {
            Some(mut steering) => steering.compute(&ctx, lookup),
            None => Vec3::ZERO,
        };

        agent::integrate(&mut transform, &mut velocity, &tuning, force, dt);
        if let Some(mut stored) = self.world.get_mut::<Transform>(entity) {
            *stored = transform;
        }
        if let Some(mut stored) = self.world.get_mut::<Velocity>(entity) {
            *stored = velocity;
        }

        // Push the fresh world matrix to the external visual.
        let matrix = transform.world_matrix();
        if let Some(mut sync) = self.world.get_mut::<RenderSync>(entity) {
            sync.push(matrix);
        }

        // Movement-driven animation gate.
        let Some(mut motion) = self.world.get_mut::<MotionSync>(entity) else {
            return;
        };
        let event = motion.observe(transform.position, dt);
        let moving = motion.is_moving();
        if let Some(mut link) = self.world.get_mut::<AnimationLink>(entity) {
            if let Some(event) = event {
                link.apply(event);
            }
            if moving {
                link.advance(dt);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::steering::{SteeringBehavior, TargetRef};

    fn drifting_agent(manager: &mut EntityManager, x: f32) -> Entity {
        let entity = manager.spawn_agent(AgentParams::at(Vec3::new(x, 0.0, 0.0)));
        if let Some(mut steering) = manager.world_mut().get_mut::<Steering>(entity) {
            steering.add(SteeringBehavior::seek(TargetRef::Point(Vec3::new(
                100.0, 0.0, 0.0,
            ))));
        }
        entity
    }

    #[test]
    fn membership_applies_at_the_update_boundary() {
        let mut manager = EntityManager::new();
        let agent = drifting_agent(&mut manager, 0.0);
        assert_eq!(manager.agent_count(), 0);

        manager.update(0.1);
        assert_eq!(manager.agent_count(), 1);

        let before = manager.world().get::<Transform>(agent).unwrap().position;
        manager.remove(agent);
        // Still rostered until the next boundary, but the removal lands
        // before any further integration.
        manager.update(0.1);
        let after = manager.world().get::<Transform>(agent).unwrap().position;
        assert_eq!(before.x, after.x);
        assert_eq!(manager.agent_count(), 0);
    }

    #[test]
    fn double_add_and_unknown_remove_are_noops() {
        let mut manager = EntityManager::new();
        let agent = drifting_agent(&mut manager, 0.0);
        manager.add(agent);
        manager.add(agent);
        manager.update(0.1);
        assert_eq!(manager.agent_count(), 1);

        let stranger = manager.spawn_target(Vec3::ZERO);
        manager.remove(stranger);
        manager.update(0.1);
        assert_eq!(manager.agent_count(), 1);
    }

    #[test]
    fn add_then_remove_before_a_tick_cancels_out() {
        let mut manager = EntityManager::new();
        let agent = drifting_agent(&mut manager, 0.0);
        manager.remove(agent);
        manager.update(0.1);
        assert_eq!(manager.agent_count(), 0);
    }

    #[test]
    fn non_positive_dt_is_a_noop_tick() {
        let mut manager = EntityManager::new();
        let agent = drifting_agent(&mut manager, 0.0);
        manager.update(0.1);
        let before = manager.world().get::<Transform>(agent).unwrap().position;

        manager.update(0.0);
        manager.update(-1.0);
        manager.update(f32::NAN);
        let after = manager.world().get::<Transform>(agent).unwrap().position;
        assert_eq!(before, after);
    }

    #[test]
    fn agents_run_in_registration_order() {
        let mut manager = EntityManager::new();
        let first = drifting_agent(&mut manager, 0.0);
        let second = drifting_agent(&mut manager, 1.0);
        manager.update(0.1);

        // Both moved; identical tuning and offset targets keep the motion
        // deterministic across runs.
        let p1 = manager.world().get::<Transform>(first).unwrap().position;
        let p2 = manager.world().get::<Transform>(second).unwrap().position;
        assert!(p1.x > 0.0);
        assert!(p2.x > 1.0);
    }

    #[test]
    fn render_sync_sees_every_tick() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut manager = EntityManager::new();
        let agent = drifting_agent(&mut manager, 0.0);
        let pushes = Arc::new(AtomicUsize::new(0));
        let counter = pushes.clone();
        manager
            .world_mut()
            .entity_mut(agent)
            .insert(RenderSync::new(move |matrix| {
                assert!(matrix.is_finite());
                counter.fetch_add(1, Ordering::Relaxed);
            }));

        for _ in 0..5 {
            manager.update(0.1);
        }
        assert_eq!(pushes.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn moving_shared_target_redirects_referencing_agents() {
        let mut manager = EntityManager::new();
        let target = manager.spawn_target(Vec3::new(10.0, 0.0, 0.0));
        let agent = manager.spawn_agent(AgentParams::default());
        if let Some(mut steering) = manager.world_mut().get_mut::<Steering>(agent) {
            steering.add(SteeringBehavior::seek(TargetRef::Entity(target)));
        }

        for _ in 0..10 {
            manager.update(0.05);
        }
        let toward_x = manager.world().get::<Transform>(agent).unwrap().position;
        assert!(toward_x.x > 0.0 && toward_x.z.abs() < 1e-4);

        if let Some(mut transform) = manager.world_mut().get_mut::<Transform>(target) {
            transform.position = Vec3::new(toward_x.x, 0.0, 50.0);
        }
        for _ in 0..200 {
            manager.update(0.05);
        }
        let toward_z = manager.world().get::<Transform>(agent).unwrap().position;
        assert!(toward_z.z > 1.0, "agent should have turned toward +Z");
    }
}
