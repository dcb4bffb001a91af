// Group coordinator: N agents spawned from one asset template, sharing one
// dynamic target.
//
// One parameterized coordinator replaces the per-demo copy-pasted "model
// manager" classes: formation offsets, tuning profile, and asset id all
// live in a plain config struct. Click-to-move input arrives through a
// target feed drained between ticks, so a retarget is always atomic with
// respect to the simulation pass.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use bevy_ecs::prelude::Entity;
use glam::{Vec2, Vec3};
use log::{debug, warn};

use super::agent::AgentParams;
use super::animation::AnimationLink;
use super::assets::{AssetProvider, ModelHandle};
use super::components::{FormationOffset, GroupMembership, RenderSync, Transform, UnitAgent};
use super::manager::EntityManager;
use super::steering::{Steering, SteeringBehavior, TargetRef};

static NEXT_GROUP_ID: AtomicU32 = AtomicU32::new(0);

// ============================================================================
// CONFIG
// ============================================================================

/// Tuning profile shared by every member of a group.
///
/// Defaults are a sane walking profile — the demo sources disagree wildly
/// on these numbers (one sets a max speed of 300), so the profile is
/// configuration, not gospel.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Asset identifier handed to the provider once per member.
    pub model: String,
    /// One member is spawned per offset, at `anchor + offset` on XZ.
    pub formation_offsets: Vec<Vec2>,
    pub anchor: Vec3,
    pub scale: Vec3,
    pub max_speed: f32,
    pub max_force: f32,
    pub arrive_tolerance: f32,
    /// Deceleration-zone factor for the Arrive behaviors built on
    /// retarget.
    pub deceleration: f32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            model: "walker".into(),
            formation_offsets: vec![Vec2::ZERO],
            anchor: Vec3::ZERO,
            scale: Vec3::ONE,
            max_speed: 2.0,
            max_force: 20.0,
            arrive_tolerance: 0.5,
            deceleration: 2.0,
        }
    }
}

/// The per-agent tuning a group profile expands to.
fn tuning_profile(config: &GroupConfig) -> UnitAgent {
    UnitAgent {
        max_speed: config.max_speed,
        max_force: config.max_force,
        arrive_tolerance: config.arrive_tolerance,
    }
}

// ============================================================================
// TARGET FEED
// ============================================================================

/// Producer half of the ground-plane target feed (the click/pick handler
/// side). Points are (x, z) on the ground plane.
pub struct TargetFeed {
    tx: Sender<Vec2>,
}

impl TargetFeed {
    pub fn send(&self, ground_point: Vec2) {
        // A torn-down group is not an error for the input side.
        let _ = self.tx.send(ground_point);
    }
}

/// Consumer half, drained by the group between ticks.
pub struct TargetEvents {
    rx: Receiver<Vec2>,
}

/// Build the external-input channel for click-to-move retargeting.
pub fn target_feed() -> (TargetFeed, TargetEvents) {
    let (tx, rx) = mpsc::channel();
    (TargetFeed { tx }, TargetEvents { rx })
}

// ============================================================================
// GROUP
// ============================================================================

pub struct Group {
    id: u32,
    config: GroupConfig,
    members: Vec<Entity>,
    target: Entity,
    pending_loads: Vec<(Entity, ModelHandle)>,
    feed: Option<TargetEvents>,
}

impl Group {
    /// Spawn one agent per formation offset plus the shared target entity,
    /// and kick off one model load per member. Members are simulatable
    /// immediately; drawables attach whenever their loads resolve.
    pub fn spawn(
        manager: &mut EntityManager,
        assets: &mut dyn AssetProvider,
        config: GroupConfig,
    ) -> Self {
        let id = NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed);
        let target = manager.spawn_target(config.anchor);

        let mut members = Vec::with_capacity(config.formation_offsets.len());
        let mut pending_loads = Vec::with_capacity(config.formation_offsets.len());
        for &offset in &config.formation_offsets {
            let position = config.anchor + Vec3::new(offset.x, 0.0, offset.y);
            let member = manager.spawn_agent(AgentParams {
                position,
                scale: config.scale,
                tuning: tuning_profile(&config),
            });
            manager
                .world_mut()
                .entity_mut(member)
                .insert((GroupMembership { group_id: id }, FormationOffset { offset }));
            pending_loads.push((member, assets.load_model(&config.model)));
            members.push(member);
        }
        debug!("group {id}: spawned {} member(s)", members.len());

        let group = Self {
            id,
            config,
            members,
            target,
            pending_loads,
            feed: None,
        };
        group.rebuild_steering(manager);
        group
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn members(&self) -> &[Entity] {
        &self.members
    }

    /// The shared target entity every member's Arrive behavior references.
    pub fn target(&self) -> Entity {
        self.target
    }

    /// Wire the external click-to-move channel into this group.
    pub fn attach_feed(&mut self, events: TargetEvents) {
        self.feed = Some(events);
    }

    /// Move the shared target and rebuild every member's behavior set
    /// around a fresh Arrive bound to it. Tuning resets to the group
    /// profile. Runs between ticks, so no agent ever sees a half-rebuilt
    /// set.
    pub fn retarget(&self, manager: &mut EntityManager, point: Vec3) {
        if let Some(mut transform) = manager.world_mut().get_mut::<Transform>(self.target) {
            transform.position = point;
        }
        self.rebuild_steering(manager);
        debug!("group {}: retarget to {point}", self.id);
    }

    /// Per-frame group work: apply the latest target event, finish model
    /// loads, then fan out to the shared manager tick.
    pub fn update(&mut self, manager: &mut EntityManager, dt: f32) {
        if let Some(point) = self.latest_target_event() {
            self.retarget(manager, Vec3::new(point.x, 0.0, point.y));
        }
        self.poll_model_loads(manager);
        manager.update(dt);
    }

    /// Tear the group down: members and the target leave the simulation
    /// and are destroyed.
    pub fn despawn(self, manager: &mut EntityManager) {
        for &member in &self.members {
            manager.despawn(member);
        }
        manager.despawn(self.target);
        debug!("group {}: despawned", self.id);
    }

    fn rebuild_steering(&self, manager: &mut EntityManager) {
        let world = manager.world_mut();
        for &member in &self.members {
            if let Some(mut tuning) = world.get_mut::<UnitAgent>(member) {
                *tuning = tuning_profile(&self.config);
            }
            // The Arrive radius follows the member's just-reset tuning.
            let tolerance = world
                .get::<UnitAgent>(member)
                .map_or(self.config.arrive_tolerance, |t| t.arrive_tolerance);
            if let Some(mut steering) = world.get_mut::<Steering>(member) {
                steering.clear();
                steering.add(SteeringBehavior::arrive(
                    TargetRef::Entity(self.target),
                    tolerance,
                    self.config.deceleration,
                ));
            }
        }
    }

    /// Only the newest queued click matters.
    fn latest_target_event(&mut self) -> Option<Vec2> {
        let feed = self.feed.as_ref()?;
        let mut latest = None;
        while let Ok(point) = feed.rx.try_recv() {
            latest = Some(point);
        }
        latest
    }

    fn poll_model_loads(&mut self, manager: &mut EntityManager) {
        let id = self.id;
        self.pending_loads.retain_mut(|(member, handle)| {
            let Some(result) = handle.poll() else {
                return true;
            };
            match result {
                Ok(model) => {
                    // The member may have been despawned while loading.
                    if manager.world().get::<Transform>(*member).is_none() {
                        return false;
                    }
                    let mut entity = manager.world_mut().entity_mut(*member);
                    entity.insert(RenderSync::from_boxed(model.sync));
                    if let Some(clip) = model.clips.into_iter().next() {
                        entity.insert(AnimationLink::new(clip));
                    }
                    debug!("group {id}: model attached");
                }
                Err(error) => {
                    warn!("group {id}: member stays invisible: {error}");
                }
            }
            false
        });
    }
}
