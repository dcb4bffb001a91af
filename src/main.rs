// Headless demo of the locomotion core: the flagship scenes of the demo
// family, logging instead of rendering.
//
//   patrol        — one agent loops an 8-waypoint course with
//                   FollowPath + StayOnPath
//   click-to-move — a 4-walker group chases scripted ground-plane targets,
//                   pausing its walk cycles while idle
//   missing model — a failed load leaves an invisible but fully
//                   simulatable agent
//
// Run with RUST_LOG=debug for the per-tick bookkeeping.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use log::info;
use rand::Rng;

use amble::engine::animation::AnimationClip;
use amble::engine::assets::{AssetError, AssetProvider, LoadedModel, ModelHandle};
use amble::engine::{
    target_feed, AgentParams, EntityManager, Group, GroupConfig, Path, Steering, SteeringBehavior,
    UnitAgent,
};

/// 60 Hz fixed timestep, the cadence the original demos render at.
const TICK: f32 = 1.0 / 60.0;

// ============================================================================
// DEMO ASSET PROVIDER
// ============================================================================

/// Stand-in for a skinned walk cycle: tracks playback time and logs the
/// pause/resume edges a renderer's animation mixer would see.
struct WalkCycle {
    name: String,
    time: f32,
}

impl AnimationClip for WalkCycle {
    fn play(&mut self) {
        info!("{}: walk cycle resumed", self.name);
    }

    fn pause(&mut self) {
        info!("{}: walk cycle paused at t={:.2}s", self.name, self.time);
    }

    fn advance(&mut self, dt: f32) {
        self.time += dt;
    }
}

/// Procedural provider: the "walker" model resolves immediately with one
/// clip; everything else fails like a mistyped asset path.
struct WalkerProvider {
    spawned: u32,
}

impl AssetProvider for WalkerProvider {
    fn load_model(&mut self, id: &str) -> ModelHandle {
        if id != "walker" {
            return ModelHandle::failed(id, AssetError::UnknownModel(id.into()));
        }
        self.spawned += 1;
        let name = format!("walker-{}", self.spawned);
        ModelHandle::ready(
            id,
            LoadedModel {
                // A renderer would copy the matrix into its scene node here.
                sync: Box::new(|_matrix| {}),
                clips: vec![Box::new(WalkCycle { name, time: 0.0 })],
            },
        )
    }
}

// ============================================================================
// SCENES
// ============================================================================

fn patrol_scene() {
    info!("--- patrol ---");
    let mut manager = EntityManager::new();

    let course = Arc::new(
        Path::new(
            vec![
                Vec3::new(-4.0, 0.0, 4.0),
                Vec3::new(-6.0, 0.0, 0.0),
                Vec3::new(-4.0, 0.0, -4.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, -4.0),
                Vec3::new(6.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 4.0),
                Vec3::new(0.0, 0.0, 6.0),
            ],
            true,
        )
        .expect("waypoint list is hardcoded"),
    );

    let agent = manager.spawn_agent(AgentParams {
        position: course.first(),
        tuning: UnitAgent {
            max_speed: 6.0,
            ..Default::default()
        },
        ..Default::default()
    });
    if let Some(mut steering) = manager.world_mut().get_mut::<Steering>(agent) {
        steering.add(SteeringBehavior::follow_path(course.clone(), 0.5));
        steering.add(SteeringBehavior::stay_on_path(course, 0.3));
    }

    let mut last_waypoint = 0;
    for tick in 0..(15 * 60) {
        manager.update(TICK);
        let waypoint = current_waypoint(&manager, agent);
        if waypoint != last_waypoint {
            info!("tick {tick:4}: heading for waypoint {waypoint}");
            last_waypoint = waypoint;
        }
    }
}

fn click_to_move_scene() {
    info!("--- click to move ---");
    let mut manager = EntityManager::new();
    let mut provider = WalkerProvider { spawned: 0 };
    let mut rng = rand::thread_rng();

    // The classic four-walker spread, with a little spawn jitter.
    let offsets = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(-1.0, 1.0),
        Vec2::new(2.0, -2.0),
    ]
    .map(|o| o + Vec2::new(rng.gen_range(-0.2..0.2), rng.gen_range(-0.2..0.2)));

    let mut group = Group::spawn(
        &mut manager,
        &mut provider,
        GroupConfig {
            formation_offsets: offsets.to_vec(),
            max_speed: 1.5,
            ..Default::default()
        },
    );
    let (feed, events) = target_feed();
    group.attach_feed(events);

    // Scripted clicks stand in for the pointer/raycast source.
    let clicks = [
        (60, Vec2::new(3.0, 2.0)),
        (300, Vec2::new(-2.0, 4.0)),
        (540, Vec2::new(0.0, 0.0)),
    ];

    for tick in 0..(15 * 60) {
        for &(at, point) in &clicks {
            if tick == at {
                info!("click on ground at ({:.1}, {:.1})", point.x, point.y);
                feed.send(point);
            }
        }
        group.update(&mut manager, TICK);
    }

    for (index, &member) in group.members().iter().enumerate() {
        let arrived = manager
            .world()
            .get::<Steering>(member)
            .is_some_and(|s| s.arrived());
        info!("walker {index}: arrived = {arrived}");
    }
    group.despawn(&mut manager);
}

fn missing_model_scene() {
    info!("--- missing model ---");
    let mut manager = EntityManager::new();
    let mut provider = WalkerProvider { spawned: 0 };

    let mut group = Group::spawn(
        &mut manager,
        &mut provider,
        GroupConfig {
            model: "ghost".into(),
            formation_offsets: vec![Vec2::ZERO],
            ..Default::default()
        },
    );
    group.retarget(&mut manager, Vec3::new(2.0, 0.0, 0.0));
    for _ in 0..(4 * 60) {
        group.update(&mut manager, TICK);
    }

    let member = group.members()[0];
    if let Some(transform) = manager.world().get::<amble::engine::Transform>(member) {
        info!(
            "invisible walker still walked to x = {:.2}",
            transform.position.x
        );
    }
    group.despawn(&mut manager);
}

/// Current FollowPath waypoint index of `agent`, 0 if it has none.
fn current_waypoint(manager: &EntityManager, agent: bevy_ecs::entity::Entity) -> usize {
    manager
        .world()
        .get::<Steering>(agent)
        .and_then(|steering| {
            steering.behaviors().iter().find_map(|w| match w.behavior {
                SteeringBehavior::FollowPath { waypoint, .. } => Some(waypoint),
                _ => None,
            })
        })
        .unwrap_or(0)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    patrol_scene();
    click_to_move_scene();
    missing_model_scene();
}
