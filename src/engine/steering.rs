// Steering behaviors: pluggable force contributors combined by weighted
// summation into one output per tick.
//
// Behaviors are pure over a per-tick kinematic snapshot (`SteerContext`)
// plus a read-only position lookup for entity targets. The only mutable
// state is the progress a behavior tracks itself: FollowPath's current
// waypoint index and the Arrive/FollowPath latches.

use std::collections::HashMap;
use std::sync::Arc;

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::path::Path;

/// Distance² under which a direction is treated as zero-length and never
/// normalized.
const ZERO_DISTANCE_SQ: f32 = 1e-10;

/// Gain on the `-velocity` braking force once a behavior wants the agent
/// standing still (arrived / path complete). Damped stop, not a hard one.
const BRAKE_GAIN: f32 = 8.0;

// ============================================================================
// TARGETS
// ============================================================================

/// Positions of every live entity, snapshotted once per tick before the
/// roster pass so behaviors can read shared targets.
pub type PositionLookup = HashMap<Entity, Vec3>;

/// A steering target: a fixed point, or a live entity whose position is
/// read fresh every tick. Moving one shared target entity retargets every
/// agent that references it.
#[derive(Debug, Clone, Copy)]
pub enum TargetRef {
    Point(Vec3),
    Entity(Entity),
}

impl TargetRef {
    /// `None` when the referenced entity no longer exists; the behavior
    /// then contributes zero force.
    fn resolve(&self, lookup: &PositionLookup) -> Option<Vec3> {
        match *self {
            TargetRef::Point(point) => Some(point),
            TargetRef::Entity(entity) => lookup.get(&entity).copied(),
        }
    }
}

/// Kinematic snapshot of the steered agent for one tick.
#[derive(Debug, Clone, Copy)]
pub struct SteerContext {
    pub position: Vec3,
    pub velocity: Vec3,
    pub max_speed: f32,
}

// ============================================================================
// BEHAVIORS
// ============================================================================

/// One steering behavior with the parameters it needs.
#[derive(Debug, Clone)]
pub enum SteeringBehavior {
    /// Full-speed pursuit of a target.
    Seek { target: TargetRef },
    /// Damped approach: slows inside the deceleration zone, stands still
    /// within `tolerance` of the target.
    Arrive {
        target: TargetRef,
        tolerance: f32,
        deceleration: f32,
        arrived: bool,
    },
    /// Waypoint-to-waypoint traversal of a shared path. Advances when the
    /// agent comes within `radius` of the current waypoint; on a
    /// non-looping path the last waypoint latches `complete`.
    FollowPath {
        path: Arc<Path>,
        radius: f32,
        waypoint: usize,
        complete: bool,
    },
    /// Corrective pull back onto the path once lateral deviation exceeds
    /// `tolerance`. Contributes exactly zero while on-path.
    StayOnPath { path: Arc<Path>, tolerance: f32 },
}

impl SteeringBehavior {
    pub fn seek(target: TargetRef) -> Self {
        SteeringBehavior::Seek { target }
    }

    pub fn arrive(target: TargetRef, tolerance: f32, deceleration: f32) -> Self {
        SteeringBehavior::Arrive {
            target,
            tolerance,
            deceleration,
            arrived: false,
        }
    }

    pub fn follow_path(path: Arc<Path>, radius: f32) -> Self {
        SteeringBehavior::FollowPath {
            path,
            radius,
            waypoint: 0,
            complete: false,
        }
    }

    pub fn stay_on_path(path: Arc<Path>, tolerance: f32) -> Self {
        SteeringBehavior::StayOnPath { path, tolerance }
    }

    /// Force contribution for this tick.
    fn compute(&mut self, ctx: &SteerContext, lookup: &PositionLookup) -> Vec3 {
        match self {
            SteeringBehavior::Seek { target } => match target.resolve(lookup) {
                Some(point) => seek_force(ctx, point),
                None => Vec3::ZERO,
            },
            SteeringBehavior::Arrive {
                target,
                tolerance,
                deceleration,
                arrived,
            } => match target.resolve(lookup) {
                Some(point) => arrive_force(ctx, point, *tolerance, *deceleration, arrived),
                None => Vec3::ZERO,
            },
            SteeringBehavior::FollowPath {
                path,
                radius,
                waypoint,
                complete,
            } => follow_path_force(ctx, path, *radius, waypoint, complete),
            SteeringBehavior::StayOnPath { path, tolerance } => {
                stay_on_path_force(ctx, path, *tolerance)
            }
        }
    }
}

/// Desired velocity straight at `target` at max speed, minus the current
/// velocity. Zero when already on top of the target.
fn seek_force(ctx: &SteerContext, target: Vec3) -> Vec3 {
    let to_target = target - ctx.position;
    if to_target.length_squared() <= ZERO_DISTANCE_SQ {
        return Vec3::ZERO;
    }
    to_target.normalize() * ctx.max_speed - ctx.velocity
}

/// Damped braking toward zero velocity.
fn brake_force(ctx: &SteerContext) -> Vec3 {
    -ctx.velocity * BRAKE_GAIN
}

fn arrive_force(
    ctx: &SteerContext,
    target: Vec3,
    tolerance: f32,
    deceleration: f32,
    arrived: &mut bool,
) -> Vec3 {
    let to_target = target - ctx.position;
    let distance = to_target.length();

    if distance <= tolerance {
        *arrived = true;
        return brake_force(ctx);
    }
    // A shared target may have moved back out of range.
    *arrived = false;

    let zone = deceleration * tolerance;
    let speed = if zone > 0.0 && distance < zone {
        ctx.max_speed * distance / zone
    } else {
        ctx.max_speed
    };
    // distance > tolerance >= 0 here, so the division is safe.
    to_target / distance * speed - ctx.velocity
}

fn follow_path_force(
    ctx: &SteerContext,
    path: &Arc<Path>,
    radius: f32,
    waypoint: &mut usize,
    complete: &mut bool,
) -> Vec3 {
    let mut current = path.waypoint_at(*waypoint);
    if ctx.position.distance_squared(current) < radius * radius {
        match path.next_index(*waypoint) {
            Some(next) => {
                *waypoint = next;
                current = path.waypoint_at(next);
            }
            None => *complete = true,
        }
    }

    if *complete {
        // Halt at the final waypoint; re-approach it if pushed away.
        if ctx.position.distance_squared(current) < radius * radius {
            return brake_force(ctx);
        }
    }
    seek_force(ctx, current)
}

fn stay_on_path_force(ctx: &SteerContext, path: &Arc<Path>, tolerance: f32) -> Vec3 {
    let projection = path.project(ctx.position);
    let offset = projection.point - ctx.position;
    if offset.length_squared() <= tolerance * tolerance {
        return Vec3::ZERO;
    }
    offset.normalize() * ctx.max_speed - ctx.velocity
}

// ============================================================================
// BEHAVIOR SET
// ============================================================================

/// (behavior, weight) pair; the weight scales the force contribution.
#[derive(Debug, Clone)]
pub struct WeightedBehavior {
    pub behavior: SteeringBehavior,
    pub weight: f32,
}

/// Ordered behavior set owned by exactly one agent. May be cleared and
/// rebuilt between ticks (retargeting); never mutated mid-pass.
#[derive(Component, Debug, Clone, Default)]
pub struct Steering {
    behaviors: Vec<WeightedBehavior>,
}

impl Steering {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append with the default weight of 1.0.
    pub fn add(&mut self, behavior: SteeringBehavior) {
        self.add_weighted(behavior, 1.0);
    }

    pub fn add_weighted(&mut self, behavior: SteeringBehavior, weight: f32) {
        self.behaviors.push(WeightedBehavior { behavior, weight });
    }

    pub fn clear(&mut self) {
        self.behaviors.clear();
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    /// An empty set is legal: the agent coasts at zero force.
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    pub fn behaviors(&self) -> &[WeightedBehavior] {
        &self.behaviors
    }

    /// Weighted sum over all behaviors in insertion order. Every active
    /// behavior always contributes — no priority or early exit. The caller
    /// clamps the result to the agent's max force.
    pub fn compute(&mut self, ctx: &SteerContext, lookup: &PositionLookup) -> Vec3 {
        let mut total = Vec3::ZERO;
        for weighted in &mut self.behaviors {
            total += weighted.behavior.compute(ctx, lookup) * weighted.weight;
        }
        total
    }

    /// True once any Arrive behavior in the set has latched its arrival.
    pub fn arrived(&self) -> bool {
        self.behaviors.iter().any(|w| {
            matches!(
                w.behavior,
                SteeringBehavior::Arrive { arrived: true, .. }
            )
        })
    }

    /// True once any FollowPath behavior has reached the end of a
    /// non-looping path.
    pub fn path_complete(&self) -> bool {
        self.behaviors.iter().any(|w| {
            matches!(
                w.behavior,
                SteeringBehavior::FollowPath { complete: true, .. }
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ctx(position: Vec3, velocity: Vec3, max_speed: f32) -> SteerContext {
        SteerContext {
            position,
            velocity,
            max_speed,
        }
    }

    fn no_entities() -> PositionLookup {
        PositionLookup::new()
    }

    #[test]
    fn seek_points_at_target_at_max_speed() {
        let mut behavior = SteeringBehavior::seek(TargetRef::Point(Vec3::new(10.0, 0.0, 0.0)));
        let force = behavior.compute(&ctx(Vec3::ZERO, Vec3::ZERO, 4.0), &no_entities());
        assert_relative_eq!(force.x, 4.0);
        assert_relative_eq!(force.y, 0.0);
        assert_relative_eq!(force.z, 0.0);
    }

    #[test]
    fn seek_at_target_contributes_nothing() {
        let target = Vec3::new(1.0, 2.0, 3.0);
        let mut behavior = SteeringBehavior::seek(TargetRef::Point(target));
        let force = behavior.compute(&ctx(target, Vec3::X, 4.0), &no_entities());
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn arrive_slows_inside_deceleration_zone() {
        // Zone = 2.0 * 2.0 = 4.0; at distance 3.0 the desired speed scales
        // to 6.0 * 3/4 = 4.5.
        let mut behavior =
            SteeringBehavior::arrive(TargetRef::Point(Vec3::new(3.0, 0.0, 0.0)), 2.0, 2.0);
        let force = behavior.compute(&ctx(Vec3::ZERO, Vec3::ZERO, 6.0), &no_entities());
        assert_relative_eq!(force.x, 4.5);
    }

    #[test]
    fn arrive_latches_inside_tolerance_and_brakes() {
        let mut behavior = SteeringBehavior::arrive(TargetRef::Point(Vec3::ZERO), 1.0, 2.0);
        let moving = ctx(Vec3::new(0.5, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), 6.0);
        let force = behavior.compute(&moving, &no_entities());
        assert!(force.x < 0.0, "braking force should oppose the velocity");
        assert!(matches!(
            behavior,
            SteeringBehavior::Arrive { arrived: true, .. }
        ));
    }

    #[test]
    fn arrive_unlatches_when_target_moves_away() {
        let mut behavior = SteeringBehavior::arrive(TargetRef::Point(Vec3::ZERO), 1.0, 2.0);
        behavior.compute(&ctx(Vec3::ZERO, Vec3::ZERO, 6.0), &no_entities());
        assert!(matches!(
            behavior,
            SteeringBehavior::Arrive { arrived: true, .. }
        ));

        if let SteeringBehavior::Arrive { target, .. } = &mut behavior {
            *target = TargetRef::Point(Vec3::new(50.0, 0.0, 0.0));
        }
        behavior.compute(&ctx(Vec3::ZERO, Vec3::ZERO, 6.0), &no_entities());
        assert!(matches!(
            behavior,
            SteeringBehavior::Arrive { arrived: false, .. }
        ));
    }

    #[test]
    fn missing_target_entity_contributes_zero() {
        let mut world = World::new();
        let ghost = world.spawn_empty().id();
        let mut behavior = SteeringBehavior::seek(TargetRef::Entity(ghost));
        // The lookup has no entry for the entity: zero force, no panic.
        let force = behavior.compute(&ctx(Vec3::ZERO, Vec3::ZERO, 4.0), &no_entities());
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn follow_path_advances_within_radius() {
        let path = Arc::new(
            Path::new(vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)], false).unwrap(),
        );
        let mut behavior = SteeringBehavior::follow_path(path, 0.5);

        // Standing just inside the radius of waypoint 0 advances to 1.
        behavior.compute(&ctx(Vec3::new(0.2, 0.0, 0.0), Vec3::ZERO, 4.0), &no_entities());
        assert!(matches!(
            behavior,
            SteeringBehavior::FollowPath {
                waypoint: 1,
                complete: false,
                ..
            }
        ));
    }

    #[test]
    fn follow_path_completes_once_at_the_end() {
        let path = Arc::new(
            Path::new(vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)], false).unwrap(),
        );
        let mut behavior = SteeringBehavior::follow_path(path, 0.5);
        let near_end = ctx(Vec3::new(0.9, 0.0, 0.0), Vec3::ZERO, 4.0);

        behavior.compute(&near_end, &no_entities()); // advance to waypoint 1
        behavior.compute(&near_end, &no_entities()); // reach it -> complete
        assert!(matches!(
            behavior,
            SteeringBehavior::FollowPath { complete: true, .. }
        ));
        // Further ticks stay complete and only brake.
        let force = behavior.compute(&near_end, &no_entities());
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn stay_on_path_is_silent_on_path() {
        let path = Arc::new(
            Path::new(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)], false).unwrap(),
        );
        let mut behavior = SteeringBehavior::stay_on_path(path, 0.5);
        let force = behavior.compute(
            &ctx(Vec3::new(5.0, 0.0, 0.1), Vec3::X, 4.0),
            &no_entities(),
        );
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn stay_on_path_pulls_back_when_off_path() {
        let path = Arc::new(
            Path::new(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)], false).unwrap(),
        );
        let mut behavior = SteeringBehavior::stay_on_path(path, 0.5);
        let force = behavior.compute(
            &ctx(Vec3::new(5.0, 0.0, 3.0), Vec3::ZERO, 4.0),
            &no_entities(),
        );
        // Desired velocity points in -Z, back toward the path.
        assert_relative_eq!(force.z, -4.0);
        assert_relative_eq!(force.x, 0.0);
    }

    #[test]
    fn weights_scale_contributions_in_order() {
        let mut set = Steering::new();
        set.add(SteeringBehavior::seek(TargetRef::Point(Vec3::new(
            10.0, 0.0, 0.0,
        ))));
        set.add_weighted(
            SteeringBehavior::seek(TargetRef::Point(Vec3::new(0.0, 0.0, 10.0))),
            0.5,
        );
        let force = set.compute(&ctx(Vec3::ZERO, Vec3::ZERO, 4.0), &no_entities());
        assert_relative_eq!(force.x, 4.0);
        assert_relative_eq!(force.z, 2.0);
    }

    #[test]
    fn empty_set_coasts() {
        let mut set = Steering::new();
        let force = set.compute(&ctx(Vec3::ZERO, Vec3::X, 4.0), &no_entities());
        assert_eq!(force, Vec3::ZERO);
        assert!(set.is_empty());
    }
}
