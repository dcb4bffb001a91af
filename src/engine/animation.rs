// Movement-driven animation sync.
//
// A walking model should not play its walk cycle while it is not actually
// translating. Each agent carries a small MOVING/STATIONARY machine fed
// with displacement-per-tick; its transitions gate playback of one
// externally loaded clip.

use bevy_ecs::prelude::*;
use glam::Vec3;

/// External animation clip handle. The core never interprets clip content;
/// it only gates playback and advances time.
pub trait AnimationClip: Send + Sync {
    fn play(&mut self);
    fn pause(&mut self);
    /// Advance playback time. Called once per tick while the agent moves.
    fn advance(&mut self, dt: f32);
}

/// Playback gate of an [`AnimationLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Moving,
    Stationary,
}

/// Transition fired by [`MotionSync::observe`] for one tick. Each edge is
/// emitted exactly once per episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    Pause,
    Resume,
}

/// Per-agent MOVING/STATIONARY tracker, driven by displacement over time.
#[derive(Component, Debug, Clone)]
pub struct MotionSync {
    state: MotionState,
    stationary_time: f32,
    previous_position: Option<Vec3>,
    /// Displacement-per-tick under which the agent counts as motionless.
    pub motion_epsilon: f32,
    /// Seconds of accumulated stillness before playback pauses.
    pub stationary_threshold: f32,
}

impl Default for MotionSync {
    fn default() -> Self {
        Self::new(0.01, 0.5)
    }
}

impl MotionSync {
    pub fn new(motion_epsilon: f32, stationary_threshold: f32) -> Self {
        Self {
            // Agents start out considered moving, matching a freshly
            // spawned model whose clip is already playing.
            state: MotionState::Moving,
            stationary_time: 0.0,
            previous_position: None,
            motion_epsilon,
            stationary_threshold,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_moving(&self) -> bool {
        self.state == MotionState::Moving
    }

    /// Observe the agent's position after integration. Returns the
    /// transition fired this tick, if any. The first observed tick has no
    /// displacement yet and counts as motion.
    pub fn observe(&mut self, position: Vec3, dt: f32) -> Option<MotionEvent> {
        let Some(previous) = self.previous_position.replace(position) else {
            return None;
        };
        let displacement = previous.distance(position);

        if displacement < self.motion_epsilon {
            self.stationary_time += dt;
            if self.stationary_time >= self.stationary_threshold
                && self.state == MotionState::Moving
            {
                self.state = MotionState::Stationary;
                return Some(MotionEvent::Pause);
            }
        } else {
            self.stationary_time = 0.0;
            if self.state == MotionState::Stationary {
                self.state = MotionState::Moving;
                return Some(MotionEvent::Resume);
            }
        }
        None
    }
}

/// Link from an agent to one externally loaded clip. Not part of the
/// physics state — a pure observer/actuator pair.
#[derive(Component)]
pub struct AnimationLink {
    clip: Box<dyn AnimationClip>,
    playback: Playback,
}

impl AnimationLink {
    /// Links start playing, mirroring the initial MOVING state.
    pub fn new(clip: Box<dyn AnimationClip>) -> Self {
        Self {
            clip,
            playback: Playback::Playing,
        }
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// Apply a state-machine transition to the clip. Double pause/resume
    /// cannot happen: the machine emits each edge once.
    pub fn apply(&mut self, event: MotionEvent) {
        match event {
            MotionEvent::Pause => {
                self.clip.pause();
                self.playback = Playback::Paused;
            }
            MotionEvent::Resume => {
                self.clip.play();
                self.playback = Playback::Playing;
            }
        }
    }

    /// Advance the clip; skipped while paused.
    pub fn advance(&mut self, dt: f32) {
        if self.playback == Playback::Playing {
            self.clip.advance(dt);
        }
    }
}
