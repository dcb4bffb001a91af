// Waypoint paths for patrol routes.
//
// A path is built once at setup and is read-only during simulation; agents
// share it behind an `Arc`. The behaviors that follow it keep their own
// progress (current waypoint index) — the path itself is stateless.

use glam::Vec3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// A path needs at least one waypoint before an agent may follow it.
    #[error("path has no waypoints")]
    Empty,
}

/// Closest-point query result: the point on segment `segment` at parameter
/// `t` in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathProjection {
    pub segment: usize,
    pub t: f32,
    pub point: Vec3,
}

/// An ordered, optionally looping sequence of waypoints.
#[derive(Debug, Clone)]
pub struct Path {
    waypoints: Vec<Vec3>,
    looped: bool,
}

impl Path {
    pub fn new(waypoints: Vec<Vec3>, looped: bool) -> Result<Self, PathError> {
        if waypoints.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self { waypoints, looped })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        // Construction guarantees at least one waypoint.
        false
    }

    pub fn looped(&self) -> bool {
        self.looped
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    pub fn first(&self) -> Vec3 {
        self.waypoints[0]
    }

    /// Waypoint lookup; wraps modulo the waypoint count on looped paths,
    /// clamps to the last waypoint otherwise.
    pub fn waypoint_at(&self, index: usize) -> Vec3 {
        let n = self.waypoints.len();
        if self.looped {
            self.waypoints[index % n]
        } else {
            self.waypoints[index.min(n - 1)]
        }
    }

    /// Index of the waypoint after `index`, or `None` once a non-looping
    /// path is complete.
    pub fn next_index(&self, index: usize) -> Option<usize> {
        let n = self.waypoints.len();
        if self.looped {
            Some((index + 1) % n)
        } else if index + 1 < n {
            Some(index + 1)
        } else {
            None
        }
    }

    /// Project `point` onto the path: the closest point over all segments,
    /// ties broken by the lowest segment index. A single-waypoint path
    /// projects onto that waypoint.
    pub fn project(&self, point: Vec3) -> PathProjection {
        let n = self.waypoints.len();
        if n == 1 {
            return PathProjection {
                segment: 0,
                t: 0.0,
                point: self.waypoints[0],
            };
        }

        // Looped paths have a closing segment from the last waypoint back
        // to the first.
        let segment_count = if self.looped { n } else { n - 1 };

        let mut best = PathProjection {
            segment: 0,
            t: 0.0,
            point: self.waypoints[0],
        };
        let mut best_dist_sq = f32::INFINITY;

        for segment in 0..segment_count {
            let a = self.waypoints[segment];
            let b = self.waypoints[(segment + 1) % n];
            let (t, closest) = closest_on_segment(a, b, point);
            let dist_sq = closest.distance_squared(point);
            // Strict `<` keeps the lowest segment index on ties.
            if dist_sq < best_dist_sq {
                best_dist_sq = dist_sq;
                best = PathProjection {
                    segment,
                    t,
                    point: closest,
                };
            }
        }
        best
    }
}

/// Closest point to `p` on segment `ab`, returned as (t, point).
fn closest_on_segment(a: Vec3, b: Vec3, p: Vec3) -> (f32, Vec3) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= 1e-12 {
        // Degenerate segment (coincident waypoints).
        return (0.0, a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (t, a + ab * t)
}
