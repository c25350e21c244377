//! Animated slot-to-slot transitions.
//!
//! Every entity owns exactly one [`QueueMove`]. A new order overwrites the
//! previous one in place; the new start point is the entity's current
//! (possibly mid-flight) position, never the old target.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Named pose the presentation layer should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Pose {
    /// Standing still
    #[default]
    Idle,
    /// Walking
    Walk,
}

impl Pose {
    /// Returns the pose name used by animation assets.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Pose::Idle => "idle",
            Pose::Walk => "walk",
        }
    }
}

/// Linear interpolation from `start` to `target` over `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueMove {
    /// Where the move began
    pub start: Vec3,
    /// Where the move ends
    pub target: Vec3,
    /// Seconds elapsed since the move began
    pub elapsed: f32,
    /// Seconds the move takes to complete
    pub duration: f32,
    /// Whether the move is still in progress
    pub active: bool,
}

impl Default for QueueMove {
    fn default() -> Self {
        Self::settled(Vec3::ZERO)
    }
}

/// Result of advancing a move by one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveStep {
    /// No move in progress
    Idle,
    /// Still interpolating, entity is now here
    Moving(Vec3),
    /// Reached the target this frame
    Arrived(Vec3),
}

impl QueueMove {
    /// An inactive move resting at `position`.
    #[must_use]
    pub const fn settled(position: Vec3) -> Self {
        Self {
            start: position,
            target: position,
            elapsed: 0.0,
            duration: 0.0,
            active: false,
        }
    }

    /// Starts (or supersedes) a move from `current` to `target`.
    pub fn begin(&mut self, current: Vec3, target: Vec3, duration: f32) {
        self.start = current;
        self.target = target;
        self.elapsed = 0.0;
        self.duration = duration;
        self.active = true;
    }

    /// Stops the move where it is.
    pub fn cancel(&mut self) {
        self.active = false;
    }

    /// Interpolation progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if !self.active || self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).min(1.0)
    }

    /// Advances the move by `dt` seconds.
    pub fn advance(&mut self, dt: f32) -> MoveStep {
        if !self.active {
            return MoveStep::Idle;
        }
        self.elapsed += dt;
        let t = self.progress();
        if t >= 1.0 {
            self.active = false;
            MoveStep::Arrived(self.target)
        } else {
            MoveStep::Moving(self.start.lerp(self.target, t))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_interpolates() {
        let mut mv = QueueMove::settled(Vec3::ZERO);
        mv.begin(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), 1.0);

        match mv.advance(0.5) {
            MoveStep::Moving(pos) => assert!((pos.z - 1.0).abs() < 1e-5),
            other => panic!("unexpected step: {other:?}"),
        }
        assert_eq!(mv.advance(0.6), MoveStep::Arrived(Vec3::new(0.0, 0.0, 2.0)));
        assert!(!mv.active);
        assert_eq!(mv.advance(0.1), MoveStep::Idle);
    }

    #[test]
    fn test_move_supersede_starts_from_current() {
        let mut mv = QueueMove::settled(Vec3::ZERO);
        mv.begin(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0), 1.0);
        let current = match mv.advance(0.25) {
            MoveStep::Moving(pos) => pos,
            other => panic!("unexpected step: {other:?}"),
        };

        mv.begin(current, Vec3::new(0.0, 0.0, 8.0), 1.0);
        assert_eq!(mv.start, current);
        assert_eq!(mv.elapsed, 0.0);
        assert!(mv.active);
    }

    #[test]
    fn test_zero_duration_arrives_immediately() {
        let mut mv = QueueMove::default();
        mv.begin(Vec3::ZERO, Vec3::X, 0.0);
        assert_eq!(mv.advance(0.0), MoveStep::Arrived(Vec3::X));
    }

    #[test]
    fn test_pose_names() {
        assert_eq!(Pose::Walk.name(), "walk");
        assert_eq!(Pose::Idle.name(), "idle");
    }
}
