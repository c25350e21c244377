//! Queue geometry and the open gap.
//!
//! Slot `i` sits at `root + direction * (i * spacing) + up * height_offset`.
//! Slot 0 is the front of the line. The gap is the one slot index the player
//! may currently cut into; the NPC standing there (if any) is the one that
//! gets pushed back.

use glam::Vec3;
use queuecut_common::{geometry::lateral_axis, geometry::unit_or_forward, SlotIndex, WORLD_UP};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::QueueSettings;
use crate::movement::Pose;

/// Fewest queue NPCs for which a gap is offered.
pub const MIN_QUEUE_FOR_GAP: usize = 3;

/// Lowest slot a random gap may take. Slot 0 is never offered.
pub const MIN_GAP_INDEX: SlotIndex = 1;

/// Free-running walk/idle rhythm of the line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShuffleCycle {
    /// Seconds into the current cycle
    pub timer: f32,
    /// Cycle length
    pub cycle: f32,
    /// Leading seconds of each cycle spent walking
    pub walk_time: f32,
}

impl ShuffleCycle {
    /// Advances the cycle.
    pub fn advance(&mut self, dt: f32) {
        self.timer = (self.timer + dt) % self.cycle;
    }

    /// Whether the line is currently shuffling forward.
    #[must_use]
    pub fn is_walking(&self) -> bool {
        self.timer % self.cycle < self.walk_time
    }

    /// Pose for settled queue members right now.
    #[must_use]
    pub fn pose(&self) -> Pose {
        if self.is_walking() {
            Pose::Walk
        } else {
            Pose::Idle
        }
    }
}

/// Queue geometry, gap and gap timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueModel {
    root: Vec3,
    direction: Vec3,
    spacing: f32,
    height_offset: f32,
    gap_index: Option<SlotIndex>,
    gap_interval: f32,
    gap_timer: f32,
    max_gap_index: SlotIndex,
    move_duration: f32,
    shuffle: ShuffleCycle,
}

impl QueueModel {
    /// Builds the model from settings.
    #[must_use]
    pub fn new(settings: &QueueSettings) -> Self {
        Self {
            root: settings.root,
            direction: unit_or_forward(settings.direction),
            spacing: settings.spacing,
            height_offset: settings.height_offset,
            gap_index: None,
            gap_interval: settings.gap_interval,
            gap_timer: 0.0,
            max_gap_index: settings.max_gap_index.max(MIN_GAP_INDEX),
            move_duration: settings.move_duration,
            shuffle: ShuffleCycle {
                timer: 0.0,
                cycle: settings.shuffle_cycle,
                walk_time: settings.shuffle_walk_time,
            },
        }
    }

    /// World position of a slot.
    #[must_use]
    pub fn position_for(&self, index: SlotIndex) -> Vec3 {
        self.root + self.direction * (index as f32 * self.spacing) + WORLD_UP * self.height_offset
    }

    /// Unit direction in which slot indices grow.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Distance between neighbouring slots.
    #[must_use]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Seconds an animated slot change takes.
    #[must_use]
    pub fn move_duration(&self) -> f32 {
        self.move_duration
    }

    /// Offset that steps someone out of the line, to its right.
    #[must_use]
    pub fn exit_offset(&self) -> Vec3 {
        lateral_axis(self.direction) * (self.spacing * 2.0)
    }

    /// Currently open gap.
    #[must_use]
    pub fn gap_index(&self) -> Option<SlotIndex> {
        self.gap_index
    }

    /// World position of the open gap.
    #[must_use]
    pub fn gap_position(&self) -> Option<Vec3> {
        self.gap_index.map(|index| self.position_for(index))
    }

    /// Sets the gap directly.
    pub fn set_gap(&mut self, index: Option<SlotIndex>) {
        self.gap_index = index;
    }

    /// Clears the gap.
    pub fn clear_gap(&mut self) {
        self.gap_index = None;
    }

    /// Seconds since the gap was last regenerated.
    #[must_use]
    pub fn gap_timer(&self) -> f32 {
        self.gap_timer
    }

    /// The walk/idle rhythm.
    #[must_use]
    pub fn shuffle(&self) -> &ShuffleCycle {
        &self.shuffle
    }

    /// Picks a new gap uniformly from `[1, min(last_index, max_gap_index)]`.
    ///
    /// Short queues get no gap at all.
    pub fn create_random_gap(&mut self, queue_len: usize, rng: &mut fastrand::Rng) -> Option<SlotIndex> {
        self.gap_index = if queue_len < MIN_QUEUE_FOR_GAP {
            None
        } else {
            let last_index = (queue_len - 1) as SlotIndex;
            let upper = last_index.min(self.max_gap_index);
            Some(rng.u32(MIN_GAP_INDEX..=upper))
        };
        debug!("Queue gap regenerated: {:?}", self.gap_index);
        self.gap_index
    }

    /// Advances gap and shuffle timers.
    ///
    /// Gap regeneration is suspended while `hold_gap` is set (the player
    /// stands in line). Returns whether the gap changed.
    pub fn update(
        &mut self,
        dt: f32,
        queue_len: usize,
        hold_gap: bool,
        rng: &mut fastrand::Rng,
    ) -> bool {
        self.shuffle.advance(dt);
        if hold_gap {
            return false;
        }

        let before = self.gap_index;
        self.gap_timer += dt;
        if self.gap_timer >= self.gap_interval {
            self.gap_timer = 0.0;
            self.create_random_gap(queue_len, rng);
        }
        if self.gap_index.is_none() && queue_len >= MIN_QUEUE_FOR_GAP {
            self.create_random_gap(queue_len, rng);
        }
        before != self.gap_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> QueueModel {
        QueueModel::new(&QueueSettings {
            root: Vec3::new(1.0, 0.0, 2.0),
            direction: Vec3::Z,
            spacing: 2.0,
            height_offset: 0.5,
            ..QueueSettings::default()
        })
    }

    #[test]
    fn test_position_for() {
        let queue = model();
        assert_eq!(queue.position_for(0), Vec3::new(1.0, 0.5, 2.0));
        assert_eq!(queue.position_for(3), Vec3::new(1.0, 0.5, 8.0));
    }

    #[test]
    fn test_exit_offset_is_lateral() {
        let queue = model();
        let offset = queue.exit_offset();
        assert!((offset.length() - 4.0).abs() < 1e-5);
        assert!(offset.dot(queue.direction()).abs() < 1e-5);
    }

    #[test]
    fn test_short_queue_has_no_gap() {
        let mut queue = model();
        let mut rng = fastrand::Rng::with_seed(1);
        queue.set_gap(Some(1));
        assert_eq!(queue.create_random_gap(2, &mut rng), None);
        assert_eq!(queue.gap_index(), None);
    }

    #[test]
    fn test_gap_range() {
        let mut queue = model();
        let mut rng = fastrand::Rng::with_seed(9);
        for _ in 0..200 {
            let gap = queue.create_random_gap(15, &mut rng).expect("long queue");
            assert!((1..=4).contains(&gap));
        }
        for _ in 0..200 {
            let gap = queue.create_random_gap(3, &mut rng).expect("three NPCs");
            assert!((1..=2).contains(&gap));
        }
    }

    #[test]
    fn test_lazy_gap_on_update() {
        let mut queue = model();
        let mut rng = fastrand::Rng::with_seed(2);
        assert!(queue.update(0.016, 5, false, &mut rng));
        assert!(queue.gap_index().is_some());
        assert!(queue.gap_position().is_some());
    }

    #[test]
    fn test_gap_held_while_player_queued() {
        let mut queue = model();
        let mut rng = fastrand::Rng::with_seed(2);
        assert!(!queue.update(100.0, 5, true, &mut rng));
        assert!(queue.gap_index().is_none());
        assert_eq!(queue.gap_timer(), 0.0);
    }

    #[test]
    fn test_gap_interval_regenerates() {
        let mut queue = model();
        let mut rng = fastrand::Rng::with_seed(4);
        queue.update(14.0, 10, false, &mut rng);
        assert!((queue.gap_timer() - 14.0).abs() < 1e-5);
        queue.update(1.5, 10, false, &mut rng);
        assert_eq!(queue.gap_timer(), 0.0);
        assert!(queue.gap_index().is_some());
    }

    #[test]
    fn test_shuffle_cycle() {
        let mut queue = model();
        let mut rng = fastrand::Rng::with_seed(4);
        assert_eq!(queue.shuffle().pose(), Pose::Walk);
        queue.update(6.0, 0, true, &mut rng);
        assert_eq!(queue.shuffle().pose(), Pose::Idle);
        queue.update(6.5, 0, true, &mut rng);
        assert_eq!(queue.shuffle().pose(), Pose::Walk);
    }
}
