//! Simulation tuning parameters.
//!
//! Every timer, radius and geometry constant used by the simulation lives
//! here so that a runner can load them from a file. All sections use
//! `#[serde(default)]`, so a partial file only overrides what it names.

use glam::Vec3;
use queuecut_common::geometry::unit_or_forward;
use serde::{Deserialize, Serialize};

/// Complete set of simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed (None = seeded from the OS)
    pub seed: Option<u64>,
    /// Where the player starts
    pub player_start: Vec3,
    /// Queue geometry and gap timing
    pub queue: QueueSettings,
    /// NPC alert/distracted cycles
    pub behavior: BehaviorSettings,
    /// Proximity checks
    pub detection: DetectionSettings,
    /// Post-catch recovery
    pub cooldown: CooldownSettings,
    /// Distraction abilities
    pub abilities: AbilitySettings,
}

/// Queue geometry, gap regeneration and movement timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// World position of slot 0 (front of the line)
    pub root: Vec3,
    /// Direction in which slot indices grow
    pub direction: Vec3,
    /// Distance between neighbouring slots
    pub spacing: f32,
    /// Vertical offset applied to every slot
    pub height_offset: f32,
    /// Seconds between gap regenerations
    pub gap_interval: f32,
    /// Highest index a random gap may take
    pub max_gap_index: u32,
    /// Seconds an animated slot change takes
    pub move_duration: f32,
    /// Length of the shuffle cycle in seconds
    pub shuffle_cycle: f32,
    /// Seconds of each shuffle cycle spent walking
    pub shuffle_walk_time: f32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            root: Vec3::new(-5.0, 0.0, -4.0),
            direction: Vec3::Z,
            spacing: 1.8,
            height_offset: 0.0,
            gap_interval: 15.0,
            max_gap_index: 4,
            move_duration: 1.2,
            shuffle_cycle: 12.0,
            shuffle_walk_time: 5.0,
        }
    }
}

/// Timers driving the NPC state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorSettings {
    /// Full personal cycle length in seconds
    pub cycle_length: f32,
    /// Leading part of the personal cycle spent distracted
    pub distracted_window: f32,
    /// Upper bound for the personal timer given to freshly spawned NPCs
    pub spawn_timer_spread: f32,
    /// Upper bound for the personal timer after a forced distraction ends
    pub forced_recovery_spread: f32,
    /// Seconds between global distraction windows
    pub global_interval: f32,
    /// Length of a global distraction window in seconds
    pub global_duration: f32,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            cycle_length: 16.0,
            distracted_window: 6.0,
            spawn_timer_spread: 8.0,
            forced_recovery_spread: 3.0,
            global_interval: 25.0,
            global_duration: 5.0,
        }
    }
}

/// Proximity thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Distance within which the player counts as near a slot
    pub detection_range: f32,
    /// Distance within which an alert NPC spots the player
    pub catch_radius: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            detection_range: 3.0,
            catch_radius: 4.0,
        }
    }
}

/// Recovery after a catch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownSettings {
    /// Seconds NPCs stay angry after a catch
    pub duration: f32,
}

impl Default for CooldownSettings {
    fn default() -> Self {
        Self { duration: 15.0 }
    }
}

/// Distraction ability tuning. Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilitySettings {
    /// Cooldown shared by every ability
    pub cooldown_ms: f32,
    /// Bomb: distraction length applied to every NPC
    pub bomb_duration_ms: f32,
    /// Bomb: global window opened when no NPC exists yet (seconds)
    pub bomb_fallback_window: f32,
    /// Sound: radius around the player
    pub sound_radius: f32,
    /// Sound: distraction length
    pub sound_duration_ms: f32,
    /// Whistle: cone reach
    pub whistle_range: f32,
    /// Whistle: full cone angle in radians
    pub whistle_angle: f32,
    /// Whistle: distraction length
    pub whistle_duration_ms: f32,
}

impl Default for AbilitySettings {
    fn default() -> Self {
        Self {
            cooldown_ms: 10_000.0,
            bomb_duration_ms: 5_000.0,
            bomb_fallback_window: 5.0,
            sound_radius: 5.0,
            sound_duration_ms: 4_000.0,
            whistle_range: 8.0,
            whistle_angle: std::f32::consts::FRAC_PI_3,
            whistle_duration_ms: 3_000.0,
        }
    }
}

impl SimConfig {
    /// Validate and clamp values to ranges the simulation can run with.
    pub fn validate(&mut self) {
        let queue = &mut self.queue;
        queue.direction = unit_or_forward(queue.direction);
        queue.spacing = queue.spacing.clamp(0.1, 20.0);
        queue.gap_interval = queue.gap_interval.max(0.1);
        queue.max_gap_index = queue.max_gap_index.max(1);
        queue.move_duration = queue.move_duration.clamp(0.01, 10.0);
        queue.shuffle_cycle = queue.shuffle_cycle.max(0.1);
        queue.shuffle_walk_time = queue.shuffle_walk_time.clamp(0.0, queue.shuffle_cycle);

        let behavior = &mut self.behavior;
        behavior.cycle_length = behavior.cycle_length.max(0.1);
        behavior.distracted_window = behavior.distracted_window.clamp(0.0, behavior.cycle_length);
        behavior.spawn_timer_spread = behavior.spawn_timer_spread.max(0.0);
        behavior.forced_recovery_spread = behavior.forced_recovery_spread.max(0.0);
        behavior.global_interval = behavior.global_interval.max(0.1);
        behavior.global_duration = behavior.global_duration.max(0.0);

        let detection = &mut self.detection;
        detection.detection_range = detection.detection_range.max(0.0);
        detection.catch_radius = detection.catch_radius.max(0.0);

        self.cooldown.duration = self.cooldown.duration.max(0.0);

        let abilities = &mut self.abilities;
        abilities.cooldown_ms = abilities.cooldown_ms.max(0.0);
        abilities.bomb_duration_ms = abilities.bomb_duration_ms.max(0.0);
        abilities.bomb_fallback_window = abilities.bomb_fallback_window.max(0.0);
        abilities.sound_radius = abilities.sound_radius.max(0.0);
        abilities.sound_duration_ms = abilities.sound_duration_ms.max(0.0);
        abilities.whistle_range = abilities.whistle_range.max(0.0);
        abilities.whistle_angle = abilities.whistle_angle.clamp(0.0, std::f32::consts::TAU);
        abilities.whistle_duration_ms = abilities.whistle_duration_ms.max(0.0);
    }

    /// Returns a validated copy.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.queue.spacing, 1.8);
        assert_eq!(config.queue.gap_interval, 15.0);
        assert_eq!(config.behavior.cycle_length, 16.0);
        assert_eq!(config.behavior.distracted_window, 6.0);
        assert_eq!(config.detection.detection_range, 3.0);
        assert_eq!(config.detection.catch_radius, 4.0);
        assert_eq!(config.cooldown.duration, 15.0);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();
        config.queue.direction = Vec3::new(0.0, 0.0, 5.0);
        config.queue.spacing = -1.0;
        config.behavior.distracted_window = 100.0;
        config.cooldown.duration = -3.0;

        config.validate();

        assert!((config.queue.direction.length() - 1.0).abs() < 1e-6);
        assert!((config.queue.spacing - 0.1).abs() < 1e-6);
        assert_eq!(config.behavior.distracted_window, config.behavior.cycle_length);
        assert_eq!(config.cooldown.duration, 0.0);
    }

    #[test]
    fn test_config_json_partial() {
        let json = r#"{ "seed": 7, "cooldown": { "duration": 3.0 } }"#;
        let config: SimConfig = serde_json::from_str(json).expect("Failed to parse");
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.cooldown.duration, 3.0);
        assert_eq!(config.queue.spacing, 1.8);
    }
}
