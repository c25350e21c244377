//! Player distraction abilities.
//!
//! Each ability forces a set of NPCs distracted for a while and then needs
//! to recharge:
//! - Bomb: every NPC
//! - Sound: NPCs around the player
//! - Whistle: NPCs in a cone in front of the player

use queuecut_common::{geometry::within_cone, EntityId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::behavior::BehaviorScheduler;
use crate::config::AbilitySettings;
use crate::context::SimContext;
use crate::events::GameEvent;
use crate::presentation::{PresentationSink, SoundCue};

/// Error types for ability use.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbilityError {
    /// The ability has not recharged yet
    #[error("{ability:?} is recharging ({remaining_ms:.0}ms left)")]
    OnCooldown {
        /// Ability that was requested
        ability: AbilityKind,
        /// Milliseconds until it is ready
        remaining_ms: f32,
    },
}

/// Result type for ability use.
pub type AbilityResult<T> = Result<T, AbilityError>;

/// The available abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Distracts every NPC
    Bomb,
    /// Distracts NPCs near the player
    Sound,
    /// Distracts NPCs the player is facing
    Whistle,
}

impl AbilityKind {
    /// Sound played when the ability goes off.
    #[must_use]
    pub const fn sound_cue(self) -> SoundCue {
        match self {
            Self::Bomb => SoundCue::Bomb,
            Self::Sound => SoundCue::Embarrassing,
            Self::Whistle => SoundCue::Whistle,
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Bomb => 0,
            Self::Sound => 1,
            Self::Whistle => 2,
        }
    }
}

/// Recharge state of every ability.
#[derive(Debug, Clone)]
pub struct AbilitySet {
    settings: AbilitySettings,
    remaining_ms: [f32; 3],
}

impl AbilitySet {
    /// Creates a set with everything ready.
    #[must_use]
    pub fn new(settings: &AbilitySettings) -> Self {
        Self {
            settings: settings.clone(),
            remaining_ms: [0.0; 3],
        }
    }

    /// Milliseconds until `ability` is ready.
    #[must_use]
    pub fn remaining_ms(&self, ability: AbilityKind) -> f32 {
        self.remaining_ms[ability.slot()]
    }

    /// Whether `ability` can be used now.
    #[must_use]
    pub fn is_ready(&self, ability: AbilityKind) -> bool {
        self.remaining_ms(ability) <= 0.0
    }

    /// Recharges every ability by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        for remaining in &mut self.remaining_ms {
            *remaining = (*remaining - dt * 1000.0).max(0.0);
        }
    }

    /// Fires an ability. Returns how many NPCs were distracted.
    pub fn use_ability<P: PresentationSink>(
        &mut self,
        ctx: &mut SimContext<P>,
        behavior: &mut BehaviorScheduler,
        ability: AbilityKind,
    ) -> AbilityResult<usize> {
        let remaining_ms = self.remaining_ms(ability);
        if remaining_ms > 0.0 {
            return Err(AbilityError::OnCooldown {
                ability,
                remaining_ms,
            });
        }
        self.remaining_ms[ability.slot()] = self.settings.cooldown_ms;

        let origin = ctx.player.position;
        let (targets, duration_ms): (Vec<EntityId>, f32) = match ability {
            AbilityKind::Bomb => (
                ctx.roster.iter().map(|npc| npc.id).collect(),
                self.settings.bomb_duration_ms,
            ),
            AbilityKind::Sound => (
                ctx.roster.ids_within(origin, self.settings.sound_radius),
                self.settings.sound_duration_ms,
            ),
            AbilityKind::Whistle => {
                let facing = ctx.player.facing;
                let ids = ctx
                    .roster
                    .iter()
                    .filter(|npc| {
                        within_cone(
                            origin,
                            facing,
                            npc.position,
                            self.settings.whistle_range,
                            self.settings.whistle_angle,
                        )
                    })
                    .map(|npc| npc.id)
                    .collect();
                (ids, self.settings.whistle_duration_ms)
            },
        };

        let affected = if ability == AbilityKind::Bomb && ctx.roster.is_empty() {
            behavior.force_global_distraction(ctx, self.settings.bomb_fallback_window);
            0
        } else {
            behavior.force_distraction(ctx, &targets, duration_ms)
        };

        ctx.sink.emit_sound(ability.sound_cue());
        ctx.events.publish(GameEvent::AbilityUsed { ability, affected });
        info!("{:?} used, {} NPCs distracted", ability, affected);
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abilities_start_ready() {
        let set = AbilitySet::new(&AbilitySettings::default());
        for ability in [AbilityKind::Bomb, AbilityKind::Sound, AbilityKind::Whistle] {
            assert!(set.is_ready(ability));
        }
    }

    #[test]
    fn test_recharge() {
        let mut set = AbilitySet::new(&AbilitySettings::default());
        set.remaining_ms[AbilityKind::Sound.slot()] = 1_500.0;
        set.update(1.0);
        assert!((set.remaining_ms(AbilityKind::Sound) - 500.0).abs() < 1e-3);
        set.update(1.0);
        assert!(set.is_ready(AbilityKind::Sound));
        assert_eq!(set.remaining_ms(AbilityKind::Sound), 0.0);
    }

    #[test]
    fn test_sound_cues() {
        assert_eq!(AbilityKind::Bomb.sound_cue(), SoundCue::Bomb);
        assert_eq!(AbilityKind::Sound.sound_cue(), SoundCue::Embarrassing);
        assert_eq!(AbilityKind::Whistle.sound_cue(), SoundCue::Whistle);
    }
}
