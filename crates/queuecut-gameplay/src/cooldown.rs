//! Recovery after a catch.

use queuecut_common::EntityId;
use tracing::info;

use crate::context::SimContext;
use crate::events::GameEvent;
use crate::npc::NPCState;
use crate::presentation::PresentationSink;

/// Counts the catch cooldown down and calms the NPCs when it runs out.
#[derive(Debug, Clone)]
pub struct CooldownManager {
    cycle_length: f32,
}

impl CooldownManager {
    /// Creates the manager. Recovering NPCs get a personal timer anywhere
    /// in `[0, cycle_length)`.
    #[must_use]
    pub fn new(cycle_length: f32) -> Self {
        Self { cycle_length }
    }

    /// Advances the cooldown. Returns whether the player recovered this tick.
    pub fn update<P: PresentationSink>(&self, ctx: &mut SimContext<P>, dt: f32) -> bool {
        if !ctx.player.caught {
            return false;
        }
        ctx.player.cooldown_remaining -= dt;
        if ctx.player.cooldown_remaining > 0.0 {
            return false;
        }

        ctx.player.cooldown_remaining = 0.0;
        ctx.player.caught = false;
        let angry: Vec<EntityId> = ctx
            .roster
            .iter()
            .filter(|npc| npc.state == NPCState::Angry)
            .map(|npc| npc.id)
            .collect();
        for &id in &angry {
            let state = NPCState::random_calm(&mut ctx.rng);
            let timer = ctx.rng.f32() * self.cycle_length;
            if let Some(npc) = ctx.roster.get_mut(id) {
                npc.personal_timer = timer;
            }
            ctx.set_npc_state(id, state);
        }
        ctx.events.publish(GameEvent::CooldownFinished);
        info!("Cooldown over, {} NPCs calmed down", angry.len());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context_with_queue;

    #[test]
    fn test_no_op_when_not_caught() {
        let mut ctx = context_with_queue(3, NPCState::Angry);
        let manager = CooldownManager::new(16.0);
        assert!(!manager.update(&mut ctx, 1.0));
        assert!(ctx.roster.iter().all(|npc| npc.state == NPCState::Angry));
    }

    #[test]
    fn test_recovery_calms_and_desyncs() {
        let mut ctx = context_with_queue(6, NPCState::Angry);
        let manager = CooldownManager::new(16.0);
        ctx.player.caught = true;
        ctx.player.cooldown_remaining = 2.0;

        assert!(!manager.update(&mut ctx, 1.5));
        assert!((ctx.player.cooldown_remaining - 0.5).abs() < 1e-6);
        assert!(manager.update(&mut ctx, 1.5));

        assert!(!ctx.player.caught);
        assert_eq!(ctx.player.cooldown_remaining, 0.0);
        for npc in ctx.roster.iter() {
            assert_ne!(npc.state, NPCState::Angry);
            assert!((0.0..16.0).contains(&npc.personal_timer));
        }
        let timers: Vec<f32> = ctx.roster.iter().map(|npc| npc.personal_timer).collect();
        assert!(timers.windows(2).any(|pair| pair[0] != pair[1]));
        assert!(ctx.events.drain().contains(&GameEvent::CooldownFinished));
    }
}
