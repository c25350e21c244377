//! NPC behavior scheduling.
//!
//! Each tick every NPC's state is decided by exactly one rule, taken in
//! fixed priority order:
//!
//! 1. **Caught** - while a catch is being served, queue NPCs are Angry.
//! 2. **Forced** - an ability-forced distraction is counting down.
//! 3. **Global** - a queue-wide distraction window is open.
//! 4. **Personal** - the NPC's own free-running alert/distracted cycle.
//!
//! The scheduler owns the global distraction clock; personal and forced
//! timers live on each NPC.

use queuecut_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::BehaviorSettings;
use crate::context::SimContext;
use crate::events::GameEvent;
use crate::npc::{NPCState, NPC};
use crate::presentation::PresentationSink;

/// Rule that decided an NPC's state this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorRule {
    /// Catch cooldown in progress
    Caught,
    /// Ability-forced distraction
    Forced,
    /// Global distraction window
    Global,
    /// Personal cycle
    Personal,
}

/// Picks the governing rule for an NPC.
#[must_use]
pub fn governing_rule(npc: &NPC, caught: bool, global_active: bool) -> BehaviorRule {
    if caught && npc.is_queued() {
        BehaviorRule::Caught
    } else if npc.forced_distraction_ms.is_some_and(|ms| ms > 0.0) {
        BehaviorRule::Forced
    } else if global_active {
        BehaviorRule::Global
    } else {
        BehaviorRule::Personal
    }
}

/// State the personal cycle prescribes at `timer` seconds.
#[must_use]
pub fn personal_cycle_state(timer: f32, cycle_length: f32, distracted_window: f32) -> NPCState {
    let phase = timer.rem_euclid(cycle_length);
    if phase < distracted_window {
        NPCState::Distracted
    } else {
        NPCState::Alert
    }
}

/// Edge reported by the global clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEdge {
    /// A window opened this tick
    Opened,
    /// A window closed this tick
    Closed,
}

/// Queue-wide distraction clock, independent of individual NPCs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalDistractionState {
    /// Whether a window is open
    pub active: bool,
    /// Seconds since the last edge
    pub timer: f32,
    /// Seconds between windows
    pub interval: f32,
    /// Configured window length
    pub duration: f32,
    /// Length of the window currently open (may differ when forced)
    pub current_window: f32,
}

impl GlobalDistractionState {
    /// Creates a closed clock.
    #[must_use]
    pub fn new(interval: f32, duration: f32) -> Self {
        Self {
            active: false,
            timer: 0.0,
            interval,
            duration,
            current_window: duration,
        }
    }

    /// Opens a window of `duration` seconds right now.
    pub fn open(&mut self, duration: f32) {
        self.active = true;
        self.timer = 0.0;
        self.current_window = duration;
    }

    /// Advances the clock, reporting an edge if one was crossed.
    pub fn advance(&mut self, dt: f32) -> Option<WindowEdge> {
        self.timer += dt;
        if self.active {
            if self.timer >= self.current_window {
                self.active = false;
                self.timer = 0.0;
                self.current_window = self.duration;
                return Some(WindowEdge::Closed);
            }
        } else if self.timer >= self.interval {
            self.open(self.duration);
            return Some(WindowEdge::Opened);
        }
        None
    }
}

/// Advances every NPC's state machine.
#[derive(Debug, Clone)]
pub struct BehaviorScheduler {
    settings: BehaviorSettings,
    global: GlobalDistractionState,
}

impl BehaviorScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub fn new(settings: &BehaviorSettings) -> Self {
        Self {
            settings: settings.clone(),
            global: GlobalDistractionState::new(settings.global_interval, settings.global_duration),
        }
    }

    /// The global distraction clock.
    #[must_use]
    pub fn global(&self) -> &GlobalDistractionState {
        &self.global
    }

    /// Random personal timer for a freshly spawned NPC.
    #[must_use]
    pub fn spawn_timer(&self, rng: &mut fastrand::Rng) -> f32 {
        rng.f32() * self.settings.spawn_timer_spread
    }

    /// Random personal timer anywhere in the cycle.
    #[must_use]
    pub fn desync_timer(&self, rng: &mut fastrand::Rng) -> f32 {
        rng.f32() * self.settings.cycle_length
    }

    /// Advances the global clock and then every NPC by `dt` seconds.
    pub fn update<P: PresentationSink>(&mut self, ctx: &mut SimContext<P>, dt: f32) {
        match self.global.advance(dt) {
            Some(WindowEdge::Opened) => {
                debug!("Global distraction window opened ({}s)", self.global.current_window);
                ctx.events.publish(GameEvent::GlobalDistractionStarted {
                    duration: self.global.current_window,
                });
            },
            Some(WindowEdge::Closed) => {
                debug!("Global distraction window closed");
                let spread = self.global.interval;
                for npc in ctx.roster.iter_mut() {
                    npc.personal_timer = ctx.rng.f32() * spread;
                }
                ctx.events.publish(GameEvent::GlobalDistractionEnded);
            },
            None => {},
        }

        let caught = ctx.player.caught;
        let global_active = self.global.active;
        let ids: Vec<EntityId> = ctx.roster.iter().map(|npc| npc.id).collect();

        for id in ids {
            let Some(npc) = ctx.roster.get_mut(id) else {
                continue;
            };
            let next = match governing_rule(npc, caught, global_active) {
                BehaviorRule::Caught => NPCState::Angry,
                BehaviorRule::Forced => {
                    let remaining = npc.forced_distraction_ms.unwrap_or(0.0) - dt * 1000.0;
                    if remaining <= 0.0 {
                        npc.forced_distraction_ms = None;
                        npc.personal_timer = ctx.rng.f32() * self.settings.forced_recovery_spread;
                        trace!("NPC {} forced distraction expired", id);
                    } else {
                        npc.forced_distraction_ms = Some(remaining);
                    }
                    calm_or_keep_angry(npc.state)
                },
                BehaviorRule::Global => calm_or_keep_angry(npc.state),
                BehaviorRule::Personal => {
                    npc.personal_timer += dt;
                    personal_cycle_state(
                        npc.personal_timer,
                        self.settings.cycle_length,
                        self.settings.distracted_window,
                    )
                },
            };
            ctx.set_npc_state(id, next);
        }
    }

    /// Forces the given NPCs distracted for `duration_ms` milliseconds.
    ///
    /// NPCs angered by an ongoing catch are left alone. Returns how many
    /// NPCs were affected.
    pub fn force_distraction<P: PresentationSink>(
        &mut self,
        ctx: &mut SimContext<P>,
        ids: &[EntityId],
        duration_ms: f32,
    ) -> usize {
        if duration_ms <= 0.0 {
            return 0;
        }
        let caught = ctx.player.caught;
        let mut affected = 0;
        for &id in ids {
            let Some(npc) = ctx.roster.get_mut(id) else {
                continue;
            };
            if (caught && npc.is_queued()) || npc.state == NPCState::Angry {
                continue;
            }
            npc.forced_distraction_ms = Some(duration_ms);
            ctx.set_npc_state(id, NPCState::Distracted);
            affected += 1;
        }
        debug!("Forced distraction on {} NPCs for {}ms", affected, duration_ms);
        affected
    }

    /// Opens a global distraction window of `duration` seconds immediately.
    pub fn force_global_distraction<P: PresentationSink>(
        &mut self,
        ctx: &mut SimContext<P>,
        duration: f32,
    ) {
        self.global.open(duration.max(0.0));
        let ids: Vec<EntityId> = ctx
            .roster
            .iter()
            .filter(|npc| npc.state != NPCState::Angry)
            .map(|npc| npc.id)
            .collect();
        for id in ids {
            ctx.set_npc_state(id, NPCState::Distracted);
        }
        debug!("Global distraction forced for {}s", duration);
        ctx.events
            .publish(GameEvent::GlobalDistractionStarted { duration: self.global.current_window });
    }
}

fn calm_or_keep_angry(state: NPCState) -> NPCState {
    if state == NPCState::Angry {
        NPCState::Angry
    } else {
        NPCState::Distracted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npc::NPCRole;
    use glam::Vec3;

    fn npc(role: NPCRole) -> NPC {
        NPC::new(EntityId::from_raw(1), role, Vec3::ZERO, 0.0)
    }

    #[test]
    fn test_rule_priority() {
        let mut queued = npc(NPCRole::Queue);
        queued.forced_distraction_ms = Some(500.0);

        assert_eq!(governing_rule(&queued, true, true), BehaviorRule::Caught);
        assert_eq!(governing_rule(&queued, false, true), BehaviorRule::Forced);
        queued.forced_distraction_ms = None;
        assert_eq!(governing_rule(&queued, false, true), BehaviorRule::Global);
        assert_eq!(governing_rule(&queued, false, false), BehaviorRule::Personal);
    }

    #[test]
    fn test_wanderers_ignore_catch() {
        let wanderer = npc(NPCRole::Wandering);
        assert_eq!(governing_rule(&wanderer, true, false), BehaviorRule::Personal);
    }

    #[test]
    fn test_personal_cycle_state() {
        assert_eq!(personal_cycle_state(0.0, 16.0, 6.0), NPCState::Distracted);
        assert_eq!(personal_cycle_state(5.9, 16.0, 6.0), NPCState::Distracted);
        assert_eq!(personal_cycle_state(6.0, 16.0, 6.0), NPCState::Alert);
        assert_eq!(personal_cycle_state(15.9, 16.0, 6.0), NPCState::Alert);
        assert_eq!(personal_cycle_state(17.0, 16.0, 6.0), NPCState::Distracted);
    }

    #[test]
    fn test_global_clock_edges() {
        let mut clock = GlobalDistractionState::new(25.0, 5.0);
        assert_eq!(clock.advance(24.0), None);
        assert_eq!(clock.advance(1.0), Some(WindowEdge::Opened));
        assert!(clock.active);
        assert_eq!(clock.advance(4.0), None);
        assert_eq!(clock.advance(1.0), Some(WindowEdge::Closed));
        assert!(!clock.active);
        assert_eq!(clock.timer, 0.0);
    }

    #[test]
    fn test_forced_window_restores_duration() {
        let mut clock = GlobalDistractionState::new(25.0, 5.0);
        clock.open(2.0);
        assert_eq!(clock.advance(2.0), Some(WindowEdge::Closed));
        assert_eq!(clock.current_window, 5.0);
    }
}
