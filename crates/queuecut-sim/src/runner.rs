//! Headless run loop and the scripted player.

use anyhow::{Context, Result};
use glam::Vec3;
use queuecut_common::{geometry::lateral_axis, SlotIndex};
use queuecut_gameplay::{
    AbilityKind, Command, GameEvent, InvariantViolation, PresentationSink, Simulation, Snapshot,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{AutopilotSettings, RunnerConfig};
use crate::sink::LogSink;

/// Arrival tolerance for autopilot walking.
const ARRIVE_EPSILON: f32 = 0.05;

/// Sideways distance from the gap the autopilot stands at when cutting in.
const CUT_IN_DISTANCE: f32 = 1.0;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The simulation state broke a structural rule
    #[error("invariant broken at frame {frame}: {source}")]
    Invariant {
        /// Frame the check failed on
        frame: u64,
        /// Broken rule
        source: InvariantViolation,
    },
}

/// What the autopilot is currently up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AutopilotPhase {
    /// Doing nothing
    Idle,
    /// Waiting beside the line for the gap's neighbours to look away
    Staging,
    /// Walking in to cut
    Approaching,
    /// Standing in line
    InLine,
    /// Keeping clear while the catch cooldown runs
    Recovering,
}

/// Scripted player that keeps trying to cut in.
#[derive(Debug, Clone)]
pub struct Autopilot {
    settings: AutopilotSettings,
    time_in_line: f32,
    phase: AutopilotPhase,
}

impl Autopilot {
    /// Creates an autopilot.
    #[must_use]
    pub fn new(settings: AutopilotSettings) -> Self {
        Self {
            settings,
            time_in_line: 0.0,
            phase: AutopilotPhase::Idle,
        }
    }

    /// Moves the player and queues commands for the next tick.
    pub fn step<P: PresentationSink>(&mut self, sim: &mut Simulation<P>, dt: f32) -> AutopilotPhase {
        let phase = if !self.settings.enabled {
            AutopilotPhase::Idle
        } else if sim.player().in_queue {
            self.step_in_line(sim, dt)
        } else {
            self.time_in_line = 0.0;
            self.step_outside(sim, dt)
        };
        if phase != self.phase {
            debug!("Autopilot: {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
        phase
    }

    fn step_in_line<P: PresentationSink>(&mut self, sim: &mut Simulation<P>, dt: f32) -> AutopilotPhase {
        self.time_in_line += dt;
        if self.time_in_line >= self.settings.patience {
            self.time_in_line = 0.0;
            sim.queue_command(Command::Exit);
            return AutopilotPhase::InLine;
        }

        let player = sim.player();
        if player.caught || player.movement.active {
            return AutopilotPhase::InLine;
        }
        if let Some(index) = player.queue_index.filter(|&index| index > 0) {
            if slot_unwatched(sim, index - 1) {
                sim.queue_command(Command::MoveTo { index: index - 1 });
            }
        }
        AutopilotPhase::InLine
    }

    fn step_outside<P: PresentationSink>(&mut self, sim: &mut Simulation<P>, dt: f32) -> AutopilotPhase {
        let side = lateral_axis(sim.queue().direction());
        let staging = self.settings.staging_distance;

        if sim.player().caught {
            let away = sim.queue().position_for(0) + side * staging;
            self.walk_toward(sim, away, dt);
            return AutopilotPhase::Recovering;
        }

        let Some(gap) = sim.queue().gap_index() else {
            let wait = sim.queue().position_for(1) + side * staging;
            self.walk_toward(sim, wait, dt);
            return AutopilotPhase::Staging;
        };
        let gap_position = sim.queue().position_for(gap);

        if slot_unwatched(sim, gap) {
            self.walk_toward(sim, gap_position + side * CUT_IN_DISTANCE, dt);
            let range = sim.config().detection.detection_range;
            if sim.player().position.distance(gap_position) < range {
                sim.queue_command(Command::Insert { index: Some(gap) });
            }
            return AutopilotPhase::Approaching;
        }

        let arrived = self.walk_toward(sim, gap_position + side * staging, dt);
        if arrived && self.settings.use_abilities && sim.abilities().is_ready(AbilityKind::Bomb) {
            sim.queue_command(Command::UseAbility {
                ability: AbilityKind::Bomb,
            });
        }
        AutopilotPhase::Staging
    }

    /// Walks the player toward `target`. Returns whether it is there.
    fn walk_toward<P: PresentationSink>(&self, sim: &mut Simulation<P>, target: Vec3, dt: f32) -> bool {
        let offset = target - sim.player().position;
        let distance = offset.length();
        if distance <= ARRIVE_EPSILON {
            return true;
        }
        let step = (self.settings.walk_speed * dt).min(distance);
        sim.move_player(offset / distance * step);
        distance - step <= ARRIVE_EPSILON
    }
}

/// Whether the NPCs around `index` (the one standing there and the one ahead)
/// are both looking away.
fn slot_unwatched<P: PresentationSink>(sim: &Simulation<P>, index: SlotIndex) -> bool {
    let roster = sim.roster();
    [roster.at_slot(index), roster.ahead_of(index)]
        .into_iter()
        .flatten()
        .all(|npc| npc.is_distracted())
}

/// Counts of notable events over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    /// Successful cuts
    pub insertions: u32,
    /// Catches
    pub catches: u32,
    /// Recoveries from a catch
    pub recoveries: u32,
    /// Exits from the line
    pub exits: u32,
    /// Slot changes while in line
    pub moves: u32,
    /// Abilities fired
    pub abilities_used: u32,
    /// Global distraction windows opened
    pub global_windows: u32,
    /// Commands that were refused
    pub refused_commands: u32,
}

impl Tally {
    /// Counts an event.
    pub fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::PlayerInserted { .. } => self.insertions += 1,
            GameEvent::PlayerCaught { .. } => self.catches += 1,
            GameEvent::CooldownFinished => self.recoveries += 1,
            GameEvent::PlayerExited { .. } => self.exits += 1,
            GameEvent::PlayerMoved { .. } => self.moves += 1,
            GameEvent::AbilityUsed { .. } => self.abilities_used += 1,
            GameEvent::GlobalDistractionStarted { .. } => self.global_windows += 1,
            GameEvent::NPCStateChanged { .. }
            | GameEvent::GapChanged { .. }
            | GameEvent::GlobalDistractionEnded => {},
        }
    }
}

/// Result of a headless run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Ticks run
    pub frames: u64,
    /// Simulated seconds
    pub simulated_seconds: f32,
    /// Event counts
    pub tally: Tally,
    /// Sounds played, by name
    pub sounds: BTreeMap<String, u32>,
    /// Gameplay events lost to a full backlog
    pub dropped_events: usize,
    /// HUD state at the end of the run
    pub snapshot: Snapshot,
}

/// Builds the scene from `config` and runs it to the end.
pub fn run(config: &RunnerConfig) -> Result<RunSummary> {
    let mut sim = Simulation::new(config.sim.clone(), LogSink::new());
    sim.spawn_queue(config.queue_size)
        .context("Failed to spawn the queue")?;

    let side = lateral_axis(sim.queue().direction());
    for i in 0..config.wanderers {
        let along = sim.queue().position_for((i * 3) as SlotIndex);
        sim.spawn_wanderer(along - side * config.wander_distance)
            .context("Failed to spawn a wanderer")?;
    }

    let mut autopilot = Autopilot::new(config.autopilot.clone());
    let dt = config.frame_dt();
    let frames = config.frame_count();
    let mut tally = Tally::default();

    info!(
        "Running {} frames at {} fps with {} queue NPCs",
        frames, config.frames_per_second, config.queue_size
    );

    for frame in 0..frames {
        autopilot.step(&mut sim, dt);
        let report = sim.tick(dt);

        for outcome in report.outcomes.iter().filter(|outcome| !outcome.is_success()) {
            debug!("Frame {}: command refused: {:?}", frame, outcome);
            tally.refused_commands += 1;
        }
        for event in sim.events().drain() {
            tally.record(&event);
        }
        sim.verify_invariants()
            .map_err(|source| RunError::Invariant { frame, source })?;
    }

    info!(
        "Run finished: {} cuts, {} catches, {} exits",
        tally.insertions, tally.catches, tally.exits
    );
    let dropped_events = sim.events().dropped_count();
    if dropped_events > 0 {
        warn!("{} gameplay events were dropped", dropped_events);
    }

    Ok(RunSummary {
        frames,
        simulated_seconds: sim.elapsed(),
        tally,
        sounds: sim.sink().sound_counts().clone(),
        dropped_events,
        snapshot: sim.snapshot(),
    })
}
