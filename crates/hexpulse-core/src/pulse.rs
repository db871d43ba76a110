//! The global pulse: a timed dice roll that spawns resources.
//!
//! States:
//! - `WaitingForPlayers`: sends a `-1` heartbeat every second until ready
//! - `Running`: counts down and broadcasts each whole second remaining
//! - `Rolling`: dice are shown; the outcome resolves when the window ends
//!
//! Once started, the scheduler never goes back to waiting.

use crate::board::Board;
use crate::collection::CollectionEngine;
use crate::config::GameConfig;
use crate::events::{EventSink, PulsePhase, ServerEvent};
use crate::hex::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::{debug, info};

/// Dice total that triggers the robber instead of production
pub const ROBBER_TOTAL: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PulseState {
    WaitingForPlayers,
    Running,
    Rolling,
}

/// Two six-sided dice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roll {
    pub die1: u8,
    pub die2: u8,
}

impl Roll {
    pub fn new(die1: u8, die2: u8) -> Self {
        Self { die1, die2 }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            die1: rng.gen_range(1..=6),
            die2: rng.gen_range(1..=6),
        }
    }

    pub fn total(&self) -> u8 {
        self.die1 + self.die2
    }

    fn event(&self, phase: PulsePhase, matching_tiles: Option<usize>) -> ServerEvent {
        ServerEvent::PulseEvent {
            phase,
            die1: self.die1,
            die2: self.die2,
            total: self.total(),
            matching_tiles,
        }
    }
}

/// How a pulse resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PulseOutcome {
    Robber(Roll),
    /// One collectible per matching tile, ids in spawn order
    Produced { roll: Roll, spawned: Vec<u64> },
}

#[derive(Debug, Clone)]
pub struct PulseScheduler {
    state: PulseState,
    interval: f64,
    roll_duration: f64,
    spawn_min: f64,
    spawn_max: f64,
    timer: f64,
    last_broadcast: Option<i32>,
    waiting_clock: f64,
    pending: Option<Roll>,
    roll_remaining: f64,
    pulses: u32,
}

impl PulseScheduler {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            state: PulseState::WaitingForPlayers,
            interval: config.pulse_interval,
            roll_duration: config.roll_duration,
            spawn_min: config.spawn_min_distance,
            spawn_max: config.spawn_max_distance.max(config.spawn_min_distance),
            timer: config.pulse_interval,
            last_broadcast: None,
            waiting_clock: 0.0,
            pending: None,
            roll_remaining: 0.0,
            pulses: 0,
        }
    }

    pub fn state(&self) -> PulseState {
        self.state
    }

    /// Seconds until the next pulse
    pub fn time_remaining(&self) -> f64 {
        self.timer
    }

    /// Number of pulses rolled so far
    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    /// Advance the scheduler by `dt` seconds.
    ///
    /// `all_ready` gates the first start only. Returns the outcome when a
    /// roll window closes during this update.
    #[allow(clippy::too_many_arguments)]
    pub fn update<R: Rng>(
        &mut self,
        dt: f64,
        all_ready: bool,
        board: &Board,
        collection: &mut CollectionEngine,
        rng: &mut R,
        now: f64,
        sink: &mut dyn EventSink,
    ) -> Option<PulseOutcome> {
        match self.state {
            PulseState::WaitingForPlayers => {
                if !all_ready {
                    self.waiting_clock += dt;
                    while self.waiting_clock >= 1.0 {
                        self.waiting_clock -= 1.0;
                        sink.broadcast(ServerEvent::TimerEvent {
                            seconds_remaining: -1,
                        });
                    }
                    return None;
                }
                // The timer still holds a full interval unless a pulse was forced
                info!("All players ready, starting pulse countdown");
                self.state = PulseState::Running;
                self.last_broadcast = None;
                self.count_down(dt, rng, sink);
                None
            }
            PulseState::Running => {
                self.count_down(dt, rng, sink);
                None
            }
            PulseState::Rolling => {
                self.roll_remaining -= dt;
                if self.roll_remaining > 0.0 {
                    return None;
                }
                self.resolve(board, collection, rng, now, sink)
            }
        }
    }

    /// Roll the dice and open the roll window. Ignored while a roll is showing.
    pub fn execute_pulse<R: Rng>(&mut self, rng: &mut R, sink: &mut dyn EventSink) -> Option<Roll> {
        if self.state == PulseState::Rolling {
            debug!("Pulse already rolling, ignoring");
            return None;
        }
        let roll = Roll::random(rng);
        self.begin_roll(roll, sink);
        Some(roll)
    }

    /// Open the roll window with a given roll
    pub fn begin_roll(&mut self, roll: Roll, sink: &mut dyn EventSink) -> bool {
        if self.state == PulseState::Rolling {
            debug!("Pulse already rolling, ignoring");
            return false;
        }
        self.state = PulseState::Rolling;
        self.pending = Some(roll);
        self.roll_remaining = self.roll_duration;
        self.pulses += 1;
        sink.broadcast(roll.event(PulsePhase::RollStart, None));
        info!(total = roll.total(), "Pulse {}: rolled {} + {}", self.pulses, roll.die1, roll.die2);
        true
    }

    /// Make the next running update pulse immediately
    pub fn force_pulse(&mut self) {
        self.timer = 0.0;
    }

    fn count_down<R: Rng>(&mut self, dt: f64, rng: &mut R, sink: &mut dyn EventSink) {
        self.timer -= dt;
        let seconds = self.timer.max(0.0).floor() as i32;
        if self.last_broadcast != Some(seconds) {
            self.last_broadcast = Some(seconds);
            sink.broadcast(ServerEvent::TimerEvent {
                seconds_remaining: seconds,
            });
        }
        if self.timer <= 0.0 {
            self.execute_pulse(rng, sink);
        }
    }

    fn resolve<R: Rng>(
        &mut self,
        board: &Board,
        collection: &mut CollectionEngine,
        rng: &mut R,
        now: f64,
        sink: &mut dyn EventSink,
    ) -> Option<PulseOutcome> {
        self.state = PulseState::Running;
        self.timer = self.interval;
        let roll = self.pending.take()?;

        if roll.total() == ROBBER_TOTAL {
            sink.broadcast(roll.event(PulsePhase::Robber, None));
            info!("Robber rolled, no production");
            return Some(PulseOutcome::Robber(roll));
        }

        let mut spawned = Vec::new();
        for tile in board.matching_tiles(roll.total()) {
            let Some(resource) = tile.resource() else {
                continue;
            };
            let angle = rng.gen_range(0.0..TAU);
            let distance = rng.gen_range(self.spawn_min..=self.spawn_max);
            let position = Vec3::new(
                tile.center.x + angle.cos() * distance,
                0.0,
                tile.center.z + angle.sin() * distance,
            );
            spawned.push(collection.spawn(resource, tile.coord, position, now, sink));
        }

        sink.broadcast(roll.event(PulsePhase::RollComplete, Some(spawned.len())));
        debug!(total = roll.total(), spawned = spawned.len(), "Pulse resolved");
        Some(PulseOutcome::Produced { roll, spawned })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NullSink, Outbound};
    use crate::hex::HexCoord;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Rig {
        config: GameConfig,
        board: Board,
        collection: CollectionEngine,
        rng: StdRng,
    }

    fn rig() -> Rig {
        let config = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let board = Board::generate(&config, &mut rng).unwrap();
        let collection = CollectionEngine::new(&config);
        Rig {
            config,
            board,
            collection,
            rng,
        }
    }

    fn timer_values(sink: &[Outbound]) -> Vec<i32> {
        sink.iter()
            .filter_map(|o| match o.event {
                ServerEvent::TimerEvent { seconds_remaining } => Some(seconds_remaining),
                _ => None,
            })
            .collect()
    }

    fn roll_starts(sink: &[Outbound]) -> usize {
        sink.iter()
            .filter(|o| {
                matches!(
                    o.event,
                    ServerEvent::PulseEvent {
                        phase: PulsePhase::RollStart,
                        ..
                    }
                )
            })
            .count()
    }

    #[test]
    fn test_one_minute_countdown() {
        let mut rig = rig();
        let mut pulse = PulseScheduler::new(&rig.config);
        let mut sink: Vec<Outbound> = Vec::new();
        for _ in 0..60 {
            pulse.update(1.0, true, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut sink);
        }
        let expected: Vec<i32> = (0..60).rev().collect();
        assert_eq!(timer_values(&sink), expected);
        assert_eq!(roll_starts(&sink), 1);
        assert_eq!(pulse.state(), PulseState::Rolling);
    }

    #[test]
    fn test_waiting_heartbeat() {
        let mut rig = rig();
        let mut pulse = PulseScheduler::new(&rig.config);
        let mut sink: Vec<Outbound> = Vec::new();
        for _ in 0..5 {
            pulse.update(0.5, false, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut sink);
        }
        assert_eq!(timer_values(&sink), vec![-1, -1]);
        assert_eq!(pulse.state(), PulseState::WaitingForPlayers);
    }

    #[test]
    fn test_never_returns_to_waiting() {
        let mut rig = rig();
        let mut pulse = PulseScheduler::new(&rig.config);
        pulse.update(1.0, true, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut NullSink);
        let mut sink: Vec<Outbound> = Vec::new();
        pulse.update(1.0, false, &rig.board, &mut rig.collection, &mut rig.rng, 1.0, &mut sink);
        assert_eq!(pulse.state(), PulseState::Running);
        assert_eq!(timer_values(&sink), vec![58]);
    }

    #[test]
    fn test_roll_window_pauses_countdown() {
        let mut rig = rig();
        let mut pulse = PulseScheduler::new(&rig.config);
        pulse.update(1.0, true, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut NullSink);
        pulse.force_pulse();
        pulse.update(0.1, true, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut NullSink);
        assert_eq!(pulse.state(), PulseState::Rolling);

        let mut sink: Vec<Outbound> = Vec::new();
        let outcome = pulse.update(2.0, true, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut sink);
        assert!(outcome.is_none());
        assert!(timer_values(&sink).is_empty());

        let outcome = pulse.update(1.0, true, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut sink);
        assert!(outcome.is_some());
        assert_eq!(pulse.state(), PulseState::Running);
        assert_eq!(pulse.time_remaining(), 60.0);
    }

    #[test]
    fn test_reentry_ignored() {
        let mut rig = rig();
        let mut pulse = PulseScheduler::new(&rig.config);
        assert!(pulse.execute_pulse(&mut rig.rng, &mut NullSink).is_some());
        assert!(pulse.execute_pulse(&mut rig.rng, &mut NullSink).is_none());
        assert!(!pulse.begin_roll(Roll::new(3, 3), &mut NullSink));
        assert_eq!(pulse.pulses(), 1);
    }

    #[test]
    fn test_robber_spawns_nothing() {
        let mut rig = rig();
        let mut pulse = PulseScheduler::new(&rig.config);
        pulse.begin_roll(Roll::new(3, 4), &mut NullSink);
        let mut sink: Vec<Outbound> = Vec::new();
        let outcome = pulse.update(3.0, true, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut sink);
        assert_eq!(outcome, Some(PulseOutcome::Robber(Roll::new(3, 4))));
        assert!(rig.collection.is_empty());
        assert_eq!(
            sink.last().unwrap().event,
            ServerEvent::PulseEvent {
                phase: PulsePhase::Robber,
                die1: 3,
                die2: 4,
                total: 7,
                matching_tiles: None,
            }
        );
    }

    #[test]
    fn test_one_spawn_per_matching_tile() {
        let mut rig = rig();
        let mut pulse = PulseScheduler::new(&rig.config);
        pulse.begin_roll(Roll::new(4, 4), &mut NullSink);
        let mut sink: Vec<Outbound> = Vec::new();
        let outcome = pulse
            .update(3.0, true, &rig.board, &mut rig.collection, &mut rig.rng, 4.0, &mut sink)
            .unwrap();

        let matching = rig.board.matching_tiles(8);
        assert_eq!(matching.len(), 2);
        let PulseOutcome::Produced { spawned, .. } = outcome else {
            panic!("expected production");
        };
        assert_eq!(spawned.len(), 2);

        for (tile, id) in matching.iter().zip(&spawned) {
            let item = rig.collection.get(*id).unwrap();
            assert_eq!(item.tile, tile.coord);
            assert_eq!(Some(item.resource), tile.resource());
            assert_eq!(item.spawned_at, 4.0);
            let d = item.position.distance_to(&tile.center);
            assert!((5.0..=20.0 + 1e-9).contains(&d), "distance {}", d);
            // Spawns stay on their own tile
            assert_eq!(HexCoord::from_world(item.position, 40.0), tile.coord);
        }

        assert!(matches!(
            sink.last().unwrap().event,
            ServerEvent::PulseEvent {
                phase: PulsePhase::RollComplete,
                total: 8,
                matching_tiles: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn test_force_pulse() {
        let mut rig = rig();
        let mut pulse = PulseScheduler::new(&rig.config);
        pulse.update(1.0, true, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut NullSink);
        pulse.force_pulse();
        let mut sink: Vec<Outbound> = Vec::new();
        pulse.update(0.0, true, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut sink);
        assert_eq!(roll_starts(&sink), 1);
        assert_eq!(timer_values(&sink), vec![0]);
    }

    #[test]
    fn test_force_pulse_before_start_waits_for_players() {
        let mut rig = rig();
        let mut pulse = PulseScheduler::new(&rig.config);
        pulse.force_pulse();
        let mut sink: Vec<Outbound> = Vec::new();
        pulse.update(1.0, false, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut sink);
        assert_eq!(roll_starts(&sink), 0);

        pulse.update(0.1, true, &rig.board, &mut rig.collection, &mut rig.rng, 0.0, &mut sink);
        assert_eq!(roll_starts(&sink), 1);
    }
}
