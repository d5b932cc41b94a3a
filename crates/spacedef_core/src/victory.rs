//! Win/loss evaluation.
//!
//! Evaluated once per tick after every other phase. Loss is checked first,
//! so a tick that satisfies both ends in defeat. The first terminal outcome
//! is kept forever.

use serde::{Deserialize, Serialize};

/// How a level can be won. Any satisfied condition wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WinCondition {
    /// Survive past this many whole seconds.
    #[serde(default)]
    pub win_time: Option<u32>,
    /// Destroy every enemy after the last wave spawned.
    #[serde(default)]
    pub kill_all: bool,
    /// Mine every mineral field dry.
    #[serde(default)]
    pub consume_resources: bool,
}

/// Why a level was won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinReason {
    /// The survival timer ran out.
    Survived,
    /// Every wave spawned and died.
    EnemiesDestroyed,
    /// Every mineral field is empty.
    ResourcesConsumed,
}

/// Terminal outcome of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOutcome {
    /// The player won.
    Victory(WinReason),
    /// The player has no ships or buildings left.
    Defeat,
}

impl GameOutcome {
    /// Whether this outcome is a win.
    #[must_use]
    pub const fn is_victory(self) -> bool {
        matches!(self, Self::Victory(_))
    }
}

/// Level state machine: `Running -> Over(outcome)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameState {
    /// Still playing.
    #[default]
    Running,
    /// Finished; never changes again.
    Over(GameOutcome),
}

/// World facts the evaluator needs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VictorySnapshot {
    /// Simulated seconds since level start.
    pub elapsed: f32,
    /// Live player miners, fighters, destroyers and carriers.
    pub player_fleet: usize,
    /// Live buildings of every kind.
    pub buildings: usize,
    /// Live enemy ships.
    pub enemies: usize,
    /// Whether every wave has been released.
    pub waves_exhausted: bool,
    /// Whether every mineral field is empty.
    pub resources_consumed: bool,
}

/// Sticky win/loss evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VictoryEvaluator {
    condition: WinCondition,
    state: GameState,
}

impl VictoryEvaluator {
    /// Create an evaluator for `condition`.
    #[must_use]
    pub const fn new(condition: WinCondition) -> Self {
        Self {
            condition,
            state: GameState::Running,
        }
    }

    /// The win condition.
    #[must_use]
    pub const fn condition(&self) -> WinCondition {
        self.condition
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> GameState {
        self.state
    }

    /// Whether the level has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        matches!(self.state, GameState::Over(_))
    }

    /// Evaluate one tick. Returns the outcome on the tick the level ends.
    pub fn evaluate(&mut self, snapshot: &VictorySnapshot) -> Option<GameOutcome> {
        if self.is_over() {
            return None;
        }

        let outcome = if snapshot.player_fleet == 0 && snapshot.buildings == 0 {
            Some(GameOutcome::Defeat)
        } else {
            self.win_reason(snapshot).map(GameOutcome::Victory)
        }?;

        self.state = GameState::Over(outcome);
        Some(outcome)
    }

    fn win_reason(&self, snapshot: &VictorySnapshot) -> Option<WinReason> {
        if let Some(win_time) = self.condition.win_time {
            if snapshot.elapsed.floor() > win_time as f32 {
                return Some(WinReason::Survived);
            }
        }
        if self.condition.kill_all && snapshot.waves_exhausted && snapshot.enemies == 0 {
            return Some(WinReason::EnemiesDestroyed);
        }
        if self.condition.consume_resources && snapshot.resources_consumed {
            return Some(WinReason::ResourcesConsumed);
        }
        None
    }
}
