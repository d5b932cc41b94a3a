//! Enemy wave scheduling.
//!
//! A level declares its waves as [`SpawnGroup`]s. The [`WaveScheduler`]
//! sorts them by spawn time once and releases at most one group per tick,
//! so a burst of overdue waves is spread over consecutive ticks in the same
//! order whatever the tick length.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Jitter applied to each spawned enemy (± units per axis).
pub const SPAWN_JITTER: f32 = 100.0;

/// One wave of enemies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnGroup {
    /// Seconds after level start.
    pub spawn_time: f32,
    /// Center of the spawn area.
    pub position: Vec2,
    /// Number of enemies of tier 0, 1 and 2.
    pub counts: [u32; 3],
}

impl SpawnGroup {
    /// Create a spawn group.
    #[must_use]
    pub const fn new(spawn_time: f32, position: Vec2, counts: [u32; 3]) -> Self {
        Self {
            spawn_time,
            position,
            counts,
        }
    }

    /// Total number of ships in the group.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Time-ordered queue of pending waves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveScheduler {
    pending: VecDeque<SpawnGroup>,
    released: u32,
}

impl WaveScheduler {
    /// Build a scheduler; groups are stably sorted by spawn time.
    #[must_use]
    pub fn new(mut groups: Vec<SpawnGroup>) -> Self {
        groups.sort_by(|a, b| a.spawn_time.total_cmp(&b.spawn_time));
        Self {
            pending: groups.into(),
            released: 0,
        }
    }

    /// Release the next group if `elapsed` is strictly past its spawn time.
    pub fn poll(&mut self, elapsed: f32) -> Option<SpawnGroup> {
        if elapsed > self.pending.front()?.spawn_time {
            self.released += 1;
            self.pending.pop_front()
        } else {
            None
        }
    }

    /// Spawn time of the next group, or `-1.0` once every group was released.
    #[must_use]
    pub fn next_spawn_time(&self) -> f32 {
        self.pending.front().map_or(-1.0, |g| g.spawn_time)
    }

    /// Seconds until the next group, or `None` once every group was released.
    #[must_use]
    pub fn time_until_next_wave(&self, elapsed: f32) -> Option<f32> {
        self.pending
            .front()
            .map(|g| (g.spawn_time - elapsed).max(0.0))
    }

    /// Size of the next group (0 once empty).
    #[must_use]
    pub fn next_wave_size(&self) -> u32 {
        self.pending.front().map_or(0, SpawnGroup::size)
    }

    /// Groups still pending.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Groups released so far.
    #[must_use]
    pub const fn released(&self) -> u32 {
        self.released
    }

    /// Whether every group was released.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> WaveScheduler {
        WaveScheduler::new(vec![
            SpawnGroup::new(20.0, Vec2::new(2.0, 0.0), [1, 0, 0]),
            SpawnGroup::new(5.0, Vec2::new(1.0, 0.0), [2, 1, 0]),
            SpawnGroup::new(20.0, Vec2::new(3.0, 0.0), [0, 0, 1]),
        ])
    }

    #[test]
    fn test_groups_are_sorted_stably() {
        let mut waves = scheduler();
        assert_eq!(waves.next_spawn_time(), 5.0);
        assert_eq!(waves.next_wave_size(), 3);

        let order: Vec<f32> = std::iter::from_fn(|| waves.poll(100.0))
            .map(|g| g.position.x)
            .collect();
        assert_eq!(order, vec![1.0, 2.0, 3.0]);
        assert_eq!(waves.next_spawn_time(), -1.0);
        assert_eq!(waves.released(), 3);
    }

    #[test]
    fn test_poll_requires_strictly_later_time() {
        let mut waves = scheduler();
        assert!(waves.poll(5.0).is_none());
        assert!(waves.poll(5.01).is_some());
    }

    #[test]
    fn test_one_group_per_poll() {
        let mut waves = scheduler();
        assert!(waves.poll(25.0).is_some());
        assert_eq!(waves.remaining(), 2);
    }

    #[test]
    fn test_release_order_independent_of_step() {
        for dt in [0.016_f32, 0.1, 0.5, 3.0] {
            let mut waves = scheduler();
            let mut elapsed = 0.0;
            let mut order = Vec::new();
            while !waves.is_empty() {
                elapsed += dt;
                if let Some(group) = waves.poll(elapsed) {
                    order.push(group.position.x);
                }
            }
            assert_eq!(order, vec![1.0, 2.0, 3.0], "dt = {dt}");
        }
    }

    #[test]
    fn test_time_until_next_wave() {
        let waves = scheduler();
        assert_eq!(waves.time_until_next_wave(2.0), Some(3.0));
        assert_eq!(waves.time_until_next_wave(8.0), Some(0.0));
        assert_eq!(WaveScheduler::default().time_until_next_wave(0.0), None);
    }
}
