//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the world produces identical
//! results given the same level, seed, frame times and actions.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism this harness is meant to catch:
//!
//! - **Unseeded randomness**: every random draw must come from the world's
//!   seeded `ChaCha8Rng`.
//! - **HashMap iteration order**: registries iterate in id order; anything
//!   keyed by id uses `BTreeMap`.
//! - **Order-dependent updates**: ships read a start-of-phase snapshot, so
//!   results must not depend on who moves first beyond id order.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: per-module checks inside `spacedef_core`
//! 2. **Property tests**: random levels must still replay identically
//! 3. **Integration tests**: full level runs are reproducible
//! 4. **Parallel tests**: N worlds on N threads all match

use std::thread;

use spacedef_core::world::WorldContext;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>, ticks: u64) -> Self {
        Self {
            is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
            hashes,
            ticks,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic world).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the world was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "World is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run any state machine several times and compare final hashes.
///
/// # Example
///
/// ```ignore
/// use spacedef_test_utils::determinism::verify_determinism;
/// use spacedef_test_utils::fixtures::{siege_world, FRAME_DT};
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     600, // 600 ticks each
///     || siege_world(7),
///     |world| { world.tick(FRAME_DT); },
///     |world| world.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..ticks {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    DeterminismResult::from_hashes(hashes, ticks)
}

/// Run a world twice at a fixed `dt` and check the final hashes match.
pub fn verify_world_determinism<F>(setup_fn: F, num_ticks: u64, dt: f32) -> bool
where
    F: Fn() -> WorldContext,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |world| {
            world.tick(dt);
        },
        WorldContext::state_hash,
    )
    .is_deterministic
}

/// Run `num_worlds` worlds on scoped threads and collect the final hashes.
///
/// Catches state that leaks between worlds or depends on scheduling.
pub fn run_parallel_worlds<F>(setup_fn: F, num_worlds: usize, num_ticks: u64, dt: f32) -> DeterminismResult
where
    F: Fn() -> WorldContext + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_worlds)
            .map(|_| {
                s.spawn(|| {
                    let mut world = setup_fn();
                    for _ in 0..num_ticks {
                        world.tick(dt);
                    }
                    world.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    DeterminismResult::from_hashes(hashes, num_ticks)
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(tick)` for the first tick whose state
/// differs (0 means the initial states already differ).
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, dt: f32) -> Option<u64>
where
    F: Fn() -> WorldContext,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.tick(dt);
        b.tick(dt);

        if a.state_hash() != b.state_hash() {
            tracing::warn!(tick, "Worlds diverged");
            return Some(tick);
        }
    }

    None
}

/// Check that splitting time into smaller frames releases the same waves.
///
/// Runs `setup_fn` once with `coarse_dt` and once with `coarse_dt / split`
/// for the same total time and compares the wave order.
pub fn verify_wave_order_independent_of_dt<F>(setup_fn: F, total_time: f32, coarse_dt: f32, split: u32) -> bool
where
    F: Fn() -> WorldContext,
{
    let waves_with = |dt: f32| {
        let mut world = setup_fn();
        let ticks = (total_time / dt).ceil() as u64;
        let mut released = Vec::new();
        for _ in 0..ticks {
            released.extend(world.tick(dt).waves.into_iter().map(|w| (w.wave, w.ships)));
        }
        released
    };

    waves_with(coarse_dt) == waves_with(coarse_dt / split.max(1) as f32)
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible levels and actions.
pub mod strategies {
    use proptest::prelude::*;
    use spacedef_core::buildings::{BuildingId, STOCK_BLUEPRINTS};
    use spacedef_core::level::{LevelDescriptor, ResourceNode, StartingBuilding};
    use spacedef_core::math::Vec2;
    use spacedef_core::spawner::SpawnGroup;
    use spacedef_core::world::{GameSpeed, PlayerAction};

    /// A position inside a 1000 half-width arena.
    pub fn arb_position() -> impl Strategy<Value = Vec2> {
        (-900.0f32..900.0, -900.0f32..900.0).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// A spawn group in the first minute with up to 4 ships per tier.
    pub fn arb_spawn_group() -> impl Strategy<Value = SpawnGroup> {
        (0.0f32..60.0, arb_position(), [0u32..4, 0u32..3, 0u32..2])
            .prop_map(|(time, position, counts)| SpawnGroup::new(time, position, counts))
    }

    /// A mineral field.
    pub fn arb_resource() -> impl Strategy<Value = ResourceNode> {
        (arb_position(), 20.0f32..120.0, 0i32..1000).prop_map(|(position, radius, minerals)| {
            ResourceNode {
                position,
                radius,
                minerals,
            }
        })
    }

    /// A stock blueprint name.
    pub fn arb_blueprint() -> impl Strategy<Value = String> {
        prop::sample::select(STOCK_BLUEPRINTS.to_vec()).prop_map(str::to_string)
    }

    /// A level with a command center at the origin plus random content.
    pub fn arb_level() -> impl Strategy<Value = LevelDescriptor> {
        (
            prop::collection::vec(arb_spawn_group(), 0..4),
            prop::collection::vec(arb_resource(), 0..4),
            prop::collection::vec((arb_blueprint(), arb_position()), 0..5),
        )
            .prop_map(|(spawn_groups, resources, extra)| {
                let mut starting_buildings = vec![StartingBuilding {
                    blueprint: "CommandCenter".to_string(),
                    position: Vec2::ZERO,
                    complete: true,
                }];
                starting_buildings.extend(extra.into_iter().map(|(blueprint, position)| {
                    StartingBuilding {
                        blueprint,
                        position,
                        complete: true,
                    }
                }));
                LevelDescriptor {
                    name: "Generated".to_string(),
                    spawn_groups,
                    resources,
                    starting_buildings,
                    ..LevelDescriptor::default()
                }
            })
    }

    /// A player action against buildings with ids below 8.
    pub fn arb_action() -> impl Strategy<Value = PlayerAction> {
        let id = (1u32..8).prop_map(BuildingId);
        prop_oneof![
            (arb_blueprint(), arb_position())
                .prop_map(|(blueprint, position)| PlayerAction::PlaceBuilding { blueprint, position }),
            id.clone().prop_map(PlayerAction::Sell),
            id.clone().prop_map(PlayerAction::CancelConstruction),
            id.clone().prop_map(PlayerAction::Upgrade),
            id.prop_map(PlayerAction::QueueShip),
            prop::sample::select(vec![GameSpeed::Normal, GameSpeed::Fast, GameSpeed::Faster])
                .prop_map(PlayerAction::SetSpeed),
        ]
    }
}
