//! Contracts for the rendering and audio collaborators.
//!
//! The core never draws or plays anything itself. A frontend implements
//! [`Renderer`] and [`Audio`], and calls [`PresentationSync::sync`] after
//! every [`crate::world::WorldContext::tick`] to mirror the world into
//! visuals and sounds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingId};
use crate::factions::Faction;
use crate::math::Vec2;
use crate::projectiles::Projectile;
use crate::scenery::{Scenery, SceneryId, SceneryKind};
use crate::ships::{Ship, ShipId, ShipKind};
use crate::weapons::WeaponKind;
use crate::world::{TickEvents, WorldContext};

/// Seconds an explosion visual stays up: seven animation frames of 0.06 s.
pub const EXPLOSION_LIFETIME: f32 = 7.0 * 0.06;

/// Background music mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AmbientMode {
    /// No enemies around.
    #[default]
    Calm,
    /// A wave is in progress.
    Combat,
}

/// RGBA color, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    /// Create a color.
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// What a visual depicts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VisualKind {
    /// A ship sprite.
    Ship(ShipKind),
    /// A building sprite for a blueprint.
    Building(String),
    /// A mineral field.
    Mineral,
    /// Junk.
    Junk,
    /// A hull debris chunk.
    HullChunk(u32),
    /// A projectile in flight.
    Projectile(WeaponKind),
    /// A short-lived explosion.
    Explosion,
}

/// Opaque handle to a renderer visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisualHandle(pub u64);

/// Sound effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioClip {
    /// A weapon firing.
    Weapon(WeaponKind),
    /// A ship or building blowing up.
    Explosion,
    /// A building finished construction.
    ConstructionComplete,
}

/// Draws entities.
pub trait Renderer {
    /// Create a visual and return its handle.
    fn create_visual(&mut self, kind: VisualKind) -> VisualHandle;
    /// Move a visual.
    fn set_position(&mut self, handle: VisualHandle, position: Vec2);
    /// Rotate a visual (radians).
    fn set_rotation(&mut self, handle: VisualHandle, rotation: f32);
    /// Tint a visual.
    fn set_color(&mut self, handle: VisualHandle, color: Color);
    /// Destroy a visual.
    fn destroy(&mut self, handle: VisualHandle);
}

/// Plays sounds.
pub trait Audio {
    /// Play a one-shot effect at a world position.
    fn play_one_shot(&mut self, position: Vec2, clip: AudioClip);
    /// Switch the background music.
    fn set_ambient_mode(&mut self, mode: AmbientMode);
}

/// Tint for a ship: faction color, dimmed as the hull is damaged.
#[must_use]
pub fn ship_color(ship: &Ship) -> Color {
    let tiers = ship.hull_tiers.max(1) as f32;
    let shade = 1.0 - 0.5 * ship.damage_tier() as f32 / tiers;
    match ship.faction {
        Faction::Player => Color::rgba(shade, shade, 1.0, 1.0),
        Faction::Enemy => Color::rgba(1.0, shade * 0.6, shade * 0.6, 1.0),
    }
}

/// Tint for a building: translucent while constructing, grey when unpowered.
#[must_use]
pub fn building_color(building: &Building) -> Color {
    if building.is_constructing() {
        Color::rgba(1.0, 1.0, 1.0, 0.5)
    } else if building.powered || building.is_command_center() {
        Color::WHITE
    } else {
        Color::rgba(0.5, 0.5, 0.5, 1.0)
    }
}

fn scenery_visual(item: &Scenery) -> VisualKind {
    match item.kind {
        SceneryKind::Mineral { .. } => VisualKind::Mineral,
        SceneryKind::Junk => VisualKind::Junk,
        SceneryKind::Hull { chunk, .. } => VisualKind::HullChunk(chunk),
    }
}

/// Keeps renderer visuals in step with the world.
///
/// Ships, buildings, scenery and projectiles are mirrored one visual per
/// entity. Explosions are fire-and-forget: each impact and death position
/// gets a visual that is destroyed [`EXPLOSION_LIFETIME`] simulated seconds
/// later.
#[derive(Debug, Default)]
pub struct PresentationSync {
    ships: BTreeMap<ShipId, VisualHandle>,
    buildings: BTreeMap<BuildingId, VisualHandle>,
    scenery: BTreeMap<SceneryId, VisualHandle>,
    projectiles: BTreeMap<u64, VisualHandle>,
    /// Explosion visuals with the world time they expire at.
    explosions: Vec<(VisualHandle, f32)>,
}

impl PresentationSync {
    /// Create an empty sync.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live visuals.
    #[must_use]
    pub fn visual_count(&self) -> usize {
        self.ships.len()
            + self.buildings.len()
            + self.scenery.len()
            + self.projectiles.len()
            + self.explosions.len()
    }

    /// Number of explosion visuals still up.
    #[must_use]
    pub fn explosion_count(&self) -> usize {
        self.explosions.len()
    }

    /// Mirror the world after a tick and play the tick's sounds.
    pub fn sync(
        &mut self,
        world: &WorldContext,
        events: &TickEvents,
        renderer: &mut dyn Renderer,
        audio: &mut dyn Audio,
    ) {
        sync_map(
            &mut self.ships,
            renderer,
            world.ships().iter().filter(|s| !s.is_dead()),
            |ship| VisualKind::Ship(ship.kind),
            |ship| (ship.id, ship.position, ship.heading, ship_color(ship)),
        );
        sync_map(
            &mut self.buildings,
            renderer,
            world.buildings().iter().filter(|b| !b.is_dead()),
            |b| VisualKind::Building(b.blueprint.clone()),
            |b| (b.id, b.position, 0.0, building_color(b)),
        );
        sync_map(
            &mut self.scenery,
            renderer,
            world.scenery().iter(),
            scenery_visual,
            |s| (s.id, s.position, s.rotation, Color::WHITE),
        );
        sync_map(
            &mut self.projectiles,
            renderer,
            world.projectiles().iter(),
            |p: &Projectile| VisualKind::Projectile(p.kind),
            |p| (p.id, p.position, p.velocity.angle(), Color::WHITE),
        );
        self.sync_explosions(world.elapsed(), events, renderer);

        for shot in &events.shots {
            audio.play_one_shot(shot.position, AudioClip::Weapon(shot.kind));
        }
        for death in &events.ship_deaths {
            audio.play_one_shot(death.position, AudioClip::Explosion);
        }
        for death in &events.building_deaths {
            audio.play_one_shot(death.position, AudioClip::Explosion);
        }
        for &id in &events.constructions_completed {
            if let Some(building) = world.building(id) {
                audio.play_one_shot(building.position, AudioClip::ConstructionComplete);
            }
        }
        if let Some(mode) = events.ambient_changed {
            audio.set_ambient_mode(mode);
        }
    }

    /// Expire old explosion visuals and add one per impact and death position.
    fn sync_explosions(&mut self, now: f32, events: &TickEvents, renderer: &mut dyn Renderer) {
        self.explosions.retain(|&(handle, expires)| {
            let alive = now < expires;
            if !alive {
                renderer.destroy(handle);
            }
            alive
        });

        let positions = events
            .hits
            .iter()
            .map(|hit| hit.position)
            .chain(events.explosions.iter().copied());
        for position in positions {
            let handle = renderer.create_visual(VisualKind::Explosion);
            renderer.set_position(handle, position);
            self.explosions.push((handle, now + EXPLOSION_LIFETIME));
        }
    }

    /// Destroy every visual.
    pub fn clear(&mut self, renderer: &mut dyn Renderer) {
        let handles = self
            .ships
            .values()
            .chain(self.buildings.values())
            .chain(self.scenery.values())
            .chain(self.projectiles.values())
            .chain(self.explosions.iter().map(|(handle, _)| handle));
        for &handle in handles {
            renderer.destroy(handle);
        }
        self.ships.clear();
        self.buildings.clear();
        self.scenery.clear();
        self.projectiles.clear();
        self.explosions.clear();
    }
}

/// Mirror `live` into `handles`. `kind` is only consulted for new visuals.
fn sync_map<'a, K: Ord + Copy, T: 'a>(
    handles: &mut BTreeMap<K, VisualHandle>,
    renderer: &mut dyn Renderer,
    live: impl Iterator<Item = &'a T>,
    kind: impl Fn(&T) -> VisualKind,
    describe: impl Fn(&T) -> (K, Vec2, f32, Color),
) {
    let mut seen = BTreeMap::new();
    for item in live {
        let (key, position, rotation, color) = describe(item);
        let handle = match handles.remove(&key) {
            Some(handle) => handle,
            None => renderer.create_visual(kind(item)),
        };
        renderer.set_position(handle, position);
        renderer.set_rotation(handle, rotation);
        renderer.set_color(handle, color);
        seen.insert(key, handle);
    }
    for (_, stale) in std::mem::replace(handles, seen) {
        renderer.destroy(stale);
    }
}
