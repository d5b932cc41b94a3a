//! Power distribution network.
//!
//! Buildings form a directed graph through their `neighbors` lists: a power
//! node (or command center) feeds every building in its list, in link
//! order. Command centers are the only sources. Each tick the grid is
//! recomputed from scratch:
//!
//! 1. every building except the sources is marked unpowered;
//! 2. each finished command center, in id order, pushes its full energy
//!    depth-first through its links.
//!
//! A pass visits each building at most once, so cycles in the graph are
//! harmless. A consumer that was already powered by an earlier source is not
//! charged again.

use std::collections::BTreeSet;

use crate::buildings::{Building, BuildingId, BuildingKind};
use crate::registry::Registry;

/// Maximum number of links created for a power node placement.
pub const MAX_LINK_CANDIDATES: usize = 4;

/// Whether `feeder` may feed `fed`.
///
/// The distance between them must lie inside both buildings' link bounds
/// and `feeder` must be a power node with a free slot.
#[must_use]
pub fn can_connect(feeder: &Building, fed: &Building) -> bool {
    let distance = feeder.position.distance(fed.position);
    feeder.has_open_connections()
        && feeder.accepts_link_distance(distance)
        && fed.accepts_link_distance(distance)
}

/// Buildings that a building placed as `placed` would link to, nearest first.
///
/// Existing power nodes with a free slot are always eligible. A power node
/// placement also links to consumers in range, and is capped at
/// [`MAX_LINK_CANDIDATES`] links.
#[must_use]
pub fn link_candidates(buildings: &Registry<Building>, placed: &Building) -> Vec<BuildingId> {
    let mut candidates: Vec<(f32, BuildingId)> = buildings
        .iter()
        .filter(|other| other.id != placed.id && !other.is_dead())
        .filter(|other| {
            if other.is_power_node() {
                can_connect(other, placed)
            } else {
                placed.is_power_node() && can_connect(placed, other)
            }
        })
        .map(|other| (other.position.distance(placed.position), other.id))
        .collect();

    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    if placed.is_power_node() {
        candidates.truncate(MAX_LINK_CANDIDATES);
    }
    candidates.into_iter().map(|(_, id)| id).collect()
}

/// Link a freshly inserted building into the grid.
///
/// A new power node feeds its consumer candidates; otherwise the candidate
/// feeds the new building. Returns the `(feeder, fed)` links created.
pub fn connect(buildings: &mut Registry<Building>, id: BuildingId) -> Vec<(BuildingId, BuildingId)> {
    let Some(placed) = buildings.get(id.0) else {
        return Vec::new();
    };
    let placed_is_node = placed.is_power_node();
    let candidates = link_candidates(buildings, placed);

    let mut links = Vec::new();
    for candidate in candidates {
        let candidate_is_node = buildings
            .get(candidate.0)
            .is_some_and(Building::is_power_node);

        let (feeder, fed) = if placed_is_node && !candidate_is_node {
            (id, candidate)
        } else {
            (candidate, id)
        };

        if buildings
            .get_mut(feeder.0)
            .is_some_and(|building| building.add_neighbor(fed))
        {
            links.push((feeder, fed));
        }
    }

    tracing::trace!(building = id.0, links = links.len(), "Connected building to grid");
    links
}

/// Remove every link touching `id`.
pub fn disconnect(buildings: &mut Registry<Building>, id: BuildingId) {
    for building in buildings.iter_mut() {
        if building.id == id {
            building.neighbors.clear();
        } else {
            building.neighbors.retain(|&n| n != id);
        }
    }
}

/// Recompute powered flags for the whole grid. Returns the number of powered buildings.
pub fn distribute(buildings: &mut Registry<Building>) -> usize {
    let mut sources = Vec::new();
    for building in buildings.iter_mut() {
        if building.is_command_center() {
            if building.is_constructing() {
                building.powered = false;
            } else {
                sources.push(building.id);
            }
        } else {
            building.powered = false;
        }
    }

    for source in sources {
        let Some(BuildingKind::CommandCenter { max_energy, .. }) =
            buildings.get(source.0).map(|b| &b.kind)
        else {
            continue;
        };
        let energy = *max_energy;

        let mut visited = BTreeSet::from([source]);
        let remaining = distribute_energy(buildings, source, energy, &mut visited);

        if let Some(BuildingKind::CommandCenter {
            remaining_energy, ..
        }) = buildings.get_mut(source.0).map(|b| &mut b.kind)
        {
            *remaining_energy = remaining;
        }
    }

    buildings.iter().filter(|b| b.powered).count()
}

/// Push `energy` from node `id` through its links. Returns what is left.
fn distribute_energy(
    buildings: &mut Registry<Building>,
    id: BuildingId,
    mut energy: f32,
    visited: &mut BTreeSet<BuildingId>,
) -> f32 {
    let Some(node) = buildings.get_mut(id.0) else {
        return energy;
    };
    if energy <= 0.0 {
        node.powered = false;
        return energy;
    }
    node.powered = true;

    let neighbors = node.neighbors.clone();
    for neighbor in neighbors {
        if !visited.insert(neighbor) {
            continue;
        }
        let Some(building) = buildings.get_mut(neighbor.0) else {
            continue;
        };
        if building.is_dead() {
            continue;
        }

        if building.is_power_node() {
            energy = distribute_energy(buildings, neighbor, energy, visited);
        } else if !building.powered {
            energy = building.consume_energy(energy);
        }
    }
    energy
}
