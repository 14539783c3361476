//! Host capability interface and the plain-data views it hands out.
//!
//! The simulation owns the world. Each tick the controller reads owned
//! entities through [`Host`], and issues at most one action of each kind per
//! ship through the same trait. Every action reports success as a `bool`;
//! rejected actions are never fatal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::COMPLETE_PROGRESS;

pub type ShipId = u64;
pub type StructureId = u64;
pub type GalaxyId = u64;

/// Resource type → quantity.
pub type ResourceMap = BTreeMap<String, u32>;

/// Grid position inside a galaxy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance (diagonal steps count as one).
    pub fn range_to(&self, other: &Position) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }
}

/// An owned, mobile ship as seen this tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub id: ShipId,
    pub name: String,
    pub galaxy_id: GalaxyId,
    pub pos: Position,
    pub storage: ResourceMap,
    pub storage_capacity: u32,
    /// Installed components, e.g. `mining_laser`
    pub components: Vec<String>,
}

impl Ship {
    /// Held quantity of one resource (0 when absent).
    pub fn amount_of(&self, resource: &str) -> u32 {
        self.storage.get(resource).copied().unwrap_or(0)
    }

    pub fn storage_used(&self) -> u32 {
        self.storage.values().fold(0u32, |a, &b| a.saturating_add(b))
    }

    pub fn storage_available(&self) -> u32 {
        self.storage_capacity.saturating_sub(self.storage_used())
    }

    pub fn has_component(&self, component: &str) -> bool {
        self.components.iter().any(|c| c == component)
    }
}

/// An owned, stationary structure (complete or under construction)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    pub name: String,
    pub structure_type: String,
    pub galaxy_id: GalaxyId,
    pub planet_name: String,
    pub pos: Position,
    /// 0-100; below 100 the structure is a construction site
    pub progress: u32,
    pub storage: ResourceMap,
    pub storage_capacity: u32,
    /// Still-missing construction resources (sites only)
    pub remaining_resources: Option<ResourceMap>,
}

impl Structure {
    pub fn is_construction_site(&self) -> bool {
        self.progress < COMPLETE_PROGRESS
    }

    pub fn storage_used(&self) -> u32 {
        self.storage.values().fold(0u32, |a, &b| a.saturating_add(b))
    }

    pub fn storage_available(&self) -> u32 {
        self.storage_capacity.saturating_sub(self.storage_used())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    pub galaxy_id: GalaxyId,
    pub pos: Position,
    pub resources: ResourceMap,
    /// Owned structures on this planet
    pub structures: Vec<Structure>,
}

impl Planet {
    /// True if the planet exposes a positive quantity of `resource`.
    pub fn has_resource(&self, resource: &str) -> bool {
        self.resources.get(resource).is_some_and(|&q| q > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Galaxy {
    pub id: GalaxyId,
    pub name: String,
    pub planets: Vec<Planet>,
}

impl Galaxy {
    pub fn planet(&self, name: &str) -> Option<&Planet> {
        self.planets.iter().find(|p| p.name == name)
    }

    pub fn planets_with_resource<'a>(
        &'a self,
        resource: &'a str,
    ) -> impl Iterator<Item = &'a Planet> + 'a {
        self.planets.iter().filter(move |p| p.has_resource(resource))
    }
}

/// Standard cost of a structure type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildCost {
    pub energy: u32,
    pub resources: ResourceMap,
}

/// Everything the controller needs from the simulation.
///
/// Queries return owned snapshots; actions take ids and return whether the
/// host accepted them.
pub trait Host {
    /// Current simulation tick
    fn time(&self) -> u64;

    fn my_ships(&self) -> Vec<Ship>;

    fn my_structures(&self) -> Vec<Structure>;

    /// Resolve a galaxy with its planets, `None` if unknown to the host.
    fn galaxy(&self, galaxy_id: GalaxyId) -> Option<Galaxy>;

    fn structure_cost(&self, structure_type: &str) -> BuildCost;

    /// Move toward a position (distance per tick is up to the host).
    fn move_to(&mut self, ship: ShipId, target: Position) -> bool;

    /// Harvest from a planet; `None` harvests the first available resource.
    fn harvest(&mut self, ship: ShipId, planet_name: &str, resource: Option<&str>) -> bool;

    /// Place a construction site on a planet.
    fn build(&mut self, ship: ShipId, planet_name: &str, structure_type: &str) -> bool;

    /// Hand cargo to a construction site; `None` supplies everything needed.
    fn supply_construction(
        &mut self,
        ship: ShipId,
        site: StructureId,
        resources: Option<&ResourceMap>,
    ) -> bool;

    /// Move cargo from a ship into a structure's storage.
    fn transfer(&mut self, ship: ShipId, target: StructureId, resource: &str, amount: u32) -> bool;
}
