//! Scripted host for tests and benchmarks.
//!
//! `ScriptedHost` serves a fixed world and records every action the
//! controller issues instead of simulating it. Action outcomes can be
//! scripted per action kind, so executors can be driven through their
//! failure paths without a real simulation.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{components, COMPLETE_PROGRESS};
use crate::host::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionKind {
    Move,
    Harvest,
    Build,
    Supply,
    Transfer,
}

/// An action issued through [`Host`], as recorded by [`ScriptedHost`]
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Move {
        ship: ShipId,
        target: Position,
    },
    Harvest {
        ship: ShipId,
        planet: String,
        resource: Option<String>,
    },
    Build {
        ship: ShipId,
        planet: String,
        structure_type: String,
    },
    Supply {
        ship: ShipId,
        site: StructureId,
        resources: Option<ResourceMap>,
    },
    Transfer {
        ship: ShipId,
        target: StructureId,
        resource: String,
        amount: u32,
    },
}

impl Action {
    pub fn ship(&self) -> ShipId {
        match self {
            Action::Move { ship, .. }
            | Action::Harvest { ship, .. }
            | Action::Build { ship, .. }
            | Action::Supply { ship, .. }
            | Action::Transfer { ship, .. } => *ship,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Move { .. } => ActionKind::Move,
            Action::Harvest { .. } => ActionKind::Harvest,
            Action::Build { .. } => ActionKind::Build,
            Action::Supply { .. } => ActionKind::Supply,
            Action::Transfer { .. } => ActionKind::Transfer,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedHost {
    time: u64,
    ships: BTreeMap<ShipId, Ship>,
    structures: BTreeMap<StructureId, Structure>,
    galaxies: BTreeMap<GalaxyId, Galaxy>,
    costs: BTreeMap<String, BuildCost>,
    rejected: BTreeSet<ActionKind>,
    /// Every action issued, in order
    pub actions: Vec<Action>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    pub fn with_galaxy(mut self, galaxy: Galaxy) -> Self {
        self.galaxies.insert(galaxy.id, galaxy);
        self
    }

    pub fn with_ship(mut self, ship: Ship) -> Self {
        self.ships.insert(ship.id, ship);
        self
    }

    pub fn with_structure(mut self, structure: Structure) -> Self {
        self.structures.insert(structure.id, structure);
        self
    }

    pub fn with_cost(mut self, structure_type: &str, resources: &[(&str, u32)]) -> Self {
        self.costs.insert(
            structure_type.to_string(),
            BuildCost {
                energy: 0,
                resources: resource_map(resources),
            },
        );
        self
    }

    /// Make every action of `kind` fail from now on.
    pub fn reject(&mut self, kind: ActionKind) {
        self.rejected.insert(kind);
    }

    pub fn accept(&mut self, kind: ActionKind) {
        self.rejected.remove(&kind);
    }

    pub fn set_time(&mut self, time: u64) {
        self.time = time;
    }

    pub fn advance(&mut self) {
        self.time += 1;
    }

    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.get_mut(&id)
    }

    pub fn structure_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structures.get_mut(&id)
    }

    pub fn add_structure(&mut self, structure: Structure) {
        self.structures.insert(structure.id, structure);
    }

    pub fn remove_ship(&mut self, id: ShipId) -> Option<Ship> {
        self.ships.remove(&id)
    }

    pub fn remove_structure(&mut self, id: StructureId) -> Option<Structure> {
        self.structures.remove(&id)
    }

    pub fn galaxy_mut(&mut self, id: GalaxyId) -> Option<&mut Galaxy> {
        self.galaxies.get_mut(&id)
    }

    pub fn actions_for(&self, ship: ShipId) -> Vec<&Action> {
        self.actions.iter().filter(|a| a.ship() == ship).collect()
    }

    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    fn record(&mut self, action: Action) -> bool {
        let accepted = !self.rejected.contains(&action.kind());
        self.actions.push(action);
        accepted
    }
}

impl Host for ScriptedHost {
    fn time(&self) -> u64 {
        self.time
    }

    fn my_ships(&self) -> Vec<Ship> {
        self.ships.values().cloned().collect()
    }

    fn my_structures(&self) -> Vec<Structure> {
        self.structures.values().cloned().collect()
    }

    fn galaxy(&self, galaxy_id: GalaxyId) -> Option<Galaxy> {
        let mut galaxy = self.galaxies.get(&galaxy_id)?.clone();
        // Planet structure lists always reflect the current structure set
        for planet in &mut galaxy.planets {
            planet.structures = self
                .structures
                .values()
                .filter(|s| s.galaxy_id == galaxy_id && s.planet_name == planet.name)
                .cloned()
                .collect();
        }
        Some(galaxy)
    }

    fn structure_cost(&self, structure_type: &str) -> BuildCost {
        self.costs.get(structure_type).cloned().unwrap_or_default()
    }

    fn move_to(&mut self, ship: ShipId, target: Position) -> bool {
        self.record(Action::Move { ship, target })
    }

    fn harvest(&mut self, ship: ShipId, planet_name: &str, resource: Option<&str>) -> bool {
        self.record(Action::Harvest {
            ship,
            planet: planet_name.to_string(),
            resource: resource.map(str::to_string),
        })
    }

    fn build(&mut self, ship: ShipId, planet_name: &str, structure_type: &str) -> bool {
        self.record(Action::Build {
            ship,
            planet: planet_name.to_string(),
            structure_type: structure_type.to_string(),
        })
    }

    fn supply_construction(
        &mut self,
        ship: ShipId,
        site: StructureId,
        resources: Option<&ResourceMap>,
    ) -> bool {
        self.record(Action::Supply {
            ship,
            site,
            resources: resources.cloned(),
        })
    }

    fn transfer(&mut self, ship: ShipId, target: StructureId, resource: &str, amount: u32) -> bool {
        self.record(Action::Transfer {
            ship,
            target,
            resource: resource.to_string(),
            amount,
        })
    }
}

// ── Fixture builders ────────────────────────────────────────────────────

pub fn resource_map(entries: &[(&str, u32)]) -> ResourceMap {
    entries
        .iter()
        .map(|(name, qty)| (name.to_string(), *qty))
        .collect()
}

pub fn galaxy(id: GalaxyId, name: &str, planets: Vec<Planet>) -> Galaxy {
    Galaxy {
        id,
        name: name.to_string(),
        planets,
    }
}

pub fn planet(name: &str, galaxy_id: GalaxyId, pos: (i32, i32)) -> Planet {
    planet_with(name, galaxy_id, pos, &[])
}

pub fn planet_with(
    name: &str,
    galaxy_id: GalaxyId,
    pos: (i32, i32),
    resources: &[(&str, u32)],
) -> Planet {
    Planet {
        name: name.to_string(),
        galaxy_id,
        pos: Position::new(pos.0, pos.1),
        resources: resource_map(resources),
        structures: Vec::new(),
    }
}

/// An empty ship with 100 cargo fitted for both mining and construction.
pub fn ship(id: ShipId, galaxy_id: GalaxyId, pos: (i32, i32)) -> Ship {
    Ship {
        id,
        name: format!("Ship-{}", id),
        galaxy_id,
        pos: Position::new(pos.0, pos.1),
        storage: ResourceMap::new(),
        storage_capacity: 100,
        components: vec![
            components::MINING_LASER.to_string(),
            components::CONSTRUCTION_ARM.to_string(),
        ],
    }
}

/// A completed structure with no storage.
pub fn structure(
    id: StructureId,
    structure_type: &str,
    galaxy_id: GalaxyId,
    planet_name: &str,
) -> Structure {
    Structure {
        id,
        name: format!("{}-{}", structure_type, id),
        structure_type: structure_type.to_string(),
        galaxy_id,
        planet_name: planet_name.to_string(),
        pos: Position::default(),
        progress: COMPLETE_PROGRESS,
        storage: ResourceMap::new(),
        storage_capacity: 0,
        remaining_resources: None,
    }
}

/// A construction site still missing `remaining`.
pub fn site(
    id: StructureId,
    structure_type: &str,
    galaxy_id: GalaxyId,
    planet_name: &str,
    remaining: &[(&str, u32)],
) -> Structure {
    Structure {
        progress: 0,
        remaining_resources: Some(resource_map(remaining)),
        ..structure(id, structure_type, galaxy_id, planet_name)
    }
}
