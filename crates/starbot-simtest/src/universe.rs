//! In-process universe backed by a hecs world
//!
//! Ships and structures are entities; galaxies and their planets are plain
//! data. Actions take effect immediately, and each ship gets one action per
//! tick: a second action from the same ship is refused and counted.

use std::collections::{BTreeMap, BTreeSet};

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use starbot_core::constants::{components, resources, structures, COMPLETE_PROGRESS, INTERACT_RANGE};
use starbot_core::host::*;

/// Units mined per tick by each fitted mining laser
pub const HARVEST_PER_LASER: u32 = 2;

// ── Components ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Identity {
    pub id: u64,
    pub name: String,
    pub galaxy_id: GalaxyId,
}

#[derive(Debug, Clone, Copy)]
pub struct Location(pub Position);

#[derive(Debug, Clone, Default)]
pub struct Cargo {
    pub storage: ResourceMap,
    pub capacity: u32,
}

impl Cargo {
    fn used(&self) -> u32 {
        self.storage.values().sum()
    }

    fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.used())
    }

    fn take(&mut self, resource: &str, amount: u32) {
        if let Some(held) = self.storage.get_mut(resource) {
            *held = held.saturating_sub(amount);
            if *held == 0 {
                self.storage.remove(resource);
            }
        }
    }

    fn put(&mut self, resource: &str, amount: u32) {
        *self.storage.entry(resource.to_string()).or_insert(0) += amount;
    }
}

/// Ship hull: installed components and grid units moved per tick
#[derive(Debug, Clone)]
pub struct Hull {
    pub components: Vec<String>,
    pub speed: i32,
}

#[derive(Debug, Clone)]
pub struct Building {
    pub structure_type: String,
    pub planet_name: String,
    pub progress: u32,
    pub remaining: Option<ResourceMap>,
    /// Total cost, for progress accounting
    pub cost: u32,
}

// ── Universe ────────────────────────────────────────────────────────────

pub struct Universe {
    pub world: World,
    galaxies: BTreeMap<GalaxyId, Galaxy>,
    costs: BTreeMap<String, BuildCost>,
    ships: BTreeMap<ShipId, Entity>,
    structures: BTreeMap<StructureId, Entity>,
    next_id: u64,
    time: u64,
    acted: BTreeSet<ShipId>,
    /// Actions refused because the ship already acted this tick
    pub double_actions: usize,
    /// Actions refused for any other reason
    pub rejected_actions: usize,
}

/// Shape of a generated universe
#[derive(Debug, Clone, Copy)]
pub struct UniverseConfig {
    pub seed: u64,
    pub galaxies: u64,
    pub ships_per_galaxy: u64,
}

impl Universe {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            galaxies: BTreeMap::new(),
            costs: default_costs(),
            ships: BTreeMap::new(),
            structures: BTreeMap::new(),
            next_id: 1,
            time: 0,
            acted: BTreeSet::new(),
            double_actions: 0,
            rejected_actions: 0,
        }
    }

    /// Random galaxies, planets and fleets. The last galaxy never has iron.
    pub fn generate(config: UniverseConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut universe = Self::new();
        let raw = [resources::IRON_ORE, resources::METAL, resources::CRYSTAL, resources::DEUTERIUM];

        for gid in 1..=config.galaxies {
            let barren = gid == config.galaxies && config.galaxies > 1;
            let planet_count = rng.gen_range(3..=5);
            let mut planets = Vec::new();
            for p in 0..planet_count {
                let mut planet_resources = ResourceMap::new();
                for resource in raw.choose_multiple(&mut rng, 2) {
                    if barren && *resource == resources::IRON_ORE {
                        continue;
                    }
                    planet_resources.insert(resource.to_string(), rng.gen_range(200..2000));
                }
                // Guarantee iron and metal somewhere in every fertile galaxy
                if p == 0 && !barren {
                    planet_resources.insert(resources::IRON_ORE.to_string(), 1500);
                    planet_resources.insert(resources::METAL.to_string(), 1500);
                }
                planets.push(Planet {
                    name: format!("G{}-P{}", gid, p),
                    galaxy_id: gid,
                    pos: Position::new(rng.gen_range(0..30), rng.gen_range(0..30)),
                    resources: planet_resources,
                    structures: Vec::new(),
                });
            }
            let home = planets[planet_count - 1].clone();
            universe.add_galaxy(Galaxy {
                id: gid,
                name: format!("Galaxy-{}", gid),
                planets,
            });

            universe.spawn_structure(gid, &home, structures::STORAGE, true);

            for n in 0..config.ships_per_galaxy {
                let mut fitted = vec![components::BASIC_ENGINE.to_string()];
                match n % 4 {
                    1 => fitted.push(components::MINING_LASER.to_string()),
                    // Haulers fit neither task kind
                    3 => fitted.push(components::STORAGE.to_string()),
                    _ => {
                        fitted.push(components::MINING_LASER.to_string());
                        fitted.push(components::CONSTRUCTION_ARM.to_string());
                    }
                }
                let pos = Position::new(rng.gen_range(0..30), rng.gen_range(0..30));
                universe.spawn_ship(gid, pos, fitted, 100, rng.gen_range(1..=3));
            }
        }

        universe
    }

    pub fn add_galaxy(&mut self, galaxy: Galaxy) {
        self.galaxies.insert(galaxy.id, galaxy);
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn_ship(
        &mut self,
        galaxy_id: GalaxyId,
        pos: Position,
        components: Vec<String>,
        capacity: u32,
        speed: i32,
    ) -> ShipId {
        let id = self.allocate_id();
        let entity = self.world.spawn((
            Identity {
                id,
                name: format!("Ship-{}", id),
                galaxy_id,
            },
            Location(pos),
            Cargo {
                storage: ResourceMap::new(),
                capacity,
            },
            Hull { components, speed },
        ));
        self.ships.insert(id, entity);
        id
    }

    /// Place a structure on `planet`, either finished or as a fresh site.
    pub fn spawn_structure(
        &mut self,
        galaxy_id: GalaxyId,
        planet: &Planet,
        structure_type: &str,
        complete: bool,
    ) -> StructureId {
        let id = self.allocate_id();
        let cost = self.costs.get(structure_type).cloned().unwrap_or_default();
        let total: u32 = cost.resources.values().sum();
        let capacity = match structure_type {
            structures::STORAGE | structures::WAREHOUSE => 1000,
            _ => 0,
        };
        let (progress, remaining) = if complete || total == 0 {
            (COMPLETE_PROGRESS, None)
        } else {
            (0, Some(cost.resources))
        };

        let entity = self.world.spawn((
            Identity {
                id,
                name: format!("{}-{}", structure_type, id),
                galaxy_id,
            },
            Location(planet.pos),
            Cargo {
                storage: ResourceMap::new(),
                capacity,
            },
            Building {
                structure_type: structure_type.to_string(),
                planet_name: planet.name.clone(),
                progress,
                remaining,
                cost: total,
            },
        ));
        self.structures.insert(id, entity);
        id
    }

    pub fn destroy_ship(&mut self, id: ShipId) -> bool {
        match self.ships.remove(&id) {
            Some(entity) => self.world.despawn(entity).is_ok(),
            None => false,
        }
    }

    pub fn ship_ids(&self) -> Vec<ShipId> {
        self.ships.keys().copied().collect()
    }

    pub fn galaxy_ids(&self) -> Vec<GalaxyId> {
        self.galaxies.keys().copied().collect()
    }

    /// Advance the clock and reset per-tick action limits.
    pub fn end_tick(&mut self) {
        self.time += 1;
        self.acted.clear();
    }

    /// Owned structures of a type in a galaxy, with completion state
    pub fn structures_of(
        &self,
        galaxy_id: GalaxyId,
        structure_type: &str,
    ) -> Vec<(StructureId, bool)> {
        let mut found = Vec::new();
        for (_, (identity, building)) in self.world.query::<(&Identity, &Building)>().iter() {
            if identity.galaxy_id == galaxy_id && building.structure_type == structure_type {
                found.push((identity.id, building.remaining.is_none()));
            }
        }
        found.sort_unstable();
        found
    }

    pub fn stored(&self, structure: StructureId, resource: &str) -> u32 {
        self.structures
            .get(&structure)
            .and_then(|e| self.world.get::<&Cargo>(*e).ok())
            .and_then(|c| c.storage.get(resource).copied())
            .unwrap_or(0)
    }

    /// Claim the ship's action slot for this tick.
    fn begin_action(&mut self, ship: ShipId) -> bool {
        if !self.acted.insert(ship) {
            self.double_actions += 1;
            log::warn!("Ship {} issued a second action this tick", ship);
            return false;
        }
        true
    }

    fn reject(&mut self, ship: ShipId, why: &str) -> bool {
        self.rejected_actions += 1;
        log::debug!("Ship {}: {}", ship, why);
        false
    }

    fn ship_state(&self, ship: ShipId) -> Option<(Entity, GalaxyId, Position)> {
        let entity = *self.ships.get(&ship)?;
        let identity = self.world.get::<&Identity>(entity).ok()?;
        let location = self.world.get::<&Location>(entity).ok()?;
        Some((entity, identity.galaxy_id, location.0))
    }

    fn planet_of(&self, galaxy_id: GalaxyId, name: &str) -> Option<&Planet> {
        self.galaxies.get(&galaxy_id)?.planet(name)
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

fn default_costs() -> BTreeMap<String, BuildCost> {
    let cost = |energy: u32, entries: &[(&str, u32)]| BuildCost {
        energy,
        resources: entries.iter().map(|(r, q)| (r.to_string(), *q)).collect(),
    };
    BTreeMap::from([
        (structures::FACTORY.to_string(), cost(100, &[(resources::IRON_ORE, 60)])),
        (structures::STORAGE.to_string(), cost(40, &[(resources::IRON_ORE, 30)])),
        (
            structures::LAB.to_string(),
            cost(150, &[(resources::IRON_ORE, 40), (resources::CRYSTAL, 20)]),
        ),
    ])
}

fn step_toward(from: Position, to: Position, speed: i32) -> Position {
    let step = |a: i32, b: i32| a + (b - a).clamp(-speed, speed);
    Position::new(step(from.x, to.x), step(from.y, to.y))
}

impl Host for Universe {
    fn time(&self) -> u64 {
        self.time
    }

    fn my_ships(&self) -> Vec<Ship> {
        self.world
            .query::<(&Identity, &Location, &Cargo, &Hull)>()
            .iter()
            .map(|(_, (identity, location, cargo, hull))| Ship {
                id: identity.id,
                name: identity.name.clone(),
                galaxy_id: identity.galaxy_id,
                pos: location.0,
                storage: cargo.storage.clone(),
                storage_capacity: cargo.capacity,
                components: hull.components.clone(),
            })
            .collect()
    }

    fn my_structures(&self) -> Vec<Structure> {
        self.world
            .query::<(&Identity, &Location, &Cargo, &Building)>()
            .iter()
            .map(|(_, (identity, location, cargo, building))| Structure {
                id: identity.id,
                name: identity.name.clone(),
                structure_type: building.structure_type.clone(),
                galaxy_id: identity.galaxy_id,
                planet_name: building.planet_name.clone(),
                pos: location.0,
                progress: building.progress,
                storage: cargo.storage.clone(),
                storage_capacity: cargo.capacity,
                remaining_resources: building.remaining.clone(),
            })
            .collect()
    }

    fn galaxy(&self, galaxy_id: GalaxyId) -> Option<Galaxy> {
        let mut galaxy = self.galaxies.get(&galaxy_id)?.clone();
        let built: Vec<Structure> = self
            .my_structures()
            .into_iter()
            .filter(|s| s.galaxy_id == galaxy_id)
            .collect();
        for planet in &mut galaxy.planets {
            planet.structures = built
                .iter()
                .filter(|s| s.planet_name == planet.name)
                .cloned()
                .collect();
        }
        Some(galaxy)
    }

    fn structure_cost(&self, structure_type: &str) -> BuildCost {
        self.costs.get(structure_type).cloned().unwrap_or_default()
    }

    fn move_to(&mut self, ship: ShipId, target: Position) -> bool {
        let Some((entity, _, pos)) = self.ship_state(ship) else {
            return self.reject(ship, "no such ship");
        };
        if !self.begin_action(ship) {
            return false;
        }
        let speed = self.world.get::<&Hull>(entity).map(|h| h.speed).unwrap_or(1);
        if let Ok(mut location) = self.world.get::<&mut Location>(entity) {
            location.0 = step_toward(pos, target, speed);
        }
        true
    }

    fn harvest(&mut self, ship: ShipId, planet_name: &str, resource: Option<&str>) -> bool {
        let Some((entity, galaxy_id, pos)) = self.ship_state(ship) else {
            return self.reject(ship, "no such ship");
        };
        if !self.begin_action(ship) {
            return false;
        }
        let lasers = self
            .world
            .get::<&Hull>(entity)
            .map(|h| h.components.iter().filter(|c| *c == components::MINING_LASER).count() as u32)
            .unwrap_or(0);
        if lasers == 0 {
            return self.reject(ship, "no mining laser");
        }

        let Some(planet) = self.planet_of(galaxy_id, planet_name) else {
            return self.reject(ship, "unknown planet");
        };
        if pos.range_to(&planet.pos) > INTERACT_RANGE {
            return self.reject(ship, "planet out of range");
        }
        let picked = match resource {
            Some(r) => planet.resources.get(r).filter(|q| **q > 0).map(|_| r.to_string()),
            None => planet
                .resources
                .iter()
                .find(|(_, q)| **q > 0)
                .map(|(r, _)| r.clone()),
        };
        let Some(picked) = picked else {
            return self.reject(ship, "nothing to harvest");
        };
        let deposit = planet.resources.get(&picked).copied().unwrap_or(0);

        let room = self.world.get::<&Cargo>(entity).map(|c| c.available()).unwrap_or(0);
        let amount = (HARVEST_PER_LASER * lasers).min(room).min(deposit);
        if amount == 0 {
            return self.reject(ship, "cargo full");
        }

        if let Ok(mut cargo) = self.world.get::<&mut Cargo>(entity) {
            cargo.put(&picked, amount);
        }
        if let Some(qty) = self
            .galaxies
            .get_mut(&galaxy_id)
            .and_then(|g| g.planets.iter_mut().find(|p| p.name == planet_name))
            .and_then(|p| p.resources.get_mut(&picked))
        {
            *qty -= amount;
        }
        true
    }

    fn build(&mut self, ship: ShipId, planet_name: &str, structure_type: &str) -> bool {
        let Some((entity, galaxy_id, pos)) = self.ship_state(ship) else {
            return self.reject(ship, "no such ship");
        };
        if !self.begin_action(ship) {
            return false;
        }
        let has_arm = self
            .world
            .get::<&Hull>(entity)
            .map(|h| h.components.iter().any(|c| c == components::CONSTRUCTION_ARM))
            .unwrap_or(false);
        if !has_arm {
            return self.reject(ship, "no construction arm");
        }
        let Some(planet) = self.planet_of(galaxy_id, planet_name).cloned() else {
            return self.reject(ship, "unknown planet");
        };
        if pos.range_to(&planet.pos) > INTERACT_RANGE {
            return self.reject(ship, "planet out of range");
        }
        if !self.costs.contains_key(structure_type) {
            return self.reject(ship, "unknown structure type");
        }
        let id = self.spawn_structure(galaxy_id, &planet, structure_type, false);
        log::info!("Ship {} placed {} site {} on {}", ship, structure_type, id, planet.name);
        true
    }

    fn supply_construction(
        &mut self,
        ship: ShipId,
        site: StructureId,
        offered: Option<&ResourceMap>,
    ) -> bool {
        let Some((ship_entity, _, pos)) = self.ship_state(ship) else {
            return self.reject(ship, "no such ship");
        };
        if !self.begin_action(ship) {
            return false;
        }
        let Some(site_entity) = self.structures.get(&site).copied() else {
            return self.reject(ship, "no such site");
        };
        let in_range = self
            .world
            .get::<&Location>(site_entity)
            .map(|l| pos.range_to(&l.0) <= INTERACT_RANGE)
            .unwrap_or(false);
        if !in_range {
            return self.reject(ship, "site out of range");
        }

        // Work on copies so ship and site are never borrowed together
        let cargo = self.world.get::<&Cargo>(ship_entity).map(|c| (*c).clone());
        let building = self.world.get::<&Building>(site_entity).map(|b| (*b).clone());
        let (Ok(mut cargo), Ok(mut building)) = (cargo, building) else {
            return self.reject(ship, "bad entities");
        };
        let Some(remaining) = building.remaining.as_mut() else {
            return self.reject(ship, "structure already complete");
        };

        for (resource, needed) in remaining.iter_mut() {
            let mut give = cargo.storage.get(resource).copied().unwrap_or(0).min(*needed);
            if let Some(offered) = offered {
                give = give.min(offered.get(resource).copied().unwrap_or(0));
            }
            cargo.take(resource, give);
            *needed -= give;
        }
        let left: u32 = remaining.values().sum();
        if left == 0 {
            building.remaining = None;
            building.progress = COMPLETE_PROGRESS;
            log::info!("Structure {} completed", site);
        } else if building.cost > 0 {
            building.progress =
                COMPLETE_PROGRESS * (building.cost - left.min(building.cost)) / building.cost;
        }

        if let Ok(mut c) = self.world.get::<&mut Cargo>(ship_entity) {
            *c = cargo;
        }
        if let Ok(mut b) = self.world.get::<&mut Building>(site_entity) {
            *b = building;
        }
        true
    }

    fn transfer(&mut self, ship: ShipId, target: StructureId, resource: &str, amount: u32) -> bool {
        let Some((ship_entity, _, pos)) = self.ship_state(ship) else {
            return self.reject(ship, "no such ship");
        };
        if !self.begin_action(ship) {
            return false;
        }
        let Some(target_entity) = self.structures.get(&target).copied() else {
            return self.reject(ship, "no such structure");
        };
        let target_pos = self.world.get::<&Location>(target_entity).map(|l| l.0);
        let room = self.world.get::<&Cargo>(target_entity).map(|c| c.available());
        let (Ok(target_pos), Ok(room)) = (target_pos, room) else {
            return self.reject(ship, "bad structure");
        };
        let in_range = pos.range_to(&target_pos) <= INTERACT_RANGE;
        let held = self
            .world
            .get::<&Cargo>(ship_entity)
            .map(|c| c.storage.get(resource).copied().unwrap_or(0))
            .unwrap_or(0);
        if !in_range || amount == 0 || amount > held || amount > room {
            return self.reject(ship, "transfer refused");
        }

        if let Ok(mut c) = self.world.get::<&mut Cargo>(ship_entity) {
            c.take(resource, amount);
        }
        if let Ok(mut c) = self.world.get::<&mut Cargo>(target_entity) {
            c.put(resource, amount);
        }
        true
    }
}
