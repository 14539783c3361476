//! Task model - long-lived, multi-tick units of work
//!
//! A task belongs to exactly one galaxy's queue and is advanced one step per
//! tick by the executor for its kind. Ships are bound to it for its whole
//! lifetime; `done` is terminal and the scheduler reaps done tasks at the end
//! of the galaxy pass.

mod bind;
pub mod build;
pub mod harvest;

pub use bind::bind_ships;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::{components, TASK_ID_LENGTH};
use crate::host::{GalaxyId, ShipId, StructureId};

pub type TaskId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub galaxy_id: GalaxyId,
    /// Bound ships, in binding order
    pub ship_ids: Vec<ShipId>,
    pub required_ship_count: usize,
    pub done: bool,
    pub kind: TaskKind,
}

/// Per-kind payload. Each variant has its own executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Harvest(HarvestTask),
    Build(BuildTask),
}

/// Gather a resource from a planet, optionally delivering it to a structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestTask {
    pub planet_name: String,
    pub resource_type: String,
    /// Target quantity per ship
    pub amount: u32,
    /// Destination structure; `None` keeps the haul on the ship
    pub storage_id: Option<StructureId>,
}

/// Place a construction site and supply it until it completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTask {
    pub structure_type: String,
    pub planet_name: String,
    /// Whether the construction site has been placed
    pub created: bool,
}

impl Task {
    pub fn build(
        ids: &mut IdGenerator,
        galaxy_id: GalaxyId,
        planet_name: &str,
        structure_type: &str,
        ship_count: usize,
    ) -> Self {
        Self {
            id: ids.next_id(),
            galaxy_id,
            ship_ids: Vec::new(),
            required_ship_count: ship_count,
            done: false,
            kind: TaskKind::Build(BuildTask {
                structure_type: structure_type.to_string(),
                planet_name: planet_name.to_string(),
                created: false,
            }),
        }
    }

    pub fn harvest(
        ids: &mut IdGenerator,
        galaxy_id: GalaxyId,
        planet_name: &str,
        resource_type: &str,
        amount: u32,
        storage_id: Option<StructureId>,
        ship_count: usize,
    ) -> Self {
        Self {
            id: ids.next_id(),
            galaxy_id,
            ship_ids: Vec::new(),
            required_ship_count: ship_count,
            done: false,
            kind: TaskKind::Harvest(HarvestTask {
                planet_name: planet_name.to_string(),
                resource_type: resource_type.to_string(),
                amount,
                storage_id,
            }),
        }
    }

    /// Component a ship must carry to be bound to this task.
    pub fn required_component(&self) -> &'static str {
        match self.kind {
            TaskKind::Harvest(_) => components::MINING_LASER,
            TaskKind::Build(_) => components::CONSTRUCTION_ARM,
        }
    }

    pub fn is_staffed(&self) -> bool {
        self.ship_ids.len() >= self.required_ship_count
    }

    /// Short human-readable description for logs
    pub fn label(&self) -> String {
        match &self.kind {
            TaskKind::Harvest(h) => format!(
                "harvest[{}] {} x{} @ {}",
                self.id, h.resource_type, h.amount, h.planet_name
            ),
            TaskKind::Build(b) => {
                format!("build[{}] {} @ {}", self.id, b.structure_type, b.planet_name)
            }
        }
    }
}

/// Random task id source.
///
/// Ids are `TASK_ID_LENGTH` alphanumeric characters; collisions are treated
/// as negligible. A fixed seed makes id sequences reproducible. Seeded
/// streams are keyed by host tick as well (see [`IdGenerator::for_tick`]) so
/// that a controller rebuilt on a later tick does not replay earlier ids.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    rng: StdRng,
}

impl IdGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Seeded stream for one host tick.
    pub fn for_tick(seed: u64, tick: u64) -> Self {
        let mixed = seed ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self {
            rng: StdRng::seed_from_u64(mixed),
        }
    }

    pub fn next_id(&mut self) -> TaskId {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(TASK_ID_LENGTH)
            .map(char::from)
            .collect()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(None)
    }
}
