//! Persistent memory - records that must survive from one tick to the next
//!
//! The layout mirrors what the host stores between ticks:
//!
//! ```text
//! { myShips:      { [shipId]: { working, taskId } },
//!   myStructures: { [structureId]: {} },
//!   myGalaxies:   { [galaxyId]: { taskList: Task[] } } }
//! ```
//!
//! Records are created the first tick an entity is seen (`init`) and ship and
//! structure records are dropped the first tick it is gone (`prune`). Galaxy
//! records are never removed automatically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::host::{GalaxyId, ShipId, StructureId};
use crate::snapshot::EntitySnapshot;
use crate::tasks::{Task, TaskId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(rename = "myShips", default)]
    pub ships: BTreeMap<ShipId, ShipMemory>,
    #[serde(rename = "myStructures", default)]
    pub structures: BTreeMap<StructureId, StructureMemory>,
    #[serde(rename = "myGalaxies", default)]
    pub galaxies: BTreeMap<GalaxyId, GalaxyMemory>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipMemory {
    /// Performing the bound task's main action rather than gathering for it
    #[serde(default)]
    pub working: bool,
    /// Task currently claiming this ship
    #[serde(default)]
    pub task_id: Option<TaskId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureMemory {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalaxyMemory {
    /// FIFO by creation
    #[serde(default)]
    pub task_list: Vec<Task>,
}

/// Records removed by [`Memory::prune`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub ships: usize,
    pub structures: usize,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure every owned ship, structure and occupied galaxy has a record.
    /// Safe to call every tick; existing records are left untouched.
    pub fn init(&mut self, snapshot: &EntitySnapshot) {
        for ship in snapshot.ships.values() {
            self.ships.entry(ship.id).or_default();
            self.galaxies.entry(ship.galaxy_id).or_default();
        }
        for id in snapshot.structures.keys() {
            self.structures.entry(*id).or_default();
        }
    }

    /// Drop ship and structure records whose entity no longer exists.
    pub fn prune(&mut self, snapshot: &EntitySnapshot) -> PruneReport {
        let ships_before = self.ships.len();
        self.ships.retain(|id, _| snapshot.ships.contains_key(id));

        let structures_before = self.structures.len();
        self.structures
            .retain(|id, _| snapshot.structures.contains_key(id));

        // Galaxy memory is kept; clearing it is left to the player

        PruneReport {
            ships: ships_before - self.ships.len(),
            structures: structures_before - self.structures.len(),
        }
    }

    pub fn ship(&self, id: ShipId) -> Option<&ShipMemory> {
        self.ships.get(&id)
    }

    pub fn ship_mut(&mut self, id: ShipId) -> &mut ShipMemory {
        self.ships.entry(id).or_default()
    }

    pub fn structure_mut(&mut self, id: StructureId) -> &mut StructureMemory {
        self.structures.entry(id).or_default()
    }

    pub fn galaxy(&self, id: GalaxyId) -> Option<&GalaxyMemory> {
        self.galaxies.get(&id)
    }

    pub fn galaxy_mut(&mut self, id: GalaxyId) -> &mut GalaxyMemory {
        self.galaxies.entry(id).or_default()
    }

    /// Task id claiming a ship, if any
    pub fn task_of(&self, ship: ShipId) -> Option<&str> {
        self.ships.get(&ship).and_then(|m| m.task_id.as_deref())
    }

    /// Clear the claim of every ship still bound to `task`.
    /// Returns how many ships were released.
    pub fn release_task(&mut self, task: &Task) -> usize {
        let mut released = 0;
        for ship_id in &task.ship_ids {
            if let Some(mem) = self.ships.get_mut(ship_id) {
                if mem.task_id.as_deref() == Some(task.id.as_str()) {
                    mem.task_id = None;
                    mem.working = false;
                    released += 1;
                }
            }
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::IdGenerator;
    use crate::testing::{galaxy, ship, structure, ScriptedHost};

    fn world() -> ScriptedHost {
        ScriptedHost::new()
            .with_galaxy(galaxy(1, "Sol", vec![]))
            .with_ship(ship(10, 1, (0, 0)))
            .with_ship(ship(11, 1, (1, 1)))
            .with_structure(structure(20, "factory", 1, "Terra"))
    }

    #[test]
    fn test_init_creates_records() {
        let snapshot = EntitySnapshot::capture(&world());
        let mut memory = Memory::new();
        memory.init(&snapshot);

        assert_eq!(memory.ships.len(), 2);
        assert_eq!(memory.structures.len(), 1);
        assert!(memory.galaxy(1).unwrap().task_list.is_empty());
        assert!(!memory.ship(10).unwrap().working);
        assert!(memory.ship(10).unwrap().task_id.is_none());
    }

    #[test]
    fn test_init_is_idempotent() {
        let snapshot = EntitySnapshot::capture(&world());
        let mut memory = Memory::new();
        memory.init(&snapshot);
        memory.ship_mut(10).working = true;
        memory.ship_mut(10).task_id = Some("abcdEFGH".into());

        memory.init(&snapshot);
        let before = memory.clone();
        memory.init(&snapshot);

        assert_eq!(memory, before);
        assert!(memory.ship(10).unwrap().working);
    }

    #[test]
    fn test_prune_removes_stale_records_only() {
        let mut host = world();
        let mut memory = Memory::new();
        memory.init(&EntitySnapshot::capture(&host));

        host.remove_ship(11);
        host.remove_structure(20);
        let snapshot = EntitySnapshot::capture(&host);
        let report = memory.prune(&snapshot);

        assert_eq!(report, PruneReport { ships: 1, structures: 1 });
        for id in memory.ships.keys() {
            assert!(snapshot.ships.contains_key(id));
        }
        for id in memory.structures.keys() {
            assert!(snapshot.structures.contains_key(id));
        }
        // Galaxy memory survives even if no ship is left there
        host.remove_ship(10);
        memory.prune(&EntitySnapshot::capture(&host));
        assert!(memory.galaxy(1).is_some());
    }

    #[test]
    fn test_release_task_only_clears_own_claims() {
        let mut ids = IdGenerator::new(Some(3));
        let mut task = Task::build(&mut ids, 1, "Terra", "factory", 2);
        task.ship_ids = vec![10, 11];

        let mut memory = Memory::new();
        memory.ship_mut(10).task_id = Some(task.id.clone());
        memory.ship_mut(10).working = true;
        memory.ship_mut(11).task_id = Some("otherTsk".into());

        assert_eq!(memory.release_task(&task), 1);
        assert_eq!(memory.task_of(10), None);
        assert!(!memory.ship(10).unwrap().working);
        assert_eq!(memory.task_of(11), Some("otherTsk"));
    }

    #[test]
    fn test_host_layout_json() {
        let mut memory = Memory::new();
        memory.ship_mut(10).task_id = Some("abcdEFGH".into());
        memory.structure_mut(20);
        memory.galaxy_mut(1);

        let json = serde_json::to_value(&memory).unwrap();
        assert_eq!(json["myShips"]["10"]["taskId"], "abcdEFGH");
        assert_eq!(json["myShips"]["10"]["working"], false);
        assert!(json["myStructures"]["20"].is_object());
        assert!(json["myGalaxies"]["1"]["taskList"].is_array());

        // Missing sections and fields load as empty
        let empty: Memory = serde_json::from_str(r#"{"myShips": {"5": {}}}"#).unwrap();
        assert!(!empty.ship(5).unwrap().working);
        assert!(empty.galaxies.is_empty());
    }
}
