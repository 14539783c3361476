//! Ship binding shared by all executors

use crate::memory::Memory;
use crate::snapshot::EntitySnapshot;
use crate::tasks::Task;

/// Bind free, capable ships of the task's galaxy until it is fully staffed.
///
/// Ships are scanned in id order. A ship is skipped when another task
/// already claims it, when it is already bound here, or when it lacks the
/// component the task kind needs. Returns the number of ships bound.
pub fn bind_ships(task: &mut Task, snapshot: &EntitySnapshot, memory: &mut Memory) -> usize {
    if task.is_staffed() {
        return 0;
    }

    let component = task.required_component();
    let mut bound = 0;

    for ship in snapshot.ships_in(task.galaxy_id) {
        if task.ship_ids.contains(&ship.id) {
            continue;
        }
        if memory
            .task_of(ship.id)
            .is_some_and(|claimed| claimed != task.id)
        {
            continue;
        }
        if !ship.has_component(component) {
            log::trace!("{} lacks {} for {}", ship.name, component, task.label());
            continue;
        }

        let ship_memory = memory.ship_mut(ship.id);
        ship_memory.task_id = Some(task.id.clone());
        ship_memory.working = false;
        task.ship_ids.push(ship.id);
        bound += 1;
        log::debug!("Bound {} to {}", ship.name, task.label());

        if task.is_staffed() {
            break;
        }
    }

    bound
}
