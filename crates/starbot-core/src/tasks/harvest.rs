//! Harvest executor - mine a resource and optionally haul it to storage

use crate::constants::INTERACT_RANGE;
use crate::host::{Host, Ship, Structure};
use crate::scheduler::TickContext;
use crate::snapshot::EntitySnapshot;
use crate::tasks::{bind_ships, HarvestTask, Task, TaskKind};

pub fn execute_harvest_task<H: Host + ?Sized>(task: &mut Task, ctx: &mut TickContext<'_, H>) {
    // Ships bound during this call first act on the next tick
    let resolved = task.ship_ids.len();
    bind_ships(task, ctx.snapshot, ctx.memory);

    let snapshot = ctx.snapshot;
    let Task {
        id,
        kind: TaskKind::Harvest(harvest),
        ship_ids,
        done,
        ..
    } = task
    else {
        return;
    };

    for ship_id in ship_ids.iter().take(resolved) {
        let Some(ship) = snapshot.ship(*ship_id) else {
            continue;
        };
        step_ship(id, harvest, done, ship, snapshot, ctx);
        if *done {
            break;
        }
    }
}

fn step_ship<H: Host + ?Sized>(
    task_id: &str,
    harvest: &HarvestTask,
    done: &mut bool,
    ship: &Ship,
    snapshot: &EntitySnapshot,
    ctx: &mut TickContext<'_, H>,
) {
    let resource = harvest.resource_type.as_str();
    let held = ship.amount_of(resource);

    if held > harvest.amount {
        let Some(storage_id) = harvest.storage_id else {
            // Nowhere to deliver: the haul stays on the ship
            log::info!(
                "harvest[{}]: {} holds {} {}, complete",
                task_id,
                ship.name,
                held,
                resource
            );
            *done = true;
            return;
        };

        match snapshot
            .structure(storage_id)
            .filter(|s| s.storage_available() >= harvest.amount)
        {
            Some(storage) => deliver(task_id, harvest, done, ship, storage, ctx),
            None => {
                log::info!(
                    "harvest[{}]: storage {} missing or full, closing",
                    task_id,
                    storage_id
                );
                *done = true;
            }
        }
        return;
    }

    let planet = snapshot
        .galaxy(ship.galaxy_id)
        .and_then(|g| g.planet(&harvest.planet_name))
        .filter(|p| p.has_resource(resource));
    let Some(planet) = planet else {
        log::info!(
            "harvest[{}]: {} on {} no longer available, closing",
            task_id,
            resource,
            harvest.planet_name
        );
        *done = true;
        return;
    };

    if ship.pos.range_to(&planet.pos) > INTERACT_RANGE {
        ctx.host.move_to(ship.id, planet.pos);
        return;
    }

    if !ctx.host.harvest(ship.id, &planet.name, Some(resource)) {
        log::warn!(
            "harvest[{}]: {} failed to harvest {} at {}",
            task_id,
            ship.name,
            resource,
            planet.name
        );
    }
}

/// Haul the ship's load into `storage`, bounded by the free capacity there.
fn deliver<H: Host + ?Sized>(
    task_id: &str,
    harvest: &HarvestTask,
    done: &mut bool,
    ship: &Ship,
    storage: &Structure,
    ctx: &mut TickContext<'_, H>,
) {
    if ship.pos.range_to(&storage.pos) > INTERACT_RANGE {
        ctx.host.move_to(ship.id, storage.pos);
        return;
    }

    let resource = harvest.resource_type.as_str();
    let amount = ship.amount_of(resource).min(storage.storage_available());
    if ctx.host.transfer(ship.id, storage.id, resource, amount) {
        log::info!(
            "harvest[{}]: {} delivered {} {} to {}",
            task_id,
            ship.name,
            amount,
            resource,
            storage.name
        );
        *done = true;
    } else {
        log::warn!(
            "harvest[{}]: {} could not transfer {} to {}",
            task_id,
            ship.name,
            resource,
            storage.name
        );
    }
}
