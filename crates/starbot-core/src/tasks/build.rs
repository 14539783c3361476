//! Build executor - gather materials, place a construction site, supply it
//!
//! Per bound ship the state is inferred every tick from `ShipMemory.working`,
//! `BuildTask.created` and the live world:
//!
//! ```text
//! idle → gathering → delivering (no site yet) → delivering (site placed) → done
//! ```
//!
//! A ship gathers while it is missing some required resource and still has
//! cargo room; once full (or nothing more is needed) it flies to the target
//! planet, places the site if needed, and hands over its cargo.

use crate::constants::INTERACT_RANGE;
use crate::host::{Galaxy, Host, ResourceMap, Ship};
use crate::scheduler::TickContext;
use crate::tasks::{bind_ships, BuildTask, Task, TaskKind};

pub fn execute_build_task<H: Host + ?Sized>(task: &mut Task, ctx: &mut TickContext<'_, H>) {
    // Ships bound during this call first act on the next tick
    let resolved = task.ship_ids.len();
    bind_ships(task, ctx.snapshot, ctx.memory);

    let snapshot = ctx.snapshot;
    let Task {
        id,
        kind: TaskKind::Build(build),
        ship_ids,
        done,
        ..
    } = task
    else {
        return;
    };

    // A site placed during this tick is not in the snapshot until the next one
    let placed_earlier = build.created;

    for ship_id in ship_ids.iter().take(resolved) {
        let Some(ship) = snapshot.ship(*ship_id) else {
            continue;
        };
        let Some(galaxy) = snapshot.galaxy(ship.galaxy_id) else {
            continue;
        };
        step_ship(id, build, placed_earlier, done, ship, galaxy, ctx);
        if *done {
            break;
        }
    }
}

/// One tick of work for one ship. At most one action is issued.
fn step_ship<H: Host + ?Sized>(
    task_id: &str,
    build: &mut BuildTask,
    placed_earlier: bool,
    done: &mut bool,
    ship: &Ship,
    galaxy: &Galaxy,
    ctx: &mut TickContext<'_, H>,
) {
    let Some(planet) = galaxy.planet(&build.planet_name) else {
        log::info!(
            "build[{}]: planet {} no longer exists in {}, abandoning",
            task_id,
            build.planet_name,
            galaxy.name
        );
        *done = true;
        return;
    };

    let site = planet
        .structures
        .iter()
        .find(|s| s.structure_type == build.structure_type && s.is_construction_site());

    // Outstanding need of the placed site, or the full cost before placement
    let cost;
    let requirements: &ResourceMap = match site.and_then(|s| s.remaining_resources.as_ref()) {
        Some(remaining) => remaining,
        None => {
            cost = ctx.host.structure_cost(&build.structure_type);
            &cost.resources
        }
    };
    let need_resource = requirements
        .iter()
        .find(|&(resource, &required)| ship.amount_of(resource) < required)
        .map(|(resource, _)| resource.as_str());

    let memory = ctx.memory.ship_mut(ship.id);
    if memory.working && ship.storage_used() == 0 && need_resource.is_some() {
        memory.working = false;
    }
    if !memory.working && (need_resource.is_none() || ship.storage_available() == 0) {
        memory.working = true;
    }
    let working = memory.working;

    // Gathering: mining and construction never happen in the same tick
    if let (false, Some(resource)) = (working, need_resource) {
        let Some(source) = galaxy.planets_with_resource(resource).next() else {
            log::warn!(
                "build[{}]: no planet in {} supplies {}",
                task_id,
                galaxy.name,
                resource
            );
            return;
        };

        if ship.pos.range_to(&source.pos) > INTERACT_RANGE {
            ctx.host.move_to(ship.id, source.pos);
            return;
        }

        if ctx.host.harvest(ship.id, &source.name, Some(resource)) {
            log::debug!(
                "build[{}]: {} short of {}, harvesting at {}",
                task_id,
                build.structure_type,
                resource,
                source.name
            );
        } else {
            log::warn!("build[{}]: {} failed to harvest {}", task_id, ship.name, resource);
        }
        return;
    }

    // Delivering
    if ship.pos.range_to(&planet.pos) > INTERACT_RANGE {
        ctx.host.move_to(ship.id, planet.pos);
        return;
    }

    if !build.created {
        if ctx.host.build(ship.id, &planet.name, &build.structure_type) {
            build.created = true;
            log::info!(
                "build[{}]: placed {} site on {}",
                task_id,
                build.structure_type,
                planet.name
            );
        } else {
            log::warn!(
                "build[{}]: failed to place {} on {}",
                task_id,
                build.structure_type,
                planet.name
            );
        }
        return;
    }

    let Some(site) = site else {
        if !placed_earlier {
            return;
        }
        log::info!(
            "build[{}]: {} on {} finished or destroyed",
            task_id,
            build.structure_type,
            planet.name
        );
        *done = true;
        return;
    };

    if !ctx
        .host
        .supply_construction(ship.id, site.id, Some(&ship.storage))
    {
        log::warn!("build[{}]: {} could not supply site {}", task_id, ship.name, site.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Position;
    use crate::memory::Memory;
    use crate::snapshot::EntitySnapshot;
    use crate::tasks::IdGenerator;
    use crate::testing::*;

    const G: u64 = 1;

    fn base_host() -> ScriptedHost {
        ScriptedHost::new()
            .with_galaxy(galaxy(
                G,
                "Sol",
                vec![
                    planet_with("Terra", G, (0, 0), &[]),
                    planet_with("Ferrum", G, (10, 0), &[("iron_ore", 500)]),
                ],
            ))
            .with_cost("factory", &[("iron_ore", 50)])
    }

    fn build_task(ids: &mut IdGenerator) -> Task {
        Task::build(ids, G, "Terra", "factory", 1)
    }

    /// Run the executor once against the host's current state.
    fn run(host: &mut ScriptedHost, memory: &mut Memory, task: &mut Task) {
        let snapshot = EntitySnapshot::capture(&*host);
        memory.init(&snapshot);
        let mut ctx = TickContext {
            host,
            snapshot: &snapshot,
            memory,
        };
        execute_build_task(task, &mut ctx);
    }

    /// First run: bind the task's ships. Nothing acts yet.
    fn staff(host: &mut ScriptedHost, memory: &mut Memory, task: &mut Task) {
        run(host, memory, task);
        assert!(host.take_actions().is_empty());
    }

    fn created(task: &Task) -> bool {
        match &task.kind {
            TaskKind::Build(b) => b.created,
            _ => false,
        }
    }

    #[test]
    fn test_empty_ship_goes_gathering() {
        let mut host = base_host().with_ship(ship(5, G, (0, 0)));
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(1));
        let mut task = build_task(&mut ids);

        staff(&mut host, &mut memory, &mut task);
        run(&mut host, &mut memory, &mut task);

        assert_eq!(task.ship_ids, vec![5]);
        assert!(!memory.ship(5).unwrap().working);
        assert_eq!(
            host.actions,
            vec![Action::Move {
                ship: 5,
                target: Position::new(10, 0)
            }]
        );
    }

    #[test]
    fn test_harvests_when_next_to_source() {
        let mut host = base_host().with_ship(ship(5, G, (9, 1)));
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(1));
        let mut task = build_task(&mut ids);

        staff(&mut host, &mut memory, &mut task);
        run(&mut host, &mut memory, &mut task);

        assert_eq!(
            host.actions,
            vec![Action::Harvest {
                ship: 5,
                planet: "Ferrum".into(),
                resource: Some("iron_ore".into())
            }]
        );
    }

    #[test]
    fn test_full_ship_places_site() {
        let mut loaded = ship(5, G, (1, 0));
        loaded.storage = resource_map(&[("iron_ore", 60)]);
        let mut host = base_host().with_ship(loaded);
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(1));
        let mut task = build_task(&mut ids);

        staff(&mut host, &mut memory, &mut task);
        run(&mut host, &mut memory, &mut task);

        assert!(memory.ship(5).unwrap().working);
        assert!(created(&task));
        assert_eq!(
            host.actions,
            vec![Action::Build {
                ship: 5,
                planet: "Terra".into(),
                structure_type: "factory".into()
            }]
        );
    }

    #[test]
    fn test_rejected_placement_is_retried() {
        let mut loaded = ship(5, G, (0, 1));
        loaded.storage = resource_map(&[("iron_ore", 60)]);
        let mut host = base_host().with_ship(loaded);
        host.reject(ActionKind::Build);
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(1));
        let mut task = build_task(&mut ids);

        staff(&mut host, &mut memory, &mut task);
        run(&mut host, &mut memory, &mut task);
        assert!(!created(&task));
        assert!(!task.done);

        host.accept(ActionKind::Build);
        run(&mut host, &mut memory, &mut task);
        assert!(created(&task));
        assert_eq!(host.actions.len(), 2);
    }

    #[test]
    fn test_full_cargo_supplies_existing_site() {
        // working=false, full cargo, site already created
        let mut full = ship(5, G, (1, 1));
        full.storage = resource_map(&[("crystal", 100)]);
        let mut host = base_host()
            .with_ship(full)
            .with_structure(site(30, "factory", G, "Terra", &[("iron_ore", 50)]));
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(1));
        let mut task = build_task(&mut ids);
        if let TaskKind::Build(b) = &mut task.kind {
            b.created = true;
        }

        staff(&mut host, &mut memory, &mut task);
        run(&mut host, &mut memory, &mut task);

        assert_eq!(host.actions.len(), 1);
        assert!(matches!(
            host.actions[0],
            Action::Supply { ship: 5, site: 30, .. }
        ));
        assert!(!task.done);
    }

    #[test]
    fn test_empty_worker_returns_to_gathering() {
        let mut host = base_host()
            .with_ship(ship(5, G, (0, 0)))
            .with_structure(site(30, "factory", G, "Terra", &[("iron_ore", 20)]));
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(1));
        let mut task = build_task(&mut ids);
        if let TaskKind::Build(b) = &mut task.kind {
            b.created = true;
        }
        memory.ship_mut(5).task_id = Some(task.id.clone());
        memory.ship_mut(5).working = true;
        task.ship_ids.push(5);

        run(&mut host, &mut memory, &mut task);

        assert!(!memory.ship(5).unwrap().working);
        assert!(matches!(host.actions[0], Action::Move { ship: 5, .. }));
    }

    #[test]
    fn test_finished_structure_completes_task() {
        let mut loaded = ship(5, G, (0, 0));
        loaded.storage = resource_map(&[("iron_ore", 60)]);
        let mut host = base_host()
            .with_ship(loaded)
            .with_structure(structure(30, "factory", G, "Terra"));
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(1));
        let mut task = build_task(&mut ids);
        if let TaskKind::Build(b) = &mut task.kind {
            b.created = true;
        }

        staff(&mut host, &mut memory, &mut task);
        run(&mut host, &mut memory, &mut task);

        assert!(task.done);
        assert!(host.actions.is_empty());
    }

    #[test]
    fn test_second_ship_waits_for_fresh_site() {
        let mut first = ship(5, G, (0, 0));
        first.storage = resource_map(&[("iron_ore", 60)]);
        let mut second = ship(6, G, (0, 0));
        second.storage = resource_map(&[("iron_ore", 60)]);
        let mut host = base_host().with_ship(first).with_ship(second);
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(1));
        let mut task = Task::build(&mut ids, G, "Terra", "factory", 2);

        staff(&mut host, &mut memory, &mut task);
        run(&mut host, &mut memory, &mut task);

        assert!(created(&task));
        assert!(!task.done);
        assert_eq!(host.actions.len(), 1);
    }

    #[test]
    fn test_missing_planet_completes_task() {
        let mut host = base_host().with_ship(ship(5, G, (0, 0)));
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(1));
        let mut task = Task::build(&mut ids, G, "Atlantis", "factory", 1);

        staff(&mut host, &mut memory, &mut task);
        run(&mut host, &mut memory, &mut task);

        assert!(task.done);
        assert!(host.actions.is_empty());
    }

    #[test]
    fn test_no_resource_source_waits() {
        let mut host = ScriptedHost::new()
            .with_galaxy(galaxy(G, "Sol", vec![planet("Terra", G, (0, 0))]))
            .with_cost("factory", &[("iron_ore", 50)])
            .with_ship(ship(5, G, (0, 0)));
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(1));
        let mut task = build_task(&mut ids);

        staff(&mut host, &mut memory, &mut task);
        run(&mut host, &mut memory, &mut task);

        assert!(!task.done);
        assert!(host.actions.is_empty());
    }
}
