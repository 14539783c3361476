//! Scheduler - the per-galaxy pass run once every tick
//!
//! For each indexed galaxy: run the strategist, resolve each queued task's
//! ships against the snapshot, step the task with its executor, then drop
//! every task that finished. The galaxy's task list is taken out of memory
//! for the duration of the pass so executors can update ship records freely.

use crate::config::ControllerConfig;
use crate::host::{Galaxy, Host};
use crate::memory::Memory;
use crate::snapshot::EntitySnapshot;
use crate::strategy;
use crate::tasks::build::execute_build_task;
use crate::tasks::harvest::execute_harvest_task;
use crate::tasks::{IdGenerator, Task, TaskKind};

/// Everything an executor may touch during one tick.
///
/// Built fresh by the controller each tick and handed down explicitly; no
/// component reaches for global state.
pub struct TickContext<'a, H: Host + ?Sized> {
    pub host: &'a mut H,
    pub snapshot: &'a EntitySnapshot,
    pub memory: &'a mut Memory,
}

/// Counters for one scheduling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub galaxies: usize,
    pub tasks_created: usize,
    pub tasks_completed: usize,
    /// Tasks left queued after compaction, over all processed galaxies
    pub tasks_active: usize,
    pub ships_released: usize,
}

/// Run the pass over every galaxy in the snapshot.
pub fn run<H: Host + ?Sized>(
    ctx: &mut TickContext<'_, H>,
    config: &ControllerConfig,
    ids: &mut IdGenerator,
) -> TickSummary {
    let snapshot = ctx.snapshot;
    let mut summary = TickSummary::default();

    for galaxy in snapshot.galaxies.values() {
        run_galaxy(galaxy, ctx, config, ids, &mut summary);
    }

    summary
}

pub fn run_galaxy<H: Host + ?Sized>(
    galaxy: &Galaxy,
    ctx: &mut TickContext<'_, H>,
    config: &ControllerConfig,
    ids: &mut IdGenerator,
    summary: &mut TickSummary,
) {
    let snapshot = ctx.snapshot;
    let mut tasks = std::mem::take(&mut ctx.memory.galaxy_mut(galaxy.id).task_list);

    summary.galaxies += 1;
    summary.tasks_created +=
        strategy::plan_galaxy(galaxy, snapshot, &config.strategy, &mut tasks, ids);

    for task in tasks.iter_mut() {
        if task.done {
            continue;
        }
        task.ship_ids.retain(|id| snapshot.ships.contains_key(id));
        dispatch(task, ctx);
    }

    for task in tasks.iter().filter(|t| t.done) {
        summary.tasks_completed += 1;
        log::info!("{}: completed {}", galaxy.name, task.label());
        if config.release_ships_on_completion {
            summary.ships_released += ctx.memory.release_task(task);
        }
    }
    tasks.retain(|t| !t.done);

    summary.tasks_active += tasks.len();
    ctx.memory.galaxy_mut(galaxy.id).task_list = tasks;
}

fn dispatch<H: Host + ?Sized>(task: &mut Task, ctx: &mut TickContext<'_, H>) {
    match task.kind {
        TaskKind::Harvest(_) => execute_harvest_task(task, ctx),
        TaskKind::Build(_) => execute_build_task(task, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    const G: u64 = 3;

    fn world() -> ScriptedHost {
        ScriptedHost::new()
            .with_galaxy(galaxy(
                G,
                "Sol",
                vec![
                    planet("Terra", G, (0, 0)),
                    planet_with("Ferrum", G, (6, 0), &[("iron_ore", 80), ("metal", 40)]),
                ],
            ))
            .with_cost("factory", &[("iron_ore", 50)])
            .with_ship(ship(1, G, (0, 0)))
            .with_ship(ship(2, G, (0, 0)))
    }

    fn pass(
        host: &mut ScriptedHost,
        memory: &mut Memory,
        config: &ControllerConfig,
        ids: &mut IdGenerator,
    ) -> TickSummary {
        let snapshot = EntitySnapshot::capture(&*host);
        memory.init(&snapshot);
        let mut ctx = TickContext {
            host,
            snapshot: &snapshot,
            memory,
        };
        run(&mut ctx, config, ids)
    }

    fn queue(memory: &Memory) -> &[Task] {
        &memory.galaxy(G).unwrap().task_list
    }

    #[test]
    fn test_first_pass_creates_and_starts_build() {
        let mut host = world();
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(5));

        let summary = pass(&mut host, &mut memory, &ControllerConfig::default(), &mut ids);

        assert_eq!(summary.galaxies, 1);
        assert_eq!(summary.tasks_created, 1);
        assert_eq!(summary.tasks_active, 1);
        assert_eq!(queue(&memory)[0].ship_ids, vec![1]);
        // Bound this pass, acting from the next one
        assert!(host.actions.is_empty());

        let summary = pass(&mut host, &mut memory, &ControllerConfig::default(), &mut ids);

        assert_eq!(summary.tasks_created, 0);
        // Ship 1 heads for the iron, ship 2 stays idle
        assert_eq!(host.actions_for(1).len(), 1);
        assert!(host.actions_for(2).is_empty());
    }

    #[test]
    fn test_dead_ships_are_dropped_before_execution() {
        let mut host = world();
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(5));
        let config = ControllerConfig::default();
        pass(&mut host, &mut memory, &config, &mut ids);

        host.remove_ship(1);
        host.take_actions();
        pass(&mut host, &mut memory, &config, &mut ids);

        // Ship 1 is gone; the freed slot goes to ship 2
        assert_eq!(queue(&memory)[0].ship_ids, vec![2]);
        assert!(host.actions.iter().all(|a| a.ship() == 2));
    }

    #[test]
    fn test_done_tasks_are_compacted_and_released() {
        let mut host = world();
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(5));
        let config = ControllerConfig::default();
        pass(&mut host, &mut memory, &config, &mut ids);
        let task_id = queue(&memory)[0].id.clone();

        // Planet vanishes: the build is abandoned this pass
        host.galaxy_mut(G).unwrap().planets.retain(|p| p.name != "Terra");
        let summary = pass(&mut host, &mut memory, &config, &mut ids);

        assert_eq!(summary.tasks_completed, 1);
        assert_eq!(summary.ships_released, 1);
        assert!(queue(&memory).iter().all(|t| !t.done && t.id != task_id));
        assert_eq!(memory.task_of(1), None);
    }

    #[test]
    fn test_release_can_be_disabled() {
        let mut host = world();
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(5));
        let config = ControllerConfig {
            release_ships_on_completion: false,
            ..ControllerConfig::default()
        };
        pass(&mut host, &mut memory, &config, &mut ids);
        let task_id = queue(&memory)[0].id.clone();

        host.galaxy_mut(G).unwrap().planets.retain(|p| p.name != "Terra");
        let summary = pass(&mut host, &mut memory, &config, &mut ids);

        assert_eq!(summary.ships_released, 0);
        assert_eq!(memory.task_of(1), Some(task_id.as_str()));
    }

    #[test]
    fn test_done_task_never_steps_again() {
        let mut host = world();
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(5));
        let mut finished = Task::harvest(&mut ids, G, "Ferrum", "metal", 10, None, 1);
        finished.done = true;
        memory.galaxy_mut(G).task_list.push(finished);
        let config = ControllerConfig {
            strategy: crate::config::StrategyConfig {
                build_rules: vec![],
                stockpile_rules: vec![],
            },
            ..ControllerConfig::default()
        };

        let summary = pass(&mut host, &mut memory, &config, &mut ids);

        assert!(host.actions.is_empty());
        assert_eq!(summary.tasks_completed, 1);
        assert!(queue(&memory).is_empty());
    }

    #[test]
    fn test_queue_order_decides_who_acts() {
        let mut host = world();
        let mut memory = Memory::new();
        let mut ids = IdGenerator::new(Some(5));
        let first = Task::harvest(&mut ids, G, "Ferrum", "metal", 10, None, 1);
        let second = Task::harvest(&mut ids, G, "Ferrum", "metal", 10, None, 1);
        let (first_id, second_id) = (first.id.clone(), second.id.clone());
        memory.galaxy_mut(G).task_list.extend([first, second]);
        let config = ControllerConfig {
            strategy: crate::config::StrategyConfig {
                build_rules: vec![],
                stockpile_rules: vec![],
            },
            ..ControllerConfig::default()
        };

        pass(&mut host, &mut memory, &config, &mut ids);

        assert_eq!(memory.task_of(1), Some(first_id.as_str()));
        assert_eq!(memory.task_of(2), Some(second_id.as_str()));
    }
}
