//! Strategist - decides what new work a galaxy needs
//!
//! Each rule looks at the galaxy's owned structures, its planets and the
//! tasks already queued, and appends a task only when the need is neither
//! queued nor already satisfied. Running the strategist twice on the same
//! world state therefore never enqueues the same work twice.

use crate::config::{BuildRule, StockpileRule, StrategyConfig};
use crate::host::{Galaxy, Structure};
use crate::snapshot::EntitySnapshot;
use crate::tasks::{IdGenerator, Task, TaskKind};

/// Apply every configured rule to one galaxy. Returns the number of tasks added.
pub fn plan_galaxy(
    galaxy: &Galaxy,
    snapshot: &EntitySnapshot,
    config: &StrategyConfig,
    tasks: &mut Vec<Task>,
    ids: &mut IdGenerator,
) -> usize {
    let owned: Vec<&Structure> = snapshot.structures_in(galaxy.id).collect();
    let before = tasks.len();

    for rule in &config.build_rules {
        if let Some(task) = plan_build(galaxy, &owned, rule, tasks, ids) {
            log::info!("{}: queued {}", galaxy.name, task.label());
            tasks.push(task);
        }
    }

    for rule in &config.stockpile_rules {
        if let Some(task) = plan_stockpile(galaxy, &owned, rule, tasks, ids) {
            log::info!("{}: queued {}", galaxy.name, task.label());
            tasks.push(task);
        }
    }

    tasks.len() - before
}

/// Build `rule.structure_type` if the galaxy has none and none is queued.
fn plan_build(
    galaxy: &Galaxy,
    owned: &[&Structure],
    rule: &BuildRule,
    tasks: &[Task],
    ids: &mut IdGenerator,
) -> Option<Task> {
    if owned
        .iter()
        .any(|s| s.structure_type == rule.structure_type)
    {
        return None;
    }

    let queued = tasks.iter().any(|t| {
        matches!(&t.kind, TaskKind::Build(b) if b.structure_type == rule.structure_type)
    });
    if queued {
        return None;
    }

    let Some(planet) = galaxy.planets_with_resource(&rule.required_resource).next() else {
        log::warn!(
            "Galaxy {} has no {} for a {}",
            galaxy.name,
            rule.required_resource,
            rule.structure_type
        );
        return None;
    };

    Some(Task::build(
        ids,
        galaxy.id,
        &planet.name,
        &rule.structure_type,
        rule.ship_count,
    ))
}

/// Fill a completed storage structure with `rule.resource`.
///
/// Only storage with room for a whole `rule.amount` load qualifies; a full
/// storage satisfies the rule until something is taken out of it.
fn plan_stockpile(
    galaxy: &Galaxy,
    owned: &[&Structure],
    rule: &StockpileRule,
    tasks: &[Task],
    ids: &mut IdGenerator,
) -> Option<Task> {
    let storage = owned.iter().find(|s| {
        s.structure_type == rule.storage_type
            && !s.is_construction_site()
            && s.storage_available() >= rule.amount
    })?;

    let queued = tasks.iter().any(|t| {
        matches!(&t.kind, TaskKind::Harvest(h) if h.resource_type == rule.resource)
    });
    if queued {
        return None;
    }

    let Some(planet) = galaxy.planets_with_resource(&rule.resource).next() else {
        log::warn!(
            "Galaxy {} has no {} to stockpile",
            galaxy.name,
            rule.resource
        );
        return None;
    };

    Some(Task::harvest(
        ids,
        galaxy.id,
        &planet.name,
        &rule.resource,
        rule.amount,
        Some(storage.id),
        rule.ship_count,
    ))
}
