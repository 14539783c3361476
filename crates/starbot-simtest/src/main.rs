//! Starbot Headless Simulation Harness
//!
//! Runs the controller against a generated in-process universe and checks
//! the task queue invariants after every tick.
//!
//! Usage:
//!   cargo run -p starbot-simtest
//!   cargo run -p starbot-simtest -- --verbose --ticks 500 --seed 7
//!   cargo run -p starbot-simtest -- --config bot.json --memory memory.json

mod universe;

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use starbot_core::constants::{resources, structures};
use starbot_core::persistence::{load_snapshot, save_snapshot};
use starbot_core::prelude::*;

use universe::{Universe, UniverseConfig};

const DEFAULT_TICKS: u64 = 300;
const DEFAULT_SEED: u64 = 42;
const GALAXIES: u64 = 3;
const SHIPS_PER_GALAXY: u64 = 6;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    ticks: u64,
    seed: u64,
    config_path: Option<String>,
    memory_path: Option<String>,
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_options() -> Options {
    let args: Vec<String> = std::env::args().collect();
    Options {
        verbose: args.iter().any(|a| a == "--verbose"),
        ticks: arg_value(&args, "--ticks")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TICKS),
        seed: arg_value(&args, "--seed")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SEED),
        config_path: arg_value(&args, "--config"),
        memory_path: arg_value(&args, "--memory"),
    }
}

fn main() {
    let options = parse_options();
    let level = if options.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    println!("=== Starbot Simulation Harness ===\n");

    let config = match &options.config_path {
        Some(path) => match ControllerConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path, e);
                std::process::exit(2);
            }
        },
        None => default_config(options.seed),
    };

    let mut results = Vec::new();

    // 1. Long run with invariant checks every tick
    let memory = match &options.memory_path {
        Some(path) => {
            let mut store = JsonFileStore::new(path);
            validate_run(&options, &config, &mut store, &mut results)
        }
        None => {
            let mut store = InMemoryStore::new();
            validate_run(&options, &config, &mut store, &mut results)
        }
    };

    // 2. Checkpoint round trip of the final memory
    results.extend(validate_checkpoint(&memory));

    // 3. Seeded runs are reproducible
    results.extend(validate_determinism(&options, &config));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || options.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

/// One factory per galaxy plus a metal stockpile into each galaxy's storage.
fn default_config(seed: u64) -> ControllerConfig {
    ControllerConfig {
        seed: Some(seed),
        strategy: StrategyConfig {
            build_rules: vec![BuildRule::default()],
            stockpile_rules: vec![StockpileRule {
                resource: resources::METAL.to_string(),
                amount: 30,
                ship_count: 2,
                storage_type: structures::STORAGE.to_string(),
            }],
        },
        ..ControllerConfig::default()
    }
}

fn universe_config(seed: u64) -> UniverseConfig {
    UniverseConfig {
        seed,
        galaxies: GALAXIES,
        ships_per_galaxy: SHIPS_PER_GALAXY,
    }
}

// ── 1. Controller run ───────────────────────────────────────────────────

/// Tally of invariant violations over the whole run
#[derive(Default)]
struct Violations {
    double_bound: usize,
    done_left_queued: usize,
    over_staffed: usize,
    lost_ships: usize,
    stale_records: usize,
}

fn check_tick(
    memory: &Memory,
    universe: &Universe,
    staffing: &mut BTreeMap<String, usize>,
    destroyed: &BTreeSet<ShipId>,
    violations: &mut Violations,
) {
    let mut bound = BTreeSet::new();
    let mut seen = BTreeMap::new();

    for task in memory.galaxies.values().flat_map(|g| g.task_list.iter()) {
        if task.done {
            violations.done_left_queued += 1;
        }
        if task.ship_ids.len() > task.required_ship_count {
            violations.over_staffed += 1;
        }
        for ship in &task.ship_ids {
            if !bound.insert(*ship) {
                violations.double_bound += 1;
            }
        }
        // A task may only shrink when one of its ships was destroyed
        if let Some(before) = staffing.get(&task.id) {
            let dropped = before.saturating_sub(task.ship_ids.len());
            if dropped > 0 && destroyed.is_empty() {
                violations.lost_ships += 1;
            }
        }
        seen.insert(task.id.clone(), task.ship_ids.len());
    }
    *staffing = seen;

    let live: BTreeSet<ShipId> = universe.ship_ids().into_iter().collect();
    violations.stale_records += memory.ships.keys().filter(|id| !live.contains(id)).count();
}

fn validate_run<S: MemoryStore>(
    options: &Options,
    config: &ControllerConfig,
    store: &mut S,
    results: &mut Vec<TestResult>,
) -> Memory {
    println!("--- Controller Run ({} ticks, seed {}) ---", options.ticks, options.seed);

    let mut universe = Universe::generate(universe_config(options.seed));
    let mut controller = Controller::new(config.clone());
    let mut rng = StdRng::seed_from_u64(options.seed ^ 0x5eed);
    let mut staffing = BTreeMap::new();
    let mut violations = Violations::default();
    let mut totals = TickSummary::default();
    let mut memory = Memory::default();
    let mut store_error = None;

    for tick in 0..options.ticks {
        // Lose a ship a third of the way in
        let mut destroyed = BTreeSet::new();
        if tick == options.ticks / 3 {
            if let Some(victim) = universe.ship_ids().choose(&mut rng).copied() {
                universe.destroy_ship(victim);
                destroyed.insert(victim);
                log::info!("Tick {}: destroyed ship {}", tick, victim);
            }
        }

        let summary = match controller.tick_with_store(&mut universe, store) {
            Ok(summary) => summary,
            Err(e) => {
                store_error = Some(e.to_string());
                break;
            }
        };
        memory = match store.load() {
            Ok(memory) => memory,
            Err(e) => {
                store_error = Some(e.to_string());
                break;
            }
        };

        check_tick(&memory, &universe, &mut staffing, &destroyed, &mut violations);
        totals.tasks_created += summary.tasks_created;
        totals.tasks_completed += summary.tasks_completed;
        totals.ships_released += summary.ships_released;
        universe.end_tick();
    }

    results.push(TestResult {
        name: "store_io".into(),
        passed: store_error.is_none(),
        detail: store_error.unwrap_or_else(|| "memory loaded and saved every tick".into()),
    });
    results.push(TestResult {
        name: "binding_exclusive".into(),
        passed: violations.double_bound == 0,
        detail: format!("{} ships bound to two tasks", violations.double_bound),
    });
    results.push(TestResult {
        name: "queue_compacted".into(),
        passed: violations.done_left_queued == 0,
        detail: format!("{} done tasks left queued", violations.done_left_queued),
    });
    results.push(TestResult {
        name: "staffing_bounded".into(),
        passed: violations.over_staffed == 0,
        detail: format!("{} tasks over their ship count", violations.over_staffed),
    });
    results.push(TestResult {
        name: "staffing_monotonic".into(),
        passed: violations.lost_ships == 0,
        detail: format!("{} tasks lost ships without a loss event", violations.lost_ships),
    });
    results.push(TestResult {
        name: "memory_pruned".into(),
        passed: violations.stale_records == 0,
        detail: format!("{} stale ship records", violations.stale_records),
    });
    results.push(TestResult {
        name: "one_action_per_tick".into(),
        passed: universe.double_actions == 0,
        detail: format!(
            "{} second actions, {} refused actions",
            universe.double_actions, universe.rejected_actions
        ),
    });

    // Outcome checks only make sense for the built-in policy
    if options.config_path.is_none() {
        for gid in universe.galaxy_ids() {
            let barren = gid == GALAXIES;
            let factories = universe.structures_of(gid, structures::FACTORY);
            let finished = factories.iter().filter(|(_, complete)| *complete).count();
            results.push(TestResult {
                name: format!("galaxy_{}_factory", gid),
                passed: if barren { factories.is_empty() } else { finished == 1 },
                detail: format!("{} factories, {} finished", factories.len(), finished),
            });

            if !barren {
                let stored: u32 = universe
                    .structures_of(gid, structures::STORAGE)
                    .iter()
                    .map(|(id, _)| universe.stored(*id, resources::METAL))
                    .sum();
                results.push(TestResult {
                    name: format!("galaxy_{}_stockpile", gid),
                    passed: stored > 0,
                    detail: format!("{} metal in storage", stored),
                });
            }
        }
    }

    results.push(TestResult {
        name: "tasks_flow".into(),
        passed: totals.tasks_created > 0 && totals.tasks_completed > 0,
        detail: format!(
            "{} created, {} completed, {} ships released",
            totals.tasks_created, totals.tasks_completed, totals.ships_released
        ),
    });

    memory
}

// ── 2. Checkpoints ──────────────────────────────────────────────────────

fn validate_checkpoint(memory: &Memory) -> Vec<TestResult> {
    println!("--- Checkpoint ---");
    let mut buffer = Vec::new();
    let outcome = save_snapshot(&mut buffer, 0, memory).and_then(|_| load_snapshot(&buffer[..]));

    vec![match outcome {
        Ok(checkpoint) => TestResult {
            name: "checkpoint_roundtrip".into(),
            passed: checkpoint.memory == *memory,
            detail: format!("{} bytes", buffer.len()),
        },
        Err(e) => TestResult {
            name: "checkpoint_roundtrip".into(),
            passed: false,
            detail: e.to_string(),
        },
    }]
}

// ── 3. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(options: &Options, config: &ControllerConfig) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let ticks = options.ticks.min(50);
    let run = || {
        let mut universe = Universe::generate(universe_config(options.seed));
        let mut controller = Controller::new(config.clone());
        let mut memory = Memory::new();
        for _ in 0..ticks {
            controller.tick(&mut universe, &mut memory);
            universe.end_tick();
        }
        memory
    };

    let reproducible = config.seed.is_some();
    let same = run() == run();
    vec![TestResult {
        name: "seeded_runs_match".into(),
        passed: same || !reproducible,
        detail: if reproducible {
            format!("{} ticks compared", ticks)
        } else {
            "no seed configured, skipped".into()
        },
    }]
}
