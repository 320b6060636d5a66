//! Random instance generation for tests and benchmarks.

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{ProblemInstance, Task, Team};

/// Shape of a generated instance. Dependencies only run from lower to
/// higher task ids, so generated instances are always acyclic.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub num_tasks: u32,
    pub num_teams: u32,
    /// Probability of a dependency edge between any ordered task pair.
    pub dependency_ratio: f64,
    /// Probability that a given team is compatible with a given task. Every
    /// task is guaranteed at least one compatible team regardless.
    pub compatibility_ratio: f64,
    pub max_duration: u64,
    pub max_start_time: u64,
    pub max_cost: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_tasks: 20,
            num_teams: 4,
            dependency_ratio: 0.2,
            compatibility_ratio: 0.5,
            max_duration: 100,
            max_start_time: 100,
            max_cost: 100,
        }
    }
}

/// Builds a continuous-indexed instance from `config`, deterministically
/// for a given `seed`.
pub fn generate_instance(config: &GeneratorConfig, seed: u64) -> ProblemInstance {
    let mut rng = StdRng::seed_from_u64(seed);

    let teams: HashMap<_, _> = (0..config.num_teams)
        .map(|id| {
            (
                id,
                Team {
                    id,
                    available_from: rng.gen_range(0..=config.max_start_time),
                },
            )
        })
        .collect();

    let mut tasks: HashMap<_, _> = (0..config.num_tasks)
        .map(|id| {
            let mut task = Task::new(id, rng.gen_range(1..=config.max_duration.max(1)));
            for team in 0..config.num_teams {
                if rng.gen_bool(config.compatibility_ratio) {
                    task.compatible_teams
                        .insert(team, rng.gen_range(1..=config.max_cost.max(1)));
                }
            }
            if task.compatible_teams.is_empty() && config.num_teams > 0 {
                let team = rng.gen_range(0..config.num_teams);
                task.compatible_teams
                    .insert(team, rng.gen_range(1..=config.max_cost.max(1)));
            }
            (id, task)
        })
        .collect();

    for from in 0..config.num_tasks {
        for to in from + 1..config.num_tasks {
            if rng.gen_bool(config.dependency_ratio) {
                if let Some(task) = tasks.get_mut(&from) {
                    task.successors.push(to);
                }
                if let Some(task) = tasks.get_mut(&to) {
                    task.predecessors.push(from);
                }
            }
        }
    }

    ProblemInstance::new(tasks, teams)
}
