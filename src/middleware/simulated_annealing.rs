use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::budget::TimeBudget;
use crate::middleware::ScheduleRefiner;
use crate::model::{InvariantError, ProblemInstance, Schedule};
use crate::sgs::{CompactProblem, Solution};

/// Simulated annealing over the priority-order representation.
///
/// The temperature follows the remaining time budget linearly, so the walk
/// is exploratory early and greedy near the deadline. Without a budget the
/// schedule cools over a fixed iteration count instead. Acceptance uses the
/// scalar [`crate::sgs::Fitness::energy`] collapse of the lexicographic
/// objective.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing {
    pub initial_temperature: f64,
    pub max_iterations: u64,
    pub seed: u64,
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self {
            initial_temperature: 1000.0,
            max_iterations: 10_000,
            seed: 42,
        }
    }
}

impl SimulatedAnnealing {
    fn neighbor(&self, compact: &CompactProblem, current: &Solution, rng: &mut StdRng) -> Solution {
        // Order swap or team reassignment with equal probability.
        if current.task_order.len() >= 2 && rng.gen_bool(0.5) {
            let picked = rand::seq::index::sample(rng, current.task_order.len(), 2);
            let mut order = current.task_order.clone();
            order.swap(picked.index(0), picked.index(1));
            return Solution::new(order, current.team_assignment.clone());
        }
        let mut teams = current.team_assignment.clone();
        if let Some(&task) = compact.tasks_with_teams().choose(rng) {
            if let Some(&team) = compact.compatible_teams(task).choose(rng) {
                teams[task] = team;
            }
        }
        Solution::new(current.task_order.clone(), teams)
    }
}

impl ScheduleRefiner for SimulatedAnnealing {
    fn refine(
        &self,
        problem: &ProblemInstance,
        seed: Schedule,
        budget: TimeBudget,
    ) -> Result<Schedule, InvariantError> {
        let compact = CompactProblem::new(problem)?;
        if compact.tasks_with_teams().is_empty() {
            return Ok(seed);
        }
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut current = compact.lift(&seed, &mut rng);
        let mut current_fitness = compact.evaluate(&current);
        let mut best = current.clone();
        let mut best_fitness = current_fitness;
        let seed_fitness = current_fitness;

        let mut iteration: u64 = 0;
        loop {
            let fraction_left = if budget.is_limited() {
                if budget.is_expired() {
                    break;
                }
                budget.fraction_remaining()
            } else {
                if iteration >= self.max_iterations {
                    break;
                }
                1.0 - iteration as f64 / self.max_iterations as f64
            };
            let temperature = self.initial_temperature * fraction_left;

            let candidate = self.neighbor(&compact, &current, &mut rng);
            let candidate_fitness = compact.evaluate(&candidate);
            let delta = candidate_fitness.energy() - current_fitness.energy();
            let accept = delta < 0.0
                || (temperature > 0.0 && rng.gen::<f64>() < (-delta / temperature).exp());
            if accept {
                current = candidate;
                current_fitness = candidate_fitness;
                if current_fitness < best_fitness {
                    best = current.clone();
                    best_fitness = current_fitness;
                }
            }
            iteration += 1;
        }
        debug!(
            "annealing stopped after {iteration} iterations: {} tasks, makespan {}, cost {}",
            best_fitness.scheduled(),
            best_fitness.makespan(),
            best_fitness.total_cost()
        );

        if best_fitness < seed_fitness {
            Ok(Schedule::new(compact.decode(&best)))
        } else {
            Ok(seed)
        }
    }
}
