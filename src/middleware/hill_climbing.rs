use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::budget::TimeBudget;
use crate::middleware::ScheduleRefiner;
use crate::model::{InvariantError, ProblemInstance, Schedule};
use crate::sgs::{CompactProblem, Solution};

/// First-improvement hill climbing. Each iteration probes a handful of
/// random order swaps and team reassignments, keeping any candidate that
/// strictly improves the incumbent. Stops at the iteration cap, when the
/// budget runs out, or silently earlier when no probe finds an improvement.
#[derive(Debug, Clone)]
pub struct HillClimbing {
    pub iterations: u64,
    pub team_tries: usize,
    pub seed: u64,
}

impl Default for HillClimbing {
    fn default() -> Self {
        Self {
            iterations: 50,
            team_tries: 10,
            seed: 42,
        }
    }
}

impl ScheduleRefiner for HillClimbing {
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
        let seed_fitness = current_fitness;
        let swap_tries = current.task_order.len().min(20);

        let mut iteration = 0;
        while iteration < self.iterations && !budget.is_expired() {
            let mut improved = false;

            if current.task_order.len() >= 2 {
                for _ in 0..swap_tries {
                    let picked =
                        rand::seq::index::sample(&mut rng, current.task_order.len(), 2);
                    let mut order = current.task_order.clone();
                    order.swap(picked.index(0), picked.index(1));
                    let candidate = Solution::new(order, current.team_assignment.clone());
                    if compact.evaluate(&candidate) < current_fitness {
                        current_fitness = compact.evaluate(&candidate);
                        current = candidate;
                        improved = true;
                    }
                }
            }

            for _ in 0..self.team_tries {
                let Some(&task) = compact.tasks_with_teams().choose(&mut rng) else {
                    break;
                };
                let Some(&team) = compact.compatible_teams(task).choose(&mut rng) else {
                    continue;
                };
                if team == current.team_assignment[task] {
                    continue;
                }
                let mut teams = current.team_assignment.clone();
                teams[task] = team;
                let candidate = Solution::new(current.task_order.clone(), teams);
                if compact.evaluate(&candidate) < current_fitness {
                    current_fitness = compact.evaluate(&candidate);
                    current = candidate;
                    improved = true;
                }
            }

            iteration += 1;
            if !improved {
                break;
            }
        }
        debug!(
            "hill climbing stopped after {iteration} iterations: {} tasks, makespan {}, cost {}",
            current_fitness.scheduled(),
            current_fitness.makespan(),
            current_fitness.total_cost()
        );

        if current_fitness < seed_fitness {
            Ok(Schedule::new(compact.decode(&current)))
        } else {
            Ok(seed)
        }
    }
}
