use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::budget::TimeBudget;
use crate::middleware::ScheduleRefiner;
use crate::model::{InvariantError, ProblemInstance, Schedule};
use crate::sgs::{CompactProblem, Fitness, Solution};

/// Particle swarm optimization on a continuous relaxation: each particle
/// holds a priority weight and a team selector in `[0, 1]` per task. Weights
/// are decoded to a discrete solution by sorting tasks on their weights and
/// mapping each selector onto the task's compatible team list.
///
/// Positions escaping `[0, 1]` are clamped and their velocity component
/// reflected at half strength.
#[derive(Debug, Clone)]
pub struct PsoSearch {
    pub swarm_size: usize,
    pub max_iterations: u64,
    /// Inertia weight.
    pub w: f64,
    /// Cognitive (personal best) pull.
    pub c1: f64,
    /// Social (global best) pull.
    pub c2: f64,
    pub seed: u64,
}

impl Default for PsoSearch {
    fn default() -> Self {
        Self {
            swarm_size: 100,
            max_iterations: 200,
            w: 0.4,
            c1: 1.5,
            c2: 2.0,
            seed: 8,
        }
    }
}

struct Particle {
    /// Task priority weights followed by team selectors, both per task.
    position: Vec<f64>,
    velocity: Vec<f64>,
    best_position: Vec<f64>,
    best_fitness: Option<Fitness>,
}

impl PsoSearch {
    fn decode_position(compact: &CompactProblem, position: &[f64]) -> Solution {
        let n = compact.num_tasks();
        let mut order: Vec<usize> = compact.tasks_with_teams().to_vec();
        order.sort_by(|&a, &b| {
            position[a]
                .partial_cmp(&position[b])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut teams = vec![0usize; n];
        for &task in compact.tasks_with_teams() {
            let options = compact.compatible_teams(task);
            let slot = ((position[n + task].clamp(0.0, 1.0) * options.len() as f64) as usize)
                .min(options.len() - 1);
            teams[task] = options[slot];
        }
        Solution::new(order, teams)
    }

    /// The position whose decode reproduces `solution`, used to plant the
    /// seed schedule in the swarm.
    fn encode(compact: &CompactProblem, solution: &Solution) -> Vec<f64> {
        let n = compact.num_tasks();
        let mut position = vec![0.5; 2 * n];
        for (rank, &task) in solution.task_order.iter().enumerate() {
            if task < n {
                position[task] = (rank as f64 + 0.5) / solution.task_order.len().max(1) as f64;
            }
        }
        for &task in compact.tasks_with_teams() {
            let options = compact.compatible_teams(task);
            let slot = options
                .iter()
                .position(|&team| team == solution.team_assignment[task])
                .unwrap_or(0);
            position[n + task] = (slot as f64 + 0.5) / options.len() as f64;
        }
        position
    }
}

impl ScheduleRefiner for PsoSearch {
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
        let dims = 2 * compact.num_tasks();

        let lifted = compact.lift(&seed, &mut rng);
        let seed_fitness = compact.evaluate(&lifted);

        let mut swarm: Vec<Particle> = (0..self.swarm_size.max(1))
            .map(|index| {
                let position = if index == 0 {
                    Self::encode(&compact, &lifted)
                } else {
                    (0..dims).map(|_| rng.gen::<f64>()).collect()
                };
                let velocity = (0..dims).map(|_| rng.gen::<f64>() * 0.2 - 0.1).collect();
                Particle {
                    best_position: position.clone(),
                    position,
                    velocity,
                    best_fitness: None,
                }
            })
            .collect();

        let mut global_best_position = swarm[0].position.clone();
        let mut global_best_fitness = seed_fitness;

        let mut iteration = 0;
        while iteration < self.max_iterations && !budget.is_expired() {
            for particle in &mut swarm {
                let solution = Self::decode_position(&compact, &particle.position);
                let fitness = compact.evaluate(&solution);

                if particle.best_fitness.map_or(true, |best| fitness < best) {
                    particle.best_fitness = Some(fitness);
                    particle.best_position = particle.position.clone();
                }
                if fitness < global_best_fitness {
                    global_best_fitness = fitness;
                    global_best_position = particle.position.clone();
                }
            }

            for particle in &mut swarm {
                for dim in 0..dims {
                    let r1 = rng.gen::<f64>();
                    let r2 = rng.gen::<f64>();
                    particle.velocity[dim] = self.w * particle.velocity[dim]
                        + self.c1 * r1 * (particle.best_position[dim] - particle.position[dim])
                        + self.c2 * r2 * (global_best_position[dim] - particle.position[dim]);
                    particle.position[dim] += particle.velocity[dim];
                    if particle.position[dim] < 0.0 || particle.position[dim] > 1.0 {
                        particle.position[dim] = particle.position[dim].clamp(0.0, 1.0);
                        particle.velocity[dim] *= -0.5;
                    }
                }
            }
            iteration += 1;
        }
        debug!(
            "particle swarm stopped after {iteration} iterations: \
             {} tasks, makespan {}, cost {}",
            global_best_fitness.scheduled(),
            global_best_fitness.makespan(),
            global_best_fitness.total_cost()
        );

        if global_best_fitness < seed_fitness {
            let best = Self::decode_position(&compact, &global_best_position);
            Ok(Schedule::new(compact.decode(&best)))
        } else {
            Ok(seed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::validate_schedule;
    use crate::middleware::tabu_search::tests::{bad_seed, open_shop};

    #[test]
    fn encode_then_decode_reproduces_the_solution() {
        let compact = CompactProblem::new(&open_shop()).unwrap();
        let solution = Solution::new(vec![2, 0, 3, 1], vec![1, 0, 1, 0]);
        let decoded = PsoSearch::decode_position(&compact, &PsoSearch::encode(&compact, &solution));
        assert_eq!(decoded.task_order, solution.task_order);
        assert_eq!(decoded.team_assignment, solution.team_assignment);
    }

    #[test]
    fn improves_a_single_team_schedule() {
        let problem = open_shop();
        let compact = CompactProblem::new(&problem).unwrap();
        let seed = bad_seed();
        let seed_fitness = compact.fitness_of(&seed.assignments);

        let refined = PsoSearch {
            swarm_size: 30,
            max_iterations: 50,
            ..PsoSearch::default()
        }
        .refine(&problem, seed, TimeBudget::unlimited())
        .unwrap();

        let fitness = compact.fitness_of(&refined.assignments);
        assert!(fitness <= seed_fitness);
        assert_eq!(fitness.scheduled(), 4);
        assert!(validate_schedule(&problem, &refined).is_valid);
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let problem = open_shop();
        let pso = PsoSearch {
            swarm_size: 20,
            max_iterations: 20,
            ..PsoSearch::default()
        };
        let first = pso
            .refine(&problem, bad_seed(), TimeBudget::unlimited())
            .unwrap();
        let second = pso
            .refine(&problem, bad_seed(), TimeBudget::unlimited())
            .unwrap();
        assert_eq!(first, second);
    }
}
