use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::budget::TimeBudget;
use crate::middleware::ScheduleRefiner;
use crate::model::{InvariantError, ProblemInstance, Schedule};
use crate::sgs::{CompactProblem, Solution};

/// Genetic search: order crossover (OX) on the task permutation, uniform
/// crossover on team assignments, swap and reassignment mutation. The
/// population grows with offspring each generation and is truncated back to
/// its initial size whenever it exceeds the cap.
#[derive(Debug, Clone)]
pub struct GaSearch {
    pub initial_population: usize,
    pub max_population: usize,
    pub max_generations: u64,
    pub mutation_rate: f64,
    pub seed: u64,
}

impl Default for GaSearch {
    fn default() -> Self {
        Self {
            initial_population: 50,
            max_population: 200,
            max_generations: 100,
            mutation_rate: 0.1,
            seed: 8,
        }
    }
}

impl GaSearch {
    fn random_solution(&self, compact: &CompactProblem, rng: &mut StdRng) -> Solution {
        let mut order: Vec<usize> = compact.tasks_with_teams().to_vec();
        order.shuffle(rng);
        let mut teams = vec![0usize; compact.num_tasks()];
        for &task in compact.tasks_with_teams() {
            if let Some(&team) = compact.compatible_teams(task).choose(rng) {
                teams[task] = team;
            }
        }
        Solution::new(order, teams)
    }

    /// OX: copy a slice of the first parent, fill the rest with the second
    /// parent's tasks in their relative order.
    fn order_crossover(a: &[usize], b: &[usize], rng: &mut StdRng) -> Vec<usize> {
        let n = a.len();
        if n < 2 {
            return a.to_vec();
        }
        let picked = rand::seq::index::sample(rng, n, 2);
        let (lo, hi) = (
            picked.index(0).min(picked.index(1)),
            picked.index(0).max(picked.index(1)),
        );
        let window: hashbrown::HashSet<usize> = a[lo..=hi].iter().copied().collect();

        let mut child = Vec::with_capacity(n);
        let mut filler = b.iter().filter(|tid| !window.contains(*tid));
        for position in 0..n {
            if position >= lo && position <= hi {
                child.push(a[position]);
            } else if let Some(&tid) = filler.next() {
                child.push(tid);
            }
        }
        child
    }

    fn crossover(
        &self,
        compact: &CompactProblem,
        a: &Solution,
        b: &Solution,
        rng: &mut StdRng,
    ) -> Solution {
        let order = Self::order_crossover(&a.task_order, &b.task_order, rng);
        let teams = (0..compact.num_tasks())
            .map(|task| {
                if rng.gen_bool(0.5) {
                    a.team_assignment[task]
                } else {
                    b.team_assignment[task]
                }
            })
            .collect();
        Solution::new(order, teams)
    }

    fn mutate(&self, compact: &CompactProblem, child: Solution, rng: &mut StdRng) -> Solution {
        let mut order = child.task_order;
        let mut teams = child.team_assignment;
        if order.len() >= 2 && rng.gen_bool(self.mutation_rate) {
            let picked = rand::seq::index::sample(rng, order.len(), 2);
            order.swap(picked.index(0), picked.index(1));
        }
        if rng.gen_bool(self.mutation_rate) {
            if let Some(&task) = compact.tasks_with_teams().choose(rng) {
                if let Some(&team) = compact.compatible_teams(task).choose(rng) {
                    teams[task] = team;
                }
            }
        }
        Solution::new(order, teams)
    }
}

impl ScheduleRefiner for GaSearch {
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

        let lifted = compact.lift(&seed, &mut rng);
        let seed_fitness = compact.evaluate(&lifted);
        let mut population = vec![lifted];
        while population.len() < self.initial_population.max(2) {
            population.push(self.random_solution(&compact, &mut rng));
        }

        let mut generation = 0;
        while generation < self.max_generations && !budget.is_expired() {
            let offspring_count = population.len();
            for _ in 0..offspring_count {
                let parents = rand::seq::index::sample(&mut rng, population.len(), 2);
                let child = self.crossover(
                    &compact,
                    &population[parents.index(0)],
                    &population[parents.index(1)],
                    &mut rng,
                );
                population.push(self.mutate(&compact, child, &mut rng));
            }

            if population.len() > self.max_population {
                population.sort_by_key(|solution| compact.evaluate(solution));
                population.truncate(self.initial_population.max(2));
            }
            generation += 1;
        }

        population.sort_by_key(|solution| compact.evaluate(solution));
        let best = &population[0];
        let best_fitness = compact.evaluate(best);
        debug!(
            "genetic search stopped after {generation} generations: \
             {} tasks, makespan {}, cost {}",
            best_fitness.scheduled(),
            best_fitness.makespan(),
            best_fitness.total_cost()
        );

        if best_fitness < seed_fitness {
            Ok(Schedule::new(compact.decode(best)))
        } else {
            Ok(seed)
        }
    }
}
