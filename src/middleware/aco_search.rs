use hashbrown::HashMap;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::budget::TimeBudget;
use crate::middleware::ScheduleRefiner;
use crate::model::{Assignment, InvariantError, ProblemInstance, Schedule, TaskId, TeamId};
use crate::sgs::{Fitness, COST_INFEASIBLE};

/// Ant colony optimization. Ants walk the precedence graph building
/// schedules task by task; successor and team choices are biased by
/// pheromone trails and by heuristic desirability (short tasks, cheap
/// teams). The best ant of each iteration reinforces its trail.
///
/// Unlike the compact-representation refiners this one operates on the
/// sparse instance directly and tolerates non-continuous ids.
#[derive(Debug, Clone)]
pub struct AcoSearch {
    /// Pheromone exponent.
    pub alpha: f64,
    /// Heuristic exponent.
    pub beta: f64,
    /// Evaporation rate per iteration.
    pub rho: f64,
    pub ants: usize,
    pub max_iterations: u64,
    /// Deposit scale: an ant deposits `q / (1 + makespan)`.
    pub q: f64,
    pub seed: u64,
}

impl Default for AcoSearch {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 3.0,
            rho: 0.1,
            ants: 40,
            max_iterations: 100,
            q: 1000.0,
            seed: 8,
        }
    }
}

/// Trail keys: the order edge walked and the team chosen. `None` marks the
/// start of a walk.
type OrderEdge = (Option<TaskId>, TaskId);
type TeamChoice = (TaskId, TeamId);

struct Trails {
    order: HashMap<OrderEdge, f64>,
    team: HashMap<TeamChoice, f64>,
}

impl Trails {
    fn new() -> Self {
        Self {
            order: HashMap::new(),
            team: HashMap::new(),
        }
    }

    fn order_level(&self, edge: OrderEdge) -> f64 {
        self.order.get(&edge).copied().unwrap_or(1.0)
    }

    fn team_level(&self, choice: TeamChoice) -> f64 {
        self.team.get(&choice).copied().unwrap_or(1.0)
    }

    fn evaporate(&mut self, rho: f64) {
        for level in self.order.values_mut() {
            *level *= 1.0 - rho;
        }
        for level in self.team.values_mut() {
            *level *= 1.0 - rho;
        }
    }

    fn deposit(&mut self, walk: &[(OrderEdge, TeamChoice)], amount: f64) {
        for &(edge, choice) in walk {
            *self.order.entry(edge).or_insert(1.0) += amount;
            *self.team.entry(choice).or_insert(1.0) += amount;
        }
    }
}

fn weighted_pick<T: Copy>(choices: &[(T, f64)], rng: &mut StdRng) -> Option<T> {
    let total: f64 = choices.iter().map(|(_, weight)| weight).sum();
    if total <= 0.0 {
        return choices.first().map(|&(item, _)| item);
    }
    let mut roll = rng.gen::<f64>() * total;
    for &(item, weight) in choices {
        roll -= weight;
        if roll <= 0.0 {
            return Some(item);
        }
    }
    choices.last().map(|&(item, _)| item)
}

fn fitness_of_sparse(problem: &ProblemInstance, schedule: &Schedule) -> Fitness {
    let mut scheduled = 0;
    let mut makespan = 0;
    let mut total_cost = 0;
    for assignment in &schedule.assignments {
        let Some(task) = problem.tasks.get(&assignment.task_id) else {
            continue;
        };
        scheduled += 1;
        makespan = makespan.max(assignment.start_time + task.duration);
        total_cost += task
            .compatible_teams
            .get(&assignment.team_id)
            .copied()
            .unwrap_or(COST_INFEASIBLE);
    }
    if scheduled == 0 {
        return Fitness::worst();
    }
    Fitness::new(scheduled, makespan, total_cost)
}

impl AcoSearch {
    fn walk(
        &self,
        problem: &ProblemInstance,
        trails: &Trails,
        rng: &mut StdRng,
    ) -> (Schedule, Vec<(OrderEdge, TeamChoice)>) {
        let mut in_degrees: HashMap<TaskId, usize> = problem
            .tasks
            .values()
            .map(|task| {
                let present = task
                    .predecessors
                    .iter()
                    .filter(|pred| problem.tasks.contains_key(*pred))
                    .count();
                (task.id, present)
            })
            .collect();
        let mut ready: Vec<TaskId> = problem
            .tasks
            .values()
            .filter(|task| in_degrees[&task.id] == 0 && !task.compatible_teams.is_empty())
            .map(|task| task.id)
            .collect();
        ready.sort_unstable();

        let mut team_available: HashMap<TeamId, u64> = problem
            .teams
            .values()
            .map(|team| (team.id, team.available_from))
            .collect();
        let mut finish_times: HashMap<TaskId, u64> = HashMap::new();
        let mut assignments = Vec::new();
        let mut walked = Vec::new();
        let mut previous: Option<TaskId> = None;

        while !ready.is_empty() {
            let task_weights: Vec<(TaskId, f64)> = ready
                .iter()
                .map(|&tid| {
                    let eta = 1.0 / (1.0 + problem.tasks[&tid].duration as f64);
                    let tau = trails.order_level((previous, tid));
                    (tid, tau.powf(self.alpha) * eta.powf(self.beta))
                })
                .collect();
            let Some(task_id) = weighted_pick(&task_weights, rng) else {
                break;
            };
            ready.retain(|&tid| tid != task_id);
            let task = &problem.tasks[&task_id];

            let mut team_ids: Vec<TeamId> = task
                .compatible_teams
                .keys()
                .copied()
                .filter(|team| team_available.contains_key(team))
                .collect();
            team_ids.sort_unstable();
            let team_weights: Vec<(TeamId, f64)> = team_ids
                .iter()
                .map(|&team| {
                    let eta = 1.0 / (1.0 + task.compatible_teams[&team] as f64);
                    let tau = trails.team_level((task_id, team));
                    (team, tau.powf(self.alpha) * eta.powf(self.beta))
                })
                .collect();
            let Some(team_id) = weighted_pick(&team_weights, rng) else {
                continue;
            };

            let preds_complete = task
                .predecessors
                .iter()
                .filter_map(|pred| finish_times.get(pred))
                .copied()
                .max()
                .unwrap_or(0);
            let start = team_available[&team_id].max(preds_complete);
            let finish = start + task.duration;
            finish_times.insert(task_id, finish);
            team_available.insert(team_id, finish);
            assignments.push(Assignment::new(task_id, team_id, start));
            walked.push(((previous, task_id), (task_id, team_id)));
            previous = Some(task_id);

            for &succ in &task.successors {
                if let Some(degree) = in_degrees.get_mut(&succ) {
                    if *degree == 0 {
                        continue;
                    }
                    *degree -= 1;
                    if *degree == 0 && !problem.tasks[&succ].compatible_teams.is_empty() {
                        ready.push(succ);
                        ready.sort_unstable();
                    }
                }
            }
        }

        (Schedule::new(assignments), walked)
    }
}

impl ScheduleRefiner for AcoSearch {
    fn refine(
        &self,
        problem: &ProblemInstance,
        seed: Schedule,
        budget: TimeBudget,
    ) -> Result<Schedule, InvariantError> {
        if problem.tasks.is_empty() || problem.teams.is_empty() {
            return Ok(seed);
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let seed_fitness = fitness_of_sparse(problem, &seed);

        let mut trails = Trails::new();
        let mut best = seed.clone();
        let mut best_fitness = seed_fitness;
        // The seed was not built by an ant, so there is no trail to
        // reinforce until one matches or beats it.
        let mut best_walk: Vec<(OrderEdge, TeamChoice)> = Vec::new();

        let mut iteration = 0;
        while iteration < self.max_iterations && !budget.is_expired() {
            for _ in 0..self.ants {
                let (schedule, walked) = self.walk(problem, &trails, &mut rng);
                let fitness = fitness_of_sparse(problem, &schedule);
                if fitness < best_fitness || (fitness == best_fitness && best_walk.is_empty()) {
                    best = schedule;
                    best_fitness = fitness;
                    best_walk = walked;
                }
            }

            // Global-best reinforcement after uniform evaporation.
            trails.evaporate(self.rho);
            if !best_walk.is_empty() {
                trails.deposit(&best_walk, self.q / (1.0 + best_fitness.makespan() as f64));
            }
            iteration += 1;
        }
        debug!(
            "ant colony stopped after {iteration} iterations: {} tasks, makespan {}, cost {}",
            best_fitness.scheduled(),
            best_fitness.makespan(),
            best_fitness.total_cost()
        );

        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::validate_schedule;
    use crate::middleware::tabu_search::tests::{bad_seed, open_shop};
    use crate::model::{Task, Team};

    #[test]
    fn never_returns_worse_than_the_seed() {
        let problem = open_shop();
        let seed = bad_seed();
        let seed_fitness = fitness_of_sparse(&problem, &seed);

        let refined = AcoSearch {
            max_iterations: 20,
            ..AcoSearch::default()
        }
        .refine(&problem, seed, TimeBudget::unlimited())
        .unwrap();

        let fitness = fitness_of_sparse(&problem, &refined);
        assert!(fitness <= seed_fitness);
        assert!(validate_schedule(&problem, &refined).is_valid);
    }

    #[test]
    fn unknown_tasks_do_not_count_as_scheduled() {
        let problem = open_shop();
        let valid_only = Schedule::new(vec![Assignment::new(0, 0, 0)]);
        let with_stranger = Schedule::new(vec![
            Assignment::new(0, 0, 0),
            Assignment::new(99, 0, 0),
        ]);
        assert_eq!(
            fitness_of_sparse(&problem, &with_stranger),
            fitness_of_sparse(&problem, &valid_only)
        );
        assert_eq!(
            fitness_of_sparse(&problem, &Schedule::new(vec![Assignment::new(99, 0, 0)])),
            Fitness::worst()
        );
    }

    #[test]
    fn handles_sparse_ids_without_reindexing() {
        let mut early = Task::new(10, 5);
        early.successors = vec![30];
        early.compatible_teams = hashbrown::HashMap::from_iter([(7, 1)]);
        let mut late = Task::new(30, 5);
        late.predecessors = vec![10];
        late.compatible_teams = hashbrown::HashMap::from_iter([(7, 1)]);
        let problem = ProblemInstance::new(
            hashbrown::HashMap::from_iter([(10, early), (30, late)]),
            hashbrown::HashMap::from_iter([(
                7,
                Team {
                    id: 7,
                    available_from: 0,
                },
            )]),
        );

        let refined = AcoSearch {
            ants: 5,
            max_iterations: 5,
            ..AcoSearch::default()
        }
        .refine(&problem, Schedule::default(), TimeBudget::unlimited())
        .unwrap();

        assert_eq!(refined.assignments.len(), 2);
        assert!(validate_schedule(&problem, &refined).is_valid);
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let problem = open_shop();
        let aco = AcoSearch {
            ants: 10,
            max_iterations: 10,
            ..AcoSearch::default()
        };
        let first = aco
            .refine(&problem, bad_seed(), TimeBudget::unlimited())
            .unwrap();
        let second = aco
            .refine(&problem, bad_seed(), TimeBudget::unlimited())
            .unwrap();
        assert_eq!(first, second);
    }
}
