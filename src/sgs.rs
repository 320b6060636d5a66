//! Serial schedule generation scheme (SGS).
//!
//! The shared deterministic decode every search component relies on: a task
//! priority order plus a team assignment is simulated into concrete start
//! times that honor precedence and team availability. All per-decode state
//! is freshly allocated per call, which is what makes fitness memoization on
//! [`Solution`] objects safe.

use std::cell::Cell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::HashSet;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::{Assignment, InvariantError, ProblemInstance, Schedule, TaskId, TeamId};

/// Cost charged for an assignment outside the compatibility set. Large
/// enough to dominate any real cost sum, so an infeasible team choice
/// degrades fitness instead of erroring.
pub const COST_INFEASIBLE: u64 = 1_000_000_000_000;

/// Flat-array view of a continuous-indexed [`ProblemInstance`], shared by
/// the array-indexed search stages.
#[derive(Debug, Clone)]
pub struct CompactProblem {
    num_tasks: usize,
    num_teams: usize,
    durations: Vec<u64>,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
    initial_in_degrees: Vec<u32>,
    /// Per task, the compatible team indices in ascending order.
    compatible_teams: Vec<Vec<usize>>,
    /// Dense task x team cost matrix, `COST_INFEASIBLE` where incompatible.
    team_costs: Vec<Vec<u64>>,
    team_available_from: Vec<u64>,
    /// Tasks that have at least one compatible team; only these can ever be
    /// scheduled.
    tasks_with_teams: Vec<usize>,
}

impl CompactProblem {
    pub fn new(problem: &ProblemInstance) -> Result<Self, InvariantError> {
        problem.assert_continuous_indices()?;
        let num_tasks = problem.num_tasks;
        let num_teams = problem.num_teams;

        let mut team_available_from = vec![0; num_teams];
        for (&id, team) in &problem.teams {
            team_available_from[id as usize] = team.available_from;
        }

        let mut durations = vec![0; num_tasks];
        let mut predecessors = vec![Vec::new(); num_tasks];
        let mut successors = vec![Vec::new(); num_tasks];
        let mut initial_in_degrees = vec![0; num_tasks];
        let mut compatible_teams = vec![Vec::new(); num_tasks];
        let mut team_costs = vec![vec![COST_INFEASIBLE; num_teams]; num_tasks];
        let mut tasks_with_teams = Vec::new();

        for (&id, task) in &problem.tasks {
            let tid = id as usize;
            durations[tid] = task.duration;
            predecessors[tid] = task.predecessors.iter().map(|&p| p as usize).collect();
            successors[tid] = task.successors.iter().map(|&s| s as usize).collect();
            initial_in_degrees[tid] = task.predecessors.len() as u32;

            if !task.compatible_teams.is_empty() {
                tasks_with_teams.push(tid);
            }
            for (&team_id, &cost) in &task.compatible_teams {
                compatible_teams[tid].push(team_id as usize);
                team_costs[tid][team_id as usize] = cost;
            }
            compatible_teams[tid].sort_unstable();
        }
        tasks_with_teams.sort_unstable();

        Ok(Self {
            num_tasks,
            num_teams,
            durations,
            predecessors,
            successors,
            initial_in_degrees,
            compatible_teams,
            team_costs,
            team_available_from,
            tasks_with_teams,
        })
    }

    pub fn num_tasks(&self) -> usize {
        self.num_tasks
    }

    pub fn num_teams(&self) -> usize {
        self.num_teams
    }

    pub fn duration(&self, task: usize) -> u64 {
        self.durations[task]
    }

    pub fn cost(&self, task: usize, team: usize) -> u64 {
        self.team_costs[task][team]
    }

    pub fn tasks_with_teams(&self) -> &[usize] {
        &self.tasks_with_teams
    }

    pub fn compatible_teams(&self, task: usize) -> &[usize] {
        &self.compatible_teams[task]
    }

    /// Decodes a solution into assignments. Deterministic: identical inputs
    /// always produce identical assignments in identical order.
    ///
    /// A ready task with no compatible team is never enqueued; the schedule
    /// then simply carries fewer assignments and the fitness pays for it.
    pub fn decode(&self, solution: &Solution) -> Vec<Assignment> {
        let mut priority = vec![0usize; self.num_tasks];
        for (rank, &tid) in solution.task_order.iter().enumerate() {
            if tid < self.num_tasks {
                priority[tid] = rank;
            }
        }

        let mut team_available = self.team_available_from.clone();
        let mut finish_times = vec![0u64; self.num_tasks];
        let mut in_degrees = self.initial_in_degrees.clone();

        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = BinaryHeap::new();
        for &tid in &self.tasks_with_teams {
            if in_degrees[tid] == 0 {
                ready.push(Reverse((priority[tid], tid)));
            }
        }

        let mut assignments = Vec::with_capacity(self.tasks_with_teams.len());
        while let Some(Reverse((_, tid))) = ready.pop() {
            let team = solution.team_assignment[tid];

            let preds_complete = self.predecessors[tid]
                .iter()
                .map(|&p| finish_times[p])
                .max()
                .unwrap_or(0);
            let start = team_available[team].max(preds_complete);
            let finish = start + self.durations[tid];

            finish_times[tid] = finish;
            team_available[team] = finish;
            assignments.push(Assignment::new(tid as TaskId, team as TeamId, start));

            for &succ in &self.successors[tid] {
                // A one-sided edge (successor listed without the mirroring
                // predecessor) leaves the target at zero already; it was
                // enqueued up front and must not be re-enqueued.
                if in_degrees[succ] == 0 {
                    continue;
                }
                in_degrees[succ] -= 1;
                if in_degrees[succ] == 0 && !self.compatible_teams[succ].is_empty() {
                    ready.push(Reverse((priority[succ], succ)));
                }
            }
        }

        assignments
    }

    /// Decodes and scores, caching the fitness on the solution.
    pub fn evaluate(&self, solution: &Solution) -> Fitness {
        if let Some(fitness) = solution.fitness.get() {
            return fitness;
        }
        let fitness = self.fitness_of(&self.decode(solution));
        solution.fitness.set(Some(fitness));
        fitness
    }

    pub fn fitness_of(&self, assignments: &[Assignment]) -> Fitness {
        if assignments.is_empty() {
            return Fitness::worst();
        }
        let mut makespan = 0;
        let mut total_cost = 0;
        for assignment in assignments {
            let tid = assignment.task_id as usize;
            makespan = makespan.max(assignment.start_time + self.durations[tid]);
            total_cost += self.team_costs[tid][assignment.team_id as usize];
        }
        Fitness::new(assignments.len(), makespan, total_cost)
    }

    /// Lifts a schedule into the search representation: the task order
    /// follows ascending start times, unscheduled-but-schedulable tasks are
    /// appended in shuffled order with a random compatible team each.
    /// Assignments referencing ids outside the instance are dropped.
    pub fn lift<R: Rng>(&self, schedule: &Schedule, rng: &mut R) -> Solution {
        let mut sorted: Vec<&Assignment> = schedule
            .assignments
            .iter()
            .filter(|a| {
                (a.task_id as usize) < self.num_tasks && (a.team_id as usize) < self.num_teams
            })
            .collect();
        sorted.sort_by_key(|a| a.start_time);

        let mut task_order: Vec<usize> = sorted.iter().map(|a| a.task_id as usize).collect();
        let mut team_assignment = vec![0usize; self.num_tasks];
        for assignment in &sorted {
            team_assignment[assignment.task_id as usize] = assignment.team_id as usize;
        }

        let scheduled: HashSet<usize> = task_order.iter().copied().collect();
        let mut remaining: Vec<usize> = self
            .tasks_with_teams
            .iter()
            .copied()
            .filter(|tid| !scheduled.contains(tid))
            .collect();
        remaining.shuffle(rng);
        for &tid in &remaining {
            if let Some(&team) = self.compatible_teams[tid].choose(rng) {
                team_assignment[tid] = team;
            }
        }
        task_order.extend(remaining);

        Solution::new(task_order, team_assignment)
    }
}

/// A candidate point in the search space: a priority permutation of the
/// schedulable tasks plus a team index per task.
///
/// Solutions are never mutated in place; every operator builds a fresh one,
/// so the lazily cached fitness can never go stale.
#[derive(Debug, Clone)]
pub struct Solution {
    pub task_order: Vec<usize>,
    pub team_assignment: Vec<usize>,
    fitness: Cell<Option<Fitness>>,
}

impl Solution {
    pub fn new(task_order: Vec<usize>, team_assignment: Vec<usize>) -> Self {
        Self {
            task_order,
            team_assignment,
            fitness: Cell::new(None),
        }
    }
}

/// Minimization triple `(-scheduled, makespan, total_cost)`, compared
/// lexicographically. Lower is better; field order drives the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fitness {
    neg_scheduled: i64,
    makespan: u64,
    total_cost: u64,
}

impl Fitness {
    pub fn new(scheduled: usize, makespan: u64, total_cost: u64) -> Self {
        Self {
            neg_scheduled: -(scheduled as i64),
            makespan,
            total_cost,
        }
    }

    /// The value of an empty schedule: nothing scheduled, unbounded
    /// makespan and cost.
    pub fn worst() -> Self {
        Self {
            neg_scheduled: 0,
            makespan: u64::MAX,
            total_cost: u64::MAX,
        }
    }

    pub fn scheduled(&self) -> usize {
        (-self.neg_scheduled) as usize
    }

    pub fn makespan(&self) -> u64 {
        self.makespan
    }

    pub fn total_cost(&self) -> u64 {
        self.total_cost
    }

    /// Scalar collapse for simulated annealing: task count dominates
    /// makespan dominates cost.
    pub fn energy(&self) -> f64 {
        self.neg_scheduled as f64 * 1e12 + self.makespan as f64 * 1e6 + self.total_cost as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProblemInstance, Task, Team};
    use hashbrown::HashMap;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 0 -> 1 -> 2 chain plus a free task 3, two teams.
    fn diamond_problem() -> ProblemInstance {
        let mut tasks = HashMap::new();
        for (id, duration, preds, succs) in [
            (0u32, 4u64, vec![], vec![1]),
            (1, 3, vec![0], vec![2]),
            (2, 5, vec![1], vec![]),
            (3, 2, vec![], vec![]),
        ] {
            let mut task = Task::new(id, duration);
            task.predecessors = preds;
            task.successors = succs;
            task.compatible_teams = HashMap::from_iter([(0, 2 + id as u64), (1, 8)]);
            tasks.insert(id, task);
        }
        let teams = HashMap::from_iter([
            (
                0,
                Team {
                    id: 0,
                    available_from: 0,
                },
            ),
            (
                1,
                Team {
                    id: 1,
                    available_from: 1,
                },
            ),
        ]);
        ProblemInstance::new(tasks, teams)
    }

    #[test]
    fn decode_is_deterministic() {
        let compact = CompactProblem::new(&diamond_problem()).unwrap();
        let solution = Solution::new(vec![3, 0, 1, 2], vec![0, 0, 1, 1]);

        let first = compact.decode(&solution);
        let second = compact.decode(&solution);
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn decode_respects_precedence_and_availability() {
        let compact = CompactProblem::new(&diamond_problem()).unwrap();
        // Everything on team 1, which only becomes available at t=1.
        let solution = Solution::new(vec![0, 1, 2, 3], vec![1, 1, 1, 1]);

        let assignments = compact.decode(&solution);
        let start = |tid: u32| {
            assignments
                .iter()
                .find(|a| a.task_id == tid)
                .map(|a| a.start_time)
                .unwrap()
        };
        assert_eq!(start(0), 1);
        assert_eq!(start(1), 5);
        assert_eq!(start(2), 8);
    }

    #[test]
    fn one_sided_successor_edge_decodes_each_task_once() {
        // Task 0 names 1 as successor, but 1 does not list 0 as a
        // predecessor; both must still be scheduled exactly once.
        let mut head = Task::new(0, 3);
        head.successors = vec![1];
        head.compatible_teams.insert(0, 1);
        let mut free = Task::new(1, 2);
        free.compatible_teams.insert(0, 1);
        let problem = ProblemInstance::new(
            HashMap::from_iter([(0, head), (1, free)]),
            HashMap::from_iter([(
                0,
                Team {
                    id: 0,
                    available_from: 0,
                },
            )]),
        );

        let compact = CompactProblem::new(&problem).unwrap();
        let solution = Solution::new(vec![1, 0], vec![0, 0]);
        let assignments = compact.decode(&solution);

        let mut ids: Vec<_> = assignments.iter().map(|a| a.task_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(compact.evaluate(&solution).scheduled(), 2);
    }

    #[test]
    fn unschedulable_task_degrades_fitness_instead_of_failing() {
        let mut problem = diamond_problem();
        problem.tasks.get_mut(&3).unwrap().compatible_teams.clear();

        let compact = CompactProblem::new(&problem).unwrap();
        let solution = Solution::new(vec![0, 1, 2], vec![0, 0, 0, 0]);
        let fitness = compact.evaluate(&solution);
        assert_eq!(fitness.scheduled(), 3);
    }

    #[test]
    fn empty_decode_is_worst_fitness() {
        let compact = CompactProblem::new(&diamond_problem()).unwrap();
        assert_eq!(compact.fitness_of(&[]), Fitness::worst());
    }

    #[test]
    fn fitness_orders_lexicographically() {
        let more_tasks = Fitness::new(4, 100, 100);
        let fewer_tasks = Fitness::new(3, 1, 1);
        assert!(more_tasks < fewer_tasks);

        let slower = Fitness::new(4, 120, 1);
        assert!(more_tasks < slower);

        let pricier = Fitness::new(4, 100, 101);
        assert!(more_tasks < pricier);
    }

    #[test]
    fn lift_appends_unscheduled_tasks() {
        let compact = CompactProblem::new(&diamond_problem()).unwrap();
        let schedule = Schedule::new(vec![
            Assignment::new(0, 0, 0),
            Assignment::new(1, 0, 4),
        ]);
        let mut rng = StdRng::seed_from_u64(1);
        let solution = compact.lift(&schedule, &mut rng);

        assert_eq!(solution.task_order.len(), 4);
        assert_eq!(&solution.task_order[..2], &[0, 1]);
        // Appended tasks carry a compatible team.
        for &tid in &solution.task_order[2..] {
            assert!(compact
                .compatible_teams(tid)
                .contains(&solution.team_assignment[tid]));
        }
    }

    #[test]
    fn evaluate_caches_on_the_solution() {
        let compact = CompactProblem::new(&diamond_problem()).unwrap();
        let solution = Solution::new(vec![0, 1, 2, 3], vec![0, 0, 0, 0]);
        let first = compact.evaluate(&solution);
        let second = compact.evaluate(&solution);
        assert_eq!(first, second);
        assert_eq!(first.scheduled(), 4);
    }
}
