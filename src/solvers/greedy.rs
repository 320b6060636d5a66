use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::debug;

use crate::budget::TimeBudget;
use crate::model::{Assignment, InvariantError, ProblemInstance, Schedule, TaskId};
use crate::solvers::Solver;

/// Shortest-processing-time list scheduler. Keeps a ready queue of tasks
/// whose predecessors have all finished, repeatedly dispatching the
/// shortest ready task to the compatible team that can start it earliest
/// (cost, then team id, break ties).
///
/// Tasks with no compatible team, tasks on a dependency cycle and tasks
/// behind an unschedulable predecessor never become ready and are left
/// out of the schedule.
#[derive(Debug, Default)]
pub struct GreedySolver;

impl Solver for GreedySolver {
    fn solve(
        &self,
        problem: &ProblemInstance,
        budget: TimeBudget,
    ) -> Result<Schedule, InvariantError> {
        let mut in_degrees: hashbrown::HashMap<TaskId, i64> = problem
            .tasks
            .keys()
            .map(|&id| (id, 0))
            .collect();
        for task in problem.tasks.values() {
            for &succ in &task.successors {
                if let Some(degree) = in_degrees.get_mut(&succ) {
                    *degree += 1;
                }
            }
        }

        // (duration, id) so equal durations dispatch in id order.
        let mut ready: BinaryHeap<Reverse<(u64, TaskId)>> = in_degrees
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&id, _)| Reverse((problem.tasks[&id].duration, id)))
            .collect();

        let mut team_available: hashbrown::HashMap<_, _> = problem
            .teams
            .values()
            .map(|team| (team.id, team.available_from))
            .collect();
        let mut finish_times: hashbrown::HashMap<TaskId, u64> = hashbrown::HashMap::new();
        let mut assignments = Vec::new();

        while let Some(Reverse((_, task_id))) = ready.pop() {
            if budget.is_expired() {
                debug!(
                    "greedy solver out of time with {} tasks pending",
                    ready.len() + 1
                );
                break;
            }
            let task = &problem.tasks[&task_id];

            let earliest = task
                .predecessors
                .iter()
                .filter_map(|pred| finish_times.get(pred))
                .copied()
                .max()
                .unwrap_or(0);

            // Earliest feasible start wins; cost and team id break ties.
            let choice = task
                .compatible_teams
                .iter()
                .filter_map(|(&team_id, &cost)| {
                    let available = *team_available.get(&team_id)?;
                    Some((available.max(earliest), cost, team_id))
                })
                .min();

            if let Some((start, _, team_id)) = choice {
                assignments.push(Assignment::new(task_id, team_id, start));
                let finish = start + task.duration;
                team_available.insert(team_id, finish);
                finish_times.insert(task_id, finish);
            } else {
                // No compatible team: successors stay blocked.
                continue;
            }

            for &succ in &task.successors {
                if let Some(degree) = in_degrees.get_mut(&succ) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse((problem.tasks[&succ].duration, succ)));
                    }
                }
            }
        }

        assignments.sort_by_key(|a| (a.start_time, a.task_id));
        Ok(Schedule::new(assignments))
    }
}
