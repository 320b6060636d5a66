use hashbrown::HashMap;
use log::warn;

use crate::budget::TimeBudget;
use crate::middleware::{ProblemAdapter, Runnable};
use crate::model::{Assignment, InvariantError, ProblemInstance, Schedule, Task};

/// Renumbers task and team ids to dense `0..n` ranges before handing the
/// problem to the rest of the pipeline, then maps the resulting schedule
/// back to the original ids. Array-indexed search stages require the dense
/// numbering; after the repair transforms the id space is usually sparse.
#[derive(Debug, Default)]
pub struct ContinuousIndexer;

/// Order-preserving dense renumbering of a sparse id set.
struct IndexMap {
    forward: HashMap<u32, u32>,
    backward: Vec<u32>,
}

impl IndexMap {
    fn new(ids: impl Iterator<Item = u32>) -> Self {
        let mut backward: Vec<u32> = ids.collect();
        backward.sort_unstable();
        let forward = backward
            .iter()
            .enumerate()
            .map(|(dense, &sparse)| (sparse, dense as u32))
            .collect();
        Self { forward, backward }
    }

    fn to_dense(&self, sparse: u32) -> Option<u32> {
        self.forward.get(&sparse).copied()
    }

    fn to_sparse(&self, dense: u32) -> Option<u32> {
        self.backward.get(dense as usize).copied()
    }
}

impl ProblemAdapter for ContinuousIndexer {
    fn run(
        &self,
        problem: &ProblemInstance,
        next: &dyn Runnable,
        _budget: TimeBudget,
    ) -> Result<Schedule, InvariantError> {
        let task_map = IndexMap::new(problem.tasks.keys().copied());
        let team_map = IndexMap::new(problem.teams.keys().copied());

        let tasks = problem
            .tasks
            .values()
            .map(|task| {
                let dense = Task {
                    // Ids in adjacency lists are expected to resolve here;
                    // the repair transforms run first.
                    id: task_map.to_dense(task.id).unwrap_or(task.id),
                    duration: task.duration,
                    predecessors: task
                        .predecessors
                        .iter()
                        .filter_map(|&id| task_map.to_dense(id))
                        .collect(),
                    successors: task
                        .successors
                        .iter()
                        .filter_map(|&id| task_map.to_dense(id))
                        .collect(),
                    compatible_teams: task
                        .compatible_teams
                        .iter()
                        .filter_map(|(&team, &cost)| Some((team_map.to_dense(team)?, cost)))
                        .collect(),
                };
                (dense.id, dense)
            })
            .collect();
        let teams = problem
            .teams
            .values()
            .filter_map(|team| {
                let id = team_map.to_dense(team.id)?;
                Some((
                    id,
                    crate::model::Team {
                        id,
                        available_from: team.available_from,
                    },
                ))
            })
            .collect();

        let inner = next.run(&ProblemInstance::new(tasks, teams))?;

        let mut assignments = Vec::with_capacity(inner.assignments.len());
        for assignment in &inner.assignments {
            let (Some(task_id), Some(team_id)) = (
                task_map.to_sparse(assignment.task_id),
                team_map.to_sparse(assignment.team_id),
            ) else {
                warn!(
                    "dropping assignment with out-of-range ids: task {} team {}",
                    assignment.task_id, assignment.team_id
                );
                continue;
            };
            assignments.push(Assignment::new(task_id, team_id, assignment.start_time));
        }
        Ok(Schedule::new(assignments))
    }
}
