use log::debug;

use crate::middleware::ProblemTransform;
use crate::model::ProblemInstance;

/// Drops every task with an empty compatible-team set and strips the
/// removed ids from the surviving adjacency lists, so downstream stages
/// see a clean graph.
#[derive(Debug, Default)]
pub struct ImpossibleTaskRemover;

impl ProblemTransform for ImpossibleTaskRemover {
    fn transform(&self, problem: &ProblemInstance) -> ProblemInstance {
        let mut tasks = problem.tasks.clone();
        let removed: hashbrown::HashSet<_> = tasks
            .iter()
            .filter(|(_, task)| task.compatible_teams.is_empty())
            .map(|(&id, _)| id)
            .collect();
        if removed.is_empty() {
            return problem.clone();
        }
        debug!("removing {} tasks with no compatible team", removed.len());

        tasks.retain(|id, _| !removed.contains(id));
        for task in tasks.values_mut() {
            task.predecessors.retain(|id| !removed.contains(id));
            task.successors.retain(|id| !removed.contains(id));
        }
        ProblemInstance::new(tasks, problem.teams.clone())
    }
}
