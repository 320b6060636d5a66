use std::collections::VecDeque;

use hashbrown::HashSet;
use log::debug;

use crate::middleware::ProblemTransform;
use crate::model::{ProblemInstance, TaskId};

/// Removes every task that depends on a task no longer in the instance,
/// transitively, then rebuilds all adjacency lists so they only name
/// surviving tasks. Run this after [`super::CycleRemover`], which leaves
/// dangling references behind on purpose.
#[derive(Debug, Default)]
pub struct DependencyPruner;

impl ProblemTransform for DependencyPruner {
    fn transform(&self, problem: &ProblemInstance) -> ProblemInstance {
        let mut removed: HashSet<TaskId> = HashSet::new();
        let mut queue: VecDeque<TaskId> = problem
            .tasks
            .values()
            .filter(|task| {
                task.predecessors
                    .iter()
                    .any(|pred| !problem.tasks.contains_key(pred))
            })
            .map(|task| task.id)
            .collect();

        while let Some(id) = queue.pop_front() {
            if !removed.insert(id) {
                continue;
            }
            if let Some(task) = problem.tasks.get(&id) {
                for &succ in &task.successors {
                    if problem.tasks.contains_key(&succ) && !removed.contains(&succ) {
                        queue.push_back(succ);
                    }
                }
            }
        }
        if !removed.is_empty() {
            debug!("pruning {} tasks behind missing predecessors", removed.len());
        }

        // Always rebuild adjacency: even without removals the input may
        // carry stale successor references.
        let mut tasks = problem.tasks.clone();
        tasks.retain(|id, _| !removed.contains(id));
        let alive: HashSet<TaskId> = tasks.keys().copied().collect();
        for task in tasks.values_mut() {
            task.predecessors.retain(|id| alive.contains(id));
            task.successors.retain(|id| alive.contains(id));
        }
        ProblemInstance::new(tasks, problem.teams.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{CycleRemover, ImpossibleTaskRemover};
    use crate::model::{Task, Team};
    use hashbrown::HashMap;

    fn problem_with(tasks: Vec<Task>) -> ProblemInstance {
        let mut map = HashMap::new();
        for task in tasks {
            map.insert(task.id, task);
        }
        ProblemInstance::new(
            map,
            HashMap::from_iter([(
                0,
                Team {
                    id: 0,
                    available_from: 0,
                },
            )]),
        )
    }

    fn schedulable(id: TaskId) -> Task {
        let mut task = Task::new(id, 5);
        task.compatible_teams.insert(0, 1);
        task
    }

    #[test]
    fn broken_chains_are_pruned_transitively() {
        let mut orphan = schedulable(0);
        orphan.predecessors = vec![9];
        orphan.successors = vec![1];
        let mut child = schedulable(1);
        child.predecessors = vec![0];
        let free = schedulable(2);

        let repaired = DependencyPruner.transform(&problem_with(vec![orphan, child, free]));
        assert_eq!(repaired.num_tasks, 1);
        assert!(repaired.tasks.contains_key(&2));
    }

    #[test]
    fn stale_successor_references_are_scrubbed() {
        let mut head = schedulable(0);
        head.successors = vec![7];

        let repaired = DependencyPruner.transform(&problem_with(vec![head]));
        assert_eq!(repaired.num_tasks, 1);
        assert!(repaired.tasks[&0].successors.is_empty());
    }

    #[test]
    fn repair_chain_leaves_a_consistent_graph() {
        // 0 -> 1 <-> 2 with 3 free and 4 unassignable; the three repair
        // transforms together must leave only tasks 0 and 3.
        let mut head = schedulable(0);
        head.successors = vec![1];
        let mut a = schedulable(1);
        a.predecessors = vec![0, 2];
        a.successors = vec![2];
        let mut b = schedulable(2);
        b.predecessors = vec![1];
        b.successors = vec![1];
        let free = schedulable(3);
        let hopeless = Task::new(4, 5);

        let problem = problem_with(vec![head, a, b, free, hopeless]);
        let repaired = DependencyPruner.transform(
            &CycleRemover.transform(&ImpossibleTaskRemover.transform(&problem)),
        );

        let mut ids: Vec<_> = repaired.tasks.keys().copied().collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 3]);
        assert!(repaired.tasks[&0].successors.is_empty());
    }
}
