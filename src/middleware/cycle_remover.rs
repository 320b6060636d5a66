use hashbrown::HashSet;
use log::debug;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::middleware::ProblemTransform;
use crate::model::{ProblemInstance, TaskId};

/// Removes every task that sits on a dependency cycle. A task is cyclic if
/// its strongly connected component has more than one member, or if it
/// carries a self-edge.
///
/// Only the cyclic tasks themselves are removed. Surviving adjacency lists
/// may still name the removed ids; [`super::DependencyPruner`] owns that
/// cleanup, and also decides the fate of tasks left with a dangling
/// predecessor.
#[derive(Debug, Default)]
pub struct CycleRemover;

impl ProblemTransform for CycleRemover {
    fn transform(&self, problem: &ProblemInstance) -> ProblemInstance {
        let mut graph: DiGraph<TaskId, ()> = DiGraph::new();
        let mut nodes: hashbrown::HashMap<TaskId, NodeIndex> = problem
            .tasks
            .keys()
            .map(|&id| (id, graph.add_node(id)))
            .collect();
        for task in problem.tasks.values() {
            for &succ in &task.successors {
                // Edges to already-removed tasks get a throwaway node so
                // they cannot distort the component structure.
                let from = nodes[&task.id];
                let to = *nodes
                    .entry(succ)
                    .or_insert_with(|| graph.add_node(succ));
                graph.add_edge(from, to, ());
            }
        }

        let mut cyclic: HashSet<TaskId> = HashSet::new();
        for component in tarjan_scc(&graph) {
            if component.len() > 1 {
                cyclic.extend(component.iter().map(|&node| graph[node]));
            } else if graph.contains_edge(component[0], component[0]) {
                cyclic.insert(graph[component[0]]);
            }
        }
        cyclic.retain(|id| problem.tasks.contains_key(id));
        if cyclic.is_empty() {
            return problem.clone();
        }
        debug!("removing {} tasks on dependency cycles", cyclic.len());

        let mut tasks = problem.tasks.clone();
        tasks.retain(|id, _| !cyclic.contains(id));
        ProblemInstance::new(tasks, problem.teams.clone())
    }
}
