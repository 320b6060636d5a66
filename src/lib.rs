//! Scheduling of tasks with precedence dependencies onto teams that become
//! available at different times and are compatible with only a subset of
//! tasks at individual costs.
//!
//! A [`model::ProblemInstance`] flows through a [`middleware::Pipeline`]:
//! graph-repair transforms make an inconsistent instance solvable, a
//! [`solvers::Solver`] builds a constructive [`model::Schedule`], and
//! refinement middlewares (tabu search, genetic algorithm, simulated
//! annealing, ant colony, particle swarm, hill climbing) improve it within a
//! proportionally divided time budget. The objective is lexicographic:
//! maximize the number of scheduled tasks, then minimize the makespan, then
//! minimize total assignment cost.

pub mod budget;
pub mod checker;
pub mod generator;
pub mod middleware;
pub mod model;
pub mod sgs;
pub mod solvers;
pub mod tabu_list;
