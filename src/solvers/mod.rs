//! Terminal solvers. A pipeline ends in exactly one solver; everything in
//! front of it is middleware.

pub mod greedy;

pub use greedy::GreedySolver;

use crate::budget::TimeBudget;
use crate::model::{InvariantError, ProblemInstance, Schedule};

pub trait Solver {
    /// Budget weight relative to the pipeline's other stages.
    fn time_factor(&self) -> f64 {
        1.0
    }

    fn solve(
        &self,
        problem: &ProblemInstance,
        budget: TimeBudget,
    ) -> Result<Schedule, InvariantError>;
}
