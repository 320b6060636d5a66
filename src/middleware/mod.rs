//! Middleware pipeline: graph-repair transforms, index adapters and
//! schedule refiners composed in front of a terminal solver.
//!
//! Middleware shapes form a small closed set ([`Stage`]); a pipeline run is
//! a fold over the stage list. Each stage carries a `time_factor` weight and
//! receives a proportional share of the pipeline's total budget; a stage is
//! never handed a looser limit than its own allocation.

pub mod aco_search;
pub mod continuous_indexer;
pub mod cycle_remover;
pub mod dependency_pruner;
pub mod ga_search;
pub mod hill_climbing;
pub mod impossible_task_remover;
pub mod pso_search;
pub mod simulated_annealing;
pub mod tabu_search;

pub use aco_search::AcoSearch;
pub use continuous_indexer::ContinuousIndexer;
pub use cycle_remover::CycleRemover;
pub use dependency_pruner::DependencyPruner;
pub use ga_search::GaSearch;
pub use hill_climbing::HillClimbing;
pub use impossible_task_remover::ImpossibleTaskRemover;
pub use pso_search::PsoSearch;
pub use simulated_annealing::SimulatedAnnealing;
pub use tabu_search::TabuSearch;

use std::time::Duration;

use log::warn;

use crate::budget::TimeBudget;
use crate::checker;
use crate::model::{InvariantError, ProblemInstance, Schedule};
use crate::solvers::Solver;

/// Continuation handed to an adapter: the rest of the pipeline, with its
/// own budgets already fixed.
pub trait Runnable {
    fn run(&self, problem: &ProblemInstance) -> Result<Schedule, InvariantError>;
}

/// A pure problem rewrite. Transforms are deterministic and finish
/// immediately; they do useful work even on a zero budget.
pub trait ProblemTransform {
    fn transform(&self, problem: &ProblemInstance) -> ProblemInstance;
}

/// Improves the schedule produced by the rest of the pipeline.
pub trait ScheduleRefiner {
    fn refine(
        &self,
        problem: &ProblemInstance,
        seed: Schedule,
        budget: TimeBudget,
    ) -> Result<Schedule, InvariantError>;
}

/// Wraps the rest of the pipeline, controlling both the problem handed
/// down and the schedule handed back.
pub trait ProblemAdapter {
    fn run(
        &self,
        problem: &ProblemInstance,
        next: &dyn Runnable,
        budget: TimeBudget,
    ) -> Result<Schedule, InvariantError>;
}

enum StageKind {
    Transform(Box<dyn ProblemTransform>),
    Refine(Box<dyn ScheduleRefiner>),
    Adapt(Box<dyn ProblemAdapter>),
}

/// One pipeline position: a middleware shape plus its budget weight.
pub struct Stage {
    kind: StageKind,
    time_factor: f64,
}

impl Stage {
    pub fn transform(transform: impl ProblemTransform + 'static) -> Self {
        Self {
            kind: StageKind::Transform(Box::new(transform)),
            time_factor: 0.0,
        }
    }

    pub fn refine(refiner: impl ScheduleRefiner + 'static) -> Self {
        Self {
            kind: StageKind::Refine(Box::new(refiner)),
            time_factor: 1.0,
        }
    }

    pub fn adapt(adapter: impl ProblemAdapter + 'static) -> Self {
        Self {
            kind: StageKind::Adapt(Box::new(adapter)),
            time_factor: 0.0,
        }
    }

    pub fn with_time_factor(mut self, time_factor: f64) -> Self {
        self.time_factor = time_factor;
        self
    }

    pub fn time_factor(&self) -> f64 {
        self.time_factor
    }
}

/// Ordered middlewares in front of a terminal solver.
pub struct Pipeline {
    stages: Vec<Stage>,
    solver: Box<dyn Solver>,
    total_budget: Option<Duration>,
    validate: bool,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>, solver: impl Solver + 'static) -> Self {
        Self {
            stages,
            solver: Box::new(solver),
            total_budget: None,
            validate: true,
        }
    }

    pub fn with_total_budget(mut self, budget: Duration) -> Self {
        self.total_budget = Some(budget);
        self
    }

    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Per-stage budget shares, solver last: `alloc_i = T * f_i / sum(f)`.
    /// Without a total budget every stage runs unlimited.
    pub fn allocations(&self) -> Vec<Option<Duration>> {
        let factors: Vec<f64> = self
            .stages
            .iter()
            .map(Stage::time_factor)
            .chain(std::iter::once(self.solver.time_factor()))
            .collect();
        let Some(total) = self.total_budget else {
            return vec![None; factors.len()];
        };
        let sum: f64 = factors.iter().sum();
        if sum <= 0.0 {
            return vec![Some(Duration::ZERO); factors.len()];
        }
        factors
            .iter()
            .map(|factor| Some(total.mul_f64(factor / sum)))
            .collect()
    }

    /// Folds the problem through every stage and the solver, then validates
    /// the result. Validation failures are logged, never raised: an
    /// imperfect schedule is still a result.
    pub fn run(&self, problem: &ProblemInstance) -> Result<Schedule, InvariantError> {
        let allocations = self.allocations();
        let schedule = self.run_from(0, problem, &allocations)?;
        if self.validate {
            let report = checker::validate_schedule(problem, &schedule);
            for error in &report.errors {
                warn!("schedule validation: {error}");
            }
        }
        Ok(schedule)
    }

    fn run_from(
        &self,
        index: usize,
        problem: &ProblemInstance,
        allocations: &[Option<Duration>],
    ) -> Result<Schedule, InvariantError> {
        let Some(stage) = self.stages.get(index) else {
            return self
                .solver
                .solve(problem, TimeBudget::start(allocations[index]));
        };
        match &stage.kind {
            StageKind::Transform(transform) => {
                let mapped = transform.transform(problem);
                self.run_from(index + 1, &mapped, allocations)
            }
            StageKind::Refine(refiner) => {
                let seed = self.run_from(index + 1, problem, allocations)?;
                // The refiner's clock starts once the inner chain is done.
                refiner.refine(problem, seed, TimeBudget::start(allocations[index]))
            }
            StageKind::Adapt(adapter) => adapter.run(
                problem,
                &Continuation {
                    pipeline: self,
                    index: index + 1,
                    allocations,
                },
                TimeBudget::start(allocations[index]),
            ),
        }
    }
}

struct Continuation<'a> {
    pipeline: &'a Pipeline,
    index: usize,
    allocations: &'a [Option<Duration>],
}

impl Runnable for Continuation<'_> {
    fn run(&self, problem: &ProblemInstance) -> Result<Schedule, InvariantError> {
        self.pipeline.run_from(self.index, problem, self.allocations)
    }
}
