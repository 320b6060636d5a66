use hashbrown::HashMap;
use thiserror::Error;

pub type TaskId = u32;
pub type TeamId = u32;

/// A unit of work with precedence dependencies and a set of teams able to
/// execute it. Adjacency lists are kept in declaration order; duplicates are
/// neither forbidden nor deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub duration: u64,
    pub predecessors: Vec<TaskId>,
    pub successors: Vec<TaskId>,
    /// Compatible team id -> assignment cost. Absence means incompatible;
    /// a task with no compatible teams can never be scheduled.
    pub compatible_teams: HashMap<TeamId, u64>,
}

impl Task {
    pub fn new(id: TaskId, duration: u64) -> Self {
        Self {
            id,
            duration,
            predecessors: Vec::new(),
            successors: Vec::new(),
            compatible_teams: HashMap::new(),
        }
    }
}

/// A unary resource: at most one task at a time, no preemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    pub available_from: u64,
}

/// Immutable problem description. Middlewares never mutate an instance;
/// they construct a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemInstance {
    pub num_tasks: usize,
    pub num_teams: usize,
    pub tasks: HashMap<TaskId, Task>,
    pub teams: HashMap<TeamId, Team>,
}

/// Violation of the continuous-index invariant required by array-indexed
/// solvers. The only error that aborts a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("instance declares {declared} tasks but holds {actual}")]
    TaskCountMismatch { declared: usize, actual: usize },
    #[error("task ids must form 0..{num_tasks}, id {id} is missing")]
    MissingTaskId { num_tasks: usize, id: TaskId },
    #[error("instance declares {declared} teams but holds {actual}")]
    TeamCountMismatch { declared: usize, actual: usize },
    #[error("team ids must form 0..{num_teams}, id {id} is missing")]
    MissingTeamId { num_teams: usize, id: TeamId },
}

impl ProblemInstance {
    pub fn new(tasks: HashMap<TaskId, Task>, teams: HashMap<TeamId, Team>) -> Self {
        Self {
            num_tasks: tasks.len(),
            num_teams: teams.len(),
            tasks,
            teams,
        }
    }

    /// Checks that task ids form exactly `0..num_tasks` and team ids exactly
    /// `0..num_teams`. Array-indexed search stages call this before building
    /// their flat representations; continuing without the invariant would
    /// silently corrupt indexed state.
    pub fn assert_continuous_indices(&self) -> Result<(), InvariantError> {
        if self.tasks.len() != self.num_tasks {
            return Err(InvariantError::TaskCountMismatch {
                declared: self.num_tasks,
                actual: self.tasks.len(),
            });
        }
        for id in 0..self.num_tasks as TaskId {
            if !self.tasks.contains_key(&id) {
                return Err(InvariantError::MissingTaskId {
                    num_tasks: self.num_tasks,
                    id,
                });
            }
        }
        if self.teams.len() != self.num_teams {
            return Err(InvariantError::TeamCountMismatch {
                declared: self.num_teams,
                actual: self.teams.len(),
            });
        }
        for id in 0..self.num_teams as TeamId {
            if !self.teams.contains_key(&id) {
                return Err(InvariantError::MissingTeamId {
                    num_teams: self.num_teams,
                    id,
                });
            }
        }
        Ok(())
    }
}

/// A commitment that `team_id` executes `task_id` starting at `start_time`.
/// The finish time is derived from the task duration, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub task_id: TaskId,
    pub team_id: TeamId,
    pub start_time: u64,
}

impl Assignment {
    pub fn new(task_id: TaskId, team_id: TeamId, start_time: u64) -> Self {
        Self {
            task_id,
            team_id,
            start_time,
        }
    }
}

/// An ordered collection of assignments. The model permits constructing an
/// invalid schedule (duplicate tasks, unknown ids); [`crate::checker`]
/// reports such defects as diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub assignments: Vec<Assignment>,
}

impl Schedule {
    pub fn new(assignments: Vec<Assignment>) -> Self {
        Self { assignments }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// User-facing grading triple: maximize `scheduled`, then minimize
/// `makespan`, then minimize `total_cost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub scheduled: usize,
    pub makespan: u64,
    pub total_cost: u64,
}

impl Score {
    pub fn grade(problem: &ProblemInstance, schedule: &Schedule) -> Self {
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
                .unwrap_or(0);
        }
        Self {
            scheduled,
            makespan,
            total_cost,
        }
    }
}
