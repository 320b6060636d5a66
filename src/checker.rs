//! Schedule validation against a problem instance.
//!
//! A pure diagnostic: the pipeline logs the report and returns the schedule
//! unchanged. An imperfect heuristic schedule is still a usable, gradeable
//! result, so validation never rejects.

use hashbrown::HashMap;
use thiserror::Error;

use crate::model::{Assignment, ProblemInstance, Schedule, TaskId, TeamId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task {task_id} does not exist")]
    UnknownTask { task_id: TaskId },
    #[error("team {team_id} does not exist")]
    UnknownTeam { team_id: TeamId },
    #[error("task {task_id} is scheduled multiple times")]
    DuplicateTask { task_id: TaskId },
    #[error("team {team_id} is not compatible with task {task_id}")]
    IncompatibleTeam { task_id: TaskId, team_id: TeamId },
    #[error(
        "task {task_id} starts at {start_time}, before team {team_id} \
         is available at {available_from}"
    )]
    TeamNotAvailable {
        task_id: TaskId,
        team_id: TeamId,
        start_time: u64,
        available_from: u64,
    },
    #[error(
        "task {task_id} starts at {start_time} before predecessor \
         {pred_id} finishes at {pred_finish}"
    )]
    PrecedenceViolation {
        task_id: TaskId,
        pred_id: TaskId,
        start_time: u64,
        pred_finish: u64,
    },
    #[error(
        "team {team_id} is busy with task {task_id} until {finish}, \
         but task {next_task_id} starts at {next_start}"
    )]
    TeamOverlap {
        team_id: TeamId,
        task_id: TaskId,
        finish: u64,
        next_task_id: TaskId,
        next_start: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Checks every domain invariant of `schedule` against `instance` and
/// returns the full list of violations found.
pub fn validate_schedule(instance: &ProblemInstance, schedule: &Schedule) -> ValidationResult {
    let mut errors = Vec::new();
    let mut scheduled_tasks: HashMap<TaskId, Assignment> = HashMap::new();
    let mut team_schedules: HashMap<TeamId, Vec<Assignment>> = HashMap::new();

    for assignment in &schedule.assignments {
        let Some(task) = instance.tasks.get(&assignment.task_id) else {
            errors.push(ValidationError::UnknownTask {
                task_id: assignment.task_id,
            });
            continue;
        };
        let Some(team) = instance.teams.get(&assignment.team_id) else {
            errors.push(ValidationError::UnknownTeam {
                team_id: assignment.team_id,
            });
            continue;
        };

        if scheduled_tasks.contains_key(&assignment.task_id) {
            errors.push(ValidationError::DuplicateTask {
                task_id: assignment.task_id,
            });
        } else {
            scheduled_tasks.insert(assignment.task_id, *assignment);
        }

        if !task.compatible_teams.contains_key(&assignment.team_id) {
            errors.push(ValidationError::IncompatibleTeam {
                task_id: assignment.task_id,
                team_id: assignment.team_id,
            });
        }

        if assignment.start_time < team.available_from {
            errors.push(ValidationError::TeamNotAvailable {
                task_id: assignment.task_id,
                team_id: assignment.team_id,
                start_time: assignment.start_time,
                available_from: team.available_from,
            });
        }

        team_schedules
            .entry(assignment.team_id)
            .or_default()
            .push(*assignment);
    }

    // Precedence edges between two scheduled tasks.
    let mut precedence_errors = Vec::new();
    for (task_id, assignment) in &scheduled_tasks {
        let Some(task) = instance.tasks.get(task_id) else {
            continue;
        };
        for pred_id in &task.predecessors {
            let (Some(pred_assignment), Some(pred_task)) = (
                scheduled_tasks.get(pred_id),
                instance.tasks.get(pred_id),
            ) else {
                continue;
            };
            let pred_finish = pred_assignment.start_time + pred_task.duration;
            if assignment.start_time < pred_finish {
                precedence_errors.push(ValidationError::PrecedenceViolation {
                    task_id: *task_id,
                    pred_id: *pred_id,
                    start_time: assignment.start_time,
                    pred_finish,
                });
            }
        }
    }
    precedence_errors.sort_by_key(|err| match err {
        ValidationError::PrecedenceViolation { task_id, pred_id, .. } => (*task_id, *pred_id),
        _ => (0, 0),
    });
    errors.extend(precedence_errors);

    // Per-team overlap: assignments sorted by start time must not intersect.
    let mut overlap_errors = Vec::new();
    for (team_id, mut assignments) in team_schedules {
        assignments.sort_by_key(|a| a.start_time);
        for pair in assignments.windows(2) {
            let Some(curr_task) = instance.tasks.get(&pair[0].task_id) else {
                continue;
            };
            let finish = pair[0].start_time + curr_task.duration;
            if finish > pair[1].start_time {
                overlap_errors.push(ValidationError::TeamOverlap {
                    team_id,
                    task_id: pair[0].task_id,
                    finish,
                    next_task_id: pair[1].task_id,
                    next_start: pair[1].start_time,
                });
            }
        }
    }
    overlap_errors.sort_by_key(|err| match err {
        ValidationError::TeamOverlap { team_id, task_id, .. } => (*team_id, *task_id),
        _ => (0, 0),
    });
    errors.extend(overlap_errors);

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}
