//! Tabu bookkeeping for move-based neighborhood search.

mod move_table;

pub use move_table::MoveTable;

/// A reversible modification of a search solution, used as the tabu key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    /// Exchange the order positions of two tasks (identified by task id,
    /// not position, so the tabu survives unrelated reorderings).
    Swap { a: usize, b: usize },
    /// Reassign one task to a different compatible team.
    Team { task: usize, team: usize },
}

impl Move {
    /// The move undoing `self`. A team reassignment does not know the
    /// previous team, so it is its own reverse.
    pub fn reverse(&self) -> Move {
        match *self {
            Move::Swap { a, b } => Move::Swap { a: b, b: a },
            team_move => team_move,
        }
    }
}

pub trait TabuList {
    /// Whether `mv` is still forbidden at `iteration`.
    fn is_tabu(&self, mv: &Move, iteration: u64) -> bool;
    /// Forbid `mv` for the list's tenure, counted from `iteration`.
    fn forbid(&mut self, mv: Move, iteration: u64);
    /// Drop entries that expired at or before `iteration`.
    fn compact(&mut self, iteration: u64);
}
