use hashbrown::HashMap;

use super::{Move, TabuList};

/// Tabu list mapping each forbidden move to the first iteration at which it
/// becomes legal again. Compaction keeps the table bounded by discarding
/// expired entries.
#[derive(Debug, Clone)]
pub struct MoveTable {
    tenure: u64,
    expiry: HashMap<Move, u64>,
}

impl MoveTable {
    pub fn new(tenure: u64) -> Self {
        Self {
            tenure,
            expiry: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.expiry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiry.is_empty()
    }
}

impl TabuList for MoveTable {
    fn is_tabu(&self, mv: &Move, iteration: u64) -> bool {
        self.expiry.get(mv).map_or(false, |&until| iteration < until)
    }

    fn forbid(&mut self, mv: Move, iteration: u64) {
        self.expiry.insert(mv, iteration + self.tenure);
    }

    fn compact(&mut self, iteration: u64) {
        self.expiry.retain(|_, until| *until > iteration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_expire_after_tenure() {
        let mut table = MoveTable::new(3);
        let mv = Move::Swap { a: 0, b: 1 };

        table.forbid(mv, 10);
        assert!(table.is_tabu(&mv, 10));
        assert!(table.is_tabu(&mv, 12));
        assert!(!table.is_tabu(&mv, 13));
    }

    #[test]
    fn unknown_moves_are_legal() {
        let table = MoveTable::new(3);
        assert!(!table.is_tabu(&Move::Team { task: 0, team: 1 }, 0));
    }

    #[test]
    fn compact_drops_expired_entries_only() {
        let mut table = MoveTable::new(5);
        table.forbid(Move::Swap { a: 0, b: 1 }, 0); // legal again at 5
        table.forbid(Move::Swap { a: 2, b: 3 }, 10); // legal again at 15

        table.compact(7);
        assert_eq!(table.len(), 1);
        assert!(table.is_tabu(&Move::Swap { a: 2, b: 3 }, 12));
    }
}
