use fxhash::FxHashMap;

use crate::solver::{neighborhood::Move, score::Score};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabuEntry {
    pub mv: Move,
    /// Last iteration during which `mv` is banned.
    pub tabu_until_iteration: usize,
    /// Objective of the solution the ban protects.
    pub cached_objective: Score,
}

#[derive(Debug)]
pub struct TabuList {
    tenure: usize,
    entries: FxHashMap<Move, TabuEntry>,
}

impl TabuList {
    pub fn new(tenure: usize) -> Self {
        assert!(tenure > 0, "Tabu tenure must be positive");

        TabuList {
            tenure,
            entries: FxHashMap::default(),
        }
    }

    /// Bans `mv` for the `tenure` iterations after `iteration`.
    pub fn ban(&mut self, mv: Move, iteration: usize, cached_objective: Score) {
        self.entries.insert(
            mv,
            TabuEntry {
                mv,
                tabu_until_iteration: iteration + self.tenure,
                cached_objective,
            },
        );
    }

    pub fn is_tabu(&self, mv: &Move, iteration: usize) -> bool {
        self.entries
            .get(mv)
            .is_some_and(|entry| iteration <= entry.tabu_until_iteration)
    }

    pub fn entry(&self, mv: &Move) -> Option<&TabuEntry> {
        self.entries.get(mv)
    }

    /// Drops bans that expired before `iteration`.
    pub fn expire(&mut self, iteration: usize) {
        self.entries
            .retain(|_, entry| iteration <= entry.tabu_until_iteration);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::archetype::ArchetypeIdx;

    #[test]
    fn test_ban_lasts_tenure_iterations() {
        let mut tabu = TabuList::new(3);
        let mv = Move::remove(ArchetypeIdx::new(0));

        tabu.ban(mv, 10, Score::soft(1.0));

        assert!(tabu.is_tabu(&mv, 11));
        assert!(tabu.is_tabu(&mv, 13));
        assert!(!tabu.is_tabu(&mv, 14));
        assert!(!tabu.is_tabu(&mv.reverse(), 11));
        assert_eq!(tabu.entry(&mv).unwrap().cached_objective, Score::soft(1.0));

        tabu.expire(14);
        assert!(tabu.is_empty());
    }

    #[test]
    #[should_panic(expected = "Tabu tenure must be positive")]
    fn test_zero_tenure() {
        TabuList::new(0);
    }
}
