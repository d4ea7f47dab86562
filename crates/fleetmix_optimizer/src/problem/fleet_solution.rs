use serde::Serialize;

use crate::{problem::archetype::ArchetypeIdx, utils::enumerate_idx::EnumerateIdx};

/// A candidate fleet: how many units of each archetype to run.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FleetSolution(Vec<usize>);

impl FleetSolution {
    pub fn new(counts: Vec<usize>) -> Self {
        FleetSolution(counts)
    }

    pub fn empty(archetypes: usize) -> Self {
        FleetSolution(vec![0; archetypes])
    }

    pub fn counts(&self) -> &[usize] {
        &self.0
    }

    pub fn count(&self, archetype: ArchetypeIdx) -> usize {
        self.0[archetype.get()]
    }

    pub fn set_count(&mut self, archetype: ArchetypeIdx, count: usize) {
        self.0[archetype.get()] = count;
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_units(&self) -> usize {
        self.0.iter().sum()
    }

    /// Number of archetypes with at least one unit.
    pub fn unique_archetypes(&self) -> usize {
        self.0.iter().filter(|&&count| count > 0).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeIdx, usize)> + '_ {
        self.0.iter().copied().enumerate_idx()
    }

    pub fn with_count(&self, archetype: ArchetypeIdx, count: usize) -> FleetSolution {
        let mut solution = self.clone();
        solution.set_count(archetype, count);
        solution
    }
}

/// Contractual limits on one archetype. Locked archetypes carry a floor
/// (units that must be kept) and/or a ceiling.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchetypeBounds {
    pub floor: usize,
    pub ceiling: Option<usize>,
}

impl ArchetypeBounds {
    pub const FREE: ArchetypeBounds = ArchetypeBounds {
        floor: 0,
        ceiling: None,
    };

    pub fn fixed(count: usize) -> Self {
        ArchetypeBounds {
            floor: count,
            ceiling: Some(count),
        }
    }

    /// A fixed archetype can never be changed by a move.
    pub fn is_fixed(&self) -> bool {
        self.ceiling == Some(self.floor)
    }

    pub fn allows(&self, count: usize) -> bool {
        count >= self.floor && self.ceiling.is_none_or(|ceiling| count <= ceiling)
    }

    pub fn clamp(&self, count: usize) -> usize {
        let count = count.max(self.floor);
        match self.ceiling {
            Some(ceiling) => count.min(ceiling),
            None => count,
        }
    }
}
