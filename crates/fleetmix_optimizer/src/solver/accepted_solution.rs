use serde::Serialize;

use crate::{problem::fleet_solution::FleetSolution, simulation::evaluation::FleetEvaluation};

use super::score::Score;

/// A fleet scored on the peak day.
#[derive(Serialize, Debug, Clone)]
pub struct AcceptedSolution {
    pub solution: FleetSolution,
    pub score: Score,
    pub evaluation: FleetEvaluation,
}

impl AcceptedSolution {
    pub fn is_feasible(&self) -> bool {
        !self.score.is_failure()
    }
}

/// The best distinct solutions seen by the search, ordered by score.
#[derive(Debug, Clone)]
pub struct SolutionPool {
    capacity: usize,
    solutions: Vec<AcceptedSolution>,
}

impl SolutionPool {
    pub fn new(capacity: usize) -> Self {
        SolutionPool {
            capacity: capacity.max(1),
            solutions: Vec::with_capacity(capacity + 1),
        }
    }

    /// Keeps `candidate` when it is new and among the best `capacity`
    /// solutions. Equal scores keep the earlier solution first.
    pub fn offer(&mut self, candidate: AcceptedSolution) -> bool {
        if self
            .solutions
            .iter()
            .any(|solution| solution.solution == candidate.solution)
        {
            return false;
        }

        if self.solutions.len() >= self.capacity
            && self
                .solutions
                .last()
                .is_some_and(|worst| candidate.score >= worst.score)
        {
            return false;
        }

        let position = self
            .solutions
            .partition_point(|solution| solution.score <= candidate.score);
        self.solutions.insert(position, candidate);
        self.solutions.truncate(self.capacity);
        true
    }

    pub fn best(&self) -> Option<&AcceptedSolution> {
        self.solutions.first()
    }

    pub fn solutions(&self) -> &[AcceptedSolution] {
        &self.solutions
    }

    pub fn into_solutions(self) -> Vec<AcceptedSolution> {
        self.solutions
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}
