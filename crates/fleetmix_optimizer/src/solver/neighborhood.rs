use std::fmt;

use serde::Serialize;

use crate::problem::{
    archetype::ArchetypeIdx, fleet_problem::FleetProblem, fleet_solution::FleetSolution,
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Add,
    Remove,
}

/// Adds or removes one unit of an archetype.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    pub archetype: ArchetypeIdx,
    pub direction: Direction,
}

impl Move {
    pub fn add(archetype: ArchetypeIdx) -> Self {
        Move {
            archetype,
            direction: Direction::Add,
        }
    }

    pub fn remove(archetype: ArchetypeIdx) -> Self {
        Move {
            archetype,
            direction: Direction::Remove,
        }
    }

    pub fn reverse(&self) -> Self {
        Move {
            archetype: self.archetype,
            direction: match self.direction {
                Direction::Add => Direction::Remove,
                Direction::Remove => Direction::Add,
            },
        }
    }

    pub fn apply(&self, solution: &FleetSolution) -> FleetSolution {
        let count = solution.count(self.archetype);
        let count = match self.direction {
            Direction::Add => count + 1,
            Direction::Remove => count.saturating_sub(1),
        };
        solution.with_count(self.archetype, count)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Add => write!(f, "+{}", self.archetype),
            Direction::Remove => write!(f, "-{}", self.archetype),
        }
    }
}

/// Every `±1` move on a movable archetype that keeps the archetype within
/// its bounds and the fleet at or above `min_units`.
pub fn neighborhood(problem: &FleetProblem, solution: &FleetSolution, min_units: usize) -> Vec<Move> {
    let total_units = solution.total_units();
    let mut moves = Vec::with_capacity(problem.archetypes_len() * 2);

    for archetype in problem.movable_archetypes() {
        let count = solution.count(archetype);
        let bounds = problem.bounds(archetype);

        if count < problem.max_units(archetype) && bounds.allows(count + 1) {
            moves.push(Move::add(archetype));
        }

        if count > 0 && bounds.allows(count - 1) && total_units > min_units {
            moves.push(Move::remove(archetype));
        }
    }

    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problem::{
            catalog::ArchetypeCatalog, fleet_problem::FleetProblemBuilder,
            fleet_solution::ArchetypeBounds, trip_stream::TripStream,
        },
        test_utils::{create_car, create_trip},
    };

    #[test]
    fn test_moves_respect_bounds() {
        let trips = vec![
            create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 20.0),
            create_trip("b", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 20.0),
        ];
        let mut builder = FleetProblemBuilder::default();
        builder
            .set_trips(TripStream::new(trips).unwrap())
            .set_catalog(ArchetypeCatalog::new(vec![
                create_car("a", 3000.0),
                create_car("b", 3100.0),
                create_car("c", 3200.0),
            ]))
            .add_bounds(ArchetypeIdx::new(0), ArchetypeBounds::fixed(1))
            .add_bounds(
                ArchetypeIdx::new(1),
                ArchetypeBounds {
                    floor: 1,
                    ceiling: None,
                },
            );
        let problem = builder.build().unwrap();

        let solution = FleetSolution::new(vec![1, 1, 2]);
        let moves = neighborhood(&problem, &solution, 0);

        // Two peak-day trips cap every archetype at two units.
        assert_eq!(
            moves,
            vec![
                Move::add(ArchetypeIdx::new(1)),
                Move::remove(ArchetypeIdx::new(2)),
            ]
        );

        let moves = neighborhood(&problem, &solution, 4);
        assert_eq!(moves, vec![Move::add(ArchetypeIdx::new(1))]);
    }

    #[test]
    fn test_reverse() {
        let mv = Move::add(ArchetypeIdx::new(3));
        assert_eq!(mv.reverse(), Move::remove(ArchetypeIdx::new(3)));
        assert_eq!(mv.reverse().reverse(), mv);
        assert_eq!(
            mv.apply(&FleetSolution::new(vec![0, 0, 0, 1])).counts(),
            &[0, 0, 0, 2]
        );
    }
}
