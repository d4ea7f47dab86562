use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::problem::{
    archetype::ArchetypeIdx, fleet_problem::FleetProblem, fleet_solution::FleetSolution,
};

use super::objective::ObjectiveEvaluator;

/// Smallest number of units of one archetype that serves the whole peak day,
/// every other archetype being at its floor.
#[derive(Serialize, Debug, Clone)]
pub struct LeastViableFleet {
    pub archetype: ArchetypeIdx,
    /// First count found to serve every peak-day trip.
    pub breakpoint: usize,
    /// Highest count found to leave trips unassigned, `None` when the floor
    /// already suffices.
    pub last_infeasible: Option<usize>,
    /// Whether `breakpoint` and `last_infeasible` are adjacent (or the floor
    /// was feasible). False when the iteration cap stopped the search.
    pub converged: bool,
    /// False when no archetype serves the peak day on its own. The search
    /// then starts from the archetype leaving the fewest trips unassigned.
    pub viable: bool,
    pub checked_counts: BTreeMap<usize, bool>,
    pub solution: FleetSolution,
}

/// Archetypes are tried from the cheapest yearly cost up. The first one
/// that serves the peak day at its maximum useful count is searched.
pub fn least_viable_fleet(
    problem: &FleetProblem,
    objective: &mut ObjectiveEvaluator<'_>,
    max_iterations: usize,
) -> Option<LeastViableFleet> {
    let base = problem.locked_solution();

    let mut candidates: Vec<ArchetypeIdx> = problem.movable_archetypes().collect();
    candidates.sort_by(|&a, &b| {
        problem
            .archetype(a)
            .yearly_cost()
            .total_cmp(&problem.archetype(b).yearly_cost())
            .then_with(|| priority_rank(problem, a).cmp(&priority_rank(problem, b)))
    });

    let mut fallback: Option<(ArchetypeIdx, usize, usize)> = None;
    for archetype in candidates {
        let upper = problem.max_units(archetype);
        let unassigned = objective.unassigned(&base.with_count(archetype, upper));

        if unassigned == 0 {
            return Some(binary_search(
                problem,
                objective,
                &base,
                archetype,
                upper,
                max_iterations,
            ));
        }

        debug!(
            "Archetype {} leaves {} peak-day trips unassigned with {} units",
            problem.archetype(archetype).external_id(),
            unassigned,
            upper
        );

        if fallback.is_none_or(|(_, _, best)| unassigned < best) {
            fallback = Some((archetype, upper, unassigned));
        }
    }

    let (archetype, upper, _) = fallback?;
    Some(LeastViableFleet {
        archetype,
        breakpoint: upper,
        last_infeasible: None,
        converged: false,
        viable: false,
        checked_counts: BTreeMap::from([(upper, false)]),
        solution: base.with_count(archetype, upper),
    })
}

fn priority_rank(problem: &FleetProblem, archetype: ArchetypeIdx) -> usize {
    problem
        .priority()
        .iter()
        .position(|&index| index == archetype)
        .unwrap_or(usize::MAX)
}

/// Bisects `[floor, upper]` where `upper` is known to be feasible.
fn binary_search(
    problem: &FleetProblem,
    objective: &mut ObjectiveEvaluator<'_>,
    base: &FleetSolution,
    archetype: ArchetypeIdx,
    upper: usize,
    max_iterations: usize,
) -> LeastViableFleet {
    let mut checked_counts = BTreeMap::from([(upper, true)]);
    let mut check = |count: usize, checked_counts: &mut BTreeMap<usize, bool>| {
        let feasible = objective.unassigned(&base.with_count(archetype, count)) == 0;
        checked_counts.insert(count, feasible);
        feasible
    };

    let floor = problem.bounds(archetype).floor;
    let mut high = upper;
    let mut low = floor;

    let (last_infeasible, converged) = if floor >= upper || check(floor, &mut checked_counts) {
        high = floor.min(upper);
        (None, true)
    } else {
        let mut iterations = 0;
        while high - low > 1 && iterations < max_iterations {
            let middle = low + (high - low) / 2;
            if check(middle, &mut checked_counts) {
                high = middle;
            } else {
                low = middle;
            }
            iterations += 1;
        }

        (Some(low), high - low <= 1)
    };

    debug!(
        "Least viable fleet: {} units of {} (checked {:?})",
        high,
        problem.archetype(archetype).external_id(),
        checked_counts
    );

    LeastViableFleet {
        archetype,
        breakpoint: high,
        last_infeasible,
        converged,
        viable: true,
        checked_counts,
        solution: base.with_count(archetype, high),
    }
}
