use std::{cmp::Ordering, collections::BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::{
    problem::{fleet_problem::FleetProblem, fleet_solution::FleetSolution},
    simulation::{
        evaluation::{FleetEvaluation, GoalViolation},
        simulator::{SimulationResult, Simulator},
    },
};

/// A fleet validated on the full trip stream.
#[derive(Serialize, Debug, Clone)]
pub struct RankedFleet {
    pub solution: FleetSolution,
    pub evaluation: FleetEvaluation,
    /// Weighted min/max-normalized cost and emissions within its bucket,
    /// lower is better.
    pub rank_score: f64,
    pub violations: Vec<GoalViolation>,
}

impl RankedFleet {
    pub fn from_simulation(
        problem: &FleetProblem,
        solution: FleetSolution,
        result: &SimulationResult,
    ) -> Self {
        let evaluation =
            FleetEvaluation::new(problem, &solution, result, problem.trips().period_days());
        let violations = evaluation.violations(problem.goals());

        RankedFleet {
            solution,
            evaluation,
            rank_score: 0.0,
            violations,
        }
    }

    pub fn meets_goals(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ranking {
    /// Fleets meeting every goal, best first.
    pub feasible: Vec<RankedFleet>,
    /// Fleets missing a goal, closest to meeting them first.
    pub fallback: Vec<RankedFleet>,
}

/// Re-simulates every distinct candidate on the full stream, splits them by
/// whether they meet the goals, and keeps the best `max_results` of each.
pub fn rank(
    problem: &FleetProblem,
    candidates: impl IntoIterator<Item = FleetSolution>,
    max_results: usize,
) -> Ranking {
    let simulator = Simulator::new(problem, problem.trips());
    let candidates: BTreeSet<FleetSolution> = candidates.into_iter().collect();

    let (mut feasible, mut fallback): (Vec<RankedFleet>, Vec<RankedFleet>) = candidates
        .into_iter()
        .map(|solution| {
            let result = simulator.simulate(&solution);
            RankedFleet::from_simulation(problem, solution, &result)
        })
        .partition(RankedFleet::meets_goals);

    debug!(
        "Validated candidates: {} meet the goals, {} fallback",
        feasible.len(),
        fallback.len()
    );

    assign_rank_scores(problem, &mut feasible);
    assign_rank_scores(problem, &mut fallback);

    feasible.sort_by(compare_ranked);
    fallback.sort_by(|a, b| {
        let goals = problem.goals();
        a.evaluation
            .goal_overrun(goals)
            .total_cmp(&b.evaluation.goal_overrun(goals))
            .then_with(|| compare_ranked(a, b))
    });

    feasible.truncate(max_results);
    fallback.truncate(max_results);

    Ranking { feasible, fallback }
}

fn assign_rank_scores(problem: &FleetProblem, fleets: &mut [RankedFleet]) {
    let bounds = |value: fn(&FleetEvaluation) -> f64| {
        fleets
            .iter()
            .map(|fleet| value(&fleet.evaluation))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
                (min.min(value), max.max(value))
            })
    };
    let (min_cost, max_cost) = bounds(|evaluation| evaluation.yearly_cost);
    let (min_co2e, max_co2e) = bounds(|evaluation| evaluation.yearly_co2e);

    let normalize = |value: f64, min: f64, max: f64| {
        if max > min {
            (value - min) / (max - min)
        } else {
            0.0
        }
    };

    for fleet in fleets.iter_mut() {
        fleet.rank_score = problem.goals().weighted(
            normalize(fleet.evaluation.yearly_cost, min_cost, max_cost),
            normalize(fleet.evaluation.yearly_co2e, min_co2e, max_co2e),
        );
    }
}

/// Rank score, then fewer unique archetypes, then fewer units.
fn compare_ranked(a: &RankedFleet, b: &RankedFleet) -> Ordering {
    a.rank_score
        .total_cmp(&b.rank_score)
        .then_with(|| {
            a.evaluation
                .unique_archetypes
                .cmp(&b.evaluation.unique_archetypes)
        })
        .then_with(|| a.evaluation.units.cmp(&b.evaluation.units))
        .then_with(|| a.solution.cmp(&b.solution))
}
