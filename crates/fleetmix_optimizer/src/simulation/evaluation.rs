use serde::Serialize;

use crate::{
    problem::{
        fleet_problem::FleetProblem, fleet_solution::FleetSolution, goals::FleetGoals,
        kilometers::Kilometers,
    },
    simulation::simulator::SimulationResult,
    utils::time::DAYS_PER_YEAR,
};

/// Yearly consequences of running a fleet over a simulated stream.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FleetEvaluation {
    /// Fixed yearly cost of every unit plus operating cost.
    pub yearly_cost: f64,
    pub yearly_co2e: f64,
    pub unallocated_trips: usize,
    pub undriven_distance: Kilometers,
    pub units: usize,
    pub unique_archetypes: usize,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub enum GoalViolation {
    Slack { unallocated: usize, slack: usize },
    UndrivenDistance { undriven: Kilometers, max: Kilometers },
    YearlyCost { cost: f64, max: f64 },
    YearlyCo2e { co2e: f64, max: f64 },
}

impl FleetEvaluation {
    /// Annualizes the booked distance of each archetype over `period_days`
    /// and asks the consequence function once per archetype.
    pub fn new(
        problem: &FleetProblem,
        solution: &FleetSolution,
        result: &SimulationResult,
        period_days: f64,
    ) -> Self {
        let mut yearly_cost = 0.0;
        let mut yearly_co2e = 0.0;
        let annualization = DAYS_PER_YEAR / period_days.max(1.0);

        for (index, archetype) in problem.catalog().iter() {
            let units = solution.count(index);
            let booked = result.booked_distance[index.get()];
            if units == 0 && booked.is_zero() {
                continue;
            }

            let annual_distance = booked * annualization;
            let operating = problem.consequences().yearly_consequences(
                archetype.fuel(),
                archetype.consumption_per_km(),
                annual_distance,
            );

            yearly_cost += units as f64 * archetype.yearly_cost() + operating.yearly_cost;
            yearly_co2e += match archetype.co2_per_km() {
                Some(co2_per_km) => annual_distance.value() * co2_per_km,
                None => operating.yearly_co2e,
            };
        }

        FleetEvaluation {
            yearly_cost,
            yearly_co2e,
            unallocated_trips: result.unassigned,
            undriven_distance: result.undriven_distance,
            units: solution.total_units(),
            unique_archetypes: solution.unique_archetypes(),
        }
    }

    pub fn violations(&self, goals: &FleetGoals) -> Vec<GoalViolation> {
        let mut violations = Vec::new();

        if self.unallocated_trips > goals.slack {
            violations.push(GoalViolation::Slack {
                unallocated: self.unallocated_trips,
                slack: goals.slack,
            });
        }

        if let Some(max) = goals.max_undriven_distance
            && self.undriven_distance > max
        {
            violations.push(GoalViolation::UndrivenDistance {
                undriven: self.undriven_distance,
                max,
            });
        }

        if let Some(max) = goals.max_yearly_cost
            && self.yearly_cost > max
        {
            violations.push(GoalViolation::YearlyCost {
                cost: self.yearly_cost,
                max,
            });
        }

        if let Some(max) = goals.max_yearly_co2e
            && self.yearly_co2e > max
        {
            violations.push(GoalViolation::YearlyCo2e {
                co2e: self.yearly_co2e,
                max,
            });
        }

        violations
    }

    pub fn meets(&self, goals: &FleetGoals) -> bool {
        self.violations(goals).is_empty()
    }

    /// How far the evaluation is from meeting the goals: unallocated trips
    /// beyond the slack plus the relative overrun of every ceiling.
    pub fn goal_overrun(&self, goals: &FleetGoals) -> f64 {
        let relative = |value: f64, max: f64| {
            if value <= max {
                0.0
            } else if max > 0.0 {
                (value - max) / max
            } else {
                1.0
            }
        };

        self.violations(goals)
            .iter()
            .map(|violation| match *violation {
                GoalViolation::Slack { unallocated, slack } => (unallocated - slack) as f64,
                GoalViolation::UndrivenDistance { undriven, max } => {
                    relative(undriven.value(), max.value())
                }
                GoalViolation::YearlyCost { cost, max } => relative(cost, max),
                GoalViolation::YearlyCo2e { co2e, max } => relative(co2e, max),
            })
            .sum()
    }
}
