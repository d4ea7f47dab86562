use fxhash::FxHashMap;

use crate::{
    problem::{fleet_problem::FleetProblem, fleet_solution::FleetSolution},
    simulation::{evaluation::FleetEvaluation, simulator::Simulator},
};

use super::{
    accepted_solution::AcceptedSolution,
    score::{Score, ScoreNormalizer},
};

/// Scores fleets on the peak day, memoizing the simulation of every fleet
/// already seen.
pub struct ObjectiveEvaluator<'a> {
    problem: &'a FleetProblem,
    simulator: Simulator<'a>,
    normalizer: ScoreNormalizer,
    cache: FxHashMap<FleetSolution, FleetEvaluation>,
    evaluations: usize,
    cache_hits: usize,
}

impl<'a> ObjectiveEvaluator<'a> {
    pub fn new(problem: &'a FleetProblem) -> Self {
        ObjectiveEvaluator {
            problem,
            simulator: Simulator::new(problem, problem.peak_day()),
            normalizer: ScoreNormalizer::default(),
            cache: FxHashMap::default(),
            evaluations: 0,
            cache_hits: 0,
        }
    }

    pub fn set_normalizer(&mut self, normalizer: ScoreNormalizer) {
        self.normalizer = normalizer;
    }

    pub fn evaluate(&mut self, solution: &FleetSolution) -> &FleetEvaluation {
        if self.cache.contains_key(solution) {
            self.cache_hits += 1;
        } else {
            self.evaluations += 1;
            let result = self.simulator.simulate(solution);
            let evaluation = FleetEvaluation::new(
                self.problem,
                solution,
                &result,
                self.problem.peak_day().period_days(),
            );
            self.cache.insert(solution.clone(), evaluation);
        }

        &self.cache[solution]
    }

    pub fn score(&mut self, solution: &FleetSolution) -> Score {
        let (normalizer, problem) = (self.normalizer, self.problem);
        normalizer.score(self.evaluate(solution), problem.goals())
    }

    pub fn accepted(&mut self, solution: &FleetSolution) -> AcceptedSolution {
        let (normalizer, problem) = (self.normalizer, self.problem);
        let evaluation = self.evaluate(solution).clone();

        AcceptedSolution {
            solution: solution.clone(),
            score: normalizer.score(&evaluation, problem.goals()),
            evaluation,
        }
    }

    pub fn unassigned(&mut self, solution: &FleetSolution) -> usize {
        self.evaluate(solution).unallocated_trips
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problem::catalog::ArchetypeCatalog,
        test_utils::{create_car, create_problem, create_trip},
    };

    #[test]
    fn test_evaluations_are_cached() {
        let trips = vec![
            create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 20.0),
            create_trip("b", "2024-03-04T09:00:00Z", "2024-03-04T11:00:00Z", 20.0),
        ];
        let problem = create_problem(
            trips,
            ArchetypeCatalog::new(vec![create_car("car", 3000.0)]),
        );
        let mut objective = ObjectiveEvaluator::new(&problem);

        assert_eq!(objective.unassigned(&FleetSolution::new(vec![1])), 1);
        assert_eq!(objective.unassigned(&FleetSolution::new(vec![2])), 0);
        assert!(objective.score(&FleetSolution::new(vec![1])).is_failure());

        assert_eq!(objective.evaluations(), 2);
        assert_eq!(objective.cache_hits(), 1);
    }
}
