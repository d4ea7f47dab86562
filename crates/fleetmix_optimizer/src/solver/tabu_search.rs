use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use jiff::Timestamp;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::problem::{fleet_problem::FleetProblem, fleet_solution::FleetSolution};

use super::{
    accepted_solution::SolutionPool,
    neighborhood::{Move, neighborhood},
    objective::ObjectiveEvaluator,
    score::Score,
    solver_params::{SearchClock, SolverParams, Termination},
    statistics::{AppliedMove, RunStatistics, ScoreEvolutionRow},
    tabu_list::TabuList,
};

pub type ProgressHandler = Arc<Mutex<dyn FnMut(f64) + Send + Sync + 'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Aborted,
}

/// One restart of the local search.
#[derive(Debug, Clone)]
pub struct SearchRun {
    pub index: usize,
    pub runs: usize,
    pub start: FleetSolution,
    /// No move may bring the fleet below this many units.
    pub min_units: usize,
}

struct SearchState {
    iteration: usize,
    iterations_without_improvement: usize,
    start: Timestamp,
}

pub struct TabuSearch<'a> {
    problem: &'a FleetProblem,
    params: &'a SolverParams,
    is_stopped: &'a AtomicBool,
    progress_handler: Option<&'a ProgressHandler>,
    clock: SearchClock,
}

impl<'a> TabuSearch<'a> {
    pub fn new(
        problem: &'a FleetProblem,
        params: &'a SolverParams,
        is_stopped: &'a AtomicBool,
        progress_handler: Option<&'a ProgressHandler>,
    ) -> Self {
        TabuSearch {
            problem,
            params,
            is_stopped,
            progress_handler,
            clock: SearchClock::start(params),
        }
    }

    /// Measures the duration termination from `clock` instead of from the
    /// creation of the search.
    pub fn with_clock(mut self, clock: SearchClock) -> Self {
        self.clock = clock;
        self
    }

    /// Walks from `run.start` to the best admissible neighbour at every
    /// iteration, even when it is worse than the current fleet. Every
    /// neighbour scored along the way is offered to `pool`.
    pub fn run(
        &self,
        run: &SearchRun,
        objective: &mut ObjectiveEvaluator<'_>,
        pool: &mut SolutionPool,
    ) -> (RunOutcome, RunStatistics) {
        let mut statistics = RunStatistics::new(run.index, run.min_units);
        let mut state = SearchState {
            iteration: 0,
            iterations_without_improvement: 0,
            start: Timestamp::now(),
        };
        let mut tabu = TabuList::new(self.params.tabu_tenure.max(1));

        let mut current = run.start.clone();
        let start = objective.accepted(&current);
        let mut current_score = start.score;
        let mut best_score = start.score;
        pool.offer(start);
        statistics.add_best_score(ScoreEvolutionRow {
            timestamp: Timestamp::now(),
            iteration: 0,
            score: best_score,
            solution: current.clone(),
        });

        let outcome = loop {
            if self.is_stopped.load(Ordering::Relaxed) {
                info!("Search run {} stopped at iteration {}", run.index, state.iteration);
                break RunOutcome::Aborted;
            }

            if self.should_terminate(&state) {
                break RunOutcome::Completed;
            }

            let mut chosen: Option<(Move, FleetSolution, Score, bool)> = None;
            for mv in neighborhood(self.problem, &current, run.min_units) {
                let candidate = mv.apply(&current);
                let accepted = objective.accepted(&candidate);
                let score = accepted.score;
                pool.offer(accepted);

                let is_tabu = tabu.is_tabu(&mv, state.iteration);
                if is_tabu && score >= best_score {
                    continue;
                }

                if chosen
                    .as_ref()
                    .is_none_or(|(_, _, chosen_score, _)| score < *chosen_score)
                {
                    chosen = Some((mv, candidate, score, is_tabu));
                }
            }

            let Some((mv, candidate, score, aspiration)) = chosen else {
                debug!(
                    "Search run {}: no admissible move at iteration {}",
                    run.index, state.iteration
                );
                break RunOutcome::Completed;
            };

            tabu.ban(mv.reverse(), state.iteration, current_score);
            statistics.add_applied_move(AppliedMove {
                iteration: state.iteration,
                mv,
                aspiration,
            });

            current = candidate;
            current_score = score;

            if score < best_score {
                best_score = score;
                state.iterations_without_improvement = 0;
                statistics.add_best_score(ScoreEvolutionRow {
                    timestamp: Timestamp::now(),
                    iteration: state.iteration,
                    score,
                    solution: current.clone(),
                });
                debug!(
                    "Search run {}: best score {:?} at iteration {} with {:?}",
                    run.index,
                    score,
                    state.iteration,
                    current.counts()
                );
            } else {
                state.iterations_without_improvement += 1;
            }

            state.iteration += 1;
            tabu.expire(state.iteration);
            self.report_progress(run, &state);
        };

        statistics.iterations = state.iteration;
        statistics.duration = Timestamp::now().duration_since(state.start);

        (outcome, statistics)
    }

    fn check_termination(&self, state: &SearchState, termination: &Termination) -> bool {
        match *termination {
            Termination::Iterations(max_iterations) => state.iteration >= max_iterations,
            Termination::Duration(_) => self.clock.is_expired(),
            Termination::IterationsWithoutImprovement(max_iterations_without_improvement) => {
                state.iterations_without_improvement >= max_iterations_without_improvement
            }
        }
    }

    fn should_terminate(&self, state: &SearchState) -> bool {
        self.params.terminations.iter().any(|termination| {
            if self.check_termination(state, termination) {
                debug!(
                    "Termination condition met: {:?} at iteration {}",
                    termination, state.iteration
                );
                true
            } else {
                false
            }
        })
    }

    /// Share of the run already consumed, by whichever iteration count is
    /// closest.
    fn run_progress(&self, state: &SearchState) -> f64 {
        self.params
            .terminations
            .iter()
            .map(|termination| match *termination {
                Termination::Iterations(max_iterations) => {
                    state.iteration as f64 / max_iterations.max(1) as f64
                }
                Termination::Duration(_) => 0.0,
                Termination::IterationsWithoutImprovement(max_iterations) => {
                    state.iterations_without_improvement as f64 / max_iterations.max(1) as f64
                }
            })
            .fold(0.0, f64::max)
            .min(1.0)
    }

    fn report_progress(&self, run: &SearchRun, state: &SearchState) {
        if let Some(handler) = self.progress_handler {
            let runs = (run.index as f64 + self.run_progress(state)) / run.runs.max(1) as f64;
            let fraction = runs.max(self.clock.consumed().unwrap_or(0.0));
            handler.lock()(fraction.clamp(0.0, 1.0));
        }
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
    fn test_search_drops_idle_units() {
        let trips = vec![
            create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 20.0),
            create_trip("b", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 20.0),
            create_trip("c", "2024-03-04T12:00:00Z", "2024-03-04T13:00:00Z", 20.0),
        ];
        let problem = create_problem(
            trips,
            ArchetypeCatalog::new(vec![create_car("cheap", 3000.0), create_car("pricey", 6000.0)]),
        );
        let params = SolverParams {
            terminations: vec![Termination::Iterations(20)],
            ..SolverParams::default()
        };
        let is_stopped = AtomicBool::new(false);
        let search = TabuSearch::new(&problem, &params, &is_stopped, None);
        let mut objective = ObjectiveEvaluator::new(&problem);
        let mut pool = SolutionPool::new(5);

        let run = SearchRun {
            index: 0,
            runs: 1,
            start: FleetSolution::new(vec![2, 2]),
            min_units: 0,
        };
        let (outcome, statistics) = search.run(&run, &mut objective, &mut pool);

        assert_eq!(outcome, RunOutcome::Completed);
        assert!(statistics.iterations > 0 && statistics.iterations <= 20);
        assert_eq!(pool.best().unwrap().solution.counts(), &[2, 0]);
        assert!(pool.best().unwrap().is_feasible());
    }

    #[test]
    fn test_stopped_search_is_aborted() {
        let trips = vec![create_trip(
            "a",
            "2024-03-04T08:00:00Z",
            "2024-03-04T10:00:00Z",
            20.0,
        )];
        let problem = create_problem(trips, ArchetypeCatalog::new(vec![create_car("car", 3000.0)]));
        let params = SolverParams::default();
        let is_stopped = AtomicBool::new(true);
        let search = TabuSearch::new(&problem, &params, &is_stopped, None);
        let mut objective = ObjectiveEvaluator::new(&problem);
        let mut pool = SolutionPool::new(5);

        let run = SearchRun {
            index: 0,
            runs: 1,
            start: FleetSolution::new(vec![1]),
            min_units: 0,
        };
        let (outcome, statistics) = search.run(&run, &mut objective, &mut pool);

        assert_eq!(outcome, RunOutcome::Aborted);
        assert_eq!(statistics.iterations, 0);
    }

    #[test]
    fn test_reversed_moves_wait_for_their_tenure() {
        let trips = vec![
            create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 20.0),
            create_trip("b", "2024-03-04T09:00:00Z", "2024-03-04T11:00:00Z", 20.0),
            create_trip("c", "2024-03-04T09:30:00Z", "2024-03-04T12:00:00Z", 20.0),
        ];
        let problem = create_problem(
            trips,
            ArchetypeCatalog::new(vec![
                create_car("small", 3000.0),
                create_car("large", 3500.0),
            ]),
        );
        let params = SolverParams {
            terminations: vec![Termination::Iterations(40)],
            tabu_tenure: 3,
            ..SolverParams::default()
        };
        let is_stopped = AtomicBool::new(false);
        let search = TabuSearch::new(&problem, &params, &is_stopped, None);
        let mut objective = ObjectiveEvaluator::new(&problem);
        let mut pool = SolutionPool::new(5);

        let run = SearchRun {
            index: 0,
            runs: 1,
            start: FleetSolution::new(vec![1, 1]),
            min_units: 0,
        };
        let (_, statistics) = search.run(&run, &mut objective, &mut pool);

        let moves = &statistics.applied_moves;
        assert!(!moves.is_empty());
        for (i, applied) in moves.iter().enumerate() {
            let banned = moves[..i].iter().any(|earlier| {
                earlier.mv.reverse() == applied.mv
                    && applied.iteration <= earlier.iteration + params.tabu_tenure
            });
            assert!(!banned || applied.aspiration);
        }
        assert_eq!(pool.best().unwrap().solution.counts(), &[3, 0]);
    }
}
