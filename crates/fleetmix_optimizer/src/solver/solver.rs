use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use jiff::Timestamp;
use parking_lot::{Mutex, RwLock};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::{FleetError, Inconsistency},
    problem::{fleet_problem::FleetProblem, fleet_solution::FleetSolution},
    simulation::simulator::Simulator,
    timer_debug,
};

use super::{
    accepted_solution::SolutionPool,
    driving_book::DrivingBook,
    least_viable::{LeastViableFleet, least_viable_fleet},
    objective::ObjectiveEvaluator,
    ranking::{RankedFleet, rank},
    score::ScoreNormalizer,
    solver_params::{SearchClock, SolverParams},
    statistics::SearchStatistics,
    tabu_search::{ProgressHandler, RunOutcome, SearchRun, TabuSearch},
};

#[derive(Copy, Clone, Debug, Serialize, JsonSchema, PartialEq, Eq)]
pub enum SolverStatus {
    Pending,
    Running,
    Completed,
}

/// Ranked fleets of a finished search.
#[derive(Serialize, Debug, Clone)]
pub struct FleetReport {
    /// At most `max_results` fleets, best first.
    pub fleets: Vec<RankedFleet>,
    pub least_viable: LeastViableFleet,
    /// The historical fleet replayed on the full stream, when one was given.
    pub current_fleet: Option<RankedFleet>,
    /// Why the historical fleet could not be replayed. The search result
    /// stands regardless.
    pub current_fleet_error: Option<Inconsistency>,
}

impl FleetReport {
    pub fn best(&self) -> Option<&RankedFleet> {
        self.fleets.first()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub enum Infeasibility {
    /// Every archetype is fixed by its bounds, there is nothing to search.
    NoMovableArchetypes,
    /// The fixed yearly cost of the locked units alone exceeds the ceiling.
    LockedFleetExceedsCost { locked_cost: f64, max_yearly_cost: f64 },
}

#[derive(Serialize, Debug, Clone)]
pub enum SolverOutcome {
    Solved(FleetReport),
    /// No candidate met every goal, the fleets closest to them are reported.
    GoalsUnmet(FleetReport),
    Infeasible(Infeasibility),
    Aborted,
}

impl SolverOutcome {
    pub fn report(&self) -> Option<&FleetReport> {
        match self {
            SolverOutcome::Solved(report) | SolverOutcome::GoalsUnmet(report) => Some(report),
            SolverOutcome::Infeasible(_) | SolverOutcome::Aborted => None,
        }
    }
}

pub struct Solver {
    problem: Arc<FleetProblem>,
    params: SolverParams,
    status: RwLock<SolverStatus>,
    is_stopped: Arc<AtomicBool>,
    progress_handler: Option<ProgressHandler>,
    statistics: RwLock<SearchStatistics>,
    created_at: Timestamp,
}

impl Solver {
    pub fn new(problem: FleetProblem, params: SolverParams) -> Self {
        Solver {
            problem: Arc::new(problem),
            params,
            status: RwLock::new(SolverStatus::Pending),
            is_stopped: Arc::new(AtomicBool::new(false)),
            progress_handler: None,
            statistics: RwLock::new(SearchStatistics::default()),
            created_at: Timestamp::now(),
        }
    }

    /// `callback` receives the fraction of the search budget consumed, in `[0, 1]`.
    pub fn on_progress<F>(&mut self, callback: F)
    where
        F: FnMut(f64) + Send + Sync + 'static,
    {
        self.progress_handler = Some(Arc::new(Mutex::new(callback)));
    }

    pub fn problem(&self) -> &FleetProblem {
        &self.problem
    }

    pub fn solve(&self) -> Result<SolverOutcome, FleetError> {
        self.is_stopped.store(false, Ordering::Relaxed);
        *self.status.write() = SolverStatus::Running;
        let outcome = self.run();
        *self.status.write() = SolverStatus::Completed;
        outcome
    }

    /// Asks a running search to stop at the end of its current iteration.
    pub fn stop(&self) {
        self.is_stopped.store(true, Ordering::Relaxed);
    }

    pub fn status(&self) -> SolverStatus {
        *self.status.read()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn statistics(&self) -> SearchStatistics {
        self.statistics.read().clone()
    }

    /// Full-stream driving book of a fleet.
    pub fn driving_book(&self, solution: &FleetSolution) -> DrivingBook {
        DrivingBook::for_solution(&self.problem, solution)
    }

    /// Driving book of the historical fleet, replaying recorded vehicles.
    pub fn current_fleet_driving_book(&self) -> Result<DrivingBook, FleetError> {
        let problem = &*self.problem;
        let result = Simulator::new(problem, problem.trips()).replay()?;
        Ok(DrivingBook::new(problem, problem.trips(), &result))
    }

    /// Replays the historical fleet on the full stream. `None` without a
    /// current fleet.
    pub fn evaluate_current_fleet(&self) -> Result<Option<RankedFleet>, FleetError> {
        let problem = &*self.problem;
        if problem.current_fleet().is_empty() {
            return Ok(None);
        }

        let result = Simulator::new(problem, problem.trips()).replay()?;
        Ok(Some(RankedFleet::from_simulation(
            problem,
            problem.current_fleet_solution(),
            &result,
        )))
    }

    fn run(&self) -> Result<SolverOutcome, FleetError> {
        let problem = &*self.problem;
        let params = &self.params;
        let clock = SearchClock::start(params);

        if !problem.has_movable_archetypes() {
            warn!("Every archetype is fixed, nothing to optimize");
            return Ok(SolverOutcome::Infeasible(
                Infeasibility::NoMovableArchetypes,
            ));
        }

        if let Some(max_yearly_cost) = problem.goals().max_yearly_cost {
            let locked_cost: f64 = problem
                .locked_solution()
                .iter()
                .map(|(index, count)| count as f64 * problem.archetype(index).yearly_cost())
                .sum();

            if locked_cost > max_yearly_cost {
                warn!(
                    "Locked units cost {} a year, above the ceiling of {}",
                    locked_cost, max_yearly_cost
                );
                return Ok(SolverOutcome::Infeasible(
                    Infeasibility::LockedFleetExceedsCost {
                        locked_cost,
                        max_yearly_cost,
                    },
                ));
            }
        }

        let mut objective = ObjectiveEvaluator::new(problem);
        let Some(least_viable) = timer_debug!(
            "Least viable fleet",
            least_viable_fleet(problem, &mut objective, params.least_viable_max_iterations)
        ) else {
            return Ok(SolverOutcome::Infeasible(
                Infeasibility::NoMovableArchetypes,
            ));
        };
        let least_viable_checks = objective.evaluations();

        info!(
            "Least viable fleet: {} units of {}{}",
            least_viable.breakpoint,
            problem.archetype(least_viable.archetype).external_id(),
            if least_viable.viable {
                ""
            } else {
                " (no single archetype serves the peak day)"
            }
        );

        let normalizer =
            ScoreNormalizer::from_evaluation(objective.evaluate(&least_viable.solution));
        objective.set_normalizer(normalizer);

        let mut pool = SolutionPool::new(params.max_solutions);
        let search = TabuSearch::new(
            problem,
            params,
            &self.is_stopped,
            self.progress_handler.as_ref(),
        )
        .with_clock(clock);
        let mut rng = SmallRng::seed_from_u64(params.seed);
        let base_units = least_viable.solution.total_units();
        let offsets = if params.floor_offsets.is_empty() {
            vec![0]
        } else {
            params.floor_offsets.clone()
        };

        let mut runs = Vec::with_capacity(offsets.len());
        let mut aborted = false;
        for (index, &offset) in offsets.iter().enumerate() {
            if index > 0 && clock.is_expired() {
                info!(
                    "Time budget spent after {:?}, skipping {} search runs",
                    clock.elapsed(),
                    offsets.len() - index
                );
                break;
            }

            let start = if index == 0 {
                least_viable.solution.clone()
            } else {
                diversify(problem, &least_viable.solution, offset, &mut rng)
            };

            let run = SearchRun {
                index,
                runs: offsets.len(),
                start,
                min_units: base_units + offset,
            };

            let (outcome, statistics) = timer_debug!(
                "Search run",
                search.run(&run, &mut objective, &mut pool)
            );
            info!(
                "Search run {} (min {} units): {} iterations, best {:?}",
                index, run.min_units, statistics.iterations, statistics.best_score
            );
            runs.push(statistics);

            if outcome == RunOutcome::Aborted {
                aborted = true;
                break;
            }
        }

        *self.statistics.write() = SearchStatistics {
            evaluations: objective.evaluations(),
            cache_hits: objective.cache_hits(),
            least_viable_checks,
            runs,
        };

        if aborted {
            return Ok(SolverOutcome::Aborted);
        }

        let mut candidates: Vec<FleetSolution> = pool
            .into_solutions()
            .into_iter()
            .map(|accepted| accepted.solution)
            .collect();
        candidates.push(least_viable.solution.clone());

        let ranking = timer_debug!("Ranking", rank(problem, candidates, params.max_results));
        let (current_fleet, current_fleet_error) = match self.evaluate_current_fleet() {
            Ok(current_fleet) => (current_fleet, None),
            Err(FleetError::SimulationInconsistency(inconsistency)) => {
                warn!("Current fleet replay failed: {}", inconsistency);
                (None, Some(inconsistency))
            }
            Err(error) => return Err(error),
        };

        if let Some(handler) = &self.progress_handler {
            handler.lock()(1.0);
        }

        if ranking.feasible.is_empty() {
            warn!("No candidate meets the goals, reporting the closest fleets");
            Ok(SolverOutcome::GoalsUnmet(FleetReport {
                fleets: ranking.fallback,
                least_viable,
                current_fleet,
                current_fleet_error,
            }))
        } else {
            Ok(SolverOutcome::Solved(FleetReport {
                fleets: ranking.feasible,
                least_viable,
                current_fleet,
                current_fleet_error,
            }))
        }
    }
}

/// Adds `extra` units to randomly chosen movable archetypes with room left.
fn diversify(
    problem: &FleetProblem,
    seed: &FleetSolution,
    extra: usize,
    rng: &mut SmallRng,
) -> FleetSolution {
    let mut solution = seed.clone();

    for _ in 0..extra {
        let open: Vec<_> = problem
            .movable_archetypes()
            .filter(|&index| {
                let count = solution.count(index);
                count < problem.max_units(index) && problem.bounds(index).allows(count + 1)
            })
            .collect();

        if open.is_empty() {
            break;
        }

        let index = open[rng.random_range(0..open.len())];
        solution.set_count(index, solution.count(index) + 1);
    }

    debug!("Diversified start: {:?}", solution.counts());
    solution
}
