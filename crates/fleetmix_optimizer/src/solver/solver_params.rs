use jiff::{SignedDuration, Timestamp};

#[derive(Clone, Debug)]
pub struct SolverParams {
    pub terminations: Vec<Termination>,

    /// Iterations during which the reverse of an applied move stays banned.
    pub tabu_tenure: usize,
    /// Distinct candidates kept from the search for full-stream validation.
    pub max_solutions: usize,
    /// Ranked fleets reported at most.
    pub max_results: usize,

    /// Extra units above the least viable fleet size, one search run each.
    pub floor_offsets: Vec<usize>,
    pub least_viable_max_iterations: usize,

    pub seed: u64,
}

/// Iteration counts apply to each search run. A duration bounds the whole
/// solve from its start, runs that finish early leave their time to the next.
#[derive(Clone, Debug)]
pub enum Termination {
    Duration(SignedDuration),
    Iterations(usize),
    IterationsWithoutImprovement(usize),
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            terminations: vec![
                Termination::IterationsWithoutImprovement(50),
                Termination::Iterations(500),
                Termination::Duration(SignedDuration::from_mins(2)),
            ],
            tabu_tenure: 5,
            max_solutions: 20,
            max_results: 5,
            floor_offsets: vec![0, 1, 2],
            least_viable_max_iterations: 32,
            seed: 2_427_121,
        }
    }
}

impl SolverParams {
    pub fn runs(&self) -> usize {
        self.floor_offsets.len().max(1)
    }

    /// Wall-clock budget of a whole solve.
    pub fn max_duration(&self) -> Option<SignedDuration> {
        self.terminations
            .iter()
            .filter_map(|termination| match termination {
                Termination::Duration(duration) => Some(*duration),
                _ => None,
            })
            .min()
    }
}

/// Time spent since a solve started, against its wall-clock budget.
#[derive(Debug, Clone, Copy)]
pub struct SearchClock {
    started: Timestamp,
    budget: Option<SignedDuration>,
}

impl SearchClock {
    pub fn start(params: &SolverParams) -> Self {
        SearchClock {
            started: Timestamp::now(),
            budget: params.max_duration(),
        }
    }

    pub fn elapsed(&self) -> SignedDuration {
        Timestamp::now().duration_since(self.started)
    }

    pub fn is_expired(&self) -> bool {
        self.budget.is_some_and(|budget| self.elapsed() >= budget)
    }

    /// Share of the budget consumed, `None` without a budget.
    pub fn consumed(&self) -> Option<f64> {
        self.budget.map(|budget| {
            if budget.is_zero() {
                1.0
            } else {
                (self.elapsed().as_secs_f64() / budget.as_secs_f64()).min(1.0)
            }
        })
    }
}
