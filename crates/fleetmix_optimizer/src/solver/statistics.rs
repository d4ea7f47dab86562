use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};

use crate::problem::{archetype::ArchetypeIdx, fleet_solution::FleetSolution};

use super::{neighborhood::Move, score::Score};

#[derive(Default, Serialize, Debug, Clone)]
pub struct SearchStatistics {
    pub evaluations: usize,
    pub cache_hits: usize,
    pub least_viable_checks: usize,
    pub runs: Vec<RunStatistics>,
}

impl SearchStatistics {
    pub fn total_iterations(&self) -> usize {
        self.runs.iter().map(|run| run.iterations).sum()
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ScoreEvolutionRow {
    pub timestamp: Timestamp,
    pub iteration: usize,
    pub score: Score,
    pub solution: FleetSolution,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct AppliedMove {
    pub iteration: usize,
    pub mv: Move,
    /// Applied although tabu, because it improved the best score.
    pub aspiration: bool,
}

#[serde_as]
#[derive(Serialize, Debug, Clone)]
pub struct RunStatistics {
    pub run: usize,
    pub min_units: usize,
    pub iterations: usize,
    pub duration: SignedDuration,
    pub best_score: Score,
    pub score_evolution: Vec<ScoreEvolutionRow>,

    #[serde(skip_serializing)]
    pub applied_moves: Vec<AppliedMove>,

    #[serde_as(as = "FxHashMap<DisplayFromStr, _>")]
    pub moves_per_archetype: FxHashMap<ArchetypeIdx, usize>,
}

impl RunStatistics {
    pub fn new(run: usize, min_units: usize) -> Self {
        RunStatistics {
            run,
            min_units,
            iterations: 0,
            duration: SignedDuration::ZERO,
            best_score: Score::MAX,
            score_evolution: Vec::new(),
            applied_moves: Vec::new(),
            moves_per_archetype: FxHashMap::default(),
        }
    }

    pub fn add_applied_move(&mut self, applied: AppliedMove) {
        self.moves_per_archetype
            .entry(applied.mv.archetype)
            .and_modify(|count| *count += 1)
            .or_insert(1);
        self.applied_moves.push(applied);
    }

    pub fn add_best_score(&mut self, row: ScoreEvolutionRow) {
        self.best_score = row.score;
        self.score_evolution.push(row);
    }
}
