use std::{
    cmp::Ordering,
    iter,
    ops::{Add, AddAssign},
};

use schemars::JsonSchema;
use serde::Serialize;

use crate::{problem::goals::FleetGoals, simulation::evaluation::FleetEvaluation};

/// Lexicographic objective, lower is better. The hard part counts goal
/// violations that make a fleet unusable, the soft part is the weighted
/// cost and emissions.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Score {
    pub hard_score: f64,
    pub soft_score: f64,
}

impl Score {
    pub const MAX: Score = Score {
        hard_score: f64::MAX,
        soft_score: f64::MAX,
    };

    pub const ZERO: Score = Score {
        hard_score: 0.0,
        soft_score: 0.0,
    };

    pub fn new(hard_score: f64, soft_score: f64) -> Self {
        Score {
            hard_score,
            soft_score,
        }
    }

    pub fn hard(hard_score: f64) -> Self {
        Score {
            hard_score,
            soft_score: 0.0,
        }
    }

    pub fn soft(soft_score: f64) -> Self {
        Score {
            hard_score: 0.0,
            soft_score,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.hard_score > 0.0
    }
}

impl Eq for Score {}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hard_score
            .total_cmp(&other.hard_score)
            .then_with(|| self.soft_score.total_cmp(&other.soft_score))
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl iter::Sum for Score {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, score| acc + score)
    }
}

impl Add<Score> for Score {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Score {
            hard_score: self.hard_score + other.hard_score,
            soft_score: self.soft_score + other.soft_score,
        }
    }
}

impl AddAssign<Score> for Score {
    fn add_assign(&mut self, other: Score) {
        self.hard_score += other.hard_score;
        self.soft_score += other.soft_score;
    }
}

/// Reference cost and emissions that bring both soft terms to the same scale.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ScoreNormalizer {
    cost: f64,
    co2e: f64,
}

impl Default for ScoreNormalizer {
    fn default() -> Self {
        ScoreNormalizer {
            cost: 1.0,
            co2e: 1.0,
        }
    }
}

impl ScoreNormalizer {
    pub fn from_evaluation(evaluation: &FleetEvaluation) -> Self {
        let positive_or_one = |value: f64| if value > 0.0 { value } else { 1.0 };

        ScoreNormalizer {
            cost: positive_or_one(evaluation.yearly_cost),
            co2e: positive_or_one(evaluation.yearly_co2e),
        }
    }

    /// Hard: trips beyond the slack plus the relative overrun of the undriven
    /// distance allowance. Soft: weighted cost and emissions relative to the
    /// references.
    pub fn score(&self, evaluation: &FleetEvaluation, goals: &FleetGoals) -> Score {
        let mut hard_score = evaluation.unallocated_trips.saturating_sub(goals.slack) as f64;

        if let Some(max) = goals.max_undriven_distance
            && evaluation.undriven_distance > max
        {
            hard_score += if max.value() > 0.0 {
                (evaluation.undriven_distance.value() - max.value()) / max.value()
            } else {
                1.0
            };
        }

        let soft_score = goals.weighted(
            evaluation.yearly_cost / self.cost,
            evaluation.yearly_co2e / self.co2e,
        );

        Score::new(hard_score, soft_score)
    }
}
