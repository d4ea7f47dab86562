use serde::Serialize;

use crate::problem::kilometers::Kilometers;

pub const MAX_WEIGHT: f64 = 10.0;

/// What a fleet has to achieve and how cost and emissions trade off.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FleetGoals {
    /// Importance of cost, 0 to 10.
    pub cost_weight: f64,
    /// Importance of CO2e, 0 to 10.
    pub co2_weight: f64,
    /// Trips a fleet may leave unassigned and still be feasible.
    pub slack: usize,
    pub max_undriven_distance: Option<Kilometers>,
    pub max_yearly_cost: Option<f64>,
    pub max_yearly_co2e: Option<f64>,
}

impl Default for FleetGoals {
    fn default() -> Self {
        Self {
            cost_weight: 5.0,
            co2_weight: 5.0,
            slack: 0,
            max_undriven_distance: None,
            max_yearly_cost: None,
            max_yearly_co2e: None,
        }
    }
}

impl FleetGoals {
    /// Weights clamped to `[0, 10]` and normalized to sum to one. Two zero
    /// weights count as equal weights.
    pub fn normalized_weights(&self) -> (f64, f64) {
        let cost = self.cost_weight.clamp(0.0, MAX_WEIGHT);
        let co2 = self.co2_weight.clamp(0.0, MAX_WEIGHT);
        let total = cost + co2;

        if total <= 0.0 {
            (0.5, 0.5)
        } else {
            (cost / total, co2 / total)
        }
    }

    /// Weighted sum of already normalized cost and emissions.
    pub fn weighted(&self, normalized_cost: f64, normalized_co2e: f64) -> f64 {
        let (cost_weight, co2_weight) = self.normalized_weights();
        cost_weight * normalized_cost + co2_weight * normalized_co2e
    }
}
