use std::{iter::Sum, ops::Add};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::problem::{archetype::FuelType, kilometers::Kilometers};

/// Yearly operating consequences of driving a distance.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Consequences {
    pub yearly_cost: f64,
    pub yearly_co2e: f64,
}

impl Add for Consequences {
    type Output = Consequences;

    fn add(self, other: Consequences) -> Consequences {
        Consequences {
            yearly_cost: self.yearly_cost + other.yearly_cost,
            yearly_co2e: self.yearly_co2e + other.yearly_co2e,
        }
    }
}

impl Sum for Consequences {
    fn sum<I: Iterator<Item = Consequences>>(iter: I) -> Self {
        iter.fold(Consequences::default(), |acc, x| acc + x)
    }
}

/// Turns a fuel, a consumption rate and a yearly distance into operating cost
/// and emissions. Called once per archetype per evaluation, implementations
/// must be pure.
pub trait ConsequenceFunction: Send + Sync {
    fn yearly_consequences(
        &self,
        fuel: FuelType,
        consumption_per_km: Option<f64>,
        annual_distance: Kilometers,
    ) -> Consequences;
}

/// Price and emission of one unit (litre or kWh) of a fuel.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq)]
pub struct FuelFactors {
    pub price_per_unit: f64,
    /// kg CO2e per unit.
    pub co2e_per_unit: f64,
    /// Used when an archetype carries no consumption figure.
    pub default_consumption_per_km: f64,
}

/// Consequences proportional to consumed fuel.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct LinearConsequences {
    pub petrol: FuelFactors,
    pub diesel: FuelFactors,
    pub hybrid: FuelFactors,
    pub electric: FuelFactors,
}

impl Default for LinearConsequences {
    fn default() -> Self {
        Self {
            petrol: FuelFactors {
                price_per_unit: 1.8,
                co2e_per_unit: 2.8,
                default_consumption_per_km: 0.065,
            },
            diesel: FuelFactors {
                price_per_unit: 1.7,
                co2e_per_unit: 3.2,
                default_consumption_per_km: 0.055,
            },
            hybrid: FuelFactors {
                price_per_unit: 1.8,
                co2e_per_unit: 2.8,
                default_consumption_per_km: 0.045,
            },
            electric: FuelFactors {
                price_per_unit: 0.3,
                co2e_per_unit: 0.12,
                default_consumption_per_km: 0.18,
            },
        }
    }
}

impl LinearConsequences {
    fn factors(&self, fuel: FuelType) -> Option<&FuelFactors> {
        match fuel {
            FuelType::Petrol => Some(&self.petrol),
            FuelType::Diesel => Some(&self.diesel),
            FuelType::Hybrid => Some(&self.hybrid),
            FuelType::Electric => Some(&self.electric),
            FuelType::Muscle => None,
        }
    }
}

impl ConsequenceFunction for LinearConsequences {
    fn yearly_consequences(
        &self,
        fuel: FuelType,
        consumption_per_km: Option<f64>,
        annual_distance: Kilometers,
    ) -> Consequences {
        let Some(factors) = self.factors(fuel) else {
            return Consequences::default();
        };

        let consumed = annual_distance.value()
            * consumption_per_km.unwrap_or(factors.default_consumption_per_km);

        Consequences {
            yearly_cost: consumed * factors.price_per_unit,
            yearly_co2e: consumed * factors.co2e_per_unit,
        }
    }
}
