use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{define_index_newtype, error::InputError, problem::kilometers::Kilometers};

define_index_newtype!(ArchetypeIdx, VehicleArchetype);

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VehicleFamily {
    Car,
    ElectricCar,
    Bike,
    ElectricBike,
}

impl VehicleFamily {
    pub fn is_bike(&self) -> bool {
        matches!(self, VehicleFamily::Bike | VehicleFamily::ElectricBike)
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Petrol,
    Diesel,
    Hybrid,
    Electric,
    /// Human powered, no fuel at all.
    Muscle,
}

/// A purchasable or leasable vehicle configuration, not a physical unit.
#[derive(Serialize, Debug, Clone)]
pub struct VehicleArchetype {
    external_id: String,
    make: String,
    model: String,
    family: VehicleFamily,
    fuel: FuelType,
    range: Option<Kilometers>,
    yearly_distance_cap: Option<Kilometers>,
    min_rest: Option<SignedDuration>,
    yearly_cost: f64,
    co2_per_km: Option<f64>,
    consumption_per_km: Option<f64>,
}

/// The attributes that decide how an archetype behaves in the simulation and
/// what it emits. Archetypes sharing a key only differ in price and naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionalKey {
    family: VehicleFamily,
    fuel: FuelType,
    range: Option<u64>,
    yearly_distance_cap: Option<u64>,
    min_rest: Option<SignedDuration>,
    co2_per_km: Option<u64>,
    consumption_per_km: Option<u64>,
}

impl VehicleArchetype {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn make(&self) -> &str {
        &self.make
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.make, self.model)
    }

    pub fn family(&self) -> VehicleFamily {
        self.family
    }

    pub fn fuel(&self) -> FuelType {
        self.fuel
    }

    /// Distance on a full battery, only meaningful for electric cars.
    pub fn range(&self) -> Option<Kilometers> {
        self.range
    }

    pub fn yearly_distance_cap(&self) -> Option<Kilometers> {
        self.yearly_distance_cap
    }

    /// Idle time needed to recharge to full range.
    pub fn min_rest(&self) -> Option<SignedDuration> {
        self.min_rest
    }

    /// Fixed yearly cost of owning or leasing one unit.
    pub fn yearly_cost(&self) -> f64 {
        self.yearly_cost
    }

    /// Emissions in kg CO2e per km, when known upfront.
    pub fn co2_per_km(&self) -> Option<f64> {
        self.co2_per_km
    }

    /// Litres (or kWh for electric) per km.
    pub fn consumption_per_km(&self) -> Option<f64> {
        self.consumption_per_km
    }

    pub fn functional_key(&self) -> FunctionalKey {
        FunctionalKey {
            family: self.family,
            fuel: self.fuel,
            range: self.range.map(|range| range.value().to_bits()),
            yearly_distance_cap: self.yearly_distance_cap.map(|cap| cap.value().to_bits()),
            min_rest: self.min_rest,
            co2_per_km: self.co2_per_km.map(f64::to_bits),
            consumption_per_km: self.consumption_per_km.map(f64::to_bits),
        }
    }
}

#[derive(Default)]
pub struct ArchetypeBuilder {
    external_id: Option<String>,
    make: Option<String>,
    model: Option<String>,
    family: Option<VehicleFamily>,
    fuel: Option<FuelType>,
    range: Option<Kilometers>,
    yearly_distance_cap: Option<Kilometers>,
    min_rest: Option<SignedDuration>,
    yearly_cost: Option<f64>,
    co2_per_km: Option<f64>,
    consumption_per_km: Option<f64>,
}

impl ArchetypeBuilder {
    pub fn set_external_id(&mut self, external_id: String) -> &mut ArchetypeBuilder {
        self.external_id = Some(external_id);
        self
    }

    pub fn set_make(&mut self, make: String) -> &mut ArchetypeBuilder {
        self.make = Some(make);
        self
    }

    pub fn set_model(&mut self, model: String) -> &mut ArchetypeBuilder {
        self.model = Some(model);
        self
    }

    pub fn set_family(&mut self, family: VehicleFamily) -> &mut ArchetypeBuilder {
        self.family = Some(family);
        self
    }

    pub fn set_fuel(&mut self, fuel: FuelType) -> &mut ArchetypeBuilder {
        self.fuel = Some(fuel);
        self
    }

    pub fn set_range(&mut self, range: Kilometers) -> &mut ArchetypeBuilder {
        self.range = Some(range);
        self
    }

    pub fn set_yearly_distance_cap(&mut self, cap: Kilometers) -> &mut ArchetypeBuilder {
        self.yearly_distance_cap = Some(cap);
        self
    }

    pub fn set_min_rest(&mut self, min_rest: SignedDuration) -> &mut ArchetypeBuilder {
        self.min_rest = Some(min_rest);
        self
    }

    pub fn set_yearly_cost(&mut self, yearly_cost: f64) -> &mut ArchetypeBuilder {
        self.yearly_cost = Some(yearly_cost);
        self
    }

    pub fn set_co2_per_km(&mut self, co2_per_km: f64) -> &mut ArchetypeBuilder {
        self.co2_per_km = Some(co2_per_km);
        self
    }

    pub fn set_consumption_per_km(&mut self, consumption_per_km: f64) -> &mut ArchetypeBuilder {
        self.consumption_per_km = Some(consumption_per_km);
        self
    }

    pub fn build(self) -> Result<VehicleArchetype, InputError> {
        let external_id = self.external_id.ok_or(InputError::MissingField {
            entity: "archetype",
            field: "id",
        })?;
        let family = self.family.ok_or(InputError::MissingField {
            entity: "archetype",
            field: "family",
        })?;
        let yearly_cost = self.yearly_cost.ok_or(InputError::MissingField {
            entity: "archetype",
            field: "yearly_cost",
        })?;

        if yearly_cost < 0.0 {
            return Err(InputError::NegativeValue {
                field: "yearly_cost",
                value: yearly_cost,
            });
        }

        let fuel = self.fuel.unwrap_or(match family {
            VehicleFamily::Car => FuelType::Petrol,
            VehicleFamily::ElectricCar | VehicleFamily::ElectricBike => FuelType::Electric,
            VehicleFamily::Bike => FuelType::Muscle,
        });

        Ok(VehicleArchetype {
            make: self.make.unwrap_or_default(),
            model: self.model.unwrap_or_else(|| external_id.clone()),
            external_id,
            family,
            fuel,
            range: self.range,
            yearly_distance_cap: self.yearly_distance_cap,
            min_rest: self.min_rest,
            yearly_cost,
            co2_per_km: self.co2_per_km,
            consumption_per_km: self.consumption_per_km,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fuel_follows_family() {
        let mut builder = ArchetypeBuilder::default();
        builder
            .set_external_id("bike".to_owned())
            .set_family(VehicleFamily::Bike)
            .set_yearly_cost(150.0);
        let archetype = builder.build().unwrap();

        assert_eq!(archetype.fuel(), FuelType::Muscle);
        assert!(archetype.family().is_bike());
    }

    #[test]
    fn test_functional_key_ignores_naming_and_price() {
        let build = |id: &str, make: &str, cost: f64| {
            let mut builder = ArchetypeBuilder::default();
            builder
                .set_external_id(id.to_owned())
                .set_make(make.to_owned())
                .set_family(VehicleFamily::ElectricCar)
                .set_range(Kilometers::new(311.0))
                .set_yearly_cost(cost);
            builder.build().unwrap()
        };

        let a = build("a", "Renault", 3000.0);
        let b = build("b", "Peugeot", 2800.0);

        assert_eq!(a.functional_key(), b.functional_key());
    }

    #[test]
    fn test_rejects_negative_cost() {
        let mut builder = ArchetypeBuilder::default();
        builder
            .set_external_id("car".to_owned())
            .set_family(VehicleFamily::Car)
            .set_yearly_cost(-1.0);

        assert!(matches!(
            builder.build(),
            Err(InputError::NegativeValue { .. })
        ));
    }
}
