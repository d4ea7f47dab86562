use fxhash::FxHashSet;
use tracing::debug;

use crate::{
    error::{EmptyInput, FleetError, InputError},
    problem::{
        archetype::{ArchetypeIdx, VehicleArchetype},
        catalog::ArchetypeCatalog,
        consequences::{ConsequenceFunction, LinearConsequences},
        fleet_solution::{ArchetypeBounds, FleetSolution},
        fleet_unit::FleetUnit,
        goals::FleetGoals,
        kilometers::Kilometers,
        trip_stream::TripStream,
    },
    simulation::config::SimulationConfig,
};

/// Distance used to derive a per-km emission factor from the consequence
/// function when an archetype does not carry one.
const REFERENCE_DISTANCE_KM: f64 = 10_000.0;

/// Everything a search needs, validated once and read-only afterwards.
pub struct FleetProblem {
    trips: TripStream,
    peak_day: TripStream,
    catalog: ArchetypeCatalog,
    current_fleet: Vec<FleetUnit>,
    bounds: Vec<ArchetypeBounds>,
    simulation: SimulationConfig,
    goals: FleetGoals,
    consequences: Box<dyn ConsequenceFunction>,

    co2_per_km: Vec<f64>,
    priority: Vec<ArchetypeIdx>,
    max_units_per_archetype: usize,
}

impl FleetProblem {
    pub fn trips(&self) -> &TripStream {
        &self.trips
    }

    /// Trips of the busiest day, the proxy stream scored during search.
    pub fn peak_day(&self) -> &TripStream {
        &self.peak_day
    }

    pub fn catalog(&self) -> &ArchetypeCatalog {
        &self.catalog
    }

    pub fn archetype(&self, index: ArchetypeIdx) -> &VehicleArchetype {
        self.catalog.archetype(index)
    }

    pub fn archetypes_len(&self) -> usize {
        self.catalog.len()
    }

    pub fn current_fleet(&self) -> &[FleetUnit] {
        &self.current_fleet
    }

    pub fn bounds(&self, index: ArchetypeIdx) -> ArchetypeBounds {
        self.bounds[index.get()]
    }

    pub fn simulation_config(&self) -> &SimulationConfig {
        &self.simulation
    }

    pub fn goals(&self) -> &FleetGoals {
        &self.goals
    }

    pub fn consequences(&self) -> &dyn ConsequenceFunction {
        self.consequences.as_ref()
    }

    /// Emission factor in kg CO2e per km, derived from the consequence
    /// function when the archetype does not state one.
    pub fn co2_per_km(&self, index: ArchetypeIdx) -> f64 {
        self.co2_per_km[index.get()]
    }

    /// Archetypes from the cheapest to the most expensive under the goal
    /// weights. The simulator offers trips in this order.
    pub fn priority(&self) -> &[ArchetypeIdx] {
        &self.priority
    }

    /// Upper bound on the units of a single archetype worth simulating. One
    /// unit per peak-day trip serves every trip any count of that archetype
    /// can serve, whatever limits range, rest, quota or mileage impose.
    pub fn max_units(&self, index: ArchetypeIdx) -> usize {
        let bounds = self.bounds(index);
        let max = self.max_units_per_archetype.max(bounds.floor);
        match bounds.ceiling {
            Some(ceiling) => max.min(ceiling),
            None => max,
        }
    }

    pub fn movable_archetypes(&self) -> impl Iterator<Item = ArchetypeIdx> + '_ {
        self.catalog
            .iter()
            .map(|(index, _)| index)
            .filter(|&index| !self.bounds(index).is_fixed())
    }

    pub fn has_movable_archetypes(&self) -> bool {
        self.movable_archetypes().next().is_some()
    }

    /// The fleet made of every archetype at its floor.
    pub fn locked_solution(&self) -> FleetSolution {
        FleetSolution::new(self.bounds.iter().map(|bounds| bounds.floor).collect())
    }

    /// Number of units each archetype has in the current fleet.
    pub fn current_fleet_solution(&self) -> FleetSolution {
        let mut solution = FleetSolution::empty(self.catalog.len());
        for unit in &self.current_fleet {
            let count = solution.count(unit.archetype());
            solution.set_count(unit.archetype(), count + 1);
        }
        solution
    }
}

#[derive(Default)]
pub struct FleetProblemBuilder {
    trips: Option<TripStream>,
    catalog: Option<ArchetypeCatalog>,
    current_fleet: Vec<FleetUnit>,
    bounds: Vec<(ArchetypeIdx, ArchetypeBounds)>,
    simulation: Option<SimulationConfig>,
    goals: Option<FleetGoals>,
    consequences: Option<Box<dyn ConsequenceFunction>>,
}

impl FleetProblemBuilder {
    pub fn set_trips(&mut self, trips: TripStream) -> &mut FleetProblemBuilder {
        self.trips = Some(trips);
        self
    }

    pub fn set_catalog(&mut self, catalog: ArchetypeCatalog) -> &mut FleetProblemBuilder {
        self.catalog = Some(catalog);
        self
    }

    pub fn set_current_fleet(&mut self, current_fleet: Vec<FleetUnit>) -> &mut FleetProblemBuilder {
        self.current_fleet = current_fleet;
        self
    }

    /// Bounds set twice for the same archetype are intersected.
    pub fn add_bounds(
        &mut self,
        archetype: ArchetypeIdx,
        bounds: ArchetypeBounds,
    ) -> &mut FleetProblemBuilder {
        self.bounds.push((archetype, bounds));
        self
    }

    pub fn set_simulation_config(&mut self, config: SimulationConfig) -> &mut FleetProblemBuilder {
        self.simulation = Some(config);
        self
    }

    pub fn set_goals(&mut self, goals: FleetGoals) -> &mut FleetProblemBuilder {
        self.goals = Some(goals);
        self
    }

    pub fn set_consequence_function(
        &mut self,
        consequences: Box<dyn ConsequenceFunction>,
    ) -> &mut FleetProblemBuilder {
        self.consequences = Some(consequences);
        self
    }

    pub fn build(self) -> Result<FleetProblem, FleetError> {
        let catalog = self.catalog.unwrap_or_default();
        if catalog.is_empty() {
            return Err(FleetError::InputEmpty(EmptyInput::NoArchetypes));
        }

        let trips = self.trips.unwrap_or_default();
        if trips.is_empty() {
            return Err(FleetError::InputEmpty(EmptyInput::NoTrips));
        }

        let mut bounds = vec![ArchetypeBounds::FREE; catalog.len()];
        for (index, added) in self.bounds {
            let Some(current) = bounds.get_mut(index.get()) else {
                return Err(InputError::UnknownArchetype(index.to_string()).into());
            };

            current.floor = current.floor.max(added.floor);
            current.ceiling = match (current.ceiling, added.ceiling) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };

            if let Some(ceiling) = current.ceiling
                && ceiling < current.floor
            {
                return Err(InputError::InvalidBounds {
                    archetype: catalog.archetype(index).external_id().to_owned(),
                    floor: current.floor,
                    ceiling,
                }
                .into());
            }
        }

        let mut seen_units = FxHashSet::default();
        for unit in &self.current_fleet {
            if unit.archetype().get() >= catalog.len() {
                return Err(InputError::UnknownArchetype(unit.archetype().to_string()).into());
            }
            if !seen_units.insert(unit.external_id()) {
                return Err(InputError::DuplicateUnit(unit.external_id().to_owned()).into());
            }
        }

        let simulation = self.simulation.unwrap_or_default();
        let goals = self.goals.unwrap_or_default();
        let consequences = self
            .consequences
            .unwrap_or_else(|| Box::new(LinearConsequences::default()));

        let co2_per_km: Vec<f64> = catalog
            .archetypes()
            .iter()
            .map(|archetype| {
                archetype.co2_per_km().unwrap_or_else(|| {
                    consequences
                        .yearly_consequences(
                            archetype.fuel(),
                            archetype.consumption_per_km(),
                            Kilometers::new(REFERENCE_DISTANCE_KM),
                        )
                        .yearly_co2e
                        / REFERENCE_DISTANCE_KM
                })
            })
            .collect();

        let priority = compute_priority(&catalog, &co2_per_km, &goals);
        let peak_day = trips.peak_day_stream(&simulation.time_zone);
        let max_units_per_archetype = peak_day.len().max(1);

        debug!(
            "Fleet problem: {} trips, {} on the peak day ({} at once), {} archetypes, priority {:?}",
            trips.len(),
            peak_day.len(),
            peak_day.max_concurrent_trips(),
            catalog.len(),
            priority
        );

        Ok(FleetProblem {
            trips,
            peak_day,
            catalog,
            current_fleet: self.current_fleet,
            bounds,
            simulation,
            goals,
            consequences,
            co2_per_km,
            priority,
            max_units_per_archetype,
        })
    }
}

/// Orders archetypes by yearly cost and emission factor, each normalized by
/// its maximum over the catalog and weighted by the goals. Ties keep catalog
/// order.
fn compute_priority(
    catalog: &ArchetypeCatalog,
    co2_per_km: &[f64],
    goals: &FleetGoals,
) -> Vec<ArchetypeIdx> {
    let max_cost = catalog
        .archetypes()
        .iter()
        .map(|archetype| archetype.yearly_cost())
        .fold(0.0, f64::max);
    let max_co2 = co2_per_km.iter().copied().fold(0.0, f64::max);

    let normalize = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };

    let mut weighted: Vec<(ArchetypeIdx, f64)> = catalog
        .iter()
        .map(|(index, archetype)| {
            let cost = normalize(archetype.yearly_cost(), max_cost);
            let co2 = normalize(co2_per_km[index.get()], max_co2);
            (index, goals.weighted(cost, co2))
        })
        .collect();

    weighted.sort_by(|(index_a, a), (index_b, b)| a.total_cmp(b).then(index_a.cmp(index_b)));
    weighted.into_iter().map(|(index, _)| index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_car, create_electric_car, create_trip};

    fn trips() -> TripStream {
        TripStream::new(vec![create_trip(
            "a",
            "2024-03-04T08:00:00Z",
            "2024-03-04T09:00:00Z",
            10.0,
        )])
        .unwrap()
    }

    #[test]
    fn test_build_requires_archetypes_and_trips() {
        let mut builder = FleetProblemBuilder::default();
        builder.set_trips(trips());
        assert!(matches!(
            builder.build(),
            Err(FleetError::InputEmpty(EmptyInput::NoArchetypes))
        ));

        let mut builder = FleetProblemBuilder::default();
        builder.set_catalog(ArchetypeCatalog::new(vec![create_car("car", 3000.0)]));
        assert!(matches!(
            builder.build(),
            Err(FleetError::InputEmpty(EmptyInput::NoTrips))
        ));
    }

    #[test]
    fn test_priority_follows_weights() {
        let catalog = ArchetypeCatalog::new(vec![
            create_car("car", 3000.0),
            create_electric_car("ev", 4000.0, 300.0),
        ]);

        let build = |cost_weight: f64, co2_weight: f64| {
            let mut builder = FleetProblemBuilder::default();
            builder
                .set_trips(trips())
                .set_catalog(catalog.clone())
                .set_goals(FleetGoals {
                    cost_weight,
                    co2_weight,
                    ..FleetGoals::default()
                });
            builder.build().unwrap()
        };

        let cost_first = build(10.0, 0.0);
        assert_eq!(
            cost_first.priority(),
            &[ArchetypeIdx::new(0), ArchetypeIdx::new(1)]
        );

        let co2_first = build(0.0, 10.0);
        assert_eq!(
            co2_first.priority(),
            &[ArchetypeIdx::new(1), ArchetypeIdx::new(0)]
        );
    }

    #[test]
    fn test_bounds_are_intersected_and_validated() {
        let mut builder = FleetProblemBuilder::default();
        builder
            .set_trips(trips())
            .set_catalog(ArchetypeCatalog::new(vec![create_car("car", 3000.0)]))
            .add_bounds(
                ArchetypeIdx::new(0),
                ArchetypeBounds {
                    floor: 1,
                    ceiling: None,
                },
            )
            .add_bounds(
                ArchetypeIdx::new(0),
                ArchetypeBounds {
                    floor: 0,
                    ceiling: Some(1),
                },
            );

        let problem = builder.build().unwrap();
        assert!(problem.bounds(ArchetypeIdx::new(0)).is_fixed());
        assert!(!problem.has_movable_archetypes());
        assert_eq!(problem.locked_solution().counts(), &[1]);

        let mut builder = FleetProblemBuilder::default();
        builder
            .set_trips(trips())
            .set_catalog(ArchetypeCatalog::new(vec![create_car("car", 3000.0)]))
            .add_bounds(
                ArchetypeIdx::new(0),
                ArchetypeBounds {
                    floor: 3,
                    ceiling: Some(2),
                },
            );
        assert!(matches!(
            builder.build(),
            Err(FleetError::Input(InputError::InvalidBounds { .. }))
        ));
    }
}
