use fxhash::FxHashMap;
use jiff::Timestamp;

use crate::{
    problem::{fleet_problem::FleetProblem, fleet_solution::FleetSolution, trip_stream::TripStream},
    simulation::{occupancy::Occupancy, vehicle_state::VehicleState},
};

/// The vehicle units of one candidate fleet, in the order trips are offered
/// to them: archetypes by priority, instances of an archetype consecutive.
pub struct FleetInventory<'a> {
    vehicles: Vec<VehicleState<'a>>,
    units: FxHashMap<&'a str, usize>,
}

fn horizon(stream: &TripStream) -> (Timestamp, Timestamp) {
    let origin = stream.period_start().unwrap_or(Timestamp::UNIX_EPOCH);
    let end = stream.period_end().unwrap_or(origin);
    (origin, end)
}

impl<'a> FleetInventory<'a> {
    pub fn from_solution(
        problem: &'a FleetProblem,
        solution: &FleetSolution,
        stream: &TripStream,
    ) -> Self {
        let config = problem.simulation_config();
        let (origin, end) = horizon(stream);

        let mut vehicles = Vec::with_capacity(solution.total_units());
        for &archetype_idx in problem.priority() {
            let archetype = problem.archetype(archetype_idx);
            for instance in 0..solution.count(archetype_idx) {
                vehicles.push(VehicleState::new(
                    archetype_idx,
                    instance,
                    archetype,
                    config,
                    Occupancy::new(config.booking_mode, origin, end),
                ));
            }
        }

        FleetInventory {
            vehicles,
            units: FxHashMap::default(),
        }
    }

    /// The current fleet, each state bound to its physical unit id.
    pub fn from_units(problem: &'a FleetProblem, stream: &TripStream) -> Self {
        let config = problem.simulation_config();
        let (origin, end) = horizon(stream);

        let mut vehicles = Vec::with_capacity(problem.current_fleet().len());
        let mut units = FxHashMap::default();
        for &archetype_idx in problem.priority() {
            let archetype = problem.archetype(archetype_idx);
            let members = problem
                .current_fleet()
                .iter()
                .filter(|unit| unit.archetype() == archetype_idx);

            for (instance, unit) in members.enumerate() {
                units.insert(unit.external_id(), vehicles.len());
                vehicles.push(
                    VehicleState::new(
                        archetype_idx,
                        instance,
                        archetype,
                        config,
                        Occupancy::new(config.booking_mode, origin, end),
                    )
                    .with_unit_id(unit.external_id()),
                );
            }
        }

        FleetInventory { vehicles, units }
    }

    pub fn vehicles(&self) -> &[VehicleState<'a>] {
        &self.vehicles
    }

    pub fn vehicles_mut(&mut self) -> &mut [VehicleState<'a>] {
        &mut self.vehicles
    }

    pub fn vehicle_mut(&mut self, position: usize) -> &mut VehicleState<'a> {
        &mut self.vehicles[position]
    }

    /// Position of the state bound to a physical unit.
    pub fn unit_position(&self, unit_id: &str) -> Option<usize> {
        self.units.get(unit_id).copied()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn into_vehicles(self) -> Vec<VehicleState<'a>> {
        self.vehicles
    }
}
