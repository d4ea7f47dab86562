use fxhash::FxHashMap;
use jiff::Timestamp;
use serde::Serialize;

use crate::{
    problem::{
        fleet_problem::FleetProblem, fleet_solution::FleetSolution, kilometers::Kilometers,
        trip_stream::TripStream,
    },
    simulation::simulator::{SimulationResult, Simulator, VehicleRef},
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DrivingBookEntry {
    pub trip_id: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub distance: Kilometers,
    /// `"<make> <model> #<n>"`, `None` for unassigned trips.
    pub vehicle: Option<String>,
    pub archetype_id: Option<String>,
    pub unit_id: Option<String>,
}

/// Which vehicle drove each trip of a stream.
#[derive(Serialize, Debug, Clone, Default)]
pub struct DrivingBook {
    pub entries: Vec<DrivingBookEntry>,
}

impl DrivingBook {
    pub fn new(problem: &FleetProblem, stream: &TripStream, result: &SimulationResult) -> Self {
        let unit_ids: FxHashMap<VehicleRef, &str> = result
            .vehicle_summaries
            .iter()
            .filter_map(|summary| Some((summary.vehicle, summary.unit_id.as_deref()?)))
            .collect();

        let entries = stream
            .iter()
            .map(|(index, trip)| {
                let vehicle = result.assignment(index).vehicle();
                let archetype = vehicle.map(|vehicle| problem.archetype(vehicle.archetype));

                DrivingBookEntry {
                    trip_id: trip.external_id().to_owned(),
                    start: trip.start(),
                    end: trip.end(),
                    distance: trip.distance(),
                    vehicle: vehicle.zip(archetype).map(|(vehicle, archetype)| {
                        format!("{} #{}", archetype.label(), vehicle.instance + 1)
                    }),
                    archetype_id: archetype.map(|archetype| archetype.external_id().to_owned()),
                    unit_id: vehicle
                        .and_then(|vehicle| unit_ids.get(&vehicle))
                        .map(|unit_id| (*unit_id).to_owned()),
                }
            })
            .collect();

        DrivingBook { entries }
    }

    /// Driving book of a candidate fleet over the full stream.
    pub fn for_solution(problem: &FleetProblem, solution: &FleetSolution) -> Self {
        let result = Simulator::new(problem, problem.trips()).simulate(solution);
        DrivingBook::new(problem, problem.trips(), &result)
    }

    pub fn unassigned(&self) -> impl Iterator<Item = &DrivingBookEntry> {
        self.entries.iter().filter(|entry| entry.vehicle.is_none())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
