use std::{collections::VecDeque, convert::Infallible};

use jiff::Timestamp;
use serde::Serialize;
use tracing::trace;

use crate::{
    error::Inconsistency,
    problem::{
        archetype::ArchetypeIdx,
        fleet_problem::FleetProblem,
        fleet_solution::FleetSolution,
        kilometers::Kilometers,
        trip::{Trip, TripIdx},
        trip_stream::TripStream,
    },
    simulation::{
        inventory::FleetInventory,
        vehicle_state::{OfferContext, VehicleState},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationMode {
    /// Every trip goes to the first vehicle in priority order that accepts it.
    FreeAssignment,
    /// Trips go to their recorded unit when it exists in the fleet, bypassing
    /// every rule except availability.
    Replay,
}

/// One unit of a simulated fleet.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleRef {
    pub archetype: ArchetypeIdx,
    pub instance: usize,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Vehicle(VehicleRef),
    Unassigned,
}

impl Assignment {
    pub fn vehicle(&self) -> Option<VehicleRef> {
        match self {
            Assignment::Vehicle(vehicle) => Some(*vehicle),
            Assignment::Unassigned => None,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct VehicleSummary {
    pub vehicle: VehicleRef,
    pub unit_id: Option<String>,
    pub booked_distance: Kilometers,
    pub booked_trips: usize,
    pub remaining_range: Option<Kilometers>,
}

impl VehicleSummary {
    fn from_state(state: &VehicleState<'_>) -> Self {
        VehicleSummary {
            vehicle: VehicleRef {
                archetype: state.archetype_idx(),
                instance: state.instance(),
            },
            unit_id: state.unit_id().map(str::to_owned),
            booked_distance: state.booked_distance(),
            booked_trips: state.booked_trips(),
            remaining_range: state.remaining_range(),
        }
    }
}

/// Outcome of replaying a trip stream against one fleet.
#[derive(Serialize, Debug, Clone)]
pub struct SimulationResult {
    /// Indexed like the simulated stream.
    pub assignments: Vec<Assignment>,
    pub vehicle_summaries: Vec<VehicleSummary>,
    pub unassigned: usize,
    pub undriven_distance: Kilometers,
    /// Booked distance summed per archetype, indexed by [`ArchetypeIdx`].
    pub booked_distance: Vec<Kilometers>,
}

impl SimulationResult {
    pub fn assignment(&self, trip: TripIdx) -> Assignment {
        self.assignments[trip.get()]
    }

    pub fn assigned(&self) -> usize {
        self.assignments.len() - self.unassigned
    }

    pub fn has_unassigned(&self) -> bool {
        self.unassigned > 0
    }
}

pub struct Simulator<'a> {
    problem: &'a FleetProblem,
    stream: &'a TripStream,
}

impl<'a> Simulator<'a> {
    pub fn new(problem: &'a FleetProblem, stream: &'a TripStream) -> Self {
        Simulator { problem, stream }
    }

    /// Free assignment of the stream to a candidate fleet.
    pub fn simulate(&self, solution: &FleetSolution) -> SimulationResult {
        let inventory = FleetInventory::from_solution(self.problem, solution, self.stream);
        self.assign_all(inventory)
    }

    /// Replays the stream against the current fleet. Trips without a usable
    /// recorded unit are assigned freely, but never to a unit they would keep
    /// from its own next recorded trip.
    pub fn replay(&self) -> Result<SimulationResult, Inconsistency> {
        let inventory = FleetInventory::from_units(self.problem, self.stream);
        self.run(inventory, SimulationMode::Replay)
    }

    pub fn run(
        &self,
        inventory: FleetInventory<'a>,
        mode: SimulationMode,
    ) -> Result<SimulationResult, Inconsistency> {
        match mode {
            SimulationMode::FreeAssignment => Ok(self.assign_all(inventory)),
            SimulationMode::Replay => {
                let mut reservations = Reservations::new(&inventory, self.stream);
                self.book_all(inventory, |inventory, trip, context| {
                    replay_trip(inventory, &mut reservations, trip, context)
                })
            }
        }
    }

    fn assign_all(&self, inventory: FleetInventory<'a>) -> SimulationResult {
        let Ok(result) = self.book_all(inventory, |inventory, trip, context| {
            Ok::<_, Infallible>(assign(inventory, trip, context, |_, _| true))
        });
        result
    }

    fn book_all<E>(
        &self,
        mut inventory: FleetInventory<'a>,
        mut book: impl FnMut(&mut FleetInventory<'a>, &Trip, OfferContext<'_>) -> Result<Assignment, E>,
    ) -> Result<SimulationResult, E> {
        let context = OfferContext {
            config: self.problem.simulation_config(),
            period_start: self.stream.period_start().unwrap_or(Timestamp::UNIX_EPOCH),
        };

        let mut assignments = Vec::with_capacity(self.stream.len());
        let mut unassigned = 0;
        let mut undriven_distance = Kilometers::ZERO;

        for (_, trip) in self.stream.iter() {
            let assignment = book(&mut inventory, trip, context)?;

            if assignment == Assignment::Unassigned {
                trace!("Trip {} left unassigned", trip.external_id());
                unassigned += 1;
                undriven_distance += trip.distance();
            }
            assignments.push(assignment);
        }

        let mut booked_distance = vec![Kilometers::ZERO; self.problem.archetypes_len()];
        let vehicle_summaries = inventory
            .vehicles()
            .iter()
            .map(|state| {
                booked_distance[state.archetype_idx().get()] += state.booked_distance();
                VehicleSummary::from_state(state)
            })
            .collect();

        Ok(SimulationResult {
            assignments,
            vehicle_summaries,
            unassigned,
            undriven_distance,
            booked_distance,
        })
    }
}

/// Recorded trips of each bound unit not replayed yet, in stream order.
struct Reservations<'t> {
    pending: Vec<VecDeque<&'t Trip>>,
}

impl<'t> Reservations<'t> {
    fn new(inventory: &FleetInventory<'_>, stream: &'t TripStream) -> Self {
        let mut pending = vec![VecDeque::new(); inventory.len()];
        for (_, trip) in stream.iter() {
            if let Some(position) = trip
                .recorded_vehicle()
                .and_then(|unit_id| inventory.unit_position(unit_id))
            {
                pending[position].push_back(trip);
            }
        }

        Reservations { pending }
    }

    fn next(&self, position: usize) -> Option<&'t Trip> {
        self.pending[position].front().copied()
    }

    fn release(&mut self, position: usize) {
        self.pending[position].pop_front();
    }
}

/// Books a trip on its recorded unit, or assigns it freely when the unit is
/// not part of the fleet. A busy recorded unit means the history is corrupt.
fn replay_trip(
    inventory: &mut FleetInventory<'_>,
    reservations: &mut Reservations<'_>,
    trip: &Trip,
    context: OfferContext<'_>,
) -> Result<Assignment, Inconsistency> {
    let Some(position) = trip
        .recorded_vehicle()
        .and_then(|unit_id| inventory.unit_position(unit_id))
    else {
        return Ok(assign(inventory, trip, context, |position, vehicle| {
            reservations
                .next(position)
                .is_none_or(|next| vehicle.leaves_free(trip, next))
        }));
    };

    reservations.release(position);
    let vehicle = inventory.vehicle_mut(position);
    if !vehicle.is_free(trip) {
        return Err(Inconsistency::ReplayDoubleBooking {
            trip: trip.external_id().to_owned(),
            vehicle: vehicle.unit_id().unwrap_or_default().to_owned(),
        });
    }

    vehicle.force_book(trip, context);
    Ok(Assignment::Vehicle(VehicleRef {
        archetype: vehicle.archetype_idx(),
        instance: vehicle.instance(),
    }))
}

/// Offers `trip` to every `eligible` vehicle in priority order.
fn assign(
    inventory: &mut FleetInventory<'_>,
    trip: &Trip,
    context: OfferContext<'_>,
    eligible: impl Fn(usize, &VehicleState<'_>) -> bool,
) -> Assignment {
    for (position, vehicle) in inventory.vehicles_mut().iter_mut().enumerate() {
        if eligible(position, vehicle) && vehicle.offer(trip, context).is_ok() {
            return Assignment::Vehicle(VehicleRef {
                archetype: vehicle.archetype_idx(),
                instance: vehicle.instance(),
            });
        }
    }

    Assignment::Unassigned
}
