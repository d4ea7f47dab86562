use jiff::Timestamp;

use crate::problem::{
    archetype::{ArchetypeBuilder, ArchetypeIdx, VehicleArchetype, VehicleFamily},
    catalog::ArchetypeCatalog,
    fleet_problem::{FleetProblem, FleetProblemBuilder},
    fleet_unit::FleetUnit,
    kilometers::Kilometers,
    trip::{Trip, TripBuilder, TripSegment},
    trip_stream::TripStream,
};

pub fn ts(value: &str) -> Timestamp {
    value.parse().unwrap()
}

pub fn create_trip(id: &str, start: &str, end: &str, distance: f64) -> Trip {
    let mut builder = TripBuilder::default();
    builder
        .set_external_id(id.to_owned())
        .set_start(ts(start))
        .set_end(ts(end))
        .set_distance(Kilometers::new(distance));
    builder.build().unwrap()
}

/// A trip of the history, driven by the current fleet unit `vehicle`.
pub fn create_recorded_trip(
    id: &str,
    start: &str,
    end: &str,
    distance: f64,
    vehicle: &str,
) -> Trip {
    let mut builder = TripBuilder::default();
    builder
        .set_external_id(id.to_owned())
        .set_start(ts(start))
        .set_end(ts(end))
        .set_distance(Kilometers::new(distance))
        .set_recorded_vehicle(vehicle.to_owned());
    builder.build().unwrap()
}

/// A trip spanning its segments, with the summed distance.
pub fn create_segmented_trip(id: &str, segments: &[(&str, &str, f64)]) -> Trip {
    let mut builder = TripBuilder::default();
    builder
        .set_external_id(id.to_owned())
        .set_start(ts(segments[0].0))
        .set_end(ts(segments[segments.len() - 1].1))
        .set_distance(Kilometers::new(
            segments.iter().map(|(_, _, distance)| distance).sum(),
        ));

    for &(start, end, distance) in segments {
        builder.add_sub_segment(TripSegment::new(
            ts(start),
            ts(end),
            Kilometers::new(distance),
        ));
    }

    builder.build().unwrap()
}

fn create_archetype(id: &str, family: VehicleFamily, yearly_cost: f64) -> ArchetypeBuilder {
    let mut builder = ArchetypeBuilder::default();
    builder
        .set_external_id(id.to_owned())
        .set_make("Test".to_owned())
        .set_family(family)
        .set_yearly_cost(yearly_cost);
    builder
}

pub fn create_car(id: &str, yearly_cost: f64) -> VehicleArchetype {
    create_archetype(id, VehicleFamily::Car, yearly_cost)
        .build()
        .unwrap()
}

pub fn create_capped_car(id: &str, yearly_cost: f64, yearly_cap: f64) -> VehicleArchetype {
    let mut builder = create_archetype(id, VehicleFamily::Car, yearly_cost);
    builder.set_yearly_distance_cap(Kilometers::new(yearly_cap));
    builder.build().unwrap()
}

pub fn create_electric_car(id: &str, yearly_cost: f64, range: f64) -> VehicleArchetype {
    let mut builder = create_archetype(id, VehicleFamily::ElectricCar, yearly_cost);
    builder.set_range(Kilometers::new(range));
    builder.build().unwrap()
}

pub fn create_bike(id: &str, yearly_cost: f64) -> VehicleArchetype {
    create_archetype(id, VehicleFamily::Bike, yearly_cost)
        .build()
        .unwrap()
}

/// A problem with default goals and simulation settings.
pub fn create_problem(trips: Vec<Trip>, catalog: ArchetypeCatalog) -> FleetProblem {
    let mut builder = FleetProblemBuilder::default();
    builder
        .set_trips(TripStream::sorted(trips).unwrap())
        .set_catalog(catalog);
    builder.build().unwrap()
}

/// Like [`create_problem`], with a current fleet of `(unit id, archetype index)`.
pub fn create_problem_with_fleet(
    trips: Vec<Trip>,
    catalog: ArchetypeCatalog,
    units: &[(&str, usize)],
) -> FleetProblem {
    let mut builder = FleetProblemBuilder::default();
    builder
        .set_trips(TripStream::sorted(trips).unwrap())
        .set_catalog(catalog)
        .set_current_fleet(
            units
                .iter()
                .map(|&(id, archetype)| FleetUnit::new(id.to_owned(), ArchetypeIdx::new(archetype)))
                .collect(),
        );
    builder.build().unwrap()
}
