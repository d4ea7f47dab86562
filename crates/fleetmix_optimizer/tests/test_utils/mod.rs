use fleetmix_optimizer::problem::{
    archetype::{ArchetypeBuilder, ArchetypeIdx, VehicleArchetype, VehicleFamily},
    catalog::ArchetypeCatalog,
    fleet_problem::{FleetProblem, FleetProblemBuilder},
    fleet_unit::FleetUnit,
    goals::FleetGoals,
    kilometers::Kilometers,
    trip::{Trip, TripBuilder},
    trip_stream::TripStream,
};
use jiff::{SignedDuration, Timestamp};

pub fn create_trip(id: &str, start: Timestamp, duration_minutes: i64, distance: f64) -> Trip {
    let mut builder = TripBuilder::default();
    builder
        .set_external_id(id.to_owned())
        .set_start(start)
        .set_end(start + SignedDuration::from_mins(duration_minutes))
        .set_distance(Kilometers::new(distance));
    builder.build().unwrap()
}

pub fn create_recorded_trip(
    id: &str,
    start: Timestamp,
    duration_minutes: i64,
    distance: f64,
    vehicle: &str,
) -> Trip {
    let mut builder = TripBuilder::default();
    builder
        .set_external_id(id.to_owned())
        .set_start(start)
        .set_end(start + SignedDuration::from_mins(duration_minutes))
        .set_distance(Kilometers::new(distance))
        .set_recorded_vehicle(vehicle.to_owned());
    builder.build().unwrap()
}

/// A working week of a small office: every day `drivers` people leave at
/// 09:00 for a morning visit and come back, then one afternoon errand.
pub fn create_office_week(drivers: usize) -> Vec<Trip> {
    let monday: Timestamp = "2024-03-04T00:00:00Z".parse().unwrap();
    let mut trips = Vec::new();

    for day in 0..5_i64 {
        let midnight = monday + SignedDuration::from_hours(24 * day);
        for driver in 0..drivers {
            trips.push(create_trip(
                &format!("d{day}-visit-{driver}"),
                midnight + SignedDuration::from_hours(9),
                150,
                25.0 + 10.0 * driver as f64,
            ));
        }
        trips.push(create_trip(
            &format!("d{day}-errand"),
            midnight + SignedDuration::from_hours(15),
            45,
            6.0,
        ));
    }

    trips
}

pub fn create_archetype(
    id: &str,
    family: VehicleFamily,
    yearly_cost: f64,
    range: Option<f64>,
) -> VehicleArchetype {
    let mut builder = ArchetypeBuilder::default();
    builder
        .set_external_id(id.to_owned())
        .set_make("Fleet".to_owned())
        .set_family(family)
        .set_yearly_cost(yearly_cost);

    if let Some(range) = range {
        builder.set_range(Kilometers::new(range));
    }

    builder.build().unwrap()
}

pub fn create_catalog() -> ArchetypeCatalog {
    ArchetypeCatalog::new(vec![
        create_archetype("petrol", VehicleFamily::Car, 3200.0, None),
        create_archetype("ev", VehicleFamily::ElectricCar, 3900.0, Some(311.0)),
        create_archetype("bike", VehicleFamily::Bike, 150.0, None),
    ])
}

pub fn create_test_problem(trips: Vec<Trip>, goals: FleetGoals) -> FleetProblem {
    let mut builder = FleetProblemBuilder::default();
    builder
        .set_trips(TripStream::sorted(trips).unwrap())
        .set_catalog(create_catalog())
        .set_goals(goals);
    builder.build().unwrap()
}

pub fn create_problem_with_fleet(
    trips: Vec<Trip>,
    units: &[(&str, usize)],
) -> FleetProblem {
    let mut builder = FleetProblemBuilder::default();
    builder
        .set_trips(TripStream::sorted(trips).unwrap())
        .set_catalog(create_catalog())
        .set_current_fleet(
            units
                .iter()
                .map(|&(id, archetype)| FleetUnit::new(id.to_owned(), ArchetypeIdx::new(archetype)))
                .collect(),
        );
    builder.build().unwrap()
}
