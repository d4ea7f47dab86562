use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use fleetmix_optimizer::{
    problem::{
        archetype::{ArchetypeBuilder, VehicleArchetype, VehicleFamily},
        catalog::ArchetypeCatalog,
        fleet_problem::{FleetProblem, FleetProblemBuilder},
        fleet_solution::FleetSolution,
        kilometers::Kilometers,
        trip::{Trip, TripBuilder},
        trip_stream::TripStream,
    },
    simulation::simulator::Simulator,
};
use jiff::{SignedDuration, Timestamp};
use rand::{Rng, SeedableRng, rngs::SmallRng};

fn archetype(id: &str, family: VehicleFamily, yearly_cost: f64) -> VehicleArchetype {
    let mut builder = ArchetypeBuilder::default();
    builder
        .set_external_id(id.to_owned())
        .set_family(family)
        .set_yearly_cost(yearly_cost);

    if family == VehicleFamily::ElectricCar {
        builder.set_range(Kilometers::new(311.0));
    }

    builder.build().unwrap()
}

/// Thirty days of office-hour trips, mostly short.
fn random_trips(count: usize) -> Vec<Trip> {
    let mut rng = SmallRng::seed_from_u64(42);
    let origin: Timestamp = "2024-03-04T00:00:00Z".parse().unwrap();

    (0..count)
        .map(|index| {
            let day = rng.random_range(0..30_i64);
            let start_minutes = rng.random_range(7 * 60..18 * 60_i64);
            let duration_minutes = rng.random_range(15..240_i64);
            let start = origin
                .checked_add(SignedDuration::from_mins(day * 24 * 60 + start_minutes))
                .unwrap();
            let end = start
                .checked_add(SignedDuration::from_mins(duration_minutes))
                .unwrap();

            let mut builder = TripBuilder::default();
            builder
                .set_external_id(format!("trip-{index}"))
                .set_start(start)
                .set_end(end)
                .set_distance(Kilometers::new(rng.random_range(1.0..120.0)));
            builder.build().unwrap()
        })
        .collect()
}

fn create_problem(count: usize) -> FleetProblem {
    let mut builder = FleetProblemBuilder::default();
    builder
        .set_trips(TripStream::sorted(random_trips(count)).unwrap())
        .set_catalog(ArchetypeCatalog::new(vec![
            archetype("car", VehicleFamily::Car, 3200.0),
            archetype("ev", VehicleFamily::ElectricCar, 4100.0),
            archetype("bike", VehicleFamily::Bike, 150.0),
        ]));
    builder.build().unwrap()
}

fn simulation_benchmark(c: &mut Criterion) {
    let problem = create_problem(2_000);
    let solution = FleetSolution::new(vec![6, 4, 3]);
    let simulator = Simulator::new(&problem, problem.trips());

    c.bench_function("simulate 2000 trips", |b| {
        b.iter(|| simulator.simulate(black_box(&solution)))
    });

    let peak_day = Simulator::new(&problem, problem.peak_day());
    c.bench_function("simulate peak day", |b| {
        b.iter(|| peak_day.simulate(black_box(&solution)))
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
