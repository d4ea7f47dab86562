pub mod archetype;
pub mod catalog;
pub mod consequences;
pub mod fleet_problem;
pub mod fleet_solution;
pub mod fleet_unit;
pub mod goals;
pub mod kilometers;
pub mod kmh;
pub mod trip;
pub mod trip_stream;
