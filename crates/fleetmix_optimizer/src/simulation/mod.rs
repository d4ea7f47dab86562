pub mod config;
pub mod evaluation;
pub mod inventory;
pub mod occupancy;
pub mod simulator;
pub mod vehicle_state;
