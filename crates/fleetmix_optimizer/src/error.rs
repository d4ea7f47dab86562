use serde::Serialize;
use thiserror::Error;

/// Failures that abort a run instead of producing a structured outcome.
///
/// Recoverable situations (infeasible locked fleets, unmet goals, cancellation)
/// are reported through [`crate::solver::solver::SolverOutcome`].
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("No usable input: {0}")]
    InputEmpty(EmptyInput),

    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("Simulation inconsistency: {0}")]
    SimulationInconsistency(#[from] Inconsistency),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EmptyInput {
    #[error("the vehicle archetype catalog is empty")]
    NoArchetypes,
    #[error("the trip stream is empty")]
    NoTrips,
}

/// Malformed input values, rejected while building a problem.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("Missing required field `{field}` on {entity}")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("Unknown archetype `{0}`")]
    UnknownArchetype(String),

    #[error("Invalid time of day `{0}`, expected HH:MM")]
    InvalidTimeOfDay(String),

    #[error("Fleet unit `{0}` appears more than once")]
    DuplicateUnit(String),

    #[error("Unknown time zone `{0}`")]
    UnknownTimeZone(String),

    #[error("Bounds for archetype `{archetype}` have floor {floor} above ceiling {ceiling}")]
    InvalidBounds {
        archetype: String,
        floor: usize,
        ceiling: usize,
    },

    #[error("Negative value {value} for `{field}`")]
    NegativeValue { field: &'static str, value: f64 },
}

/// Data-integrity violations of the trip stream. Correcting these is the job of
/// the upstream aggregation, the core only reports them.
#[derive(Serialize, Debug, Error, Clone, PartialEq)]
pub enum Inconsistency {
    #[error("Trip `{trip}` starts before the previous trip `{previous}`")]
    OutOfOrder { trip: String, previous: String },

    #[error("Trip id `{0}` appears more than once")]
    DuplicateTrip(String),

    #[error("Trip `{0}` ends before it starts")]
    NegativeDuration(String),

    #[error("Sub-segment {segment} of trip `{trip}` is out of order or outside the trip")]
    MalformedSegment { trip: String, segment: usize },

    #[error("Recorded vehicle `{vehicle}` is already booked when trip `{trip}` starts")]
    ReplayDoubleBooking { trip: String, vehicle: String },
}
