use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp, civil::Time, tz::TimeZone};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    error::{FleetError, InputError},
    problem::{
        archetype::{ArchetypeBuilder, ArchetypeIdx, FuelType, VehicleFamily},
        catalog::{ArchetypeCatalog, CatalogDeduplication},
        consequences::LinearConsequences,
        fleet_problem::{FleetProblem, FleetProblemBuilder},
        fleet_solution::ArchetypeBounds,
        fleet_unit::FleetUnit,
        goals::FleetGoals,
        kilometers::Kilometers,
        kmh::Kmh,
        trip::{TripBuilder, TripSegment},
        trip_stream::TripStream,
    },
    simulation::{
        config::{BikeRules, BookingMode, SimulationConfig, TimeOfDayWindow},
        evaluation::GoalViolation,
    },
    solver::{
        least_viable::LeastViableFleet,
        ranking::RankedFleet,
        solver::{FleetReport, Infeasibility, SolverOutcome},
    },
};

pub trait FromProblem<T> {
    fn from_problem(value: T, problem: &FleetProblem) -> Self;
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "FleetProblem")]
pub struct JsonFleetProblem {
    pub trips: Vec<JsonTrip>,
    pub archetypes: Vec<JsonArchetype>,
    pub current_fleet: Option<Vec<JsonFleetUnit>>,
    pub locks: Option<Vec<JsonLock>>,
    pub goals: Option<JsonGoals>,
    pub simulation: Option<JsonSimulation>,
    pub consequences: Option<LinearConsequences>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Trip")]
pub struct JsonTrip {
    pub id: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub distance_km: f64,
    pub average_speed_kmh: Option<f64>,
    pub is_multiday: Option<bool>,
    pub sub_segments: Option<Vec<JsonTripSegment>>,
    /// Unit of the current fleet that drove the trip.
    pub vehicle_id: Option<String>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "TripSegment")]
pub struct JsonTripSegment {
    pub start: Timestamp,
    pub end: Timestamp,
    pub distance_km: f64,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Archetype")]
pub struct JsonArchetype {
    pub id: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub family: VehicleFamily,
    pub fuel: Option<FuelType>,
    pub range_km: Option<f64>,
    pub yearly_km_cap: Option<f64>,
    pub min_rest_hours: Option<f64>,
    pub yearly_cost: f64,
    pub co2_per_km: Option<f64>,
    pub consumption_per_km: Option<f64>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "FleetUnit")]
pub struct JsonFleetUnit {
    pub id: String,
    pub archetype_id: String,
}

/// Contractual bounds on the number of units of an archetype.
#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Lock")]
pub struct JsonLock {
    pub archetype_id: String,
    pub floor: Option<usize>,
    pub ceiling: Option<usize>,
}

#[derive(Serialize, Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields, rename = "Goals")]
pub struct JsonGoals {
    /// 0 to 10.
    pub cost_weight: Option<f64>,
    /// 0 to 10.
    pub co2_weight: Option<f64>,
    pub slack: Option<usize>,
    pub max_undriven_km: Option<f64>,
    pub max_yearly_cost: Option<f64>,
    pub max_yearly_co2e: Option<f64>,
    pub yearly_mileage_enforcement: Option<bool>,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy)]
#[serde(tag = "type", rename_all = "snake_case", rename = "BookingMode")]
pub enum JsonBookingMode {
    FreeAt,
    TimeSlots { slot_minutes: u32 },
}

#[derive(Serialize, Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields, rename = "Simulation")]
pub struct JsonSimulation {
    pub booking_mode: Option<JsonBookingMode>,
    /// IANA time zone used for the peak day and bike time windows.
    pub time_zone: Option<String>,
    pub default_min_rest_hours: Option<f64>,
    pub rest_window_hours: Option<f64>,
    pub mileage_extrapolation_min_days: Option<f64>,
    pub bike: Option<JsonBikeRules>,
    pub electric_bike: Option<JsonBikeRules>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "BikeRules")]
pub struct JsonBikeRules {
    pub max_trip_km: Option<f64>,
    /// Local `HH:MM` windows, any time of day when empty.
    pub allowed_windows: Option<Vec<JsonTimeOfDayWindow>>,
    pub max_trip_hours: Option<f64>,
    pub max_average_kmh: Option<f64>,
    /// Share of offered trips to accept, 0 to 1.
    pub target_percentage: Option<f64>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "TimeOfDayWindow")]
pub struct JsonTimeOfDayWindow {
    pub start: String,
    pub end: String,
}

fn hours(value: f64) -> SignedDuration {
    SignedDuration::from_secs_f64(value * 3600.0)
}

fn parse_time_of_day(value: &str) -> Result<Time, InputError> {
    value
        .parse::<Time>()
        .map_err(|_| InputError::InvalidTimeOfDay(value.to_owned()))
}

impl JsonBikeRules {
    fn into_rules(self, mut rules: BikeRules) -> Result<BikeRules, InputError> {
        if let Some(max_trip_km) = self.max_trip_km {
            rules.max_trip_distance = Kilometers::new(max_trip_km);
        }

        if let Some(windows) = self.allowed_windows {
            rules.allowed_windows = windows
                .iter()
                .map(|window| {
                    Ok(TimeOfDayWindow::new(
                        parse_time_of_day(&window.start)?,
                        parse_time_of_day(&window.end)?,
                    ))
                })
                .collect::<Result<_, InputError>>()?;
        }

        if let Some(max_trip_hours) = self.max_trip_hours {
            rules.max_trip_duration = hours(max_trip_hours);
        }

        if let Some(max_average_kmh) = self.max_average_kmh {
            rules.max_average_speed = Kmh::new(max_average_kmh);
        }

        if let Some(target_percentage) = self.target_percentage {
            rules.target_percentage = target_percentage.clamp(0.0, 1.0);
        }

        Ok(rules)
    }
}

impl JsonSimulation {
    fn into_config(self, yearly_mileage_enforcement: bool) -> Result<SimulationConfig, InputError> {
        let mut config = SimulationConfig {
            yearly_mileage_enforcement,
            ..SimulationConfig::default()
        };

        if let Some(booking_mode) = self.booking_mode {
            config.booking_mode = match booking_mode {
                JsonBookingMode::FreeAt => BookingMode::FreeAt,
                JsonBookingMode::TimeSlots { slot_minutes } => BookingMode::TimeSlots {
                    slot: SignedDuration::from_mins(i64::from(slot_minutes.max(1))),
                },
            };
        }

        if let Some(time_zone) = self.time_zone {
            config.time_zone = TimeZone::get(&time_zone)
                .map_err(|_| InputError::UnknownTimeZone(time_zone.clone()))?;
        }

        if let Some(default_min_rest_hours) = self.default_min_rest_hours {
            config.default_min_rest = hours(default_min_rest_hours);
        }

        if let Some(rest_window_hours) = self.rest_window_hours {
            config.rest_window = hours(rest_window_hours);
        }

        if let Some(min_days) = self.mileage_extrapolation_min_days {
            config.mileage_extrapolation_min_days = min_days;
        }

        if let Some(bike) = self.bike {
            config.bike = bike.into_rules(config.bike)?;
        }

        if let Some(electric_bike) = self.electric_bike {
            config.electric_bike = electric_bike.into_rules(config.electric_bike)?;
        }

        Ok(config)
    }
}

impl JsonFleetProblem {
    /// Deduplicates the catalog, points locks and fleet units at the kept
    /// representatives and sorts the trips by start time.
    #[instrument(skip_all, level = "debug")]
    pub fn build_problem(self) -> Result<FleetProblem, FleetError> {
        let mut builder = FleetProblemBuilder::default();

        let archetype_ids: Vec<String> = self
            .archetypes
            .iter()
            .map(|archetype| archetype.id.clone())
            .collect();

        let archetypes = self
            .archetypes
            .into_iter()
            .map(|archetype| {
                let mut builder = ArchetypeBuilder::default();

                builder
                    .set_external_id(archetype.id)
                    .set_family(archetype.family)
                    .set_yearly_cost(archetype.yearly_cost);

                if let Some(make) = archetype.make {
                    builder.set_make(make);
                }

                if let Some(model) = archetype.model {
                    builder.set_model(model);
                }

                if let Some(fuel) = archetype.fuel {
                    builder.set_fuel(fuel);
                }

                if let Some(range_km) = archetype.range_km {
                    builder.set_range(Kilometers::new(range_km));
                }

                if let Some(yearly_km_cap) = archetype.yearly_km_cap {
                    builder.set_yearly_distance_cap(Kilometers::new(yearly_km_cap));
                }

                if let Some(min_rest_hours) = archetype.min_rest_hours {
                    builder.set_min_rest(hours(min_rest_hours));
                }

                if let Some(co2_per_km) = archetype.co2_per_km {
                    builder.set_co2_per_km(co2_per_km);
                }

                if let Some(consumption_per_km) = archetype.consumption_per_km {
                    builder.set_consumption_per_km(consumption_per_km);
                }

                builder.build()
            })
            .collect::<Result<Vec<_>, InputError>>()?;

        let CatalogDeduplication { catalog, mapping } = ArchetypeCatalog::deduplicated(archetypes);
        let archetype_index: FxHashMap<&str, ArchetypeIdx> = archetype_ids
            .iter()
            .map(String::as_str)
            .zip(mapping.iter().copied())
            .collect();
        let resolve = |id: &str| {
            archetype_index
                .get(id)
                .copied()
                .ok_or_else(|| InputError::UnknownArchetype(id.to_owned()))
        };

        // Locks on archetypes collapsed into the same representative add up.
        let mut bounds: FxHashMap<ArchetypeIdx, (usize, Option<usize>)> = FxHashMap::default();
        for lock in self.locks.unwrap_or_default() {
            let index = resolve(&lock.archetype_id)?;
            let floor = lock.floor.unwrap_or(0);
            let entry = bounds.entry(index).or_insert((0, Some(0)));
            entry.0 += floor;
            entry.1 = entry.1.zip(lock.ceiling).map(|(a, b)| a + b);

            if let Some(ceiling) = lock.ceiling
                && ceiling < floor
            {
                return Err(InputError::InvalidBounds {
                    archetype: lock.archetype_id,
                    floor,
                    ceiling,
                }
                .into());
            }
        }

        let mut bounds: Vec<_> = bounds.into_iter().collect();
        bounds.sort_by_key(|(index, _)| *index);
        for (index, (floor, ceiling)) in bounds {
            builder.add_bounds(index, ArchetypeBounds { floor, ceiling });
        }

        let current_fleet = self
            .current_fleet
            .unwrap_or_default()
            .into_iter()
            .map(|unit| Ok(FleetUnit::new(unit.id, resolve(&unit.archetype_id)?)))
            .collect::<Result<Vec<_>, InputError>>()?;

        let trips = self
            .trips
            .into_iter()
            .map(|trip| {
                let mut builder = TripBuilder::default();

                builder
                    .set_external_id(trip.id)
                    .set_start(trip.start)
                    .set_end(trip.end)
                    .set_distance(Kilometers::new(trip.distance_km));

                if let Some(speed) = trip.average_speed_kmh {
                    builder.set_speed(Kmh::new(speed));
                }

                if let Some(is_multiday) = trip.is_multiday {
                    builder.set_multiday(is_multiday);
                }

                for segment in trip.sub_segments.unwrap_or_default() {
                    builder.add_sub_segment(TripSegment::new(
                        segment.start,
                        segment.end,
                        Kilometers::new(segment.distance_km),
                    ));
                }

                if let Some(vehicle_id) = trip.vehicle_id {
                    builder.set_recorded_vehicle(vehicle_id);
                }

                builder.build()
            })
            .collect::<Result<Vec<_>, InputError>>()?;

        let goals = self.goals.unwrap_or_default();
        let simulation = self
            .simulation
            .unwrap_or_default()
            .into_config(goals.yearly_mileage_enforcement.unwrap_or(false))?;

        let defaults = FleetGoals::default();
        builder
            .set_trips(TripStream::sorted(trips)?)
            .set_catalog(catalog)
            .set_current_fleet(current_fleet)
            .set_simulation_config(simulation)
            .set_goals(FleetGoals {
                cost_weight: goals.cost_weight.unwrap_or(defaults.cost_weight),
                co2_weight: goals.co2_weight.unwrap_or(defaults.co2_weight),
                slack: goals.slack.unwrap_or(defaults.slack),
                max_undriven_distance: goals.max_undriven_km.map(Kilometers::new),
                max_yearly_cost: goals.max_yearly_cost,
                max_yearly_co2e: goals.max_yearly_co2e,
            })
            .set_consequence_function(Box::new(self.consequences.unwrap_or_default()));

        builder.build()
    }
}

#[derive(Serialize)]
#[serde(rename = "FleetEntry")]
pub struct JsonFleetEntry {
    pub archetype_id: String,
    pub label: String,
    pub count: usize,
}

#[derive(Serialize)]
#[serde(rename = "RankedFleet")]
pub struct JsonRankedFleet {
    pub fleet: Vec<JsonFleetEntry>,
    pub yearly_cost: f64,
    pub yearly_co2e: f64,
    pub unallocated_trips: usize,
    pub undriven_km: f64,
    pub units: usize,
    pub unique_archetypes: usize,
    pub violations: Vec<GoalViolation>,
}

impl FromProblem<&RankedFleet> for JsonRankedFleet {
    fn from_problem(value: &RankedFleet, problem: &FleetProblem) -> Self {
        JsonRankedFleet {
            fleet: value
                .solution
                .iter()
                .filter(|(_, count)| *count > 0)
                .map(|(index, count)| {
                    let archetype = problem.archetype(index);
                    JsonFleetEntry {
                        archetype_id: archetype.external_id().to_owned(),
                        label: archetype.label(),
                        count,
                    }
                })
                .collect(),
            yearly_cost: value.evaluation.yearly_cost,
            yearly_co2e: value.evaluation.yearly_co2e,
            unallocated_trips: value.evaluation.unallocated_trips,
            undriven_km: value.evaluation.undriven_distance.value(),
            units: value.evaluation.units,
            unique_archetypes: value.evaluation.unique_archetypes,
            violations: value.violations.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename = "LeastViableFleet")]
pub struct JsonLeastViableFleet {
    pub archetype_id: String,
    pub breakpoint: usize,
    pub last_infeasible: Option<usize>,
    pub converged: bool,
    pub viable: bool,
}

impl FromProblem<&LeastViableFleet> for JsonLeastViableFleet {
    fn from_problem(value: &LeastViableFleet, problem: &FleetProblem) -> Self {
        JsonLeastViableFleet {
            archetype_id: problem.archetype(value.archetype).external_id().to_owned(),
            breakpoint: value.breakpoint,
            last_infeasible: value.last_infeasible,
            converged: value.converged,
            viable: value.viable,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename = "FleetReport")]
pub enum JsonFleetReport {
    Solved(JsonReportBody),
    GoalsUnmet(JsonReportBody),
    Infeasible { reason: Infeasibility },
    Aborted,
}

#[derive(Serialize)]
pub struct JsonReportBody {
    pub fleets: Vec<JsonRankedFleet>,
    pub least_viable: JsonLeastViableFleet,
    pub current_fleet: Option<JsonRankedFleet>,
    pub current_fleet_error: Option<String>,
}

impl FromProblem<&FleetReport> for JsonReportBody {
    fn from_problem(value: &FleetReport, problem: &FleetProblem) -> Self {
        JsonReportBody {
            fleets: value
                .fleets
                .iter()
                .map(|fleet| JsonRankedFleet::from_problem(fleet, problem))
                .collect(),
            least_viable: JsonLeastViableFleet::from_problem(&value.least_viable, problem),
            current_fleet: value
                .current_fleet
                .as_ref()
                .map(|fleet| JsonRankedFleet::from_problem(fleet, problem)),
            current_fleet_error: value
                .current_fleet_error
                .as_ref()
                .map(ToString::to_string),
        }
    }
}

impl FromProblem<&SolverOutcome> for JsonFleetReport {
    fn from_problem(value: &SolverOutcome, problem: &FleetProblem) -> Self {
        match value {
            SolverOutcome::Solved(report) => {
                JsonFleetReport::Solved(JsonReportBody::from_problem(report, problem))
            }
            SolverOutcome::GoalsUnmet(report) => {
                JsonFleetReport::GoalsUnmet(JsonReportBody::from_problem(report, problem))
            }
            SolverOutcome::Infeasible(reason) => JsonFleetReport::Infeasible {
                reason: reason.clone(),
            },
            SolverOutcome::Aborted => JsonFleetReport::Aborted,
        }
    }
}
