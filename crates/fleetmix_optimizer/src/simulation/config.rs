use jiff::{SignedDuration, civil::Time, tz::TimeZone};
use serde::Serialize;

use crate::problem::{kilometers::Kilometers, kmh::Kmh};

/// How vehicle availability is tracked during a simulation.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub enum BookingMode {
    /// A single "free at" instant per vehicle.
    FreeAt,
    /// Slot bitsets over the stream horizon, exact at slot granularity.
    TimeSlots { slot: SignedDuration },
}

/// Local time-of-day window, `[start, end)`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TimeOfDayWindow {
    pub start: Time,
    pub end: Time,
}

impl TimeOfDayWindow {
    pub fn new(start: Time, end: Time) -> Self {
        TimeOfDayWindow { start, end }
    }

    /// Whether `[start, end]` of a trip fits inside the window. Both ends are
    /// local times of the same day.
    pub fn contains(&self, start: Time, end: Time) -> bool {
        start >= self.start && end <= self.end && start <= end
    }
}

/// Rules deciding which trips a bike may take. Shared read-only by every bike
/// of the same family in a simulation.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BikeRules {
    pub max_trip_distance: Kilometers,
    /// Empty means any time of day.
    pub allowed_windows: Vec<TimeOfDayWindow>,
    pub max_trip_duration: SignedDuration,
    pub max_average_speed: Kmh,
    /// Share of offered trips the bike should take, in `[0, 1]`.
    pub target_percentage: f64,
}

impl BikeRules {
    pub fn bike() -> Self {
        BikeRules {
            max_trip_distance: Kilometers::new(10.0),
            allowed_windows: vec![TimeOfDayWindow::new(
                Time::constant(7, 0, 0, 0),
                Time::constant(19, 0, 0, 0),
            )],
            max_trip_duration: SignedDuration::from_hours(4),
            max_average_speed: Kmh::new(25.0),
            target_percentage: 1.0,
        }
    }

    pub fn electric_bike() -> Self {
        BikeRules {
            max_trip_distance: Kilometers::new(20.0),
            max_average_speed: Kmh::new(35.0),
            ..BikeRules::bike()
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub booking_mode: BookingMode,
    pub bike: BikeRules,
    pub electric_bike: BikeRules,
    /// Rest needed to recharge an electric car whose archetype has none.
    pub default_min_rest: SignedDuration,
    /// Trailing window in which the rest has to happen.
    pub rest_window: SignedDuration,
    pub yearly_mileage_enforcement: bool,
    /// Lower bound on the elapsed days used to extrapolate yearly mileage, so
    /// the first trips of a stream do not project absurd yearly distances.
    pub mileage_extrapolation_min_days: f64,
    #[serde(skip)]
    pub time_zone: TimeZone,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            booking_mode: BookingMode::FreeAt,
            bike: BikeRules::bike(),
            electric_bike: BikeRules::electric_bike(),
            default_min_rest: SignedDuration::from_hours(8),
            rest_window: SignedDuration::from_hours(24),
            yearly_mileage_enforcement: false,
            mileage_extrapolation_min_days: 7.0,
            time_zone: TimeZone::UTC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_window() {
        let window = TimeOfDayWindow::new(Time::constant(7, 0, 0, 0), Time::constant(19, 0, 0, 0));

        assert!(window.contains(Time::constant(8, 0, 0, 0), Time::constant(9, 0, 0, 0)));
        assert!(window.contains(Time::constant(7, 0, 0, 0), Time::constant(19, 0, 0, 0)));
        assert!(!window.contains(Time::constant(18, 0, 0, 0), Time::constant(20, 0, 0, 0)));
        assert!(!window.contains(Time::constant(6, 30, 0, 0), Time::constant(7, 30, 0, 0)));
    }
}
