use std::collections::VecDeque;

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use smallvec::{SmallVec, smallvec};

use crate::{
    problem::{
        archetype::{ArchetypeIdx, VehicleArchetype, VehicleFamily},
        kilometers::Kilometers,
        trip::{Trip, TripSegment},
    },
    simulation::{
        config::{BikeRules, SimulationConfig},
        occupancy::Occupancy,
    },
    utils::time::{self, DAYS_PER_YEAR},
};

/// Why a vehicle turned a trip down.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    Busy,
    MileageCap,
    Range,
    Distance,
    TimeWindow,
    Duration,
    Speed,
    MultiDay,
    Quota,
}

/// Shared, read-only inputs of every offer in a simulation.
#[derive(Clone, Copy)]
pub struct OfferContext<'a> {
    pub config: &'a SimulationConfig,
    pub period_start: Timestamp,
}

/// Live booking state of one vehicle unit for the length of one simulation.
#[derive(Debug, Clone)]
pub struct VehicleState<'a> {
    archetype_idx: ArchetypeIdx,
    instance: usize,
    archetype: &'a VehicleArchetype,
    unit_id: Option<&'a str>,
    occupancy: Occupancy,
    booked_distance: Kilometers,
    booked_trips: usize,
    family: FamilyState<'a>,
}

#[derive(Debug, Clone)]
enum FamilyState<'a> {
    Car,
    ElectricCar(RangeState),
    Bike(QuotaState<'a>),
}

#[derive(Debug, Clone)]
struct RangeState {
    range: Option<Kilometers>,
    remaining: Kilometers,
    min_rest: SignedDuration,
    last_recharge: Option<Timestamp>,
    /// Busy intervals still inside the trailing rest window, in start order.
    bookings: VecDeque<(Timestamp, Timestamp)>,
}

#[derive(Debug, Clone)]
struct QuotaState<'a> {
    rules: &'a BikeRules,
    seen: usize,
    accepted: usize,
}

/// Range bookkeeping after a trip, computed before committing to it.
struct RangePlan {
    remaining: Kilometers,
    last_recharge: Option<Timestamp>,
}

impl<'a> VehicleState<'a> {
    pub fn new(
        archetype_idx: ArchetypeIdx,
        instance: usize,
        archetype: &'a VehicleArchetype,
        config: &'a SimulationConfig,
        occupancy: Occupancy,
    ) -> Self {
        let family = match archetype.family() {
            VehicleFamily::Car => FamilyState::Car,
            VehicleFamily::ElectricCar => FamilyState::ElectricCar(RangeState {
                range: archetype.range(),
                remaining: archetype.range().unwrap_or(Kilometers::ZERO),
                min_rest: archetype.min_rest().unwrap_or(config.default_min_rest),
                last_recharge: None,
                bookings: VecDeque::new(),
            }),
            VehicleFamily::Bike => FamilyState::Bike(QuotaState::new(&config.bike)),
            VehicleFamily::ElectricBike => {
                FamilyState::Bike(QuotaState::new(&config.electric_bike))
            }
        };

        VehicleState {
            archetype_idx,
            instance,
            archetype,
            unit_id: None,
            occupancy,
            booked_distance: Kilometers::ZERO,
            booked_trips: 0,
            family,
        }
    }

    /// Binds this state to a physical unit of the current fleet.
    pub fn with_unit_id(mut self, unit_id: &'a str) -> Self {
        self.unit_id = Some(unit_id);
        self
    }

    pub fn archetype_idx(&self) -> ArchetypeIdx {
        self.archetype_idx
    }

    pub fn instance(&self) -> usize {
        self.instance
    }

    pub fn archetype(&self) -> &'a VehicleArchetype {
        self.archetype
    }

    pub fn unit_id(&self) -> Option<&'a str> {
        self.unit_id
    }

    pub fn booked_distance(&self) -> Kilometers {
        self.booked_distance
    }

    pub fn booked_trips(&self) -> usize {
        self.booked_trips
    }

    /// Remaining range of an electric car with a known range.
    pub fn remaining_range(&self) -> Option<Kilometers> {
        match &self.family {
            FamilyState::ElectricCar(state) => state.range.map(|_| state.remaining),
            _ => None,
        }
    }

    pub fn is_free(&self, trip: &Trip) -> bool {
        self.occupancy.is_free(trip.start(), trip.end())
    }

    /// Whether booking `trip` keeps the later trip `next` bookable.
    pub fn leaves_free(&self, trip: &Trip, next: &Trip) -> bool {
        self.occupancy
            .leaves_free((trip.start(), trip.end()), (next.start(), next.end()))
    }

    /// Books `trip` if every rule of the family allows it. A rejection leaves
    /// the state untouched, except for the bike quota which counts every trip
    /// that reached it.
    pub fn offer(&mut self, trip: &Trip, context: OfferContext<'_>) -> Result<(), RejectReason> {
        if !self.is_free(trip) {
            return Err(RejectReason::Busy);
        }

        match &mut self.family {
            FamilyState::Car => {
                check_mileage_cap(self.archetype, self.booked_distance, trip, context)?;
            }
            FamilyState::ElectricCar(state) => {
                check_mileage_cap(self.archetype, self.booked_distance, trip, context)?;
                if let Some(plan) = state.plan(trip, context.config)? {
                    state.commit(trip, plan, context.config);
                }
            }
            FamilyState::Bike(state) => {
                state.check_rules(trip, context.config)?;
                state.check_quota()?;
            }
        }

        self.record(trip);
        Ok(())
    }

    /// Books `trip` without consulting any rule. Replay trusts the history.
    pub fn force_book(&mut self, trip: &Trip, context: OfferContext<'_>) {
        if let FamilyState::ElectricCar(state) = &mut self.family {
            let plan = state.forced_plan(trip, context.config);
            state.commit(trip, plan, context.config);
        }

        self.record(trip);
    }

    fn record(&mut self, trip: &Trip) {
        self.occupancy.book(trip.start(), trip.end());
        self.booked_distance += trip.distance();
        self.booked_trips += 1;
    }
}

/// Rejects a trip when the booked distance, extrapolated to a year over the
/// elapsed part of the stream, would exceed the archetype's cap.
fn check_mileage_cap(
    archetype: &VehicleArchetype,
    booked_distance: Kilometers,
    trip: &Trip,
    context: OfferContext<'_>,
) -> Result<(), RejectReason> {
    if !context.config.yearly_mileage_enforcement {
        return Ok(());
    }
    let Some(cap) = archetype.yearly_distance_cap() else {
        return Ok(());
    };

    let elapsed_days = time::days(trip.end().duration_since(context.period_start))
        .max(context.config.mileage_extrapolation_min_days)
        .max(f64::MIN_POSITIVE);
    let projected = (booked_distance + trip.distance()) * (DAYS_PER_YEAR / elapsed_days);

    if projected > cap {
        Err(RejectReason::MileageCap)
    } else {
        Ok(())
    }
}

fn legs(trip: &Trip) -> SmallVec<[TripSegment; 2]> {
    if trip.has_sub_segments() {
        SmallVec::from_slice(trip.sub_segments())
    } else {
        smallvec![TripSegment::new(trip.start(), trip.end(), trip.distance())]
    }
}

impl RangeState {
    /// `None` when the archetype has no range limit.
    fn plan(
        &self,
        trip: &Trip,
        config: &SimulationConfig,
    ) -> Result<Option<RangePlan>, RejectReason> {
        let Some(range) = self.range else {
            return Ok(None);
        };

        let mut remaining = self.remaining;
        let mut last_recharge = self.last_recharge;
        let mut previous_end: Option<Timestamp> = None;

        for leg in legs(trip) {
            let rested = match previous_end {
                None => self.has_rested(leg.start, last_recharge, config),
                Some(previous_end) => leg.start.duration_since(previous_end) >= self.min_rest,
            };

            if rested {
                remaining = range;
                last_recharge = Some(leg.start);
            }

            remaining -= leg.distance;
            if remaining.is_negative() {
                return Err(RejectReason::Range);
            }

            previous_end = Some(leg.end);
        }

        Ok(Some(RangePlan {
            remaining,
            last_recharge,
        }))
    }

    /// Same walk as [`RangeState::plan`] without rejecting, the remaining
    /// range bottoms out at zero.
    fn forced_plan(&self, trip: &Trip, config: &SimulationConfig) -> RangePlan {
        let range = self.range.unwrap_or(Kilometers::ZERO);
        let mut remaining = self.remaining;
        let mut last_recharge = self.last_recharge;
        let mut previous_end: Option<Timestamp> = None;

        for leg in legs(trip) {
            let rested = match previous_end {
                None => self.has_rested(leg.start, last_recharge, config),
                Some(previous_end) => leg.start.duration_since(previous_end) >= self.min_rest,
            };

            if rested {
                remaining = range;
                last_recharge = Some(leg.start);
            }

            remaining = (remaining - leg.distance).max(Kilometers::ZERO);
            previous_end = Some(leg.end);
        }

        RangePlan {
            remaining,
            last_recharge,
        }
    }

    /// Whether the vehicle was idle for at least `min_rest` in the trailing
    /// window before `at`, counting only idle time after the last recharge.
    fn has_rested(
        &self,
        at: Timestamp,
        last_recharge: Option<Timestamp>,
        config: &SimulationConfig,
    ) -> bool {
        let mut cursor = at - config.rest_window;
        if let Some(last_recharge) = last_recharge
            && last_recharge > cursor
        {
            cursor = last_recharge;
        }

        for &(start, end) in &self.bookings {
            if start >= at {
                break;
            }
            if end <= cursor {
                continue;
            }
            if start.duration_since(cursor) >= self.min_rest {
                return true;
            }
            cursor = cursor.max(end);
        }

        at.duration_since(cursor) >= self.min_rest
    }

    fn commit(&mut self, trip: &Trip, plan: RangePlan, config: &SimulationConfig) {
        self.remaining = plan.remaining;
        self.last_recharge = plan.last_recharge;

        for leg in legs(trip) {
            self.bookings.push_back((leg.start, leg.end));
        }

        let horizon = trip.start() - config.rest_window;
        while let Some(&(_, end)) = self.bookings.front()
            && end < horizon
        {
            self.bookings.pop_front();
        }
    }
}

impl<'a> QuotaState<'a> {
    fn new(rules: &'a BikeRules) -> Self {
        QuotaState {
            rules,
            seen: 0,
            accepted: 0,
        }
    }

    fn check_rules(&self, trip: &Trip, config: &SimulationConfig) -> Result<(), RejectReason> {
        let rules = self.rules;

        if trip.is_multiday() {
            return Err(RejectReason::MultiDay);
        }

        if trip.distance() > rules.max_trip_distance {
            return Err(RejectReason::Distance);
        }

        if trip.duration() > rules.max_trip_duration {
            return Err(RejectReason::Duration);
        }

        if !rules.allowed_windows.is_empty() {
            let start = config.time_zone.to_datetime(trip.start());
            let end = config.time_zone.to_datetime(trip.end());
            let inside = start.date() == end.date()
                && rules
                    .allowed_windows
                    .iter()
                    .any(|window| window.contains(start.time(), end.time()));

            if !inside {
                return Err(RejectReason::TimeWindow);
            }
        }

        if trip.average_speed().value() > rules.max_average_speed.value() {
            return Err(RejectReason::Speed);
        }

        Ok(())
    }

    /// Accepts when taking the trip keeps the realized acceptance ratio at
    /// least as close to the target as declining it.
    fn check_quota(&mut self) -> Result<(), RejectReason> {
        self.seen += 1;

        let target = self.rules.target_percentage;
        let seen = self.seen as f64;
        let accept_distance = ((self.accepted + 1) as f64 / seen - target).abs();
        let reject_distance = (self.accepted as f64 / seen - target).abs();

        if accept_distance <= reject_distance {
            self.accepted += 1;
            Ok(())
        } else {
            Err(RejectReason::Quota)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        simulation::config::BookingMode,
        test_utils::{
            create_bike, create_capped_car, create_car, create_electric_car, create_segmented_trip,
            create_trip, ts,
        },
    };

    fn occupancy() -> Occupancy {
        Occupancy::new(
            BookingMode::FreeAt,
            ts("2024-03-04T00:00:00Z"),
            ts("2024-03-10T00:00:00Z"),
        )
    }

    fn context(config: &SimulationConfig) -> OfferContext<'_> {
        OfferContext {
            config,
            period_start: ts("2024-03-04T00:00:00Z"),
        }
    }

    #[test]
    fn test_car_rejects_overlapping_trip() {
        let config = SimulationConfig::default();
        let archetype = create_car("car", 3000.0);
        let mut vehicle =
            VehicleState::new(ArchetypeIdx::new(0), 0, &archetype, &config, occupancy());

        let first = create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 20.0);
        let second = create_trip("b", "2024-03-04T09:00:00Z", "2024-03-04T11:00:00Z", 20.0);
        let third = create_trip("c", "2024-03-04T10:00:00Z", "2024-03-04T11:00:00Z", 20.0);

        assert_eq!(vehicle.offer(&first, context(&config)), Ok(()));
        assert_eq!(
            vehicle.offer(&second, context(&config)),
            Err(RejectReason::Busy)
        );
        assert_eq!(vehicle.offer(&third, context(&config)), Ok(()));
        assert_eq!(vehicle.booked_trips(), 2);
        assert_eq!(vehicle.booked_distance(), Kilometers::new(40.0));
    }

    #[test]
    fn test_yearly_mileage_cap() {
        let config = SimulationConfig {
            yearly_mileage_enforcement: true,
            ..SimulationConfig::default()
        };
        let archetype = create_capped_car("car", 3000.0, 10_000.0);
        let mut vehicle =
            VehicleState::new(ArchetypeIdx::new(0), 0, &archetype, &config, occupancy());

        // 150 km over the 7 minimum days projects to ~7800 km a year.
        let first = create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 150.0);
        // Another 100 km projects to 13000 km.
        let second = create_trip("b", "2024-03-04T11:00:00Z", "2024-03-04T12:00:00Z", 100.0);

        assert_eq!(vehicle.offer(&first, context(&config)), Ok(()));
        assert_eq!(
            vehicle.offer(&second, context(&config)),
            Err(RejectReason::MileageCap)
        );

        let relaxed = SimulationConfig::default();
        assert_eq!(vehicle.offer(&second, context(&relaxed)), Ok(()));
    }

    #[test]
    fn test_fresh_electric_car_range() {
        let config = SimulationConfig::default();
        let archetype = create_electric_car("ev", 4000.0, 100.0);

        let mut vehicle =
            VehicleState::new(ArchetypeIdx::new(0), 0, &archetype, &config, occupancy());
        let too_long = create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 120.0);
        assert_eq!(
            vehicle.offer(&too_long, context(&config)),
            Err(RejectReason::Range)
        );

        let fits = create_trip("b", "2024-03-04T11:00:00Z", "2024-03-04T12:00:00Z", 100.0);
        assert_eq!(vehicle.offer(&fits, context(&config)), Ok(()));
        assert_eq!(vehicle.remaining_range(), Some(Kilometers::ZERO));
    }

    #[test]
    fn test_electric_car_recharges_after_rest() {
        let config = SimulationConfig::default();
        let archetype = create_electric_car("ev", 4000.0, 100.0);
        let mut vehicle =
            VehicleState::new(ArchetypeIdx::new(0), 0, &archetype, &config, occupancy());

        let morning = create_trip("a", "2024-03-04T06:00:00Z", "2024-03-04T07:00:00Z", 70.0);
        let noon = create_trip("b", "2024-03-04T12:00:00Z", "2024-03-04T13:00:00Z", 40.0);
        let night = create_trip("c", "2024-03-04T21:00:00Z", "2024-03-04T22:00:00Z", 90.0);

        assert_eq!(vehicle.offer(&morning, context(&config)), Ok(()));
        // Only five idle hours since the morning trip, not enough to recharge.
        assert_eq!(
            vehicle.offer(&noon, context(&config)),
            Err(RejectReason::Range)
        );
        // Fourteen idle hours: full range again.
        assert_eq!(vehicle.offer(&night, context(&config)), Ok(()));
        assert_eq!(vehicle.remaining_range(), Some(Kilometers::new(10.0)));
    }

    #[test]
    fn test_electric_car_recharges_between_segments() {
        let config = SimulationConfig::default();
        let archetype = create_electric_car("ev", 4000.0, 300.0);
        let mut vehicle =
            VehicleState::new(ArchetypeIdx::new(0), 0, &archetype, &config, occupancy());

        let trip = create_segmented_trip(
            "tour",
            &[
                ("2024-03-04T08:00:00Z", "2024-03-04T12:00:00Z", 250.0),
                ("2024-03-05T08:00:00Z", "2024-03-05T12:00:00Z", 250.0),
            ],
        );
        assert_eq!(vehicle.offer(&trip, context(&config)), Ok(()));
        assert_eq!(vehicle.remaining_range(), Some(Kilometers::new(50.0)));

        let short_stop = create_segmented_trip(
            "dash",
            &[
                ("2024-03-06T08:00:00Z", "2024-03-06T10:00:00Z", 250.0),
                ("2024-03-06T11:00:00Z", "2024-03-06T13:00:00Z", 250.0),
            ],
        );
        assert_eq!(
            vehicle.offer(&short_stop, context(&config)),
            Err(RejectReason::Range)
        );
    }

    #[test]
    fn test_bike_rules() {
        let config = SimulationConfig::default();
        let archetype = create_bike("bike", 150.0);
        let mut vehicle =
            VehicleState::new(ArchetypeIdx::new(0), 0, &archetype, &config, occupancy());

        let too_far = create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T09:00:00Z", 15.0);
        let too_early = create_trip("b", "2024-03-04T05:00:00Z", "2024-03-04T05:30:00Z", 5.0);
        let too_fast = create_trip("c", "2024-03-04T08:00:00Z", "2024-03-04T08:10:00Z", 9.0);
        let too_long = create_trip("d", "2024-03-04T08:00:00Z", "2024-03-04T13:00:00Z", 9.0);
        let multiday = create_trip("e", "2024-03-04T18:00:00Z", "2024-03-05T08:00:00Z", 9.0);
        let fine = create_trip("f", "2024-03-04T08:00:00Z", "2024-03-04T08:30:00Z", 5.0);

        assert_eq!(
            vehicle.offer(&too_far, context(&config)),
            Err(RejectReason::Distance)
        );
        assert_eq!(
            vehicle.offer(&too_early, context(&config)),
            Err(RejectReason::TimeWindow)
        );
        assert_eq!(
            vehicle.offer(&too_fast, context(&config)),
            Err(RejectReason::Speed)
        );
        assert_eq!(
            vehicle.offer(&too_long, context(&config)),
            Err(RejectReason::Duration)
        );
        assert_eq!(
            vehicle.offer(&multiday, context(&config)),
            Err(RejectReason::MultiDay)
        );
        assert_eq!(vehicle.offer(&fine, context(&config)), Ok(()));
    }

    #[test]
    fn test_bike_windows_follow_time_zone() {
        let config = SimulationConfig {
            time_zone: jiff::tz::TimeZone::fixed(jiff::tz::offset(2)),
            ..SimulationConfig::default()
        };
        let archetype = create_bike("bike", 150.0);
        let mut vehicle =
            VehicleState::new(ArchetypeIdx::new(0), 0, &archetype, &config, occupancy());

        // 05:30 UTC is 07:30 local.
        let trip = create_trip("a", "2024-03-04T05:30:00Z", "2024-03-04T06:00:00Z", 5.0);
        assert_eq!(vehicle.offer(&trip, context(&config)), Ok(()));
    }

    #[test]
    fn test_bike_quota_prefers_accept_on_tie() {
        let mut rules = BikeRules::bike();
        rules.target_percentage = 0.5;
        let mut quota = QuotaState::new(&rules);

        // 1/1 and 0/1 are equally far from 0.5.
        assert_eq!(quota.check_quota(), Ok(()));
        assert_eq!(quota.check_quota(), Err(RejectReason::Quota));
        assert_eq!(quota.check_quota(), Ok(()));
        assert_eq!(quota.check_quota(), Err(RejectReason::Quota));
        assert_eq!((quota.seen, quota.accepted), (4, 2));
    }

    #[test]
    fn test_force_book_ignores_rules() {
        let config = SimulationConfig::default();
        let archetype = create_electric_car("ev", 4000.0, 50.0);
        let mut vehicle =
            VehicleState::new(ArchetypeIdx::new(0), 0, &archetype, &config, occupancy());

        let trip = create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 80.0);
        vehicle.force_book(&trip, context(&config));

        assert_eq!(vehicle.booked_trips(), 1);
        assert_eq!(vehicle.remaining_range(), Some(Kilometers::ZERO));
    }
}
