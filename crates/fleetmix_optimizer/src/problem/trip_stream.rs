use fxhash::{FxHashMap, FxHashSet};
use jiff::{SignedDuration, Timestamp, civil::Date, tz::TimeZone};

use crate::{
    error::Inconsistency,
    problem::{
        kilometers::Kilometers,
        trip::{Trip, TripIdx},
    },
    utils::{enumerate_idx::EnumerateIdx, time},
};

/// An ordered, validated sequence of trips.
///
/// Trips are ordered by start time and have unique ids. The simulator relies
/// on this ordering: a vehicle that is free when a trip starts can never be
/// needed for an earlier one.
#[derive(Debug, Clone, Default)]
pub struct TripStream {
    trips: Vec<Trip>,
}

impl TripStream {
    /// Validates an already ordered stream. Out-of-order input is reported,
    /// never reordered.
    pub fn new(trips: Vec<Trip>) -> Result<Self, Inconsistency> {
        Self::validate(&trips)?;
        Ok(TripStream { trips })
    }

    /// Orders `trips` by start time (stable, so equal starts keep their input
    /// order) before validating them.
    pub fn sorted(mut trips: Vec<Trip>) -> Result<Self, Inconsistency> {
        trips.sort_by_key(|trip| trip.start());
        Self::new(trips)
    }

    fn validate(trips: &[Trip]) -> Result<(), Inconsistency> {
        let mut seen = FxHashSet::default();
        let mut previous: Option<&Trip> = None;

        for trip in trips {
            if !seen.insert(trip.external_id()) {
                return Err(Inconsistency::DuplicateTrip(trip.external_id().to_owned()));
            }

            if trip.end() < trip.start() {
                return Err(Inconsistency::NegativeDuration(
                    trip.external_id().to_owned(),
                ));
            }

            if let Some(previous) = previous
                && trip.start() < previous.start()
            {
                return Err(Inconsistency::OutOfOrder {
                    trip: trip.external_id().to_owned(),
                    previous: previous.external_id().to_owned(),
                });
            }

            let mut cursor = trip.start();
            for (index, segment) in trip.sub_segments().iter().enumerate() {
                if segment.start < cursor || segment.end < segment.start || segment.end > trip.end()
                {
                    return Err(Inconsistency::MalformedSegment {
                        trip: trip.external_id().to_owned(),
                        segment: index,
                    });
                }
                cursor = segment.end;
            }

            previous = Some(trip);
        }

        Ok(())
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn trip(&self, index: TripIdx) -> &Trip {
        &self.trips[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = (TripIdx, &Trip)> {
        self.trips.iter().enumerate_idx()
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    pub fn period_start(&self) -> Option<Timestamp> {
        self.trips.first().map(|trip| trip.start())
    }

    pub fn period_end(&self) -> Option<Timestamp> {
        self.trips.iter().map(|trip| trip.end()).max()
    }

    /// Length of the observed period in days, never less than one day so that
    /// yearly extrapolation of a single day stays finite.
    pub fn period_days(&self) -> f64 {
        match (self.period_start(), self.period_end()) {
            (Some(start), Some(end)) => time::days(end.duration_since(start)).max(1.0),
            _ => 1.0,
        }
    }

    pub fn total_distance(&self) -> Kilometers {
        self.trips.iter().map(|trip| trip.distance()).sum()
    }

    /// The calendar day (in `time_zone`) whose trips, counted on their start
    /// day, add up to the highest distance. Ties go to the earliest day.
    pub fn peak_day(&self, time_zone: &TimeZone) -> Option<Date> {
        let mut distance_per_day: FxHashMap<Date, Kilometers> = FxHashMap::default();
        for trip in &self.trips {
            let day = time_zone.to_datetime(trip.start()).date();
            *distance_per_day.entry(day).or_default() += trip.distance();
        }

        distance_per_day
            .into_iter()
            .max_by(|(day_a, distance_a), (day_b, distance_b)| {
                distance_a.cmp(distance_b).then_with(|| day_b.cmp(day_a))
            })
            .map(|(day, _)| day)
    }

    /// Trips starting on the peak day, used as a fast proxy during search.
    pub fn peak_day_stream(&self, time_zone: &TimeZone) -> TripStream {
        let Some(peak_day) = self.peak_day(time_zone) else {
            return TripStream::default();
        };

        TripStream {
            trips: self
                .trips
                .iter()
                .filter(|trip| time_zone.to_datetime(trip.start()).date() == peak_day)
                .cloned()
                .collect(),
        }
    }

    /// Highest number of trips in progress at the same instant.
    pub fn max_concurrent_trips(&self) -> usize {
        let mut events: Vec<(Timestamp, i32)> = self
            .trips
            .iter()
            .flat_map(|trip| [(trip.start(), 1), (trip.end(), -1)])
            .collect();
        // Ends sort before starts at the same instant: touching trips do not overlap.
        events.sort();

        let mut current = 0;
        let mut maximum = 0;
        for (_, delta) in events {
            current += delta;
            maximum = maximum.max(current);
        }

        maximum as usize
    }

    pub fn longest_trip(&self) -> SignedDuration {
        self.trips
            .iter()
            .map(|trip| trip.duration())
            .max()
            .unwrap_or(SignedDuration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_trip, ts};

    #[test]
    fn test_rejects_out_of_order() {
        let trips = vec![
            create_trip("a", "2024-03-04T10:00:00Z", "2024-03-04T11:00:00Z", 10.0),
            create_trip("b", "2024-03-04T08:00:00Z", "2024-03-04T09:00:00Z", 10.0),
        ];

        assert_eq!(
            TripStream::new(trips).unwrap_err(),
            Inconsistency::OutOfOrder {
                trip: "b".to_owned(),
                previous: "a".to_owned()
            }
        );
    }

    #[test]
    fn test_sorted_orders_trips() {
        let trips = vec![
            create_trip("a", "2024-03-04T10:00:00Z", "2024-03-04T11:00:00Z", 10.0),
            create_trip("b", "2024-03-04T08:00:00Z", "2024-03-04T09:00:00Z", 10.0),
        ];

        let stream = TripStream::sorted(trips).unwrap();
        assert_eq!(stream.trips()[0].external_id(), "b");
        assert_eq!(stream.period_start(), Some(ts("2024-03-04T08:00:00Z")));
    }

    #[test]
    fn test_rejects_duplicates() {
        let trips = vec![
            create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T09:00:00Z", 10.0),
            create_trip("a", "2024-03-04T10:00:00Z", "2024-03-04T11:00:00Z", 10.0),
        ];

        assert_eq!(
            TripStream::new(trips).unwrap_err(),
            Inconsistency::DuplicateTrip("a".to_owned())
        );
    }

    #[test]
    fn test_peak_day() {
        let trips = vec![
            create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T09:00:00Z", 10.0),
            create_trip("b", "2024-03-05T08:00:00Z", "2024-03-05T09:00:00Z", 30.0),
            create_trip("c", "2024-03-05T10:00:00Z", "2024-03-05T11:00:00Z", 5.0),
            create_trip("d", "2024-03-06T08:00:00Z", "2024-03-06T09:00:00Z", 34.0),
        ];
        let stream = TripStream::new(trips).unwrap();

        let peak = stream.peak_day(&TimeZone::UTC).unwrap();
        assert_eq!(peak, jiff::civil::date(2024, 3, 5));

        let peak_stream = stream.peak_day_stream(&TimeZone::UTC);
        assert_eq!(peak_stream.len(), 2);
        assert!((stream.period_days() - (2.0 + 1.0 / 24.0)).abs() < 1e-9);
    }

    #[test]
    fn test_max_concurrent_trips() {
        let trips = vec![
            create_trip("a", "2024-03-04T08:00:00Z", "2024-03-04T10:00:00Z", 10.0),
            create_trip("b", "2024-03-04T09:00:00Z", "2024-03-04T11:00:00Z", 10.0),
            create_trip("c", "2024-03-04T10:00:00Z", "2024-03-04T12:00:00Z", 10.0),
        ];
        let stream = TripStream::new(trips).unwrap();

        assert_eq!(stream.max_concurrent_trips(), 2);
    }
}
