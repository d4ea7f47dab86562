use jiff::{SignedDuration, Timestamp, tz::TimeZone};
use serde::Serialize;
use smallvec::SmallVec;

use crate::{
    define_index_newtype,
    error::InputError,
    problem::{kilometers::Kilometers, kmh::Kmh},
};

define_index_newtype!(TripIdx, Trip);

/// A leg of a multi-day trip. Gaps between consecutive segments are the
/// places where an electric vehicle may recharge.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TripSegment {
    pub start: Timestamp,
    pub end: Timestamp,
    pub distance: Kilometers,
}

impl TripSegment {
    pub fn new(start: Timestamp, end: Timestamp, distance: Kilometers) -> Self {
        TripSegment {
            start,
            end,
            distance,
        }
    }
}

/// A historical trip, already aggregated from GPS logs upstream.
#[derive(Serialize, Debug, Clone)]
pub struct Trip {
    external_id: String,
    start: Timestamp,
    end: Timestamp,
    distance: Kilometers,
    speed: Option<Kmh>,
    is_multiday: bool,
    sub_segments: SmallVec<[TripSegment; 2]>,
    recorded_vehicle: Option<String>,
}

impl Trip {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn duration(&self) -> SignedDuration {
        self.end.duration_since(self.start)
    }

    pub fn distance(&self) -> Kilometers {
        self.distance
    }

    /// Recorded average speed, or distance over duration when none was recorded.
    pub fn average_speed(&self) -> Kmh {
        self.speed.unwrap_or_else(|| self.distance / self.duration())
    }

    pub fn is_multiday(&self) -> bool {
        self.is_multiday
    }

    pub fn sub_segments(&self) -> &[TripSegment] {
        &self.sub_segments
    }

    pub fn has_sub_segments(&self) -> bool {
        !self.sub_segments.is_empty()
    }

    /// The vehicle that historically drove this trip, used by replay.
    pub fn recorded_vehicle(&self) -> Option<&str> {
        self.recorded_vehicle.as_deref()
    }

    /// `[start, end)` overlap test. Trips that only touch do not overlap.
    pub fn overlaps(&self, other: &Trip) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Default)]
pub struct TripBuilder {
    external_id: Option<String>,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    distance: Option<Kilometers>,
    speed: Option<Kmh>,
    is_multiday: Option<bool>,
    sub_segments: Vec<TripSegment>,
    recorded_vehicle: Option<String>,
}

impl TripBuilder {
    pub fn set_external_id(&mut self, external_id: String) -> &mut TripBuilder {
        self.external_id = Some(external_id);
        self
    }

    pub fn set_start(&mut self, start: Timestamp) -> &mut TripBuilder {
        self.start = Some(start);
        self
    }

    pub fn set_end(&mut self, end: Timestamp) -> &mut TripBuilder {
        self.end = Some(end);
        self
    }

    pub fn set_distance(&mut self, distance: Kilometers) -> &mut TripBuilder {
        self.distance = Some(distance);
        self
    }

    pub fn set_speed(&mut self, speed: Kmh) -> &mut TripBuilder {
        self.speed = Some(speed);
        self
    }

    pub fn set_multiday(&mut self, is_multiday: bool) -> &mut TripBuilder {
        self.is_multiday = Some(is_multiday);
        self
    }

    pub fn add_sub_segment(&mut self, segment: TripSegment) -> &mut TripBuilder {
        self.sub_segments.push(segment);
        self
    }

    pub fn set_recorded_vehicle(&mut self, vehicle: String) -> &mut TripBuilder {
        self.recorded_vehicle = Some(vehicle);
        self
    }

    pub fn build(self) -> Result<Trip, InputError> {
        let external_id = self.external_id.ok_or(InputError::MissingField {
            entity: "trip",
            field: "id",
        })?;
        let start = self.start.ok_or(InputError::MissingField {
            entity: "trip",
            field: "start",
        })?;
        let end = self.end.ok_or(InputError::MissingField {
            entity: "trip",
            field: "end",
        })?;
        let distance = self.distance.ok_or(InputError::MissingField {
            entity: "trip",
            field: "distance",
        })?;

        if distance.is_negative() {
            return Err(InputError::NegativeValue {
                field: "distance",
                value: distance.value(),
            });
        }

        // Without an upstream flag a trip is multi-day when it ends on another
        // UTC calendar day than it started.
        let is_multiday = self.is_multiday.unwrap_or_else(|| {
            TimeZone::UTC.to_datetime(start).date() != TimeZone::UTC.to_datetime(end).date()
        });

        Ok(Trip {
            external_id,
            start,
            end,
            distance,
            speed: self.speed,
            is_multiday,
            sub_segments: SmallVec::from_vec(self.sub_segments),
            recorded_vehicle: self.recorded_vehicle,
        })
    }
}
