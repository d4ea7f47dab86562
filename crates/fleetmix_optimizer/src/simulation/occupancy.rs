use fixedbitset::FixedBitSet;
use jiff::{SignedDuration, Timestamp};

use crate::simulation::config::BookingMode;

/// Half-open `[start, end)`.
pub type Interval = (Timestamp, Timestamp);

/// Booked time of one vehicle.
#[derive(Debug, Clone)]
pub enum Occupancy {
    /// Busy until the given instant, free from then on.
    FreeAt(Option<Timestamp>),
    TimeSlots(SlotOccupancy),
}

impl Occupancy {
    pub fn new(mode: BookingMode, origin: Timestamp, horizon: Timestamp) -> Self {
        match mode {
            BookingMode::FreeAt => Occupancy::FreeAt(None),
            BookingMode::TimeSlots { slot } => {
                Occupancy::TimeSlots(SlotOccupancy::new(origin, horizon, slot))
            }
        }
    }

    pub fn is_free(&self, start: Timestamp, end: Timestamp) -> bool {
        match self {
            Occupancy::FreeAt(free_at) => free_at.is_none_or(|free_at| free_at <= start),
            Occupancy::TimeSlots(slots) => slots.is_free(start, end),
        }
    }

    /// Whether booking `booked` keeps the later interval `next` bookable.
    pub fn leaves_free(&self, booked: Interval, next: Interval) -> bool {
        match self {
            Occupancy::FreeAt(_) => booked.1 <= next.0,
            Occupancy::TimeSlots(slots) => slots.leaves_free(booked, next),
        }
    }

    pub fn book(&mut self, start: Timestamp, end: Timestamp) {
        match self {
            Occupancy::FreeAt(free_at) => {
                *free_at = Some(free_at.map_or(end, |free_at| free_at.max(end)));
            }
            Occupancy::TimeSlots(slots) => slots.book(start, end),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlotOccupancy {
    origin: Timestamp,
    slot_seconds: i64,
    slots: FixedBitSet,
}

impl SlotOccupancy {
    pub fn new(origin: Timestamp, horizon: Timestamp, slot: SignedDuration) -> Self {
        let slot_seconds = slot.as_secs().max(1);
        let horizon_seconds = horizon.duration_since(origin).as_secs().max(0);
        let len = (horizon_seconds / slot_seconds + 1) as usize;

        SlotOccupancy {
            origin,
            slot_seconds,
            slots: FixedBitSet::with_capacity(len),
        }
    }

    /// Slots covered by `[start, end)`: from the slot containing `start` up to
    /// the slot boundary at or after `end`, always at least one slot.
    fn slot_range(&self, start: Timestamp, end: Timestamp) -> (usize, usize) {
        let from = start.duration_since(self.origin).as_secs().max(0);
        let to = end.duration_since(self.origin).as_secs().max(from);

        let first = from / self.slot_seconds;
        let last = (to + self.slot_seconds - 1) / self.slot_seconds;

        (first as usize, (last as usize).max(first as usize + 1))
    }

    pub fn is_free(&self, start: Timestamp, end: Timestamp) -> bool {
        let (first, last) = self.slot_range(start, end);
        let last = last.min(self.slots.len());
        if first >= last {
            return true;
        }

        self.slots.count_ones(first..last) == 0
    }

    fn leaves_free(&self, (start, end): Interval, (next_start, next_end): Interval) -> bool {
        let (_, last) = self.slot_range(start, end);
        let (first, _) = self.slot_range(next_start, next_end);
        last <= first
    }

    pub fn book(&mut self, start: Timestamp, end: Timestamp) {
        let (first, last) = self.slot_range(start, end);
        if last > self.slots.len() {
            self.slots.grow(last);
        }
        self.slots.insert_range(first..last);
    }

    pub fn booked_slots(&self) -> usize {
        self.slots.count_ones(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ts;

    #[test]
    fn test_free_at() {
        let mut occupancy = Occupancy::new(
            BookingMode::FreeAt,
            ts("2024-03-04T00:00:00Z"),
            ts("2024-03-05T00:00:00Z"),
        );

        assert!(occupancy.is_free(ts("2024-03-04T08:00:00Z"), ts("2024-03-04T09:00:00Z")));
        occupancy.book(ts("2024-03-04T08:00:00Z"), ts("2024-03-04T09:00:00Z"));

        assert!(!occupancy.is_free(ts("2024-03-04T08:30:00Z"), ts("2024-03-04T09:30:00Z")));
        assert!(occupancy.is_free(ts("2024-03-04T09:00:00Z"), ts("2024-03-04T10:00:00Z")));
    }

    #[test]
    fn test_time_slots() {
        let mut occupancy = Occupancy::new(
            BookingMode::TimeSlots {
                slot: SignedDuration::from_mins(15),
            },
            ts("2024-03-04T00:00:00Z"),
            ts("2024-03-05T00:00:00Z"),
        );

        occupancy.book(ts("2024-03-04T08:00:00Z"), ts("2024-03-04T09:00:00Z"));

        assert!(occupancy.is_free(ts("2024-03-04T07:00:00Z"), ts("2024-03-04T08:00:00Z")));
        assert!(!occupancy.is_free(ts("2024-03-04T08:50:00Z"), ts("2024-03-04T09:30:00Z")));
        assert!(occupancy.is_free(ts("2024-03-04T09:00:00Z"), ts("2024-03-04T09:30:00Z")));

        // Slots reach up to the next boundary after the end.
        occupancy.book(ts("2024-03-04T10:00:00Z"), ts("2024-03-04T10:05:00Z"));
        assert!(!occupancy.is_free(ts("2024-03-04T10:10:00Z"), ts("2024-03-04T10:20:00Z")));
    }

    #[test]
    fn test_slots_grow_past_horizon() {
        let mut slots = SlotOccupancy::new(
            ts("2024-03-04T00:00:00Z"),
            ts("2024-03-04T01:00:00Z"),
            SignedDuration::from_mins(30),
        );

        slots.book(ts("2024-03-04T02:00:00Z"), ts("2024-03-04T03:00:00Z"));
        assert_eq!(slots.booked_slots(), 2);
        assert!(!slots.is_free(ts("2024-03-04T02:10:00Z"), ts("2024-03-04T02:20:00Z")));
    }

    #[test]
    fn test_leaves_free_for_a_later_booking() {
        let origin = ts("2024-03-04T00:00:00Z");
        let horizon = ts("2024-03-05T00:00:00Z");
        let free_at = Occupancy::new(BookingMode::FreeAt, origin, horizon);
        let slots = Occupancy::new(
            BookingMode::TimeSlots {
                slot: SignedDuration::from_mins(15),
            },
            origin,
            horizon,
        );

        let booked = (ts("2024-03-04T08:00:00Z"), ts("2024-03-04T08:20:00Z"));
        let next = (ts("2024-03-04T08:25:00Z"), ts("2024-03-04T09:00:00Z"));
        assert!(free_at.leaves_free(booked, next));
        // 08:20 rounds up to the 08:30 boundary, the slot of 08:25 is taken.
        assert!(!slots.leaves_free(booked, next));

        let next = (ts("2024-03-04T08:30:00Z"), ts("2024-03-04T09:00:00Z"));
        assert!(slots.leaves_free(booked, next));

        let next = (ts("2024-03-04T08:10:00Z"), ts("2024-03-04T09:00:00Z"));
        assert!(!free_at.leaves_free(booked, next));
    }
}
