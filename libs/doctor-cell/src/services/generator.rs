use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use shared_config::SlotPolicy;

use crate::models::{format_slot_date, AvailabilitySource, DaySlotList, TimeSlot, UnavailableSlotSet};

/// Pure slot arithmetic: given a day, the current time and the taken slots,
/// decide which slots can still be booked.
#[derive(Debug, Clone)]
pub struct SlotGenerator {
    policy: SlotPolicy,
}

impl SlotGenerator {
    pub fn new(policy: SlotPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SlotPolicy {
        &self.policy
    }

    fn step(&self) -> Duration {
        Duration::minutes(i64::from(self.policy.slot_minutes))
    }

    fn opening(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.policy.open_hour))
    }

    fn closing(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.policy.close_hour))
    }

    /// First slot start for `date`, or `None` when the day is already over.
    ///
    /// Today starts at the next slot boundary at or after `now`, but never
    /// before opening. Later days start at opening.
    pub fn first_slot_start(&self, date: NaiveDate, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let today = now.date();

        if date < today {
            return None;
        }

        let opening = self.opening(date);
        let start = if date == today {
            self.round_up_to_boundary(now).max(opening)
        } else {
            opening
        };

        (start < self.closing(date)).then_some(start)
    }

    /// Rounds up to the next multiple of the slot length since midnight.
    pub fn round_up_to_boundary(&self, instant: NaiveDateTime) -> NaiveDateTime {
        let step_secs = i64::from(self.policy.slot_minutes) * 60;
        let time = instant.time();
        let mut secs = i64::from(time.num_seconds_from_midnight());
        if time.nanosecond() > 0 {
            secs += 1;
        }

        let rounded = (secs + step_secs - 1) / step_secs * step_secs;
        instant.date().and_time(NaiveTime::MIN) + Duration::seconds(rounded)
    }

    /// Bookable slots for one day. A slot is emitted when it starts before
    /// closing and its label is not in `unavailable`.
    pub fn day_slots(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
        unavailable: &UnavailableSlotSet,
        availability: AvailabilitySource,
    ) -> DaySlotList {
        let mut slots = Vec::new();

        if let Some(start) = self.first_slot_start(date, now) {
            let closing = self.closing(date);
            let step = self.step();
            let mut current = start;

            while current < closing {
                let slot = TimeSlot::at(current);
                if !unavailable.contains(&slot.time) {
                    slots.push(slot);
                }
                current += step;
            }
        }

        DaySlotList {
            date,
            slot_date: format_slot_date(date),
            availability,
            slots,
        }
    }

    /// Dates covered by a window starting at `start`.
    pub fn window_dates(&self, start: NaiveDate) -> Vec<NaiveDate> {
        (0..self.policy.window_days)
            .filter_map(|offset| start.checked_add_signed(Duration::days(i64::from(offset))))
            .collect()
    }
}
