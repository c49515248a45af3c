use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_backend::BackendError;
use shared_models::error::AppError;

/// Wire format of `slotDate`: zero-padded `DD/MM/YYYY`.
pub const SLOT_DATE_FORMAT: &str = "%d/%m/%Y";
/// Wire format of `slotTime`: `h:mm AM/PM` without a leading zero.
pub const SLOT_TIME_FORMAT: &str = "%-I:%M %p";

pub fn format_slot_date(date: NaiveDate) -> String {
    date.format(SLOT_DATE_FORMAT).to_string()
}

pub fn format_slot_time(time: NaiveTime) -> String {
    time.format(SLOT_TIME_FORMAT).to_string()
}

pub fn parse_slot_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), SLOT_DATE_FORMAT).ok()
}

/// Accepts `10:00 AM` as well as `10:00 am` and `01:30 PM`.
pub fn parse_slot_time(raw: &str) -> Option<NaiveTime> {
    let normalized = raw.trim().to_uppercase();
    NaiveTime::parse_from_str(&normalized, "%I:%M %p").ok()
}

/// Keys of a doctor's `slots_booked` map come as `DD/MM/YYYY` or `D_M_YYYY`.
pub fn parse_booked_date_key(raw: &str) -> Option<NaiveDate> {
    parse_slot_date(raw).or_else(|| NaiveDate::parse_from_str(raw.trim(), "%d_%m_%Y").ok())
}

// ==============================================================================
// DOCTOR DIRECTORY
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub speciality: Option<String>,
    #[serde(default)]
    pub fees: Option<f64>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub slots_booked: HashMap<String, Vec<String>>,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct DoctorListResponse {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
}

// ==============================================================================
// SLOT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub datetime: NaiveDateTime,
    pub time: String,
}

impl TimeSlot {
    pub fn at(datetime: NaiveDateTime) -> Self {
        Self {
            datetime,
            time: format_slot_time(datetime.time()),
        }
    }
}

/// Where the unavailable set for a day came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilitySource {
    Backend,
    Cache,
    Unknown,
}

/// Time strings already taken for one (doctor, date).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnavailableSlotSet(BTreeSet<String>);

impl UnavailableSlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership is checked on the canonical label so `"01:30 PM"` and
    /// `"1:30 PM"` are the same slot.
    pub fn contains(&self, time: &str) -> bool {
        self.0.contains(&canonical_time_label(time))
    }

    pub fn insert(&mut self, time: &str) {
        self.0.insert(canonical_time_label(time));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl<S: AsRef<str>> FromIterator<S> for UnavailableSlotSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for time in iter {
            set.insert(time.as_ref());
        }
        set
    }
}

fn canonical_time_label(raw: &str) -> String {
    match parse_slot_time(raw) {
        Some(time) => format_slot_time(time),
        None => raw.trim().to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlotAvailabilityResponse {
    #[serde(default, rename = "unavailableSlots", alias = "bookedSlots", alias = "slots")]
    pub unavailable_slots: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlotList {
    pub date: NaiveDate,
    /// `date` in wire format, used as `slotDate` when booking.
    pub slot_date: String,
    pub availability: AvailabilitySource,
    pub slots: Vec<TimeSlot>,
}

impl DaySlotList {
    pub fn is_fully_booked(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn find(&self, time: &str) -> Option<&TimeSlot> {
        let label = canonical_time_label(time);
        self.slots.iter().find(|slot| slot.time == label)
    }
}

/// Rolling window of bookable days for one doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotWindow {
    pub doctor_id: String,
    pub start_date: NaiveDate,
    pub generated_at: NaiveDateTime,
    pub days: Vec<DaySlotList>,
}

impl SlotWindow {
    /// Same doctor and same bookable slots; `generated_at` is ignored.
    pub fn same_slots(&self, other: &SlotWindow) -> bool {
        self.doctor_id == other.doctor_id
            && self.start_date == other.start_date
            && self.days == other.days
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DaySlotList> {
        self.days.iter().find(|day| day.date == date)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotWindowQuery {
    /// First day of the window, `YYYY-MM-DD`. Defaults to today.
    pub from: Option<NaiveDate>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Doctor id is required")]
    MissingDoctorId,

    #[error("Window start {from} is beyond the booking horizon {horizon}")]
    OutOfRange { from: NaiveDate, horizon: NaiveDate },

    #[error("Could not load doctors: {0}")]
    Directory(#[from] BackendError),
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::MissingDoctorId | SlotError::OutOfRange { .. } => {
                AppError::BadRequest(err.to_string())
            }
            SlotError::Directory(inner) => inner.into(),
        }
    }
}
