// libs/scheduling-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

pub const MINUTES_PER_DAY: i32 = 24 * 60;

// ==============================================================================
// TIME OF DAY
// ==============================================================================

/// Wall-clock time as whole minutes since midnight.
///
/// Every external time value (form input, oracle response) is normalized to
/// this representation at the boundary; the serde form is the `HH:mm` string
/// used by the REST contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    pub fn from_minutes(minutes: i32) -> Option<Self> {
        if (0..MINUTES_PER_DAY).contains(&minutes) {
            Some(Self { minutes: minutes as u16 })
        } else {
            None
        }
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        Some(Self::from_naive(time))
    }

    pub fn from_naive(time: NaiveTime) -> Self {
        // Seconds are dropped; the scheduling grid is minute-resolution.
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }

    pub fn minute_of_day(&self) -> i32 {
        self.minutes as i32
    }

    /// Add minutes, refusing to cross midnight in either direction.
    pub fn checked_add_minutes(&self, minutes: i32) -> Option<Self> {
        Self::from_minutes(self.minute_of_day() + minutes)
    }

    pub fn checked_sub_minutes(&self, minutes: i32) -> Option<Self> {
        Self::from_minutes(self.minute_of_day() - minutes)
    }

    /// Signed span from `self` to `other`, in minutes.
    pub fn minutes_until(&self, other: TimeOfDay) -> i32 {
        other.minute_of_day() - self.minute_of_day()
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(Self::from_naive)
            .map_err(|e| format!("invalid time of day '{}': {}", s, e))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

// ==============================================================================
// DRAFT STATE
// ==============================================================================

/// The mutable appointment being assembled by a form session.
///
/// The session owns the draft exclusively; the reconciler and checker only
/// read it or propose changes through the session. The provenance flags
/// record which time fields a human touched last and are cleared only by an
/// explicit reset, never by automatic recalculation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentDraft {
    pub provider_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub appointment_type_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub start: Option<TimeOfDay>,
    pub end: Option<TimeOfDay>,
    pub duration_minutes: i32,
    pub start_manually_set: bool,
    pub end_manually_set: bool,
    /// Set when editing an existing appointment so its own slot does not
    /// conflict with itself.
    pub exclude_appointment_id: Option<Uuid>,
    pub notes: Option<String>,
    pub chief_complaint: Option<String>,
}

impl AppointmentDraft {
    /// True once every field needed for a conflict check is present.
    pub fn has_complete_slot(&self) -> bool {
        self.provider_id.is_some()
            && self.date.is_some()
            && self.start.is_some()
            && self.end.is_some()
    }
}

/// Form fields addressable by validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    Provider,
    Patient,
    Date,
    Start,
    End,
    Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMessage {
    pub field: DraftField,
    pub message: String,
}

impl FieldMessage {
    pub fn new(field: DraftField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

// ==============================================================================
// CONFLICT VERDICTS
// ==============================================================================

/// Half-open booked interval reported back to the user on overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

/// Outcome of a single availability check. Created fresh on every check,
/// superseded by the next one, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictVerdict {
    Available,
    NoSlotsForDay,
    SlotNotOffered,
    DailyLimitReached { max: u32 },
    Overlaps { appointments: Vec<TimeSpan> },
    CheckFailed { reason: String },
}

impl ConflictVerdict {
    pub fn is_available(&self) -> bool {
        matches!(self, ConflictVerdict::Available)
    }
}

impl fmt::Display for ConflictVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictVerdict::Available => write!(f, "time slot is available"),
            ConflictVerdict::NoSlotsForDay => {
                write!(f, "no open slots remain on the selected day")
            }
            ConflictVerdict::SlotNotOffered => {
                write!(f, "the selected start time is not an open slot for this provider")
            }
            ConflictVerdict::DailyLimitReached { max } => {
                write!(f, "provider has reached the daily appointment limit of {}", max)
            }
            ConflictVerdict::Overlaps { appointments } => {
                write!(f, "time slot overlaps existing appointments:")?;
                for span in appointments {
                    write!(f, " [{} - {})", span.start, span.end)?;
                }
                Ok(())
            }
            ConflictVerdict::CheckFailed { reason } => write!(f, "{}", reason),
        }
    }
}

// ==============================================================================
// ORACLE DTOS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Cancelled and no-show bookings free their slot and do not count
    /// toward the provider's daily limit.
    pub fn counts_against_schedule(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// One booked appointment as returned by the booking oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedAppointment {
    pub id: Uuid,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: AppointmentStatus,
}

impl BookedAppointment {
    pub fn span(&self) -> TimeSpan {
        TimeSpan {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotsResponse {
    pub available_slots: Vec<TimeOfDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub provider_id: Uuid,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl AppointmentListQuery {
    pub fn for_day(provider_id: Uuid, date: NaiveDate) -> Self {
        Self {
            provider_id,
            date_from: date,
            date_to: date,
            page: None,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListResponse {
    pub appointments: Vec<BookedAppointment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLimits {
    pub max_daily_appointments: Option<u32>,
}

// ==============================================================================
// SUBMIT / WAITLIST PAYLOADS
// ==============================================================================

/// Normalized payload handed to the appointment store: the date serializes
/// as `YYYY-MM-DD`, times as `HH:mm`, duration as whole minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPayload {
    pub provider_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_type_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistRequest {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub appointment_type_id: Option<Uuid>,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time_start: Option<TimeOfDay>,
    pub preferred_time_end: Option<TimeOfDay>,
    pub priority: WaitlistPriority,
    pub notes: Option<String>,
    pub chief_complaint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub priority: WaitlistPriority,
}

/// Receipt for an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub appointment_id: Uuid,
    pub was_update: bool,
}

// ==============================================================================
// SCHEDULING RULES
// ==============================================================================

/// Tunable policy for slot validation and check scheduling. The defaults are
/// the reference behavior; hosts override per deployment.
#[derive(Debug, Clone)]
pub struct SchedulingRules {
    /// Shortest bookable appointment; shorter implied durations are rejected.
    pub min_duration_minutes: i32,
    /// Duration assumed when neither a hint nor a usable start/end span exists.
    pub fallback_duration_minutes: i32,
    /// Trailing debounce window between a field edit and its availability check.
    pub debounce: Duration,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            min_duration_minutes: 5,
            fallback_duration_minutes: 30,
            debounce: Duration::from_millis(500),
        }
    }
}
