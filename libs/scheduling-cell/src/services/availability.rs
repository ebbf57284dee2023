// libs/scheduling-cell/src/services/availability.rs
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::{AppointmentBackend, AvailabilityBackend, ProviderBackend};
use crate::models::{
    AppointmentDraft, AppointmentListQuery, ConflictVerdict, SchedulingRules, TimeOfDay,
};

/// Candidate slot to validate. Built from a draft snapshot so an in-flight
/// check never observes later edits.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCheckRequest {
    pub provider_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub start: Option<TimeOfDay>,
    pub end: Option<TimeOfDay>,
    pub exclude_appointment_id: Option<Uuid>,
    pub duration_hint_minutes: Option<i32>,
}

impl SlotCheckRequest {
    pub fn from_draft(draft: &AppointmentDraft) -> Self {
        Self {
            provider_id: draft.provider_id,
            date: draft.date,
            start: draft.start,
            end: draft.end,
            exclude_appointment_id: draft.exclude_appointment_id,
            duration_hint_minutes: (draft.duration_minutes > 0).then_some(draft.duration_minutes),
        }
    }
}

/// Answers "is this (provider, date, start, end) combination bookable?" by
/// combining two independent backend signals.
///
/// The slot oracle is fast and policy-aware (working hours, server-side slot
/// grid) but may be stale or unavailable; the booking oracle is the detailed
/// cross-check with client-side overlap math. Neither failing may ever block
/// the user: the backend re-validates at submission and is the authority.
#[derive(Clone)]
pub struct AvailabilityCheckService {
    availability: Arc<dyn AvailabilityBackend>,
    appointments: Arc<dyn AppointmentBackend>,
    providers: Arc<dyn ProviderBackend>,
    rules: SchedulingRules,
}

impl AvailabilityCheckService {
    pub fn new(
        availability: Arc<dyn AvailabilityBackend>,
        appointments: Arc<dyn AppointmentBackend>,
        providers: Arc<dyn ProviderBackend>,
        rules: SchedulingRules,
    ) -> Self {
        Self {
            availability,
            appointments,
            providers,
            rules,
        }
    }

    /// Run the full check. Infallible: incomplete input and oracle outages
    /// both resolve to a verdict rather than an error.
    pub async fn check(&self, request: &SlotCheckRequest) -> ConflictVerdict {
        // Nothing to check until the whole tuple is known.
        let (Some(provider_id), Some(date), Some(start), Some(end)) =
            (request.provider_id, request.date, request.start, request.end)
        else {
            return ConflictVerdict::Available;
        };

        let span_minutes = start.minutes_until(end);
        let effective_duration = request
            .duration_hint_minutes
            .filter(|d| *d > 0)
            .or_else(|| (span_minutes > 0).then_some(span_minutes))
            .unwrap_or(self.rules.fallback_duration_minutes);

        if span_minutes <= 0 {
            // Fail fast before any network round trip.
            return ConflictVerdict::CheckFailed {
                reason: "end time must be after start time".to_string(),
            };
        }

        debug!(
            "checking slot for provider {} on {} [{} - {}), duration {}",
            provider_id, date, start, end, effective_duration
        );

        if let Some(verdict) = self
            .check_offered_slots(provider_id, date, start, effective_duration)
            .await
        {
            return verdict;
        }

        self.cross_check_bookings(provider_id, date, start, end, request.exclude_appointment_id)
            .await
    }

    /// Fast path against the slot oracle. Returns a verdict only when the
    /// oracle answered and ruled the slot out; oracle failure falls through
    /// to the booking cross-check.
    async fn check_offered_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        start: TimeOfDay,
        duration_minutes: i32,
    ) -> Option<ConflictVerdict> {
        match self
            .availability
            .available_slots(provider_id, date, duration_minutes)
            .await
        {
            Ok(response) => {
                if response.available_slots.is_empty() {
                    return Some(ConflictVerdict::NoSlotsForDay);
                }
                if !response.available_slots.contains(&start) {
                    return Some(ConflictVerdict::SlotNotOffered);
                }
                None
            }
            Err(e) => {
                warn!("slot oracle unavailable, deferring to booking cross-check: {}", e);
                None
            }
        }
    }

    /// Ground-truth pass over the day's bookings: daily limit first, then
    /// half-open interval overlap. Oracle failure resolves to `Available` so
    /// a dead convenience check can never block submission.
    async fn cross_check_bookings(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
        exclude_appointment_id: Option<Uuid>,
    ) -> ConflictVerdict {
        let booked = match self
            .appointments
            .list_appointments(AppointmentListQuery::for_day(provider_id, date))
            .await
        {
            Ok(response) => response.appointments,
            Err(e) => {
                warn!("booking oracle unavailable, treating slot as bookable: {}", e);
                return ConflictVerdict::Available;
            }
        };

        let active: Vec<_> = booked
            .into_iter()
            .filter(|apt| Some(apt.id) != exclude_appointment_id)
            .filter(|apt| apt.status.counts_against_schedule())
            .collect();

        if let Some(max) = self.daily_limit(provider_id).await {
            if active.len() as u32 >= max {
                warn!(
                    "provider {} at daily limit ({}) on {}",
                    provider_id, max, date
                );
                return ConflictVerdict::DailyLimitReached { max };
            }
        }

        // Half-open intervals: touching endpoints do not conflict.
        let overlapping: Vec<_> = active
            .iter()
            .filter(|apt| end > apt.start_time && start < apt.end_time)
            .map(|apt| apt.span())
            .collect();

        if !overlapping.is_empty() {
            warn!(
                "candidate [{} - {}) overlaps {} existing appointment(s) for provider {}",
                start,
                end,
                overlapping.len(),
                provider_id
            );
            return ConflictVerdict::Overlaps {
                appointments: overlapping,
            };
        }

        ConflictVerdict::Available
    }

    /// Provider's configured daily cap, if any. Lookup failure degrades to
    /// "no limit" so the rest of the cross-check still runs.
    async fn daily_limit(&self, provider_id: Uuid) -> Option<u32> {
        match self.providers.provider_limits(provider_id).await {
            Ok(limits) => limits.max_daily_appointments,
            Err(e) => {
                warn!("provider limit lookup failed, skipping daily cap: {}", e);
                None
            }
        }
    }
}
