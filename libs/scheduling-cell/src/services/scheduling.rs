// libs/scheduling-cell/src/services/scheduling.rs
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{AppointmentBackend, WaitlistBackend};
use crate::error::SchedulingError;
use crate::models::{
    AppointmentDraft, AppointmentPayload, ConflictVerdict, DraftField, FieldMessage,
    SchedulingRules, SubmitReceipt, WaitlistEntry, WaitlistPriority, WaitlistRequest,
};
use crate::services::availability::{AvailabilityCheckService, SlotCheckRequest};
use crate::services::reconciler::{FieldEdit, ReconcileOutcome, TimeReconciler};

/// Conflict-check state of the session's current draft.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckState {
    /// No complete (provider, date, start, end) tuple yet.
    Idle,
    /// A check is pending or in flight for the current draft.
    Checking,
    /// The last check that completed for the current draft came back clean.
    Clean,
    /// The last check found the slot unbookable; submission is blocked until
    /// the time changes or the user takes the waitlist escape.
    Conflicted(ConflictVerdict),
}

/// Result of a submission attempt that reached a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted(SubmitReceipt),
    Blocked { messages: Vec<FieldMessage> },
}

/// Read-only view of the session for hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub draft: AppointmentDraft,
    pub check_state: CheckState,
    pub condition: Option<ReconcileOutcome>,
}

struct SessionState {
    draft: AppointmentDraft,
    check_state: CheckState,
    condition: Option<ReconcileOutcome>,
    /// Bumped on every slot-affecting edit; a scheduled check carries the
    /// generation it was born under and discards itself once it no longer
    /// matches. This stands in for hard timer cancellation.
    generation: u64,
}

/// Binds field edits to debounced availability checks and turns verdicts
/// into decisions: allow submission, block it, or offer the waitlist.
///
/// The session owns the draft exclusively. All methods take `&self` so a
/// host can race an in-flight debounced check against the user's next edit;
/// stale check results are discarded instead of flickering old verdicts in.
#[derive(Clone)]
pub struct SchedulingSession {
    checker: AvailabilityCheckService,
    appointments: Arc<dyn AppointmentBackend>,
    waitlist: Arc<dyn WaitlistBackend>,
    reconciler: TimeReconciler,
    rules: SchedulingRules,
    state: Arc<Mutex<SessionState>>,
}

impl SchedulingSession {
    pub fn new(
        checker: AvailabilityCheckService,
        appointments: Arc<dyn AppointmentBackend>,
        waitlist: Arc<dyn WaitlistBackend>,
        rules: SchedulingRules,
    ) -> Self {
        Self {
            checker,
            appointments,
            waitlist,
            reconciler: TimeReconciler::new(rules.clone()),
            rules,
            state: Arc::new(Mutex::new(SessionState {
                draft: AppointmentDraft::default(),
                check_state: CheckState::Idle,
                condition: None,
                generation: 0,
            })),
        }
    }

    /// Replace the draft wholesale, e.g. when loading an existing
    /// appointment into the form for editing.
    pub async fn load_draft(&self, draft: AppointmentDraft) {
        let mut state = self.state.lock().await;
        state.check_state = if draft.has_complete_slot() {
            CheckState::Checking
        } else {
            CheckState::Idle
        };
        state.draft = draft;
        state.condition = None;
        state.generation += 1;
    }

    /// Apply one field edit, reconciling the time triple and scheduling a
    /// fresh availability check when the edit touches the candidate slot.
    pub async fn apply_edit(&self, edit: FieldEdit) -> ReconcileOutcome {
        let mut state = self.state.lock().await;
        let outcome = self.reconciler.apply_edit(&mut state.draft, &edit);

        // Only time-triple edits install or clear the reconcile condition;
        // an unrelated edit must not wipe a pending "adjust manually" note.
        if matches!(
            edit,
            FieldEdit::Start(_) | FieldEdit::End(_) | FieldEdit::Duration(_)
        ) {
            state.condition = match &outcome {
                ReconcileOutcome::Applied => None,
                other => Some(other.clone()),
            };
        }

        if edit.affects_slot() {
            state.generation += 1;
            state.check_state = if state.draft.has_complete_slot() {
                CheckState::Checking
            } else {
                CheckState::Idle
            };
        }

        outcome
    }

    /// Run the debounced check scheduled by the most recent edit.
    ///
    /// Captures the draft and generation up front, waits out the debounce
    /// window, and re-validates the generation both after the wait and after
    /// the oracle round trip: a newer edit supersedes this check and its
    /// verdict is dropped silently.
    pub async fn run_pending_check(&self) -> CheckState {
        let (generation, request) = {
            let state = self.state.lock().await;
            if !state.draft.has_complete_slot() {
                return state.check_state.clone();
            }
            (state.generation, SlotCheckRequest::from_draft(&state.draft))
        };

        tokio::time::sleep(self.rules.debounce).await;

        {
            let state = self.state.lock().await;
            if state.generation != generation {
                debug!("debounced check superseded before it started");
                return state.check_state.clone();
            }
        }

        let verdict = self.checker.check(&request).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!("discarding stale availability verdict");
            return state.check_state.clone();
        }
        state.check_state = if verdict.is_available() {
            CheckState::Clean
        } else {
            CheckState::Conflicted(verdict)
        };
        state.check_state.clone()
    }

    /// Gate and hand off a submission.
    ///
    /// Validation failures and conflicts come back as `Blocked` with
    /// field-addressed messages; only a collaborator failure is an error,
    /// and it leaves the draft untouched for retry.
    pub async fn try_submit(&self, today: NaiveDate) -> Result<SubmitOutcome, SchedulingError> {
        let draft = self.state.lock().await.draft.clone();

        let mut messages = Vec::new();
        if draft.provider_id.is_none() {
            messages.push(FieldMessage::new(DraftField::Provider, "select a provider"));
        }
        if draft.patient_id.is_none() {
            messages.push(FieldMessage::new(DraftField::Patient, "select a patient"));
        }
        match draft.date {
            None => messages.push(FieldMessage::new(DraftField::Date, "select a date")),
            Some(date) if date < today => {
                messages.push(FieldMessage::new(
                    DraftField::Date,
                    "appointment date cannot be in the past",
                ));
            }
            Some(_) => {}
        }
        if draft.start.is_none() {
            messages.push(FieldMessage::new(DraftField::Start, "select a start time"));
        }
        if draft.end.is_none() {
            messages.push(FieldMessage::new(DraftField::End, "select an end time"));
        }
        if let (Some(start), Some(end)) = (draft.start, draft.end) {
            let implied = start.minutes_until(end);
            if implied <= 0 {
                messages.push(FieldMessage::new(
                    DraftField::End,
                    "end time must be after start time",
                ));
            } else if implied < self.rules.min_duration_minutes {
                messages.push(FieldMessage::new(
                    DraftField::Duration,
                    format!(
                        "appointments must be at least {} minutes long",
                        self.rules.min_duration_minutes
                    ),
                ));
            }
        }
        if !messages.is_empty() {
            return Ok(SubmitOutcome::Blocked { messages });
        }

        let (Some(provider_id), Some(patient_id), Some(date), Some(start), Some(end)) = (
            draft.provider_id,
            draft.patient_id,
            draft.date,
            draft.start,
            draft.end,
        ) else {
            // Unreachable: the required-field pass above already blocked.
            return Ok(SubmitOutcome::Blocked { messages });
        };

        // One fresh, non-debounced check right before handing off.
        let verdict = self
            .checker
            .check(&SlotCheckRequest::from_draft(&draft))
            .await;
        if !verdict.is_available() {
            warn!("submission blocked by availability verdict: {}", verdict);
            let text = verdict.to_string();
            let messages = vec![
                FieldMessage::new(DraftField::Start, text.clone()),
                FieldMessage::new(DraftField::End, text),
            ];
            self.state.lock().await.check_state = CheckState::Conflicted(verdict);
            return Ok(SubmitOutcome::Blocked { messages });
        }

        let payload = AppointmentPayload {
            provider_id,
            patient_id,
            appointment_type_id: draft.appointment_type_id,
            date,
            start_time: start,
            end_time: end,
            duration_minutes: start.minutes_until(end),
            notes: draft.notes.clone(),
        };

        let receipt = match draft.exclude_appointment_id {
            Some(id) => {
                self.appointments
                    .update_appointment(id, payload)
                    .await
                    .map_err(|e| SchedulingError::BookingFailed(e.to_string()))?;
                SubmitReceipt {
                    appointment_id: id,
                    was_update: true,
                }
            }
            None => {
                let id = self
                    .appointments
                    .create_appointment(payload)
                    .await
                    .map_err(|e| SchedulingError::BookingFailed(e.to_string()))?;
                SubmitReceipt {
                    appointment_id: id,
                    was_update: false,
                }
            }
        };

        info!(
            "appointment {} {} for provider {} on {}",
            receipt.appointment_id,
            if receipt.was_update { "updated" } else { "created" },
            provider_id,
            date
        );
        self.state.lock().await.check_state = CheckState::Clean;
        Ok(SubmitOutcome::Accepted(receipt))
    }

    /// Waitlist escape for a conflicted draft. Needs a patient and provider;
    /// the time fields travel along as preferences. Success resets the whole
    /// form, failure leaves the draft untouched for retry.
    pub async fn add_to_waitlist(
        &self,
        priority: WaitlistPriority,
    ) -> Result<WaitlistEntry, SchedulingError> {
        let request = {
            let state = self.state.lock().await;
            let draft = &state.draft;
            let (Some(patient_id), Some(provider_id)) = (draft.patient_id, draft.provider_id)
            else {
                return Err(SchedulingError::MissingWaitlistFields);
            };
            WaitlistRequest {
                patient_id,
                provider_id,
                appointment_type_id: draft.appointment_type_id,
                preferred_date: draft.date,
                preferred_time_start: draft.start,
                preferred_time_end: draft.end,
                priority,
                notes: draft.notes.clone(),
                chief_complaint: draft.chief_complaint.clone(),
            }
        };

        match self.waitlist.create_entry(request).await {
            Ok(entry) => {
                info!(
                    "waitlist entry {} created for patient {} with provider {}",
                    entry.id, entry.patient_id, entry.provider_id
                );
                self.reset().await;
                Ok(entry)
            }
            Err(e) => {
                warn!("waitlist entry creation failed: {}", e);
                Err(SchedulingError::WaitlistFailed(e.to_string()))
            }
        }
    }

    /// Explicitly dismiss a conflict verdict without changing the draft.
    pub async fn dismiss_verdict(&self) {
        let mut state = self.state.lock().await;
        if matches!(state.check_state, CheckState::Conflicted(_)) {
            state.check_state = CheckState::Idle;
        }
    }

    /// Explicit external reset: clears the draft, the provenance flags, and
    /// any pending condition, and invalidates in-flight checks.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.draft = AppointmentDraft::default();
        state.check_state = CheckState::Idle;
        state.condition = None;
        state.generation += 1;
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            draft: state.draft.clone(),
            check_state: state.check_state.clone(),
            condition: state.condition.clone(),
        }
    }
}
