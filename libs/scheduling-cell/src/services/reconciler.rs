// libs/scheduling-cell/src/services/reconciler.rs
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{AppointmentDraft, SchedulingRules, TimeOfDay};

/// A single form-field edit, normalized at the input boundary.
///
/// `None` payloads model a cleared field; the reconciler stays total across
/// every partial state the form can reach.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Provider(Option<Uuid>),
    Patient(Option<Uuid>),
    Date(Option<NaiveDate>),
    Start(Option<TimeOfDay>),
    End(Option<TimeOfDay>),
    Duration(i32),
    AppointmentType {
        id: Option<Uuid>,
        default_duration_minutes: Option<i32>,
    },
}

impl FieldEdit {
    /// Edits that change the candidate slot and therefore supersede any
    /// pending or in-flight availability check.
    pub fn affects_slot(&self) -> bool {
        !matches!(self, FieldEdit::Patient(_))
    }
}

/// What a reconciliation pass did with the edit.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The edit was applied; dependent fields were recomputed where possible.
    Applied,
    /// Start and end are both human-set and now imply a duration below the
    /// minimum; the times were kept and the stored duration left untouched.
    ImpliedDurationTooShort { implied_minutes: i32 },
    /// Duration was edited while both start and end are human-set; neither
    /// time was recomputed and the user must adjust them directly.
    AdjustTimesManually,
}

/// Keeps `start`, `end` and `duration_minutes` mutually consistent after any
/// single-field edit, without ever overwriting a field the human set unless
/// the human edits it directly.
#[derive(Clone)]
pub struct TimeReconciler {
    rules: SchedulingRules,
}

impl TimeReconciler {
    pub fn new(rules: SchedulingRules) -> Self {
        Self { rules }
    }

    /// `start + duration`, refusing durations below the minimum and results
    /// that would cross midnight.
    pub fn derive_end_from_start(
        &self,
        start: TimeOfDay,
        duration_minutes: i32,
    ) -> Option<TimeOfDay> {
        if duration_minutes < self.rules.min_duration_minutes {
            return None;
        }
        start.checked_add_minutes(duration_minutes)
    }

    /// `end - duration`, symmetric with [`Self::derive_end_from_start`].
    pub fn derive_start_from_end(
        &self,
        end: TimeOfDay,
        duration_minutes: i32,
    ) -> Option<TimeOfDay> {
        if duration_minutes < self.rules.min_duration_minutes {
            return None;
        }
        end.checked_sub_minutes(duration_minutes)
    }

    /// `end - start` in minutes; `None` when the span is not positive.
    pub fn derive_duration(&self, start: TimeOfDay, end: TimeOfDay) -> Option<i32> {
        let minutes = start.minutes_until(end);
        (minutes > 0).then_some(minutes)
    }

    /// Apply one field edit to the draft.
    ///
    /// Editing `start` or `end` always records the typed value and marks the
    /// field as human-set; only the implied recomputation can be rejected.
    pub fn apply_edit(&self, draft: &mut AppointmentDraft, edit: &FieldEdit) -> ReconcileOutcome {
        match edit {
            FieldEdit::Provider(id) => {
                draft.provider_id = *id;
                ReconcileOutcome::Applied
            }
            FieldEdit::Patient(id) => {
                draft.patient_id = *id;
                ReconcileOutcome::Applied
            }
            FieldEdit::Date(date) => {
                draft.date = *date;
                ReconcileOutcome::Applied
            }
            FieldEdit::Start(value) => {
                draft.start = *value;
                draft.start_manually_set = true;
                let end = draft.end;
                match *value {
                    Some(start) => self.reconcile_after_time_edit(draft, start, end, true),
                    None => ReconcileOutcome::Applied,
                }
            }
            FieldEdit::End(value) => {
                draft.end = *value;
                draft.end_manually_set = true;
                let start = draft.start;
                match *value {
                    Some(end) => self.reconcile_after_time_edit(draft, end, start, false),
                    None => ReconcileOutcome::Applied,
                }
            }
            FieldEdit::Duration(minutes) => {
                draft.duration_minutes = *minutes;
                if draft.start_manually_set && draft.end_manually_set {
                    return ReconcileOutcome::AdjustTimesManually;
                }
                if draft.end_manually_set {
                    if let Some(end) = draft.end {
                        if let Some(start) = self.derive_start_from_end(end, *minutes) {
                            draft.start = Some(start);
                        }
                    }
                } else if let Some(start) = draft.start {
                    if let Some(end) = self.derive_end_from_start(start, *minutes) {
                        draft.end = Some(end);
                    }
                }
                ReconcileOutcome::Applied
            }
            FieldEdit::AppointmentType {
                id,
                default_duration_minutes,
            } => {
                draft.appointment_type_id = *id;
                self.apply_type_default(draft, *default_duration_minutes);
                ReconcileOutcome::Applied
            }
        }
    }

    /// Shared tail for start/end edits. `edited` is the value just typed,
    /// `other` the opposite time field, `edited_is_start` which one moved.
    fn reconcile_after_time_edit(
        &self,
        draft: &mut AppointmentDraft,
        edited: TimeOfDay,
        other: Option<TimeOfDay>,
        edited_is_start: bool,
    ) -> ReconcileOutcome {
        let other_manual = if edited_is_start {
            draft.end_manually_set
        } else {
            draft.start_manually_set
        };

        if other_manual {
            // Both ends of the interval are human-set: the duration follows.
            let Some(other) = other else {
                return ReconcileOutcome::Applied;
            };
            let (start, end) = if edited_is_start {
                (edited, other)
            } else {
                (other, edited)
            };
            let implied = start.minutes_until(end);
            if implied >= self.rules.min_duration_minutes {
                draft.duration_minutes = implied;
                ReconcileOutcome::Applied
            } else {
                ReconcileOutcome::ImpliedDurationTooShort {
                    implied_minutes: implied,
                }
            }
        } else {
            // The opposite field is derived: recompute it from the duration.
            if draft.duration_minutes >= self.rules.min_duration_minutes {
                if edited_is_start {
                    if let Some(end) = self.derive_end_from_start(edited, draft.duration_minutes) {
                        draft.end = Some(end);
                    }
                } else if let Some(start) =
                    self.derive_start_from_end(edited, draft.duration_minutes)
                {
                    draft.start = Some(start);
                }
            }
            ReconcileOutcome::Applied
        }
    }

    /// Selecting an appointment type with a default duration fills the
    /// duration only when none is set, then derives the end when it is safe
    /// to do so. An already-set duration is never overridden.
    fn apply_type_default(&self, draft: &mut AppointmentDraft, default_duration: Option<i32>) {
        let Some(default) = default_duration else {
            return;
        };
        if default <= 0 || draft.duration_minutes > 0 {
            return;
        }
        draft.duration_minutes = default;
        if !draft.end_manually_set {
            if let Some(start) = draft.start {
                if let Some(end) = self.derive_end_from_start(start, default) {
                    draft.end = Some(end);
                }
            }
        }
    }
}
