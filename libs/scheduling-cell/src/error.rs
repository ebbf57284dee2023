use thiserror::Error;

/// Failures that escape the scheduling core.
///
/// User-correctable problems (incomplete input, validation, slot conflicts)
/// are surfaced as data — `SubmitOutcome::Blocked` and `ConflictVerdict` —
/// so only collaborator failures and outright misuse land here.
#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("booking request failed: {0}")]
    BookingFailed(String),

    #[error("waitlist request failed: {0}")]
    WaitlistFailed(String),

    #[error("a patient and provider are required to join the waitlist")]
    MissingWaitlistFields,
}
