//! Appointment slot reconciliation and conflict resolution.
//!
//! A UI-free core for the appointment form of a practice management system:
//! [`services::reconciler::TimeReconciler`] keeps the start/end/duration
//! triple consistent across edits, [`services::availability::AvailabilityCheckService`]
//! validates a candidate slot against the backend's slot and booking
//! oracles, and [`services::scheduling::SchedulingSession`] wires the two
//! to debounced field edits, the submission gate, and the waitlist escape.

pub mod backend;
pub mod error;
pub mod models;
pub mod services;

pub use backend::*;
pub use error::*;
pub use models::*;
pub use services::*;
