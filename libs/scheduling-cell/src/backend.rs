//! Injected backend contracts.
//!
//! The core never talks to a transport directly; hosts hand it
//! implementations of these traits at construction time. All of them are
//! read-only from the core's perspective except the appointment store and
//! the waitlist, and every result the core acts on is re-validated
//! server-side at submission.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    AppointmentListQuery, AppointmentListResponse, AppointmentPayload, AvailableSlotsResponse,
    ProviderLimits, WaitlistEntry, WaitlistRequest,
};

/// Slot oracle: working-hours-aware open slots for a provider on a day,
/// computed server-side for the given appointment length.
#[async_trait]
pub trait AvailabilityBackend: Send + Sync {
    async fn available_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        duration_minutes: i32,
    ) -> Result<AvailableSlotsResponse>;
}

/// Booking oracle plus the create/update calls a submission hands off to.
#[async_trait]
pub trait AppointmentBackend: Send + Sync {
    async fn list_appointments(&self, query: AppointmentListQuery)
        -> Result<AppointmentListResponse>;

    async fn create_appointment(&self, payload: AppointmentPayload) -> Result<Uuid>;

    async fn update_appointment(&self, id: Uuid, payload: AppointmentPayload) -> Result<()>;
}

/// Provider lookup for scheduling policy attached to the provider record.
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    async fn provider_limits(&self, provider_id: Uuid) -> Result<ProviderLimits>;
}

#[async_trait]
pub trait WaitlistBackend: Send + Sync {
    async fn create_entry(&self, request: WaitlistRequest) -> Result<WaitlistEntry>;
}
