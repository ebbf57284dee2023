// libs/scheduling-cell/tests/common/mod.rs
//
// Shared fixtures and backend mocks for the scheduling-cell test suite.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use scheduling_cell::*;

mock! {
    pub Availability {}

    #[async_trait]
    impl AvailabilityBackend for Availability {
        async fn available_slots(
            &self,
            provider_id: Uuid,
            date: NaiveDate,
            duration_minutes: i32,
        ) -> Result<AvailableSlotsResponse>;
    }
}

mock! {
    pub Appointments {}

    #[async_trait]
    impl AppointmentBackend for Appointments {
        async fn list_appointments(
            &self,
            query: AppointmentListQuery,
        ) -> Result<AppointmentListResponse>;

        async fn create_appointment(&self, payload: AppointmentPayload) -> Result<Uuid>;

        async fn update_appointment(&self, id: Uuid, payload: AppointmentPayload) -> Result<()>;
    }
}

mock! {
    pub Providers {}

    #[async_trait]
    impl ProviderBackend for Providers {
        async fn provider_limits(&self, provider_id: Uuid) -> Result<ProviderLimits>;
    }
}

mock! {
    pub Waitlist {}

    #[async_trait]
    impl WaitlistBackend for Waitlist {
        async fn create_entry(&self, request: WaitlistRequest) -> Result<WaitlistEntry>;
    }
}

/// Slot oracle that parks on a timer before answering, for exercising
/// in-flight checks racing later edits.
pub struct SlowAvailability {
    pub delay: Duration,
    pub slots: Vec<TimeOfDay>,
}

#[async_trait]
impl AvailabilityBackend for SlowAvailability {
    async fn available_slots(
        &self,
        _provider_id: Uuid,
        _date: NaiveDate,
        _duration_minutes: i32,
    ) -> Result<AvailableSlotsResponse> {
        tokio::time::sleep(self.delay).await;
        Ok(AvailableSlotsResponse {
            available_slots: self.slots.clone(),
        })
    }
}

pub fn t(s: &str) -> TimeOfDay {
    s.parse().expect("test time literal")
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("test date literal")
}

pub fn slots(times: &[&str]) -> AvailableSlotsResponse {
    AvailableSlotsResponse {
        available_slots: times.iter().map(|s| t(s)).collect(),
    }
}

pub fn booked(id: Uuid, start: &str, end: &str, status: AppointmentStatus) -> BookedAppointment {
    BookedAppointment {
        id,
        start_time: t(start),
        end_time: t(end),
        status,
    }
}

pub fn booked_list(appointments: Vec<BookedAppointment>) -> AppointmentListResponse {
    AppointmentListResponse { appointments }
}

/// Slot oracle answering every query with the given open slots.
pub fn offering(times: &'static [&'static str]) -> MockAvailability {
    let mut availability = MockAvailability::new();
    availability
        .expect_available_slots()
        .returning(move |_, _, _| Ok(slots(times)));
    availability
}

/// Booking oracle with no appointments on any day.
pub fn quiet_appointments() -> MockAppointments {
    let mut appointments = MockAppointments::new();
    appointments
        .expect_list_appointments()
        .returning(|_| Ok(booked_list(vec![])));
    appointments
}

/// Provider lookup with no daily cap configured.
pub fn no_limits() -> MockProviders {
    let mut providers = MockProviders::new();
    providers
        .expect_provider_limits()
        .returning(|_| Ok(ProviderLimits::default()));
    providers
}

/// Provider lookup with a configured daily cap.
pub fn capped_at(max: u32) -> MockProviders {
    let mut providers = MockProviders::new();
    providers.expect_provider_limits().returning(move |_| {
        Ok(ProviderLimits {
            max_daily_appointments: Some(max),
        })
    });
    providers
}

pub fn checker(
    availability: MockAvailability,
    appointments: MockAppointments,
    providers: MockProviders,
) -> AvailabilityCheckService {
    AvailabilityCheckService::new(
        Arc::new(availability),
        Arc::new(appointments),
        Arc::new(providers),
        SchedulingRules::default(),
    )
}

pub fn build_session_with(
    availability: Arc<dyn AvailabilityBackend>,
    appointments: Arc<dyn AppointmentBackend>,
    providers: Arc<dyn ProviderBackend>,
    waitlist: Arc<dyn WaitlistBackend>,
) -> SchedulingSession {
    let checker = AvailabilityCheckService::new(
        availability,
        appointments.clone(),
        providers,
        SchedulingRules::default(),
    );
    SchedulingSession::new(checker, appointments, waitlist, SchedulingRules::default())
}

pub fn build_session(
    availability: MockAvailability,
    appointments: MockAppointments,
    providers: MockProviders,
    waitlist: MockWaitlist,
) -> SchedulingSession {
    build_session_with(
        Arc::new(availability),
        Arc::new(appointments),
        Arc::new(providers),
        Arc::new(waitlist),
    )
}

/// A draft with every field a submission needs: 09:00-09:30 on the given day.
pub fn complete_draft(date: NaiveDate) -> AppointmentDraft {
    AppointmentDraft {
        provider_id: Some(Uuid::new_v4()),
        patient_id: Some(Uuid::new_v4()),
        appointment_type_id: None,
        date: Some(date),
        start: Some(t("09:00")),
        end: Some(t("09:30")),
        duration_minutes: 30,
        start_manually_set: true,
        end_manually_set: false,
        exclude_appointment_id: None,
        notes: None,
        chief_complaint: None,
    }
}
