/// Store double whose backend can be taken offline mid-test.
///
/// While offline every call fails with `StoreError::Network`, the way
/// `HttpStore` reports a refused connection.

use std::sync::atomic::{AtomicBool, Ordering};

use super::{AppointmentStore, MemoryStore};
use crate::error::StoreError;
use crate::models::{Appointment, AppointmentStatus, Doctor, NewAppointment, Role};

pub(crate) struct FlakyStore {
    pub inner: MemoryStore,
    offline: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        FlakyStore {
            inner,
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn reachable(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

impl AppointmentStore for FlakyStore {
    async fn list_specialties(&self, token: &str) -> Result<Vec<String>, StoreError> {
        self.reachable()?;
        self.inner.list_specialties(token).await
    }

    async fn list_available_doctors(&self, token: &str, specialty: &str) -> Result<Vec<Doctor>, StoreError> {
        self.reachable()?;
        self.inner.list_available_doctors(token, specialty).await
    }

    async fn list_appointments(
        &self,
        token: &str,
        owner_role: Role,
        owner_id: &str,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.reachable()?;
        self.inner.list_appointments(token, owner_role, owner_id).await
    }

    async fn create_appointment(&self, token: &str, request: &NewAppointment) -> Result<Appointment, StoreError> {
        self.reachable()?;
        self.inner.create_appointment(token, request).await
    }

    async fn set_appointment_status(
        &self,
        token: &str,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<AppointmentStatus, StoreError> {
        self.reachable()?;
        self.inner.set_appointment_status(token, appointment_id, status).await
    }
}
