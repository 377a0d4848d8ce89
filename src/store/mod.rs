/// Command/query interface of the backend that owns appointment records.
///
/// Two implementations:
/// - `MemoryStore`: in-process store used by the demo and the tests
/// - `HttpStore`: the portal's REST backend

use std::future::Future;

use crate::error::StoreError;
use crate::models::{Appointment, AppointmentStatus, Doctor, NewAppointment, Role};

mod http;
mod memory;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpStore;
pub use memory::MemoryStore;

/// Every call carries the caller's bearer token.
pub trait AppointmentStore: Send + Sync {
    fn list_specialties(&self, token: &str) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    fn list_available_doctors(
        &self,
        token: &str,
        specialty: &str,
    ) -> impl Future<Output = Result<Vec<Doctor>, StoreError>> + Send;

    /// All appointments owned by `owner_id` on the given side.
    fn list_appointments(
        &self,
        token: &str,
        owner_role: Role,
        owner_id: &str,
    ) -> impl Future<Output = Result<Vec<Appointment>, StoreError>> + Send;

    /// Fails with `Validation` on missing fields, `Conflict` when the slot is taken.
    fn create_appointment(
        &self,
        token: &str,
        request: &NewAppointment,
    ) -> impl Future<Output = Result<Appointment, StoreError>> + Send;

    /// Returns the status the store acknowledged.
    ///
    /// Fails with `NotFound` for an unknown id, `IllegalTransition` off the state machine.
    fn set_appointment_status(
        &self,
        token: &str,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> impl Future<Output = Result<AppointmentStatus, StoreError>> + Send;
}
