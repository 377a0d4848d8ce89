/// Error types for the store interface and the portal views.

use chrono::{DateTime, Utc};

use crate::models::Role;

/// Failures reported by an appointment store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Slot unavailable: {0}")]
    Conflict(String),
    #[error("Appointment not found: {0}")]
    NotFound(String),
    #[error("Illegal status change for appointment {id}: {detail}")]
    IllegalTransition { id: String, detail: String },
    #[error("Authentication required")]
    Unauthorized,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Store internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Network(err.to_string())
        }
    }
}

/// Errors surfaced by the booking composer, booking list and schedule manager.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Session is closed; sign in again")]
    SessionClosed,
    #[error("This view requires a {expected} session, signed in as {actual}")]
    WrongRole { expected: Role, actual: Role },
    #[error("Please select both doctor and appointment time (missing {0})")]
    MissingField(&'static str),
    #[error("Appointment time {0} is in the past")]
    PastSchedule(DateTime<Utc>),
    #[error("Doctor {0} is not offered for the selected specialty")]
    DoctorNotOffered(String),
    #[error("A status change for appointment {0} is already in flight")]
    InFlight(String),
    #[error("Appointment {0} is not in the loaded list")]
    NotLoaded(String),
    #[error("{action} is not available for appointment {id}")]
    ActionUnavailable { id: String, action: &'static str },
    #[error("No appointment detail is open")]
    NoDetailOpen,
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Lock poisoned")]
    LockPoisoned,
}

impl PortalError {
    /// The record this error concerns, when there is one.
    pub fn appointment_id(&self) -> Option<&str> {
        match self {
            PortalError::Store(StoreError::IllegalTransition { id, .. }) => Some(id),
            PortalError::Store(StoreError::NotFound(id)) => Some(id),
            PortalError::InFlight(id) | PortalError::NotLoaded(id) => Some(id),
            PortalError::ActionUnavailable { id, .. } => Some(id),
            _ => None,
        }
    }
}
