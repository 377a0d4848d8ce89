//! Appointment booking and status workflow for the hospital portal.
//!
//! Patients compose bookings and browse their own appointments; doctors
//! triage their schedule through the pending → approved → completed
//! lifecycle. Both sides talk to an [`store::AppointmentStore`].

pub mod bookings;
pub mod composer;
pub mod config;
pub mod error;
pub mod models;
pub mod notice;
pub mod portal;
pub mod schedule;
pub mod session;
pub mod store;

pub use error::{PortalError, StoreError};
pub use models::{Appointment, AppointmentStatus, Doctor, NewAppointment, Role, StatusFilter, TransitionAction};
pub use session::Session;
