/// Doctor-side schedule manager.
///
/// Loads the doctor's appointments, filters them by status, keeps summary
/// counts over the whole schedule, and issues status transitions. The local
/// copy of a record changes only after the store has acknowledged the new
/// status. At most one transition per record is in flight at a time.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::PortalError;
use crate::models::{Appointment, AppointmentStatus, Role, StatusFilter, TransitionAction};
use crate::notice::{Notice, Notices};
use crate::session::Session;
use crate::store::AppointmentStore;

/// Counts over the unfiltered schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleSummary {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
}

/// A transition that did not go through, tied to its record.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionFailure {
    pub appointment_id: String,
    pub message: String,
}

/// Result of applying several transitions.
#[derive(Debug)]
pub struct BatchTransitionResult {
    pub applied: Vec<Appointment>,
    pub failed: Vec<TransitionFailure>,
    pub total_requests: usize,
}

impl BatchTransitionResult {
    /// Calculate the success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        (self.applied.len() as f64 / self.total_requests as f64) * 100.0
    }
}

#[derive(Default)]
struct ScheduleState {
    appointments: Vec<Appointment>,
    filter: StatusFilter,
    detail: Option<String>,
    in_flight: HashSet<String>,
    failures: HashMap<String, String>,
    notices: Notices,
}

impl ScheduleState {
    fn find(&self, appointment_id: &str) -> Result<&Appointment, PortalError> {
        self.appointments
            .iter()
            .find(|a| a.id() == appointment_id)
            .ok_or_else(|| PortalError::NotLoaded(appointment_id.to_string()))
    }
}

/// Marks a record busy until dropped.
struct InFlight<'a> {
    state: &'a Mutex<ScheduleState>,
    appointment_id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.in_flight.remove(&self.appointment_id);
        }
    }
}

pub struct ScheduleManager<S> {
    store: Arc<S>,
    state: Mutex<ScheduleState>,
}

impl<S: AppointmentStore> ScheduleManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        ScheduleManager {
            store,
            state: Mutex::new(ScheduleState::default()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, ScheduleState>, PortalError> {
        self.state.lock().map_err(|_| PortalError::LockPoisoned)
    }

    /// Fetch the signed-in doctor's appointments.
    pub async fn load(&self, session: &Session) -> Result<usize, PortalError> {
        let token = session.require(Role::Doctor)?;
        let result = self
            .store
            .list_appointments(token, Role::Doctor, session.user_id())
            .await;

        let mut state = self.state()?;
        match result {
            Ok(appointments) => {
                state.appointments = appointments;
                state.failures.clear();
                let detail_listed = match state.detail.as_deref() {
                    Some(id) => state.find(id).is_ok(),
                    None => true,
                };
                if !detail_listed {
                    state.detail = None;
                }
                tracing::debug!(doctor_id = %session.user_id(), count = state.appointments.len(), "Loaded schedule");
                Ok(state.appointments.len())
            }
            Err(e) => {
                tracing::error!(error = %e, "Unable to load appointments");
                state.notices.error("Unable to load appointments. Please try again.");
                Err(e.into())
            }
        }
    }

    pub fn filter(&self) -> Result<StatusFilter, PortalError> {
        Ok(self.state()?.filter)
    }

    pub fn set_filter(&self, filter: StatusFilter) -> Result<(), PortalError> {
        self.state()?.filter = filter;
        Ok(())
    }

    /// The whole schedule, ignoring the filter.
    pub fn appointments(&self) -> Result<Vec<Appointment>, PortalError> {
        Ok(self.state()?.appointments.clone())
    }

    /// Records matching the active status filter.
    pub fn visible(&self) -> Result<Vec<Appointment>, PortalError> {
        let state = self.state()?;
        Ok(state
            .appointments
            .iter()
            .filter(|a| state.filter.matches(a.status()))
            .cloned()
            .collect())
    }

    pub fn summary(&self) -> Result<ScheduleSummary, PortalError> {
        let state = self.state()?;
        let count = |status: AppointmentStatus| state.appointments.iter().filter(|a| a.status() == status).count();
        Ok(ScheduleSummary {
            total: state.appointments.len(),
            pending: count(AppointmentStatus::Pending),
            approved: count(AppointmentStatus::Approved),
        })
    }

    /// Placeholder text when the filtered list is empty.
    pub fn empty_message(&self) -> Result<Option<String>, PortalError> {
        let state = self.state()?;
        if state.appointments.iter().any(|a| state.filter.matches(a.status())) {
            return Ok(None);
        }
        Ok(Some(match state.filter {
            StatusFilter::All => "You don't have any scheduled appointments.".to_string(),
            StatusFilter::Only(status) => format!("No {status} appointments found."),
        }))
    }

    /// Transition controls for a record in its current local status.
    pub fn actions_for(&self, appointment_id: &str) -> Result<&'static [TransitionAction], PortalError> {
        let state = self.state()?;
        Ok(TransitionAction::available_for(state.find(appointment_id)?.status()))
    }

    pub fn is_in_flight(&self, appointment_id: &str) -> Result<bool, PortalError> {
        Ok(self.state()?.in_flight.contains(appointment_id))
    }

    /// Last failure recorded for a record, until it next changes successfully.
    pub fn failure_for(&self, appointment_id: &str) -> Result<Option<String>, PortalError> {
        Ok(self.state()?.failures.get(appointment_id).cloned())
    }

    pub fn take_notices(&self) -> Result<Vec<Notice>, PortalError> {
        Ok(self.state()?.notices.drain())
    }

    fn begin(&self, appointment_id: &str) -> Result<InFlight<'_>, PortalError> {
        let mut state = self.state()?;
        state.find(appointment_id)?;
        if !state.in_flight.insert(appointment_id.to_string()) {
            tracing::debug!(appointment_id, "Status change already in flight");
            return Err(PortalError::InFlight(appointment_id.to_string()));
        }
        Ok(InFlight {
            state: &self.state,
            appointment_id: appointment_id.to_string(),
        })
    }

    /// Ask the store to set a record's status.
    ///
    /// Only legal edges are accepted by the store; anything else comes back as
    /// an error, leaving the local copy untouched.
    pub async fn set_status(
        &self,
        session: &Session,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, PortalError> {
        let token = session.require(Role::Doctor)?;
        let guard = self.begin(appointment_id)?;

        let result = self.store.set_appointment_status(token, appointment_id, status).await;

        let outcome = {
            let mut state = self.state()?;
            match result {
                Ok(acknowledged) => {
                    state.failures.remove(appointment_id);
                    tracing::info!(appointment_id, status = %acknowledged, "Appointment updated");
                    match state.appointments.iter_mut().find(|a| a.id() == appointment_id) {
                        Some(local) => {
                            local.mark_status(acknowledged);
                            Ok(local.clone())
                        }
                        // Dropped by a reload while the command was in flight
                        None => Err(PortalError::NotLoaded(appointment_id.to_string())),
                    }
                }
                Err(e) => {
                    tracing::warn!(appointment_id, requested = %status, error = %e, "Failed to update appointment");
                    state.failures.insert(appointment_id.to_string(), e.to_string());
                    state.notices.alert(
                        format!("Failed to update appointment {appointment_id}: {e}"),
                        Some(appointment_id),
                    );
                    Err(e.into())
                }
            }
        };
        drop(guard);
        outcome
    }

    /// Run one of the controls offered for the record's current status.
    pub async fn perform(
        &self,
        session: &Session,
        appointment_id: &str,
        action: TransitionAction,
    ) -> Result<Appointment, PortalError> {
        if !self.actions_for(appointment_id)?.contains(&action) {
            return Err(PortalError::ActionUnavailable {
                id: appointment_id.to_string(),
                action: action.name(),
            });
        }
        self.set_status(session, appointment_id, action.target()).await
    }

    /// Apply several transitions one after another, collecting per-record failures.
    pub async fn apply_batch(
        &self,
        session: &Session,
        requests: &[(&str, TransitionAction)],
    ) -> BatchTransitionResult {
        let mut applied = Vec::new();
        let mut failed = Vec::new();

        for (appointment_id, action) in requests {
            match self.perform(session, appointment_id, *action).await {
                Ok(updated) => applied.push(updated),
                Err(e) => failed.push(TransitionFailure {
                    appointment_id: appointment_id.to_string(),
                    message: e.to_string(),
                }),
            }
        }

        BatchTransitionResult {
            applied,
            failed,
            total_requests: requests.len(),
        }
    }

    pub fn open_detail(&self, appointment_id: &str) -> Result<Appointment, PortalError> {
        let mut state = self.state()?;
        let appointment = state.find(appointment_id)?.clone();
        state.detail = Some(appointment_id.to_string());
        Ok(appointment)
    }

    pub fn close_detail(&self) -> Result<(), PortalError> {
        self.state()?.detail = None;
        Ok(())
    }

    pub fn detail(&self) -> Result<Option<Appointment>, PortalError> {
        let state = self.state()?;
        Ok(match state.detail.as_deref() {
            Some(id) => state.find(id).ok().cloned(),
            None => None,
        })
    }

    /// The modal repeats approve/decline for pending records only.
    pub fn detail_actions(&self) -> Result<&'static [TransitionAction], PortalError> {
        let actions: &'static [TransitionAction] = match self.detail()? {
            Some(appointment) if appointment.status() == AppointmentStatus::Pending => {
                &[TransitionAction::Approve, TransitionAction::Decline]
            }
            _ => &[],
        };
        Ok(actions)
    }

    /// Run a modal control; the modal closes once the store acknowledges.
    pub async fn confirm_detail(&self, session: &Session, action: TransitionAction) -> Result<Appointment, PortalError> {
        let appointment = self.detail()?.ok_or(PortalError::NoDetailOpen)?;
        if !self.detail_actions()?.contains(&action) {
            return Err(PortalError::ActionUnavailable {
                id: appointment.id().to_string(),
                action: action.name(),
            });
        }
        let updated = self.set_status(session, appointment.id(), action.target()).await?;
        self.close_detail()?;
        Ok(updated)
    }
}
