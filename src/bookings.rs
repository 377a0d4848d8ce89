/// Patient-side booking list.
///
/// Read-only view over the patient's own appointments with a text search,
/// a status filter, and single-record expansion.

use std::sync::Arc;

use crate::error::PortalError;
use crate::models::{Appointment, AppointmentStatus, Role, StatusFilter};
use crate::notice::Notices;
use crate::session::Session;
use crate::store::AppointmentStore;

/// Case-insensitive substring match on doctor name or department.
///
/// A blank term matches every record.
pub fn matches_text(appointment: &Appointment, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    let doctor_hit = appointment
        .doctor_name()
        .map(|name| name.to_lowercase().contains(&term))
        .unwrap_or(false);
    doctor_hit || appointment.department().to_lowercase().contains(&term)
}

pub fn filter_by_text<'a>(records: &[&'a Appointment], term: &str) -> Vec<&'a Appointment> {
    records.iter().copied().filter(|a| matches_text(a, term)).collect()
}

pub fn filter_by_status<'a>(records: &[&'a Appointment], filter: StatusFilter) -> Vec<&'a Appointment> {
    records.iter().copied().filter(|a| filter.matches(a.status())).collect()
}

/// What an expanded record reveals.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDetail<'a> {
    pub id: &'a str,
    pub description: Option<&'a str>,
    pub notes: Option<&'a str>,
}

pub struct BookingList<S> {
    store: Arc<S>,
    bookings: Vec<Appointment>,
    search: String,
    status_filter: StatusFilter,
    expanded: Option<String>,
    notices: Notices,
}

impl<S: AppointmentStore> BookingList<S> {
    pub fn new(store: Arc<S>) -> Self {
        BookingList {
            store,
            bookings: Vec::new(),
            search: String::new(),
            status_filter: StatusFilter::All,
            expanded: None,
            notices: Notices::default(),
        }
    }

    /// Fetch the patient's bookings. On failure the previous list is kept.
    pub async fn refresh(&mut self, session: &Session) -> Result<usize, PortalError> {
        let token = session.require(Role::Patient)?;
        match self
            .store
            .list_appointments(token, Role::Patient, session.user_id())
            .await
        {
            Ok(bookings) => {
                self.bookings = bookings;
                let still_listed = self
                    .expanded
                    .as_deref()
                    .map_or(true, |id| self.bookings.iter().any(|b| b.id() == id));
                if !still_listed {
                    self.expanded = None;
                }
                tracing::debug!(count = self.bookings.len(), "Loaded bookings");
                Ok(self.bookings.len())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error loading bookings");
                self.notices.error("Unable to load appointments. Please try again.");
                Err(e.into())
            }
        }
    }

    pub fn bookings(&self) -> &[Appointment] {
        &self.bookings
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.status_filter
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.status_filter = filter;
    }

    pub fn notices(&mut self) -> &mut Notices {
        &mut self.notices
    }

    /// Records passing both the text search and the status filter.
    pub fn visible(&self) -> Vec<&Appointment> {
        self.bookings
            .iter()
            .filter(|a| matches_text(a, &self.search) && self.status_filter.matches(a.status()))
            .collect()
    }

    pub fn count_with_status(&self, status: AppointmentStatus) -> usize {
        self.bookings.iter().filter(|a| a.status() == status).count()
    }

    /// Expand a record, or collapse it if it is already the expanded one.
    ///
    /// Returns whether the record is expanded afterwards. Expanding one
    /// record collapses any other.
    pub fn toggle(&mut self, appointment_id: &str) -> Result<bool, PortalError> {
        if self.expanded.as_deref() == Some(appointment_id) {
            self.expanded = None;
            return Ok(false);
        }
        if !self.bookings.iter().any(|b| b.id() == appointment_id) {
            return Err(PortalError::NotLoaded(appointment_id.to_string()));
        }
        self.expanded = Some(appointment_id.to_string());
        Ok(true)
    }

    pub fn is_expanded(&self, appointment_id: &str) -> bool {
        self.expanded.as_deref() == Some(appointment_id)
    }

    pub fn expanded(&self) -> Option<BookingDetail<'_>> {
        let id = self.expanded.as_deref()?;
        self.bookings.iter().find(|b| b.id() == id).map(|b| BookingDetail {
            id: b.id(),
            description: b.description(),
            notes: b.notes(),
        })
    }
}
