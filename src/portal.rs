/// Patient appointments screen: booking list plus composer.

use std::sync::Arc;

use crate::bookings::BookingList;
use crate::composer::BookingComposer;
use crate::error::PortalError;
use crate::models::Appointment;
use crate::notice::Notice;
use crate::session::Session;
use crate::store::AppointmentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientView {
    MyBookings,
    NewBooking,
}

pub struct PatientPortal<S> {
    view: PatientView,
    pub composer: BookingComposer<S>,
    pub bookings: BookingList<S>,
}

impl<S: AppointmentStore> PatientPortal<S> {
    pub fn new(store: Arc<S>) -> Self {
        PatientPortal {
            view: PatientView::MyBookings,
            composer: BookingComposer::new(store.clone()),
            bookings: BookingList::new(store),
        }
    }

    pub fn view(&self) -> PatientView {
        self.view
    }

    /// Initial load: specialties and the patient's bookings.
    pub async fn open(&mut self, session: &Session) -> Result<usize, PortalError> {
        if let Err(e) = self.composer.load_specialties(session).await {
            // The list is still usable without the specialty catalogue
            tracing::warn!(error = %e, "Specialties unavailable");
        }
        self.bookings.refresh(session).await
    }

    pub fn start_booking(&mut self) {
        self.view = PatientView::NewBooking;
    }

    pub fn back_to_list(&mut self) {
        self.view = PatientView::MyBookings;
    }

    /// Submit the composer form; on success refetch the list and show it.
    pub async fn submit_booking(&mut self, session: &Session) -> Result<Appointment, PortalError> {
        let created = self.composer.submit(session).await?;
        if let Err(e) = self.bookings.refresh(session).await {
            tracing::warn!(error = %e, "Booking saved but list refresh failed");
        }
        self.view = PatientView::MyBookings;
        Ok(created)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        let mut notices = self.composer.notices().drain();
        notices.extend(self.bookings.notices().drain());
        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, Role};
    use crate::schedule::ScheduleManager;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn booking_shows_up_on_both_sides() {
        let store = Arc::new(MemoryStore::demo());
        let patient = Session::login(Role::Patient, "P1", "patient-token").unwrap();
        let doctor = Session::login(Role::Doctor, "D2", "doctor-token").unwrap();

        let mut portal = PatientPortal::new(store.clone());
        assert_eq!(portal.open(&patient).await.unwrap(), 0);
        assert_eq!(portal.composer.specialties().len(), 3);

        portal.start_booking();
        portal.composer.select_specialty(&patient, "Neurology").await.unwrap();
        portal.composer.select_doctor("D2").unwrap();
        portal.composer.set_schedule(Utc::now() + Duration::days(3));
        portal.composer.set_description("migraine follow-up");

        let created = portal.submit_booking(&patient).await.unwrap();
        assert_eq!(portal.view(), PatientView::MyBookings);
        assert_eq!(portal.bookings.bookings().len(), 1);
        assert_eq!(portal.bookings.bookings()[0].status(), AppointmentStatus::Pending);

        let schedule = ScheduleManager::new(store.clone());
        schedule.load(&doctor).await.unwrap();
        schedule.open_detail(created.id()).unwrap();
        schedule
            .confirm_detail(&doctor, crate::models::TransitionAction::Approve)
            .await
            .unwrap();

        // Patient sees the change only after refetching
        assert_eq!(portal.bookings.bookings()[0].status(), AppointmentStatus::Pending);
        portal.bookings.refresh(&patient).await.unwrap();
        assert_eq!(portal.bookings.bookings()[0].status(), AppointmentStatus::Approved);
    }

    #[tokio::test]
    async fn failed_booking_stays_on_form() {
        let store = Arc::new(MemoryStore::demo());
        let patient = Session::login(Role::Patient, "P1", "patient-token").unwrap();
        let mut portal = PatientPortal::new(store);
        portal.start_booking();

        assert!(portal.submit_booking(&patient).await.is_err());
        assert_eq!(portal.view(), PatientView::NewBooking);
        assert_eq!(portal.take_notices().len(), 1);
    }
}
