/// Patient-side booking composer.
///
/// Walks the patient through specialty → doctor → date and time, then
/// submits a create command. No doctor is offered until a specialty has been
/// picked, and a failed submit never clears what the patient typed.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::PortalError;
use crate::models::{optional_text, Appointment, Doctor, NewAppointment, Role};
use crate::notice::Notices;
use crate::session::Session;
use crate::store::AppointmentStore;

/// Form state as entered by the patient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingForm {
    pub specialty: Option<String>,
    pub doctor_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub description: String,
    pub notes: String,
}

pub struct BookingComposer<S> {
    store: Arc<S>,
    specialties: Vec<String>,
    doctors: Vec<Doctor>,
    form: BookingForm,
    notices: Notices,
}

impl<S: AppointmentStore> BookingComposer<S> {
    pub fn new(store: Arc<S>) -> Self {
        BookingComposer {
            store,
            specialties: Vec::new(),
            doctors: Vec::new(),
            form: BookingForm::default(),
            notices: Notices::default(),
        }
    }

    pub fn form(&self) -> &BookingForm {
        &self.form
    }

    pub fn specialties(&self) -> &[String] {
        &self.specialties
    }

    /// Doctors for the selected specialty; empty until one is picked.
    pub fn available_doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn notices(&mut self) -> &mut Notices {
        &mut self.notices
    }

    /// Lower bound for the date/time input.
    pub fn earliest_schedule(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub async fn load_specialties(&mut self, session: &Session) -> Result<&[String], PortalError> {
        let token = session.require(Role::Patient)?;
        match self.store.list_specialties(token).await {
            Ok(specialties) => {
                self.specialties = specialties;
                Ok(&self.specialties)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error loading specialties");
                Err(e.into())
            }
        }
    }

    /// Pick a specialty and refresh the doctor list for it.
    ///
    /// Any previously chosen doctor is cleared. A blank specialty empties the
    /// doctor list without asking the store.
    pub async fn select_specialty(&mut self, session: &Session, specialty: &str) -> Result<&[Doctor], PortalError> {
        let token = session.require(Role::Patient)?;
        self.form.specialty = optional_text(specialty);
        self.form.doctor_id = None;
        self.doctors.clear();

        let Some(specialty) = self.form.specialty.as_deref() else {
            return Ok(&self.doctors);
        };

        match self.store.list_available_doctors(token, specialty).await {
            Ok(doctors) => {
                self.doctors = doctors;
                Ok(&self.doctors)
            }
            Err(e) => {
                tracing::warn!(specialty, error = %e, "Error loading doctors");
                Err(e.into())
            }
        }
    }

    pub fn select_doctor(&mut self, doctor_id: &str) -> Result<&Doctor, PortalError> {
        let doctor = self
            .doctors
            .iter()
            .find(|d| d.id == doctor_id)
            .ok_or_else(|| PortalError::DoctorNotOffered(doctor_id.to_string()))?;
        self.form.doctor_id = Some(doctor.id.clone());
        Ok(doctor)
    }

    pub fn set_schedule(&mut self, scheduled_at: DateTime<Utc>) {
        self.form.scheduled_at = Some(scheduled_at);
    }

    pub fn set_description(&mut self, description: &str) {
        self.form.description = description.to_string();
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.form.notes = notes.to_string();
    }

    /// Turn the form into a create command, checking it against `now`.
    pub fn build_request(&self, patient_id: &str, now: DateTime<Utc>) -> Result<NewAppointment, PortalError> {
        let doctor_id = self.form.doctor_id.clone().ok_or(PortalError::MissingField("doctor"))?;
        let scheduled_at = self
            .form
            .scheduled_at
            .ok_or(PortalError::MissingField("appointment time"))?;
        if scheduled_at < now {
            return Err(PortalError::PastSchedule(scheduled_at));
        }

        Ok(NewAppointment {
            patient_id: patient_id.to_string(),
            doctor_id,
            scheduled_at,
            description: optional_text(&self.form.description),
            notes: optional_text(&self.form.notes),
        })
    }

    /// Validate and submit. On success the form resets; on failure it is kept.
    pub async fn submit(&mut self, session: &Session) -> Result<Appointment, PortalError> {
        let token = session.require(Role::Patient)?;

        let request = match self.build_request(session.user_id(), self.earliest_schedule()) {
            Ok(request) => request,
            Err(e) => {
                self.notices.error(e.to_string());
                return Err(e);
            }
        };

        match self.store.create_appointment(token, &request).await {
            Ok(created) => {
                tracing::info!(appointment_id = %created.id(), "Appointment requested successfully");
                self.notices.info("Appointment requested successfully!");
                self.form = BookingForm::default();
                self.doctors.clear();
                Ok(created)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error creating booking");
                self.notices.error("Failed to submit appointment request");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::AppointmentStatus;
    use crate::notice::NoticeLevel;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn patient() -> Session {
        Session::login(Role::Patient, "P1", "tok").unwrap()
    }

    fn composer() -> BookingComposer<MemoryStore> {
        BookingComposer::new(Arc::new(MemoryStore::demo()))
    }

    #[tokio::test]
    async fn no_doctors_until_specialty_picked() {
        let session = patient();
        let mut composer = composer();
        assert!(composer.available_doctors().is_empty());
        assert!(matches!(composer.select_doctor("D1"), Err(PortalError::DoctorNotOffered(_))));

        composer.select_specialty(&session, "Cardiology").await.unwrap();
        let ids: Vec<&str> = composer.available_doctors().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["D1", "D3"]);
        // Neurology doctor is not offered under cardiology
        assert!(composer.select_doctor("D2").is_err());
    }

    #[tokio::test]
    async fn changing_specialty_clears_doctor() {
        let session = patient();
        let mut composer = composer();
        composer.select_specialty(&session, "Cardiology").await.unwrap();
        composer.select_doctor("D1").unwrap();

        composer.select_specialty(&session, "Neurology").await.unwrap();
        assert_eq!(composer.form().doctor_id, None);

        composer.select_specialty(&session, "").await.unwrap();
        assert!(composer.available_doctors().is_empty());
        assert_eq!(composer.form().specialty, None);
    }

    #[tokio::test]
    async fn submit_creates_pending_and_resets_form() {
        let session = patient();
        let mut composer = composer();
        composer.select_specialty(&session, "Cardiology").await.unwrap();
        composer.select_doctor("D1").unwrap();
        let when = Utc::now() + Duration::days(2);
        composer.set_schedule(when);
        composer.set_description("checkup");

        let created = composer.submit(&session).await.unwrap();
        assert_eq!(created.status(), AppointmentStatus::Pending);
        assert_eq!(created.doctor_id(), "D1");
        assert_eq!(created.patient_id(), "P1");
        assert_eq!(created.scheduled_at(), when);
        assert_eq!(created.description(), Some("checkup"));
        assert_eq!(created.notes(), None);

        assert_eq!(composer.form(), &BookingForm::default());
        assert_eq!(composer.notices().last().unwrap().level, NoticeLevel::Info);
    }

    #[tokio::test]
    async fn missing_fields_rejected_locally() {
        let session = patient();
        let mut composer = composer();
        composer.set_description("headache");

        let err = composer.submit(&session).await.unwrap_err();
        assert!(matches!(err, PortalError::MissingField("doctor")));
        assert_eq!(composer.form().description, "headache");
        assert_eq!(composer.notices().last().unwrap().level, NoticeLevel::Error);

        composer.select_specialty(&session, "Neurology").await.unwrap();
        composer.select_doctor("D2").unwrap();
        let err = composer.submit(&session).await.unwrap_err();
        assert!(matches!(err, PortalError::MissingField("appointment time")));
    }

    #[tokio::test]
    async fn past_time_rejected_locally() {
        let session = patient();
        let mut composer = composer();
        composer.select_specialty(&session, "Neurology").await.unwrap();
        composer.select_doctor("D2").unwrap();
        composer.set_schedule(Utc::now() - Duration::hours(1));

        assert!(matches!(composer.submit(&session).await, Err(PortalError::PastSchedule(_))));
        assert!(composer.form().scheduled_at.is_some());
    }

    #[tokio::test]
    async fn store_failure_keeps_input() {
        let session = patient();
        let store = Arc::new(MemoryStore::demo());
        let mut first = BookingComposer::new(store.clone());
        let mut second = BookingComposer::new(store);
        let when = Utc::now() + Duration::days(1);

        for composer in [&mut first, &mut second] {
            composer.select_specialty(&session, "Pediatrics").await.unwrap();
            composer.select_doctor("D4").unwrap();
            composer.set_schedule(when);
            composer.set_notes("bring vaccination card");
        }
        first.submit(&session).await.unwrap();

        let err = second.submit(&session).await.unwrap_err();
        assert!(matches!(err, PortalError::Store(StoreError::Conflict(_))));
        assert_eq!(second.form().doctor_id.as_deref(), Some("D4"));
        assert_eq!(second.form().notes, "bring vaccination card");
        let notice = second.notices().last().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Failed to submit appointment request");
    }

    #[tokio::test]
    async fn doctor_session_cannot_book() {
        let session = Session::login(Role::Doctor, "D1", "tok").unwrap();
        let mut composer = composer();
        assert!(matches!(
            composer.load_specialties(&session).await,
            Err(PortalError::WrongRole { .. })
        ));
    }

    #[tokio::test]
    async fn closed_session_cannot_submit() {
        let mut session = patient();
        let mut composer = composer();
        composer.load_specialties(&session).await.unwrap();
        assert_eq!(composer.specialties().len(), 3);

        session.logout();
        assert!(matches!(composer.submit(&session).await, Err(PortalError::SessionClosed)));
    }
}
