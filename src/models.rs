/// Data models for the appointment booking workflow.
///
/// This module defines the core data structures shared by both portal sides:
/// - AppointmentStatus: lifecycle state and its legal transitions
/// - TransitionAction: the doctor-side controls that drive those transitions
/// - StatusFilter: the `all`-or-exact status selector used by both lists
/// - Doctor: a bookable doctor as offered for a specialty
/// - Appointment: a stored booking record
/// - NewAppointment: a patient's create command

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Lifecycle status of an appointment.
///
/// `Pending` is the only initial state. `Completed` and `Cancelled` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Approved,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
    ];

    /// Convert a string to a status value.
    pub fn from_string(value: &str) -> Result<Self, StoreError> {
        match value.to_lowercase().trim() {
            "pending" => Ok(AppointmentStatus::Pending),
            "approved" => Ok(AppointmentStatus::Approved),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            _ => Err(StoreError::Validation(format!(
                "Invalid status: '{}'. Must be one of: pending, approved, cancelled, completed",
                value
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    /// Heading used by the doctor-side filter bar.
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending Review",
            AppointmentStatus::Approved => "Confirmed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }

    /// Statuses reachable from this one in a single transition.
    pub fn next_statuses(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::Pending => &[AppointmentStatus::Approved, AppointmentStatus::Cancelled],
            AppointmentStatus::Approved => &[AppointmentStatus::Completed],
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.next_statuses().contains(&next)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition control offered to the doctor for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionAction {
    Approve,
    Decline,
    Complete,
}

impl TransitionAction {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            TransitionAction::Approve => AppointmentStatus::Approved,
            TransitionAction::Decline => AppointmentStatus::Cancelled,
            TransitionAction::Complete => AppointmentStatus::Completed,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransitionAction::Approve => "Approve",
            TransitionAction::Decline => "Decline",
            TransitionAction::Complete => "Mark Completed",
        }
    }

    /// Controls rendered for a record in the given status.
    pub fn available_for(status: AppointmentStatus) -> &'static [TransitionAction] {
        match status {
            AppointmentStatus::Pending => &[TransitionAction::Approve, TransitionAction::Decline],
            AppointmentStatus::Approved => &[TransitionAction::Complete],
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => &[],
        }
    }
}

/// Exact status match, or the `all` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(AppointmentStatus),
}

impl StatusFilter {
    pub fn from_string(value: &str) -> Result<Self, StoreError> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        AppointmentStatus::from_string(value).map(StatusFilter::Only)
    }

    pub fn matches(&self, status: AppointmentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => status.fmt(f),
        }
    }
}

/// Which side of the portal owns a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A doctor offered for booking under a specialty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub specialization: String,
}

impl Doctor {
    pub fn new(id: &str, name: &str, specialization: &str) -> Result<Self, StoreError> {
        if id.trim().is_empty() {
            return Err(StoreError::Validation("Doctor ID cannot be empty".to_string()));
        }
        if name.trim().is_empty() {
            return Err(StoreError::Validation("Doctor name cannot be empty".to_string()));
        }
        if specialization.trim().is_empty() {
            return Err(StoreError::Validation("Doctor specialization cannot be empty".to_string()));
        }

        Ok(Doctor {
            id: id.to_string(),
            name: name.to_string(),
            specialization: specialization.to_string(),
        })
    }
}

/// A stored appointment record.
///
/// Identity, parties and the scheduled instant are fixed at creation and only
/// exposed through accessors. `status` changes solely through a legal
/// transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    patient_id: String,
    doctor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    patient_name: Option<String>,
    #[serde(default)]
    department: String,
    #[serde(rename = "date")]
    scheduled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    status: AppointmentStatus,
}

impl Appointment {
    /// Build a freshly created record. Always starts `Pending`.
    pub fn pending(id: String, request: &NewAppointment, doctor: &Doctor) -> Self {
        Appointment {
            id,
            patient_id: request.patient_id.clone(),
            doctor_id: request.doctor_id.clone(),
            doctor_name: Some(doctor.name.clone()),
            patient_name: None,
            department: doctor.specialization.clone(),
            scheduled_at: request.scheduled_at,
            description: request.description.clone(),
            notes: request.notes.clone(),
            status: AppointmentStatus::Pending,
        }
    }

    pub fn with_patient_name(mut self, name: Option<String>) -> Self {
        self.patient_name = name;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn doctor_id(&self) -> &str {
        &self.doctor_id
    }

    pub fn doctor_name(&self) -> Option<&str> {
        self.doctor_name.as_deref()
    }

    pub fn patient_name(&self) -> Option<&str> {
        self.patient_name.as_deref()
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> AppointmentStatus {
        self.status
    }

    /// Move along a legal edge, returning the previous status.
    pub fn transition_to(&mut self, next: AppointmentStatus) -> Result<AppointmentStatus, StoreError> {
        if !self.status.can_transition_to(next) {
            return Err(StoreError::IllegalTransition {
                id: self.id.clone(),
                detail: format!("{} -> {}", self.status, next),
            });
        }
        let previous = self.status;
        self.status = next;
        Ok(previous)
    }

    /// Mirror a status the store has already acknowledged.
    pub(crate) fn mark_status(&mut self, status: AppointmentStatus) {
        self.status = status;
    }
}

/// A patient's create command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: String,
    pub doctor_id: String,
    #[serde(rename = "date")]
    pub scheduled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewAppointment {
    /// Check required fields and that the instant is not in the past.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), StoreError> {
        if self.patient_id.trim().is_empty() {
            return Err(StoreError::Validation("Patient ID is required".to_string()));
        }
        if self.doctor_id.trim().is_empty() {
            return Err(StoreError::Validation("Doctor ID is required".to_string()));
        }
        if self.scheduled_at < now {
            return Err(StoreError::Validation(format!(
                "Appointment time {} is in the past",
                self.scheduled_at.format("%Y-%m-%d %H:%M")
            )));
        }
        Ok(())
    }
}

/// Treat blank free text as absent.
pub fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(AppointmentStatus::from_string(" Approved ").unwrap(), AppointmentStatus::Approved);
        assert!(matches!(
            AppointmentStatus::from_string("rescheduled"),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn labels_read_as_headings() {
        assert_eq!(AppointmentStatus::Pending.label(), "Pending Review");
        assert_eq!(AppointmentStatus::Approved.label(), "Confirmed");
        assert_eq!(AppointmentStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn only_three_edges_are_legal() {
        let mut legal = Vec::new();
        for from in AppointmentStatus::ALL {
            for to in AppointmentStatus::ALL {
                if from.can_transition_to(to) {
                    legal.push((from, to));
                }
            }
        }
        assert_eq!(
            legal,
            vec![
                (AppointmentStatus::Pending, AppointmentStatus::Approved),
                (AppointmentStatus::Pending, AppointmentStatus::Cancelled),
                (AppointmentStatus::Approved, AppointmentStatus::Completed),
            ]
        );
    }

    #[test]
    fn terminal_states_offer_no_actions() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.is_terminal(), TransitionAction::available_for(status).is_empty());
        }
    }

    #[test]
    fn actions_target_legal_edges() {
        for status in AppointmentStatus::ALL {
            for action in TransitionAction::available_for(status) {
                assert!(status.can_transition_to(action.target()));
            }
        }
    }

    #[test]
    fn new_record_is_pending() {
        let cardio = doctor("D1", "Sarah Khan", "Cardiology");
        let appointment = Appointment::pending("A1".into(), &request("P1", "D1", 2), &cardio);
        assert_eq!(appointment.status(), AppointmentStatus::Pending);
        assert_eq!(appointment.doctor_name(), Some("Sarah Khan"));
        assert_eq!(appointment.department(), "Cardiology");
    }

    #[test]
    fn transition_rejects_skipping_approval() {
        let cardio = doctor("D1", "Sarah Khan", "Cardiology");
        let mut appointment = Appointment::pending("A2".into(), &request("P1", "D1", 2), &cardio);
        let err = appointment.transition_to(AppointmentStatus::Completed).unwrap_err();
        assert!(matches!(err, StoreError::IllegalTransition { ref id, .. } if id == "A2"));
        assert_eq!(appointment.status(), AppointmentStatus::Pending);
    }

    #[test]
    fn transition_returns_previous_status() {
        let cardio = doctor("D1", "Sarah Khan", "Cardiology");
        let mut appointment = Appointment::pending("A1".into(), &request("P1", "D1", 2), &cardio);
        assert_eq!(
            appointment.transition_to(AppointmentStatus::Approved).unwrap(),
            AppointmentStatus::Pending
        );
        assert_eq!(
            appointment.transition_to(AppointmentStatus::Completed).unwrap(),
            AppointmentStatus::Approved
        );
        assert!(appointment.transition_to(AppointmentStatus::Approved).is_err());
    }

    #[test]
    fn validate_rejects_past_instant() {
        let mut request = request("P1", "D1", 1);
        request.scheduled_at = Utc::now() - Duration::minutes(5);
        assert!(matches!(request.validate(Utc::now()), Err(StoreError::Validation(_))));
    }

    #[test]
    fn validate_rejects_blank_doctor() {
        let request = request("P1", "  ", 1);
        assert!(request.validate(Utc::now()).is_err());
    }

    #[test]
    fn status_filter_all_sentinel() {
        assert_eq!(StatusFilter::from_string("ALL").unwrap(), StatusFilter::All);
        let pending = StatusFilter::from_string("pending").unwrap();
        assert!(pending.matches(AppointmentStatus::Pending));
        assert!(!pending.matches(AppointmentStatus::Approved));
        assert!(StatusFilter::All.matches(AppointmentStatus::Completed));
    }

    #[test]
    fn wire_format_uses_portal_field_names() {
        let json = r#"{
            "_id": "65f0c1",
            "patientId": "P1",
            "doctorId": "D1",
            "doctorName": "Sarah Khan",
            "department": "Cardiology",
            "date": "2030-05-01T09:30:00Z",
            "description": "checkup",
            "status": "approved"
        }"#;
        let appointment: Appointment = serde_json::from_str(json).unwrap();
        assert_eq!(appointment.id(), "65f0c1");
        assert_eq!(appointment.status(), AppointmentStatus::Approved);
        assert_eq!(appointment.notes(), None);
        assert_eq!(appointment.patient_name(), None);

        let value = serde_json::to_value(&appointment).unwrap();
        assert_eq!(value["_id"], "65f0c1");
        assert_eq!(value["status"], "approved");
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn doctor_accepts_either_id_key() {
        let doctor: Doctor =
            serde_json::from_str(r#"{"id": "D9", "name": "Omar Farooq", "specialization": "Neurology"}"#).unwrap();
        assert_eq!(doctor.id, "D9");
    }

    #[test]
    fn optional_text_trims_blank() {
        assert_eq!(optional_text("   "), None);
        assert_eq!(optional_text(" chest pain "), Some("chest pain".to_string()));
    }
}
