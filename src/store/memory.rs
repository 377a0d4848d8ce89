/// In-process appointment store.
///
/// Holds the doctor directory and every appointment record. Enforces the same
/// rules the portal backend does: required fields, no double booking of a
/// doctor's slot, and the status state machine. Records are never removed.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use super::AppointmentStore;
use crate::error::StoreError;
use crate::models::{Appointment, AppointmentStatus, Doctor, NewAppointment, Role};

/// Length of a bookable slot when none is configured.
pub const DEFAULT_SLOT_MINUTES: i64 = 30;

pub struct MemoryStore {
    slot: TimeDelta,
    doctors: Vec<Doctor>,
    patients: HashMap<String, String>,
    appointments: Mutex<HashMap<String, Appointment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            slot: TimeDelta::minutes(DEFAULT_SLOT_MINUTES),
            doctors: Vec::new(),
            patients: HashMap::new(),
            appointments: Mutex::new(HashMap::new()),
        }
    }

    /// Seeded directory for the interactive demo.
    pub fn demo() -> Self {
        let doctors = [
            ("D1", "Sarah Khan", "Cardiology"),
            ("D2", "Omar Farooq", "Neurology"),
            ("D3", "Ayesha Malik", "Cardiology"),
            ("D4", "John Reed", "Pediatrics"),
        ];
        let mut store = MemoryStore::new();
        for (id, name, specialization) in doctors {
            store.doctors.push(Doctor {
                id: id.to_string(),
                name: name.to_string(),
                specialization: specialization.to_string(),
            });
        }
        store
            .with_patient("P1", "John Smith")
            .with_patient("P2", "Jane Doe")
    }

    pub fn with_slot_minutes(mut self, minutes: i64) -> Result<Self, StoreError> {
        self.slot = TimeDelta::try_minutes(minutes)
            .filter(|slot| *slot > TimeDelta::zero())
            .ok_or_else(|| StoreError::Validation(format!("Slot duration out of range: {minutes} minutes")))?;
        Ok(self)
    }

    pub fn with_doctor(mut self, doctor: Doctor) -> Result<Self, StoreError> {
        if self.doctors.iter().any(|d| d.id == doctor.id) {
            return Err(StoreError::Validation(format!("Doctor {} already registered", doctor.id)));
        }
        self.doctors.push(doctor);
        Ok(self)
    }

    pub fn with_patient(mut self, patient_id: &str, name: &str) -> Self {
        self.patients.insert(patient_id.to_string(), name.to_string());
        self
    }

    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    /// Get an appointment by its ID.
    pub fn get(&self, appointment_id: &str) -> Result<Option<Appointment>, StoreError> {
        Ok(self.records()?.get(appointment_id).cloned())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records()?.len())
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<String, Appointment>>, StoreError> {
        self.appointments
            .lock()
            .map_err(|_| StoreError::Internal("appointment table lock poisoned".to_string()))
    }

    fn authorize(token: &str) -> Result<(), StoreError> {
        if token.trim().is_empty() {
            return Err(StoreError::Unauthorized);
        }
        Ok(())
    }

    fn find_doctor(&self, doctor_id: &str) -> Result<&Doctor, StoreError> {
        self.doctors
            .iter()
            .find(|d| d.id == doctor_id)
            .ok_or_else(|| StoreError::Validation(format!("Unknown doctor: {doctor_id}")))
    }

    /// Start and end of the slot a request would occupy.
    fn slot_bounds(&self, request: &NewAppointment) -> Result<(DateTime<Utc>, DateTime<Utc>), StoreError> {
        let start = request.scheduled_at;
        let end = start
            .checked_add_signed(self.slot)
            .ok_or_else(|| StoreError::Validation(format!("Appointment time {start} is out of range")))?;
        Ok((start, end))
    }

    /// Check the doctor has no live booking overlapping `start..end`.
    fn check_slot_free(
        &self,
        records: &HashMap<String, Appointment>,
        doctor_id: &str,
        (start, end): (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<(), StoreError> {
        for existing in records.values() {
            if existing.doctor_id() != doctor_id || existing.status() == AppointmentStatus::Cancelled {
                continue;
            }
            let other_start = existing.scheduled_at();
            let other_end = other_start
                .checked_add_signed(self.slot)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            if start < other_end && end > other_start {
                return Err(StoreError::Conflict(format!(
                    "Doctor {} is already booked at {}",
                    doctor_id,
                    other_start.format("%Y-%m-%d %H:%M")
                )));
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentStore for MemoryStore {
    async fn list_specialties(&self, token: &str) -> Result<Vec<String>, StoreError> {
        Self::authorize(token)?;
        let specialties: BTreeSet<&str> = self.doctors.iter().map(|d| d.specialization.as_str()).collect();
        Ok(specialties.into_iter().map(str::to_string).collect())
    }

    async fn list_available_doctors(&self, token: &str, specialty: &str) -> Result<Vec<Doctor>, StoreError> {
        Self::authorize(token)?;
        let specialty = specialty.trim();
        if specialty.is_empty() {
            return Err(StoreError::Validation("Specialty is required".to_string()));
        }
        Ok(self
            .doctors
            .iter()
            .filter(|d| d.specialization.eq_ignore_ascii_case(specialty))
            .cloned()
            .collect())
    }

    async fn list_appointments(
        &self,
        token: &str,
        owner_role: Role,
        owner_id: &str,
    ) -> Result<Vec<Appointment>, StoreError> {
        Self::authorize(token)?;
        let records = self.records()?;
        let mut owned: Vec<Appointment> = records
            .values()
            .filter(|a| match owner_role {
                Role::Patient => a.patient_id() == owner_id,
                Role::Doctor => a.doctor_id() == owner_id,
            })
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.scheduled_at().cmp(&b.scheduled_at()).then_with(|| a.id().cmp(b.id())));
        tracing::debug!(role = %owner_role, owner_id, count = owned.len(), "Listed appointments");
        Ok(owned)
    }

    async fn create_appointment(&self, token: &str, request: &NewAppointment) -> Result<Appointment, StoreError> {
        Self::authorize(token)?;
        request.validate(Utc::now())?;
        let doctor = self.find_doctor(&request.doctor_id)?;
        let bounds = self.slot_bounds(request)?;

        let mut records = self.records()?;
        self.check_slot_free(&records, &request.doctor_id, bounds)?;

        let appointment = Appointment::pending(Uuid::new_v4().to_string(), request, doctor)
            .with_patient_name(self.patients.get(&request.patient_id).cloned());
        records.insert(appointment.id().to_string(), appointment.clone());

        tracing::info!(
            appointment_id = %appointment.id(),
            patient_id = %request.patient_id,
            doctor_id = %request.doctor_id,
            "Appointment requested"
        );
        Ok(appointment)
    }

    async fn set_appointment_status(
        &self,
        token: &str,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<AppointmentStatus, StoreError> {
        Self::authorize(token)?;
        let mut records = self.records()?;
        let appointment = records
            .get_mut(appointment_id)
            .ok_or_else(|| StoreError::NotFound(appointment_id.to_string()))?;

        match appointment.transition_to(status) {
            Ok(previous) => {
                tracing::info!(appointment_id, from = %previous, to = %status, "Appointment status changed");
                Ok(appointment.status())
            }
            Err(e) => {
                tracing::warn!(appointment_id, error = %e, "Rejected status change");
                Err(e)
            }
        }
    }
}

impl std::fmt::Display for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let appointments = self.records().map(|r| r.len()).unwrap_or(0);
        write!(
            f,
            "MemoryStore(doctors={}, appointments={})",
            self.doctors.len(),
            appointments
        )
    }
}
