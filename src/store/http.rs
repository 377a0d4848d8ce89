/// REST client for the portal backend.
///
/// Endpoints (all carry `Authorization: Bearer <token>`):
/// - `GET  /appointments/departments`
/// - `GET  /appointments/staff/available?specialty=S`
/// - `GET  /appointments/mine/{patientId}`
/// - `GET  /api/appointments/{doctorId}`
/// - `POST /appointments/add`
/// - `PUT  /api/appointments/{id}/status` with `{"status": ...}`

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::AppointmentStore;
use crate::error::StoreError;
use crate::models::{Appointment, AppointmentStatus, Doctor, NewAppointment, Role};

/// What a request was about, for mapping HTTP failures.
#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    Listing,
    Create,
    Status(&'a str),
}

#[derive(Serialize)]
struct StatusBody {
    status: AppointmentStatus,
}

pub struct HttpStore {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::Internal(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Internal(format!("'{base_url}' cannot be used as a base URL")));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Join path segments onto the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::Internal("base URL cannot carry a path".to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Send with the bearer token; non-success statuses become store errors.
    async fn execute(&self, request: RequestBuilder, token: &str, target: Target<'_>) -> Result<Response, StoreError> {
        let response = request.bearer_auth(token).send().await.map_err(|e| {
            tracing::warn!(error = %e, "Portal backend unreachable");
            StoreError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = error_for_status(status, &body, target);
            tracing::warn!(%status, error = %err, "Portal backend rejected request");
            return Err(err);
        }
        Ok(response)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: &str,
        target: Target<'_>,
    ) -> Result<T, StoreError> {
        self.execute(request, token, target)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

/// Status echoed in a success body: the updated record, `{"appointment": {...}}`,
/// or nothing usable.
fn acknowledged_status(body: &str) -> Option<AppointmentStatus> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let status = value
        .get("status")
        .or_else(|| value.get("appointment").and_then(|a| a.get("status")))?;
    serde_json::from_value(status.clone()).ok()
}

/// Pull a human-readable message out of an error body.
fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message", "msg"] {
            match value.get(key) {
                Some(serde_json::Value::String(text)) => return text.clone(),
                Some(nested) => {
                    if let Some(text) = nested.get("message").and_then(|m| m.as_str()) {
                        return text.to_string();
                    }
                }
                None => {}
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        trimmed.to_string()
    }
}

fn error_for_status(status: StatusCode, body: &str, target: Target<'_>) -> StoreError {
    let detail = error_detail(status, body);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => StoreError::Validation(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized,
        StatusCode::NOT_FOUND => match target {
            Target::Status(id) => StoreError::NotFound(id.to_string()),
            _ => StoreError::NotFound(detail),
        },
        StatusCode::CONFLICT => match target {
            Target::Status(id) => StoreError::IllegalTransition {
                id: id.to_string(),
                detail,
            },
            _ => StoreError::Conflict(detail),
        },
        _ => StoreError::Network(format!("HTTP {status}: {detail}")),
    }
}

impl AppointmentStore for HttpStore {
    async fn list_specialties(&self, token: &str) -> Result<Vec<String>, StoreError> {
        let url = self.endpoint(&["appointments", "departments"])?;
        self.send(self.client.get(url), token, Target::Listing).await
    }

    async fn list_available_doctors(&self, token: &str, specialty: &str) -> Result<Vec<Doctor>, StoreError> {
        let url = self.endpoint(&["appointments", "staff", "available"])?;
        let request = self.client.get(url).query(&[("specialty", specialty)]);
        self.send(request, token, Target::Listing).await
    }

    async fn list_appointments(
        &self,
        token: &str,
        owner_role: Role,
        owner_id: &str,
    ) -> Result<Vec<Appointment>, StoreError> {
        let url = match owner_role {
            Role::Patient => self.endpoint(&["appointments", "mine", owner_id])?,
            Role::Doctor => self.endpoint(&["api", "appointments", owner_id])?,
        };
        let appointments: Vec<Appointment> = self.send(self.client.get(url), token, Target::Listing).await?;
        tracing::debug!(role = %owner_role, owner_id, count = appointments.len(), "Fetched appointments");
        Ok(appointments)
    }

    async fn create_appointment(&self, token: &str, request: &NewAppointment) -> Result<Appointment, StoreError> {
        let url = self.endpoint(&["appointments", "add"])?;
        let created: Appointment = self
            .send(self.client.post(url).json(request), token, Target::Create)
            .await?;
        tracing::info!(appointment_id = %created.id(), doctor_id = %request.doctor_id, "Appointment requested");
        Ok(created)
    }

    async fn set_appointment_status(
        &self,
        token: &str,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<AppointmentStatus, StoreError> {
        let url = self.endpoint(&["api", "appointments", appointment_id, "status"])?;
        let request = self.client.put(url).json(&StatusBody { status });
        let response = self.execute(request, token, Target::Status(appointment_id)).await?;

        // Any 2xx commits the change; the body only confirms which status
        let body = response.text().await.unwrap_or_default();
        let acknowledged = acknowledged_status(&body).unwrap_or(status);
        tracing::info!(appointment_id, status = %acknowledged, "Appointment status changed");
        Ok(acknowledged)
    }
}
