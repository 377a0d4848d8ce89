/// Signed-in portal session.
///
/// Created at login with the identity and bearer token handed over by the
/// authentication service, passed explicitly to every view operation, and
/// invalidated at logout. A closed session refuses to hand out its token.

use chrono::{DateTime, Utc};

use crate::error::PortalError;
use crate::models::Role;

#[derive(Debug)]
pub struct Session {
    role: Role,
    user_id: String,
    token: Option<String>,
    opened_at: DateTime<Utc>,
}

impl Session {
    pub fn login(role: Role, user_id: &str, token: &str) -> Result<Self, PortalError> {
        if user_id.trim().is_empty() {
            return Err(PortalError::Config("user id cannot be empty".to_string()));
        }
        if token.trim().is_empty() {
            return Err(PortalError::Config("bearer token cannot be empty".to_string()));
        }

        tracing::info!(role = %role, user_id, "Session opened");
        Ok(Session {
            role,
            user_id: user_id.trim().to_string(),
            token: Some(token.trim().to_string()),
            opened_at: Utc::now(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    /// Bearer credential for store requests.
    pub fn bearer(&self) -> Result<&str, PortalError> {
        self.token.as_deref().ok_or(PortalError::SessionClosed)
    }

    /// Check the session is open and belongs to `role`.
    pub fn require(&self, role: Role) -> Result<&str, PortalError> {
        let token = self.bearer()?;
        if self.role != role {
            return Err(PortalError::WrongRole {
                expected: role,
                actual: self.role,
            });
        }
        Ok(token)
    }

    pub fn logout(&mut self) {
        if self.token.take().is_some() {
            tracing::info!(role = %self.role, user_id = %self.user_id, opened_at = %self.opened_at, "Session closed");
        }
    }
}
