use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub organization: String,
    pub certificate_id: Option<String>,
    pub certificate_issued_at: Option<DateTime<Utc>>,
}

impl Registration {
    /// Issued means a certificate id has been recorded, nothing else.
    pub fn is_issued(&self) -> bool {
        self.certificate_id
            .as_deref()
            .map_or(false, |id| !id.trim().is_empty())
    }
}

/// Participant-supplied fields, used for both submission and admin edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationForm {
    pub title: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub organization: String,
}

impl RegistrationForm {
    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            organization: self.organization.trim().to_string(),
        }
    }
}
