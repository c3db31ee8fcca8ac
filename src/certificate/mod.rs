//! Certificate domain types and the key/value settings boundary.
//!
//! Layout and content settings live in the store as loose `key -> value`
//! rows. Everything is typed and default-filled here, so the renderer never
//! has to guess about a missing field.

pub mod issuance;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use uuid::Uuid;

pub use issuance::{
    BulkSummary, CertificateService, IssueError, IssueOutcome, ResendTarget, VerifiedCertificate,
    PREVIEW_CERTIFICATE_ID, PREVIEW_RECIPIENT,
};

pub const DEFAULT_TITLE: &str = "Certificate of Participation";
pub const DEFAULT_EVENT_KIND: &str = "Event";
pub const DEFAULT_BORDER_COLOR: &str = "#DAA520";
pub const DEFAULT_TITLE_COLOR: &str = "#1E3A8A";

pub const COORDINATOR_LABEL: &str = "Coordinator";
pub const HOD_LABEL: &str = "Head of Department";

/// Settings scope holding the organisation-wide layout.
pub const LAYOUT_SCOPE: &str = "certificate-config";

pub fn content_scope(event_id: &str) -> String {
    format!("certificate-content:{}", event_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    /// Anything that is not `portrait` lays out as landscape.
    pub fn from_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("portrait") {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl Serialize for Orientation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Orientation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Orientation::from_value).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureCount {
    Zero,
    One,
    #[default]
    Two,
}

impl SignatureCount {
    /// Unrecognised counts fall back to two signatures.
    pub fn from_value(value: &str) -> Self {
        match value.trim() {
            "0" => SignatureCount::Zero,
            "1" => SignatureCount::One,
            _ => SignatureCount::Two,
        }
    }

    pub fn count(&self) -> u8 {
        match self {
            SignatureCount::Zero => 0,
            SignatureCount::One => 1,
            SignatureCount::Two => 2,
        }
    }
}

impl Serialize for SignatureCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.count())
    }
}

impl<'de> Deserialize<'de> for SignatureCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match raw {
            serde_json::Value::Number(n) => SignatureCount::from_value(&n.to_string()),
            serde_json::Value::String(s) => SignatureCount::from_value(&s),
            _ => SignatureCount::default(),
        })
    }
}

/// Visual and structural settings, independent of any event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub title: String,
    #[serde(alias = "eventType")]
    pub event_kind: String,
    pub orientation: Orientation,
    pub signature_count: SignatureCount,
    pub watermark_enabled: bool,
    pub border_color: String,
    pub title_color: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            event_kind: DEFAULT_EVENT_KIND.to_string(),
            orientation: Orientation::Landscape,
            signature_count: SignatureCount::Two,
            watermark_enabled: false,
            border_color: DEFAULT_BORDER_COLOR.to_string(),
            title_color: DEFAULT_TITLE_COLOR.to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn from_rows(rows: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, fallback: String| {
            rows.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(fallback)
        };

        let event_kind = rows
            .get("eventKind")
            .or_else(|| rows.get("eventType"))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or(defaults.event_kind);

        Self {
            title: text("title", defaults.title),
            event_kind,
            orientation: rows
                .get("orientation")
                .map(|v| Orientation::from_value(v))
                .unwrap_or_default(),
            signature_count: rows
                .get("signatureCount")
                .map(|v| SignatureCount::from_value(v))
                .unwrap_or_default(),
            watermark_enabled: rows.get("watermarkEnabled").map(|v| v.trim()) == Some("true"),
            border_color: text("borderColor", defaults.border_color),
            title_color: text("titleColor", defaults.title_color),
        }
    }

    pub fn to_rows(&self) -> Vec<(String, String)> {
        vec![
            ("title".to_string(), self.title.clone()),
            ("eventKind".to_string(), self.event_kind.clone()),
            ("orientation".to_string(), self.orientation.as_str().to_string()),
            ("signatureCount".to_string(), self.signature_count.count().to_string()),
            ("watermarkEnabled".to_string(), self.watermark_enabled.to_string()),
            ("borderColor".to_string(), self.border_color.clone()),
            ("titleColor".to_string(), self.title_color.clone()),
        ]
    }
}

/// Event-specific text interpolated into the certificate body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgramContent {
    pub program_name: String,
    pub program_dates: String,
    pub department: String,
    pub faculty: String,
    pub institution: String,
    pub location: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub coordinator_name: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub hod_name: Option<String>,
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(non_blank(raw.as_deref()))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ProgramContent {
    pub fn from_rows(rows: &HashMap<String, String>) -> Self {
        let text = |key: &str| rows.get(key).map(|v| v.trim().to_string()).unwrap_or_default();
        Self {
            program_name: text("programName"),
            program_dates: text("programDates"),
            department: text("department"),
            faculty: text("faculty"),
            institution: text("institution"),
            location: text("location"),
            coordinator_name: non_blank(rows.get("coordinatorName").map(String::as_str)),
            hod_name: non_blank(rows.get("hodName").map(String::as_str)),
        }
    }

    pub fn to_rows(&self) -> Vec<(String, String)> {
        vec![
            ("programName".to_string(), self.program_name.clone()),
            ("programDates".to_string(), self.program_dates.clone()),
            ("department".to_string(), self.department.clone()),
            ("faculty".to_string(), self.faculty.clone()),
            ("institution".to_string(), self.institution.clone()),
            ("location".to_string(), self.location.clone()),
            ("coordinatorName".to_string(), self.coordinator_name.clone().unwrap_or_default()),
            ("hodName".to_string(), self.hod_name.clone().unwrap_or_default()),
        ]
    }

    /// Placeholder content so a preview renders before an event is configured.
    pub fn sample() -> Self {
        Self {
            program_name: "Sample Program".to_string(),
            program_dates: "01 Jan 2025 - 02 Jan 2025".to_string(),
            department: "Department Name".to_string(),
            faculty: "Faculty Name".to_string(),
            institution: "Institution Name".to_string(),
            location: "Location".to_string(),
            coordinator_name: None,
            hod_name: None,
        }
    }

    pub fn coordinator_label(&self) -> &str {
        self.coordinator_name.as_deref().unwrap_or(COORDINATOR_LABEL)
    }

    pub fn hod_label(&self) -> &str {
        self.hod_name.as_deref().unwrap_or(HOD_LABEL)
    }
}

/// Per-document input. Built once by the caller and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateRequest {
    recipient_name: String,
    certificate_id: String,
    issued_at: String,
}

impl CertificateRequest {
    pub fn new(
        recipient_name: impl Into<String>,
        certificate_id: impl Into<String>,
        issued_at: impl Into<String>,
    ) -> Self {
        Self {
            recipient_name: recipient_name.into(),
            certificate_id: certificate_id.into(),
            issued_at: issued_at.into(),
        }
    }

    pub fn recipient_name(&self) -> &str {
        &self.recipient_name
    }

    pub fn certificate_id(&self) -> &str {
        &self.certificate_id
    }

    pub fn issued_at(&self) -> &str {
        &self.issued_at
    }
}

pub fn generate_certificate_id() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("CERT-{}", token[..8].to_uppercase())
}

/// Human-readable date label printed in the footer.
pub fn issued_label(at: chrono::DateTime<Utc>) -> String {
    at.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_rows_fill_layout_defaults() {
        let layout = LayoutConfig::from_rows(&HashMap::new());
        assert_eq!(layout, LayoutConfig::default());
        assert_eq!(layout.title, "Certificate of Participation");
        assert_eq!(layout.orientation, Orientation::Landscape);
        assert_eq!(layout.signature_count, SignatureCount::Two);
    }

    #[test]
    fn unknown_orientation_and_signature_count_use_safe_defaults() {
        let layout = LayoutConfig::from_rows(&rows(&[
            ("orientation", "sideways"),
            ("signatureCount", "7"),
            ("watermarkEnabled", "yes"),
        ]));
        assert_eq!(layout.orientation, Orientation::Landscape);
        assert_eq!(layout.signature_count, SignatureCount::Two);
        assert!(!layout.watermark_enabled);
    }

    #[test]
    fn legacy_event_type_key_is_read() {
        let layout = LayoutConfig::from_rows(&rows(&[
            ("eventType", "FDP"),
            ("orientation", "Portrait"),
            ("signatureCount", "1"),
            ("watermarkEnabled", "true"),
        ]));
        assert_eq!(layout.event_kind, "FDP");
        assert_eq!(layout.orientation, Orientation::Portrait);
        assert_eq!(layout.signature_count, SignatureCount::One);
        assert!(layout.watermark_enabled);
    }

    #[test]
    fn layout_rows_survive_a_store_cycle() {
        let layout = LayoutConfig {
            title: "Certificate of Merit".to_string(),
            event_kind: "Hackathon".to_string(),
            orientation: Orientation::Portrait,
            signature_count: SignatureCount::Zero,
            watermark_enabled: true,
            ..LayoutConfig::default()
        };
        let stored: HashMap<String, String> = layout.to_rows().into_iter().collect();
        assert_eq!(LayoutConfig::from_rows(&stored), layout);
    }

    #[test]
    fn layout_json_accepts_string_and_number_counts() {
        let from_number: LayoutConfig =
            serde_json::from_str(r#"{"title":"T","signatureCount":1,"orientation":"portrait"}"#)
                .unwrap();
        assert_eq!(from_number.signature_count, SignatureCount::One);
        assert_eq!(from_number.orientation, Orientation::Portrait);
        assert_eq!(from_number.event_kind, "Event");

        let from_string: LayoutConfig =
            serde_json::from_str(r#"{"signatureCount":"0","eventType":"Seminar"}"#).unwrap();
        assert_eq!(from_string.signature_count, SignatureCount::Zero);
        assert_eq!(from_string.event_kind, "Seminar");

        let json = serde_json::to_value(&from_string).unwrap();
        assert_eq!(json["signatureCount"], 0);
        assert_eq!(json["orientation"], "landscape");
    }

    #[test]
    fn blank_signatory_names_are_absent() {
        let content = ProgramContent::from_rows(&rows(&[
            ("programName", "Intro to Testing"),
            ("coordinatorName", "  "),
            ("hodName", "Dr. Rao"),
        ]));
        assert_eq!(content.program_name, "Intro to Testing");
        assert_eq!(content.department, "");
        assert_eq!(content.coordinator_name, None);
        assert_eq!(content.coordinator_label(), "Coordinator");
        assert_eq!(content.hod_label(), "Dr. Rao");

        let json: ProgramContent =
            serde_json::from_str(r#"{"programName":"X","coordinatorName":""}"#).unwrap();
        assert_eq!(json.coordinator_name, None);
        assert_eq!(json.hod_label(), "Head of Department");
    }

    #[test]
    fn certificate_ids_have_the_issued_shape() {
        let id = generate_certificate_id();
        assert!(id.starts_with("CERT-"));
        assert_eq!(id.len(), 13);
        assert!(id[5..].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(id, generate_certificate_id());
    }
}
