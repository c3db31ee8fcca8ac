//! Issuing, re-sending, previewing and verifying certificates.
//!
//! Every issue goes render -> record -> deliver. The record step is a
//! conditional write, so a registration gets at most one certificate id even
//! when two admins press "generate" at the same time. Delivery happens after
//! the write; if it fails the certificate still exists and the caller gets a
//! partial success instead of an error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    content_scope, generate_certificate_id, issued_label, CertificateRequest, LayoutConfig,
    ProgramContent, LAYOUT_SCOPE,
};
use crate::db::{Registration, Store, StoreError};
use crate::mail::{render_certificate_email, CertificateEmail, MailError, Mailer};
use crate::pdf::{RenderCertificate, RenderError};

pub const PREVIEW_RECIPIENT: &str = "Test Participant";
pub const PREVIEW_CERTIFICATE_ID: &str = "CERT-PREVIEW-0001";

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("certificate already issued ({certificate_id})")]
    AlreadyIssued { certificate_id: String },

    #[error("no certificate has been issued for {0}")]
    NotIssued(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOutcome {
    pub registration_id: i64,
    pub certificate_id: String,
    pub issued_at: DateTime<Utc>,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkSummary {
    pub generated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub undelivered: u32,
    pub errors: Vec<String>,
}

/// How an admin points at an already issued certificate.
#[derive(Debug, Clone, PartialEq)]
pub enum ResendTarget {
    CertificateId(String),
    Email(String),
}

/// Public view of an issued certificate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCertificate {
    pub certificate_id: String,
    pub name: String,
    pub organization: String,
    pub issued_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct CertificateService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    renderer: Arc<dyn RenderCertificate>,
    default_event_id: String,
}

impl CertificateService {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn RenderCertificate>,
        default_event_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            renderer,
            default_event_id: default_event_id.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn default_event_id(&self) -> &str {
        &self.default_event_id
    }

    fn event_or_default<'a>(&'a self, event_id: Option<&'a str>) -> &'a str {
        event_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.default_event_id)
    }

    pub async fn load_layout(&self) -> Result<LayoutConfig, IssueError> {
        let rows = self.store.load_settings(LAYOUT_SCOPE).await?;
        Ok(LayoutConfig::from_rows(&rows))
    }

    pub async fn save_layout(&self, layout: &LayoutConfig) -> Result<(), IssueError> {
        self.store.save_settings(LAYOUT_SCOPE, &layout.to_rows()).await?;
        info!("Certificate layout updated");
        Ok(())
    }

    pub async fn load_content(&self, event_id: Option<&str>) -> Result<ProgramContent, IssueError> {
        let scope = content_scope(self.event_or_default(event_id));
        let rows = self.store.load_settings(&scope).await?;
        Ok(ProgramContent::from_rows(&rows))
    }

    pub async fn save_content(
        &self,
        event_id: &str,
        content: &ProgramContent,
    ) -> Result<(), IssueError> {
        let event_id = self.event_or_default(Some(event_id));
        self.store
            .save_settings(&content_scope(event_id), &content.to_rows())
            .await?;
        info!("Certificate content for event {} updated", event_id);
        Ok(())
    }

    /// Issues the first certificate for a registration and emails it.
    pub async fn issue(
        &self,
        registration_id: i64,
        event_id: Option<&str>,
    ) -> Result<IssueOutcome, IssueError> {
        let registration = self
            .store
            .get_registration(registration_id)
            .await?
            .ok_or_else(|| IssueError::NotFound(format!("Registration {}", registration_id)))?;

        if let Some(certificate_id) = issued_id(&registration) {
            return Err(IssueError::AlreadyIssued { certificate_id });
        }

        let layout = self.load_layout().await?;
        let content = self.load_content(event_id).await?;
        self.issue_with(&registration, &layout, &content).await
    }

    /// Issues certificates for many registrations, loading settings once.
    /// A failing row never stops the batch.
    pub async fn bulk_issue(
        &self,
        registration_ids: &[i64],
        event_id: Option<&str>,
    ) -> Result<BulkSummary, IssueError> {
        let layout = self.load_layout().await?;
        let content = self.load_content(event_id).await?;
        let mut summary = BulkSummary::default();

        for &id in registration_ids {
            let registration = match self.store.get_registration(id).await {
                Ok(Some(registration)) => registration,
                Ok(None) => {
                    summary.failed += 1;
                    summary.errors.push(format!("Registration {}: not found", id));
                    continue;
                }
                Err(e) => {
                    summary.failed += 1;
                    summary.errors.push(format!("Registration {}: {}", id, e));
                    continue;
                }
            };

            if registration.is_issued() {
                summary.skipped += 1;
                continue;
            }

            match self.issue_with(&registration, &layout, &content).await {
                Ok(outcome) => {
                    summary.generated += 1;
                    if let Some(err) = outcome.delivery_error {
                        summary.undelivered += 1;
                        summary.errors.push(format!(
                            "Registration {}: issued but not delivered: {}",
                            id, err
                        ));
                    }
                }
                Err(IssueError::AlreadyIssued { .. }) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    summary.errors.push(format!("Registration {}: {}", id, e));
                }
            }
        }

        info!(
            "Bulk issue finished: {} generated, {} skipped, {} failed, {} undelivered",
            summary.generated, summary.skipped, summary.failed, summary.undelivered
        );
        Ok(summary)
    }

    async fn issue_with(
        &self,
        registration: &Registration,
        layout: &LayoutConfig,
        content: &ProgramContent,
    ) -> Result<IssueOutcome, IssueError> {
        let certificate_id = generate_certificate_id();
        let issued_at = Utc::now();
        let request = CertificateRequest::new(
            registration.name.clone(),
            certificate_id.clone(),
            issued_label(issued_at),
        );
        let pdf = self.renderer.render(&request, layout, content)?;

        let recorded = self
            .store
            .record_certificate(registration.id, &certificate_id, issued_at)
            .await?;
        if !recorded {
            // Someone else got there first, or the row vanished.
            let current = self.store.get_registration(registration.id).await?;
            return match current.as_ref().and_then(issued_id) {
                Some(certificate_id) => Err(IssueError::AlreadyIssued { certificate_id }),
                None => Err(IssueError::NotFound(format!("Registration {}", registration.id))),
            };
        }
        info!(
            "Issued certificate {} to registration {}",
            certificate_id, registration.id
        );

        let email = CertificateEmail {
            to: registration.email.clone(),
            recipient_name: registration.name.clone(),
            program_name: content.program_name.clone(),
            institution: content.institution.clone(),
            certificate_id: Some(certificate_id.clone()),
            pdf,
        };
        let delivery_error = match self.mailer.send_certificate(&email).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Certificate {} issued but not delivered: {}", certificate_id, e);
                Some(e.to_string())
            }
        };

        Ok(IssueOutcome {
            registration_id: registration.id,
            certificate_id,
            issued_at,
            delivered: delivery_error.is_none(),
            delivery_error,
        })
    }

    /// Re-sends an issued certificate with its stored id and issue date.
    pub async fn resend(
        &self,
        target: &ResendTarget,
        event_id: Option<&str>,
    ) -> Result<IssueOutcome, IssueError> {
        let registration = match target {
            ResendTarget::CertificateId(id) => self
                .store
                .find_by_certificate_id(id)
                .await?
                .ok_or_else(|| IssueError::NotFound(format!("Certificate {}", id.trim())))?,
            ResendTarget::Email(email) => self
                .store
                .find_by_email(email)
                .await?
                .ok_or_else(|| IssueError::NotFound(format!("Registration for {}", email.trim())))?,
        };

        let certificate_id = issued_id(&registration)
            .ok_or_else(|| IssueError::NotIssued(registration.email.clone()))?;
        let issued_at = registration.certificate_issued_at.unwrap_or(registration.created_at);

        let layout = self.load_layout().await?;
        let content = self.load_content(event_id).await?;
        let request = CertificateRequest::new(
            registration.name.clone(),
            certificate_id.clone(),
            issued_label(issued_at),
        );
        let pdf = self.renderer.render(&request, &layout, &content)?;

        self.mailer
            .send_certificate(&CertificateEmail {
                to: registration.email.clone(),
                recipient_name: registration.name.clone(),
                program_name: content.program_name.clone(),
                institution: content.institution.clone(),
                certificate_id: Some(certificate_id.clone()),
                pdf,
            })
            .await?;
        info!("Re-sent certificate {} to {}", certificate_id, registration.email);

        Ok(IssueOutcome {
            registration_id: registration.id,
            certificate_id,
            issued_at,
            delivered: true,
            delivery_error: None,
        })
    }

    /// Renders a sample certificate with the current settings. Never writes.
    pub async fn preview(&self, event_id: Option<&str>) -> Result<Vec<u8>, IssueError> {
        let layout = self.load_layout().await?;
        let scope = content_scope(self.event_or_default(event_id));
        let rows = self.store.load_settings(&scope).await?;
        let content = if rows.is_empty() {
            ProgramContent::sample()
        } else {
            ProgramContent::from_rows(&rows)
        };

        let request = CertificateRequest::new(
            PREVIEW_RECIPIENT,
            PREVIEW_CERTIFICATE_ID,
            issued_label(Utc::now()),
        );
        Ok(self.renderer.render(&request, &layout, &content)?)
    }

    /// Renders and emails a certificate that is not recorded anywhere.
    pub async fn send_test(
        &self,
        to: &str,
        recipient_name: &str,
        certificate_id: Option<&str>,
    ) -> Result<(), IssueError> {
        let layout = self.load_layout().await?;
        let content = self.load_content(None).await?;
        let certificate_id = certificate_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(PREVIEW_CERTIFICATE_ID);

        let request = CertificateRequest::new(
            recipient_name,
            certificate_id,
            issued_label(Utc::now()),
        );
        let pdf = self.renderer.render(&request, &layout, &content)?;

        self.mailer
            .send_certificate(&CertificateEmail {
                to: to.trim().to_string(),
                recipient_name: recipient_name.to_string(),
                program_name: content.program_name,
                institution: content.institution,
                certificate_id: Some(certificate_id.to_string()),
                pdf,
            })
            .await?;
        info!("Sent test certificate to {}", to.trim());
        Ok(())
    }

    /// HTML body of the certificate email for the default event.
    pub async fn email_preview(&self, recipient_name: &str) -> Result<String, IssueError> {
        let content = self.load_content(None).await?;
        render_certificate_email(
            recipient_name,
            &content.program_name,
            &content.institution,
            Some(PREVIEW_CERTIFICATE_ID),
        )
        .map_err(|e| IssueError::Mail(MailError::Template(e)))
    }

    pub async fn verify(&self, certificate_id: &str) -> Result<VerifiedCertificate, IssueError> {
        let registration = self
            .store
            .find_by_certificate_id(certificate_id)
            .await?
            .ok_or_else(|| IssueError::NotFound(format!("Certificate {}", certificate_id.trim())))?;

        let certificate_id = issued_id(&registration)
            .ok_or_else(|| IssueError::NotIssued(registration.email.clone()))?;

        Ok(VerifiedCertificate {
            certificate_id,
            name: registration.name,
            organization: registration.organization,
            issued_at: registration.certificate_issued_at,
        })
    }
}

fn issued_id(registration: &Registration) -> Option<String> {
    registration
        .certificate_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
