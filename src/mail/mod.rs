//! Certificate delivery.
//!
//! The service only knows the [`Mailer`] trait. `HttpMailer` posts to a JSON
//! transactional-mail API; `LogMailer` is used when no API is configured and
//! just records what would have been sent.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tera::Context;
use thiserror::Error;
use tracing::{info, warn};

pub const ATTACHMENT_NAME: &str = "certificate.pdf";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email template error: {0}")]
    Template(#[from] tera::Error),

    #[error("mail API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail API rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// One certificate email with the rendered PDF attached.
#[derive(Debug, Clone)]
pub struct CertificateEmail {
    pub to: String,
    pub recipient_name: String,
    pub program_name: String,
    pub institution: String,
    pub certificate_id: Option<String>,
    pub pdf: Vec<u8>,
}

impl CertificateEmail {
    pub fn subject(&self) -> String {
        if self.program_name.trim().is_empty() {
            "Your Certificate".to_string()
        } else {
            format!("Your Certificate - {}", self.program_name)
        }
    }
}

pub fn render_certificate_email(
    recipient_name: &str,
    program_name: &str,
    institution: &str,
    certificate_id: Option<&str>,
) -> Result<String, tera::Error> {
    let mut ctx = Context::new();
    ctx.insert("recipient_name", recipient_name);
    ctx.insert("program_name", program_name);
    ctx.insert("institution", institution);
    ctx.insert("certificate_id", &certificate_id);
    crate::templates::get_tera().render("certificate_email.html", &ctx)
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_certificate(&self, email: &CertificateEmail) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    html: String,
    attachments: Vec<MailAttachment>,
}

#[derive(Debug, Serialize)]
struct MailAttachment {
    filename: &'static str,
    content_type: &'static str,
    content: String,
}

pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
    max_retries: u32,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>, from: String) -> Result<Self, MailError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
            max_retries: 3,
        })
    }

    fn payload<'a>(&'a self, email: &'a CertificateEmail) -> Result<MailRequest<'a>, MailError> {
        let html = render_certificate_email(
            &email.recipient_name,
            &email.program_name,
            &email.institution,
            email.certificate_id.as_deref(),
        )?;

        Ok(MailRequest {
            from: &self.from,
            to: vec![email.to.as_str()],
            subject: email.subject(),
            html,
            attachments: vec![MailAttachment {
                filename: ATTACHMENT_NAME,
                content_type: "application/pdf",
                content: STANDARD.encode(&email.pdf),
            }],
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_certificate(&self, email: &CertificateEmail) -> Result<(), MailError> {
        let body = self.payload(email)?;
        let mut retry_count = 0;
        let mut backoff = 2u64;

        loop {
            let mut request = self.client.post(&self.endpoint).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let error = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    info!("Certificate email sent to {}", email.to);
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    // Only throttling and server errors are worth another attempt.
                    if !(status.is_server_error() || status.as_u16() == 429) {
                        return Err(MailError::Rejected {
                            status: status.as_u16(),
                            body: text,
                        });
                    }
                    MailError::Rejected {
                        status: status.as_u16(),
                        body: text,
                    }
                }
                Err(e) => MailError::Http(e),
            };

            if retry_count >= self.max_retries {
                return Err(error);
            }

            warn!(
                "Sending certificate email to {} failed ({}), retrying in {}s",
                email.to, error, backoff
            );
            retry_count += 1;
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_certificate(&self, email: &CertificateEmail) -> Result<(), MailError> {
        render_certificate_email(
            &email.recipient_name,
            &email.program_name,
            &email.institution,
            email.certificate_id.as_deref(),
        )?;
        info!(
            "MAIL_API_URL not set; not sending \"{}\" to {} ({} byte attachment)",
            email.subject(),
            email.to,
            email.pdf.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> CertificateEmail {
        CertificateEmail {
            to: "jane@example.com".to_string(),
            recipient_name: "Jane <Doe>".to_string(),
            program_name: "Intro to Testing".to_string(),
            institution: "Example University".to_string(),
            certificate_id: Some("CERT-0001".to_string()),
            pdf: b"%PDF-1.3 test".to_vec(),
        }
    }

    #[test]
    fn email_body_names_the_program_and_escapes_input() {
        let html = render_certificate_email(
            "Jane <Doe>",
            "Intro to Testing",
            "Example University",
            Some("CERT-0001"),
        )
        .unwrap();
        assert!(html.contains("Jane &lt;Doe&gt;"));
        assert!(html.contains("Intro to Testing"));
        assert!(html.contains("Example University"));
        assert!(html.contains("CERT-0001"));
    }

    #[test]
    fn email_body_without_institution_or_id() {
        let html = render_certificate_email("Jane", "Intro to Testing", "", None).unwrap();
        assert!(!html.contains("conducted by"));
        assert!(!html.contains("Certificate ID"));
    }

    #[test]
    fn payload_attaches_the_pdf_as_base64() {
        let mailer = HttpMailer::new(
            "http://localhost:9/send".to_string(),
            None,
            "certificates@example.com".to_string(),
        )
        .unwrap();
        let email = email();
        let payload = serde_json::to_value(mailer.payload(&email).unwrap()).unwrap();

        assert_eq!(payload["to"][0], "jane@example.com");
        assert_eq!(payload["subject"], "Your Certificate - Intro to Testing");
        assert_eq!(payload["attachments"][0]["filename"], "certificate.pdf");
        let encoded = payload["attachments"][0]["content"].as_str().unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), email.pdf);
    }

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        assert!(LogMailer.send_certificate(&email()).await.is_ok());
    }
}
