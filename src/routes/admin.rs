use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{generate_token, token_expiry};
use crate::certificate::{
    BulkSummary, IssueOutcome, LayoutConfig, ProgramContent, ResendTarget, PREVIEW_RECIPIENT,
};
use crate::db::{Registration, RegistrationForm};
use crate::error::AppError;
use crate::state::AppState;
use crate::validation::{is_valid_email, validate_registration};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let config = &state.config;
    if body.username != config.admin_username || body.password != config.admin_password {
        tracing::warn!("Failed admin login for {:?}", body.username);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = generate_token(&body.username, &config.jwt_secret)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "token": token,
        "tokenType": "Bearer",
        "expiresIn": token_expiry(),
    })))
}

pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Registration>>, AppError> {
    Ok(Json(state.service.store().list_registrations().await?))
}

pub async fn update_registration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(form): Json<RegistrationForm>,
) -> Result<Json<Registration>, AppError> {
    let form = validate_registration(&form).map_err(AppError::Validation)?;
    state
        .service
        .store()
        .update_registration(id, &form)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", id)))
}

pub async fn delete_registration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !state.service.store().delete_registration(id).await? {
        return Err(AppError::NotFound(format!("Registration {} not found", id)));
    }
    tracing::info!("Registration {} deleted", id);
    Ok(Json(json!({ "success": true })))
}

pub async fn get_certificate_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LayoutConfig>, AppError> {
    Ok(Json(state.service.load_layout().await?))
}

pub async fn save_certificate_config(
    State(state): State<Arc<AppState>>,
    Json(layout): Json<LayoutConfig>,
) -> Result<Json<LayoutConfig>, AppError> {
    state.service.save_layout(&layout).await?;
    // Read back so the response shows what the renderer will actually use.
    Ok(Json(state.service.load_layout().await?))
}

pub async fn get_certificate_content(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Json<ProgramContent>, AppError> {
    Ok(Json(state.service.load_content(Some(&event_id)).await?))
}

pub async fn save_certificate_content(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(content): Json<ProgramContent>,
) -> Result<Json<ProgramContent>, AppError> {
    state.service.save_content(&event_id, &content).await?;
    Ok(Json(state.service.load_content(Some(&event_id)).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub registration_id: i64,
    pub event_id: Option<String>,
}

pub async fn generate_certificate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<IssueOutcome>, AppError> {
    let outcome = state
        .service
        .issue(body.registration_id, body.event_id.as_deref())
        .await?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkGenerateRequest {
    #[serde(default)]
    pub registration_ids: Vec<i64>,
    pub event_id: Option<String>,
}

pub async fn bulk_generate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BulkGenerateRequest>,
) -> Result<Json<Value>, AppError> {
    if body.registration_ids.is_empty() {
        return Err(AppError::Validation("No registrations provided".to_string()));
    }

    let summary: BulkSummary = state
        .service
        .bulk_issue(&body.registration_ids, body.event_id.as_deref())
        .await?;
    Ok(Json(json!({ "success": true, "summary": summary })))
}

#[derive(Deserialize)]
pub struct PreviewQuery {
    #[serde(alias = "eventId")]
    pub event_id: Option<String>,
}

pub async fn preview_certificate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pdf = state.service.preview(query.event_id.as_deref()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=\"certificate-preview.pdf\"",
            ),
        ],
        pdf,
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendRequest {
    pub certificate_id: Option<String>,
    pub email: Option<String>,
    pub event_id: Option<String>,
}

pub async fn resend_certificate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResendRequest>,
) -> Result<Json<IssueOutcome>, AppError> {
    let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let target = match (non_blank(body.certificate_id), non_blank(body.email)) {
        (Some(id), _) => ResendTarget::CertificateId(id),
        (None, Some(email)) => ResendTarget::Email(email),
        (None, None) => {
            return Err(AppError::Validation(
                "certificateId or email is required".to_string(),
            ))
        }
    };

    let outcome = state
        .service
        .resend(&target, body.event_id.as_deref())
        .await?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
pub struct EmailPreviewQuery {
    pub name: Option<String>,
}

pub async fn email_preview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailPreviewQuery>,
) -> Result<Json<Value>, AppError> {
    let name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| PREVIEW_RECIPIENT.to_string());
    let html = state.service.email_preview(&name).await?;
    Ok(Json(json!({ "html": html })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTestRequest {
    pub email: String,
    pub name: Option<String>,
    pub certificate_id: Option<String>,
}

pub async fn send_test_email(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendTestRequest>,
) -> Result<Json<Value>, AppError> {
    if !is_valid_email(&body.email) {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(PREVIEW_RECIPIENT);

    state
        .service
        .send_test(&body.email, name, body.certificate_id.as_deref())
        .await?;
    Ok(Json(json!({ "success": true })))
}
