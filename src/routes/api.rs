use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::db::RegistrationForm;
use crate::error::AppError;
use crate::state::AppState;
use crate::validation::validate_registration;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub registration_id: i64,
    pub certificate_id: String,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(form): Json<RegistrationForm>,
) -> Result<Json<RegisterResponse>, AppError> {
    let form = validate_registration(&form).map_err(AppError::Validation)?;

    let registration = state.service.store().create_registration(&form).await?;
    tracing::info!("Registration {} stored for {}", registration.id, registration.email);

    let outcome = state.service.issue(registration.id, None).await?;
    let message = if outcome.delivered {
        "Registration successful! Certificate sent to your email."
    } else {
        "Registration successful, but the certificate email could not be sent."
    };

    Ok(Json(RegisterResponse {
        success: true,
        message: message.to_string(),
        registration_id: registration.id,
        certificate_id: outcome.certificate_id,
        delivered: outcome.delivered,
        delivery_error: outcome.delivery_error,
    }))
}

pub async fn verify(
    State(state): State<Arc<AppState>>,
    Path(certificate_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let certificate = state.service.verify(&certificate_id).await?;
    Ok(Json(json!({ "valid": true, "certificate": certificate })))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
