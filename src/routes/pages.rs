use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::sync::Arc;
use tera::Context;

use crate::certificate::IssueError;
use crate::state::AppState;

pub async fn verify_page(
    State(state): State<Arc<AppState>>,
    Path(certificate_id): Path<String>,
) -> impl IntoResponse {
    let mut ctx = Context::new();
    ctx.insert("certificate_id", certificate_id.trim());

    let status = match state.service.verify(&certificate_id).await {
        Ok(cert) => {
            ctx.insert("found", &true);
            ctx.insert("name", &cert.name);
            ctx.insert("organization", &cert.organization);
            ctx.insert(
                "issued_at",
                &cert
                    .issued_at
                    .map(|at| at.format("%d %B %Y").to_string())
                    .unwrap_or_default(),
            );
            StatusCode::OK
        }
        Err(IssueError::NotFound(_)) | Err(IssueError::NotIssued(_)) => {
            ctx.insert("found", &false);
            StatusCode::NOT_FOUND
        }
        Err(e) => {
            tracing::error!("Verification page failed: {}", e);
            ctx.insert("found", &false);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, render_template("verify.html", ctx))
}

fn render_template(name: &str, ctx: Context) -> Html<String> {
    let tera = crate::templates::get_tera();
    let rendered = tera
        .render(name, &ctx)
        .unwrap_or_else(|_| format!("Template error: {}", name));
    Html(rendered)
}
