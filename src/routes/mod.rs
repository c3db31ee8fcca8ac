pub mod admin;
pub mod api;
pub mod pages;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_admin;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/registrations", get(admin::list_registrations))
        .route(
            "/registrations/:id",
            put(admin::update_registration).delete(admin::delete_registration),
        )
        .route(
            "/certificate-config",
            get(admin::get_certificate_config).put(admin::save_certificate_config),
        )
        .route(
            "/events/:event_id/certificate-content",
            get(admin::get_certificate_content).put(admin::save_certificate_content),
        )
        .route("/certificate/generate", post(admin::generate_certificate))
        .route("/certificate/bulk-generate", post(admin::bulk_generate))
        .route("/certificate/preview", get(admin::preview_certificate))
        .route("/resend-certificate", post(admin::resend_certificate))
        .route("/email-preview", get(admin::email_preview))
        .route("/send-test-email", post(admin::send_test_email))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        // Login sits outside the auth layer.
        .route("/login", post(admin::login));

    Router::new()
        .route("/health", get(api::health))
        .route("/api/register", post(api::register))
        .route("/api/verify/:certificate_id", get(api::verify))
        .route("/verify/:certificate_id", get(pages::verify_page))
        .nest("/api/admin", admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
