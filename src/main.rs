use certforge::certificate::CertificateService;
use certforge::config::{Config, StorageBackend};
use certforge::db::{self, MemoryStore, PgStore, Store};
use certforge::mail::{HttpMailer, LogMailer, Mailer};
use certforge::pdf::{CertificateRenderer, FontAssets};
use certforge::state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certforge=info,tower_http=info".into()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Postgres => {
            let pool = db::create_pool(&config.database_url).await?;
            db::run_migrations(pool.as_ref()).await?;
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("STORAGE=memory: registrations are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let fonts = FontAssets::discover(config.font_dir.as_deref(), config.font_family.as_deref())?;
    tracing::info!("Certificate fonts loaded from {}", fonts.source().display());
    let renderer = Arc::new(CertificateRenderer::new(fonts));

    let mailer: Arc<dyn Mailer> = match &config.mail_api_url {
        Some(url) => Arc::new(HttpMailer::new(
            url.clone(),
            config.mail_api_key.clone(),
            config.mail_from.clone(),
        )?),
        None => {
            tracing::warn!("MAIL_API_URL not set, certificate emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let service = CertificateService::new(store, mailer, renderer, config.default_event_id.clone());
    let state = Arc::new(AppState {
        service,
        config: config.clone(),
    });

    let app = certforge::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("certforge listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
