use crate::certificate::CertificateService;
use crate::config::Config;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: CertificateService,
    pub config: Arc<Config>,
}
