use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{Registration, RegistrationForm, Store, StoreError};

/// In-process store, for tests and `STORAGE=memory` demo runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    registrations: BTreeMap<i64, Registration>,
    settings: HashMap<String, HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_registration(
        &self,
        form: &RegistrationForm,
    ) -> Result<Registration, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let registration = Registration {
            id: inner.last_id,
            created_at: Utc::now(),
            title: form.title.clone(),
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            organization: form.organization.clone(),
            certificate_id: None,
            certificate_issued_at: None,
        };
        inner.registrations.insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>, StoreError> {
        Ok(self.inner.read().await.registrations.values().cloned().collect())
    }

    async fn get_registration(&self, id: i64) -> Result<Option<Registration>, StoreError> {
        Ok(self.inner.read().await.registrations.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Registration>, StoreError> {
        let email = email.trim();
        Ok(self
            .inner
            .read()
            .await
            .registrations
            .values()
            .filter(|r| r.email.eq_ignore_ascii_case(email))
            .max_by_key(|r| (r.is_issued(), r.id))
            .cloned())
    }

    async fn find_by_certificate_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Registration>, StoreError> {
        let certificate_id = certificate_id.trim();
        Ok(self
            .inner
            .read()
            .await
            .registrations
            .values()
            .find(|r| r.certificate_id.as_deref() == Some(certificate_id))
            .cloned())
    }

    async fn update_registration(
        &self,
        id: i64,
        form: &RegistrationForm,
    ) -> Result<Option<Registration>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.registrations.get_mut(&id).map(|r| {
            r.title = form.title.clone();
            r.name = form.name.clone();
            r.email = form.email.clone();
            r.phone = form.phone.clone();
            r.organization = form.organization.clone();
            r.clone()
        }))
    }

    async fn delete_registration(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.registrations.remove(&id).is_some())
    }

    async fn record_certificate(
        &self,
        id: i64,
        certificate_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.registrations.get_mut(&id) {
            Some(r) if !r.is_issued() => {
                r.certificate_id = Some(certificate_id.to_string());
                r.certificate_issued_at = Some(issued_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn load_settings(&self, scope: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .settings
            .get(scope)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_settings(
        &self,
        scope: &str,
        entries: &[(String, String)],
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .settings
            .insert(scope.to_string(), entries.iter().cloned().collect());
        Ok(())
    }
}
