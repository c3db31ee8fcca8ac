use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::{DbPool, Registration, RegistrationForm, Store, StoreError};

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_registration(
        &self,
        form: &RegistrationForm,
    ) -> Result<Registration, StoreError> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO registrations (title, name, email, phone, organization)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&form.title)
        .bind(&form.name)
        .bind(&form.email)
        .bind(&form.phone)
        .bind(&form.organization)
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(registration)
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>, StoreError> {
        let rows = sqlx::query_as::<_, Registration>("SELECT * FROM registrations ORDER BY id")
            .fetch_all(self.pool.as_ref())
            .await?;
        Ok(rows)
    }

    async fn get_registration(&self, id: i64) -> Result<Option<Registration>, StoreError> {
        let row = sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Registration>, StoreError> {
        let row = sqlx::query_as::<_, Registration>(
            r#"
            SELECT * FROM registrations
            WHERE lower(email) = lower($1)
            ORDER BY (certificate_id IS NULL OR trim(certificate_id) = ''), id DESC
            LIMIT 1
            "#,
        )
        .bind(email.trim())
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row)
    }

    async fn find_by_certificate_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Registration>, StoreError> {
        let row = sqlx::query_as::<_, Registration>(
            "SELECT * FROM registrations WHERE certificate_id = $1",
        )
        .bind(certificate_id.trim())
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row)
    }

    async fn update_registration(
        &self,
        id: i64,
        form: &RegistrationForm,
    ) -> Result<Option<Registration>, StoreError> {
        let row = sqlx::query_as::<_, Registration>(
            r#"
            UPDATE registrations
            SET title = $2, name = $3, email = $4, phone = $5, organization = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&form.title)
        .bind(&form.name)
        .bind(&form.email)
        .bind(&form.phone)
        .bind(&form.organization)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row)
    }

    async fn delete_registration(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM registrations WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_certificate(
        &self,
        id: i64,
        certificate_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET certificate_id = $2, certificate_issued_at = $3
            WHERE id = $1 AND (certificate_id IS NULL OR certificate_id = '')
            "#,
        )
        .bind(id)
        .bind(certificate_id)
        .bind(issued_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn load_settings(&self, scope: &str) -> Result<HashMap<String, String>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT key, value FROM certificate_settings WHERE scope = $1",
        )
        .bind(scope)
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn save_settings(
        &self,
        scope: &str,
        entries: &[(String, String)],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM certificate_settings WHERE scope = $1")
            .bind(scope)
            .execute(&mut *tx)
            .await?;

        for (key, value) in entries {
            sqlx::query("INSERT INTO certificate_settings (scope, key, value) VALUES ($1, $2, $3)")
                .bind(scope)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
