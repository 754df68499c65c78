//! Settings store — the document store the provider preferences live in.
//!
//! The core only needs "fetch the document (or learn it is missing)" and
//! "save the document". `ConfigCache` holds an `Arc<dyn SettingsStore>`, so
//! Postgres in production and the in-memory store in tests are interchangeable.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tracing::debug;

use crate::ai::settings::SettingsDocument;

/// Key of the provider settings row in `app_settings`.
pub const AI_SETTINGS_KEY: &str = "ai_providers";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed settings document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// `Ok(None)` means the document has never been written.
    async fn fetch(&self) -> Result<Option<SettingsDocument>, StoreError>;

    async fn save(&self, doc: &SettingsDocument) -> Result<(), StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct SettingsRow {
    value: serde_json::Value,
    updated_at: DateTime<Utc>,
}

/// Stores the document as JSONB in `app_settings`, keyed by `AI_SETTINGS_KEY`.
#[derive(Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn fetch(&self) -> Result<Option<SettingsDocument>, StoreError> {
        let row: Option<SettingsRow> =
            sqlx::query_as("SELECT value, updated_at FROM app_settings WHERE key = $1")
                .bind(AI_SETTINGS_KEY)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            debug!("No '{AI_SETTINGS_KEY}' settings row");
            return Ok(None);
        };

        let mut doc: SettingsDocument = serde_json::from_value(row.value)?;
        doc.updated_at = Some(row.updated_at);
        Ok(Some(doc))
    }

    async fn save(&self, doc: &SettingsDocument) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;

        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(AI_SETTINGS_KEY)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store. Used when no database is configured and by tests,
/// which can count fetches and inject failures.
#[derive(Default)]
pub struct InMemorySettingsStore {
    doc: Mutex<Option<SettingsDocument>>,
    fetches: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_save: AtomicBool,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_document(doc: SettingsDocument) -> Self {
        let store = Self::default();
        *store.lock() = Some(doc);
        store
    }

    /// Number of `fetch` calls served so far.
    #[cfg(test)]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SettingsDocument>> {
        // A poisoned lock still holds a whole document; keep serving it.
        self.doc.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn fetch(&self) -> Result<Option<SettingsDocument>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("fetch rejected".to_string()));
        }
        Ok(self.lock().clone())
    }

    async fn save(&self, doc: &SettingsDocument) -> Result<(), StoreError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        let mut stored = doc.clone();
        stored.updated_at = Some(Utc::now());
        *self.lock() = Some(stored);
        Ok(())
    }
}
