//! Process-wide cache of the provider configuration.
//!
//! Loaded lazily on first use, kept until `invalidate`, replaced wholesale
//! (never mutated in place). Owned by the composition root and shared as an
//! `Arc<ConfigCache>`.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::ai::error::AiError;
use crate::ai::settings::{ProviderConfig, SettingsDocument};
use crate::ai::store::SettingsStore;

pub struct ConfigCache {
    store: Arc<dyn SettingsStore>,
    /// Served when the store has no document yet.
    defaults: ProviderConfig,
    cached: RwLock<Option<Arc<ProviderConfig>>>,
}

impl ConfigCache {
    pub fn new(store: Arc<dyn SettingsStore>, defaults: ProviderConfig) -> Self {
        Self {
            store,
            defaults,
            cached: RwLock::new(None),
        }
    }

    /// Returns the cached configuration, fetching it from the store on a miss.
    ///
    /// A missing document yields the defaults; a failing fetch is an error and
    /// leaves the cache empty.
    pub async fn load(&self) -> Result<Arc<ProviderConfig>, AiError> {
        if let Some(config) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(config));
        }

        let mut slot = self.cached.write().await;
        // Another task may have filled the slot while we waited for the lock.
        if let Some(config) = slot.as_ref() {
            return Ok(Arc::clone(config));
        }

        let config = match self.store.fetch().await? {
            Some(doc) => {
                debug!("Loaded AI settings document (updated_at: {:?})", doc.updated_at);
                ProviderConfig::try_from(&doc)?
            }
            None => {
                info!("No AI settings document found, using built-in defaults");
                self.defaults.clone()
            }
        };

        let config = Arc::new(config);
        *slot = Some(Arc::clone(&config));
        Ok(config)
    }

    /// The stored document as-is, without resolving provider identities.
    /// Falls back to the defaults' document when nothing is stored. Bypasses
    /// the cache so an unusable stored record can still be read and replaced.
    pub async fn stored_document(&self) -> Result<SettingsDocument, AiError> {
        Ok(match self.store.fetch().await? {
            Some(doc) => doc,
            None => SettingsDocument::from(&self.defaults),
        })
    }

    /// Drops the cached configuration; the next `load` fetches again.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
        debug!("AI settings cache invalidated");
    }

    /// Persists `config` and then invalidates the cache.
    ///
    /// A failed write is returned as-is and the cache is left untouched.
    pub async fn update(&self, config: &ProviderConfig) -> Result<(), AiError> {
        self.store.save(&SettingsDocument::from(config)).await?;
        self.invalidate().await;
        info!(
            primary = %config.primary,
            fallback1 = %config.fallback1,
            fallback2 = ?config.fallback2,
            auto_fallback = config.auto_fallback,
            "AI settings updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::ProviderId;
    use crate::ai::settings::Credentials;
    use crate::ai::store::InMemorySettingsStore;

    fn defaults() -> ProviderConfig {
        ProviderConfig::defaults(Credentials::from_keys("env-gemini", "", ""))
    }

    fn custom() -> ProviderConfig {
        ProviderConfig {
            primary: ProviderId::Groq,
            fallback1: ProviderId::Gemini,
            fallback2: None,
            auto_fallback: true,
            credentials: Credentials::from_keys("g-key", "o-key", "q-key"),
        }
    }

    fn cache_with(store: &Arc<InMemorySettingsStore>) -> ConfigCache {
        ConfigCache::new(store.clone(), defaults())
    }

    #[tokio::test]
    async fn test_missing_document_yields_defaults() {
        let store = Arc::new(InMemorySettingsStore::new());
        let cache = cache_with(&store);

        let config = cache.load().await.unwrap();
        assert_eq!(*config, defaults());
    }

    #[tokio::test]
    async fn test_load_fetches_once_then_serves_cache() {
        let store = Arc::new(InMemorySettingsStore::with_document(SettingsDocument::from(
            &custom(),
        )));
        let cache = cache_with(&store);

        let first = cache.load().await.unwrap();
        let second = cache.load().await.unwrap();
        assert_eq!(store.fetch_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, custom());
    }

    #[tokio::test]
    async fn test_invalidate_triggers_exactly_one_fresh_fetch() {
        let store = Arc::new(InMemorySettingsStore::new());
        let cache = cache_with(&store);

        cache.load().await.unwrap();
        cache.invalidate().await;
        cache.load().await.unwrap();
        cache.load().await.unwrap();
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_instead_of_defaults() {
        let store = Arc::new(InMemorySettingsStore::new());
        store.set_fail_fetch(true);
        let cache = cache_with(&store);

        let err = cache.load().await.unwrap_err();
        assert!(matches!(err, AiError::Settings(_)));

        // Nothing was cached; a recovered store is consulted again.
        store.set_fail_fetch(false);
        assert_eq!(*cache.load().await.unwrap(), defaults());
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_identity_in_document_is_an_error() {
        let mut doc = SettingsDocument::from(&custom());
        doc.primary_provider = "cohere".to_string();
        let store = Arc::new(InMemorySettingsStore::with_document(doc));
        let cache = cache_with(&store);

        assert!(matches!(
            cache.load().await.unwrap_err(),
            AiError::UnknownProvider(_)
        ));
    }

    #[tokio::test]
    async fn test_update_then_load_round_trips() {
        let store = Arc::new(InMemorySettingsStore::new());
        let cache = cache_with(&store);
        cache.load().await.unwrap();

        cache.update(&custom()).await.unwrap();
        cache.invalidate().await;
        assert_eq!(*cache.load().await.unwrap(), custom());
    }

    #[tokio::test]
    async fn test_blank_model_round_trips_unchanged() {
        let store = Arc::new(InMemorySettingsStore::new());
        let cache = cache_with(&store);

        let mut config = custom();
        config.credentials.openrouter.model = String::new();
        cache.update(&config).await.unwrap();

        let loaded = cache.load().await.unwrap();
        assert_eq!(*loaded, config);
        assert_eq!(
            loaded.credential(ProviderId::OpenRouter).model_for(ProviderId::OpenRouter),
            ProviderId::OpenRouter.default_model()
        );
    }

    #[tokio::test]
    async fn test_stored_document_reads_record_that_load_rejects() {
        let mut doc = SettingsDocument::from(&custom());
        doc.primary_provider = "cohere".to_string();
        let store = Arc::new(InMemorySettingsStore::with_document(doc.clone()));
        let cache = cache_with(&store);

        assert!(cache.load().await.is_err());
        assert_eq!(cache.stored_document().await.unwrap(), doc);
    }

    #[tokio::test]
    async fn test_stored_document_defaults_when_store_is_empty() {
        let store = Arc::new(InMemorySettingsStore::new());
        let cache = cache_with(&store);

        let doc = cache.stored_document().await.unwrap();
        assert_eq!(doc.gemini_api_key, "env-gemini");
        assert_eq!(doc.primary_provider, "gemini");
    }

    #[tokio::test]
    async fn test_update_invalidates_stale_cache() {
        let store = Arc::new(InMemorySettingsStore::new());
        let cache = cache_with(&store);
        assert_eq!(*cache.load().await.unwrap(), defaults());

        cache.update(&custom()).await.unwrap();
        assert_eq!(*cache.load().await.unwrap(), custom());
    }

    #[tokio::test]
    async fn test_failed_update_propagates_and_keeps_cache() {
        let store = Arc::new(InMemorySettingsStore::new());
        let cache = cache_with(&store);
        let before = cache.load().await.unwrap();

        store.set_fail_save(true);
        let err = cache.update(&custom()).await.unwrap_err();
        assert!(matches!(err, AiError::Settings(_)));

        let after = cache.load().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(store.fetch_count(), 1);
    }
}
