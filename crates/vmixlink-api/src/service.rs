//! Profile operations shared by the HTTP handlers and the command worker

use std::sync::Arc;

use tracing::{debug, info, warn};
use vmixlink_cache::{CacheKey, ResponseCache};
use vmixlink_format::{render, Format, KeyFilter};
use vmixlink_store::{FileStore, Items, KeyedLocks, ProfileName, Scalar};

use crate::error::{ApiError, ApiResult};
use crate::notifier::ChangeNotifier;

/// A rendered profile ready to be sent to a poller
#[derive(Debug, Clone)]
pub struct RenderedProfile {
    pub body: Arc<[u8]>,
    pub content_type: &'static str,
    /// Present when the rendering came from, or went into, the cache
    pub etag: Option<String>,
}

/// Parameters of a data poll
#[derive(Debug, Clone, Default)]
pub struct DataRequest {
    pub format: Option<String>,
    pub include: Option<String>,
    pub exclude: Option<String>,
}

/// Owns the store, the response cache and the notifier
///
/// Every mutation of a profile runs under that profile's lock and follows the
/// same order: load, change, persist, invalidate, notify. Cache invalidation
/// and notification only happen after a successful write.
#[derive(Debug)]
pub struct ProfileService {
    store: FileStore,
    cache: ResponseCache,
    notifier: ChangeNotifier,
    mutations: KeyedLocks,
}

impl ProfileService {
    pub fn new(store: FileStore, cache: ResponseCache, notifier: ChangeNotifier) -> Self {
        Self {
            store,
            cache,
            notifier,
            mutations: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Render a profile for polling
    ///
    /// A missing profile yields an empty document in the requested format.
    pub async fn get_data(&self, name: &ProfileName, request: &DataRequest) -> ApiResult<RenderedProfile> {
        let format = Format::parse(request.format.as_deref().unwrap_or("json"));
        let path = self.store.path_for(name);
        let key = CacheKey::new(
            path.clone(),
            format.as_str(),
            request.include.clone().unwrap_or_default(),
            request.exclude.clone().unwrap_or_default(),
        );

        if let Some(cached) = self.cache.get(&key) {
            debug!("Cache hit for {} ({})", name, format);
            return Ok(RenderedProfile {
                etag: Some(cached.etag()),
                body: cached.bytes,
                content_type: format.content_type(),
            });
        }

        let generation = self.cache.generation(&path);
        let Some(payload) = self.store.read_payload(name).await.map_err(ApiError::Read)? else {
            debug!("Profile {} not found, serving empty payload", name);
            return Ok(RenderedProfile {
                body: render(&[], format)?.into(),
                content_type: format.content_type(),
                etag: None,
            });
        };

        let filter = KeyFilter::new(request.include.as_deref(), request.exclude.as_deref());
        let body = render(&filter.apply_payload(&payload), format)?;
        let stored = self.cache.put_if_current(key, body, generation);
        debug!("Read profile {} from file", name);

        Ok(RenderedProfile {
            etag: Some(stored.etag()),
            body: stored.bytes,
            content_type: format.content_type(),
        })
    }

    /// Current items of a profile; empty when it does not exist
    pub async fn get_items(&self, name: &ProfileName) -> ApiResult<Items> {
        Ok(self
            .store
            .read(name)
            .await
            .map_err(ApiError::Read)?
            .unwrap_or_default())
    }

    /// Insert a new key; fails with a conflict if it already exists
    pub async fn add_item(&self, name: &ProfileName, key: String, value: Scalar) -> ApiResult<Items> {
        let _guard = self.mutations.lock(name.as_str()).await;

        let mut items = self.get_items(name).await?;
        if items.contains_key(&key) {
            warn!("Key {} already exists in profile {}", key, name);
            return Err(ApiError::Conflict("Key already exists".to_string()));
        }
        items.insert(key.clone(), value);

        self.commit(name, &items).await?;
        info!("Added item {} to profile {}", key, name);
        Ok(items)
    }

    /// Replace the value of an existing key
    pub async fn update_item(&self, name: &ProfileName, key: &str, value: Scalar) -> ApiResult<Items> {
        let _guard = self.mutations.lock(name.as_str()).await;

        let mut items = self.existing_items(name, key).await?;
        items.insert(key, value);

        self.commit(name, &items).await?;
        info!("Updated item {} in profile {}", key, name);
        Ok(items)
    }

    /// Remove an existing key
    pub async fn delete_item(&self, name: &ProfileName, key: &str) -> ApiResult<Items> {
        let _guard = self.mutations.lock(name.as_str()).await;

        let mut items = self.existing_items(name, key).await?;
        items.remove(key);

        self.commit(name, &items).await?;
        info!("Deleted item {} from profile {}", key, name);
        Ok(items)
    }

    /// Names of all stored profiles
    pub async fn list_profiles(&self) -> ApiResult<Vec<ProfileName>> {
        self.store.list().await.map_err(ApiError::Read)
    }

    /// Replace every item of a profile, creating it if needed
    pub async fn save_profile(&self, name: &ProfileName, items: Items) -> ApiResult<Items> {
        let _guard = self.mutations.lock(name.as_str()).await;
        self.commit(name, &items).await?;
        info!("Saved profile {} ({} items)", name, items.len());
        Ok(items)
    }

    /// Delete a profile; deleting a missing profile succeeds
    pub async fn delete_profile(&self, name: &ProfileName) -> ApiResult<bool> {
        let _guard = self.mutations.lock(name.as_str()).await;

        let removed = self.store.delete(name).await.map_err(ApiError::Save)?;
        self.cache.invalidate(&self.store.path_for(name));
        self.notifier.publish_deletion(name);

        if removed {
            info!("Deleted profile {}", name);
        }
        Ok(removed)
    }

    /// Evict expired cache entries
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    async fn existing_items(&self, name: &ProfileName, key: &str) -> ApiResult<Items> {
        let Some(items) = self.store.read(name).await.map_err(ApiError::Read)? else {
            debug!("Profile {} not found", name);
            return Err(ApiError::profile_not_found());
        };
        if !items.contains_key(key) {
            warn!("Key {} not found in profile {}", key, name);
            return Err(ApiError::key_not_found());
        }
        Ok(items)
    }

    async fn commit(&self, name: &ProfileName, items: &Items) -> ApiResult<()> {
        self.store.write(name, items).await.map_err(ApiError::Save)?;
        self.cache.invalidate(&self.store.path_for(name));
        self.notifier.publish(name, items);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vmixlink_cache::DEFAULT_TTL;
    use vmixlink_store::ServerMessage;

    async fn service(dir: &TempDir) -> ProfileService {
        ProfileService::new(
            FileStore::open(dir.path()).await.unwrap(),
            ResponseCache::new(DEFAULT_TTL).unwrap(),
            ChangeNotifier::default(),
        )
    }

    fn name(s: &str) -> ProfileName {
        ProfileName::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_add_to_fresh_profile_creates_file() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;

        let items = service
            .add_item(&name("demo"), "score".into(), "0".into())
            .await
            .unwrap();
        assert_eq!(items.get("score"), Some(&Scalar::from("0")));

        let raw = std::fs::read_to_string(dir.path().join("demo.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!([{"score": "0"}]));
    }

    #[tokio::test]
    async fn test_add_existing_key_conflicts() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        service.add_item(&name("demo"), "a".into(), "1".into()).await.unwrap();

        let err = service.add_item(&name("demo"), "a".into(), "2".into()).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(service.get_items(&name("demo")).await.unwrap().get("a"), Some(&Scalar::from("1")));
    }

    #[tokio::test]
    async fn test_update_and_delete_require_existing_profile_and_key() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;

        let err = service.update_item(&name("ghost"), "a", "1".into()).await.unwrap_err();
        assert_eq!(err.public_message(), "Profile not found");

        service.add_item(&name("demo"), "a".into(), "1".into()).await.unwrap();
        let err = service.delete_item(&name("demo"), "missing").await.unwrap_err();
        assert_eq!(err.public_message(), "Key not found");
    }

    #[tokio::test]
    async fn test_write_invalidates_cached_rendering() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        let request = DataRequest::default();
        service.add_item(&name("demo"), "score".into(), "0".into()).await.unwrap();

        let before = service.get_data(&name("demo"), &request).await.unwrap();
        assert!(std::str::from_utf8(&before.body).unwrap().contains("\"0\""));
        assert_eq!(service.cache().len(), 1);

        service.update_item(&name("demo"), "score", "1".into()).await.unwrap();
        let after = service.get_data(&name("demo"), &request).await.unwrap();
        assert!(std::str::from_utf8(&after.body).unwrap().contains("\"1\""));
    }

    #[tokio::test]
    async fn test_missing_profile_renders_empty_and_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;

        let request = DataRequest {
            format: Some("xml".into()),
            ..Default::default()
        };
        let rendered = service.get_data(&name("ghost"), &request).await.unwrap();
        assert_eq!(rendered.content_type, "application/xml; charset=utf-8");
        assert!(std::str::from_utf8(&rendered.body).unwrap().contains("<data/>"));
        assert!(rendered.etag.is_none());
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_notify_subscribers() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        let mut rx = service.notifier().subscribe();

        service.add_item(&name("demo"), "score".into(), "0".into()).await.unwrap();
        service.update_item(&name("demo"), "score", "1".into()).await.unwrap();
        service.delete_item(&name("demo"), "score").await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            match rx.recv().await.unwrap() {
                ServerMessage::DataUpdate { changes, .. } => seen.push(changes.get("score").cloned()),
                other => panic!("unexpected message: {other:?}"),
            }
        }
        assert_eq!(
            seen,
            vec![Some("0".into()), Some("1".into()), Some(Scalar::Null)]
        );
    }

    #[tokio::test]
    async fn test_failed_lookup_does_not_notify() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        service.add_item(&name("demo"), "a".into(), "1".into()).await.unwrap();
        let mut rx = service.notifier().subscribe();

        assert!(service.delete_item(&name("demo"), "missing").await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache_and_stays_silent() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        service.add_item(&name("demo"), "score".into(), "0".into()).await.unwrap();
        service.get_data(&name("demo"), &DataRequest::default()).await.unwrap();
        assert_eq!(service.cache().len(), 1);
        let mut rx = service.notifier().subscribe();

        // A non-empty directory at the profile path makes the rename fail
        let path = dir.path().join("demo.json");
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();

        let items: Items = [("score".to_string(), Scalar::from("1"))].into_iter().collect();
        assert!(service.save_profile(&name("demo"), items).await.is_err());
        assert_eq!(service.cache().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_profile_level_operations() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;

        let items: Items = [("title".to_string(), Scalar::from("Final"))].into_iter().collect();
        service.save_profile(&name("beta"), items.clone()).await.unwrap();
        service.save_profile(&name("alpha"), Items::new()).await.unwrap();

        let names: Vec<String> = service
            .list_profiles()
            .await
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        assert!(service.delete_profile(&name("beta")).await.unwrap());
        assert!(!service.delete_profile(&name("beta")).await.unwrap());
        assert!(service.get_items(&name("beta")).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_to_one_profile_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(service(&dir).await);

        let mut handles = Vec::new();
        for i in 0..20 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .add_item(&name("demo"), format!("key{i}"), Scalar::from(i))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(service.get_items(&name("demo")).await.unwrap().len(), 20);
    }
}
