//! Server assembly and lifecycle

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use vmixlink_cache::ResponseCache;
use vmixlink_config::ServerConfig;
use vmixlink_store::FileStore;

use crate::commands::{spawn_worker, DEFAULT_BUFFER};
use crate::error::ServerError;
use crate::notifier::ChangeNotifier;
use crate::routes::all_routes;
use crate::service::ProfileService;
use crate::state::AppState;

/// A configured server, ready to bind
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
    background: Vec<JoinHandle<()>>,
}

impl ApiServer {
    /// Validate the settings, open the store and start the background tasks
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let store = FileStore::open(&config.data_dir).await?;
        let cache = ResponseCache::new(config.cache_ttl())?;
        let notifier = ChangeNotifier::new(config.broadcast_capacity);
        let service = Arc::new(ProfileService::new(store, cache, notifier));

        let (commands, worker) = spawn_worker(service.clone(), DEFAULT_BUFFER);
        let purge = spawn_cache_purge(service.clone(), config.cache_purge_interval());

        info!("Profile data directory: {}", config.data_dir.display());
        let state = AppState::new(service, commands, config.api_key.clone());
        Ok(Self {
            config,
            state,
            background: vec![worker, purge],
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        Ok(listener)
    }

    /// Serve until `shutdown` resolves
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        info!("vMix Data Server listening at http://{}", addr);

        let app = all_routes(self.state.clone());
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        for task in self.background {
            task.abort();
        }
        info!("Server stopped");
        Ok(())
    }
}

/// Shortest interval between cache sweeps
pub const MIN_PURGE_INTERVAL: Duration = Duration::from_secs(1);

/// Periodically evict expired cache entries
///
/// Intervals below [`MIN_PURGE_INTERVAL`] are raised to it.
pub fn spawn_cache_purge(service: Arc<ProfileService>, every: Duration) -> JoinHandle<()> {
    let every = every.max(MIN_PURGE_INTERVAL);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = service.purge_expired();
            if removed > 0 {
                debug!(
                    "Purged {} expired cache entries ({})",
                    removed,
                    service.cache().metrics().summary()
                );
            }
        }
    })
}
