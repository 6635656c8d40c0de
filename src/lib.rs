//! Harness for end-to-end tests: a real server on an ephemeral port

use std::net::SocketAddr;

use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use vmixlink_api::{ApiServer, AppState, ServerError};
use vmixlink_client::{ClientConfig, ClientError, ItemsClient, Subscriber};
use vmixlink_config::ServerConfig;

/// A running server backed by a temporary data directory
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    dir: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub async fn start() -> Result<Self, ServerError> {
        Self::start_in(TempDir::new()?).await
    }

    /// Start on an existing data directory
    pub async fn start_in(dir: TempDir) -> Result<Self, ServerError> {
        let config = ServerConfig {
            port: 0,
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let server = ApiServer::new(config).await?;
        let listener = server.bind().await?;
        let addr = listener.local_addr()?;
        let state = server.state().clone();

        let (shutdown, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(listener, async {
            let _ = stopped.await;
        }));

        Ok(Self {
            addr,
            state,
            dir,
            shutdown: Some(shutdown),
            task,
        })
    }

    pub fn data_dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> Result<ItemsClient, ClientError> {
        ItemsClient::new(ClientConfig::new(&self.base_url())?)
    }

    pub fn subscriber(&self) -> Result<Subscriber, ClientError> {
        Subscriber::from_config(&ClientConfig::new(&self.base_url())?)
    }

    /// Stop serving and hand back the data directory
    pub async fn stop(mut self) -> Result<TempDir, ServerError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.task.await {
            Ok(result) => result?,
            Err(e) => return Err(ServerError::Io(std::io::Error::other(e))),
        }
        Ok(self.dir)
    }
}
