//! Request/response channel for profile-level management commands
//!
//! Callers hold a cheap [`CommandClient`]; a single worker task owns the
//! [`ProfileService`] handle and answers every envelope exactly once on its
//! own reply channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vmixlink_store::{Items, ProfileName};

use crate::error::{ApiError, ApiResult};
use crate::service::ProfileService;

/// Envelopes buffered before callers wait
pub const DEFAULT_BUFFER: usize = 64;

/// A management command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ListProfiles,
    GetProfile(ProfileName),
    SaveProfile { name: ProfileName, items: Items },
    DeleteProfile(ProfileName),
}

/// Successful result of a [`Command`]
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Profiles(Vec<ProfileName>),
    Items(Items),
    Saved(Items),
    Deleted { removed: bool },
}

struct Envelope {
    id: u64,
    command: Command,
    reply: oneshot::Sender<ApiResult<CommandReply>>,
}

/// Handle used to send commands to the worker
#[derive(Debug, Clone)]
pub struct CommandClient {
    tx: mpsc::Sender<Envelope>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("id", &self.id)
            .field("command", &self.command)
            .finish()
    }
}

impl CommandClient {
    /// Send a command and wait for its reply
    pub async fn call(&self, command: Command) -> ApiResult<CommandReply> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, response) = oneshot::channel();

        self.tx
            .send(Envelope { id, command, reply })
            .await
            .map_err(|_| ApiError::Internal("command worker is not running".to_string()))?;

        response
            .await
            .map_err(|_| ApiError::Internal(format!("command {id} was dropped without a reply")))?
    }

    pub async fn list_profiles(&self) -> ApiResult<Vec<ProfileName>> {
        match self.call(Command::ListProfiles).await? {
            CommandReply::Profiles(names) => Ok(names),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_profile(&self, name: ProfileName) -> ApiResult<Items> {
        match self.call(Command::GetProfile(name)).await? {
            CommandReply::Items(items) => Ok(items),
            other => Err(unexpected(other)),
        }
    }

    pub async fn save_profile(&self, name: ProfileName, items: Items) -> ApiResult<Items> {
        match self.call(Command::SaveProfile { name, items }).await? {
            CommandReply::Saved(items) => Ok(items),
            other => Err(unexpected(other)),
        }
    }

    pub async fn delete_profile(&self, name: ProfileName) -> ApiResult<bool> {
        match self.call(Command::DeleteProfile(name)).await? {
            CommandReply::Deleted { removed } => Ok(removed),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(reply: CommandReply) -> ApiError {
    ApiError::Internal(format!("unexpected command reply: {reply:?}"))
}

/// Start the worker; it stops once every client has been dropped
pub fn spawn_worker(service: Arc<ProfileService>, buffer: usize) -> (CommandClient, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Envelope>(buffer.max(1));

    let handle = tokio::spawn(async move {
        while let Some(Envelope { id, command, reply }) = rx.recv().await {
            debug!("Handling command {}: {:?}", id, command);
            let result = execute(&service, command).await;
            if reply.send(result).is_err() {
                warn!("Caller of command {} went away before the reply", id);
            }
        }
        debug!("Command worker stopped");
    });

    let client = CommandClient {
        tx,
        next_id: Arc::new(AtomicU64::new(1)),
    };
    (client, handle)
}

async fn execute(service: &ProfileService, command: Command) -> ApiResult<CommandReply> {
    match command {
        Command::ListProfiles => service.list_profiles().await.map(CommandReply::Profiles),
        Command::GetProfile(name) => service.get_items(&name).await.map(CommandReply::Items),
        Command::SaveProfile { name, items } => {
            service.save_profile(&name, items).await.map(CommandReply::Saved)
        }
        Command::DeleteProfile(name) => service
            .delete_profile(&name)
            .await
            .map(|removed| CommandReply::Deleted { removed }),
    }
}
