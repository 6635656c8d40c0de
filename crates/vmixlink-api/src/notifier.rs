//! Change notification fan-out
//!
//! Keeps the last known items of every profile written through this process
//! and broadcasts only what changed. Subscribers that fall behind skip the
//! messages they missed; consumers care about the latest value, not history.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;
use vmixlink_store::{Items, ProfileName, Scalar, ServerMessage};

/// Default number of messages buffered per subscriber
pub const DEFAULT_CAPACITY: usize = 1024;

/// Computes per-profile deltas and broadcasts them to subscribers
#[derive(Debug)]
pub struct ChangeNotifier {
    snapshots: Mutex<HashMap<ProfileName, Items>>,
    sender: broadcast::Sender<ServerMessage>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            snapshots: Mutex::new(HashMap::new()),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Last items recorded for a profile
    pub fn snapshot(&self, profile: &ProfileName) -> Option<Items> {
        self.snapshots.lock().get(profile).cloned()
    }

    /// Record the new items of a profile and broadcast the delta, if any
    ///
    /// The snapshot is replaced even when nothing changed. Returns the changes
    /// that were broadcast.
    pub fn publish(&self, profile: &ProfileName, items: &Items) -> Option<Items> {
        let mut snapshots = self.snapshots.lock();
        let changes = match snapshots.get(profile) {
            Some(previous) => diff(previous, items),
            None => diff(&Items::new(), items),
        };
        snapshots.insert(profile.clone(), items.clone());
        self.broadcast(profile, changes)
    }

    /// Broadcast the removal of every known key of a deleted profile
    pub fn publish_deletion(&self, profile: &ProfileName) -> Option<Items> {
        let mut snapshots = self.snapshots.lock();
        let changes = match snapshots.remove(profile) {
            Some(previous) => diff(&previous, &Items::new()),
            None => Items::new(),
        };
        self.broadcast(profile, changes)
    }

    // Called with the snapshot lock held so deltas leave in commit order
    fn broadcast(&self, profile: &ProfileName, changes: Items) -> Option<Items> {
        if changes.is_empty() {
            debug!("No changes detected for profile: {}, skipping update broadcast", profile);
            return None;
        }

        let message = ServerMessage::DataUpdate {
            profile_name: profile.to_string(),
            changes: changes.clone(),
        };
        // No receivers is not an error
        let delivered = self.sender.send(message).unwrap_or(0);
        debug!("Sent data update to {} subscribers for profile: {}", delivered, profile);
        Some(changes)
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Keys whose value differs between two item sets
///
/// Added and changed keys carry their new value; removed keys carry `null`.
pub fn diff(previous: &Items, current: &Items) -> Items {
    let mut changes = Items::new();
    for (key, value) in current {
        let unchanged = previous
            .get(key)
            .map_or(false, |old| old.loosely_eq(value));
        if !unchanged {
            changes.insert(key.clone(), value.clone());
        }
    }
    for key in previous.keys() {
        if !current.contains_key(key) {
            changes.insert(key.clone(), Scalar::Null);
        }
    }
    changes
}
