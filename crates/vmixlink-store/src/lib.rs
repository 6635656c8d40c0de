//! # vmixlink store
//!
//! Durable storage for profiles. Each profile lives in `<name>.json` inside the
//! data directory as a single-element array wrapping the item mapping, which is
//! the shape the vMix poller expects.
//!
//! Writes are atomic with respect to readers: content goes to a temporary file
//! in the same directory and is renamed over the destination, so a reader sees
//! either the old or the new file, never a partial one.

pub mod error;
pub mod file_store;
pub mod locks;
pub mod message;
pub mod profile;

pub use error::{ErrorCategory, Result, StoreError};
pub use file_store::FileStore;
pub use locks::KeyedLocks;
pub use message::{ClientMessage, ServerMessage, WELCOME_MESSAGE};
pub use profile::{Items, Payload, ProfileName, Scalar};
