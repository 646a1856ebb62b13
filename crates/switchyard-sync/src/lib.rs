//! # Switchyard Sync
//!
//! Keeps the platform's command registry consistent with the manifest of a
//! [`switchyard_commands::CommandRegistry`].
//!
//! The [`Synchronizer`] diffs the manifest against the snapshot persisted
//! after the last successful push and only writes to the remote registry
//! when something changed, or when the remote command count shows it was
//! modified out of band.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod diff;
pub mod error;
pub mod remote;
pub mod scope;
pub mod snapshot;
pub mod synchronizer;

pub use diff::{changed_fields, normalize, remote_id, SyncDiff};
pub use error::{RemoteError, StoreError, SyncError};
pub use remote::{OfflineRegistry, RemoteRegistry, SerenityRegistry};
pub use scope::SyncScope;
pub use snapshot::{MemorySnapshotStore, SledSnapshotStore, SnapshotStore};
pub use synchronizer::{SyncAction, SyncOptions, SyncReport, Synchronizer};
