//! Error types for command registry reconciliation

use switchyard_common::SwitchyardError;
use thiserror::Error;

use crate::scope::SyncScope;

/// Snapshot persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Snapshot database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Corrupt snapshot row '{id}': {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Remote command registry errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Discord HTTP error: {0}")]
    Http(#[from] serenity::Error),

    #[error("Application id is not known; set discord.application_id or resolve it first")]
    MissingApplicationId,

    #[error("Remote command payload could not be encoded: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("No Discord token configured")]
    Offline,
}

/// Failure of one reconciliation run
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to read remote commands of {scope}: {source}")]
    Fetch {
        scope: SyncScope,
        #[source]
        source: RemoteError,
    },

    #[error("Failed to write remote commands of {scope}: {source}")]
    Write {
        scope: SyncScope,
        #[source]
        source: RemoteError,
    },

    #[error("Failed to read snapshot of {scope}: {source}")]
    Snapshot {
        scope: SyncScope,
        #[source]
        source: StoreError,
    },

    #[error("No development guild is configured")]
    NoDevelopmentGuild,

    #[error("Failed to encode the schema of {id}: {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StoreError> for SwitchyardError {
    fn from(err: StoreError) -> Self {
        SwitchyardError::storage_with_source("Command snapshot store failed", err)
    }
}

impl From<RemoteError> for SwitchyardError {
    fn from(err: RemoteError) -> Self {
        SwitchyardError::discord_with_source("Command registry request failed", err)
    }
}

impl From<SyncError> for SwitchyardError {
    fn from(err: SyncError) -> Self {
        SwitchyardError::with_source("Command synchronization failed", err)
    }
}
