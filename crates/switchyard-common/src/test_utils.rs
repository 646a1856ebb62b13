//! Test utilities and shared test helpers for Switchyard.

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize logging for tests once per test binary.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Create a temporary directory for tests that automatically cleans up.
#[cfg(any(test, feature = "testing"))]
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Discord snowflakes used across test suites.
pub mod discord_fixtures {
    /// Guild used as the pinned development scope.
    pub const DEV_GUILD_ID: u64 = 400_000_000_000_000_001;
    /// A regular guild.
    pub const GUILD_ID: u64 = 400_000_000_000_000_002;
    /// Owner of [`GUILD_ID`].
    pub const GUILD_OWNER_ID: u64 = 100_000_000_000_000_001;
    /// An ordinary member.
    pub const MEMBER_ID: u64 = 100_000_000_000_000_002;
    /// A channel in [`GUILD_ID`].
    pub const CHANNEL_ID: u64 = 300_000_000_000_000_001;
    /// Category holding [`CHANNEL_ID`].
    pub const CATEGORY_ID: u64 = 300_000_000_000_000_000;
    /// Moderator role in [`GUILD_ID`].
    pub const MODERATOR_ROLE_ID: u64 = 500_000_000_000_000_001;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_multiple_calls() {
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn test_temp_dir_exists() {
        let dir = create_temp_dir();
        assert!(dir.path().exists());
    }
}
