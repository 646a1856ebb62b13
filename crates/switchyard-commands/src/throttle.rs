//! Scoped rate limiting on top of a fixed-window usage counter

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serenity::all::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use std::time::Duration;
use switchyard_common::SharedClock;
use tokio::time::interval;
use tracing::debug;

/// Outcome of consuming one use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleResult {
    pub ok: bool,
    /// When the current window ends, epoch milliseconds
    pub expires_at: i64,
}

/// Usage counter keyed by scope key.
///
/// `consume` must be atomic per key.
#[async_trait]
pub trait ThrottleStore: Send + Sync {
    async fn consume(&self, key: &str, limit: u32, window: Duration) -> ThrottleResult;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: i64,
    ends_at: i64,
    count: u32,
}

/// In-process fixed-window counter
#[derive(Debug)]
pub struct MemoryThrottleStore {
    windows: DashMap<String, Window>,
    clock: SharedClock,
}

impl MemoryThrottleStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            windows: DashMap::new(),
            clock,
        }
    }

    /// Number of tracked windows
    pub fn active_windows(&self) -> usize {
        self.windows.len()
    }

    /// Drop windows that have ended
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.windows.len();
        self.windows.retain(|_, window| window.ends_at > now);

        let removed = before - self.windows.len();
        if removed > 0 {
            debug!("Cleaned up {} expired throttle windows", removed);
        }
        removed
    }

    /// Sweep expired windows every `every`
    pub fn start_cleanup_task(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                self.cleanup_expired();
            }
        })
    }
}

#[async_trait]
impl ThrottleStore for MemoryThrottleStore {
    async fn consume(&self, key: &str, limit: u32, window: Duration) -> ThrottleResult {
        let now = self.clock.now_millis();
        let length = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);

        // The entry guard holds the shard lock for the read-modify-write
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            ends_at: now.saturating_add(length),
            count: 0,
        });

        if now >= entry.ends_at {
            *entry = Window {
                started_at: now,
                ends_at: now.saturating_add(length),
                count: 0,
            };
        }

        let ok = entry.count < limit;
        if ok {
            entry.count += 1;
        }

        debug!(
            "Throttle {} -> {} ({}/{} since {})",
            key, ok, entry.count, limit, entry.started_at
        );
        ThrottleResult {
            ok,
            expires_at: entry.ends_at,
        }
    }
}

/// Which callers share a throttle window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ThrottleScope {
    /// Each user everywhere
    #[default]
    User,
    /// Each user per guild
    Member,
    /// Whole guild
    Guild,
    /// Whole channel
    Channel,
    /// Everyone
    Global,
}

/// Throttle declaration of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleSettings {
    pub enabled: bool,
    pub scope: ThrottleScope,
    pub limit: u32,
    pub window: Duration,
    /// Count autocomplete requests too
    pub include_autocomplete: bool,
}

impl ThrottleSettings {
    pub fn new(scope: ThrottleScope, limit: u32, window: Duration) -> Self {
        Self {
            enabled: true,
            scope,
            limit,
            window,
            include_autocomplete: false,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(ThrottleScope::User, 1, Duration::from_secs(3))
        }
    }

    pub fn with_autocomplete(mut self) -> Self {
        self.include_autocomplete = true;
        self
    }
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Caller identity used to derive scope keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleTarget {
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
}

/// Scope key of `command_id` for `target`.
///
/// Outside guilds `Member` falls back to `User` and `Guild` to `Channel`.
pub fn scope_key(command_id: &str, scope: ThrottleScope, target: &ThrottleTarget) -> String {
    match (scope, target.guild_id) {
        (ThrottleScope::User, _) | (ThrottleScope::Member, None) => {
            format!("{}:user:{}", command_id, target.user_id)
        }
        (ThrottleScope::Member, Some(guild)) => {
            format!("{}:member:{}:{}", command_id, guild, target.user_id)
        }
        (ThrottleScope::Guild, Some(guild)) => format!("{}:guild:{}", command_id, guild),
        (ThrottleScope::Channel, _) | (ThrottleScope::Guild, None) => {
            format!("{}:channel:{}", command_id, target.channel_id)
        }
        (ThrottleScope::Global, _) => format!("{}:global", command_id),
    }
}

/// Applies command throttle settings through a [`ThrottleStore`]
#[derive(Clone)]
pub struct Throttler {
    store: Arc<dyn ThrottleStore>,
    clock: SharedClock,
}

impl Throttler {
    pub fn new(store: Arc<dyn ThrottleStore>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Consume one use of `command_id`.
    ///
    /// Disabled throttles and autocomplete requests that were not opted in
    /// pass without consuming.
    pub async fn check(
        &self,
        command_id: &str,
        settings: &ThrottleSettings,
        target: &ThrottleTarget,
        is_autocomplete: bool,
    ) -> ThrottleResult {
        if !settings.enabled || (is_autocomplete && !settings.include_autocomplete) {
            return ThrottleResult {
                ok: true,
                expires_at: self.clock.now_millis() - 1,
            };
        }

        let key = scope_key(command_id, settings.scope, target);
        self.store.consume(&key, settings.limit, settings.window).await
    }
}

impl std::fmt::Debug for Throttler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttler").field("clock", &self.clock).finish_non_exhaustive()
    }
}
