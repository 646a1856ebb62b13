//! Wiring of configuration, storage, commands and the dispatcher

use serenity::all::GuildId;
use std::sync::Arc;
use std::time::Duration;
use switchyard_commands::{
    CommandRegistry, DispatchServices, Dispatcher, GuildDataAccessor, GuildDatabase, GuildSettingsManager,
    MemoryThrottleStore, MetricsManager, PermissionResolver, Throttler,
};
use switchyard_common::{system_clock, SwitchyardError};
use switchyard_config::{Config, ConfigCache};
use switchyard_i18n::{I18nManager, Locale, ResourceManager};
use switchyard_sync::{
    OfflineRegistry, RemoteRegistry, SerenityRegistry, SledSnapshotStore, SyncDiff, SyncOptions, SyncReport,
    SyncScope, Synchronizer,
};
use tracing::{info, warn};

use crate::cli::ScopeArg;
use crate::commands::{self, CommandContext};
use crate::error::{BotError, BotResult};

const DATABASE_FILE: &str = "switchyard.db";
const METRICS_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);
const METRICS_RETENTION: Duration = Duration::from_secs(7 * 24 * 3600);

/// Fully wired application
pub struct App {
    pub config: ConfigCache,
    pub i18n: Arc<I18nManager>,
    pub guild_db: GuildDatabase,
    pub permissions: Arc<PermissionResolver>,
    pub guild_settings: Arc<GuildSettingsManager>,
    pub metrics: Arc<MetricsManager>,
    pub throttle_store: Arc<MemoryThrottleStore>,
    pub registry: Arc<CommandRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub snapshots: Arc<SledSnapshotStore>,
}

impl App {
    /// Open storage under `storage.data_dir` and build every command
    pub fn build(config: Config) -> BotResult<Self> {
        let default_locale = Locale::from_code(&config.dispatch.default_locale).unwrap_or_else(|| {
            warn!(
                "Unsupported default locale '{}', using {:?}",
                config.dispatch.default_locale,
                Locale::default()
            );
            Locale::default()
        });
        let resources = match &config.dispatch.locales_dir {
            Some(dir) => ResourceManager::with_directory(dir),
            None => ResourceManager::bundled(),
        };
        let i18n = Arc::new(I18nManager::new(default_locale, resources)?);

        std::fs::create_dir_all(&config.storage.data_dir)?;
        let db_path = config.storage.data_dir.join(DATABASE_FILE);
        let guild_db = GuildDatabase::open(&db_path, config.storage.cache_capacity_mb)
            .map_err(|e| SwitchyardError::storage(format!("{:#}", e)))?;
        let snapshots = Arc::new(SledSnapshotStore::from_db(guild_db.db().clone()));

        let guild_data: Arc<dyn GuildDataAccessor> = Arc::new(guild_db.clone());
        let permissions = Arc::new(PermissionResolver::with_default_ladder(
            config.permissions.clone(),
            guild_data.clone(),
        ));
        let guild_settings = Arc::new(GuildSettingsManager::new(guild_data.clone(), permissions.clone()));

        let clock = system_clock();
        let throttle_store = Arc::new(MemoryThrottleStore::new(clock.clone()));
        let metrics = Arc::new(MetricsManager::new());

        let context = CommandContext::new(i18n.clone(), guild_settings.clone());
        let registry = Arc::new(CommandRegistry::new(commands::all(&context)?)?);
        // Settled before any interaction can reach a handler
        let _ = context.registry.set(registry.clone());

        let services = DispatchServices {
            permissions: permissions.clone(),
            guild_data,
            throttler: Throttler::new(throttle_store.clone(), clock),
            recorder: metrics.clone(),
            messages: i18n.clone(),
        };
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), &config.dispatch, services));

        info!(
            "Application ready with {} commands in categories {:?}",
            registry.len(),
            registry.categories()
        );
        Ok(Self {
            config: ConfigCache::new(config),
            i18n,
            guild_db,
            permissions,
            guild_settings,
            metrics,
            throttle_store,
            registry,
            dispatcher,
            snapshots,
        })
    }

    pub fn development_guild(&self) -> Option<GuildId> {
        self.config.get().discord.development_guild_id.map(GuildId::new)
    }

    /// Scope named on the command line
    pub fn scope(&self, arg: ScopeArg) -> BotResult<SyncScope> {
        SyncScope::development_or_global(arg == ScopeArg::Development, self.development_guild())
            .ok_or_else(|| BotError::Missing("discord.development_guild_id is not set".to_string()))
    }

    /// Scope synchronized on startup: the development guild when configured
    pub fn default_scope(&self) -> SyncScope {
        self.development_guild()
            .map(SyncScope::Development)
            .unwrap_or(SyncScope::Global)
    }

    /// Registry client for the configured token
    pub async fn remote(&self) -> BotResult<Arc<dyn RemoteRegistry>> {
        let config = self.config.get();
        if !config.has_token() {
            return Err(BotError::Missing("DISCORD_TOKEN is not set".to_string()));
        }

        let remote = SerenityRegistry::connect(&config.discord.token, config.discord.application_id).await?;
        Ok(Arc::new(remote))
    }

    pub fn synchronizer(&self, remote: Arc<dyn RemoteRegistry>) -> BotResult<Synchronizer> {
        Ok(Synchronizer::new(
            self.registry.manifest(),
            self.snapshots.clone(),
            remote,
            self.development_guild(),
        )?)
    }

    /// Reconcile `scope`; flags are combined with the `sync` config section
    pub async fn sync(&self, scope: SyncScope, force: bool, clear_opposite: bool) -> BotResult<SyncReport> {
        let config = self.config.get();
        let options = SyncOptions {
            force: force || config.sync.force,
            clear_opposite: clear_opposite || config.sync.clear_opposite_scope,
        };

        let remote = self.remote().await?;
        Ok(self.synchronizer(remote)?.sync(scope, options).await?)
    }

    /// Diff of the manifest against the stored snapshot; needs no token
    pub async fn check(&self, scope: SyncScope) -> BotResult<SyncDiff> {
        Ok(self
            .synchronizer(Arc::new(OfflineRegistry))?
            .check_synced(scope)
            .await?)
    }

    /// Spawn periodic cleanup of throttle windows and metrics history
    pub fn start_background_tasks(&self) {
        let every = Duration::from_secs(self.config.get().throttle.cleanup_interval_seconds);
        self.throttle_store.clone().start_cleanup_task(every);
        self.metrics
            .clone()
            .start_cleanup_task(METRICS_CLEANUP_INTERVAL, METRICS_RETENTION);
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("commands", &self.registry.len())
            .field("development_guild", &self.development_guild())
            .finish_non_exhaustive()
    }
}
