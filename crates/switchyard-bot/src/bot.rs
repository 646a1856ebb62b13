//! Gateway client and event routing

use serenity::all::{
    Client, Context, EventHandler, GatewayIntents, GuildId, GuildMemberUpdateEvent, Interaction, Member, Ready,
    Role, RoleId,
};
use serenity::async_trait;
use std::sync::Arc;
use switchyard_config::DiscordConfig;
use tracing::{debug, error, info};

use crate::adapter::SerenityInteraction;
use crate::app::App;
use crate::error::{BotError, BotResult};

/// Routes gateway events into the dispatcher and the permission cache
pub struct Handler {
    app: Arc<App>,
}

impl Handler {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            "Connected as {} serving {} guilds",
            ready.user.name,
            ready.guilds.len()
        );
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(adapted) = SerenityInteraction::from_gateway(&ctx, interaction) else {
            debug!("Ignoring unsupported interaction");
            return;
        };

        match self.app.dispatcher.dispatch(Arc::new(adapted)).await {
            Ok(outcome) => debug!(?outcome, "Dispatch finished"),
            Err(e) => error!("Command registration bug surfaced during dispatch: {}", e),
        }
    }

    async fn guild_role_update(&self, _ctx: Context, _old: Option<Role>, new: Role) {
        self.app.permissions.invalidate_guild(new.guild_id).await;
    }

    async fn guild_role_delete(&self, _ctx: Context, guild_id: GuildId, _role: RoleId, _data: Option<Role>) {
        self.app.permissions.invalidate_guild(guild_id).await;
    }

    async fn guild_member_update(
        &self,
        _ctx: Context,
        _old: Option<Member>,
        _new: Option<Member>,
        event: GuildMemberUpdateEvent,
    ) {
        self.app
            .permissions
            .invalidate_member(event.guild_id, event.user.id)
            .await;
    }
}

/// Gateway intents for `config`; member updates need the privileged intent
pub fn intents(config: &DiscordConfig) -> GatewayIntents {
    let intents = GatewayIntents::non_privileged();
    if config.member_events {
        intents | GatewayIntents::GUILD_MEMBERS
    } else {
        intents
    }
}

/// Connect to the gateway and serve until Ctrl+C
pub async fn start(app: Arc<App>) -> BotResult<()> {
    let config = app.config.get();
    let token = config.discord.token.clone();
    if token.trim().is_empty() {
        return Err(BotError::Missing("DISCORD_TOKEN is not set".to_string()));
    }
    if !config.discord.member_events {
        info!("Member events disabled, role changes of members apply after the permission cache expires");
    }

    let mut client = Client::builder(&token, intents(&config.discord))
        .event_handler(Handler::new(app))
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested, closing shards");
                shard_manager.shutdown_all().await;
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    client.start().await?;
    info!("Gateway client stopped");
    Ok(())
}
