//! Interaction dispatch pipeline
//!
//! Every inbound interaction walks the same stages: identifier resolution,
//! registry lookup, eligibility, permissions, the optional auto-defer,
//! throttling, handler resolution and finally invocation. A refusal at any
//! stage ends the dispatch with a [`DispatchOutcome::Declined`] and at most
//! one ephemeral reply.

use chrono::Utc;
use futures::FutureExt;
use serenity::all::Permissions;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use switchyard_config::DispatchConfig;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::command::Command;
use crate::error::{DeclineReason, ProgrammerError};
use crate::guild_settings::GuildDataAccessor;
use crate::handler::{Handler, Invocation};
use crate::identifier::{IdentifierResolver, Resolution};
use crate::interaction::{Interaction, MemberInfo, Reply, Surface};
use crate::kind::InteractionKind;
use crate::messages::Messages;
use crate::metrics::{ExecutionOutcome, ExecutionRecord, ExecutionRecorder};
use crate::permissions::{PermissionLevel, PermissionResolver};
use crate::registry::CommandRegistry;
use crate::throttle::{ThrottleTarget, Throttler};

/// Collaborators the dispatcher consults
#[derive(Clone)]
pub struct DispatchServices {
    pub permissions: Arc<PermissionResolver>,
    pub guild_data: Arc<dyn GuildDataAccessor>,
    pub throttler: Throttler,
    pub recorder: Arc<dyn ExecutionRecorder>,
    pub messages: Arc<dyn Messages>,
}

/// How a dispatch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Custom id carried the opt-out token; left to a local collector
    OptedOut,
    /// No routable name on the interaction
    Unresolvable,
    /// No command registered under `id`
    Unknown { id: String, replied: bool },
    /// Refused before the handler ran
    Declined { id: String, reason: DeclineReason },
    Completed { id: String },
    /// Handler returned an error or panicked
    Failed { id: String, reason: String },
}

impl DispatchOutcome {
    pub fn command_id(&self) -> Option<&str> {
        match self {
            Self::OptedOut | Self::Unresolvable => None,
            Self::Unknown { id, .. }
            | Self::Declined { id, .. }
            | Self::Completed { id }
            | Self::Failed { id, .. } => Some(id),
        }
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declined { .. })
    }
}

/// Routes interactions to registered commands
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    resolver: IdentifierResolver,
    reply_to_unknown: bool,
    services: DispatchServices,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, config: &DispatchConfig, services: DispatchServices) -> Self {
        Self {
            registry,
            resolver: IdentifierResolver::from_config(config),
            reply_to_unknown: config.reply_to_unknown,
            services,
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    pub fn services(&self) -> &DispatchServices {
        &self.services
    }

    /// Run one interaction through the pipeline.
    ///
    /// Unknown commands and declines are ordinary outcomes. `Err` is only
    /// returned for registration mistakes that surface at dispatch time.
    pub async fn dispatch(&self, interaction: Arc<dyn Interaction>) -> Result<DispatchOutcome, ProgrammerError> {
        let kind = interaction.kind();

        let (id, raw, data) = match self.resolver.resolve(interaction.as_ref()) {
            Resolution::Route { id, raw, data } => (id, raw, data),
            Resolution::OptOut => {
                debug!("Ignoring opted-out {} interaction", kind);
                return Ok(DispatchOutcome::OptedOut);
            }
            Resolution::Unresolvable => {
                warn!("{} interaction carries no routable name", kind);
                return Ok(DispatchOutcome::Unresolvable);
            }
        };

        let span = info_span!(
            "dispatch",
            command = %id,
            kind = %kind,
            user = %interaction.user_id(),
            guild = ?interaction.guild_id().map(|g| g.get()),
        );

        self.route(interaction, id, raw, data).instrument(span).await
    }

    async fn route(
        &self,
        interaction: Arc<dyn Interaction>,
        id: String,
        raw_name: String,
        data: Option<String>,
    ) -> Result<DispatchOutcome, ProgrammerError> {
        let kind = interaction.kind();

        let Some(command) = self.registry.get(&id) else {
            return Ok(self.unknown(interaction.as_ref(), id).await);
        };

        let expected = command.kind().interaction_kind();
        if expected != kind {
            self.fail_visibly(interaction.as_ref()).await;
            return Err(ProgrammerError::KindMismatch {
                id,
                expected: expected.as_str(),
                actual: kind.as_str(),
            });
        }

        if let Err(reason) = check_eligibility(&command, interaction.as_ref()) {
            return Ok(self.decline(interaction.as_ref(), id, reason).await);
        }

        let member = interaction.member();
        let guild = interaction.guild();
        let level = self.services.permissions.resolve(member.as_ref(), guild.as_ref()).await;

        if let Err(reason) = self.check_permissions(&command, interaction.as_ref(), level, member.as_ref()).await {
            return Ok(self.decline(interaction.as_ref(), id, reason).await);
        }

        let is_autocomplete = kind == InteractionKind::Autocomplete;
        if command.interaction.auto_defer && !is_autocomplete && !interaction.is_acknowledged() {
            if let Err(e) = interaction.defer(command.interaction.ephemeral).await {
                warn!("Failed to defer interaction: {}", e);
            }
        }

        let target = ThrottleTarget {
            user_id: interaction.user_id(),
            guild_id: interaction.guild_id(),
            channel_id: interaction.channel_id(),
        };
        let throttle = self
            .services
            .throttler
            .check(&id, &command.throttle, &target, is_autocomplete)
            .await;
        if !throttle.ok {
            let reason = DeclineReason::Throttled {
                expires_at: throttle.expires_at,
            };
            return Ok(self.decline(interaction.as_ref(), id, reason).await);
        }

        let path = Handler::sub_path(
            interaction.subcommand_group().as_deref(),
            interaction.subcommand().as_deref(),
        );
        let Some(handler) = command.handler.resolve(path.as_deref()) else {
            self.fail_visibly(interaction.as_ref()).await;
            return Err(ProgrammerError::NoHandler { id, path });
        };

        let invocation = Invocation {
            command: command.clone(),
            interaction: interaction.clone(),
            raw_name,
            data,
            level,
        };

        let started = Instant::now();
        let result = AssertUnwindSafe(handler.call(invocation)).catch_unwind().await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let outcome = match result {
            Ok(Ok(())) => ExecutionOutcome::Success,
            Ok(Err(e)) => ExecutionOutcome::Failure {
                reason: format!("{:#}", e),
            },
            Err(panic) => ExecutionOutcome::Failure {
                reason: format!("handler panicked: {}", panic_message(panic.as_ref())),
            },
        };

        if is_autocomplete {
            return Ok(match outcome {
                ExecutionOutcome::Success => DispatchOutcome::Completed { id },
                ExecutionOutcome::Failure { reason } => {
                    warn!("Autocomplete handler failed: {}", reason);
                    DispatchOutcome::Failed { id, reason }
                }
            });
        }

        self.services.recorder.record(ExecutionRecord {
            command_id: id.clone(),
            user_id: interaction.user_id().get(),
            guild_id: interaction.guild_id().map(|g| g.get()),
            channel_id: interaction.channel_id().get(),
            timestamp: Utc::now(),
            duration_ms,
            outcome: outcome.clone(),
        });

        match outcome {
            ExecutionOutcome::Success => {
                debug!("Command completed in {}ms", duration_ms);
                Ok(DispatchOutcome::Completed { id })
            }
            ExecutionOutcome::Failure { reason } => {
                error!("Command failed after {}ms: {}", duration_ms, reason);
                // The handler's own reply already answered the user
                if !interaction.is_replied() {
                    let text = self.services.messages.handler_failure(&interaction.locale());
                    if let Err(e) = interaction.reply(Reply::ephemeral(text)).await {
                        warn!("Failed to report handler failure: {}", e);
                    }
                }
                Ok(DispatchOutcome::Failed { id, reason })
            }
        }
    }

    async fn unknown(&self, interaction: &dyn Interaction, id: String) -> DispatchOutcome {
        debug!("No command registered for '{}'", id);

        let replied = if self.reply_to_unknown && interaction.kind() != InteractionKind::Autocomplete {
            let text = self.services.messages.unknown_command(&interaction.locale());
            match interaction.reply(Reply::ephemeral(text)).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to reply to unknown command: {}", e);
                    false
                }
            }
        } else {
            false
        };

        DispatchOutcome::Unknown { id, replied }
    }

    async fn decline(&self, interaction: &dyn Interaction, id: String, reason: DeclineReason) -> DispatchOutcome {
        debug!("Declined: {}", reason);

        if interaction.kind() != InteractionKind::Autocomplete {
            let text = self.services.messages.decline(&reason, &interaction.locale());
            if let Err(e) = interaction.reply(Reply::ephemeral(text)).await {
                warn!("Failed to send decline reply: {}", e);
            }
        }

        DispatchOutcome::Declined { id, reason }
    }

    async fn fail_visibly(&self, interaction: &dyn Interaction) {
        if interaction.kind() == InteractionKind::Autocomplete {
            return;
        }
        let text = self.services.messages.handler_failure(&interaction.locale());
        if let Err(e) = interaction.reply(Reply::ephemeral(text)).await {
            warn!("Failed to report dispatch failure: {}", e);
        }
    }

    async fn check_permissions(
        &self,
        command: &Command,
        interaction: &dyn Interaction,
        level: PermissionLevel,
        member: Option<&MemberInfo>,
    ) -> Result<(), DeclineReason> {
        let requirements = &command.requirements;

        if level < requirements.level {
            return Err(DeclineReason::Level {
                required: requirements.level,
            });
        }

        if interaction.surface() == Surface::Guild {
            let held = member.map(|m| m.permissions).unwrap_or_else(Permissions::empty);
            let missing = requirements.user_permissions.difference(held);
            if !missing.is_empty() {
                return Err(DeclineReason::UserPermissions { missing });
            }

            match interaction.app_permissions() {
                Some(app) => {
                    let missing = requirements.bot_permissions.difference(app);
                    if !missing.is_empty() {
                        return Err(DeclineReason::BotPermissions { missing });
                    }
                }
                None if !requirements.bot_permissions.is_empty() => {
                    debug!("Bot permissions unknown, skipping check");
                }
                None => {}
            }
        }

        check_whitelist(command, interaction, member)?;

        if let Some(guild_id) = interaction.guild_id() {
            match self.services.guild_data.settings(guild_id).await {
                Ok(settings) if settings.is_disabled(command.id()) => return Err(DeclineReason::DisabledInGuild),
                Ok(_) => {}
                Err(e) => warn!("Failed to load settings of guild {}: {:#}", guild_id, e),
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.registry.len())
            .field("resolver", &self.resolver)
            .field("reply_to_unknown", &self.reply_to_unknown)
            .finish_non_exhaustive()
    }
}

fn check_eligibility(command: &Command, interaction: &dyn Interaction) -> Result<(), DeclineReason> {
    let enablement = &command.enablement;
    let surface = interaction.surface();

    if !enablement.enabled {
        return Err(DeclineReason::Disabled);
    }

    if enablement.guild_only && surface != Surface::Guild {
        return Err(DeclineReason::GuildOnly);
    }

    if !enablement.effective_contexts().allows(surface) {
        return Err(DeclineReason::Context);
    }

    if enablement.nsfw_only && !interaction.channel_nsfw() {
        return Err(DeclineReason::Nsfw);
    }

    if !enablement.guilds.is_empty()
        && !interaction
            .guild_id()
            .is_some_and(|guild| enablement.guilds.contains(&guild))
    {
        return Err(DeclineReason::GuildNotAllowed);
    }

    if command.interaction.require_cache && surface == Surface::Guild && interaction.guild().is_none() {
        return Err(DeclineReason::CacheUnavailable);
    }

    Ok(())
}

/// Every non-empty dimension must admit the caller
fn check_whitelist(
    command: &Command,
    interaction: &dyn Interaction,
    member: Option<&MemberInfo>,
) -> Result<(), DeclineReason> {
    let whitelist = &command.requirements.whitelist;
    if whitelist.is_empty() {
        return Ok(());
    }

    let admitted = (whitelist.guilds.is_empty()
        || interaction.guild_id().is_some_and(|g| whitelist.guilds.contains(&g)))
        && (whitelist.channels.is_empty() || whitelist.channels.contains(&interaction.channel_id()))
        && (whitelist.categories.is_empty()
            || interaction
                .channel_category_id()
                .is_some_and(|c| whitelist.categories.contains(&c)))
        && (whitelist.roles.is_empty()
            || member.is_some_and(|m| whitelist.roles.iter().any(|r| m.has_role(*r))))
        && (whitelist.users.is_empty() || whitelist.users.contains(&interaction.user_id()));

    if admitted {
        Ok(())
    } else {
        Err(DeclineReason::Whitelist)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
