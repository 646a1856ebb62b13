//! Immutable command declarations and their builder

use serenity::all::{ChannelId, GuildId, Permissions, RoleId, UserId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ProgrammerError;
use crate::handler::{CommandHandler, Handler};
use crate::interaction::Surface;
use crate::kind::CommandKind;
use crate::permissions::PermissionLevel;
use crate::schema::{CommandOption, CommandSchema, Localizations};
use crate::throttle::ThrottleSettings;

/// Category of commands that do not declare one
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Interaction context type on the wire
const CONTEXT_GUILD: u8 = 0;
const CONTEXT_BOT_DM: u8 = 1;
const CONTEXT_PRIVATE_CHANNEL: u8 = 2;

/// Integration type on the wire
const INTEGRATION_GUILD_INSTALL: u8 = 0;
const INTEGRATION_USER_INSTALL: u8 = 1;

/// Surfaces a command may be used on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contexts {
    pub guild: bool,
    pub bot_dm: bool,
    pub private_channel: bool,
}

impl Contexts {
    pub fn allows(&self, surface: Surface) -> bool {
        match surface {
            Surface::Guild => self.guild,
            Surface::BotDm => self.bot_dm,
            Surface::PrivateChannel => self.private_channel,
        }
    }
}

impl Default for Contexts {
    fn default() -> Self {
        Self {
            guild: true,
            bot_dm: true,
            private_channel: true,
        }
    }
}

/// Where and whether a command runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enablement {
    pub enabled: bool,
    pub nsfw_only: bool,
    /// Overrides `contexts` when set
    pub guild_only: bool,
    pub contexts: Contexts,
    /// Guild allow-list; empty allows every guild
    pub guilds: Vec<GuildId>,
}

impl Enablement {
    /// Surfaces the command is declared for
    pub fn effective_contexts(&self) -> Contexts {
        if self.guild_only {
            Contexts {
                guild: true,
                bot_dm: false,
                private_channel: false,
            }
        } else {
            self.contexts
        }
    }
}

impl Default for Enablement {
    fn default() -> Self {
        Self {
            enabled: true,
            nsfw_only: false,
            guild_only: false,
            contexts: Contexts::default(),
            guilds: Vec::new(),
        }
    }
}

/// Allow-lists; an empty list leaves its dimension unrestricted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    pub guilds: Vec<GuildId>,
    pub channels: Vec<ChannelId>,
    pub categories: Vec<ChannelId>,
    pub roles: Vec<RoleId>,
    pub users: Vec<UserId>,
}

impl Whitelist {
    pub fn is_empty(&self) -> bool {
        self.guilds.is_empty()
            && self.channels.is_empty()
            && self.categories.is_empty()
            && self.roles.is_empty()
            && self.users.is_empty()
    }
}

/// Who may run a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirements {
    pub level: PermissionLevel,
    /// Platform bits the caller must hold (guilds only)
    pub user_permissions: Permissions,
    /// Platform bits the application must hold (guilds only)
    pub bot_permissions: Permissions,
    pub whitelist: Whitelist,
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            level: PermissionLevel::User,
            user_permissions: Permissions::empty(),
            bot_permissions: Permissions::empty(),
            whitelist: Whitelist::default(),
        }
    }
}

/// Acknowledgment behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionOptions {
    /// Defer before the handler runs
    pub auto_defer: bool,
    /// Acknowledge and reply privately
    pub ephemeral: bool,
    /// Refuse to run when guild data is not cached
    pub require_cache: bool,
}

/// Source of command metadata translations
pub trait Localizer: Send + Sync {
    /// Translations of `key` keyed by platform locale code
    fn localizations(&self, key: &str) -> Localizations;
}

/// Localizer that never translates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalization;

impl Localizer for NoLocalization {
    fn localizations(&self, _key: &str) -> Localizations {
        Localizations::new()
    }
}

impl Localizer for switchyard_i18n::I18nManager {
    fn localizations(&self, key: &str) -> Localizations {
        switchyard_i18n::I18nManager::localizations(self, key)
    }
}

/// A finalized command
#[derive(Clone)]
pub struct Command {
    kind: CommandKind,
    id: String,
    name: String,
    pub category: String,
    pub enablement: Enablement,
    pub requirements: Requirements,
    pub throttle: ThrottleSettings,
    pub interaction: InteractionOptions,
    pub handler: Handler,
    schema: Option<CommandSchema>,
    children: Vec<Command>,
}

impl Command {
    pub fn builder(kind: CommandKind, name: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(kind, name)
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// `"{prefix}/{name}"`, fixed at build time
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Command name or custom id
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Platform payload, for registry-declared commands
    pub fn schema(&self) -> Option<&CommandSchema> {
        self.schema.as_ref()
    }

    pub fn children(&self) -> &[Command] {
        &self.children
    }

    /// This command followed by all descendants, depth first
    pub fn registry(mut self) -> Vec<Command> {
        let children = std::mem::take(&mut self.children);
        let mut out = vec![self];
        for child in children {
            out.extend(child.registry());
        }
        out
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("handler", &self.handler)
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

/// Derive the command id
pub fn command_id(kind: CommandKind, name: &str) -> Result<String, ProgrammerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProgrammerError::MissingId { kind: kind.as_str() });
    }
    Ok(format!("{}/{}", kind.id_prefix(), name))
}

/// Fluent construction of a [`Command`]
pub struct CommandBuilder {
    kind: CommandKind,
    name: String,
    description: String,
    category: Option<String>,
    options: Vec<CommandOption>,
    extra: serde_json::Map<String, serde_json::Value>,
    enablement: Enablement,
    requirements: Requirements,
    throttle: ThrottleSettings,
    interaction: InteractionOptions,
    run: Option<Arc<dyn CommandHandler>>,
    controllers: HashMap<String, Arc<dyn CommandHandler>>,
    children: Vec<CommandBuilder>,
}

impl CommandBuilder {
    pub fn new(kind: CommandKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: String::new(),
            category: None,
            options: Vec::new(),
            extra: serde_json::Map::new(),
            enablement: Enablement::default(),
            requirements: Requirements::default(),
            throttle: ThrottleSettings::default(),
            interaction: InteractionOptions::default(),
            run: None,
            controllers: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Untyped payload field
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn enablement(mut self, enablement: Enablement) -> Self {
        self.enablement = enablement;
        self
    }

    pub fn guild_only(mut self) -> Self {
        self.enablement.guild_only = true;
        self
    }

    pub fn nsfw(mut self) -> Self {
        self.enablement.nsfw_only = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enablement.enabled = false;
        self
    }

    pub fn requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn level(mut self, level: PermissionLevel) -> Self {
        self.requirements.level = level;
        self
    }

    pub fn user_permissions(mut self, permissions: Permissions) -> Self {
        self.requirements.user_permissions = permissions;
        self
    }

    pub fn bot_permissions(mut self, permissions: Permissions) -> Self {
        self.requirements.bot_permissions = permissions;
        self
    }

    pub fn throttle(mut self, throttle: ThrottleSettings) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn interaction(mut self, interaction: InteractionOptions) -> Self {
        self.interaction = interaction;
        self
    }

    pub fn auto_defer(mut self, ephemeral: bool) -> Self {
        self.interaction.auto_defer = true;
        self.interaction.ephemeral = ephemeral;
        self
    }

    pub fn run(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.run = Some(Arc::new(handler));
        self
    }

    /// Controller for `"sub"` or `"group.sub"`
    pub fn controller(mut self, path: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        self.controllers.insert(path.into(), Arc::new(handler));
        self
    }

    /// Register `child` alongside this command
    pub fn extend(mut self, child: CommandBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Build without translations
    pub fn build(self) -> Result<Command, ProgrammerError> {
        self.build_with(&NoLocalization)
    }

    /// Build, attaching translations for registry-declared commands
    pub fn build_with(self, localizer: &dyn Localizer) -> Result<Command, ProgrammerError> {
        let id = command_id(self.kind, &self.name)?;
        let name = self.name.trim().to_string();

        let handler = match (self.run, self.controllers.is_empty()) {
            (Some(_), false) => return Err(ProgrammerError::ConflictingHandlers { id }),
            (Some(run), true) => Handler::Run(run),
            (None, false) => Handler::Controllers(self.controllers),
            (None, true) => return Err(ProgrammerError::MissingHandler { id }),
        };

        if self.kind.is_chat_input() && self.description.trim().is_empty() {
            return Err(ProgrammerError::MissingDescription { id });
        }

        let schema = match self.kind.application_command_type() {
            Some(wire_type) => {
                let mut schema = CommandSchema::new(wire_type, name.clone());
                schema.description = self.description;
                schema.options = self.options;
                schema.extra = self.extra;
                derive_schema_fields(&mut schema, &self.enablement, &self.requirements);
                if self.kind == CommandKind::ChatInput {
                    localize(&mut schema, localizer);
                }
                Some(schema)
            }
            None => None,
        };

        let children = self
            .children
            .into_iter()
            .map(|child| child.build_with(localizer))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Command {
            kind: self.kind,
            id,
            name,
            category: self.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            enablement: self.enablement,
            requirements: self.requirements,
            throttle: self.throttle,
            interaction: self.interaction,
            handler,
            schema,
            children,
        })
    }
}

fn derive_schema_fields(schema: &mut CommandSchema, enablement: &Enablement, requirements: &Requirements) {
    let contexts = enablement.effective_contexts();

    let mut wire_contexts = Vec::new();
    if contexts.guild {
        wire_contexts.push(CONTEXT_GUILD);
    }
    if contexts.bot_dm {
        wire_contexts.push(CONTEXT_BOT_DM);
    }
    if contexts.private_channel {
        wire_contexts.push(CONTEXT_PRIVATE_CHANNEL);
    }

    let mut integrations = vec![INTEGRATION_GUILD_INSTALL];
    if contexts.private_channel {
        integrations.push(INTEGRATION_USER_INSTALL);
    }

    schema.contexts = Some(wire_contexts);
    schema.integration_types = Some(integrations);
    schema.nsfw = enablement.nsfw_only;
    schema.default_member_permissions = (!requirements.user_permissions.is_empty())
        .then(|| requirements.user_permissions.bits().to_string());
}

fn non_empty(map: Localizations) -> Option<Localizations> {
    (!map.is_empty()).then_some(map)
}

fn localize(schema: &mut CommandSchema, localizer: &dyn Localizer) {
    let base = format!("command-{}", schema.name);
    schema.name_localizations = non_empty(localizer.localizations(&format!("{}-name", base)));
    schema.description_localizations = non_empty(localizer.localizations(&format!("{}-description", base)));

    for option in &mut schema.options {
        localize_option(option, &base, localizer);
    }
}

fn localize_option(option: &mut CommandOption, parent: &str, localizer: &dyn Localizer) {
    let base = format!("{}-{}", parent, option.name);
    option.name_localizations = non_empty(localizer.localizations(&format!("{}-name", base)));
    option.description_localizations = non_empty(localizer.localizations(&format!("{}-description", base)));

    for nested in &mut option.options {
        localize_option(nested, &base, localizer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Invocation;

    async fn noop(_: Invocation) -> anyhow::Result<()> {
        Ok(())
    }

    struct Fixed;

    impl Localizer for Fixed {
        fn localizations(&self, key: &str) -> Localizations {
            let mut map = Localizations::new();
            if key == "command-ping-description" {
                map.insert("de".into(), "Prüft".into());
            }
            map
        }
    }

    #[test]
    fn test_id_derivation() {
        let command = Command::builder(CommandKind::Button, "confirm").run(noop).build().unwrap();
        assert_eq!(command.id(), "Button/confirm");
        assert_eq!(command.category, DEFAULT_CATEGORY);
        assert!(command.schema().is_none());

        let err = Command::builder(CommandKind::Button, "  ").run(noop).build().unwrap_err();
        assert_eq!(err, ProgrammerError::MissingId { kind: "button" });
    }

    #[test]
    fn test_exactly_one_handler_shape() {
        let none = Command::builder(CommandKind::Button, "a").build().unwrap_err();
        assert!(matches!(none, ProgrammerError::MissingHandler { .. }));

        let both = Command::builder(CommandKind::Button, "a")
            .run(noop)
            .controller("x", noop)
            .build()
            .unwrap_err();
        assert!(matches!(both, ProgrammerError::ConflictingHandlers { .. }));
    }

    #[test]
    fn test_derived_schema_fields() {
        let command = Command::builder(CommandKind::ChatInput, "ping")
            .description("Ping")
            .guild_only()
            .nsfw()
            .user_permissions(Permissions::MANAGE_GUILD)
            .run(noop)
            .build_with(&Fixed)
            .unwrap();

        let schema = command.schema().unwrap();
        assert_eq!(schema.kind, 1);
        assert_eq!(schema.contexts, Some(vec![CONTEXT_GUILD]));
        assert_eq!(schema.integration_types, Some(vec![INTEGRATION_GUILD_INSTALL]));
        assert!(schema.nsfw);
        assert_eq!(
            schema.default_member_permissions,
            Some(Permissions::MANAGE_GUILD.bits().to_string())
        );
        assert_eq!(schema.description_localizations.as_ref().and_then(|m| m.get("de")).unwrap(), "Prüft");
        assert!(schema.name_localizations.is_none());
    }

    #[test]
    fn test_plain_chat_input_is_not_localized() {
        let command = Command::builder(CommandKind::ChatInputPlain, "ping")
            .description("Ping")
            .run(noop)
            .build_with(&Fixed)
            .unwrap();

        assert_eq!(command.id(), "ChatInput/ping");
        assert!(command.schema().unwrap().description_localizations.is_none());
    }

    #[test]
    fn test_registry_flattens_children() {
        let command = Command::builder(CommandKind::ChatInput, "profile")
            .description("Profile")
            .run(noop)
            .extend(
                Command::builder(CommandKind::Button, "profile-refresh")
                    .run(noop)
                    .extend(Command::builder(CommandKind::ModalSubmit, "profile-edit").run(noop)),
            )
            .build()
            .unwrap();

        let ids: Vec<String> = command.registry().iter().map(|c| c.id().to_string()).collect();
        assert_eq!(ids, ["ChatInput/profile", "Button/profile-refresh", "ModalSubmit/profile-edit"]);
    }
}
