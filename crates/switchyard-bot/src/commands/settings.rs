//! `/settings`: moderator roles and per-guild command toggles

use anyhow::Context as _;
use async_trait::async_trait;
use serenity::all::{GuildId, RoleId};
use switchyard_commands::{
    command_id, AutocompleteChoice, CommandBuilder, CommandHandler, CommandKind, CommandOption, Invocation,
    OptionType, PermissionLevel,
};
use switchyard_i18n::fluent_args;

use super::CommandContext;

const MAX_CHOICES: usize = 25;

#[derive(Clone, Copy)]
enum RoleChange {
    Add,
    Remove,
}

#[derive(Clone, Copy)]
enum Toggle {
    Disable,
    Enable,
}

fn guild_of(invocation: &Invocation) -> anyhow::Result<GuildId> {
    invocation
        .interaction
        .guild_id()
        .context("settings invoked outside a guild")
}

/// Reply asking for `option` and report whether it was present
async fn required_option(ctx: &CommandContext, invocation: &Invocation, option: &str) -> anyhow::Result<Option<String>> {
    match invocation.option(option).filter(|value| !value.trim().is_empty()) {
        Some(value) => Ok(Some(value)),
        None => {
            let args = fluent_args!["option" => option.to_string()];
            invocation
                .reply(ctx.text(invocation, "settings-missing-option", args.as_ref()))
                .await?;
            Ok(None)
        }
    }
}

struct Moderators {
    ctx: CommandContext,
    change: RoleChange,
}

#[async_trait]
impl CommandHandler for Moderators {
    async fn call(&self, invocation: Invocation) -> anyhow::Result<()> {
        let guild = guild_of(&invocation)?;
        let Some(raw) = required_option(&self.ctx, &invocation, "role").await? else {
            return Ok(());
        };
        let role = raw
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(RoleId::new)
            .with_context(|| format!("role option is not a snowflake: {}", raw))?;

        let change = self.change;
        self.ctx
            .settings
            .update(guild, move |settings| match change {
                RoleChange::Add => {
                    if !settings.moderator_roles.contains(&role) {
                        settings.moderator_roles.push(role);
                    }
                }
                RoleChange::Remove => settings.moderator_roles.retain(|existing| *existing != role),
            })
            .await?;

        let key = match change {
            RoleChange::Add => "settings-moderator-added",
            RoleChange::Remove => "settings-moderator-removed",
        };
        let args = fluent_args!["role" => format!("<@&{}>", role)];
        invocation.reply(self.ctx.text(&invocation, key, args.as_ref())).await?;
        Ok(())
    }
}

struct CommandToggle {
    ctx: CommandContext,
    toggle: Toggle,
}

impl CommandToggle {
    /// Id of a chat input command that may be toggled, `None` for unknown names
    fn toggleable_id(&self, name: &str) -> Option<String> {
        let name = name.trim().trim_start_matches('/');
        if name == "settings" {
            return None;
        }
        let id = command_id(CommandKind::ChatInput, name).ok()?;
        let registry = self.ctx.registry.get()?;
        registry.get(&id).map(|_| id)
    }
}

#[async_trait]
impl CommandHandler for CommandToggle {
    async fn call(&self, invocation: Invocation) -> anyhow::Result<()> {
        let guild = guild_of(&invocation)?;
        let Some(name) = required_option(&self.ctx, &invocation, "command").await? else {
            return Ok(());
        };
        let args = fluent_args!["command" => name.clone()];

        let Some(id) = self.toggleable_id(&name) else {
            invocation
                .reply(self.ctx.text(&invocation, "settings-unknown-command", args.as_ref()))
                .await?;
            return Ok(());
        };

        let toggle = self.toggle;
        self.ctx
            .settings
            .update(guild, move |settings| match toggle {
                Toggle::Disable => {
                    if !settings.is_disabled(&id) {
                        settings.disabled_commands.push(id);
                    }
                }
                Toggle::Enable => settings.disabled_commands.retain(|existing| *existing != id),
            })
            .await?;

        let key = match toggle {
            Toggle::Disable => "settings-command-disabled",
            Toggle::Enable => "settings-command-enabled",
        };
        invocation.reply(self.ctx.text(&invocation, key, args.as_ref())).await?;
        Ok(())
    }
}

struct Show {
    ctx: CommandContext,
}

#[async_trait]
impl CommandHandler for Show {
    async fn call(&self, invocation: Invocation) -> anyhow::Result<()> {
        let guild = guild_of(&invocation)?;
        let settings = self.ctx.settings.get(guild).await?;
        let none = self.ctx.text(&invocation, "settings-none", None);

        let roles = if settings.moderator_roles.is_empty() {
            none.clone()
        } else {
            settings
                .moderator_roles
                .iter()
                .map(|role| format!("<@&{}>", role))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let commands = if settings.disabled_commands.is_empty() {
            none
        } else {
            settings
                .disabled_commands
                .iter()
                .map(|id| format!("/{}", id.rsplit('/').next().unwrap_or(id)))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let args = fluent_args!["roles" => roles, "commands" => commands];
        invocation
            .reply(self.ctx.text(&invocation, "settings-show", args.as_ref()))
            .await?;
        Ok(())
    }
}

/// Suggests chat input command names for `command` options
struct SuggestCommands {
    ctx: CommandContext,
}

#[async_trait]
impl CommandHandler for SuggestCommands {
    async fn call(&self, invocation: Invocation) -> anyhow::Result<()> {
        let typed = invocation.option("command").unwrap_or_default().to_lowercase();

        let choices = match self.ctx.registry.get() {
            Some(registry) => registry
                .iter()
                .filter(|command| command.kind() == CommandKind::ChatInput && command.name() != "settings")
                .filter(|command| command.name().starts_with(typed.as_str()))
                .take(MAX_CHOICES)
                .map(|command| AutocompleteChoice::new(command.name(), command.name()))
                .collect(),
            None => Vec::new(),
        };

        invocation.autocomplete(choices).await?;
        Ok(())
    }
}

fn command_option(sub: &str, description: &str) -> CommandOption {
    CommandOption::subcommand(sub, description).option(
        CommandOption::new(OptionType::String, "command", "Name of the command")
            .required(true)
            .autocomplete(true),
    )
}

fn role_option(sub: &str, description: &str) -> CommandOption {
    CommandOption::subcommand(sub, description)
        .option(CommandOption::new(OptionType::Role, "role", "Moderator role").required(true))
}

pub fn command(ctx: &CommandContext) -> CommandBuilder {
    CommandBuilder::new(CommandKind::ChatInput, "settings")
        .description("Manage how the bot behaves in this server")
        .category("Administration")
        .guild_only()
        .level(PermissionLevel::Administrator)
        .auto_defer(true)
        .option(
            CommandOption::group("moderators", "Manage moderator roles")
                .option(role_option("add", "Grant the moderator level to a role"))
                .option(role_option("remove", "Revoke the moderator level from a role")),
        )
        .option(CommandOption::subcommand("show", "Show the current server settings"))
        .option(command_option("disable", "Disable a command in this server"))
        .option(command_option("enable", "Enable a previously disabled command"))
        .controller(
            "moderators.add",
            Moderators {
                ctx: ctx.clone(),
                change: RoleChange::Add,
            },
        )
        .controller(
            "moderators.remove",
            Moderators {
                ctx: ctx.clone(),
                change: RoleChange::Remove,
            },
        )
        .controller("show", Show { ctx: ctx.clone() })
        .controller(
            "disable",
            CommandToggle {
                ctx: ctx.clone(),
                toggle: Toggle::Disable,
            },
        )
        .controller(
            "enable",
            CommandToggle {
                ctx: ctx.clone(),
                toggle: Toggle::Enable,
            },
        )
        .extend(
            CommandBuilder::new(CommandKind::Autocomplete, "command")
                .guild_only()
                .run(SuggestCommands { ctx: ctx.clone() }),
        )
}
