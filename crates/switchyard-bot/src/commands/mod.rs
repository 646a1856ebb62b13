//! Built-in commands shipped with the bot

use once_cell::sync::OnceCell;
use std::sync::Arc;
use switchyard_commands::{Command, CommandRegistry, GuildSettingsManager, Invocation, ProgrammerError};
use switchyard_i18n::{FluentArgs, I18nManager};

pub mod level;
pub mod ping;
pub mod settings;

/// Services the built-in commands are constructed with
#[derive(Clone)]
pub struct CommandContext {
    pub i18n: Arc<I18nManager>,
    pub settings: Arc<GuildSettingsManager>,
    /// Filled once the registry is built; read by handlers that list commands
    pub registry: Arc<OnceCell<Arc<CommandRegistry>>>,
}

impl CommandContext {
    pub fn new(i18n: Arc<I18nManager>, settings: Arc<GuildSettingsManager>) -> Self {
        Self {
            i18n,
            settings,
            registry: Arc::new(OnceCell::new()),
        }
    }

    /// Message `key` in the locale of the invoking user
    pub fn text(&self, invocation: &Invocation, key: &str, args: Option<&FluentArgs>) -> String {
        let locale = self.i18n.resolve_locale(&invocation.interaction.locale());
        self.i18n.get_message_or_default(key, locale, args, key)
    }
}

/// Build every built-in command with translated metadata
pub fn all(ctx: &CommandContext) -> Result<Vec<Command>, ProgrammerError> {
    [ping::command(ctx), level::command(ctx), settings::command(ctx)]
        .into_iter()
        .map(|builder| builder.build_with(ctx.i18n.as_ref()))
        .collect()
}
