//! `/level`

use async_trait::async_trait;
use switchyard_commands::{CommandBuilder, CommandHandler, CommandKind, Invocation};
use switchyard_i18n::fluent_args;

use super::CommandContext;

struct Level {
    ctx: CommandContext,
}

#[async_trait]
impl CommandHandler for Level {
    async fn call(&self, invocation: Invocation) -> anyhow::Result<()> {
        let level = self.ctx.text(&invocation, invocation.level.message_key(), None);
        let args = fluent_args!["level" => level];
        invocation
            .reply(self.ctx.text(&invocation, "reply-level", args.as_ref()))
            .await?;
        Ok(())
    }
}

pub fn command(ctx: &CommandContext) -> CommandBuilder {
    CommandBuilder::new(CommandKind::ChatInput, "level")
        .description("Show your permission level in this server")
        .category("Utility")
        .guild_only()
        .run(Level { ctx: ctx.clone() })
}
