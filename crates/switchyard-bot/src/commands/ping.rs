//! `/ping`

use async_trait::async_trait;
use std::time::Duration;
use switchyard_commands::{
    CommandBuilder, CommandHandler, CommandKind, Invocation, ThrottleScope, ThrottleSettings,
};

use super::CommandContext;

struct Ping {
    ctx: CommandContext,
}

#[async_trait]
impl CommandHandler for Ping {
    async fn call(&self, invocation: Invocation) -> anyhow::Result<()> {
        invocation.reply(self.ctx.text(&invocation, "reply-pong", None)).await?;
        Ok(())
    }
}

pub fn command(ctx: &CommandContext) -> CommandBuilder {
    CommandBuilder::new(CommandKind::ChatInput, "ping")
        .description("Check whether the bot is responsive")
        .category("Utility")
        .throttle(ThrottleSettings::new(ThrottleScope::User, 5, Duration::from_secs(10)))
        .run(Ping { ctx: ctx.clone() })
}
