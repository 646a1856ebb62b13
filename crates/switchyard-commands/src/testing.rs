//! Scriptable [`Interaction`] for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::all::{ChannelId, GuildId, Permissions, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::InteractionError;
use crate::interaction::{AutocompleteChoice, GuildInfo, Interaction, MemberInfo, Reply, Surface};
use crate::kind::InteractionKind;

/// Interaction whose data is set through public fields and whose
/// acknowledgments are recorded
#[derive(Debug)]
pub struct TestInteraction {
    pub kind: InteractionKind,
    pub command_name: Option<String>,
    pub custom_id: Option<String>,
    pub focused_option: Option<String>,
    pub subcommand_group: Option<String>,
    pub subcommand: Option<String>,
    pub options: HashMap<String, String>,
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub channel_category_id: Option<ChannelId>,
    pub channel_nsfw: bool,
    pub surface: Surface,
    pub member: Option<MemberInfo>,
    pub guild: Option<GuildInfo>,
    pub app_permissions: Option<Permissions>,
    pub locale: String,
    acknowledged: AtomicBool,
    replied: AtomicBool,
    pub replies: Mutex<Vec<Reply>>,
    pub defers: Mutex<Vec<bool>>,
    pub choices: Mutex<Vec<Vec<AutocompleteChoice>>>,
}

impl TestInteraction {
    /// Chat input command in a guild, invoked by a member without permissions
    pub fn in_guild(kind: InteractionKind, name: &str, guild: u64, owner: u64, user: u64) -> Self {
        let user_id = UserId::new(user);
        let guild_id = GuildId::new(guild);
        let mut interaction = Self::in_dm(kind, name, user);
        interaction.guild_id = Some(guild_id);
        interaction.surface = Surface::Guild;
        interaction.member = Some(MemberInfo {
            user_id,
            roles: Vec::new(),
            permissions: Permissions::empty(),
        });
        interaction.guild = Some(GuildInfo {
            id: guild_id,
            owner_id: UserId::new(owner),
        });
        interaction.app_permissions = Some(Permissions::all());
        interaction
    }

    /// Interaction in a direct message with the bot
    pub fn in_dm(kind: InteractionKind, name: &str, user: u64) -> Self {
        let mut interaction = Self {
            kind,
            command_name: None,
            custom_id: None,
            focused_option: None,
            subcommand_group: None,
            subcommand: None,
            options: HashMap::new(),
            user_id: UserId::new(user),
            guild_id: None,
            channel_id: ChannelId::new(1),
            channel_category_id: None,
            channel_nsfw: false,
            surface: Surface::BotDm,
            member: None,
            guild: None,
            app_permissions: None,
            locale: "en-US".to_string(),
            acknowledged: AtomicBool::new(false),
            replied: AtomicBool::new(false),
            replies: Mutex::new(Vec::new()),
            defers: Mutex::new(Vec::new()),
            choices: Mutex::new(Vec::new()),
        };

        match kind {
            InteractionKind::Autocomplete => interaction.focused_option = Some(name.to_string()),
            k if k.is_component() => interaction.custom_id = Some(name.to_string()),
            _ => interaction.command_name = Some(name.to_string()),
        }
        interaction
    }

    pub fn with_member_permissions(mut self, permissions: Permissions) -> Self {
        if let Some(member) = self.member.as_mut() {
            member.permissions = permissions;
        }
        self
    }

    pub fn with_subcommand(mut self, group: Option<&str>, sub: Option<&str>) -> Self {
        self.subcommand_group = group.map(str::to_string);
        self.subcommand = sub.map(str::to_string);
        self
    }

    pub fn with_option(mut self, name: &str, value: impl Into<String>) -> Self {
        self.options.insert(name.to_string(), value.into());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn reply_contents(&self) -> Vec<String> {
        self.replies.lock().iter().map(|r| r.content.clone()).collect()
    }
}

#[async_trait]
impl Interaction for TestInteraction {
    fn kind(&self) -> InteractionKind {
        self.kind
    }

    fn command_name(&self) -> Option<String> {
        self.command_name.clone()
    }

    fn custom_id(&self) -> Option<String> {
        self.custom_id.clone()
    }

    fn focused_option(&self) -> Option<String> {
        self.focused_option.clone()
    }

    fn subcommand_group(&self) -> Option<String> {
        self.subcommand_group.clone()
    }

    fn subcommand(&self) -> Option<String> {
        self.subcommand.clone()
    }

    fn option(&self, name: &str) -> Option<String> {
        self.options.get(name).cloned()
    }

    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn guild_id(&self) -> Option<GuildId> {
        self.guild_id
    }

    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    fn channel_category_id(&self) -> Option<ChannelId> {
        self.channel_category_id
    }

    fn channel_nsfw(&self) -> bool {
        self.channel_nsfw
    }

    fn surface(&self) -> Surface {
        self.surface
    }

    fn member(&self) -> Option<MemberInfo> {
        self.member.clone()
    }

    fn guild(&self) -> Option<GuildInfo> {
        self.guild
    }

    fn app_permissions(&self) -> Option<Permissions> {
        self.app_permissions
    }

    fn locale(&self) -> String {
        self.locale.clone()
    }

    fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst)
    }

    fn is_replied(&self) -> bool {
        self.replied.load(Ordering::SeqCst)
    }

    async fn defer(&self, ephemeral: bool) -> Result<(), InteractionError> {
        if self.acknowledged.swap(true, Ordering::SeqCst) {
            return Err(InteractionError::AlreadyAcknowledged);
        }
        self.defers.lock().push(ephemeral);
        Ok(())
    }

    async fn reply(&self, reply: Reply) -> Result<(), InteractionError> {
        self.acknowledged.store(true, Ordering::SeqCst);
        self.replied.store(true, Ordering::SeqCst);
        self.replies.lock().push(reply);
        Ok(())
    }

    async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<(), InteractionError> {
        if self.kind != InteractionKind::Autocomplete {
            return Err(InteractionError::Unsupported("autocomplete"));
        }
        self.acknowledged.store(true, Ordering::SeqCst);
        self.choices.lock().push(choices);
        Ok(())
    }
}
