//! Serenity gateway interactions behind the dispatch [`Interaction`] trait

use async_trait::async_trait;
use serenity::all::{
    ChannelId, CommandDataOption, CommandDataOptionValue, CommandInteraction, ComponentInteraction,
    ComponentInteractionDataKind, Context, CreateAutocompleteResponse, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, EditInteractionResponse,
    GuildId, Http, Interaction as GatewayInteraction, InteractionContext, Member, ModalInteraction,
    Permissions, UserId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use switchyard_commands::{
    AutocompleteChoice, GuildInfo, Interaction, InteractionError, InteractionKind, MemberInfo, Reply,
    Surface,
};

const FRESH: u8 = 0;
const DEFERRED: u8 = 1;
const RESPONDED: u8 = 2;

enum Source {
    Command(CommandInteraction),
    Component(ComponentInteraction),
    Modal(ModalInteraction),
}

impl Source {
    async fn create_response(&self, http: &Arc<Http>, builder: CreateInteractionResponse) -> serenity::Result<()> {
        match self {
            Self::Command(i) => i.create_response(http, builder).await,
            Self::Component(i) => i.create_response(http, builder).await,
            Self::Modal(i) => i.create_response(http, builder).await,
        }
    }

    async fn edit_response(&self, http: &Arc<Http>, builder: EditInteractionResponse) -> serenity::Result<()> {
        match self {
            Self::Command(i) => i.edit_response(http, builder).await.map(drop),
            Self::Component(i) => i.edit_response(http, builder).await.map(drop),
            Self::Modal(i) => i.edit_response(http, builder).await.map(drop),
        }
    }

    async fn create_followup(
        &self,
        http: &Arc<Http>,
        builder: CreateInteractionResponseFollowup,
    ) -> serenity::Result<()> {
        match self {
            Self::Command(i) => i.create_followup(http, builder).await.map(drop),
            Self::Component(i) => i.create_followup(http, builder).await.map(drop),
            Self::Modal(i) => i.create_followup(http, builder).await.map(drop),
        }
    }
}

/// Fields shared by every interaction variant
struct Common<'a> {
    user_id: UserId,
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
    member: Option<&'a Member>,
    app_permissions: Option<Permissions>,
    locale: &'a str,
    context: Option<InteractionContext>,
}

/// Caller and channel data captured when the interaction arrived
struct Snapshot {
    user_id: UserId,
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
    channel_category_id: Option<ChannelId>,
    channel_nsfw: bool,
    surface: Surface,
    member: Option<MemberInfo>,
    guild: Option<GuildInfo>,
    app_permissions: Option<Permissions>,
    locale: String,
}

impl Snapshot {
    fn capture(ctx: &Context, common: &Common<'_>) -> Self {
        let (guild, channel) = match common.guild_id {
            Some(guild_id) => match ctx.cache.guild(guild_id) {
                Some(cached) => (
                    Some(GuildInfo {
                        id: guild_id,
                        owner_id: cached.owner_id,
                    }),
                    cached
                        .channels
                        .get(&common.channel_id)
                        .map(|channel| (channel.nsfw, channel.parent_id)),
                ),
                None => (None, None),
            },
            None => (None, None),
        };
        let (channel_nsfw, channel_category_id) = channel.unwrap_or((false, None));

        let surface = match (common.guild_id, common.context) {
            (Some(_), _) => Surface::Guild,
            (None, Some(InteractionContext::PrivateChannel)) => Surface::PrivateChannel,
            (None, _) => Surface::BotDm,
        };

        let member = common.member.map(|member| MemberInfo {
            user_id: member.user.id,
            roles: member.roles.clone(),
            permissions: member.permissions.unwrap_or_else(Permissions::empty),
        });

        Self {
            user_id: common.user_id,
            guild_id: common.guild_id,
            channel_id: common.channel_id,
            channel_category_id,
            channel_nsfw,
            surface,
            member,
            guild,
            app_permissions: common.app_permissions,
            locale: common.locale.to_string(),
        }
    }
}

/// Names and option values the dispatcher routes on
#[derive(Default)]
struct Routing {
    command_name: Option<String>,
    custom_id: Option<String>,
    focused_option: Option<String>,
    subcommand_group: Option<String>,
    subcommand: Option<String>,
    options: HashMap<String, String>,
}

/// An interaction received from the gateway.
///
/// Cache lookups happen once in [`SerenityInteraction::from_gateway`]; the
/// trait accessors only read the captured values.
pub struct SerenityInteraction {
    http: Arc<Http>,
    source: Source,
    kind: InteractionKind,
    routing: Routing,
    snapshot: Snapshot,
    state: AtomicU8,
}

impl SerenityInteraction {
    /// Adapt a gateway interaction; pings and unknown component types yield `None`
    pub fn from_gateway(ctx: &Context, interaction: GatewayInteraction) -> Option<Self> {
        match interaction {
            GatewayInteraction::Command(command) => {
                let kind = match u8::from(command.data.kind) {
                    2 => InteractionKind::UserContextMenu,
                    3 => InteractionKind::MessageContextMenu,
                    4 => InteractionKind::PrimaryEntryPoint,
                    _ => InteractionKind::ChatInput,
                };
                Some(Self::from_command(ctx, command, kind))
            }
            GatewayInteraction::Autocomplete(command) => {
                Some(Self::from_command(ctx, command, InteractionKind::Autocomplete))
            }
            GatewayInteraction::Component(component) => {
                let kind = match &component.data.kind {
                    ComponentInteractionDataKind::Button => InteractionKind::Button,
                    ComponentInteractionDataKind::StringSelect { .. } => InteractionKind::StringSelect,
                    ComponentInteractionDataKind::UserSelect { .. } => InteractionKind::UserSelect,
                    ComponentInteractionDataKind::RoleSelect { .. } => InteractionKind::RoleSelect,
                    ComponentInteractionDataKind::MentionableSelect { .. } => {
                        InteractionKind::MentionableSelect
                    }
                    ComponentInteractionDataKind::ChannelSelect { .. } => InteractionKind::ChannelSelect,
                    ComponentInteractionDataKind::Unknown(_) => return None,
                };
                let snapshot = Snapshot::capture(
                    ctx,
                    &Common {
                        user_id: component.user.id,
                        guild_id: component.guild_id,
                        channel_id: component.channel_id,
                        member: component.member.as_ref(),
                        app_permissions: component.app_permissions,
                        locale: &component.locale,
                        context: component.context,
                    },
                );
                let routing = Routing {
                    custom_id: Some(component.data.custom_id.clone()),
                    ..Routing::default()
                };
                Some(Self::assemble(ctx, Source::Component(component), kind, routing, snapshot))
            }
            GatewayInteraction::Modal(modal) => {
                let snapshot = Snapshot::capture(
                    ctx,
                    &Common {
                        user_id: modal.user.id,
                        guild_id: modal.guild_id,
                        channel_id: modal.channel_id,
                        member: modal.member.as_ref(),
                        app_permissions: modal.app_permissions,
                        locale: &modal.locale,
                        context: modal.context,
                    },
                );
                let routing = Routing {
                    custom_id: Some(modal.data.custom_id.clone()),
                    ..Routing::default()
                };
                Some(Self::assemble(
                    ctx,
                    Source::Modal(modal),
                    InteractionKind::ModalSubmit,
                    routing,
                    snapshot,
                ))
            }
            _ => None,
        }
    }

    fn from_command(ctx: &Context, command: CommandInteraction, kind: InteractionKind) -> Self {
        let snapshot = Snapshot::capture(
            ctx,
            &Common {
                user_id: command.user.id,
                guild_id: command.guild_id,
                channel_id: command.channel_id,
                member: command.member.as_deref(),
                app_permissions: command.app_permissions,
                locale: &command.locale,
                context: command.context,
            },
        );

        let (group, sub, leaf) = split_sub_path(&command.data.options);
        let routing = Routing {
            command_name: Some(command.data.name.clone()),
            custom_id: None,
            focused_option: (kind == InteractionKind::Autocomplete)
                .then(|| command.data.autocomplete().map(|focused| focused.name.to_string()))
                .flatten(),
            subcommand_group: group,
            subcommand: sub,
            options: leaf
                .iter()
                .filter_map(|option| option_text(&option.value).map(|text| (option.name.clone(), text)))
                .collect(),
        };

        Self::assemble(ctx, Source::Command(command), kind, routing, snapshot)
    }

    fn assemble(ctx: &Context, source: Source, kind: InteractionKind, routing: Routing, snapshot: Snapshot) -> Self {
        Self {
            http: ctx.http.clone(),
            source,
            kind,
            routing,
            snapshot,
            state: AtomicU8::new(FRESH),
        }
    }
}

/// Subcommand group, subcommand and the options of the invoked leaf
fn split_sub_path(options: &[CommandDataOption]) -> (Option<String>, Option<String>, &[CommandDataOption]) {
    for option in options {
        match &option.value {
            CommandDataOptionValue::SubCommandGroup(inner) => {
                for sub in inner {
                    if let CommandDataOptionValue::SubCommand(leaf) = &sub.value {
                        return (Some(option.name.clone()), Some(sub.name.clone()), leaf);
                    }
                }
                return (Some(option.name.clone()), None, &[]);
            }
            CommandDataOptionValue::SubCommand(leaf) => return (None, Some(option.name.clone()), leaf),
            _ => {}
        }
    }
    (None, None, options)
}

fn option_text(value: &CommandDataOptionValue) -> Option<String> {
    Some(match value {
        CommandDataOptionValue::String(s) => s.clone(),
        CommandDataOptionValue::Integer(i) => i.to_string(),
        CommandDataOptionValue::Number(n) => n.to_string(),
        CommandDataOptionValue::Boolean(b) => b.to_string(),
        CommandDataOptionValue::User(id) => id.to_string(),
        CommandDataOptionValue::Role(id) => id.to_string(),
        CommandDataOptionValue::Channel(id) => id.to_string(),
        CommandDataOptionValue::Mentionable(id) => id.to_string(),
        CommandDataOptionValue::Attachment(id) => id.to_string(),
        CommandDataOptionValue::Autocomplete { value, .. } => value.clone(),
        _ => return None,
    })
}

#[async_trait]
impl Interaction for SerenityInteraction {
    fn kind(&self) -> InteractionKind {
        self.kind
    }

    fn command_name(&self) -> Option<String> {
        self.routing.command_name.clone()
    }

    fn custom_id(&self) -> Option<String> {
        self.routing.custom_id.clone()
    }

    fn focused_option(&self) -> Option<String> {
        self.routing.focused_option.clone()
    }

    fn subcommand_group(&self) -> Option<String> {
        self.routing.subcommand_group.clone()
    }

    fn subcommand(&self) -> Option<String> {
        self.routing.subcommand.clone()
    }

    fn option(&self, name: &str) -> Option<String> {
        self.routing.options.get(name).cloned()
    }

    fn user_id(&self) -> UserId {
        self.snapshot.user_id
    }

    fn guild_id(&self) -> Option<GuildId> {
        self.snapshot.guild_id
    }

    fn channel_id(&self) -> ChannelId {
        self.snapshot.channel_id
    }

    fn channel_category_id(&self) -> Option<ChannelId> {
        self.snapshot.channel_category_id
    }

    fn channel_nsfw(&self) -> bool {
        self.snapshot.channel_nsfw
    }

    fn surface(&self) -> Surface {
        self.snapshot.surface
    }

    fn member(&self) -> Option<MemberInfo> {
        self.snapshot.member.clone()
    }

    fn guild(&self) -> Option<GuildInfo> {
        self.snapshot.guild
    }

    fn app_permissions(&self) -> Option<Permissions> {
        self.snapshot.app_permissions
    }

    fn locale(&self) -> String {
        self.snapshot.locale.clone()
    }

    fn is_acknowledged(&self) -> bool {
        self.state.load(Ordering::SeqCst) != FRESH
    }

    fn is_replied(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RESPONDED
    }

    async fn defer(&self, ephemeral: bool) -> Result<(), InteractionError> {
        if self
            .state
            .compare_exchange(FRESH, DEFERRED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(InteractionError::AlreadyAcknowledged);
        }

        let response = CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(ephemeral));
        if let Err(e) = self.source.create_response(&self.http, response).await {
            self.state.store(FRESH, Ordering::SeqCst);
            return Err(InteractionError::transport(e));
        }
        Ok(())
    }

    async fn reply(&self, reply: Reply) -> Result<(), InteractionError> {
        let result = match self.state.swap(RESPONDED, Ordering::SeqCst) {
            FRESH => {
                let message = CreateInteractionResponseMessage::new()
                    .content(reply.content)
                    .ephemeral(reply.ephemeral);
                self.source
                    .create_response(&self.http, CreateInteractionResponse::Message(message))
                    .await
            }
            DEFERRED => {
                self.source
                    .edit_response(&self.http, EditInteractionResponse::new().content(reply.content))
                    .await
            }
            _ => {
                let followup = CreateInteractionResponseFollowup::new()
                    .content(reply.content)
                    .ephemeral(reply.ephemeral);
                self.source.create_followup(&self.http, followup).await
            }
        };

        result.map_err(InteractionError::transport)
    }

    async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<(), InteractionError> {
        if self.kind != InteractionKind::Autocomplete {
            return Err(InteractionError::Unsupported("autocomplete"));
        }

        let response = choices
            .into_iter()
            .fold(CreateAutocompleteResponse::new(), |response, choice| {
                response.add_string_choice(choice.name, choice.value)
            });
        self.state.store(RESPONDED, Ordering::SeqCst);
        self.source
            .create_response(&self.http, CreateInteractionResponse::Autocomplete(response))
            .await
            .map_err(InteractionError::transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::all::{CommandDataOption, CommandDataOptionValue, RoleId};

    fn option(name: &str, value: CommandDataOptionValue) -> CommandDataOption {
        serde_json::from_value::<CommandDataOption>(serde_json::json!({ "name": name, "type": 3, "value": "x" }))
            .map(|mut option| {
                option.value = value;
                option
            })
            .unwrap()
    }

    #[test]
    fn test_split_sub_path_nested_group() {
        let leaf = vec![option("role", CommandDataOptionValue::Role(RoleId::new(7)))];
        let options = vec![option(
            "moderators",
            CommandDataOptionValue::SubCommandGroup(vec![option(
                "add",
                CommandDataOptionValue::SubCommand(leaf),
            )]),
        )];

        let (group, sub, leaf) = split_sub_path(&options);
        assert_eq!(group.as_deref(), Some("moderators"));
        assert_eq!(sub.as_deref(), Some("add"));
        assert_eq!(leaf.len(), 1);
        assert_eq!(option_text(&leaf[0].value).as_deref(), Some("7"));
    }

    #[test]
    fn test_split_sub_path_flat_options() {
        let options = vec![option("text", CommandDataOptionValue::String("hi".into()))];
        let (group, sub, leaf) = split_sub_path(&options);

        assert!(group.is_none() && sub.is_none());
        assert_eq!(option_text(&leaf[0].value).as_deref(), Some("hi"));
    }
}
