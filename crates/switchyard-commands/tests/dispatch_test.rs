//! Integration tests for the dispatch pipeline.

use async_trait::async_trait;
use serenity::all::{GuildId, Permissions, RoleId, UserId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use switchyard_commands::testing::TestInteraction;
use switchyard_commands::{
    CommandBuilder, CommandKind, CommandOption, CommandRegistry, DeclineReason, DispatchOutcome,
    DispatchServices, Dispatcher, GuildDataAccessor, GuildInfo, GuildSettings, Interaction, InteractionKind,
    Invocation, LevelContext, LevelPredicate, LevelRule, MemberInfo, MemoryGuildSettings, MemoryThrottleStore,
    MetricsManager, PermissionLevel, PermissionResolver, PlainMessages, ProgrammerError, ThrottleScope,
    ThrottleSettings, Throttler,
};
use switchyard_common::test_utils::{discord_fixtures::*, init_test_logging};
use switchyard_common::{ManualClock, SharedClock};
use switchyard_config::{DispatchConfig, PermissionsConfig};

const START: i64 = 1_700_000_000_000;

struct Harness {
    dispatcher: Dispatcher,
    metrics: Arc<MetricsManager>,
    clock: ManualClock,
    guild_data: Arc<MemoryGuildSettings>,
}

fn harness(commands: Vec<CommandBuilder>, config: DispatchConfig) -> Harness {
    init_test_logging();

    let clock = ManualClock::new(START);
    let shared: SharedClock = Arc::new(clock.clone());
    let guild_data = Arc::new(MemoryGuildSettings::new());
    let permissions = Arc::new(PermissionResolver::with_default_ladder(
        PermissionsConfig::default(),
        guild_data.clone(),
    ));
    let metrics = Arc::new(MetricsManager::new());

    let services = DispatchServices {
        permissions,
        guild_data: guild_data.clone(),
        throttler: Throttler::new(Arc::new(MemoryThrottleStore::new(shared.clone())), shared),
        recorder: metrics.clone(),
        messages: Arc::new(PlainMessages),
    };

    let commands = commands
        .into_iter()
        .map(|builder| builder.build().unwrap())
        .collect::<Vec<_>>();
    let registry = Arc::new(CommandRegistry::new(commands).unwrap());

    Harness {
        dispatcher: Dispatcher::new(registry, &config, services),
        metrics,
        clock,
        guild_data,
    }
}

fn counting_handler(counter: Arc<AtomicUsize>) -> impl Fn(Invocation) -> futures::future::BoxFuture<'static, anyhow::Result<()>> {
    move |invocation: Invocation| {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            invocation.reply("done").await?;
            Ok::<_, anyhow::Error>(())
        })
    }
}

fn chat(name: &str, counter: &Arc<AtomicUsize>) -> CommandBuilder {
    CommandBuilder::new(CommandKind::ChatInput, name)
        .description("test command")
        .run(counting_handler(counter.clone()))
}

fn member_interaction(name: &str, permissions: Permissions) -> Arc<TestInteraction> {
    TestInteraction::in_guild(InteractionKind::ChatInput, name, GUILD_ID, GUILD_OWNER_ID, MEMBER_ID)
        .with_member_permissions(permissions)
        .into_arc()
}

async fn dispatch(harness: &Harness, interaction: &Arc<TestInteraction>) -> DispatchOutcome {
    let interaction: Arc<dyn Interaction> = interaction.clone();
    harness.dispatcher.dispatch(interaction).await.unwrap()
}

#[tokio::test]
async fn test_unknown_command_is_ignored_silently() {
    let harness = harness(Vec::new(), DispatchConfig::default());
    let interaction = member_interaction("missing", Permissions::empty());

    let outcome = dispatch(&harness, &interaction).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Unknown {
            id: "ChatInput/missing".to_string(),
            replied: false,
        }
    );
    assert!(interaction.replies.lock().is_empty());
}

#[tokio::test]
async fn test_unknown_command_reply_when_enabled() {
    let config = DispatchConfig {
        reply_to_unknown: true,
        ..DispatchConfig::default()
    };
    let harness = harness(Vec::new(), config);
    let interaction = member_interaction("missing", Permissions::empty());

    let outcome = dispatch(&harness, &interaction).await;

    assert!(matches!(outcome, DispatchOutcome::Unknown { replied: true, .. }));
    let replies = interaction.replies.lock();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].content, "Unknown command");
    assert!(replies[0].ephemeral);
}

#[tokio::test]
async fn test_moderator_is_declined_from_administrator_command() {
    let counter = Arc::new(AtomicUsize::new(0));
    let harness = harness(
        vec![chat("purge", &counter).level(PermissionLevel::Administrator)],
        DispatchConfig::default(),
    );
    let interaction = member_interaction("purge", Permissions::KICK_MEMBERS);

    let outcome = dispatch(&harness, &interaction).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Declined {
            id: "ChatInput/purge".to_string(),
            reason: DeclineReason::Level {
                required: PermissionLevel::Administrator,
            },
        }
    );
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(interaction.replies.lock().len(), 1);
    assert!(interaction.replies.lock()[0].ephemeral);
    assert!(harness.metrics.get_command_metrics("ChatInput/purge").is_none());
}

#[tokio::test]
async fn test_server_owner_passes_administrator_command() {
    let counter = Arc::new(AtomicUsize::new(0));
    let harness = harness(
        vec![chat("purge", &counter).level(PermissionLevel::Administrator)],
        DispatchConfig::default(),
    );
    let mut interaction =
        TestInteraction::in_guild(InteractionKind::ChatInput, "purge", GUILD_ID, GUILD_OWNER_ID, GUILD_OWNER_ID);
    interaction.channel_id = serenity::all::ChannelId::new(CHANNEL_ID);
    let interaction = interaction.into_arc();

    let outcome = dispatch(&harness, &interaction).await;

    assert!(matches!(outcome, DispatchOutcome::Completed { .. }));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(interaction.reply_contents(), vec!["done".to_string()]);
}

#[tokio::test]
async fn test_throttle_window_limits_and_resets() {
    let counter = Arc::new(AtomicUsize::new(0));
    let throttle = ThrottleSettings::new(ThrottleScope::User, 2, Duration::from_millis(5_000));
    let harness = harness(vec![chat("roll", &counter).throttle(throttle)], DispatchConfig::default());

    for _ in 0..2 {
        let interaction = member_interaction("roll", Permissions::empty());
        assert!(matches!(dispatch(&harness, &interaction).await, DispatchOutcome::Completed { .. }));
    }

    let interaction = member_interaction("roll", Permissions::empty());
    let outcome = dispatch(&harness, &interaction).await;
    assert_eq!(
        outcome,
        DispatchOutcome::Declined {
            id: "ChatInput/roll".to_string(),
            reason: DeclineReason::Throttled {
                expires_at: START + 5_000,
            },
        }
    );
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    harness.clock.advance(5_000);
    let interaction = member_interaction("roll", Permissions::empty());
    assert!(matches!(dispatch(&harness, &interaction).await, DispatchOutcome::Completed { .. }));
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

async fn explode(_invocation: Invocation) -> anyhow::Result<()> {
    panic!("kaboom")
}

async fn fail(_invocation: Invocation) -> anyhow::Result<()> {
    Err(anyhow::anyhow!("database offline"))
}

#[tokio::test]
async fn test_panicking_handler_is_reported_and_recorded() {
    let harness = harness(
        vec![CommandBuilder::new(CommandKind::ChatInput, "explode")
            .description("always panics")
            .run(explode)],
        DispatchConfig::default(),
    );
    let interaction = member_interaction("explode", Permissions::empty());

    let outcome = dispatch(&harness, &interaction).await;

    let DispatchOutcome::Failed { reason, .. } = outcome else {
        panic!("expected a failure, got {:?}", outcome);
    };
    assert!(reason.contains("kaboom"));
    assert_eq!(interaction.reply_contents(), vec!["Command failed".to_string()]);

    let metrics = harness.metrics.get_command_metrics("ChatInput/explode").unwrap();
    assert_eq!(metrics.total_executions, 1);
    assert_eq!(metrics.failed_executions, 1);
}

#[tokio::test]
async fn test_handler_error_is_recorded() {
    let harness = harness(
        vec![CommandBuilder::new(CommandKind::ChatInput, "fail")
            .description("always errors")
            .run(fail)],
        DispatchConfig::default(),
    );
    let interaction = member_interaction("fail", Permissions::empty());

    let outcome = dispatch(&harness, &interaction).await;

    assert!(matches!(outcome, DispatchOutcome::Failed { ref reason, .. } if reason.contains("database offline")));
    assert_eq!(harness.metrics.get_global_counts(), (1, 0, 1));
}

async fn reply_then_fail(invocation: Invocation) -> anyhow::Result<()> {
    invocation.reply("partial result").await?;
    Err(anyhow::anyhow!("late failure"))
}

#[tokio::test]
async fn test_failure_after_reply_sends_no_second_reply() {
    let harness = harness(
        vec![CommandBuilder::new(CommandKind::ChatInput, "late")
            .description("replies then errors")
            .run(reply_then_fail)],
        DispatchConfig::default(),
    );
    let interaction = member_interaction("late", Permissions::empty());

    let outcome = dispatch(&harness, &interaction).await;

    assert!(matches!(outcome, DispatchOutcome::Failed { ref reason, .. } if reason.contains("late failure")));
    assert_eq!(interaction.reply_contents(), vec!["partial result".to_string()]);
    assert_eq!(harness.metrics.get_global_counts(), (1, 0, 1));
}

fn settings_command(show: &Arc<AtomicUsize>, add: &Arc<AtomicUsize>) -> CommandBuilder {
    CommandBuilder::new(CommandKind::ChatInput, "settings")
        .description("guild settings")
        .option(CommandOption::subcommand("show", "show settings"))
        .option(
            CommandOption::group("moderators", "moderator roles")
                .option(CommandOption::subcommand("add", "add a role")),
        )
        .controller("show", counting_handler(show.clone()))
        .controller("moderators.add", counting_handler(add.clone()))
}

#[tokio::test]
async fn test_controllers_route_by_sub_path() {
    let show = Arc::new(AtomicUsize::new(0));
    let add = Arc::new(AtomicUsize::new(0));
    let harness = harness(vec![settings_command(&show, &add)], DispatchConfig::default());

    let interaction = TestInteraction::in_guild(InteractionKind::ChatInput, "settings", GUILD_ID, GUILD_OWNER_ID, MEMBER_ID)
        .with_subcommand(Some("moderators"), Some("add"))
        .into_arc();
    assert!(matches!(dispatch(&harness, &interaction).await, DispatchOutcome::Completed { .. }));

    let interaction = TestInteraction::in_guild(InteractionKind::ChatInput, "settings", GUILD_ID, GUILD_OWNER_ID, MEMBER_ID)
        .with_subcommand(None, Some("show"))
        .into_arc();
    assert!(matches!(dispatch(&harness, &interaction).await, DispatchOutcome::Completed { .. }));

    assert_eq!(show.load(Ordering::SeqCst), 1);
    assert_eq!(add.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_controller_is_a_programmer_error() {
    let show = Arc::new(AtomicUsize::new(0));
    let add = Arc::new(AtomicUsize::new(0));
    let harness = harness(vec![settings_command(&show, &add)], DispatchConfig::default());

    let interaction: Arc<dyn Interaction> =
        TestInteraction::in_guild(InteractionKind::ChatInput, "settings", GUILD_ID, GUILD_OWNER_ID, MEMBER_ID)
            .into_arc();
    let err = harness.dispatcher.dispatch(interaction).await.unwrap_err();

    assert_eq!(
        err,
        ProgrammerError::NoHandler {
            id: "ChatInput/settings".to_string(),
            path: None,
        }
    );
}

#[tokio::test]
async fn test_component_data_reaches_handler() {
    let seen = Arc::new(parking_lot::Mutex::new(None));
    let sink = seen.clone();
    let harness = harness(
        vec![CommandBuilder::new(CommandKind::Button, "confirm").run(move |invocation: Invocation| {
            let sink = sink.clone();
            async move {
                *sink.lock() = Some((invocation.raw_name.clone(), invocation.data.clone()));
                Ok::<_, anyhow::Error>(())
            }
        })],
        DispatchConfig::default(),
    );

    let interaction =
        TestInteraction::in_guild(InteractionKind::Button, "confirm#42", GUILD_ID, GUILD_OWNER_ID, MEMBER_ID).into_arc();
    let outcome = dispatch(&harness, &interaction).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Completed {
            id: "Button/confirm".to_string()
        }
    );
    assert_eq!(*seen.lock(), Some(("confirm#42".to_string(), Some("42".to_string()))));
}

#[tokio::test]
async fn test_opted_out_custom_id_is_left_alone() {
    let harness = harness(Vec::new(), DispatchConfig::default());
    let interaction =
        TestInteraction::in_guild(InteractionKind::Button, "collector:next", GUILD_ID, GUILD_OWNER_ID, MEMBER_ID)
            .into_arc();

    assert_eq!(dispatch(&harness, &interaction).await, DispatchOutcome::OptedOut);
    assert!(interaction.replies.lock().is_empty());
}

#[tokio::test]
async fn test_guild_only_command_declined_in_dm() {
    let counter = Arc::new(AtomicUsize::new(0));
    let harness = harness(vec![chat("ban", &counter).guild_only()], DispatchConfig::default());
    let interaction = TestInteraction::in_dm(InteractionKind::ChatInput, "ban", MEMBER_ID).into_arc();

    let outcome = dispatch(&harness, &interaction).await;

    assert!(matches!(
        outcome,
        DispatchOutcome::Declined {
            reason: DeclineReason::GuildOnly,
            ..
        }
    ));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_bot_permissions_are_listed() {
    let counter = Arc::new(AtomicUsize::new(0));
    let harness = harness(
        vec![chat("ban", &counter).bot_permissions(Permissions::BAN_MEMBERS | Permissions::SEND_MESSAGES)],
        DispatchConfig::default(),
    );
    let mut interaction =
        TestInteraction::in_guild(InteractionKind::ChatInput, "ban", GUILD_ID, GUILD_OWNER_ID, MEMBER_ID);
    interaction.app_permissions = Some(Permissions::SEND_MESSAGES);
    let interaction = interaction.into_arc();

    let outcome = dispatch(&harness, &interaction).await;

    assert!(matches!(
        outcome,
        DispatchOutcome::Declined {
            reason: DeclineReason::BotPermissions { missing },
            ..
        } if missing == Permissions::BAN_MEMBERS
    ));
}

#[tokio::test]
async fn test_guild_can_disable_a_command() {
    let counter = Arc::new(AtomicUsize::new(0));
    let harness = harness(vec![chat("meme", &counter)], DispatchConfig::default());
    harness
        .guild_data
        .store(
            GuildId::new(GUILD_ID),
            GuildSettings {
                disabled_commands: vec!["ChatInput/meme".to_string()],
                ..GuildSettings::default()
            },
        )
        .await
        .unwrap();

    let interaction = member_interaction("meme", Permissions::empty());
    let outcome = dispatch(&harness, &interaction).await;

    assert!(matches!(
        outcome,
        DispatchOutcome::Declined {
            reason: DeclineReason::DisabledInGuild,
            ..
        }
    ));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_auto_defer_acknowledges_before_handler() {
    let acknowledged = Arc::new(AtomicUsize::new(0));
    let seen = acknowledged.clone();
    let harness = harness(
        vec![CommandBuilder::new(CommandKind::ChatInput, "report")
            .description("slow command")
            .auto_defer(true)
            .run(move |invocation: Invocation| {
                let seen = seen.clone();
                async move {
                    if invocation.interaction.is_acknowledged() {
                        seen.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok::<_, anyhow::Error>(())
                }
            })],
        DispatchConfig::default(),
    );
    let interaction = member_interaction("report", Permissions::empty());

    dispatch(&harness, &interaction).await;

    assert_eq!(*interaction.defers.lock(), vec![true]);
    assert_eq!(acknowledged.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_autocomplete_decline_sends_nothing() {
    let counter = Arc::new(AtomicUsize::new(0));
    let harness = harness(
        vec![CommandBuilder::new(CommandKind::Autocomplete, "city")
            .level(PermissionLevel::Moderator)
            .run(counting_handler(counter.clone()))],
        DispatchConfig::default(),
    );
    let interaction =
        TestInteraction::in_guild(InteractionKind::Autocomplete, "city", GUILD_ID, GUILD_OWNER_ID, MEMBER_ID).into_arc();

    let outcome = dispatch(&harness, &interaction).await;

    assert!(outcome.is_declined());
    assert!(interaction.replies.lock().is_empty());
    assert!(interaction.choices.lock().is_empty());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_whitelisted_role_is_required() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut builder = chat("staff", &counter);
    let mut requirements = switchyard_commands::Requirements::default();
    requirements.whitelist.roles = vec![RoleId::new(MODERATOR_ROLE_ID)];
    builder = builder.requirements(requirements);
    let harness = harness(vec![builder], DispatchConfig::default());

    let outsider = member_interaction("staff", Permissions::empty());
    assert!(matches!(
        dispatch(&harness, &outsider).await,
        DispatchOutcome::Declined {
            reason: DeclineReason::Whitelist,
            ..
        }
    ));

    let mut insider = TestInteraction::in_guild(InteractionKind::ChatInput, "staff", GUILD_ID, GUILD_OWNER_ID, MEMBER_ID);
    if let Some(member) = insider.member.as_mut() {
        member.roles.push(RoleId::new(MODERATOR_ROLE_ID));
    }
    let insider = insider.into_arc();
    assert!(matches!(dispatch(&harness, &insider).await, DispatchOutcome::Completed { .. }));
}

struct CountingPredicate(Arc<AtomicUsize>);

#[async_trait]
impl LevelPredicate for CountingPredicate {
    async fn holds(&self, _ctx: &LevelContext<'_>) -> bool {
        self.0.fetch_add(1, Ordering::SeqCst);
        true
    }
}

#[tokio::test]
async fn test_permission_levels_are_cached_until_invalidated() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let guild_data: Arc<dyn GuildDataAccessor> = Arc::new(MemoryGuildSettings::new());
    let resolver = PermissionResolver::new(
        PermissionsConfig::default(),
        vec![LevelRule::new(PermissionLevel::Moderator, CountingPredicate(evaluations.clone()))],
        guild_data,
    );

    let member = MemberInfo {
        user_id: UserId::new(MEMBER_ID),
        roles: Vec::new(),
        permissions: Permissions::empty(),
    };
    let guild = GuildInfo {
        id: GuildId::new(GUILD_ID),
        owner_id: UserId::new(GUILD_OWNER_ID),
    };

    for _ in 0..3 {
        assert_eq!(resolver.resolve(Some(&member), Some(&guild)).await, PermissionLevel::Moderator);
    }
    assert_eq!(evaluations.load(Ordering::SeqCst), 1);

    resolver.invalidate_guild(GuildId::new(GUILD_ID)).await;
    resolver.resolve(Some(&member), Some(&guild)).await;
    assert_eq!(evaluations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_permission_levels_expire_after_ttl() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let config = PermissionsConfig {
        cache_ttl_seconds: 1,
        ..PermissionsConfig::default()
    };
    let resolver = PermissionResolver::new(
        config,
        vec![LevelRule::new(PermissionLevel::Moderator, CountingPredicate(evaluations.clone()))],
        Arc::new(MemoryGuildSettings::new()),
    );

    let member = MemberInfo {
        user_id: UserId::new(MEMBER_ID),
        roles: Vec::new(),
        permissions: Permissions::empty(),
    };
    let guild = GuildInfo {
        id: GuildId::new(GUILD_ID),
        owner_id: UserId::new(GUILD_OWNER_ID),
    };

    resolver.resolve(Some(&member), Some(&guild)).await;
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    resolver.resolve(Some(&member), Some(&guild)).await;

    assert_eq!(evaluations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_ladder_stops_at_highest_match() {
    let moderator = Arc::new(AtomicUsize::new(0));
    let administrator = Arc::new(AtomicUsize::new(0));
    let resolver = PermissionResolver::new(
        PermissionsConfig::default(),
        vec![
            LevelRule::new(PermissionLevel::Moderator, CountingPredicate(moderator.clone())),
            LevelRule::new(PermissionLevel::Administrator, CountingPredicate(administrator.clone())),
        ],
        Arc::new(MemoryGuildSettings::new()),
    );

    let member = MemberInfo {
        user_id: UserId::new(MEMBER_ID),
        roles: Vec::new(),
        permissions: Permissions::empty(),
    };
    let guild = GuildInfo {
        id: GuildId::new(GUILD_ID),
        owner_id: UserId::new(GUILD_OWNER_ID),
    };

    assert_eq!(
        resolver.resolve(Some(&member), Some(&guild)).await,
        PermissionLevel::Administrator
    );
    assert_eq!(administrator.load(Ordering::SeqCst), 1);
    assert_eq!(moderator.load(Ordering::SeqCst), 0);
}
