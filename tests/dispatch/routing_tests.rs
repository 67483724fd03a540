//! Routing Tests
//!
//! Prefixes, shortcuts, mentions and argument routing.

use pretty_assertions::assert_eq;

use chat_commands::application::{DispatchOutcome, IgnoreReason};
use chat_commands::domain::InboundEvent;

use crate::common::*;

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_prefix_and_shortcuts_ignore_case() {
    let t = TestFramework::new();
    t.framework
        .register(
            t.framework
                .command("purge")
                .no_cooldown()
                .shortcuts(["clear", "prune"])
                .on_message(noop),
        )
        .unwrap();

    for content in ["v.purge", "V.PURGE", "v.clear 10", "v.Prune"] {
        let outcome = t.framework.process(private_message(content)).await.unwrap();
        assert!(outcome.is_invoked(), "{}", content);
    }

    assert_eq!(
        t.framework.process(private_message("purge")).await.unwrap(),
        DispatchOutcome::Ignored(IgnoreReason::NoPrefix)
    );
    assert_eq!(
        t.framework.process(private_message("v.wipe")).await.unwrap(),
        DispatchOutcome::Ignored(IgnoreReason::UnknownCommand)
    );
}

#[tokio::test]
async fn test_server_prefix_overrides_default() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("ping").no_cooldown().on_message(noop))
        .unwrap();
    t.framework.prefixes().set_prefix(SERVER, "!");

    let in_server = |content: &str| server_message(content, vec![], Default::default());

    assert!(t.framework.process(in_server("!ping")).await.unwrap().is_invoked());
    assert_eq!(
        t.framework.process(in_server("v.ping")).await.unwrap(),
        DispatchOutcome::Ignored(IgnoreReason::NoPrefix)
    );
    assert!(t.framework.process(private_message("v.ping")).await.unwrap().is_invoked());
}

#[tokio::test]
async fn test_prefix_loader_is_consulted() {
    let t = TestFramework::with(|builder| {
        builder.prefix_loader(|server_id| (server_id == SERVER).then(|| "$".to_string()))
    });
    t.framework
        .register(t.framework.command("ping").no_cooldown().on_message(noop))
        .unwrap();

    let event = server_message("$ping", vec![], Default::default());
    assert!(t.framework.process(event).await.unwrap().is_invoked());
    assert_eq!(t.framework.prefixes().prefixes(), vec![(SERVER, "$".to_string())]);
}

#[tokio::test]
async fn test_mention_prefix() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("say").no_cooldown().format("say :[text:rest()]").on_message(echo("text")))
        .unwrap();

    let outcome = t
        .framework
        .process(private_message(&format!("<@{}> say hi there", BOT)))
        .await
        .unwrap();
    assert!(outcome.is_invoked());
    assert!(t
        .framework
        .process(private_message(&format!("<@!{}> SAY again", BOT)))
        .await
        .unwrap()
        .is_invoked());

    assert_eq!(t.platform.texts(), vec!["hi there", "again"]);
}

#[tokio::test]
async fn test_mention_prefix_can_be_disabled() {
    let t = TestFramework::with(|builder| builder.mention_prefix(false));
    t.framework
        .register(t.framework.command("ping").no_cooldown().on_message(noop))
        .unwrap();

    let outcome = t
        .framework
        .process(private_message(&format!("<@{}> ping", BOT)))
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Ignored(IgnoreReason::NoPrefix));
}

#[tokio::test]
async fn test_bots_and_blacklisted_users_are_ignored() {
    let t = TestFramework::with(|builder| builder.blacklist_loader(|user_id| user_id == OTHER_USER));
    t.framework
        .register(t.framework.command("ping").no_cooldown().on_message(noop))
        .unwrap();

    assert_eq!(
        t.framework.process(private_message("v.ping").from_bot()).await.unwrap(),
        DispatchOutcome::Ignored(IgnoreReason::BotAuthor)
    );
    assert_eq!(
        t.framework
            .process(InboundEvent::message(OTHER_USER, CHANNEL, "v.ping"))
            .await
            .unwrap(),
        DispatchOutcome::Ignored(IgnoreReason::Blacklisted)
    );

    t.framework.blacklist().add(USER);
    assert_eq!(
        t.framework.process(private_message("v.ping")).await.unwrap(),
        DispatchOutcome::Ignored(IgnoreReason::Blacklisted)
    );
}

// ============================================================================
// Arguments
// ============================================================================

#[tokio::test]
async fn test_rest_placeholder_collects_remaining_tokens() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("say").no_cooldown().format("say :[text:rest()]").on_message(echo("text")))
        .unwrap();

    t.framework.process(private_message("v.say hello big world")).await.unwrap();

    assert_eq!(t.platform.texts(), vec!["hello big world"]);
}

#[tokio::test]
async fn test_fixed_format_falls_back_to_positional() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("say").no_cooldown().format("say :[text]").on_message(echo("text")))
        .unwrap();

    t.framework.process(private_message("v.say hello")).await.unwrap();
    t.framework.process(private_message("v.say hello world")).await.unwrap();

    assert_eq!(t.platform.texts(), vec!["hello", "-"]);
}

#[tokio::test]
async fn test_enum_mismatch_falls_back_to_positional() {
    let t = TestFramework::new();
    t.framework
        .register(
            t.framework
                .command("quiz")
                .no_cooldown()
                .format("quiz :[difficulty::(easy,hard,medium)]")
                .on_message(echo("difficulty")),
        )
        .unwrap();

    t.framework.process(private_message("v.quiz HARD")).await.unwrap();
    t.framework.process(private_message("v.quiz extreme")).await.unwrap();

    assert_eq!(t.platform.texts(), vec!["HARD", "-"]);
}

#[tokio::test]
async fn test_quoted_and_named_arguments() {
    let t = TestFramework::new();
    t.framework
        .register(
            t.framework
                .command("ban")
                .no_cooldown()
                .format("ban :[target:user] :[reason]")
                .on_message(echo("reason")),
        )
        .unwrap();
    t.framework
        .register(t.framework.command("kick").no_cooldown().on_message(echo("reason")))
        .unwrap();

    t.framework
        .process(private_message(r#"v.ban <@123> "being rude""#))
        .await
        .unwrap();
    t.framework
        .process(private_message("v.kick <@123> --reason=spam"))
        .await
        .unwrap();

    assert_eq!(t.platform.texts(), vec!["being rude", "spam"]);
}

#[tokio::test]
async fn test_interaction_options_reach_hybrid_handlers() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("say").no_cooldown().format("say :[text:rest()]").hybrid(echo("text")))
        .unwrap();

    let event = InboundEvent::interaction(USER, 41, "say")
        .in_channel(CHANNEL)
        .with_option("Text", "from a slash command");
    assert!(t.framework.process(event).await.unwrap().is_invoked());

    match &t.platform.calls()[0] {
        Recorded::Interaction {
            interaction_id,
            response,
        } => {
            assert_eq!(*interaction_id, 41);
            assert_eq!(response.content.as_deref(), Some("from a slash command"));
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[tokio::test]
async fn test_message_only_command_ignores_interactions() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("ping").no_cooldown().on_message(noop))
        .unwrap();

    let event = InboundEvent::interaction(USER, 1, "ping").in_channel(CHANNEL);
    assert_eq!(
        t.framework.process(event).await.unwrap(),
        DispatchOutcome::Ignored(IgnoreReason::UnsupportedOrigin)
    );
}
