//! Registry Tests
//!
//! Registration errors and framework lifecycle.

use std::time::Duration;

use pretty_assertions::assert_eq;

use chat_commands::application::DispatchOutcome;
use chat_commands::domain::{Category, CommandDefinition};
use chat_commands::shared::FrameworkError;

use crate::common::*;

#[tokio::test]
async fn test_registration_errors_surface_at_startup() {
    let t = TestFramework::new();

    let err = t.framework.register(t.framework.command("bare")).unwrap_err();
    assert!(matches!(err, FrameworkError::MissingHandler { ref command } if command == "bare"));

    let err = t
        .framework
        .register(t.framework.command("bad").format("bad :[x").on_message(noop))
        .unwrap_err();
    assert!(matches!(err, FrameworkError::InvalidFormat { ref format, .. } if format == "bad :[x"));

    let err = t
        .framework
        .register(t.framework.command("gated").middleware("missing").on_message(noop))
        .unwrap_err();
    assert!(matches!(err, FrameworkError::UnknownMiddleware { .. }));

    let err = t
        .framework
        .register(t.framework.command("two words").on_message(noop))
        .unwrap_err();
    assert!(matches!(err, FrameworkError::Validation(_)));

    let err = t
        .framework
        .add_category(Category::new("Audit").afterware("missing"))
        .unwrap_err();
    assert!(err.is_configuration());

    assert!(t.framework.registry().is_empty());
}

#[tokio::test]
async fn test_signature_reflects_identifying_fields() {
    let t = TestFramework::new();
    let command = t
        .framework
        .register(
            t.framework
                .command("ping")
                .description("Pong!")
                .cooldown(Duration::from_millis(2500))
                .hybrid(noop),
        )
        .unwrap();

    assert_eq!(
        command.signature(),
        "ping (Description: Pong!, Cooldown: 2500, Slash: true, Hybrid: true)"
    );
    assert_eq!(command.to_string(), command.signature());
}

#[tokio::test]
async fn test_newest_duplicate_wins_and_removal_restores_older() {
    let t = TestFramework::new();
    let older = t
        .framework
        .register(t.framework.command("ping").no_cooldown().on_message(echo("missing")))
        .unwrap();
    let newer = t
        .framework
        .register(
            CommandDefinition::builder("ping")
                .description("newer")
                .no_cooldown()
                .on_message(noop),
        )
        .unwrap();

    let registry = t.framework.registry();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get("ping").unwrap().description(), "newer");

    t.framework.process(private_message("v.ping")).await.unwrap();
    assert!(t.platform.texts().is_empty());

    assert!(registry.remove(&newer));
    assert!(std::sync::Arc::ptr_eq(&registry.get("ping").unwrap(), &older));

    t.framework.process(private_message("v.ping")).await.unwrap();
    assert_eq!(t.platform.texts(), vec!["-"]);
}

#[tokio::test]
async fn test_category_view_and_lookup() {
    let t = TestFramework::new();
    let category = t
        .framework
        .add_category(Category::new("Music").description("Tunes"))
        .unwrap();
    for name in ["play", "skip"] {
        t.framework
            .register(t.framework.command(name).category("Music").on_message(noop))
            .unwrap();
    }
    t.framework
        .register(t.framework.command("ping").on_message(noop))
        .unwrap();

    let registry = t.framework.registry();
    let names: Vec<String> = registry
        .commands_in(&category)
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, vec!["play", "skip"]);
    assert_eq!(registry.find_category("music").unwrap().get_description(), "Tunes");
    assert_eq!(registry.by_category_ignore_case("MUSIC").len(), 2);
    assert_eq!(registry.all().len(), 3);
}

#[tokio::test]
async fn test_submitted_events_finish_before_shutdown_returns() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("say").no_cooldown().format("say :[text:rest()]").on_message(echo("text")))
        .unwrap();

    for i in 0..10 {
        t.framework
            .submit(private_message(&format!("v.say {}", i)))
            .unwrap();
    }
    t.framework.shutdown().await;

    let mut texts = t.platform.texts();
    texts.sort();
    assert_eq!(texts.len(), 10);
    assert_eq!(texts[0], "0");

    let err = t
        .framework
        .process(private_message("v.say late"))
        .await
        .unwrap_err();
    assert!(matches!(err, FrameworkError::PoolShutdown));
}

#[tokio::test]
async fn test_missing_channel_fails_only_that_event() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("ping").no_cooldown().hybrid(noop))
        .unwrap();

    let orphan = chat_commands::domain::InboundEvent::interaction(USER, 9, "ping");
    let err = t.framework.process(orphan).await.unwrap_err();
    assert!(matches!(err, FrameworkError::UnexpectedPlatformState(_)));

    let outcome = t.framework.process(private_message("v.ping")).await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Invoked {
            command: "ping".into()
        }
    );
}
