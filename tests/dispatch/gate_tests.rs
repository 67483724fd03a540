//! Gate Pipeline Tests
//!
//! Restraint order, denial notices and middleware chains.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use chat_commands::application::{DenialStage, DispatchOutcome};
use chat_commands::domain::{
    Category, CommandEvent, ConditionNotice, DenialMessage, DenialMessages, GateResult, InboundEvent,
    Permissions,
};

use crate::common::*;

fn denied(command: &str, stage: DenialStage, notified: bool) -> DispatchOutcome {
    DispatchOutcome::Denied {
        command: command.to_string(),
        stage,
        notified,
    }
}

// ============================================================================
// Silent stages
// ============================================================================

#[tokio::test]
async fn test_scope_denial_is_silent() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("setup").no_cooldown().server_only().on_message(noop))
        .unwrap();

    let outcome = t.framework.process(private_message("v.setup")).await.unwrap();

    assert_eq!(outcome, denied("setup", DenialStage::Scope, false));
    assert!(t.platform.calls().is_empty());
}

#[tokio::test]
async fn test_required_user_denial_is_silent() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("eval").no_cooldown().required_user(OTHER_USER).on_message(noop))
        .unwrap();

    let outcome = t.framework.process(private_message("v.eval")).await.unwrap();
    assert_eq!(outcome, denied("eval", DenialStage::RequiredUser, false));
    assert!(t.platform.calls().is_empty());

    let allowed = InboundEvent::message(OTHER_USER, CHANNEL, "v.eval");
    assert!(t.framework.process(allowed).await.unwrap().is_invoked());
}

// ============================================================================
// Conditions
// ============================================================================

#[tokio::test]
async fn test_condition_uses_command_notice_first() {
    let t = TestFramework::with(|builder| {
        builder.messages(DenialMessages {
            condition: Some(DenialMessage::text(|_: &ConditionNotice| "fallback".to_string())),
            ..DenialMessages::default()
        })
    });
    t.framework
        .register(
            t.framework
                .command("own")
                .no_cooldown()
                .condition(|event| event.server_id.is_some())
                .condition_message(DenialMessage::text(|n: &ConditionNotice| format!("{} needs a server", n.command)))
                .on_message(noop),
        )
        .unwrap();
    t.framework
        .register(
            t.framework
                .command("plain")
                .no_cooldown()
                .condition(|_| false)
                .on_message(noop),
        )
        .unwrap();

    let outcome = t.framework.process(private_message("v.own")).await.unwrap();
    assert_eq!(outcome, denied("own", DenialStage::Condition, true));

    t.framework.process(private_message("v.plain")).await.unwrap();

    assert_eq!(t.platform.texts(), vec!["own needs a server", "fallback"]);
}

#[tokio::test]
async fn test_condition_without_notice_is_silent() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("never").no_cooldown().condition(|_| false).on_message(noop))
        .unwrap();

    let outcome = t.framework.process(private_message("v.never")).await.unwrap();

    assert_eq!(outcome, denied("never", DenialStage::Condition, false));
    assert!(t.platform.calls().is_empty());
}

// ============================================================================
// Roles and permissions
// ============================================================================

#[tokio::test]
async fn test_role_denial_lists_roles_without_pinging() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("mod").no_cooldown().required_roles([1, 2]).on_message(noop))
        .unwrap();

    let outcome = t
        .framework
        .process(server_message("v.mod", vec![3, 4], Permissions::empty()))
        .await
        .unwrap();
    assert_eq!(outcome, denied("mod", DenialStage::Role, true));

    let responses = t.platform.responses();
    assert_eq!(
        responses[0].content.as_deref(),
        Some("You need to have any of the role(s): <@&1>, <@&2> to run this command!")
    );
    assert!(responses[0].suppress_mentions);

    let outcome = t
        .framework
        .process(server_message("v.mod", vec![2, 3], Permissions::empty()))
        .await
        .unwrap();
    assert!(outcome.is_invoked());
}

#[tokio::test]
async fn test_permission_denial_and_superset_admission() {
    let t = TestFramework::new();
    let required = Permissions::new(Permissions::MANAGE_CHANNELS | Permissions::KICK_MEMBERS);
    t.framework
        .register(
            t.framework
                .command("lockdown")
                .no_cooldown()
                .required_permissions(required)
                .on_message(noop),
        )
        .unwrap();

    let outcome = t
        .framework
        .process(server_message(
            "v.lockdown",
            vec![],
            Permissions::new(Permissions::MANAGE_CHANNELS),
        ))
        .await
        .unwrap();
    assert_eq!(outcome, denied("lockdown", DenialStage::Permission, true));
    assert_eq!(
        t.platform.texts(),
        vec!["You need these permission(s): Kick Members, Manage Channels to run this command!"]
    );

    let outcome = t
        .framework
        .process(server_message(
            "v.lockdown",
            vec![],
            required.union(Permissions::new(Permissions::BAN_MEMBERS)),
        ))
        .await
        .unwrap();
    assert!(outcome.is_invoked());
}

#[tokio::test]
async fn test_roles_and_permissions_pass_outside_servers() {
    let t = TestFramework::new();
    t.framework
        .register(
            t.framework
                .command("guarded")
                .no_cooldown()
                .required_role(1)
                .required_permission(Permissions::ADMINISTRATOR)
                .on_message(noop),
        )
        .unwrap();

    let outcome = t.framework.process(private_message("v.guarded")).await.unwrap();
    assert!(outcome.is_invoked());
}

// ============================================================================
// Middlewares and afterwares
// ============================================================================

#[tokio::test]
async fn test_category_middlewares_run_before_command_middlewares() {
    let t = TestFramework::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let outer = log.clone();
    t.framework.add_middleware("outer", move |_event: &CommandEvent| {
        outer.lock().push("outer");
        GateResult::allow()
    });
    let inner = log.clone();
    t.framework.add_middleware("inner", move |_event: &CommandEvent| {
        inner.lock().push("inner");
        GateResult::deny()
    });
    t.framework
        .add_category(Category::new("Admin").middleware("outer"))
        .unwrap();
    t.framework
        .register(
            t.framework
                .command("wipe")
                .no_cooldown()
                .category("admin")
                .middleware("inner")
                .on_message(noop),
        )
        .unwrap();

    let outcome = t.framework.process(private_message("v.wipe")).await.unwrap();

    assert_eq!(outcome, denied("wipe", DenialStage::Middleware, false));
    assert_eq!(*log.lock(), vec!["outer", "inner"]);
    assert!(t.platform.calls().is_empty());
}

#[tokio::test]
async fn test_middleware_reason_is_ephemeral_for_interactions() {
    let t = TestFramework::new();
    t.framework
        .add_middleware("closed", |_event: &CommandEvent| GateResult::deny_with("Not today"));
    t.framework
        .register(t.framework.command("shop").no_cooldown().middleware("closed").hybrid(noop))
        .unwrap();

    let event = InboundEvent::interaction(USER, 77, "shop").in_channel(CHANNEL);
    let outcome = t.framework.process(event).await.unwrap();

    assert_eq!(outcome, denied("shop", DenialStage::Middleware, true));
    match &t.platform.calls()[0] {
        Recorded::Interaction {
            interaction_id,
            response,
        } => {
            assert_eq!(*interaction_id, 77);
            assert_eq!(response.content.as_deref(), Some("Not today"));
            assert!(response.ephemeral);
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[tokio::test]
async fn test_afterwares_run_after_successful_handlers_only() {
    let t = TestFramework::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let category_log = log.clone();
    t.framework.add_afterware("category_audit", move |event: CommandEvent| {
        let log = category_log.clone();
        async move {
            log.lock().push(format!("category:{}", event.command.name()));
        }
    });
    let command_log = log.clone();
    t.framework.add_afterware("command_audit", move |event: CommandEvent| {
        let log = command_log.clone();
        async move {
            log.lock().push(format!("command:{}", event.command.name()));
        }
    });
    t.framework
        .add_category(Category::new("Tools").afterware("category_audit"))
        .unwrap();

    for (name, fails) in [("works", false), ("breaks", true)] {
        t.framework
            .register(
                t.framework
                    .command(name)
                    .no_cooldown()
                    .category("Tools")
                    .afterware("command_audit")
                    .on_message(move |_event: CommandEvent| async move {
                        if fails {
                            anyhow::bail!("broken");
                        }
                        anyhow::Ok(())
                    }),
            )
            .unwrap();
    }

    assert!(t.framework.process(private_message("v.works")).await.unwrap().is_invoked());
    let outcome = t.framework.process(private_message("v.breaks")).await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Failed {
            command: "breaks".into(),
            error: "broken".into(),
        }
    );

    t.framework.shutdown().await;

    let mut entries = log.lock().clone();
    entries.sort();
    assert_eq!(entries, vec!["category:works".to_string(), "command:works".to_string()]);
}
