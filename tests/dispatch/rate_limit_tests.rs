//! Rate Limit Tests
//!
//! Cooldown windows seen through the dispatcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use pretty_assertions::assert_eq;

use chat_commands::application::{DenialStage, DispatchOutcome};
use chat_commands::domain::{CommandEvent, InboundEvent};

use crate::common::*;

fn limited(command: &str, notified: bool) -> DispatchOutcome {
    DispatchOutcome::Denied {
        command: command.to_string(),
        stage: DenialStage::RateLimit,
        notified,
    }
}

#[tokio::test]
async fn test_three_rapid_invocations_notify_once() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("daily").cooldown(Duration::from_secs(5)).on_message(noop))
        .unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        outcomes.push(t.framework.process(private_message("v.daily")).await.unwrap());
    }

    assert_eq!(
        outcomes,
        vec![
            DispatchOutcome::Invoked {
                command: "daily".into()
            },
            limited("daily", true),
            limited("daily", false),
        ]
    );

    let texts = t.platform.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("You can use this command in **5 seconds**"));
}

#[tokio::test]
async fn test_release_admits_the_next_invocation() {
    let t = TestFramework::new();
    let command = t
        .framework
        .register(t.framework.command("daily").cooldown(Duration::from_secs(60)).on_message(noop))
        .unwrap();

    assert!(t.framework.process(private_message("v.daily")).await.unwrap().is_invoked());
    assert!(!t.framework.process(private_message("v.daily")).await.unwrap().is_invoked());

    let limiter = t.framework.rate_limiter();
    assert!(limiter.release(USER, USER, command.signature()));
    assert!(!limiter.release(USER, USER, command.signature()));

    assert!(t.framework.process(private_message("v.daily")).await.unwrap().is_invoked());
}

#[tokio::test]
async fn test_window_expires_with_the_clock() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("daily").cooldown(Duration::from_secs(5)).on_message(noop))
        .unwrap();

    assert!(t.framework.process(private_message("v.daily")).await.unwrap().is_invoked());

    t.clock.advance(Duration::from_millis(4_001));
    let outcome = t.framework.process(private_message("v.daily")).await.unwrap();
    assert_eq!(outcome, limited("daily", true));
    assert!(t.platform.texts()[0].contains("**1 seconds**"));

    t.clock.advance(Duration::from_millis(999));
    assert!(t.framework.process(private_message("v.daily")).await.unwrap().is_invoked());
}

#[tokio::test]
async fn test_scopes_and_users_are_independent() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("daily").on_message(noop))
        .unwrap();

    let in_server = || server_message("v.daily", vec![], Default::default());

    assert!(t.framework.process(in_server()).await.unwrap().is_invoked());
    assert!(t.framework.process(private_message("v.daily")).await.unwrap().is_invoked());
    assert!(t
        .framework
        .process(InboundEvent::message(OTHER_USER, CHANNEL, "v.daily").in_server(SERVER))
        .await
        .unwrap()
        .is_invoked());

    assert_eq!(t.framework.process(in_server()).await.unwrap(), limited("daily", true));
}

#[tokio::test]
async fn test_default_cooldown_comes_from_the_builder() {
    let t = TestFramework::with(|builder| builder.default_cooldown(Duration::ZERO));
    t.framework
        .register(t.framework.command("spam").on_message(noop))
        .unwrap();

    for _ in 0..5 {
        assert!(t.framework.process(private_message("v.spam")).await.unwrap().is_invoked());
    }
}

#[tokio::test]
async fn test_scheduled_release_deletes_the_warning() {
    let t = TestFramework::new();
    let command = t
        .framework
        .register(t.framework.command("quick").cooldown(Duration::from_secs(1)).on_message(noop))
        .unwrap();

    t.framework.process(private_message("v.quick")).await.unwrap();
    assert_eq!(
        t.framework.process(private_message("v.quick")).await.unwrap(),
        limited("quick", true)
    );

    let warning_id = match &t.platform.calls()[0] {
        Recorded::Sent { message_id, .. } => *message_id,
        other => panic!("unexpected call {:?}", other),
    };

    tokio::time::sleep(Duration::from_millis(1_300)).await;

    assert_eq!(t.platform.deletions(), vec![warning_id]);
    assert!(!t
        .framework
        .rate_limiter()
        .is_rate_limited(USER, USER, command.signature()));
    assert!(t.framework.process(private_message("v.quick")).await.unwrap().is_invoked());
}

#[tokio::test]
async fn test_stale_release_keeps_the_newer_window() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("daily").cooldown(Duration::from_secs(1)).on_message(noop))
        .unwrap();

    assert!(t.framework.process(private_message("v.daily")).await.unwrap().is_invoked());
    t.clock.advance(Duration::from_millis(500));
    assert_eq!(
        t.framework.process(private_message("v.daily")).await.unwrap(),
        limited("daily", true)
    );

    // The first window has run out; this opens a second one.
    t.clock.advance(Duration::from_millis(600));
    assert!(t.framework.process(private_message("v.daily")).await.unwrap().is_invoked());

    tokio::time::sleep(Duration::from_millis(1_300)).await;

    let outcome = t.framework.process(private_message("v.daily")).await.unwrap();
    assert_eq!(outcome, limited("daily", true));
}

#[tokio::test]
async fn test_manual_release_then_timer_keeps_the_newer_window() {
    let t = TestFramework::new();
    let command = t
        .framework
        .register(t.framework.command("daily").cooldown(Duration::from_secs(1)).on_message(noop))
        .unwrap();

    t.framework.process(private_message("v.daily")).await.unwrap();
    assert_eq!(
        t.framework.process(private_message("v.daily")).await.unwrap(),
        limited("daily", true)
    );

    t.clock.advance(Duration::from_millis(100));
    assert!(t.framework.rate_limiter().release(USER, USER, command.signature()));
    assert!(t.framework.process(private_message("v.daily")).await.unwrap().is_invoked());

    tokio::time::sleep(Duration::from_millis(1_300)).await;

    assert!(t
        .framework
        .rate_limiter()
        .is_rate_limited(USER, USER, command.signature()));
    assert!(!t.framework.process(private_message("v.daily")).await.unwrap().is_invoked());
}

#[tokio::test]
async fn test_release_is_scheduled_even_when_the_warning_fails() {
    let t = TestFramework::new();
    let command = t
        .framework
        .register(t.framework.command("quick").cooldown(Duration::from_secs(1)).on_message(noop))
        .unwrap();

    t.framework.process(private_message("v.quick")).await.unwrap();
    t.platform.fail_sends();
    assert_eq!(
        t.framework.process(private_message("v.quick")).await.unwrap(),
        limited("quick", false)
    );

    tokio::time::sleep(Duration::from_millis(1_300)).await;

    assert!(t.platform.deletions().is_empty());
    assert!(!t
        .framework
        .rate_limiter()
        .is_rate_limited(USER, USER, command.signature()));
}

#[tokio::test]
async fn test_interaction_warning_is_not_deleted() {
    let t = TestFramework::new();
    t.framework
        .register(t.framework.command("quick").cooldown(Duration::from_secs(1)).hybrid(noop))
        .unwrap();

    let event = || InboundEvent::interaction(USER, 5, "quick").in_channel(CHANNEL);
    t.framework.process(event()).await.unwrap();
    assert_eq!(t.framework.process(event()).await.unwrap(), limited("quick", true));

    tokio::time::sleep(Duration::from_millis(1_300)).await;

    let calls = t.platform.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(&calls[0], Recorded::Interaction { response, .. } if response.ephemeral));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_invocations_admit_exactly_once() {
    let t = TestFramework::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    t.framework
        .register(
            t.framework
                .command("claim")
                .cooldown(Duration::from_secs(30))
                .on_message(move |_event: CommandEvent| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { anyhow::Ok(()) }
                }),
        )
        .unwrap();

    let tasks = (0..64).map(|_| {
        let framework = t.framework.clone();
        tokio::spawn(async move {
            framework
                .process(server_message("v.claim", vec![], Default::default()))
                .await
                .unwrap()
        })
    });
    let outcomes: Vec<DispatchOutcome> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let invoked = outcomes.iter().filter(|o| o.is_invoked()).count();
    let notified = outcomes
        .iter()
        .filter(|o| **o == limited("claim", true))
        .count();

    assert_eq!(invoked, 1);
    assert_eq!(notified, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(t.platform.texts().len(), 1);
}
