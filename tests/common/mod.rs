//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

use chat_commands::domain::{CommandEvent, InboundEvent, Permissions, Platform, Response, SentMessage};
use chat_commands::infrastructure::ManualClock;
use chat_commands::shared::PlatformError;
use chat_commands::{Framework, FrameworkBuilder};

pub const USER: i64 = 10;
pub const OTHER_USER: i64 = 11;
pub const CHANNEL: i64 = 20;
pub const SERVER: i64 = 30;
pub const BOT: i64 = 99;

/// Something the framework asked the platform to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Sent {
        channel_id: i64,
        message_id: i64,
        response: Response,
    },
    Interaction {
        interaction_id: i64,
        response: Response,
    },
    Deleted {
        channel_id: i64,
        message_id: i64,
    },
}

/// Platform that remembers every call.
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<Recorded>>,
    next_id: AtomicI64,
    fail_sends: Mutex<bool>,
}

impl RecordingPlatform {
    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().clone()
    }

    /// Text of every delivered response, in order.
    pub fn texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Recorded::Sent { response, .. } | Recorded::Interaction { response, .. } => {
                    response.content.clone()
                }
                Recorded::Deleted { .. } => None,
            })
            .collect()
    }

    pub fn responses(&self) -> Vec<Response> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Recorded::Sent { response, .. } | Recorded::Interaction { response, .. } => {
                    Some(response.clone())
                }
                Recorded::Deleted { .. } => None,
            })
            .collect()
    }

    pub fn deletions(&self) -> Vec<i64> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Recorded::Deleted { message_id, .. } => Some(*message_id),
                _ => None,
            })
            .collect()
    }

    pub fn fail_sends(&self) {
        *self.fail_sends.lock() = true;
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn send_message(&self, channel_id: i64, response: Response) -> Result<SentMessage, PlatformError> {
        if *self.fail_sends.lock() {
            return Err(PlatformError::ChannelUnavailable(channel_id));
        }
        let message_id = 500 + self.next_id.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(Recorded::Sent {
            channel_id,
            message_id,
            response,
        });
        Ok(SentMessage { channel_id, message_id })
    }

    async fn respond_to_interaction(
        &self,
        interaction_id: i64,
        response: Response,
    ) -> Result<Option<SentMessage>, PlatformError> {
        if *self.fail_sends.lock() {
            return Err(PlatformError::InteractionExpired(interaction_id));
        }
        self.calls.lock().push(Recorded::Interaction {
            interaction_id,
            response,
        });
        Ok(None)
    }

    async fn delete_message(&self, channel_id: i64, message_id: i64) -> Result<(), PlatformError> {
        self.calls.lock().push(Recorded::Deleted { channel_id, message_id });
        Ok(())
    }
}

/// Test framework with a recording platform and a manual clock
pub struct TestFramework {
    pub framework: Framework,
    pub platform: Arc<RecordingPlatform>,
    pub clock: Arc<ManualClock>,
}

impl TestFramework {
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    /// Customize the builder before assembly.
    pub fn with(configure: impl FnOnce(FrameworkBuilder) -> FrameworkBuilder) -> Self {
        let platform = Arc::new(RecordingPlatform::default());
        let clock = Arc::new(ManualClock::new(1_000_000));

        let builder = Framework::builder()
            .clock(clock.clone())
            .bot_user_id(Some(BOT));
        let framework = configure(builder).build(platform.clone()).unwrap();

        Self {
            framework,
            platform,
            clock,
        }
    }
}

/// Handler that does nothing.
pub async fn noop(_event: CommandEvent) -> anyhow::Result<()> {
    Ok(())
}

/// Handler that replies with the routed argument `name`, or `-` when absent.
pub fn echo(name: &'static str) -> impl Fn(CommandEvent) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync {
    move |event: CommandEvent| {
        async move {
            let value = event.arguments.get(name).unwrap_or_else(|| "-".to_string());
            event.respond().content(value).respond().await?;
            anyhow::Ok(())
        }
        .boxed()
    }
}

/// Message in a server channel from a member.
pub fn server_message(content: &str, roles: Vec<i64>, permissions: Permissions) -> InboundEvent {
    InboundEvent::message(USER, CHANNEL, content)
        .in_server(SERVER)
        .with_member(roles, permissions)
}

/// Message outside any server.
pub fn private_message(content: &str) -> InboundEvent {
    InboundEvent::message(USER, CHANNEL, content)
}
