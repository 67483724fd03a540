//! Outbound responses and the messaging collaborator contract.
//!
//! The framework never talks to a chat platform directly. It produces
//! [`Response`] values and hands them to a [`Platform`] implementation
//! supplied by the binding layer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::event::{EventOrigin, InboundEvent};
use crate::shared::error::{FrameworkError, FrameworkResult, PlatformError};

/// Embed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rich embed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// A message to deliver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    /// Only visible to the invoker. Honored for interaction responses only.
    pub ephemeral: bool,
    /// Render mentions as text without pinging anyone.
    pub suppress_mentions: bool,
    /// Message this response replies to, for message deliveries.
    pub reply_to: Option<i64>,
}

impl Response {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }
}

/// A message created by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub channel_id: i64,
    pub message_id: i64,
}

/// Messaging collaborator implemented by the platform binding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Platform: Send + Sync {
    /// Post a message to a channel.
    async fn send_message(&self, channel_id: i64, response: Response) -> Result<SentMessage, PlatformError>;

    /// Answer an interaction. Bindings return the created message when the
    /// platform exposes one.
    async fn respond_to_interaction(
        &self,
        interaction_id: i64,
        response: Response,
    ) -> Result<Option<SentMessage>, PlatformError>;

    async fn delete_message(&self, channel_id: i64, message_id: i64) -> Result<(), PlatformError>;
}

/// How replies for one invocation are delivered. Chosen once per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    ChannelMessage { channel_id: i64, reply_to: Option<i64> },
    InteractionResponse { interaction_id: i64, channel_id: i64 },
}

impl Delivery {
    /// Pick the strategy for an event. Both origins need a channel.
    pub fn for_event(event: &InboundEvent) -> FrameworkResult<Self> {
        let channel_id = event.channel_id.ok_or_else(|| {
            FrameworkError::UnexpectedPlatformState(format!(
                "event from user {} carries no channel",
                event.user_id
            ))
        })?;

        Ok(match &event.origin {
            EventOrigin::Message { message_id, .. } => Delivery::ChannelMessage {
                channel_id,
                reply_to: (*message_id != 0).then_some(*message_id),
            },
            EventOrigin::Interaction { interaction_id, .. } => Delivery::InteractionResponse {
                interaction_id: *interaction_id,
                channel_id,
            },
        })
    }

    pub fn channel_id(&self) -> i64 {
        match self {
            Delivery::ChannelMessage { channel_id, .. } => *channel_id,
            Delivery::InteractionResponse { channel_id, .. } => *channel_id,
        }
    }
}

/// Sends responses for one invocation.
#[derive(Clone)]
pub struct Responder {
    platform: Arc<dyn Platform>,
    delivery: Delivery,
}

impl Responder {
    pub fn new(platform: Arc<dyn Platform>, delivery: Delivery) -> Self {
        Self { platform, delivery }
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn builder(&self) -> ResponseBuilder {
        ResponseBuilder {
            responder: self.clone(),
            response: Response::default(),
        }
    }

    /// Deliver a finished response.
    pub async fn send(&self, mut response: Response) -> Result<Option<SentMessage>, PlatformError> {
        match self.delivery {
            Delivery::ChannelMessage { channel_id, .. } => {
                response.ephemeral = false;
                self.platform
                    .send_message(channel_id, response)
                    .await
                    .map(Some)
            }
            Delivery::InteractionResponse { interaction_id, .. } => {
                self.platform.respond_to_interaction(interaction_id, response).await
            }
        }
    }

    /// Remove a message this invocation created.
    pub async fn delete(&self, message: SentMessage) -> Result<(), PlatformError> {
        self.platform
            .delete_message(message.channel_id, message.message_id)
            .await
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder").field("delivery", &self.delivery).finish()
    }
}

/// Fluent response construction finished by [`respond`](ResponseBuilder::respond).
#[derive(Debug)]
pub struct ResponseBuilder {
    responder: Responder,
    response: Response,
}

impl ResponseBuilder {
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.response.content = Some(content.into());
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.response.embeds.push(embed);
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.response.ephemeral = true;
        self
    }

    pub fn suppress_mentions(mut self) -> Self {
        self.response.suppress_mentions = true;
        self
    }

    /// Reply to the triggering message when delivered as a channel message.
    pub fn reply(mut self) -> Self {
        if let Delivery::ChannelMessage { reply_to, .. } = self.responder.delivery {
            self.response.reply_to = reply_to;
        }
        self
    }

    pub fn build(self) -> Response {
        self.response
    }

    pub async fn respond(self) -> Result<Option<SentMessage>, PlatformError> {
        self.responder.send(self.response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[test]
    fn test_delivery_requires_channel() {
        let event = InboundEvent::interaction(1, 2, "ping");
        let err = Delivery::for_event(&event).unwrap_err();
        assert!(matches!(err, FrameworkError::UnexpectedPlatformState(_)));
    }

    #[test]
    fn test_delivery_follows_origin() {
        let message = InboundEvent::message(1, 10, "v.ping").with_message_id(55);
        assert_eq!(
            Delivery::for_event(&message).unwrap(),
            Delivery::ChannelMessage {
                channel_id: 10,
                reply_to: Some(55)
            }
        );

        let interaction = InboundEvent::interaction(1, 77, "ping").in_channel(10);
        assert_eq!(
            Delivery::for_event(&interaction).unwrap(),
            Delivery::InteractionResponse {
                interaction_id: 77,
                channel_id: 10
            }
        );
    }

    #[tokio::test]
    async fn test_channel_delivery_drops_ephemeral_and_replies() {
        let mut platform = MockPlatform::new();
        platform
            .expect_send_message()
            .with(
                eq(10),
                function(|r: &Response| !r.ephemeral && r.reply_to == Some(55) && r.content.as_deref() == Some("pong")),
            )
            .times(1)
            .returning(|channel_id, _| {
                Ok(SentMessage {
                    channel_id,
                    message_id: 900,
                })
            });

        let responder = Responder::new(
            Arc::new(platform),
            Delivery::ChannelMessage {
                channel_id: 10,
                reply_to: Some(55),
            },
        );

        let sent = responder
            .builder()
            .content("pong")
            .ephemeral()
            .reply()
            .respond()
            .await
            .unwrap();

        assert_eq!(
            sent,
            Some(SentMessage {
                channel_id: 10,
                message_id: 900
            })
        );
    }

    #[tokio::test]
    async fn test_interaction_delivery_keeps_ephemeral() {
        let mut platform = MockPlatform::new();
        platform
            .expect_respond_to_interaction()
            .with(eq(77), function(|r: &Response| r.ephemeral))
            .times(1)
            .returning(|_, _| Ok(None));

        let responder = Responder::new(
            Arc::new(platform),
            Delivery::InteractionResponse {
                interaction_id: 77,
                channel_id: 10,
            },
        );

        let sent = responder.builder().content("only you").ephemeral().respond().await.unwrap();
        assert_eq!(sent, None);
    }
}
