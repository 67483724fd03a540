//! Stdout platform.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use crate::domain::entities::{Platform, Response, SentMessage};
use crate::shared::error::PlatformError;

pub const CONSOLE_USER_ID: i64 = 1;
pub const CONSOLE_CHANNEL_ID: i64 = 100;

/// Prints every response and hands out increasing message ids.
#[derive(Debug)]
pub struct ConsolePlatform {
    next_message_id: AtomicI64,
}

impl ConsolePlatform {
    pub fn new() -> Self {
        Self {
            next_message_id: AtomicI64::new(1_000),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for ConsolePlatform {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a response as console lines.
pub fn render(response: &Response) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(content) = &response.content {
        lines.push(content.clone());
    }
    for embed in &response.embeds {
        if let Some(title) = &embed.title {
            lines.push(format!("== {} ==", title));
        }
        if let Some(description) = &embed.description {
            lines.push(description.clone());
        }
        for field in &embed.fields {
            lines.push(format!("{}: {}", field.name, field.value));
        }
        if let Some(footer) = &embed.footer {
            lines.push(format!("-- {}", footer));
        }
    }
    lines
}

#[async_trait]
impl Platform for ConsolePlatform {
    async fn send_message(&self, channel_id: i64, response: Response) -> Result<SentMessage, PlatformError> {
        let message_id = self.next_id();
        for line in render(&response) {
            println!("[#{} {}] {}", channel_id, message_id, line);
        }
        Ok(SentMessage { channel_id, message_id })
    }

    async fn respond_to_interaction(
        &self,
        interaction_id: i64,
        response: Response,
    ) -> Result<Option<SentMessage>, PlatformError> {
        let marker = if response.ephemeral { " (only you)" } else { "" };
        for line in render(&response) {
            println!("[interaction {}{}] {}", interaction_id, marker, line);
        }
        Ok(None)
    }

    async fn delete_message(&self, channel_id: i64, message_id: i64) -> Result<(), PlatformError> {
        println!("[#{} {}] (deleted)", channel_id, message_id);
        Ok(())
    }
}
