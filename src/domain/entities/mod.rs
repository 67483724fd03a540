//! # Domain Entities
//!
//! Core objects of the command framework.
//!
//! ## Core Entities
//!
//! - **CommandDefinition**: immutable command description built via `CommandBuilder`
//! - **Category**: named group of commands with shared middlewares
//! - **InboundEvent / CommandEvent**: platform-neutral event and per-invocation view
//!
//! ## Contracts
//!
//! - **CommandHandler / Middleware / Afterware**: user code hooks
//! - **Platform**: messaging collaborator implemented by the binding layer
//! - **DenialMessage**: text or embed renderers for denial notices

mod category;
mod command;
mod event;
mod handler;
mod notice;
mod response;

pub use category::Category;

pub use command::{CommandBuilder, CommandDefinition, CommandScope, DEFAULT_COOLDOWN, DEFAULT_DESCRIPTION};

pub use event::{Arguments, CommandEvent, EventOrigin, InboundEvent, InteractionOption, MemberContext};

pub use handler::{Afterware, CommandHandler, Condition, GateResult, HandlerSet, Middleware};

pub use notice::{
    format_roles, ConditionNotice, DenialMessage, DenialMessages, NoPermissionNotice, NoRoleNotice,
    RateLimitedNotice,
};

#[cfg(test)]
pub use response::MockPlatform;
pub use response::{Delivery, Embed, EmbedField, Platform, Responder, Response, ResponseBuilder, SentMessage};
