//! Domain Services
//!
//! Pure logic that does not belong to a single entity.
//!
//! - **argument_format**: routing format parsing and per-format matching
//! - **format_router**: selection of the best format for a message

pub mod argument_format;
pub mod format_router;

pub use argument_format::{ArgumentFormat, ArgumentKind, Choices, FormatError, FormatToken, Placeholder};
pub use format_router::{route, RoutedArguments};
