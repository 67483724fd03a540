//! Discord-compatible permission flags.
//!
//! Permissions are a 64-bit bitfield. Commands declare the flags they need and
//! the binding layer supplies the invoking member's effective set; the gate
//! then requires the effective set to contain every declared flag.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! permission_flags {
    ($($(#[$doc:meta])* $flag:ident = $bit:expr, $label:literal;)*) => {
        impl Permissions {
            $(
                $(#[$doc])*
                pub const $flag: i64 = 1 << $bit;
            )*

            /// Every known flag paired with its human readable label, in bit order.
            pub const FLAGS: &'static [(i64, &'static str)] = &[
                $((1 << $bit, $label),)*
            ];
        }
    };
}

/// 64-bit permission bitfield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub i64);

permission_flags! {
    /// Create instant invites
    CREATE_INSTANT_INVITE = 0, "Create Instant Invite";
    /// Kick members
    KICK_MEMBERS = 1, "Kick Members";
    /// Ban members
    BAN_MEMBERS = 2, "Ban Members";
    /// Administrator (bypasses channel overwrites on the platform side)
    ADMINISTRATOR = 3, "Administrator";
    /// Manage channels
    MANAGE_CHANNELS = 4, "Manage Channels";
    /// Manage the server
    MANAGE_GUILD = 5, "Manage Server";
    ADD_REACTIONS = 6, "Add Reactions";
    VIEW_AUDIT_LOG = 7, "View Audit Log";
    PRIORITY_SPEAKER = 8, "Priority Speaker";
    STREAM = 9, "Video";
    VIEW_CHANNEL = 10, "View Channel";
    SEND_MESSAGES = 11, "Send Messages";
    SEND_TTS_MESSAGES = 12, "Send TTS Messages";
    /// Delete or pin other users' messages
    MANAGE_MESSAGES = 13, "Manage Messages";
    EMBED_LINKS = 14, "Embed Links";
    ATTACH_FILES = 15, "Attach Files";
    READ_MESSAGE_HISTORY = 16, "Read Message History";
    MENTION_EVERYONE = 17, "Mention Everyone";
    USE_EXTERNAL_EMOJIS = 18, "Use External Emojis";
    VIEW_GUILD_INSIGHTS = 19, "View Server Insights";
    CONNECT = 20, "Connect";
    SPEAK = 21, "Speak";
    MUTE_MEMBERS = 22, "Mute Members";
    DEAFEN_MEMBERS = 23, "Deafen Members";
    MOVE_MEMBERS = 24, "Move Members";
    USE_VAD = 25, "Use Voice Activity";
    CHANGE_NICKNAME = 26, "Change Nickname";
    MANAGE_NICKNAMES = 27, "Manage Nicknames";
    /// Manage roles below the member's highest role
    MANAGE_ROLES = 28, "Manage Roles";
    MANAGE_WEBHOOKS = 29, "Manage Webhooks";
    MANAGE_EMOJIS_AND_STICKERS = 30, "Manage Emojis and Stickers";
    /// Invoke application (slash) commands
    USE_APPLICATION_COMMANDS = 31, "Use Application Commands";
    REQUEST_TO_SPEAK = 32, "Request to Speak";
    MANAGE_EVENTS = 33, "Manage Events";
    MANAGE_THREADS = 34, "Manage Threads";
    CREATE_PUBLIC_THREADS = 35, "Create Public Threads";
    CREATE_PRIVATE_THREADS = 36, "Create Private Threads";
    USE_EXTERNAL_STICKERS = 37, "Use External Stickers";
    SEND_MESSAGES_IN_THREADS = 38, "Send Messages in Threads";
    USE_EMBEDDED_ACTIVITIES = 39, "Use Activities";
    /// Time out members
    MODERATE_MEMBERS = 40, "Timeout Members";
}

impl Permissions {
    pub const fn new(bits: i64) -> Self {
        Self(bits)
    }

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Strict superset check: every flag in `required` must be present.
    ///
    /// Administrator is not special-cased here; callers pass the effective set.
    pub const fn contains_all(&self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// Flags present in `required` but absent from `self`.
    pub const fn missing(&self, required: Self) -> Self {
        Self(required.0 & !self.0)
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn add(&mut self, permission: i64) {
        self.0 |= permission;
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn bits(&self) -> i64 {
        self.0
    }

    /// Labels of the set flags, in bit order. Unknown bits are skipped.
    pub fn labels(&self) -> Vec<&'static str> {
        Self::FLAGS
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, label)| *label)
            .collect()
    }

    /// Labels joined with `", "`, as shown to users in denial notices.
    pub fn describe(&self) -> String {
        self.labels().join(", ")
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Permissions {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Permissions> for i64 {
    fn from(perms: Permissions) -> Self {
        perms.0
    }
}

impl FromIterator<i64> for Permissions {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().fold(0, |acc, bit| acc | bit))
    }
}

impl std::ops::BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}
