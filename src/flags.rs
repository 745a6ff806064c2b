//! Bitfield utilities for Discord permission and message flags.
//!
//! Permission masks are 64-bit and exceed the JSON safe-integer range, so the
//! wire format for them is a decimal string. `Permissions` serializes that way
//! while still accepting plain integers and flag-name arrays in command
//! manifests.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name table for the permission bits, used when a manifest spells
/// permissions as an array of flag names.
const PERMISSION_NAMES: &[(&str, u64)] = &[
    ("CREATE_INSTANT_INVITE", 1 << 0),
    ("KICK_MEMBERS", 1 << 1),
    ("BAN_MEMBERS", 1 << 2),
    ("ADMINISTRATOR", 1 << 3),
    ("MANAGE_CHANNELS", 1 << 4),
    ("MANAGE_GUILD", 1 << 5),
    ("ADD_REACTIONS", 1 << 6),
    ("VIEW_AUDIT_LOG", 1 << 7),
    ("PRIORITY_SPEAKER", 1 << 8),
    ("STREAM", 1 << 9),
    ("VIEW_CHANNEL", 1 << 10),
    ("SEND_MESSAGES", 1 << 11),
    ("SEND_TTS_MESSAGES", 1 << 12),
    ("MANAGE_MESSAGES", 1 << 13),
    ("EMBED_LINKS", 1 << 14),
    ("ATTACH_FILES", 1 << 15),
    ("READ_MESSAGE_HISTORY", 1 << 16),
    ("MENTION_EVERYONE", 1 << 17),
    ("USE_EXTERNAL_EMOJIS", 1 << 18),
    ("VIEW_GUILD_INSIGHTS", 1 << 19),
    ("CONNECT", 1 << 20),
    ("SPEAK", 1 << 21),
    ("MUTE_MEMBERS", 1 << 22),
    ("DEAFEN_MEMBERS", 1 << 23),
    ("MOVE_MEMBERS", 1 << 24),
    ("USE_VAD", 1 << 25),
    ("CHANGE_NICKNAME", 1 << 26),
    ("MANAGE_NICKNAMES", 1 << 27),
    ("MANAGE_ROLES", 1 << 28),
    ("MANAGE_WEBHOOKS", 1 << 29),
    ("MANAGE_GUILD_EXPRESSIONS", 1 << 30),
    ("USE_APPLICATION_COMMANDS", 1 << 31),
    ("REQUEST_TO_SPEAK", 1 << 32),
    ("MANAGE_EVENTS", 1 << 33),
    ("MANAGE_THREADS", 1 << 34),
    ("CREATE_PUBLIC_THREADS", 1 << 35),
    ("CREATE_PRIVATE_THREADS", 1 << 36),
    ("USE_EXTERNAL_STICKERS", 1 << 37),
    ("SEND_MESSAGES_IN_THREADS", 1 << 38),
    ("USE_EMBEDDED_ACTIVITIES", 1 << 39),
    ("MODERATE_MEMBERS", 1 << 40),
    ("VIEW_CREATOR_MONETIZATION_ANALYTICS", 1 << 41),
    ("USE_SOUNDBOARD", 1 << 42),
    ("CREATE_GUILD_EXPRESSIONS", 1 << 43),
    ("CREATE_EVENTS", 1 << 44),
    ("USE_EXTERNAL_SOUNDS", 1 << 45),
    ("SEND_VOICE_MESSAGES", 1 << 46),
    ("SEND_POLLS", 1 << 47),
    ("USE_EXTERNAL_APPS", 1 << 48),
];

/// A 64-bit Discord permission bitfield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions(u64);

impl Permissions {
    pub const CREATE_INSTANT_INVITE: Permissions = Permissions(1 << 0);
    pub const KICK_MEMBERS: Permissions = Permissions(1 << 1);
    pub const BAN_MEMBERS: Permissions = Permissions(1 << 2);
    pub const ADMINISTRATOR: Permissions = Permissions(1 << 3);
    pub const MANAGE_CHANNELS: Permissions = Permissions(1 << 4);
    pub const MANAGE_GUILD: Permissions = Permissions(1 << 5);
    pub const ADD_REACTIONS: Permissions = Permissions(1 << 6);
    pub const VIEW_AUDIT_LOG: Permissions = Permissions(1 << 7);
    pub const PRIORITY_SPEAKER: Permissions = Permissions(1 << 8);
    pub const STREAM: Permissions = Permissions(1 << 9);
    pub const VIEW_CHANNEL: Permissions = Permissions(1 << 10);
    pub const SEND_MESSAGES: Permissions = Permissions(1 << 11);
    pub const SEND_TTS_MESSAGES: Permissions = Permissions(1 << 12);
    pub const MANAGE_MESSAGES: Permissions = Permissions(1 << 13);
    pub const EMBED_LINKS: Permissions = Permissions(1 << 14);
    pub const ATTACH_FILES: Permissions = Permissions(1 << 15);
    pub const READ_MESSAGE_HISTORY: Permissions = Permissions(1 << 16);
    pub const MENTION_EVERYONE: Permissions = Permissions(1 << 17);
    pub const USE_EXTERNAL_EMOJIS: Permissions = Permissions(1 << 18);
    pub const VIEW_GUILD_INSIGHTS: Permissions = Permissions(1 << 19);
    pub const CONNECT: Permissions = Permissions(1 << 20);
    pub const SPEAK: Permissions = Permissions(1 << 21);
    pub const MUTE_MEMBERS: Permissions = Permissions(1 << 22);
    pub const DEAFEN_MEMBERS: Permissions = Permissions(1 << 23);
    pub const MOVE_MEMBERS: Permissions = Permissions(1 << 24);
    pub const USE_VAD: Permissions = Permissions(1 << 25);
    pub const CHANGE_NICKNAME: Permissions = Permissions(1 << 26);
    pub const MANAGE_NICKNAMES: Permissions = Permissions(1 << 27);
    pub const MANAGE_ROLES: Permissions = Permissions(1 << 28);
    pub const MANAGE_WEBHOOKS: Permissions = Permissions(1 << 29);
    pub const MANAGE_GUILD_EXPRESSIONS: Permissions = Permissions(1 << 30);
    pub const USE_APPLICATION_COMMANDS: Permissions = Permissions(1 << 31);
    pub const REQUEST_TO_SPEAK: Permissions = Permissions(1 << 32);
    pub const MANAGE_EVENTS: Permissions = Permissions(1 << 33);
    pub const MANAGE_THREADS: Permissions = Permissions(1 << 34);
    pub const CREATE_PUBLIC_THREADS: Permissions = Permissions(1 << 35);
    pub const CREATE_PRIVATE_THREADS: Permissions = Permissions(1 << 36);
    pub const USE_EXTERNAL_STICKERS: Permissions = Permissions(1 << 37);
    pub const SEND_MESSAGES_IN_THREADS: Permissions = Permissions(1 << 38);
    pub const USE_EMBEDDED_ACTIVITIES: Permissions = Permissions(1 << 39);
    pub const MODERATE_MEMBERS: Permissions = Permissions(1 << 40);
    pub const VIEW_CREATOR_MONETIZATION_ANALYTICS: Permissions = Permissions(1 << 41);
    pub const USE_SOUNDBOARD: Permissions = Permissions(1 << 42);
    pub const CREATE_GUILD_EXPRESSIONS: Permissions = Permissions(1 << 43);
    pub const CREATE_EVENTS: Permissions = Permissions(1 << 44);
    pub const USE_EXTERNAL_SOUNDS: Permissions = Permissions(1 << 45);
    pub const SEND_VOICE_MESSAGES: Permissions = Permissions(1 << 46);
    pub const SEND_POLLS: Permissions = Permissions(1 << 47);
    pub const USE_EXTERNAL_APPS: Permissions = Permissions(1 << 48);

    /// Creates a permissions field from a raw bit value.
    pub fn from_bits(bits: u64) -> Self {
        Permissions(bits)
    }

    /// Creates a permissions field from a flag name as spelled in manifests
    /// (e.g. `"MANAGE_GUILD"`).
    pub fn from_name(name: &str) -> Option<Self> {
        PERMISSION_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, bits)| Permissions(*bits))
    }

    /// Returns the raw bit value.
    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Checks if every one of the given permissions is present.
    pub fn has(&self, permissions: Permissions) -> bool {
        self.0 & permissions.0 == permissions.0
    }

    /// Adds permissions to the field.
    pub fn add(&mut self, permissions: Permissions) -> &mut Self {
        self.0 |= permissions.0;
        self
    }

    /// Removes permissions from the field.
    pub fn remove(&mut self, permissions: Permissions) -> &mut Self {
        self.0 &= !permissions.0;
        self
    }

    /// The wire representation: the bit value as a decimal string.
    pub fn to_wire(&self) -> String {
        self.0.to_string()
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Permissions) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

/// Accepted manifest spellings for a permission field.
#[derive(Deserialize)]
#[serde(untagged)]
enum PermissionsRepr {
    Bits(u64),
    Wire(String),
    Names(Vec<String>),
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match PermissionsRepr::deserialize(deserializer)? {
            PermissionsRepr::Bits(bits) => Ok(Permissions(bits)),
            PermissionsRepr::Wire(s) => s
                .parse::<u64>()
                .map(Permissions)
                .map_err(|_| DeError::custom(format!("invalid permission value '{}'", s))),
            PermissionsRepr::Names(names) => {
                let mut permissions = Permissions::default();
                for name in &names {
                    let flag = Permissions::from_name(name).ok_or_else(|| {
                        DeError::custom(format!("unknown permission flag '{}'", name))
                    })?;
                    permissions |= flag;
                }
                Ok(permissions)
            }
        }
    }
}

/// Message flag bits consumed by interaction replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageFlags(u64);

impl MessageFlags {
    pub const SUPPRESS_EMBEDS: MessageFlags = MessageFlags(1 << 2);
    pub const EPHEMERAL: MessageFlags = MessageFlags(1 << 6);
    pub const SUPPRESS_NOTIFICATIONS: MessageFlags = MessageFlags(1 << 12);

    /// Returns the raw bit value.
    pub fn bits(&self) -> u64 {
        self.0
    }
}

impl BitOr for MessageFlags {
    type Output = MessageFlags;

    fn bitor(self, rhs: MessageFlags) -> MessageFlags {
        MessageFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for MessageFlags {
    fn bitor_assign(&mut self, rhs: MessageFlags) {
        self.0 |= rhs.0;
    }
}
