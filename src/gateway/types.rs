//! Inbound interaction payload model.
//!
//! Typed views over the platform's interaction wire format, limited to the
//! fields the pipeline consumes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Interaction envelope types.
pub mod interaction_type {
    pub const PING: u8 = 1;
    pub const APPLICATION_COMMAND: u8 = 2;
}

/// Command option types used for path derivation.
pub mod option_type {
    pub const SUB_COMMAND: u8 = 1;
    pub const SUB_COMMAND_GROUP: u8 = 2;
}

/// Interaction response types.
pub mod response_type {
    pub const PONG: u8 = 1;
    pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
    pub const DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE: u8 = 5;
}

/// An inbound interaction envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionPayload {
    pub id: String,
    pub application_id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub token: String,
    #[serde(default)]
    pub data: Option<CommandData>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub member: Option<GuildMember>,
    #[serde(default)]
    pub user: Option<User>,
}

/// The command payload of an application-command interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandDataOption>,
}

/// One option in a command payload. Subcommands and groups nest here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDataOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub options: Vec<CommandDataOption>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// A platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub global_name: Option<String>,
}

/// Guild membership context attached to guild interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub permissions: Option<String>,
}

/// A message returned by the webhook `@original` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<User>,
}

impl InteractionPayload {
    /// The invoking user, whether the interaction arrived from a guild or a
    /// DM.
    pub fn user(&self) -> Option<&User> {
        self.user
            .as_ref()
            .or_else(|| self.member.as_ref().and_then(|m| m.user.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_deserialization() {
        let json = r#"{
            "id": "846462639134605312",
            "application_id": "1234",
            "type": 2,
            "token": "tok",
            "data": {
                "id": "1",
                "name": "admin",
                "options": [{
                    "name": "roles",
                    "type": 2,
                    "options": [{"name": "add", "type": 1}]
                }]
            },
            "member": {"user": {"id": "9", "username": "dev"}}
        }"#;

        let payload: InteractionPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.kind, interaction_type::APPLICATION_COMMAND);
        let data = payload.data.as_ref().unwrap();
        assert_eq!(data.name, "admin");
        assert_eq!(data.options[0].kind, option_type::SUB_COMMAND_GROUP);
        assert_eq!(data.options[0].options[0].name, "add");
        assert_eq!(payload.user().unwrap().username, "dev");
    }

    #[test]
    fn test_ping_payload_has_no_data() {
        let json = r#"{"id": "1", "application_id": "2", "type": 1, "token": "t"}"#;
        let payload: InteractionPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.kind, interaction_type::PING);
        assert!(payload.data.is_none());
        assert!(payload.user().is_none());
    }
}
