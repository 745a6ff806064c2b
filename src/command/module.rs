//! Compiled command module types.
//!
//! A command source manifest compiles into one of these. The structural role
//! is a closed tagged variant (`kind: "root" | "sub"`) so the loader can
//! switch on data instead of inspecting type identity, which would not
//! survive the trip through the artifact file.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ForgeError, Result};
use crate::flags::Permissions;

/// Discord command-name rules: lowercase, 1-32 chars, `a-z 0-9 _ -`.
static COMMAND_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]{1,32}$").expect("valid command name regex"));

/// Maximum length of a command description accepted by the platform.
const MAX_DESCRIPTION_LEN: usize = 100;

/// Structural position a module may occupy in the command tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRole {
    /// Top-level command, directly under `commands/`.
    Root,
    /// Subcommand or sub-subcommand, one or two levels deeper.
    Sub,
}

impl fmt::Display for CommandRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandRole::Root => write!(f, "root"),
            CommandRole::Sub => write!(f, "sub"),
        }
    }
}

/// A compiled command module as stored in a `command.json` artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CommandModule {
    Root(RootModule),
    Sub(SubModule),
}

/// Metadata for a top-level command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootModule {
    pub description: String,

    /// Permission mask members need by default to see the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<Permissions>,

    /// Whether the command is age-restricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,

    /// Whether the command is usable in DMs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dm_permission: Option<bool>,
}

/// Metadata for a subcommand or sub-subcommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubModule {
    pub description: String,
}

impl CommandModule {
    /// The role this module declares.
    pub fn role(&self) -> CommandRole {
        match self {
            CommandModule::Root(_) => CommandRole::Root,
            CommandModule::Sub(_) => CommandRole::Sub,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CommandModule::Root(m) => &m.description,
            CommandModule::Sub(m) => &m.description,
        }
    }

    /// Validates the module against platform constraints, under the command
    /// name derived from its directory.
    pub fn validate(&self, name: &str) -> Result<()> {
        if !COMMAND_NAME_RE.is_match(name) {
            return Err(ForgeError::Build(format!(
                "Invalid command name '{}': must be 1-32 lowercase alphanumeric characters, underscores or hyphens",
                name
            )));
        }

        let description = self.description();
        if description.trim().is_empty() {
            return Err(ForgeError::Build(format!(
                "Command '{}' has an empty description",
                name
            )));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ForgeError::Build(format!(
                "Command '{}' description exceeds {} characters",
                name, MAX_DESCRIPTION_LEN
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_module(description: &str) -> CommandModule {
        CommandModule::Root(RootModule {
            description: description.to_string(),
            default_member_permissions: None,
            nsfw: None,
            dm_permission: None,
        })
    }

    #[test]
    fn test_kind_tag_roundtrip() {
        let module = root_module("Pong!");
        let json = serde_json::to_string(&module).unwrap();
        assert!(json.contains(r#""kind":"root""#));

        let back: CommandModule = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role(), CommandRole::Root);
    }

    #[test]
    fn test_sub_module_deserialization() {
        let module: CommandModule =
            serde_json::from_str(r#"{"kind":"sub","description":"Set a value"}"#).unwrap();
        assert_eq!(module.role(), CommandRole::Sub);
        assert_eq!(module.description(), "Set a value");
    }

    #[test]
    fn test_missing_kind_is_rejected() {
        let result: std::result::Result<CommandModule, _> =
            serde_json::from_str(r#"{"description":"no role"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_name_rules() {
        let module = root_module("ok");
        assert!(module.validate("ping").is_ok());
        assert!(module.validate("config-set_2").is_ok());
        assert!(module.validate("Ping").is_err());
        assert!(module.validate("").is_err());
        assert!(module.validate(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_description_rules() {
        assert!(root_module("  ").validate("ping").is_err());
        assert!(root_module(&"d".repeat(101)).validate("ping").is_err());
        assert!(root_module(&"d".repeat(100)).validate("ping").is_ok());
    }

    #[test]
    fn test_root_permissions_from_manifest_names() {
        let json = r#"{
            "kind": "root",
            "description": "Admin tools",
            "default_member_permissions": ["ADMINISTRATOR"]
        }"#;
        let module: CommandModule = serde_json::from_str(json).unwrap();
        match module {
            CommandModule::Root(m) => {
                assert!(m
                    .default_member_permissions
                    .unwrap()
                    .has(crate::flags::Permissions::ADMINISTRATOR));
            }
            CommandModule::Sub(_) => panic!("expected root"),
        }
    }
}
