//! Runtime command descriptors.
//!
//! A descriptor pairs the declarative metadata from a compiled module with
//! the handler registered for its path. Descriptors are immutable after
//! load; `export()` is the only projection that leaves the process, and it
//! never includes the handler.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::handler::CommandHandler;
use super::module::{RootModule, SubModule};
use crate::flags::Permissions;

/// A top-level command descriptor.
#[derive(Clone)]
pub struct RootCommand {
    pub name: String,
    pub description: String,
    pub default_member_permissions: Option<Permissions>,
    pub nsfw: Option<bool>,
    pub dm_permission: Option<bool>,
    pub execute: Option<Arc<dyn CommandHandler>>,
}

impl RootCommand {
    pub(crate) fn from_module(
        name: String,
        module: RootModule,
        execute: Option<Arc<dyn CommandHandler>>,
    ) -> Self {
        Self {
            name,
            description: module.description,
            default_member_permissions: module.default_member_permissions,
            nsfw: module.nsfw,
            dm_permission: module.dm_permission,
            execute,
        }
    }

    /// Serializes the metadata for remote registration. The permission
    /// bitfield becomes its decimal string form; the handler is omitted.
    pub fn export(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("description".to_string(), json!(self.description));
        if let Some(permissions) = self.default_member_permissions {
            out.insert(
                "default_member_permissions".to_string(),
                json!(permissions.to_wire()),
            );
        }
        if let Some(nsfw) = self.nsfw {
            out.insert("nsfw".to_string(), json!(nsfw));
        }
        if let Some(dm_permission) = self.dm_permission {
            out.insert("dm_permission".to_string(), json!(dm_permission));
        }
        out
    }
}

impl fmt::Debug for RootCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootCommand")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("default_member_permissions", &self.default_member_permissions)
            .field("has_handler", &self.execute.is_some())
            .finish()
    }
}

/// A subcommand or sub-subcommand descriptor.
#[derive(Clone)]
pub struct SubCommand {
    pub name: String,
    pub description: String,
    pub execute: Option<Arc<dyn CommandHandler>>,
}

impl SubCommand {
    pub(crate) fn from_module(
        name: String,
        module: SubModule,
        execute: Option<Arc<dyn CommandHandler>>,
    ) -> Self {
        Self {
            name,
            description: module.description,
            execute,
        }
    }

    /// Serializes the metadata for remote registration, handler omitted.
    pub fn export(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("description".to_string(), json!(self.description));
        out
    }
}

impl fmt::Debug for SubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubCommand")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("has_handler", &self.execute.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_export_serializes_permissions_as_string() {
        let root = RootCommand::from_module(
            "admin".to_string(),
            RootModule {
                description: "Admin tools".to_string(),
                default_member_permissions: Some(Permissions::ADMINISTRATOR),
                nsfw: None,
                dm_permission: Some(false),
            },
            None,
        );

        let exported = root.export();
        assert_eq!(exported["description"], "Admin tools");
        assert_eq!(exported["default_member_permissions"], "8");
        assert_eq!(exported["dm_permission"], false);
        assert!(!exported.contains_key("nsfw"));
        // The handler must never appear in the projection.
        assert!(!exported.contains_key("execute"));
        assert!(!exported.contains_key("name"));
    }

    #[test]
    fn test_sub_export_is_metadata_only() {
        let sub = SubCommand::from_module(
            "set".to_string(),
            SubModule {
                description: "Set a value".to_string(),
            },
            None,
        );

        let exported = sub.export();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported["description"], "Set a value");
    }
}
