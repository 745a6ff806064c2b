//! Command handler trait and registry.
//!
//! Handlers are compiled into the host application and registered by logical
//! command path; the loader attaches them to descriptors when the matching
//! artifact is loaded. This replaces the handler function a dynamic module
//! system would export alongside its metadata.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::error::{ForgeError, Result};
use crate::gateway::interaction::SlashCommandInteraction;

/// An executable command implementation.
///
/// `previous` carries the immediately preceding handler's return value when
/// the dispatcher chains root → sub → sub-sub; it is `None` for the root
/// handler and for any level whose predecessor had no handler.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        interaction: &SlashCommandInteraction,
        previous: Option<Value>,
    ) -> Result<Option<Value>>;
}

/// Maps logical command paths (`"ping"`, `"config/set"`,
/// `"admin/roles/add"`) to handler implementations.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    /// Create a new empty handler registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under a logical command path.
    ///
    /// # Returns
    /// `Ok(())` on success, or `ForgeError::Config` if the path is already
    /// taken; two handlers for one command is always a wiring mistake.
    pub fn register(
        &mut self,
        path: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<()> {
        let path = path.into();
        if self.handlers.contains_key(&path) {
            return Err(ForgeError::Config(format!(
                "A handler is already registered for command path '{}'",
                path
            )));
        }

        info!(path = %path, "Registered command handler");
        self.handlers.insert(path, handler);
        Ok(())
    }

    /// Look up the handler for a logical command path.
    pub fn get(&self, path: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(path).cloned()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
