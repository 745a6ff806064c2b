//! Interaction dispatch.
//!
//! Maps an inbound command interaction onto a 1–3 element path mirroring the
//! command directory convention, resolves exactly that branch from the
//! compiled tree, and runs the matched handlers root → sub → sub-sub,
//! threading each handler's return value into the next.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use super::interaction::SlashCommandInteraction;
use super::types::{option_type, CommandData, InteractionPayload};
use crate::api::DiscordApi;
use crate::command::{CommandTree, ModuleLoader};
use crate::error::{ForgeError, Result};

/// Routes command interactions to their handler chains.
#[derive(Clone)]
pub struct Dispatcher {
    loader: Arc<ModuleLoader>,
    dist_dir: PathBuf,
    api: Arc<DiscordApi>,
}

impl Dispatcher {
    pub fn new(loader: Arc<ModuleLoader>, dist_dir: PathBuf, api: Arc<DiscordApi>) -> Self {
        Self {
            loader,
            dist_dir,
            api,
        }
    }

    /// Derives the dispatch path from a command payload.
    ///
    /// The top-level command name, plus the first option's name when it is a
    /// subcommand or subcommand group, plus that option's first nested
    /// option's name when it is a subcommand.
    pub fn derive_path(data: &CommandData) -> Vec<String> {
        let mut parts = vec![data.name.clone()];

        if let Some(first) = data.options.first() {
            if first.kind == option_type::SUB_COMMAND
                || first.kind == option_type::SUB_COMMAND_GROUP
            {
                parts.push(first.name.clone());

                if let Some(nested) = first.options.first() {
                    if nested.kind == option_type::SUB_COMMAND {
                        parts.push(nested.name.clone());
                    }
                }
            }
        }

        parts
    }

    /// Resolves and runs the handler chain for one interaction.
    ///
    /// Handlers run strictly in order; each receives the previous handler's
    /// return value, an absent handler is skipped and `None` flows forward.
    pub async fn dispatch(&self, payload: InteractionPayload) -> Result<()> {
        let data = payload
            .data
            .as_ref()
            .ok_or_else(|| ForgeError::Dispatch("Command interaction has no data".to_string()))?;

        let parts = Self::derive_path(data);
        debug!(path = %parts.join("/"), "Dispatching command interaction");

        let chain = CommandTree::load_path(&self.loader, &self.dist_dir, &parts).await?;
        let interaction = SlashCommandInteraction::new(payload, Arc::clone(&self.api));

        let mut previous: Option<Value> = None;
        if let Some(handler) = &chain.root.execute {
            previous = handler.execute(&interaction, previous).await?;
        }
        if let Some(sub) = &chain.sub {
            previous = match &sub.execute {
                Some(handler) => handler.execute(&interaction, previous).await?,
                None => None,
            };
        }
        if let Some(sub_sub) = &chain.sub_sub {
            if let Some(handler) = &sub_sub.execute {
                handler.execute(&interaction, previous).await?;
            }
        }

        Ok(())
    }

    /// Runs [`Dispatcher::dispatch`] as a detached task.
    ///
    /// The inbound request was already acknowledged; failures here never
    /// reach the remote caller and are reported through the log instead.
    pub fn dispatch_detached(&self, payload: InteractionPayload) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(payload).await {
                error!(error = %e, "Detached command dispatch failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandHandler, HandlerRegistry, ARTIFACT_FILE_NAME};
    use crate::config::COMMANDS_DIR_NAME;
    use async_trait::async_trait;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn data(json: Value) -> CommandData {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_derive_path_root_only() {
        let data = data(json!({"id": "1", "name": "ping", "options": []}));
        assert_eq!(Dispatcher::derive_path(&data), vec!["ping"]);
    }

    #[test]
    fn test_derive_path_plain_option_is_not_a_subcommand() {
        // Option type 3 is a string argument, not a subcommand.
        let data = data(json!({
            "id": "1",
            "name": "echo",
            "options": [{"name": "text", "type": 3, "value": "hi"}]
        }));
        assert_eq!(Dispatcher::derive_path(&data), vec!["echo"]);
    }

    #[test]
    fn test_derive_path_subcommand() {
        let data = data(json!({
            "id": "1",
            "name": "config",
            "options": [{"name": "set", "type": 1, "options": [
                {"name": "key", "type": 3, "value": "k"}
            ]}]
        }));
        assert_eq!(Dispatcher::derive_path(&data), vec!["config", "set"]);
    }

    #[test]
    fn test_derive_path_subcommand_group() {
        let data = data(json!({
            "id": "1",
            "name": "admin",
            "options": [{"name": "roles", "type": 2, "options": [
                {"name": "add", "type": 1}
            ]}]
        }));
        assert_eq!(
            Dispatcher::derive_path(&data),
            vec!["admin", "roles", "add"]
        );
    }

    // ---- handler chaining ----

    /// Records the `previous` value it sees and returns a configured value.
    struct Recording {
        seen: Arc<Mutex<Vec<Option<Value>>>>,
        returns: Option<Value>,
    }

    #[async_trait]
    impl CommandHandler for Recording {
        async fn execute(
            &self,
            _interaction: &SlashCommandInteraction,
            previous: Option<Value>,
        ) -> Result<Option<Value>> {
            self.seen.lock().unwrap().push(previous);
            Ok(self.returns.clone())
        }
    }

    fn write_artifact(dist: &Path, logical: &str, json: &str) {
        let dir = dist.join(COMMANDS_DIR_NAME).join(logical);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(ARTIFACT_FILE_NAME), json).unwrap();
    }

    fn payload(data: Value) -> InteractionPayload {
        serde_json::from_value(json!({
            "id": "1",
            "application_id": "42",
            "type": 2,
            "token": "tok",
            "data": data,
        }))
        .unwrap()
    }

    fn dispatcher(dist: &Path, registry: HandlerRegistry) -> Dispatcher {
        Dispatcher::new(
            Arc::new(ModuleLoader::new(Arc::new(registry))),
            dist.to_path_buf(),
            Arc::new(DiscordApi::new("", "42").with_base_url("http://127.0.0.1:9")),
        )
    }

    #[tokio::test]
    async fn test_chain_threads_previous_value() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), "config", r#"{"kind":"root","description":"r"}"#);
        write_artifact(tmp.path(), "config/set", r#"{"kind":"sub","description":"s"}"#);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                "config",
                Arc::new(Recording {
                    seen: seen.clone(),
                    returns: Some(json!(42)),
                }),
            )
            .unwrap();
        registry
            .register(
                "config/set",
                Arc::new(Recording {
                    seen: seen.clone(),
                    returns: None,
                }),
            )
            .unwrap();

        let dispatcher = dispatcher(tmp.path(), registry);
        dispatcher
            .dispatch(payload(json!({
                "id": "1",
                "name": "config",
                "options": [{"name": "set", "type": 1}]
            })))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[None, Some(json!(42))]);
    }

    #[tokio::test]
    async fn test_absent_root_handler_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), "config", r#"{"kind":"root","description":"r"}"#);
        write_artifact(tmp.path(), "config/set", r#"{"kind":"sub","description":"s"}"#);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                "config/set",
                Arc::new(Recording {
                    seen: seen.clone(),
                    returns: None,
                }),
            )
            .unwrap();

        let dispatcher = dispatcher(tmp.path(), registry);
        dispatcher
            .dispatch(payload(json!({
                "id": "1",
                "name": "config",
                "options": [{"name": "set", "type": 1}]
            })))
            .await
            .unwrap();

        // The root had no handler; the sub observed None flowing forward.
        assert_eq!(seen.lock().unwrap().as_slice(), &[None]);
    }

    #[tokio::test]
    async fn test_root_only_dispatch_completes_without_sub() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), "ping", r#"{"kind":"root","description":"r"}"#);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                "ping",
                Arc::new(Recording {
                    seen: seen.clone(),
                    returns: Some(json!("pong")),
                }),
            )
            .unwrap();

        let dispatcher = dispatcher(tmp.path(), registry);
        dispatcher
            .dispatch(payload(json!({"id": "1", "name": "ping", "options": []})))
            .await
            .unwrap();

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_path_is_a_dispatch_failure() {
        let tmp = TempDir::new().unwrap();
        let dispatcher = dispatcher(tmp.path(), HandlerRegistry::new());

        let result = dispatcher
            .dispatch(payload(json!({"id": "1", "name": "missing", "options": []})))
            .await;
        assert!(result.is_err());
    }
}
