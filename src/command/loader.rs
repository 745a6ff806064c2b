//! Compiled command module loading.
//!
//! Loads `command.json` artifacts from the dist tree, validates their
//! declared role against the structural position they were requested for,
//! and attaches registered handlers. Parsed modules are cached by SHA-256
//! content hash, so a load after a recompile observes the new bytes while an
//! unchanged artifact is never re-parsed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::builder::{RootCommand, SubCommand};
use super::handler::HandlerRegistry;
use super::module::{CommandModule, CommandRole};
use crate::error::{ForgeError, Result};

/// Fixed file name of a compiled command artifact.
pub const ARTIFACT_FILE_NAME: &str = "command.json";

type ArtifactDigest = [u8; 32];

struct CachedModule {
    digest: ArtifactDigest,
    module: CommandModule,
}

/// Loader for compiled command modules.
pub struct ModuleLoader {
    registry: Arc<HandlerRegistry>,
    cache: Mutex<HashMap<PathBuf, CachedModule>>,
}

impl ModuleLoader {
    /// Create a loader backed by the given handler registry.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load the artifact in `dir` as a root command.
    ///
    /// `logical_path` is the slash-joined path under the command root
    /// (for a root command, simply its name) and is used for handler lookup.
    pub async fn load_root(&self, dir: &Path, logical_path: &str) -> Result<RootCommand> {
        let (name, module) = self.load_module(dir).await?;
        match module {
            CommandModule::Root(root) => Ok(RootCommand::from_module(
                name,
                root,
                self.registry.get(logical_path),
            )),
            CommandModule::Sub(_) => Err(role_mismatch(dir, CommandRole::Root, CommandRole::Sub)),
        }
    }

    /// Load the artifact in `dir` as a sub or sub-sub command.
    pub async fn load_sub(&self, dir: &Path, logical_path: &str) -> Result<SubCommand> {
        let (name, module) = self.load_module(dir).await?;
        match module {
            CommandModule::Sub(sub) => {
                let execute = self.registry.get(logical_path);
                if execute.is_none() {
                    warn!(
                        path = %logical_path,
                        "Subcommand has no registered handler; dispatch will skip it"
                    );
                }
                Ok(SubCommand::from_module(name, sub, execute))
            }
            CommandModule::Root(_) => Err(role_mismatch(dir, CommandRole::Sub, CommandRole::Root)),
        }
    }

    /// Number of distinct artifacts currently cached.
    pub fn cache_size(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Reads, hashes and parses the artifact under `dir`, reusing the cached
    /// parse when the content hash is unchanged.
    async fn load_module(&self, dir: &Path) -> Result<(String, CommandModule)> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                ForgeError::Module(format!(
                    "Cannot derive a command name from \"{}\"",
                    dir.display()
                ))
            })?;

        let artifact = dir.join(ARTIFACT_FILE_NAME);
        let bytes = tokio::fs::read(&artifact).await.map_err(|e| {
            ForgeError::Module(format!(
                "Command file \"{}\" does not exist or is not readable: {}",
                artifact.display(),
                e
            ))
        })?;

        let digest: ArtifactDigest = Sha256::digest(&bytes).into();

        if let Ok(cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&artifact) {
                if cached.digest == digest {
                    return Ok((name, cached.module.clone()));
                }
            }
        }

        let module: CommandModule = serde_json::from_slice(&bytes).map_err(|e| {
            ForgeError::Module(format!(
                "Command file \"{}\" is not a valid command module: {}",
                artifact.display(),
                e
            ))
        })?;

        debug!(
            artifact = %artifact.display(),
            digest = %hex::encode(digest),
            "Parsed command module"
        );

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                artifact,
                CachedModule {
                    digest,
                    module: module.clone(),
                },
            );
        }

        Ok((name, module))
    }
}

fn role_mismatch(dir: &Path, expected: CommandRole, actual: CommandRole) -> ForgeError {
    ForgeError::Module(format!(
        "Command file \"{}\" declares role '{}' but was loaded as '{}'",
        dir.join(ARTIFACT_FILE_NAME).display(),
        actual,
        expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_artifact(dir: &Path, json: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(ARTIFACT_FILE_NAME), json).unwrap();
    }

    fn loader() -> ModuleLoader {
        ModuleLoader::new(Arc::new(HandlerRegistry::new()))
    }

    #[tokio::test]
    async fn test_load_root() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("ping");
        write_artifact(&dir, r#"{"kind":"root","description":"Pong!"}"#);

        let root = loader().load_root(&dir, "ping").await.unwrap();
        assert_eq!(root.name, "ping");
        assert_eq!(root.description, "Pong!");
        assert!(root.execute.is_none());
    }

    #[tokio::test]
    async fn test_load_missing_artifact() {
        let tmp = TempDir::new().unwrap();
        let result = loader().load_root(&tmp.path().join("ping"), "ping").await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_load_invalid_module() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("ping");
        write_artifact(&dir, r#"{"description":"no kind tag"}"#);

        let result = loader().load_root(&dir, "ping").await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("not a valid command module"));
    }

    #[tokio::test]
    async fn test_role_mismatch_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("set");
        write_artifact(&dir, r#"{"kind":"sub","description":"Set"}"#);

        let err = loader().load_root(&dir, "set").await.unwrap_err().to_string();
        assert!(err.contains("declares role 'sub'"));
        assert!(err.contains("loaded as 'root'"));
    }

    #[tokio::test]
    async fn test_cache_observes_rewritten_artifact() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("ping");
        write_artifact(&dir, r#"{"kind":"root","description":"old"}"#);

        let loader = loader();
        let first = loader.load_root(&dir, "ping").await.unwrap();
        assert_eq!(first.description, "old");
        assert_eq!(loader.cache_size(), 1);

        // Unchanged bytes: still a single cache entry.
        loader.load_root(&dir, "ping").await.unwrap();
        assert_eq!(loader.cache_size(), 1);

        write_artifact(&dir, r#"{"kind":"root","description":"new"}"#);
        let second = loader.load_root(&dir, "ping").await.unwrap();
        assert_eq!(second.description, "new");
        assert_eq!(loader.cache_size(), 1);
    }

    #[tokio::test]
    async fn test_handler_attachment() {
        use crate::command::handler::CommandHandler;
        use crate::gateway::interaction::SlashCommandInteraction;
        use async_trait::async_trait;
        use serde_json::Value;

        struct Marker;

        #[async_trait]
        impl CommandHandler for Marker {
            async fn execute(
                &self,
                _interaction: &SlashCommandInteraction,
                _previous: Option<Value>,
            ) -> Result<Option<Value>> {
                Ok(Some(Value::from(1)))
            }
        }

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("set");
        write_artifact(&dir, r#"{"kind":"sub","description":"Set"}"#);

        let mut registry = HandlerRegistry::new();
        registry.register("config/set", Arc::new(Marker)).unwrap();
        let loader = ModuleLoader::new(Arc::new(registry));

        let sub = loader.load_sub(&dir, "config/set").await.unwrap();
        assert!(sub.execute.is_some());
    }
}
