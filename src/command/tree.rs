//! In-memory command tree.
//!
//! Three-level mapping from root command name down to sub-subcommands,
//! assembled from compiled artifacts. Assembly is append-only and the tree
//! is never mutated afterwards, so concurrent readers are safe once a
//! reference is handed out.
//!
//! Two access modes exist: [`CommandTree::load_all`] builds the whole tree
//! (bulk registration), while [`CommandTree::load_path`] loads exactly one
//! branch (per-request dispatch). The failure policy differs by depth: a
//! root or sub failure aborts the whole bulk load, a sub-sub failure only
//! drops that leaf, since deeper levels are progressively more optional.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures::future::{join_all, try_join_all};
use serde_json::{json, Value};
use tracing::warn;

use super::builder::{RootCommand, SubCommand};
use super::loader::{ModuleLoader, ARTIFACT_FILE_NAME};
use crate::config::COMMANDS_DIR_NAME;
use crate::error::{ForgeError, Result};
use crate::gateway::types::option_type;

/// A loaded root command and its subcommands.
#[derive(Debug, Clone)]
pub struct RootNode {
    pub root: RootCommand,
    pub sub: BTreeMap<String, SubNode>,
}

/// A loaded subcommand and its sub-subcommands.
#[derive(Debug, Clone)]
pub struct SubNode {
    pub root: SubCommand,
    pub sub: BTreeMap<String, SubCommand>,
}

/// The resolved descriptor chain for one dispatch path.
#[derive(Debug, Clone)]
pub struct ResolvedChain {
    pub root: RootCommand,
    pub sub: Option<SubCommand>,
    pub sub_sub: Option<SubCommand>,
}

/// The assembled command tree.
#[derive(Debug, Default)]
pub struct CommandTree {
    roots: BTreeMap<String, RootNode>,
}

impl CommandTree {
    /// Loads every compiled command under `<dist_dir>/commands`.
    ///
    /// Any root- or sub-level failure aborts the whole call; a sub-sub
    /// failure is logged and the leaf omitted.
    pub async fn load_all(loader: &ModuleLoader, dist_dir: &Path) -> Result<CommandTree> {
        let commands_root = dist_dir.join(COMMANDS_DIR_NAME);
        let root_dirs = child_dirs(&commands_root).map_err(|e| {
            ForgeError::Module(format!(
                "Cannot read compiled commands directory \"{}\": {}",
                commands_root.display(),
                e
            ))
        })?;

        let mut roots = BTreeMap::new();
        for dir in root_dirs {
            let (name, node) = load_root_node(loader, &dir).await?;
            roots.insert(name, node);
        }

        Ok(CommandTree { roots })
    }

    /// Loads exactly the descriptors along `parts` (1 to 3 names), with
    /// expected role root at the first position and sub afterwards.
    ///
    /// This is the per-request fast path: only the matched branch is read,
    /// so latency is bounded by path depth rather than tree size.
    pub async fn load_path(
        loader: &ModuleLoader,
        dist_dir: &Path,
        parts: &[String],
    ) -> Result<ResolvedChain> {
        if parts.is_empty() || parts.len() > 3 {
            return Err(ForgeError::Dispatch(format!(
                "Command path must have 1 to 3 elements, got {}",
                parts.len()
            )));
        }

        let mut dir = dist_dir.join(COMMANDS_DIR_NAME);
        let mut logical = String::new();

        dir.push(&parts[0]);
        logical.push_str(&parts[0]);
        let root = loader.load_root(&dir, &logical).await?;

        let mut subs = Vec::new();
        for part in &parts[1..] {
            dir.push(part);
            logical.push('/');
            logical.push_str(part);
            subs.push(loader.load_sub(&dir, &logical).await?);
        }

        let mut subs = subs.into_iter();
        Ok(ResolvedChain {
            root,
            sub: subs.next(),
            sub_sub: subs.next(),
        })
    }

    /// Look up a loaded root command by name.
    pub fn get(&self, name: &str) -> Option<&RootNode> {
        self.roots.get(name)
    }

    /// Number of root commands in the tree.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Iterate over the loaded root commands in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RootNode)> {
        self.roots.iter()
    }

    /// Serializes the whole tree as the bulk-registration payload.
    ///
    /// A leaf sub becomes a subcommand option (type 1); a sub with children
    /// becomes a subcommand group (type 2) wrapping type-1 options.
    pub fn export_payload(&self) -> Vec<Value> {
        self.roots
            .iter()
            .map(|(name, node)| {
                let mut command = node.root.export();
                command.insert("name".to_string(), json!(name));
                let options: Vec<Value> = node
                    .sub
                    .iter()
                    .map(|(sub_name, sub_node)| export_sub(sub_name, sub_node))
                    .collect();
                command.insert("options".to_string(), json!(options));
                Value::Object(command)
            })
            .collect()
    }
}

fn export_sub(name: &str, node: &SubNode) -> Value {
    let shallow = node.sub.is_empty();
    let mut option = node.root.export();
    option.insert("name".to_string(), json!(name));
    option.insert(
        "type".to_string(),
        json!(if shallow {
            option_type::SUB_COMMAND
        } else {
            option_type::SUB_COMMAND_GROUP
        }),
    );
    let nested: Vec<Value> = node
        .sub
        .iter()
        .map(|(leaf_name, leaf)| {
            let mut o = leaf.export();
            o.insert("name".to_string(), json!(leaf_name));
            o.insert("type".to_string(), json!(option_type::SUB_COMMAND));
            o.insert("options".to_string(), json!([]));
            Value::Object(o)
        })
        .collect();
    option.insert("options".to_string(), json!(nested));
    Value::Object(option)
}

async fn load_root_node(loader: &ModuleLoader, dir: &Path) -> Result<(String, RootNode)> {
    let root = loader.load_root(dir, &dir_name(dir)).await?;
    let name = root.name.clone();

    let sub_dirs = dirs_with_artifact(dir);
    let loaded = try_join_all(
        sub_dirs
            .iter()
            .map(|sub_dir| load_sub_node(loader, sub_dir, &name)),
    )
    .await?;

    let mut sub = BTreeMap::new();
    for (sub_name, node) in loaded {
        sub.insert(sub_name, node);
    }

    Ok((name, RootNode { root, sub }))
}

async fn load_sub_node(
    loader: &ModuleLoader,
    dir: &Path,
    logical_prefix: &str,
) -> Result<(String, SubNode)> {
    let name = dir_name(dir);
    let logical = format!("{}/{}", logical_prefix, name);
    let sub = loader.load_sub(dir, &logical).await?;

    // Sub-sub loads fan out concurrently; failures are discarded after all
    // siblings settle.
    let leaf_dirs = dirs_with_artifact(dir);
    let results = join_all(leaf_dirs.iter().map(|leaf_dir| {
        let leaf_name = dir_name(leaf_dir);
        let leaf_logical = format!("{}/{}", logical, leaf_name);
        async move {
            loader
                .load_sub(leaf_dir, &leaf_logical)
                .await
                .map(|leaf| (leaf_name, leaf))
        }
    }))
    .await;

    let mut leaves = BTreeMap::new();
    for result in results {
        match result {
            Ok((leaf_name, leaf)) => {
                leaves.insert(leaf_name, leaf);
            }
            Err(e) => {
                warn!(error = %e, "Skipping sub-subcommand that failed to load");
            }
        }
    }

    Ok((name, SubNode { root: sub, sub: leaves }))
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Immediate child directories, in enumeration order.
fn child_dirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

/// Immediate child directories that contain a compiled artifact.
fn dirs_with_artifact(dir: &Path) -> Vec<PathBuf> {
    child_dirs(dir)
        .unwrap_or_default()
        .into_iter()
        .filter(|d| d.join(ARTIFACT_FILE_NAME).is_file())
        .collect()
}
