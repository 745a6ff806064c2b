//! Build orchestration for command modules.
//!
//! The orchestrator owns the compiled-output directory: it validates the
//! configured location before touching the filesystem, purges stale
//! artifacts from previous runs, drives compilation passes over the
//! discovered command sources, and in watch mode keeps the output in sync
//! with the source tree, pruning orphaned artifacts when sources disappear.
//!
//! The mode (one-shot or watch) is selected once at construction and fixed
//! for the orchestrator's lifetime.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::compiler::{
    ChunkGroup, CompileStats, CompileTarget, Compiler, CompilerConfig, CompilerPlugin,
    ModuleFormat, Optimization, OutputOptions,
};
use super::entry::{artifact_path, build_entry_map, entry_key};
use super::watcher::{watch_dir, FsWatcher, WatchEvent};
use crate::config::Config;
use crate::error::{ForgeError, Result};
use crate::scanner::{scan, COMMAND_FILE_NAME};

/// Host plugins that are irrelevant or harmful to an isolated node-targeted
/// bundle and are stripped from the build configuration.
const PLUGIN_DENYLIST: [&str; 4] = ["manifest", "client-entry", "telemetry", "type-generation"];

/// The dependency-tracing plugin is not dropped; it is reconstructed scoped
/// to the isolated output directory.
const TRACE_PLUGIN_NAME: &str = "dependency-trace";

/// Source directories a dist dir must not collide with.
const SOURCE_DIR_NAMES: [&str; 3] = ["src", "commands", "tests"];

/// Default host-framework build output directory.
const HOST_BUILD_DIR: &str = "target";

/// Externals left unbundled for node-targeted output.
const NODE_EXTERNALS: [&str; 2] = ["fs", "path"];

/// User-supplied configuration transform, applied before the orchestrator's
/// own overrides.
pub type ConfigTransform = Box<dyn Fn(CompilerConfig) -> CompilerConfig + Send + Sync>;

/// The host framework's build configuration, as consumed by the
/// orchestrator.
#[derive(Default)]
pub struct HostBuildConfig {
    /// Named plugin instances. Sanitized against [`PLUGIN_DENYLIST`].
    pub plugins: Vec<CompilerPlugin>,
    /// Module resolution options, passed through untouched.
    pub resolve: Option<Value>,
    /// Host optimization options, merged beneath the forced directives.
    pub optimization: Option<Value>,
    /// The host framework's own build output directory, if not `target`.
    pub build_dir: Option<String>,
    /// Transform hook invoked on the derived configuration before the
    /// orchestrator applies its own overrides.
    pub transform: Option<ConfigTransform>,
}

/// Mode of operation, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// One compilation pass over all currently discovered command files.
    OneShot,
    /// Recompile on filesystem events, prune orphaned artifacts on removal.
    Watch,
}

/// Handle for a running watch-mode orchestrator.
pub struct WatchTask {
    watcher: FsWatcher,
    task: JoinHandle<()>,
}

impl WatchTask {
    /// Closes the filesystem watcher and stops the rebuild loop.
    pub fn close(self) {
        self.watcher.close();
        self.task.abort();
    }
}

/// Drives command module compilation.
#[derive(Clone)]
pub struct BuildOrchestrator {
    mode: BuildMode,
    commands_dir: PathBuf,
    dist_dir: PathBuf,
    base_config: CompilerConfig,
    compiler: Arc<dyn Compiler>,
}

impl BuildOrchestrator {
    /// Creates an orchestrator.
    ///
    /// The dist-dir configuration is validated before any filesystem access;
    /// a violation is a `ForgeError::Config` and nothing is deleted or
    /// written. After validation, pre-existing dist-dir contents are purged
    /// best-effort so stale artifacts never survive a restart.
    pub fn new(
        mode: BuildMode,
        config: &Config,
        host: HostBuildConfig,
        compiler: Arc<dyn Compiler>,
    ) -> Result<Self> {
        let dist_dir = validate_dist_dir(
            &config.project_root,
            &config.dist_dir,
            host.build_dir.as_deref(),
        )?;

        if dist_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&dist_dir) {
                warn!(
                    dist = %dist_dir.display(),
                    error = %e,
                    "Failed to clear previous dist dir"
                );
            }
        }

        let base_config = sanitize_config(host, &dist_dir);

        Ok(Self {
            mode,
            commands_dir: config.commands_dir(),
            dist_dir,
            base_config,
            compiler,
        })
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// The validated, absolute compiled-output directory.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Runs the orchestrator in its configured mode.
    ///
    /// One-shot: exactly one compilation pass; a failure aborts startup.
    /// Watch: starts the watcher and returns a handle; the caller closes it
    /// at shutdown to release the watcher's resources.
    pub async fn run(&self) -> Result<Option<WatchTask>> {
        match self.mode {
            BuildMode::OneShot => {
                self.compile_pass().await?;
                Ok(None)
            }
            BuildMode::Watch => {
                let (watcher, rx) = watch_dir(&self.commands_dir)?;
                let orchestrator = self.clone();
                let task = tokio::spawn(async move { orchestrator.watch_loop(rx).await });
                Ok(Some(WatchTask { watcher, task }))
            }
        }
    }

    /// One full discovery + compilation pass.
    ///
    /// The entry map is complete before the compiler is invoked; partial
    /// entry maps are never compiled.
    pub async fn compile_pass(&self) -> Result<CompileStats> {
        let sources = scan(&self.commands_dir);
        let entry = build_entry_map(&self.commands_dir, &sources);
        info!(modules = entry.len(), "Building command modules");

        let mut config = self.base_config.clone();
        config.entry = entry;

        match self.compiler.compile(&config).await {
            Ok(stats) => {
                info!(
                    emitted = stats.emitted.len(),
                    "Command module build done"
                );
                Ok(stats)
            }
            Err(e) => {
                error!("{}", e);
                error!("Command module build failed");
                Err(e)
            }
        }
    }

    async fn watch_loop(&self, mut rx: mpsc::Receiver<WatchEvent>) {
        while let Some(event) = rx.recv().await {
            match &event {
                WatchEvent::Removed(path)
                    if path.file_name().is_some_and(|n| n == COMMAND_FILE_NAME) =>
                {
                    info!(path = %path.display(), "Command source removed, pruning artifact");
                    self.remove_artifact(path);
                }
                _ => {
                    info!(
                        event = event.label(),
                        path = %event.path().display(),
                        "Rebuilding command modules"
                    );
                    if let Err(e) = self.compile_pass().await {
                        // Previous artifacts stay in place; the compiler
                        // writes atomically or not at all.
                        error!(error = %e, "Watch-mode build failed");
                    }
                }
            }
        }
    }

    /// Deletes the compiled artifact for a removed command source, then
    /// walks upward removing now-empty parent directories until a non-empty
    /// directory or the dist root is reached.
    pub fn remove_artifact(&self, source: &Path) {
        let Some(key) = entry_key(&self.commands_dir, source) else {
            return;
        };
        let artifact = artifact_path(&self.dist_dir, &key);
        if !artifact.exists() {
            return;
        }

        if let Err(e) = std::fs::remove_file(&artifact) {
            warn!(artifact = %artifact.display(), error = %e, "Failed to delete artifact");
            return;
        }

        let mut dir = artifact.parent().map(Path::to_path_buf);
        while let Some(current) = dir {
            if current == self.dist_dir || !current.exists() {
                break;
            }
            let is_empty = std::fs::read_dir(&current)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !is_empty {
                break;
            }
            if let Err(e) = std::fs::remove_dir(&current) {
                warn!(dir = %current.display(), error = %e, "Failed to prune empty dir");
                break;
            }
            dir = current.parent().map(Path::to_path_buf);
        }
    }
}

/// Validates the configured dist dir. Runs before any filesystem access.
fn validate_dist_dir(
    project_root: &Path,
    dist_dir: &str,
    host_build_dir: Option<&str>,
) -> Result<PathBuf> {
    let normalized = dist_dir.replace('\\', "/");
    let normalized = normalized.trim_end_matches('/');

    if normalized.is_empty() {
        return Err(ForgeError::Config(
            "Illegal dist dir: empty path".to_string(),
        ));
    }

    let root = lexical_normalize(project_root);
    let resolved = if Path::new(normalized).is_absolute() {
        lexical_normalize(Path::new(normalized))
    } else {
        lexical_normalize(&root.join(normalized))
    };

    if !resolved.starts_with(&root) {
        return Err(ForgeError::Config(format!(
            "dist dir \"{}\" must be within the project root",
            dist_dir
        )));
    }
    if resolved == root {
        return Err(ForgeError::Config(
            "dist dir cannot be the project root".to_string(),
        ));
    }

    let first = normalized.split('/').next().unwrap_or_default();
    if SOURCE_DIR_NAMES.contains(&first) {
        return Err(ForgeError::Config(format!(
            "Illegal dist dir: conflict with source files inside \"{}\"",
            first
        )));
    }

    let host_dir = host_build_dir.unwrap_or(HOST_BUILD_DIR);
    if normalized == host_dir || normalized == HOST_BUILD_DIR {
        return Err(ForgeError::Config(format!(
            "Illegal dist dir: conflict with host build directory \"{}\"",
            host_dir
        )));
    }

    Ok(resolved)
}

/// Lexically resolves `.` and `..` components without touching the
/// filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Derives the sanitized base configuration from the host configuration.
fn sanitize_config(host: HostBuildConfig, dist_dir: &Path) -> CompilerConfig {
    let raw = CompilerConfig {
        entry: Default::default(),
        target: CompileTarget::Node,
        externals: NODE_EXTERNALS.iter().map(|s| s.to_string()).collect(),
        resolve: host.resolve,
        optimization: Optimization {
            runtime_chunk: true,
            split_chunks: Vec::new(),
            host: host.optimization,
        },
        output: OutputOptions {
            dir: dist_dir.to_path_buf(),
            module_format: ModuleFormat::CommonJs,
        },
        plugins: host.plugins,
    };

    // The user transform sees the host-derived configuration first; the
    // orchestrator's own directives win afterwards.
    let transformed = match &host.transform {
        Some(transform) => transform(raw),
        None => raw,
    };

    let mut plugins: Vec<CompilerPlugin> = transformed
        .plugins
        .iter()
        .filter(|p| !PLUGIN_DENYLIST.contains(&p.name.as_str()) && p.name != TRACE_PLUGIN_NAME)
        .cloned()
        .collect();

    if let Some(trace) = transformed
        .plugins
        .iter()
        .find(|p| p.name == TRACE_PLUGIN_NAME)
    {
        let mut options = match &trace.options {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        options.insert(
            "output_root".to_string(),
            json!(dist_dir.display().to_string()),
        );
        plugins.push(CompilerPlugin::new(TRACE_PLUGIN_NAME, Value::Object(options)));
    }

    CompilerConfig {
        entry: Default::default(),
        target: CompileTarget::Node,
        externals: NODE_EXTERNALS.iter().map(|s| s.to_string()).collect(),
        resolve: transformed.resolve,
        optimization: Optimization {
            runtime_chunk: false,
            split_chunks: vec![
                ChunkGroup {
                    name: "command-modules".to_string(),
                    priority: 0,
                    test: None,
                    enforce: true,
                    reuse_existing_chunk: false,
                },
                ChunkGroup {
                    name: "vendors".to_string(),
                    priority: 1,
                    test: Some("node_modules".to_string()),
                    enforce: false,
                    reuse_existing_chunk: true,
                },
            ],
            host: transformed.optimization.host,
        },
        output: OutputOptions {
            dir: dist_dir.to_path_buf(),
            module_format: ModuleFormat::CommonJs,
        },
        plugins,
    }
}
