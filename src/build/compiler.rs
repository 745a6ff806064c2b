//! The compiler boundary.
//!
//! The build orchestrator treats compilation as a black box: it hands over a
//! [`CompilerConfig`] whose `entry` maps logical command paths to source
//! files and receives either stats-with-diagnostics or a failure carrying
//! the full diagnostic output. [`ManifestCompiler`] is the default
//! implementation: it parses JSON5 command manifests, validates them, and
//! emits canonical JSON artifacts mirroring the entry layout.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::entry::{artifact_path, BuildEntryMap};
use crate::command::module::CommandModule;
use crate::error::{ForgeError, Result};

/// A named plugin instance carried by the host build configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerPlugin {
    pub name: String,
    pub options: Value,
}

impl CompilerPlugin {
    pub fn new(name: impl Into<String>, options: Value) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

/// Compilation target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileTarget {
    Node,
}

/// Emitted module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    CommonJs,
}

/// A named cache group for chunk splitting.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkGroup {
    pub name: String,
    pub priority: i32,
    pub test: Option<String>,
    pub enforce: bool,
    pub reuse_existing_chunk: bool,
}

/// Optimization directives. `runtime_chunk` and `split_chunks` are forced by
/// the orchestrator; `host` carries any host-supplied optimization options
/// merged beneath the forced directives.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Optimization {
    pub runtime_chunk: bool,
    pub split_chunks: Vec<ChunkGroup>,
    pub host: Option<Value>,
}

/// Output location and format.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    pub dir: PathBuf,
    pub module_format: ModuleFormat,
}

/// The full configuration handed to a compiler invocation.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub entry: BuildEntryMap,
    pub target: CompileTarget,
    pub externals: Vec<String>,
    pub resolve: Option<Value>,
    pub optimization: Optimization,
    pub output: OutputOptions,
    pub plugins: Vec<CompilerPlugin>,
}

/// Result of a successful compilation pass.
#[derive(Debug, Clone, Default)]
pub struct CompileStats {
    /// Artifacts written by this pass.
    pub emitted: Vec<PathBuf>,
    /// Human-readable diagnostic output.
    pub diagnostics: String,
}

/// Black-box compilation engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Runs one compilation pass. Any error, or an unsuccessful result,
    /// is returned as `ForgeError::Build` with full diagnostics.
    async fn compile(&self, config: &CompilerConfig) -> Result<CompileStats>;
}

/// Default compiler: JSON5 command manifests in, canonical JSON artifacts
/// out.
#[derive(Debug, Default)]
pub struct ManifestCompiler;

#[async_trait]
impl Compiler for ManifestCompiler {
    async fn compile(&self, config: &CompilerConfig) -> Result<CompileStats> {
        // Parse and validate every entry before writing anything, so a
        // failing pass leaves previous artifacts untouched.
        let mut compiled = Vec::new();
        let mut errors = Vec::new();

        for (key, source) in &config.entry {
            match compile_entry(config, key, source).await {
                Ok(unit) => compiled.push(unit),
                Err(e) => errors.push(format!("  {}: {}", key, e)),
            }
        }

        if !errors.is_empty() {
            return Err(ForgeError::Build(format!(
                "{} of {} command modules failed to compile:\n{}",
                errors.len(),
                config.entry.len(),
                errors.join("\n")
            )));
        }

        let mut emitted = Vec::new();
        let mut lines = Vec::new();
        for unit in compiled {
            if let Some(parent) = unit.artifact.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&unit.artifact, unit.contents).await?;
            debug!(key = %unit.key, artifact = %unit.artifact.display(), "Emitted command artifact");
            lines.push(format!("  {} -> {}", unit.key, unit.artifact.display()));
            emitted.push(unit.artifact);
        }

        Ok(CompileStats {
            emitted,
            diagnostics: format!(
                "compiled {} command modules\n{}",
                config.entry.len(),
                lines.join("\n")
            ),
        })
    }
}

/// A validated entry, ready to write.
struct CompiledUnit {
    key: String,
    artifact: PathBuf,
    contents: String,
}

async fn compile_entry(config: &CompilerConfig, key: &str, source: &Path) -> Result<CompiledUnit> {
    let raw = tokio::fs::read_to_string(source)
        .await
        .map_err(|e| ForgeError::Build(format!("cannot read \"{}\": {}", source.display(), e)))?;

    let module: CommandModule = json5::from_str(&raw)
        .map_err(|e| ForgeError::Build(format!("invalid command manifest: {}", e)))?;

    // The command name is the directory holding the manifest.
    let name = key.rsplit('/').nth(1).unwrap_or(key);
    module.validate(name)?;

    Ok(CompiledUnit {
        key: key.to_string(),
        artifact: artifact_path(&config.output.dir, key),
        contents: serde_json::to_string_pretty(&module)?,
    })
}
