//! Build-time pipeline: discovery, entry maps, compilation, watching.
//!
//! # Architecture
//!
//! - **entry**: logical path keys and the source → artifact mirror
//! - **compiler**: the black-box compiler boundary and the default
//!   JSON5-manifest implementation
//! - **watcher**: `notify`-backed add/change/remove event stream
//! - **orchestrator**: dist-dir validation, config sanitization, one-shot
//!   and watch modes, orphan pruning

pub mod compiler;
pub mod entry;
pub mod orchestrator;
pub mod watcher;

pub use compiler::{
    CompileStats, CompileTarget, Compiler, CompilerConfig, CompilerPlugin, ManifestCompiler,
    ModuleFormat, Optimization, OutputOptions,
};
pub use entry::{artifact_path, build_entry_map, entry_key, BuildEntryMap};
pub use orchestrator::{BuildMode, BuildOrchestrator, HostBuildConfig, WatchTask};
pub use watcher::{watch_dir, FsWatcher, WatchEvent};
