//! Command descriptors, loading, and the in-memory command tree.
//!
//! # Architecture
//!
//! - **module**: artifact-level types with the `kind` role discriminant
//! - **builder**: runtime descriptors (`RootCommand`, `SubCommand`) and
//!   their registration projection
//! - **handler**: the `CommandHandler` trait and path-keyed registry
//! - **loader**: artifact loading with role validation and a content-hash
//!   parse cache
//! - **tree**: bulk assembly (`load_all`) and single-branch resolution
//!   (`load_path`)

pub mod builder;
pub mod handler;
pub mod loader;
pub mod module;
pub mod tree;

pub use builder::{RootCommand, SubCommand};
pub use handler::{CommandHandler, HandlerRegistry};
pub use loader::{ModuleLoader, ARTIFACT_FILE_NAME};
pub use module::{CommandModule, CommandRole, RootModule, SubModule};
pub use tree::{CommandTree, ResolvedChain};
