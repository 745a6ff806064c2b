//! Environment-backed configuration.
//!
//! All values are resolved once, at process start, and treated as read-only
//! afterwards. `.env` files are honored via `dotenvy`.

use std::env;
use std::path::PathBuf;

/// Default location of compiled command artifacts, relative to the project
/// root.
pub const DEFAULT_DIST_DIR: &str = "dist/command-modules";

/// Name of the directory holding command sources, under the project root.
pub const COMMANDS_DIR_NAME: &str = "commands";

/// Runtime and build configuration for Slashforge.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root. Everything else resolves against this.
    pub project_root: PathBuf,

    /// Compiled-output directory, relative to the project root. Validated by
    /// the build orchestrator before any filesystem access.
    pub dist_dir: String,

    /// Whether to PUT the command set to Discord after a one-shot build.
    pub post_commands: bool,

    /// Bot token used for REST authentication.
    pub bot_token: String,

    /// Application public key used for request signature verification.
    pub public_key: String,

    /// Application client id, used for registration and webhook endpoints.
    pub client_id: String,
}

impl Config {
    /// Loads configuration from the environment, with defaults for
    /// everything except credentials.
    ///
    /// Recognized variables: `SLASHFORGE_DIST_DIR`, `SLASHFORGE_POST_COMMANDS`
    /// (`1`/`true`), `DISCORD_BOT_TOKEN`, `DISCORD_PUBLIC_KEY`,
    /// `DISCORD_CLIENT_ID`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let project_root = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        Self {
            project_root,
            dist_dir: env::var("SLASHFORGE_DIST_DIR")
                .unwrap_or_else(|_| DEFAULT_DIST_DIR.to_string()),
            post_commands: env::var("SLASHFORGE_POST_COMMANDS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            bot_token: env::var("DISCORD_BOT_TOKEN").unwrap_or_default(),
            public_key: env::var("DISCORD_PUBLIC_KEY").unwrap_or_default(),
            client_id: env::var("DISCORD_CLIENT_ID").unwrap_or_default(),
        }
    }

    /// The command source directory (`<project_root>/commands`).
    pub fn commands_dir(&self) -> PathBuf {
        self.project_root.join(COMMANDS_DIR_NAME)
    }

    /// The compiled-output directory resolved against the project root.
    pub fn dist_path(&self) -> PathBuf {
        self.project_root.join(&self.dist_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            dist_dir: DEFAULT_DIST_DIR.to_string(),
            post_commands: false,
            bot_token: String::new(),
            public_key: String::new(),
            client_id: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dist_dir, DEFAULT_DIST_DIR);
        assert!(!config.post_commands);
        assert!(config.bot_token.is_empty());
    }

    #[test]
    fn test_paths_resolve_against_root() {
        let config = Config {
            project_root: PathBuf::from("/srv/bot"),
            ..Config::default()
        };
        assert_eq!(config.commands_dir(), PathBuf::from("/srv/bot/commands"));
        assert_eq!(
            config.dist_path(),
            PathBuf::from("/srv/bot").join(DEFAULT_DIST_DIR)
        );
    }
}
