use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use slashforge::api::DiscordApi;
use slashforge::build::{BuildMode, BuildOrchestrator, HostBuildConfig, ManifestCompiler};
use slashforge::command::{CommandTree, HandlerRegistry, ModuleLoader};
use slashforge::Config;

#[derive(Parser)]
#[command(name = "slashforge")]
#[command(about = "File-routed slash commands for Discord interactions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the command tree once
    Build {
        /// Register the compiled commands with Discord afterwards
        #[arg(long)]
        register: bool,
    },
    /// Watch the command tree and recompile on changes
    Watch,
    /// Register previously compiled commands with Discord
    Register,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Some(Commands::Version) | None => {
            println!("slashforge {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Build { register }) => {
            let orchestrator = BuildOrchestrator::new(
                BuildMode::OneShot,
                &config,
                HostBuildConfig::default(),
                Arc::new(ManifestCompiler),
            )?;
            orchestrator.run().await?;

            if register || config.post_commands {
                register_commands(&config).await?;
            }
        }
        Some(Commands::Watch) => {
            let orchestrator = BuildOrchestrator::new(
                BuildMode::Watch,
                &config,
                HostBuildConfig::default(),
                Arc::new(ManifestCompiler),
            )?;
            let task = orchestrator.run().await?;

            println!(
                "Watching {} (press Ctrl+C to stop)",
                config.commands_dir().display()
            );
            tokio::signal::ctrl_c().await?;

            if let Some(task) = task {
                task.close();
            }
        }
        Some(Commands::Register) => {
            register_commands(&config).await?;
        }
    }

    Ok(())
}

/// Loads the compiled tree and bulk-registers it with Discord.
async fn register_commands(config: &Config) -> anyhow::Result<()> {
    let loader = ModuleLoader::new(Arc::new(HandlerRegistry::new()));
    let tree = CommandTree::load_all(&loader, &config.dist_path()).await?;
    let payload = tree.export_payload();

    let api = DiscordApi::new(config.bot_token.clone(), config.client_id.clone());
    api.register_commands(&payload).await?;

    println!("Registered {} commands", payload.len());
    Ok(())
}
