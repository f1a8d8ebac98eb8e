//! nudge - chat in the terminal while the scheduler speaks up on its own.

mod commands;
mod session;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use nudge_core::config::{ConfigFormat, GeneratorProvider, NudgeConfig};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "nudge", version, about = "Proactive assistant messages in your terminal")]
struct Cli {
    /// Config file (TOML, JSON or YAML). Defaults to the user config dir.
    #[arg(long, short, global = true, env = "NUDGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a chat session with the scheduler running.
    Run(RunArgs),
    /// Manage the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Generation provider, overriding the config file.
    #[arg(long)]
    provider: Option<GeneratorProvider>,

    /// Model name, overriding the config file.
    #[arg(long)]
    model: Option<String>,

    /// Log as JSON lines on stderr.
    #[arg(long)]
    log_json: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Write the default configuration.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration (file plus environment).
    Show,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::WARN.into())
        .from_env_lossy()
        .add_directive("nudge=info".parse().unwrap_or_else(|_| Level::INFO.into()));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// File settings (if the file exists) with `NUDGE_*` overrides on top.
fn load_config(path: &Path) -> Result<NudgeConfig> {
    let config = if path.exists() {
        NudgeConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
    } else {
        NudgeConfig::default()
    };
    Ok(config.with_env_overrides())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(NudgeConfig::default_path);

    match cli.command {
        Command::Run(args) => {
            init_tracing(args.log_json);
            let mut config = load_config(&path)?;
            if let Some(provider) = args.provider {
                config.provider.provider = provider;
            }
            if let Some(model) = args.model {
                config.provider.model = model;
            }
            session::run(config, path).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init { force } => {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                NudgeConfig::default().save_to_file(&path)?;
                println!("Wrote {}", path.display());
                Ok(())
            }
            ConfigAction::Show => {
                let config = load_config(&path)?;
                let format = ConfigFormat::from_path(&path).unwrap_or(ConfigFormat::Toml);
                print!("{}", format.render(&config)?);
                Ok(())
            }
        },
    }
}
