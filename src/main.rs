use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use tmodman::{
    commands::{
        self,
        config::{Config, Settings},
    },
    package::DEFAULT_APP_ID,
    prompt::{AssumeYes, StdinPrompt},
    session::SessionOptions,
};

/// tmodman - tModLoader mod manager
///
/// Enable and disable the Workshop mods of a dockerized tModLoader server.
/// Dependencies are looked up on the Steam Workshop and offered for enabling
/// together with the mods that need them; the result is written to the
/// TMOD_ENABLEDMODS line of the server's docker-compose.yml.
///
/// Examples:
///   tmodman --host game.example.com --root /srv/tmod list
///   tmodman --local enable CalamityMod
///   tmodman disable "Magic Storage" --dry-run
#[derive(Parser, Debug)]
#[command(author, version = env!("TMODMAN_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server host to manage over SSH (also via TMODMAN_HOST)
    #[arg(long, env = "TMODMAN_HOST", global = true, conflicts_with = "local")]
    host: Option<String>,

    /// SSH user (also via TMODMAN_USER)
    #[arg(long, short = 'u', env = "TMODMAN_USER", global = true)]
    user: Option<String>,

    /// SSH port (also via TMODMAN_PORT)
    #[arg(long, short = 'p', env = "TMODMAN_PORT", global = true)]
    port: Option<u16>,

    /// SSH identity file (also via TMODMAN_IDENTITY)
    #[arg(long, short = 'i', env = "TMODMAN_IDENTITY", value_name = "PATH", global = true)]
    identity: Option<PathBuf>,

    /// Manage a server on this machine instead of over SSH
    #[arg(long, global = true)]
    local: bool,

    /// Server directory holding docker-compose.yml and enabled.json (also via TMODMAN_ROOT)
    #[arg(
        long,
        short = 'r',
        env = "TMODMAN_ROOT",
        value_name = "PATH",
        default_value = ".",
        global = true
    )]
    root: String,

    /// Directory searched for .tmod files (defaults to --root)
    #[arg(long, value_name = "PATH", global = true)]
    mods_root: Option<String>,

    /// Steam app id the Workshop mods belong to
    #[arg(long, default_value = DEFAULT_APP_ID, global = true)]
    app_id: String,

    /// Steam Community URL (defaults to https://steamcommunity.com)
    #[arg(long, value_name = "URL", env = "TMODMAN_WORKSHOP_URL", global = true)]
    workshop_url: Option<String>,

    /// Seconds to wait for one Workshop page
    #[arg(long, value_name = "SECS", default_value_t = 15, global = true)]
    fetch_timeout: u64,

    /// Seconds to wait for one remote command
    #[arg(long, value_name = "SECS", default_value_t = 60, global = true)]
    command_timeout: u64,

    /// Workshop lookups run in parallel
    #[arg(long, short = 'j', default_value_t = 4, global = true)]
    concurrency: usize,

    /// Use sudo to replace docker-compose.yml
    #[arg(long, global = true)]
    sudo: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List installed mods, their state and dependencies
    List(ListArgs),

    /// Enable mods, together with their dependencies
    Enable(EnableArgs),

    /// Disable mods
    Disable(DisableArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct EnableArgs {
    /// Mods to enable, by file name or Workshop title
    #[arg(value_name = "MOD", required = true)]
    pub names: Vec<String>,

    /// Enable dependencies without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Print the resulting docker-compose.yml instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug)]
pub struct DisableArgs {
    /// Mods to disable, by file name or Workshop title
    #[arg(value_name = "MOD", required = true)]
    pub names: Vec<String>,

    /// Print the resulting docker-compose.yml instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            host: self.host.clone(),
            user: self.user.clone(),
            port: self.port,
            identity: self.identity.clone(),
            local: self.local,
            workshop_url: self.workshop_url.clone(),
            fetch_timeout: Duration::from_secs(self.fetch_timeout),
            command_timeout: Duration::from_secs(self.command_timeout),
            session: SessionOptions {
                root: self.root.clone(),
                mods_root: self.mods_root.clone(),
                app_id: self.app_id.clone(),
                concurrency: self.concurrency.max(1),
                use_sudo: self.sudo,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::new(cli.settings())?;

    match cli.command {
        Commands::List(args) => commands::list(config, args.json).await?,
        Commands::Enable(args) if args.yes => {
            commands::enable(config, &args.names, &AssumeYes, args.dry_run).await?
        }
        Commands::Enable(args) => {
            commands::enable(config, &args.names, &StdinPrompt, args.dry_run).await?
        }
        Commands::Disable(args) => commands::disable(config, &args.names, args.dry_run).await?,
    }
    Ok(())
}
