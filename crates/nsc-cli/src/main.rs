//! # nsc CLI entry point
//!
//! Parses arguments, resolves configuration, runs the version gate and
//! dispatches to the subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nsc_cli::add::{run_add, AddArgs, AddCommand};
use nsc_cli::config::{CliConfig, ConfigOverrides};
use nsc_cli::context::{Context, GlobalFlags};
use nsc_cli::describe::{run_describe, DescribeArgs, DescribeCommand};
use nsc_cli::edit::{run_edit, EditArgs, EditCommand};
use nsc_cli::env::run_env;
use nsc_cli::keys::{run_keys, KeysArgs, KeysCommand};
use nsc_cli::upgrade::run_upgrade_jwt;
use nsc_state::CommandPath;

/// Manage operator, account and user credentials.
#[derive(Parser, Debug)]
#[command(name = "nsc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding nsc.json.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Directory holding the credential stores.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Key store directory.
    #[arg(long, global = true)]
    keystore_dir: Option<PathBuf>,

    /// Operator whose store to use.
    #[arg(long, global = true)]
    operator: Option<String>,

    /// Signing key: a seed, a public key, a seed file, or `account`.
    #[arg(short = 'K', long = "private-key", global = true)]
    private_key: Option<String>,

    /// Ask for values interactively.
    #[arg(short, long, global = true)]
    interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create operators, accounts and users.
    Add(AddArgs),

    /// Edit users and accounts.
    Edit(EditArgs),

    /// Show claims.
    Describe(DescribeArgs),

    /// Manage the key store.
    Keys(KeysArgs),

    /// Upgrade a v1 store to the current format.
    #[command(name = "upgrade-jwt")]
    UpgradeJwt,

    /// Show the resolved environment.
    Env,
}

impl Commands {
    fn path(&self) -> CommandPath {
        match self {
            Self::Add(a) => match a.command {
                AddCommand::Operator(_) => CommandPath::new(["add", "operator"]),
                AddCommand::Account(_) => CommandPath::new(["add", "account"]),
                AddCommand::User(_) => CommandPath::new(["add", "user"]),
            },
            Self::Edit(e) => match e.command {
                EditCommand::User(_) => CommandPath::new(["edit", "user"]),
                EditCommand::Account(_) => CommandPath::new(["edit", "account"]),
            },
            Self::Describe(d) => match d.command {
                DescribeCommand::User { .. } => CommandPath::new(["describe", "user"]),
            },
            Self::Keys(k) => match k.command {
                KeysCommand::Migrate => CommandPath::new(["keys", "migrate"]),
            },
            Self::UpgradeJwt => CommandPath::new(["upgrade-jwt"]),
            Self::Env => CommandPath::new(["env"]),
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let overrides = ConfigOverrides {
        config_dir: cli.config_dir,
        data_dir: cli.data_dir,
        keystore_dir: cli.keystore_dir,
        operator: cli.operator,
    };
    let config = CliConfig::resolve(&overrides)?;
    let flags = GlobalFlags {
        private_key: cli.private_key,
        interactive: cli.interactive,
    };
    let ctx = Context::new(config, flags);

    let path = cli.command.path();
    tracing::debug!(command = %path, "checking version gate");
    ctx.check_gate(&path)?;

    match &cli.command {
        Commands::Add(args) => run_add(args, &ctx),
        Commands::Edit(args) => run_edit(args, &ctx),
        Commands::Describe(args) => run_describe(args, &ctx),
        Commands::Keys(args) => run_keys(args, &ctx),
        Commands::UpgradeJwt => run_upgrade_jwt(&ctx),
        Commands::Env => run_env(&ctx),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
