//! # Describe Subcommand
//!
//! Prints a verified user claim as pretty JSON on stdout.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use nsc_edit::Provisioner;

use crate::context::Context;

/// Arguments for `nsc describe`.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    #[command(subcommand)]
    pub command: DescribeCommand,
}

/// Describe subcommands.
#[derive(Subcommand, Debug)]
pub enum DescribeCommand {
    /// Show a user claim.
    User {
        /// User name; may be omitted when the account has one user.
        #[arg(short = 'n', long)]
        name: Option<String>,
        /// Account name.
        #[arg(short = 'a', long)]
        account: Option<String>,
    },
}

/// Dispatch `nsc describe`.
pub fn run_describe(args: &DescribeArgs, ctx: &Context) -> Result<u8> {
    match &args.command {
        DescribeCommand::User { name, account } => {
            let store = ctx.open_store()?;
            let claim = Provisioner::new(&store, &ctx.keys)
                .with_default_account(ctx.config.account.clone())
                .describe_user(account.as_deref(), name.as_deref())?;
            let json = serde_json::to_string_pretty(&claim).context("rendering claim")?;
            println!("{json}");
            Ok(0)
        }
    }
}
