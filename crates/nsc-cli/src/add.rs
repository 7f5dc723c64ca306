//! # Add Subcommand
//!
//! Creates operators, accounts and users. `add operator` also makes the new
//! operator current; `add account` makes the new account the default.

use anyhow::Result;
use clap::{Args, Subcommand};
use nsc_edit::{AddOperatorOptions, AddUserOptions, Provisioner};

use crate::context::Context;
use crate::edit::PermissionArgs;
use crate::print_lines;

/// Arguments for `nsc add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(subcommand)]
    pub command: AddCommand,
}

/// Add subcommands.
#[derive(Subcommand, Debug)]
pub enum AddCommand {
    /// Create an operator and its store.
    Operator(AddOperatorArgs),
    /// Create an account under the current operator.
    Account(AddAccountArgs),
    /// Create a user in an account.
    User(AddUserArgs),
}

/// Arguments for `nsc add operator`.
#[derive(Args, Debug, Clone)]
pub struct AddOperatorArgs {
    /// Operator name.
    #[arg(short = 'n', long)]
    pub name: String,

    /// Replace an existing operator of the same name.
    #[arg(long)]
    pub force: bool,

    /// Account server URL.
    #[arg(short = 'u', long = "account-jwt-server-url")]
    pub account_server_url: Option<String>,

    /// Store format version to write.
    #[arg(long, hide = true)]
    pub jwt_version: Option<u32>,
}

/// Arguments for `nsc add account`.
#[derive(Args, Debug, Clone)]
pub struct AddAccountArgs {
    /// Account name.
    #[arg(short = 'n', long)]
    pub name: String,
}

/// Arguments for `nsc add user`.
#[derive(Args, Debug, Clone)]
pub struct AddUserArgs {
    /// User name.
    #[arg(short = 'n', long)]
    pub name: String,

    /// Account to add the user to.
    #[arg(short = 'a', long)]
    pub account: Option<String>,

    #[command(flatten)]
    pub permissions: PermissionArgs,
}

impl AddUserArgs {
    /// Provisioning options for these flags.
    pub fn to_options(&self, private_key: Option<&str>) -> AddUserOptions {
        AddUserOptions {
            account: self.account.clone(),
            name: self.name.clone(),
            signing_key: private_key.map(str::to_string),
            ops: self.permissions.to_ops(),
        }
    }
}

/// Dispatch `nsc add`.
pub fn run_add(args: &AddArgs, ctx: &Context) -> Result<u8> {
    match &args.command {
        AddCommand::Operator(op) => cmd_add_operator(op, ctx),
        AddCommand::Account(acc) => cmd_add_account(acc, ctx),
        AddCommand::User(user) => cmd_add_user(user, ctx),
    }
}

fn cmd_add_operator(args: &AddOperatorArgs, ctx: &Context) -> Result<u8> {
    let store = ctx.open_named(&args.name)?;
    let opts = AddOperatorOptions {
        version: args.jwt_version,
        account_server_url: args.account_server_url.clone(),
        force: args.force,
    };
    let log = Provisioner::new(&store, &ctx.keys).add_operator(&opts)?;
    ctx.config.remember(Some(&args.name), None)?;
    print_lines(log.lines());
    Ok(0)
}

fn cmd_add_account(args: &AddAccountArgs, ctx: &Context) -> Result<u8> {
    let store = ctx.open_store()?;
    let log = Provisioner::new(&store, &ctx.keys).add_account(&args.name)?;
    ctx.config.remember(None, Some(&args.name))?;
    print_lines(log.lines());
    Ok(0)
}

fn cmd_add_user(args: &AddUserArgs, ctx: &Context) -> Result<u8> {
    let store = ctx.open_store()?;
    let log = Provisioner::new(&store, &ctx.keys)
        .with_default_account(ctx.config.account.clone())
        .add_user(&args.to_options(ctx.flags.private_key.as_deref()))?;
    print_lines(log.lines());
    Ok(0)
}
