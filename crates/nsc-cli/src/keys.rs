//! # Keys Subcommand
//!
//! `keys migrate` moves seed files written by older releases into the
//! role-sharded layout. It is the one command the key-store gate lets
//! through.

use anyhow::Result;
use clap::{Args, Subcommand};
use nsc_crypto::KeyMaterialStore;

use crate::context::Context;
use crate::print_lines;

/// Arguments for `nsc keys`.
#[derive(Args, Debug)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommand,
}

/// Keys subcommands.
#[derive(Subcommand, Debug)]
pub enum KeysCommand {
    /// Move legacy seed files into the current layout.
    Migrate,
}

/// Dispatch `nsc keys`.
pub fn run_keys(args: &KeysArgs, ctx: &Context) -> Result<u8> {
    match args.command {
        KeysCommand::Migrate => {
            let report = ctx.keys.migrate()?;
            let mut lines: Vec<String> = report
                .migrated
                .iter()
                .map(|id| format!("migrated key {}", id.short()))
                .collect();
            lines.extend(report.skipped.iter().map(|p| format!("skipped unreadable {}", p.display())));
            lines.push(format!(
                "keystore {:?}: {} migrated, {} skipped",
                ctx.keys.location(),
                report.migrated.len(),
                report.skipped.len()
            ));
            print_lines(&lines);
            Ok(if report.skipped.is_empty() { 0 } else { 1 })
        }
    }
}
