//! # Upgrade-JWT Subcommand
//!
//! Rewrites a v1 store's operator claim at the current format version.
//! Allowed through the gate on v1 stores.

use anyhow::Result;
use nsc_edit::Provisioner;

use crate::context::Context;
use crate::print_lines;

/// Run `nsc upgrade-jwt`.
pub fn run_upgrade_jwt(ctx: &Context) -> Result<u8> {
    let store = ctx.open_store()?;
    let log = Provisioner::new(&store, &ctx.keys).upgrade_jwt()?;
    print_lines(log.lines());
    Ok(0)
}
