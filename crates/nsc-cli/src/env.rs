//! # Env Subcommand
//!
//! Shows where configuration, stores and keys live and what the gate
//! would see.

use anyhow::Result;

use crate::context::Context;

/// Render the environment table.
pub fn render_env(ctx: &Context) -> Result<Vec<String>> {
    let cfg = &ctx.config;
    let store = ctx
        .store_status()
        .map(|s| format!("{} ({})", s.name, s.version))
        .unwrap_or_else(|| "none".to_string());
    let keys = ctx.keystore_status()?;

    let rows = [
        ("config dir", cfg.config_dir.display().to_string()),
        ("store root", cfg.store_root.display().to_string()),
        ("keystore", keys.location),
        ("keystore needs migration", keys.needs_migration.to_string()),
        ("operator", cfg.operator.clone().unwrap_or_else(|| "-".to_string())),
        ("account", cfg.account.clone().unwrap_or_else(|| "-".to_string())),
        ("store", store),
    ];
    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    Ok(rows
        .into_iter()
        .map(|(k, v)| format!("{k:<width$}  {v}"))
        .collect())
}

/// Run `nsc env`.
pub fn run_env(ctx: &Context) -> Result<u8> {
    for line in render_env(ctx)? {
        println!("{line}");
    }
    Ok(0)
}
