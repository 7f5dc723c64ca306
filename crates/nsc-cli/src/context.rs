//! # Invocation Context
//!
//! The resolved configuration plus the stores it points at, and the single
//! version-gate evaluation every command goes through.

use anyhow::{anyhow, Context as _, Result};
use nsc_crypto::{FsKeyStore, KeyMaterialStore};
use nsc_state::{
    CommandPath, CredentialStore, FsCredentialStore, KeystoreStatus, StoreStatus, VersionGate,
};

use crate::config::CliConfig;

/// Program name used in remediation messages.
pub const PROGRAM: &str = "nsc";

/// Commands that still run when the store's operator claim cannot be read.
const UNREADABLE_STORE_COMMANDS: [&str; 4] = ["env", "help", "upgrade-jwt", "operator"];

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalFlags {
    /// `-K`: explicit signing key reference.
    pub private_key: Option<String>,
    /// `-i`: ask for values interactively.
    pub interactive: bool,
}

/// Everything a command handler needs.
#[derive(Debug)]
pub struct Context {
    /// Resolved configuration.
    pub config: CliConfig,
    /// Global flags.
    pub flags: GlobalFlags,
    /// The key store.
    pub keys: FsKeyStore,
}

impl Context {
    /// Build the context for one invocation.
    pub fn new(config: CliConfig, flags: GlobalFlags) -> Self {
        let keys = FsKeyStore::new(config.keystore_dir.clone());
        Self { config, flags, keys }
    }

    /// The current operator's store.
    pub fn open_store(&self) -> Result<FsCredentialStore> {
        let operator = self
            .config
            .operator
            .as_deref()
            .ok_or_else(|| anyhow!("no operator selected - use --operator or set {}", crate::config::ENV_OPERATOR))?;
        self.open_named(operator)
    }

    /// The store for `operator`.
    pub fn open_named(&self, operator: &str) -> Result<FsCredentialStore> {
        FsCredentialStore::open(&self.config.store_root, operator)
            .with_context(|| format!("opening store {operator:?}"))
    }

    /// Status of the current store, or `None` when there is no readable
    /// store to check.
    pub fn store_status(&self) -> Option<StoreStatus> {
        match self.read_store_status() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "cannot read store version");
                None
            }
        }
    }

    /// Status of the current store. `Ok(None)` when no store is selected or
    /// it does not exist yet; an error when its operator claim is unreadable.
    fn read_store_status(&self) -> Result<Option<StoreStatus>> {
        let Ok(store) = self.open_store() else {
            return Ok(None);
        };
        if !store.exists() {
            return Ok(None);
        }
        let version = store
            .format_version()
            .with_context(|| format!("cannot read the operator of store {:?}", store.store_name()))?;
        Ok(Some(StoreStatus {
            name: store.store_name().to_string(),
            version: version.into(),
        }))
    }

    /// Whether the key store must be migrated before use.
    pub fn keystore_status(&self) -> Result<KeystoreStatus> {
        Ok(KeystoreStatus {
            location: self.keys.location(),
            needs_migration: self.keys.needs_migration()?,
        })
    }

    /// Evaluate the version gate for `command`.
    pub fn check_gate(&self, command: &CommandPath) -> Result<()> {
        let store = match self.read_store_status() {
            Ok(status) => status,
            Err(e) if UNREADABLE_STORE_COMMANDS.contains(&command.leaf()) => {
                tracing::warn!(command = %command, error = %format!("{e:#}"), "store version unknown");
                None
            }
            Err(e) => return Err(e),
        };
        let keys = self.keystore_status()?;
        VersionGate::new(PROGRAM)
            .check_allowed(command, store.as_ref(), &keys)
            .into_result()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsc_crypto::KeyPair;
    use nsc_core::KeyRole;
    use nsc_edit::{AddOperatorOptions, Provisioner};
    use nsc_state::ClaimPath;
    use std::path::Path;

    fn config(root: &Path) -> CliConfig {
        CliConfig {
            config_dir: root.join("nsc"),
            store_root: root.join("stores"),
            keystore_dir: root.join("keys"),
            operator: Some("O".into()),
            account: None,
        }
    }

    #[test]
    fn missing_store_passes_gate() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(config(dir.path()), GlobalFlags::default());
        assert!(ctx.store_status().is_none());
        ctx.check_gate(&CommandPath::new(["edit", "user"])).unwrap();
    }

    #[test]
    fn unreadable_operator_blocks_all_but_repair_commands() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(config(dir.path()), GlobalFlags::default());
        let store = ctx.open_store().unwrap();
        Provisioner::new(&store, &ctx.keys)
            .add_operator(&AddOperatorOptions::default())
            .unwrap();
        std::fs::write(store.file_for(&ClaimPath::Operator), "not a token").unwrap();

        assert!(ctx.store_status().is_none());
        let err = ctx.check_gate(&CommandPath::new(["edit", "user"])).unwrap_err();
        assert!(format!("{err:#}").contains("cannot read the operator"));
        ctx.check_gate(&CommandPath::new(["env"])).unwrap();
        ctx.check_gate(&CommandPath::new(["add", "operator"])).unwrap();
    }

    #[test]
    fn legacy_key_files_block_all_but_migrate() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(config(dir.path()), GlobalFlags::default());
        let kp = KeyPair::generate(KeyRole::User);
        std::fs::create_dir_all(dir.path().join("keys/old")).unwrap();
        std::fs::write(dir.path().join("keys/old/u.nk"), kp.seed().as_bytes()).unwrap();

        let err = ctx.check_gate(&CommandPath::new(["edit", "user"])).unwrap_err();
        assert!(err.to_string().contains("needs migration"));
        ctx.check_gate(&CommandPath::new(["keys", "migrate"])).unwrap();
    }

    #[test]
    fn no_operator_is_an_error_when_opening() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.operator = None;
        let ctx = Context::new(cfg, GlobalFlags::default());
        assert!(ctx.open_store().is_err());
    }
}
