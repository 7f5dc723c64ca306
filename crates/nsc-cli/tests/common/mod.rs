//! Shared fixture for the CLI integration tests: one operator store and a
//! key store in a temporary directory, plus a flag parser for `edit user`.

#![allow(dead_code)]

use clap::Parser;
use nsc_claims::{Claim, UserPayload};
use nsc_cli::config::CliConfig;
use nsc_cli::context::{Context, GlobalFlags};
use nsc_cli::edit::EditUserArgs;
use nsc_core::KeyRole;
use nsc_crypto::{FsKeyStore, KeyMaterialStore, KeyPair};
use nsc_edit::{
    AddOperatorOptions, AddUserOptions, EditAccountOptions, EditError, EditOp, EditOrchestrator,
    EditReport, PromptValue, Provisioner, ScriptedPrompt,
};
use nsc_state::{CredentialStore, FsCredentialStore};
use tempfile::TempDir;

#[derive(Parser, Debug)]
struct EditUserCli {
    #[arg(short = 'K', long = "private-key")]
    private_key: Option<String>,
    #[arg(short = 'i', long)]
    interactive: bool,
    #[command(flatten)]
    args: EditUserArgs,
}

/// A store with a freshly provisioned operator.
pub struct TestStore {
    pub dir: TempDir,
    pub operator: String,
    pub store: FsCredentialStore,
    pub keys: FsKeyStore,
    /// Mirrors the configured default account.
    pub current_account: Option<String>,
}

impl TestStore {
    pub fn new(operator: &str) -> Self {
        Self::with_version(operator, None)
    }

    pub fn with_version(operator: &str, version: Option<u32>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCredentialStore::open(dir.path().join("stores"), operator).unwrap();
        let keys = FsKeyStore::new(dir.path().join("keys"));
        Provisioner::new(&store, &keys)
            .add_operator(&AddOperatorOptions {
                version,
                ..Default::default()
            })
            .unwrap();
        Self {
            dir,
            operator: operator.to_string(),
            store,
            keys,
            current_account: None,
        }
    }

    pub fn provisioner(&self) -> Provisioner<'_> {
        Provisioner::new(&self.store, &self.keys).with_default_account(self.current_account.clone())
    }

    pub fn orchestrator(&self) -> EditOrchestrator<'_> {
        EditOrchestrator::new(&self.store, &self.keys).with_default_account(self.current_account.clone())
    }

    /// A CLI context pointing at this fixture's directories.
    pub fn context(&self) -> Context {
        let config = CliConfig {
            config_dir: self.dir.path().join("config"),
            store_root: self.dir.path().join("stores"),
            keystore_dir: self.dir.path().join("keys"),
            operator: Some(self.operator.clone()),
            account: self.current_account.clone(),
        };
        Context::new(config, GlobalFlags::default())
    }

    pub fn add_account(&mut self, name: &str) {
        if !self.store.list_accounts().unwrap().iter().any(|a| a == name) {
            self.provisioner().add_account(name).unwrap();
        }
        self.current_account = Some(name.to_string());
    }

    pub fn add_user(&mut self, account: &str, name: &str) {
        self.add_user_with(account, name, None, Vec::new());
    }

    pub fn add_user_with(&mut self, account: &str, name: &str, signing_key: Option<String>, ops: Vec<EditOp>) {
        self.add_account(account);
        self.provisioner()
            .add_user(&AddUserOptions {
                account: Some(account.to_string()),
                name: name.to_string(),
                signing_key,
                ops,
            })
            .unwrap();
    }

    /// Generate an account signing key, keep its seed, and register it.
    pub fn add_signing_key(&self, account: &str) -> KeyPair {
        let sk = KeyPair::generate(KeyRole::Account);
        self.keys.store(&sk).unwrap();
        self.provisioner()
            .edit_account(&EditAccountOptions {
                account: Some(account.to_string()),
                add_signing_keys: vec![sk.public_identity().to_string()],
                remove_signing_keys: Vec::new(),
            })
            .unwrap();
        sk
    }

    /// Run `edit user` with command-line flags.
    pub fn edit_user(&self, argv: &[&str]) -> Result<EditReport, EditError> {
        let cli = parse(argv);
        let opts = cli.args.to_options(cli.private_key.as_deref(), false);
        self.orchestrator().edit_user(&opts, None)
    }

    /// Run `edit user -i` with scripted answers.
    pub fn edit_user_interactive(
        &self,
        argv: &[&str],
        answers: Vec<PromptValue>,
    ) -> Result<EditReport, EditError> {
        let cli = parse(argv);
        let opts = cli.args.to_options(cli.private_key.as_deref(), true);
        let mut prompt = ScriptedPrompt::new(answers);
        self.orchestrator().edit_user(&opts, Some(&mut prompt))
    }

    pub fn user_claim(&self, account: &str, user: &str) -> Claim {
        self.store.read_user(account, user).unwrap()
    }

    pub fn user(&self, account: &str, user: &str) -> UserPayload {
        self.user_claim(account, user).user().unwrap().clone()
    }

    pub fn account_claim(&self, account: &str) -> Claim {
        self.store.read_account(account).unwrap()
    }
}

fn parse(argv: &[&str]) -> EditUserCli {
    let mut full = vec!["edit-user"];
    full.extend_from_slice(argv);
    EditUserCli::try_parse_from(full).unwrap()
}
