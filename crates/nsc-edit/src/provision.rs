//! # Provisioning
//!
//! Creates the claims an edit works on and maintains the parts of the
//! chain above users: operators, accounts and account signing keys. Also
//! upgrades a v1 store and describes users.
//!
//! Operator and account claims are signed by the operator key (or a held
//! operator signing key). User claims are signed through the
//! [`SigningKeyResolver`], the same way edits are.

use nsc_claims::operator::CURRENT_VERSION;
use nsc_claims::{AccountPayload, Claim, ClaimPayload, ClaimToken, OperatorPayload, UserPayload};
use nsc_core::{unix_now, KeyRole, PublicIdentity};
use nsc_crypto::{KeyMaterialStore, KeyPair};
use nsc_state::{ClaimPath, CredentialStore};

use crate::engine::{ChangeLog, ClaimMutationEngine};
use crate::error::EditError;
use crate::ops::EditOp;
use crate::orchestrator::EditOrchestrator;
use crate::resolver::SigningKeyResolver;

/// Value for `--sk` that creates a new signing key.
pub const GENERATE_KEYWORD: &str = "generate";

/// `add operator` options.
#[derive(Debug, Clone, Default)]
pub struct AddOperatorOptions {
    /// Store format version to stamp; defaults to the current one.
    pub version: Option<u32>,
    /// Account server URL.
    pub account_server_url: Option<String>,
    /// Replace an existing operator.
    pub force: bool,
}

/// `add user` options.
#[derive(Debug, Clone, Default)]
pub struct AddUserOptions {
    /// `--account`.
    pub account: Option<String>,
    /// `--name`.
    pub name: String,
    /// `-K`.
    pub signing_key: Option<String>,
    /// Initial settings, applied like an edit.
    pub ops: Vec<EditOp>,
}

/// `edit account` options.
#[derive(Debug, Clone, Default)]
pub struct EditAccountOptions {
    /// `--name`.
    pub account: Option<String>,
    /// `--sk`: public keys, or `generate`.
    pub add_signing_keys: Vec<String>,
    /// `--rm-sk`.
    pub remove_signing_keys: Vec<String>,
}

/// Thin handlers for the provisioning commands.
pub struct Provisioner<'a> {
    store: &'a dyn CredentialStore,
    keys: &'a dyn KeyMaterialStore,
    default_account: Option<String>,
}

impl<'a> Provisioner<'a> {
    /// A provisioner over `store` and `keys`.
    pub fn new(store: &'a dyn CredentialStore, keys: &'a dyn KeyMaterialStore) -> Self {
        Self {
            store,
            keys,
            default_account: None,
        }
    }

    /// Account used when none is named.
    pub fn with_default_account(mut self, account: Option<String>) -> Self {
        self.default_account = account;
        self
    }

    fn selector(&self) -> EditOrchestrator<'a> {
        EditOrchestrator::new(self.store, self.keys).with_default_account(self.default_account.clone())
    }

    /// Create the store's operator with a fresh key, self-signed.
    pub fn add_operator(&self, opts: &AddOperatorOptions) -> Result<ChangeLog, EditError> {
        let name = self.store.store_name().to_string();
        if self.store.has_claim(&ClaimPath::Operator) && !opts.force {
            return Err(EditError::AlreadyExists { kind: "operator", name });
        }

        let key = KeyPair::generate(KeyRole::Operator);
        self.keys.store(&key)?;

        let payload = OperatorPayload {
            version: opts.version.unwrap_or(CURRENT_VERSION),
            account_server_url: opts.account_server_url.clone(),
            ..OperatorPayload::default()
        };
        let version = payload.version;
        let mut claim = Claim::new(name.as_str(), key.public_identity(), ClaimPayload::Operator(payload));
        claim.stamp(unix_now())?;
        let token = ClaimToken::sign(claim, &key)?;
        self.persist(&ClaimPath::Operator, &token)?;

        tracing::info!(operator = %name, version, "added operator");
        let mut log = ChangeLog::new();
        log.push(format!("generated and stored operator key {}", key.public_identity()));
        log.push(format!("added operator {name:?}"));
        Ok(log)
    }

    /// Create an account with a fresh key, signed by the operator.
    pub fn add_account(&self, name: &str) -> Result<ChangeLog, EditError> {
        let path = ClaimPath::account(name);
        if self.store.has_claim(&path) {
            return Err(EditError::AlreadyExists {
                kind: "account",
                name: name.to_string(),
            });
        }
        let operator = self.store.read_operator()?;
        let signer = self.operator_signer(&operator)?;

        let key = KeyPair::generate(KeyRole::Account);
        self.keys.store(&key)?;

        let mut claim = Claim::new(name, key.public_identity(), ClaimPayload::Account(AccountPayload::default()));
        claim.iss = signer.public_identity();
        claim.stamp(unix_now())?;
        let token = ClaimToken::sign(claim, &signer)?;
        self.persist(&path, &token)?;

        tracing::info!(account = %name, "added account");
        let mut log = ChangeLog::new();
        log.push(format!("generated and stored account key {}", key.public_identity()));
        log.push(format!("added account {name:?}"));
        Ok(log)
    }

    /// Create a user with a fresh key. `opts.ops` are applied before
    /// signing, so a new user can start with limits or permissions.
    pub fn add_user(&self, opts: &AddUserOptions) -> Result<ChangeLog, EditError> {
        if opts.name.trim().is_empty() {
            return Err(EditError::UserNameRequired);
        }
        let (account_name, account) = self.selector().select_account(opts.account.as_deref())?;
        let path = ClaimPath::user(account_name.as_str(), opts.name.as_str());
        if self.store.has_claim(&path) {
            return Err(EditError::AlreadyExists {
                kind: "user",
                name: opts.name.clone(),
            });
        }

        let resolver = SigningKeyResolver::new(self.keys);
        let signer = resolver.resolve(opts.signing_key.as_deref(), &account, None)?;

        let key = KeyPair::generate(KeyRole::User);
        let mut claim = Claim::new(
            opts.name.as_str(),
            key.public_identity(),
            ClaimPayload::User(UserPayload::default()),
        );
        let mut log = ChangeLog::new();
        log.push(format!("generated and stored user key {}", key.public_identity()));
        if !opts.ops.is_empty() {
            let (applied, changes) = ClaimMutationEngine::apply(&claim, &opts.ops)?;
            claim = applied;
            for line in changes.lines() {
                log.push(line.clone());
            }
        }

        signer.stamp(&mut claim);
        claim.stamp(unix_now())?;
        let token = ClaimToken::sign(claim, &signer.key)?;
        self.keys.store(&key)?;
        self.persist(&path, &token)?;

        tracing::info!(
            account = %account_name,
            user = %opts.name,
            issuer = %signer.issuer.short(),
            "added user"
        );
        log.push(format!("added user {:?} to account {account_name:?}", opts.name));
        Ok(log)
    }

    /// Add or remove account signing keys and re-sign the account.
    pub fn edit_account(&self, opts: &EditAccountOptions) -> Result<ChangeLog, EditError> {
        if opts.add_signing_keys.is_empty() && opts.remove_signing_keys.is_empty() {
            return Err(EditError::NoEditSpecified);
        }
        let (account_name, mut account) = self.selector().select_account(opts.account.as_deref())?;
        let operator = self.store.read_operator()?;
        let signer = self.operator_signer(&operator)?;

        let mut log = ChangeLog::new();
        let mut generated = Vec::new();
        for reference in &opts.add_signing_keys {
            let id = if reference.trim().eq_ignore_ascii_case(GENERATE_KEYWORD) {
                let key = KeyPair::generate(KeyRole::Account);
                let id = key.public_identity();
                generated.push(key);
                log.push(format!("generated and added signing key {id}"));
                id
            } else {
                let id = parse_account_key(reference)?;
                log.push(format!("added signing key {id}"));
                id
            };
            account.account_mut()?.signing_keys.insert(id);
        }
        for reference in &opts.remove_signing_keys {
            let id = parse_account_key(reference)?;
            account.account_mut()?.signing_keys.remove(&id);
            log.push(format!("removed signing key {id}"));
        }

        account.iss = signer.public_identity();
        account.stamp(unix_now())?;
        let token = ClaimToken::sign(account, &signer)?;
        for key in &generated {
            self.keys.store(key)?;
        }
        self.persist(&ClaimPath::account(account_name.as_str()), &token)?;

        tracing::info!(account = %account_name, changes = log.len(), "edited account");
        log.push(format!("edited account {account_name:?}"));
        Ok(log)
    }

    /// The verified user claim, selected like an edit would.
    pub fn describe_user(&self, account: Option<&str>, user: Option<&str>) -> Result<Claim, EditError> {
        let selector = self.selector();
        let (account_name, _) = selector.select_account(account)?;
        let (_, claim) = selector.select_user(&account_name, user)?;
        Ok(claim)
    }

    /// Rewrite a pre-v2 operator claim at the current version. A current
    /// store is left alone.
    pub fn upgrade_jwt(&self) -> Result<ChangeLog, EditError> {
        let mut operator = self.store.read_operator()?;
        let name = operator.name.clone();
        let from = operator.operator()?.version;
        let mut log = ChangeLog::new();
        if from >= CURRENT_VERSION {
            log.push(format!("operator {name:?} is already at v{from}"));
            return Ok(log);
        }

        let signer = self.operator_signer(&operator)?;
        operator.operator_mut()?.version = CURRENT_VERSION;
        operator.iss = signer.public_identity();
        operator.stamp(unix_now())?;
        let token = ClaimToken::sign(operator, &signer)?;
        self.persist(&ClaimPath::Operator, &token)?;

        tracing::info!(operator = %name, from, to = CURRENT_VERSION, "upgraded store");
        log.push(format!("upgraded operator {name:?} from v{from} to v{CURRENT_VERSION}"));
        Ok(log)
    }

    /// The operator key when held, else the first held operator signing
    /// key.
    fn operator_signer(&self, operator: &Claim) -> Result<KeyPair, EditError> {
        if let Some(key) = self.keys.get(&operator.sub)? {
            return Ok(key);
        }
        let signing_keys: Vec<PublicIdentity> = operator.operator()?.signing_keys.iter().cloned().collect();
        self.keys
            .list_candidates(&signing_keys)?
            .into_iter()
            .next()
            .ok_or_else(|| EditError::OperatorKeyMissing {
                operator: operator.name.clone(),
            })
    }

    fn persist(&self, path: &ClaimPath, token: &ClaimToken) -> Result<(), EditError> {
        self.store
            .write_claim(path, token)
            .map_err(|source| EditError::Persistence {
                path: path.to_string(),
                source,
            })
    }
}

fn parse_account_key(reference: &str) -> Result<PublicIdentity, EditError> {
    PublicIdentity::parse_role(reference.trim(), KeyRole::Account)
        .map_err(|e| EditError::validation("signing key", reference, e.to_string()))
}
