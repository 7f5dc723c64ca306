//! # Edit Orchestrator
//!
//! Drives one `edit user` invocation: select account and user, load the
//! stored claim, settle the signer, gather interactive answers, run the
//! engine, persist, report. Nothing is written unless every step succeeds.

use nsc_claims::Claim;
use nsc_core::PublicIdentity;
use nsc_crypto::KeyMaterialStore;
use nsc_state::{ClaimPath, CredentialStore, StoreError};

use crate::engine::{ChangeLog, ClaimMutationEngine};
use crate::error::EditError;
use crate::ops::EditOp;
use crate::prompt::{collect_interactive_ops, InteractiveDefaults, Prompt, PromptError};
use crate::resolver::SigningKeyResolver;

/// Everything one `edit user` invocation asks for. Built once from flags.
#[derive(Debug, Clone, Default)]
pub struct EditUserOptions {
    /// `--account`.
    pub account: Option<String>,
    /// `--name`.
    pub user: Option<String>,
    /// `-K`.
    pub signing_key: Option<String>,
    /// `-i`.
    pub interactive: bool,
    /// Ops from flags, in flag order.
    pub ops: Vec<EditOp>,
}

/// What an edit did.
#[derive(Debug, Clone)]
pub struct EditReport {
    /// Account the user belongs to.
    pub account: String,
    /// The edited user.
    pub user: String,
    /// `iss` on the new claim.
    pub issuer: PublicIdentity,
    /// `issuer_account` on the new claim.
    pub issuer_account: Option<PublicIdentity>,
    /// One line per applied op.
    pub change_log: ChangeLog,
}

impl EditReport {
    /// Change-log lines followed by the summary line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = self.change_log.lines().to_vec();
        lines.push(format!("edited user {:?}", self.user));
        lines
    }
}

/// Loads, edits and persists claims in one store.
pub struct EditOrchestrator<'a> {
    store: &'a dyn CredentialStore,
    keys: &'a dyn KeyMaterialStore,
    default_account: Option<String>,
}

impl<'a> EditOrchestrator<'a> {
    /// An orchestrator over `store` and `keys`.
    pub fn new(store: &'a dyn CredentialStore, keys: &'a dyn KeyMaterialStore) -> Self {
        Self {
            store,
            keys,
            default_account: None,
        }
    }

    /// Account used when `--account` is absent.
    pub fn with_default_account(mut self, account: Option<String>) -> Self {
        self.default_account = account;
        self
    }

    /// Pick the account: explicit, configured default, or the only one.
    pub fn select_account(&self, explicit: Option<&str>) -> Result<(String, Claim), EditError> {
        let name = match explicit.or(self.default_account.as_deref()) {
            Some(name) => name.to_string(),
            None => {
                let mut accounts = self.store.list_accounts()?;
                if accounts.len() != 1 {
                    return Err(EditError::AccountRequired);
                }
                accounts.remove(0)
            }
        };
        let claim = match self.store.read_account(&name) {
            Ok(claim) => claim,
            Err(StoreError::NotFound { .. }) => return Err(EditError::AccountNotFound(name)),
            Err(e) => return Err(e.into()),
        };
        Ok((name, claim))
    }

    /// Pick the user: explicit or the only one in the account.
    pub fn select_user(&self, account: &str, explicit: Option<&str>) -> Result<(String, Claim), EditError> {
        let name = match explicit {
            Some(name) => name.to_string(),
            None => {
                let mut users = self.store.list_users(account)?;
                if users.len() != 1 {
                    return Err(EditError::UserNameRequired);
                }
                users.remove(0)
            }
        };
        let claim = match self.store.read_user(account, &name) {
            Ok(claim) => claim,
            Err(StoreError::NotFound { .. }) => {
                return Err(EditError::UserNotFound {
                    account: account.to_string(),
                    user: name,
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok((name, claim))
    }

    /// Edit one user claim.
    pub fn edit_user(
        &self,
        opts: &EditUserOptions,
        mut prompt: Option<&mut dyn Prompt>,
    ) -> Result<EditReport, EditError> {
        if !opts.interactive && opts.ops.is_empty() {
            return Err(EditError::NoEditSpecified);
        }
        if opts.interactive && prompt.is_none() {
            return Err(PromptError::Unavailable.into());
        }

        let (account_name, account) = self.select_account(opts.account.as_deref())?;
        let (user_name, stored) = self.select_user(&account_name, opts.user.as_deref())?;

        let mut explicit = opts.signing_key.clone();
        let mut ops = opts.ops.clone();
        if let Some(p) = prompt.as_deref_mut().filter(|_| opts.interactive) {
            if explicit.is_none() {
                explicit = self.prompt_for_signer(p, &account)?;
            }
            let user = stored.user()?;
            let current = InteractiveDefaults {
                payload: user.limits.payload,
                nbf: stored.nbf,
                exp: stored.exp,
                resp: user.resp.clone(),
            };
            ops.extend(collect_interactive_ops(p, &current)?);
        }

        let engine = ClaimMutationEngine::new(self.keys);
        let outcome = engine.edit(&stored, &account, &ops, explicit.as_deref())?;

        let path = ClaimPath::user(account_name.as_str(), user_name.as_str());
        self.store
            .write_claim(&path, &outcome.token)
            .map_err(|source| EditError::Persistence {
                path: path.to_string(),
                source,
            })?;

        tracing::info!(
            account = %account_name,
            user = %user_name,
            issuer = %outcome.token.claim.iss.short(),
            changes = outcome.change_log.len(),
            "edited user"
        );

        Ok(EditReport {
            account: account_name,
            user: user_name,
            issuer: outcome.token.claim.iss.clone(),
            issuer_account: outcome.token.claim.issuer_account.clone(),
            change_log: outcome.change_log,
        })
    }

    /// With several usable signers, ask which one. Returns the chosen
    /// public identity as an explicit reference, or `None` when there is
    /// nothing to choose.
    fn prompt_for_signer(&self, prompt: &mut dyn Prompt, account: &Claim) -> Result<Option<String>, EditError> {
        let candidates = SigningKeyResolver::new(self.keys).usable_candidates(account)?;
        if candidates.len() < 2 {
            return Ok(None);
        }
        let options = candidates
            .iter()
            .map(|id| {
                if *id == account.sub {
                    format!("account key {}", id.short())
                } else {
                    format!("signing key {}", id.short())
                }
            })
            .collect();
        let idx = prompt.select("select the key to sign the user", options, 0)?;
        Ok(candidates.get(idx).map(|id| id.to_string()))
    }
}
