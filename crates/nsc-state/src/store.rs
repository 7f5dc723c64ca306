//! # Credential Store
//!
//! [`CredentialStore`] is the only way the edit path reads or writes claims.
//! Reads return verified tokens: a token whose signature or `jti` does not
//! check out, or whose kind does not match its location, is an error. Writes
//! apply the same checks before touching storage, so a broken token is never
//! persisted.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use nsc_claims::{Claim, ClaimKind, ClaimToken};
use nsc_core::atomic_write;

use crate::error::StoreError;

const ACCOUNTS_DIR: &str = "accounts";
const USERS_DIR: &str = "users";
const CLAIM_EXT: &str = "json";

/// Location of one claim in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClaimPath {
    /// The store's operator claim.
    Operator,
    /// An account claim, by account name.
    Account(String),
    /// A user claim, by account and user name.
    User {
        /// Owning account name.
        account: String,
        /// User name.
        user: String,
    },
}

impl ClaimPath {
    /// Shorthand for [`ClaimPath::Account`].
    pub fn account(name: impl Into<String>) -> Self {
        Self::Account(name.into())
    }

    /// Shorthand for [`ClaimPath::User`].
    pub fn user(account: impl Into<String>, user: impl Into<String>) -> Self {
        Self::User {
            account: account.into(),
            user: user.into(),
        }
    }

    /// The claim kind stored at this location.
    pub fn kind(&self) -> ClaimKind {
        match self {
            Self::Operator => ClaimKind::Operator,
            Self::Account(_) => ClaimKind::Account,
            Self::User { .. } => ClaimKind::User,
        }
    }

    fn validate(&self) -> Result<(), StoreError> {
        match self {
            Self::Operator => Ok(()),
            Self::Account(a) => validate_name(a),
            Self::User { account, user } => {
                validate_name(account)?;
                validate_name(user)
            }
        }
    }

    fn not_found(&self, store: &str) -> StoreError {
        let name = match self {
            Self::Operator => store.to_string(),
            Self::Account(a) => a.clone(),
            Self::User { user, .. } => user.clone(),
        };
        StoreError::NotFound {
            kind: self.kind().as_str(),
            name,
        }
    }
}

impl std::fmt::Display for ClaimPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operator => f.write_str("operator"),
            Self::Account(a) => write!(f, "account {a}"),
            Self::User { account, user } => write!(f, "user {account}/{user}"),
        }
    }
}

/// Reject names that cannot be a single path component.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    let bad = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn check_token(path: &ClaimPath, token: &ClaimToken) -> Result<(), StoreError> {
    if token.claim.kind() != path.kind() {
        return Err(StoreError::KindMismatch {
            path: path.to_string(),
            expected: path.kind(),
        });
    }
    token.verify().map_err(|source| StoreError::Claim {
        path: path.to_string(),
        source,
    })?;
    Ok(())
}

/// Persists claims for one operator and everything under it.
pub trait CredentialStore {
    /// Store name (the operator name).
    fn store_name(&self) -> &str;

    /// Read and verify the token at `path`.
    fn read_claim(&self, path: &ClaimPath) -> Result<ClaimToken, StoreError>;

    /// Verify and persist `token` at `path`, replacing any existing token.
    fn write_claim(&self, path: &ClaimPath, token: &ClaimToken) -> Result<(), StoreError>;

    /// Whether a token exists at `path`. Does not verify it.
    fn has_claim(&self, path: &ClaimPath) -> bool;

    /// Account names, sorted.
    fn list_accounts(&self) -> Result<Vec<String>, StoreError>;

    /// User names in `account`, sorted.
    fn list_users(&self, account: &str) -> Result<Vec<String>, StoreError>;

    /// The format version recorded on the operator claim.
    fn format_version(&self) -> Result<u32, StoreError> {
        let claim = self.read_operator()?;
        claim
            .operator()
            .map(|o| o.version)
            .map_err(|source| StoreError::Claim {
                path: ClaimPath::Operator.to_string(),
                source,
            })
    }

    /// The verified operator claim.
    fn read_operator(&self) -> Result<Claim, StoreError> {
        Ok(self.read_claim(&ClaimPath::Operator)?.claim)
    }

    /// A verified account claim.
    fn read_account(&self, account: &str) -> Result<Claim, StoreError> {
        Ok(self.read_claim(&ClaimPath::account(account))?.claim)
    }

    /// A verified user claim.
    fn read_user(&self, account: &str, user: &str) -> Result<Claim, StoreError> {
        Ok(self.read_claim(&ClaimPath::user(account, user))?.claim)
    }
}

// ─── FsCredentialStore ───────────────────────────────────────────────────

/// Claims as JSON files under `<root>/<operator>/`.
#[derive(Debug, Clone)]
pub struct FsCredentialStore {
    dir: PathBuf,
    name: String,
}

impl FsCredentialStore {
    /// Open the store for `operator` under `root`. Nothing is read until the
    /// first call.
    pub fn open(root: impl AsRef<Path>, operator: &str) -> Result<Self, StoreError> {
        validate_name(operator)?;
        Ok(Self {
            dir: root.as_ref().join(operator),
            name: operator.to_string(),
        })
    }

    /// Names of the stores under `root` (directories holding an operator
    /// claim), sorted.
    pub fn list_stores(root: impl AsRef<Path>) -> Result<Vec<String>, StoreError> {
        let root = root.as_ref();
        let mut names: Vec<String> = list_dirs(root)?
            .into_iter()
            .filter(|n| root.join(n).join(format!("{n}.{CLAIM_EXT}")).is_file())
            .collect();
        names.sort();
        Ok(names)
    }

    /// The store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the operator claim exists.
    pub fn exists(&self) -> bool {
        self.has_claim(&ClaimPath::Operator)
    }

    /// File holding the token at `path`.
    pub fn file_for(&self, path: &ClaimPath) -> PathBuf {
        match path {
            ClaimPath::Operator => self.dir.join(format!("{}.{CLAIM_EXT}", self.name)),
            ClaimPath::Account(a) => self
                .dir
                .join(ACCOUNTS_DIR)
                .join(a)
                .join(format!("{a}.{CLAIM_EXT}")),
            ClaimPath::User { account, user } => self
                .dir
                .join(ACCOUNTS_DIR)
                .join(account)
                .join(USERS_DIR)
                .join(format!("{user}.{CLAIM_EXT}")),
        }
    }
}

fn list_dirs(dir: &Path) -> Result<Vec<String>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                out.push(name.to_string());
            }
        }
    }
    out.sort();
    Ok(out)
}

impl CredentialStore for FsCredentialStore {
    fn store_name(&self) -> &str {
        &self.name
    }

    fn read_claim(&self, path: &ClaimPath) -> Result<ClaimToken, StoreError> {
        path.validate()?;
        let file = self.file_for(path);
        let bytes = match fs::read(&file) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(path.not_found(&self.name))
            }
            Err(e) => return Err(StoreError::io(&file, e)),
        };
        let token = ClaimToken::decode(&bytes).map_err(|source| StoreError::Claim {
            path: file.display().to_string(),
            source,
        })?;
        check_token(path, &token)?;
        Ok(token)
    }

    fn write_claim(&self, path: &ClaimPath, token: &ClaimToken) -> Result<(), StoreError> {
        path.validate()?;
        check_token(path, token)?;
        let file = self.file_for(path);
        let bytes = token.encode().map_err(|source| StoreError::Claim {
            path: path.to_string(),
            source,
        })?;
        atomic_write(&file, &bytes).map_err(|e| StoreError::io(&file, e))?;
        tracing::debug!(claim = %path, jti = %token.claim.jti, "wrote claim");
        Ok(())
    }

    fn has_claim(&self, path: &ClaimPath) -> bool {
        path.validate().is_ok() && self.file_for(path).is_file()
    }

    fn list_accounts(&self) -> Result<Vec<String>, StoreError> {
        let accounts = self.dir.join(ACCOUNTS_DIR);
        Ok(list_dirs(&accounts)?
            .into_iter()
            .filter(|a| self.has_claim(&ClaimPath::account(a.as_str())))
            .collect())
    }

    fn list_users(&self, account: &str) -> Result<Vec<String>, StoreError> {
        validate_name(account)?;
        let users = self.dir.join(ACCOUNTS_DIR).join(account).join(USERS_DIR);
        let entries = match fs::read_dir(&users) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&users, e)),
        };
        let mut out = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&users, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CLAIM_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                out.push(stem.to_string());
            }
        }
        out.sort();
        Ok(out)
    }
}

// ─── MemoryCredentialStore ───────────────────────────────────────────────

/// In-memory credential store.
#[derive(Debug)]
pub struct MemoryCredentialStore {
    name: String,
    claims: Mutex<BTreeMap<ClaimPath, ClaimToken>>,
}

impl MemoryCredentialStore {
    /// An empty store called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            claims: Mutex::new(BTreeMap::new()),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn store_name(&self) -> &str {
        &self.name
    }

    fn read_claim(&self, path: &ClaimPath) -> Result<ClaimToken, StoreError> {
        let claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        let token = claims
            .get(path)
            .cloned()
            .ok_or_else(|| path.not_found(&self.name))?;
        check_token(path, &token)?;
        Ok(token)
    }

    fn write_claim(&self, path: &ClaimPath, token: &ClaimToken) -> Result<(), StoreError> {
        path.validate()?;
        check_token(path, token)?;
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.clone(), token.clone());
        Ok(())
    }

    fn has_claim(&self, path: &ClaimPath) -> bool {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    fn list_accounts(&self) -> Result<Vec<String>, StoreError> {
        let claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(claims
            .keys()
            .filter_map(|p| match p {
                ClaimPath::Account(a) => Some(a.clone()),
                _ => None,
            })
            .collect())
    }

    fn list_users(&self, account: &str) -> Result<Vec<String>, StoreError> {
        let claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(claims
            .keys()
            .filter_map(|p| match p {
                ClaimPath::User { account: a, user } if a == account => Some(user.clone()),
                _ => None,
            })
            .collect())
    }
}
