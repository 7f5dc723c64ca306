//! # Key Material Store
//!
//! The edit path never touches key files directly. It asks a
//! [`KeyMaterialStore`] whether a private key is held for a public identity
//! and resolves user-supplied key references through it.
//!
//! ## Backends
//!
//! - [`FsKeyStore`]: seeds on disk, one file per key, sharded by role and
//!   the first two key characters:
//!
//!   ```text
//!   <root>/keys/A/B4/AB4F…E1.nk
//!   ```
//!
//!   Earlier releases wrote `*.nk` files anywhere under the root (usually
//!   next to the claim they belong to). Such files mark the store as needing
//!   migration; [`KeyMaterialStore::migrate()`] moves them into the sharded
//!   layout.
//!
//! - [`MemoryKeyStore`]: in-process map, for tests and dry runs.
//!
//! ## Key References
//!
//! [`KeyMaterialStore::resolve()`] accepts seed text, a public identity whose
//! seed is held, or a path to a file containing a seed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use nsc_core::{atomic_write, PublicIdentity};
use zeroize::Zeroizing;

use crate::ed25519::KeyPair;
use crate::error::KeyStoreError;

/// Extension used for seed files.
pub const SEED_FILE_EXT: &str = "nk";

/// Directory under the root that holds the sharded layout.
const KEYS_DIR: &str = "keys";

/// Summary of a layout migration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Keys moved into the sharded layout.
    pub migrated: Vec<PublicIdentity>,
    /// Legacy files that could not be parsed and were left in place.
    pub skipped: Vec<PathBuf>,
}

/// Holds private keys indexed by public identity.
pub trait KeyMaterialStore {
    /// Human-readable location for messages (a directory, or `memory`).
    fn location(&self) -> String;

    /// Load the key pair for `id`, if held.
    fn get(&self, id: &PublicIdentity) -> Result<Option<KeyPair>, KeyStoreError>;

    /// Persist a key pair, replacing any existing entry.
    fn store(&self, key: &KeyPair) -> Result<(), KeyStoreError>;

    /// Forget a key. Returns whether it was held.
    fn remove(&self, id: &PublicIdentity) -> Result<bool, KeyStoreError>;

    /// Whether the store holds keys in a layout this version cannot read.
    fn needs_migration(&self) -> Result<bool, KeyStoreError>;

    /// Rewrite legacy keys into the current layout.
    fn migrate(&self) -> Result<MigrationReport, KeyStoreError>;

    /// Whether a private key is held for `id`.
    fn has(&self, id: &PublicIdentity) -> bool {
        matches!(self.get(id), Ok(Some(_)))
    }

    /// Resolve a user-supplied reference to a key pair.
    fn resolve(&self, reference: &str) -> Result<KeyPair, KeyStoreError> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(KeyStoreError::UnresolvableReference {
                reference: reference.to_string(),
                reason: "empty key reference".to_string(),
            });
        }

        if KeyPair::is_seed(trimmed) {
            return Ok(KeyPair::from_seed(trimmed)?);
        }

        if let Ok(id) = PublicIdentity::parse(trimmed) {
            return self
                .get(&id)?
                .ok_or_else(|| KeyStoreError::KeyNotFound(id.to_string()));
        }

        let path = Path::new(trimmed);
        if path.is_file() {
            return read_seed_file(path)?.ok_or_else(|| KeyStoreError::UnresolvableReference {
                reference: reference.to_string(),
                reason: "file does not contain a seed".to_string(),
            });
        }

        Err(KeyStoreError::UnresolvableReference {
            reference: reference.to_string(),
            reason: "not a seed, public key, or readable seed file".to_string(),
        })
    }

    /// Key pairs held for the given identities, in the order given.
    fn list_candidates(&self, ids: &[PublicIdentity]) -> Result<Vec<KeyPair>, KeyStoreError> {
        let mut out = Vec::new();
        for id in ids {
            if let Some(kp) = self.get(id)? {
                out.push(kp);
            }
        }
        Ok(out)
    }
}

/// Read the first seed found in a file. Seed files hold a single line;
/// credential bundles hold the seed among other lines.
fn read_seed_file(path: &Path) -> Result<Option<KeyPair>, KeyStoreError> {
    let contents = Zeroizing::new(fs::read_to_string(path).map_err(|e| KeyStoreError::io(path, e))?);
    for line in contents.lines() {
        if KeyPair::is_seed(line) {
            return Ok(Some(KeyPair::from_seed(line)?));
        }
    }
    Ok(None)
}

// ─── FsKeyStore ──────────────────────────────────────────────────────────

/// Seeds on disk under a root directory.
#[derive(Debug, Clone)]
pub struct FsKeyStore {
    root: PathBuf,
}

impl FsKeyStore {
    /// Open a key store rooted at `root`. The directory is created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path at which the seed for `id` lives in the sharded layout.
    pub fn key_path(&self, id: &PublicIdentity) -> PathBuf {
        let s = id.as_str();
        self.root
            .join(KEYS_DIR)
            .join(&s[..1])
            .join(&s[1..3])
            .join(format!("{s}.{SEED_FILE_EXT}"))
    }

    /// Seed files outside the sharded layout.
    fn legacy_files(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        collect_seed_files(&self.root, &self.root.join(KEYS_DIR), &mut found);
        found.sort();
        found
    }
}

fn collect_seed_files(dir: &Path, skip: &Path, acc: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path == skip {
            continue;
        }
        if path.is_dir() {
            collect_seed_files(&path, skip, acc);
        } else if path.extension().and_then(|e| e.to_str()) == Some(SEED_FILE_EXT) {
            acc.push(path);
        }
    }
}

impl KeyMaterialStore for FsKeyStore {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn get(&self, id: &PublicIdentity) -> Result<Option<KeyPair>, KeyStoreError> {
        let path = self.key_path(id);
        if !path.is_file() {
            return Ok(None);
        }
        let kp = read_seed_file(&path)?;
        Ok(kp.filter(|kp| kp.public_identity() == *id))
    }

    fn store(&self, key: &KeyPair) -> Result<(), KeyStoreError> {
        let id = key.public_identity();
        let path = self.key_path(&id);
        let seed = key.seed();
        atomic_write(&path, seed.as_bytes()).map_err(|e| KeyStoreError::io(&path, e))?;
        restrict_permissions(&path)?;
        tracing::debug!(key = %id.short(), role = %key.role(), "stored key");
        Ok(())
    }

    fn remove(&self, id: &PublicIdentity) -> Result<bool, KeyStoreError> {
        let path = self.key_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(key = %id.short(), "removed key");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(KeyStoreError::io(&path, e)),
        }
    }

    fn needs_migration(&self) -> Result<bool, KeyStoreError> {
        Ok(self
            .legacy_files()
            .iter()
            .any(|p| matches!(read_seed_file(p), Ok(Some(_)))))
    }

    fn migrate(&self) -> Result<MigrationReport, KeyStoreError> {
        let mut report = MigrationReport::default();
        for path in self.legacy_files() {
            match read_seed_file(&path) {
                Ok(Some(kp)) => {
                    self.store(&kp)?;
                    fs::remove_file(&path).map_err(|e| KeyStoreError::io(&path, e))?;
                    tracing::info!(
                        key = %kp.public_identity().short(),
                        from = %path.display(),
                        "migrated key"
                    );
                    report.migrated.push(kp.public_identity());
                }
                Ok(None) | Err(_) => {
                    tracing::warn!(path = %path.display(), "skipping unreadable seed file");
                    report.skipped.push(path);
                }
            }
        }
        Ok(report)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), KeyStoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| KeyStoreError::io(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), KeyStoreError> {
    Ok(())
}

// ─── MemoryKeyStore ──────────────────────────────────────────────────────

/// In-memory key store.
#[derive(Default)]
pub struct MemoryKeyStore {
    seeds: Mutex<BTreeMap<PublicIdentity, Zeroizing<String>>>,
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let seeds = self.seeds.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MemoryKeyStore")
            .field("keys", &seeds.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MemoryKeyStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.seeds.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no keys are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyMaterialStore for MemoryKeyStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn get(&self, id: &PublicIdentity) -> Result<Option<KeyPair>, KeyStoreError> {
        let seeds = self.seeds.lock().unwrap_or_else(PoisonError::into_inner);
        match seeds.get(id) {
            Some(seed) => Ok(Some(KeyPair::from_seed(seed)?)),
            None => Ok(None),
        }
    }

    fn store(&self, key: &KeyPair) -> Result<(), KeyStoreError> {
        self.seeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.public_identity(), key.seed());
        Ok(())
    }

    fn remove(&self, id: &PublicIdentity) -> Result<bool, KeyStoreError> {
        Ok(self
            .seeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some())
    }

    fn needs_migration(&self) -> Result<bool, KeyStoreError> {
        Ok(false)
    }

    fn migrate(&self) -> Result<MigrationReport, KeyStoreError> {
        Ok(MigrationReport::default())
    }
}
