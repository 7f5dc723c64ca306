//! # Version Gate
//!
//! One evaluation per command invocation, before anything else runs:
//!
//! | Store version | Outcome |
//! |---|---|
//! | none loaded | store check skipped |
//! | v0 (unversioned) | allowed |
//! | v1 (deprecated) | allow-list only, otherwise remediation instructions |
//! | v2 (current) | allowed |
//! | vN > 2 | blocked, this release is too old |
//!
//! Independently, a key store with keys in the legacy layout blocks every
//! command except `keys migrate`. The key store check runs after the store
//! check, so a v1 store reports the store problem first.
//!
//! The gate reads no files and writes nothing. Callers gather the store and
//! key store status and pass them in.

use crate::error::GateError;

/// Leaf command names allowed to run against a v1 store.
const V1_ALLOW_LIST: [&str; 4] = ["upgrade-jwt", "env", "help", "update"];

/// The operator command family, needed on v1 to replace the operator.
const OPERATOR_FAMILY: &str = "operator";

/// Version a release can downgrade to for continued v1 support.
const V1_COMPATIBLE_RELEASE: &str = "0.5.0";

/// Format revision of a credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreVersion {
    /// Unversioned store from before format tracking.
    Legacy,
    /// Deprecated v1 token format.
    JwtV1,
    /// The format this release writes.
    Current,
    /// Written by a newer release.
    Future(u32),
}

impl StoreVersion {
    /// The numeric version.
    pub fn number(&self) -> u32 {
        match self {
            Self::Legacy => 0,
            Self::JwtV1 => 1,
            Self::Current => 2,
            Self::Future(n) => *n,
        }
    }
}

impl From<u32> for StoreVersion {
    fn from(v: u32) -> Self {
        match v {
            0 => Self::Legacy,
            1 => Self::JwtV1,
            2 => Self::Current,
            n => Self::Future(n),
        }
    }
}

impl std::fmt::Display for StoreVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// The sub-command path being invoked, e.g. `["edit", "user"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPath(Vec<String>);

impl CommandPath {
    /// Build from path segments, outermost first.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The innermost command name. Empty for the bare program.
    pub fn leaf(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    /// Whether the path is exactly `segments`.
    pub fn is(&self, segments: &[&str]) -> bool {
        self.0.len() == segments.len() && self.0.iter().zip(segments).all(|(a, b)| a == b)
    }
}

impl std::fmt::Display for CommandPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// What the gate needs to know about the loaded store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    /// Store (operator) name.
    pub name: String,
    /// Version recorded on the operator claim.
    pub version: StoreVersion,
}

/// What the gate needs to know about the key store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoreStatus {
    /// Location shown in messages.
    pub location: String,
    /// Whether keys are held in a legacy layout.
    pub needs_migration: bool,
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The command may run.
    Allow,
    /// The command must not run.
    Block(GateError),
}

impl GateDecision {
    /// Whether the command may run.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Convert to a `Result` for `?` propagation.
    pub fn into_result(self) -> Result<(), GateError> {
        match self {
            Self::Allow => Ok(()),
            Self::Block(e) => Err(e),
        }
    }
}

/// Decides whether a command may run against the current store.
#[derive(Debug, Clone)]
pub struct VersionGate {
    program: String,
}

impl VersionGate {
    /// A gate whose messages refer to the binary as `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Evaluate the gate for one command.
    pub fn check_allowed(
        &self,
        command: &CommandPath,
        store: Option<&StoreStatus>,
        keystore: &KeystoreStatus,
    ) -> GateDecision {
        if let Some(store) = store {
            if let Err(e) = self.check_store(command, store) {
                tracing::debug!(command = %command, version = %store.version, "store version gate blocked command");
                return GateDecision::Block(e);
            }
        }

        if keystore.needs_migration && !command.is(&["keys", "migrate"]) {
            tracing::debug!(command = %command, keystore = %keystore.location, "keystore gate blocked command");
            return GateDecision::Block(GateError::KeystoreMigrationRequired {
                location: keystore.location.clone(),
                program: self.program.clone(),
            });
        }

        GateDecision::Allow
    }

    fn check_store(&self, command: &CommandPath, store: &StoreStatus) -> Result<(), GateError> {
        match store.version {
            StoreVersion::Legacy | StoreVersion::Current => Ok(()),
            StoreVersion::Future(version) => Err(GateError::StoreTooNew {
                store: store.name.clone(),
                version,
                program: self.program.clone(),
            }),
            StoreVersion::JwtV1 => {
                let leaf = command.leaf();
                if V1_ALLOW_LIST.contains(&leaf) || leaf == OPERATOR_FAMILY {
                    Ok(())
                } else {
                    Err(GateError::StoreVersionBlocked {
                        store: store.name.clone(),
                        remediation: self.v1_remediation(&store.name),
                    })
                }
            }
        }
    }

    fn v1_remediation(&self, store: &str) -> String {
        let p = &self.program;
        format!(
            "This version of {p} only supports jwtV2.\n\
             If you are using a managed service, check your provider for\n\
             instructions on how to update your project. In most cases\n\
             all you need to do is:\n\
             \"{p} add operator --force -u <url provided by your service>\"\n\
             \n\
             If you are the operator, and you have your operator key, to\n\
             upgrade the v1 store \"{store}\" - type:\n\
             \"{p} upgrade-jwt\"\n\
             \n\
             Alternatively you can downgrade \"{p}\" to a compatible version using:\n\
             \"{p} update --version {V1_COMPATIBLE_RELEASE}\"\n"
        )
    }
}
