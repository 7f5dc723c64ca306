//! # nsc-edit — Editing the Credential Chain
//!
//! Everything between a parsed command line and the credential store:
//!
//! - [`SigningKeyResolver`] decides which held key signs a user claim and
//!   how the trust chain is recorded on it.
//! - [`ClaimMutationEngine`] applies a batch of [`EditOp`]s to a user claim,
//!   producing one change-log line per op, then re-signs it.
//! - [`EditOrchestrator`] runs one `edit user` invocation end to end.
//! - [`Provisioner`] creates operators, accounts and users, manages account
//!   signing keys and upgrades v1 stores.
//!
//! Interactive input goes through the [`Prompt`] trait and ends up as more
//! `EditOp`s in the same batch as flag input.
//!
//! ## Atomicity
//!
//! Edits run on a clone of the stored claim. A failure anywhere (a bad
//! value, an unusable key, a cancelled prompt) returns before anything is
//! written.

pub mod engine;
pub mod error;
pub mod ops;
pub mod orchestrator;
pub mod prompt;
pub mod provision;
pub mod resolver;

pub use engine::{ChangeLog, ClaimMutationEngine, EditOutcome};
pub use error::EditError;
pub use ops::{Direction, EditOp, Polarity};
pub use orchestrator::{EditOrchestrator, EditReport, EditUserOptions};
pub use prompt::{Prompt, PromptError, PromptSpec, PromptValue, ScriptedPrompt};
pub use provision::{AddOperatorOptions, AddUserOptions, EditAccountOptions, Provisioner};
pub use resolver::{ResolvedSigner, SignerSource, SigningKeyResolver, ACCOUNT_KEYWORD};
