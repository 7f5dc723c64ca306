//! # Claim Mutation Engine
//!
//! Applies an ordered batch of [`EditOp`]s to a user claim and re-signs it.
//!
//! ## Invariants
//!
//! - The caller's claim is never touched. The batch runs against a clone;
//!   the first failing op discards the clone.
//! - Ops run in order and see the effects of earlier ops.
//! - Each applied op adds exactly one change-log line.
//! - Tags, permission subjects and source networks are lowercased. All
//!   set-valued fields are sets, so re-adding is a no-op and removing a
//!   non-member is a no-op.
//! - After the batch, the signer is re-resolved and the trust-chain fields
//!   restamped before signing. A resolution or signing failure aborts the
//!   edit.

use std::collections::BTreeSet;

use nsc_claims::user::{validate_cidr, validate_locale};
use nsc_claims::{Claim, ClaimToken, ConnectionType, TimeRange, UserPayload};
use nsc_core::{format_duration, format_epoch, normalize_limit, unix_now, NO_LIMIT};
use nsc_crypto::KeyMaterialStore;

use crate::error::{from_claim_validation, EditError};
use crate::ops::{split_lower, split_values, EditOp, Polarity};
use crate::resolver::{SignerSource, SigningKeyResolver};

/// Human-readable record of applied edits, one line per op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeLog(Vec<String>);

impl ChangeLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    /// The recorded lines.
    pub fn lines(&self) -> &[String] {
        &self.0
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any line contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.0.iter().any(|l| l.contains(needle))
    }
}

impl std::fmt::Display for ChangeLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.0 {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Result of a successful edit.
#[derive(Debug)]
pub struct EditOutcome {
    /// The re-signed claim.
    pub token: ClaimToken,
    /// One line per applied op.
    pub change_log: ChangeLog,
    /// How the signer was chosen.
    pub signer_source: SignerSource,
}

/// Applies edit batches and re-signs.
pub struct ClaimMutationEngine<'a> {
    resolver: SigningKeyResolver<'a>,
}

impl<'a> ClaimMutationEngine<'a> {
    /// An engine resolving signers from `keys`.
    pub fn new(keys: &'a dyn KeyMaterialStore) -> Self {
        Self {
            resolver: SigningKeyResolver::new(keys),
        }
    }

    /// Apply `ops` to a copy of `claim`. Does not sign.
    pub fn apply(claim: &Claim, ops: &[EditOp]) -> Result<(Claim, ChangeLog), EditError> {
        if ops.is_empty() {
            return Err(EditError::NoEditSpecified);
        }
        claim.user()?;

        let mut edited = claim.clone();
        let mut log = ChangeLog::new();
        for op in ops {
            let line = apply_op(&mut edited, op)?;
            tracing::trace!(op = op.name(), "{line}");
            log.push(line);
        }

        if edited.nbf != 0 && edited.exp != 0 && edited.exp <= edited.nbf {
            return Err(EditError::validation(
                "expiry",
                &format_epoch(edited.exp),
                format!("must be after not-before {}", format_epoch(edited.nbf)),
            ));
        }
        Ok((edited, log))
    }

    /// Apply `ops` to `stored`, re-resolve the signer under `account`,
    /// restamp and sign.
    pub fn edit(
        &self,
        stored: &Claim,
        account: &Claim,
        ops: &[EditOp],
        explicit_key: Option<&str>,
    ) -> Result<EditOutcome, EditError> {
        let (mut claim, change_log) = Self::apply(stored, ops)?;
        let signer = self.resolver.resolve(explicit_key, account, Some(&stored.iss))?;
        signer.stamp(&mut claim);
        claim.stamp(unix_now())?;
        let token = ClaimToken::sign(claim, &signer.key)?;
        Ok(EditOutcome {
            token,
            change_log,
            signer_source: signer.source,
        })
    }
}

fn limit_text(v: i64) -> String {
    if v == NO_LIMIT {
        "unlimited".to_string()
    } else {
        v.to_string()
    }
}

fn require_values(field: &'static str, raw: &[String], values: Vec<String>) -> Result<Vec<String>, EditError> {
    if values.is_empty() {
        return Err(EditError::validation(field, &raw.join(","), "no values given"));
    }
    Ok(values)
}

fn apply_op(claim: &mut Claim, op: &EditOp) -> Result<String, EditError> {
    match op {
        EditOp::SetNotBefore(t) => {
            claim.nbf = (*t).max(0);
            Ok(format!("changed not before to {}", format_epoch(claim.nbf)))
        }
        EditOp::SetExpiry(t) => {
            claim.exp = (*t).max(0);
            Ok(format!("changed expiry to {}", format_epoch(claim.exp)))
        }
        other => apply_user_op(claim.user_mut()?, other),
    }
}

/// `removed tag a (tags now: b, c)`, or a no-op notice when nothing matched.
fn removal_line(
    what: &str,
    field: &str,
    requested: &[String],
    removed: &[String],
    remaining: &BTreeSet<String>,
) -> String {
    if removed.is_empty() {
        return format!("{what} {} not present, nothing removed", requested.join(", "));
    }
    let now = if remaining.is_empty() {
        "none".to_string()
    } else {
        remaining.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    format!("removed {what} {} ({field} now: {now})", removed.join(", "))
}

fn apply_user_op(user: &mut UserPayload, op: &EditOp) -> Result<String, EditError> {
    let line = match op {
        EditOp::AddTag(raw) => {
            let tags = require_values("tag", raw, split_lower(raw))?;
            user.tags.extend(tags.iter().cloned());
            format!("added tag {}", tags.join(", "))
        }
        EditOp::RemoveTag(raw) => {
            let tags = require_values("tag", raw, split_lower(raw))?;
            let removed: Vec<String> = tags.iter().filter(|t| user.tags.remove(*t)).cloned().collect();
            removal_line("tag", "tags", &tags, &removed, &user.tags)
        }
        EditOp::AddPermission {
            direction,
            polarity,
            values,
        } => {
            let subjects = require_values("subject", values, split_lower(values))?;
            let mut targets = Vec::new();
            if direction.includes_pub() {
                targets.push(&mut user.publish);
            }
            if direction.includes_sub() {
                targets.push(&mut user.subscribe);
            }
            for perm in targets {
                let list = match polarity {
                    Polarity::Allow => &mut perm.allow,
                    Polarity::Deny => &mut perm.deny,
                };
                list.extend(subjects.iter().cloned());
            }
            format!(
                "added {} {}",
                EditOp::permission_label(*direction, *polarity),
                subjects.join(", ")
            )
        }
        EditOp::Remove(raw) => {
            let values = require_values("value", raw, split_lower(raw))?;
            let mut parts = Vec::new();
            for v in &values {
                let lists = [
                    ("pub allow", &mut user.publish.allow),
                    ("pub deny", &mut user.publish.deny),
                    ("sub allow", &mut user.subscribe.allow),
                    ("sub deny", &mut user.subscribe.deny),
                    ("source networks", &mut user.src),
                ];
                let from: Vec<&str> = lists
                    .into_iter()
                    .filter_map(|(label, list)| list.remove(v).then_some(label))
                    .collect();
                if from.is_empty() {
                    parts.push(format!("{v} not present"));
                } else {
                    parts.push(format!("removed {v} from {}", from.join(", ")));
                }
            }
            parts.join("; ")
        }
        EditOp::AddSourceNetwork(raw) => {
            let mut nets = Vec::new();
            for v in require_values("source network", raw, split_values(raw))? {
                nets.push(validate_cidr(&v).map_err(from_claim_validation)?);
            }
            user.src.extend(nets.iter().cloned());
            format!("added source network {}", nets.join(", "))
        }
        EditOp::RemoveSourceNetwork(raw) => {
            let nets = require_values("source network", raw, split_lower(raw))?;
            let removed: Vec<String> = nets.iter().filter(|n| user.src.remove(*n)).cloned().collect();
            removal_line("source network", "source networks", &nets, &removed, &user.src)
        }
        EditOp::AddTimeRange(raw) => {
            let range = TimeRange::parse(raw).map_err(from_claim_validation)?;
            let line = format!("added time range {range}");
            user.times.push(range);
            line
        }
        EditOp::RemoveTimeRange(start) => {
            let start = start.trim();
            user.times.retain(|r| r.start != start);
            format!("removed time range starting {start}")
        }
        EditOp::SetLocale(name) => {
            user.locale = validate_locale(name).map_err(from_claim_validation)?;
            format!("changed locale to {}", user.locale)
        }
        EditOp::SetPayload(n) => {
            user.limits.payload = normalize_limit(*n);
            format!("changed max payload to {}", limit_text(user.limits.payload))
        }
        EditOp::SetData(n) => {
            user.limits.data = normalize_limit(*n);
            format!("changed max data to {}", limit_text(user.limits.data))
        }
        EditOp::SetSubs(n) => {
            user.limits.subs = normalize_limit(*n);
            format!("changed max subscriptions to {}", limit_text(user.limits.subs))
        }
        EditOp::SetResponsePermissions { max_msgs, ttl } => {
            let mut resp = user.resp.unwrap_or_default();
            if let Some(max) = max_msgs {
                resp.max = normalize_limit(*max);
            }
            if let Some(ttl) = ttl {
                resp.ttl = *ttl;
            }
            user.resp = Some(resp);
            format!(
                "set response permissions: max {}, ttl {}",
                limit_text(resp.max),
                format_duration(resp.ttl)
            )
        }
        EditOp::RemoveResponsePermissions => {
            user.resp = None;
            "removed response permissions".to_string()
        }
        EditOp::SetBearer(value) => {
            let old = user.bearer_token;
            user.bearer_token = *value;
            format!("changed bearer to {value} (was {old})")
        }
        EditOp::AddConnectionType(raw) => {
            let mut types = Vec::new();
            for v in require_values("connection type", raw, split_values(raw))? {
                types.push(ConnectionType::parse(&v).map_err(from_claim_validation)?);
            }
            user.allowed_connection_types.extend(types.iter().copied());
            format!("added connection type {}", join_types(&types))
        }
        EditOp::RemoveConnectionType(raw) => {
            let mut types = Vec::new();
            for v in require_values("connection type", raw, split_values(raw))? {
                types.push(ConnectionType::parse(&v).map_err(from_claim_validation)?);
            }
            for t in &types {
                user.allowed_connection_types.remove(t);
            }
            format!("removed connection type {}", join_types(&types))
        }
        EditOp::SetNotBefore(_) | EditOp::SetExpiry(_) => {
            return Err(EditError::validation(
                "edit",
                op.name(),
                "validity window is not a user payload field",
            ))
        }
    };
    Ok(line)
}

fn join_types(types: &[ConnectionType]) -> String {
    types.iter().map(ConnectionType::as_str).collect::<Vec<_>>().join(", ")
}
