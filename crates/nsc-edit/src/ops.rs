//! # Edit Operations
//!
//! The typed edit batch. Flags and interactive answers both produce a
//! `Vec<EditOp>`; the engine does not know which one it came from.
//!
//! Numeric and temporal values are parsed by whoever builds the op, so an
//! op always carries a typed value. Set-valued ops carry raw text; the
//! engine splits it on commas, normalizes it and validates it, so a bad
//! entry aborts the batch with the field named.

use std::time::Duration;

/// Publish, subscribe, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Publish list.
    Pub,
    /// Subscribe list.
    Sub,
    /// Both lists.
    PubSub,
}

impl Direction {
    fn label(&self) -> &'static str {
        match self {
            Self::Pub => "pub",
            Self::Sub => "sub",
            Self::PubSub => "pub and sub",
        }
    }

    /// Whether the publish list is affected.
    pub fn includes_pub(&self) -> bool {
        matches!(self, Self::Pub | Self::PubSub)
    }

    /// Whether the subscribe list is affected.
    pub fn includes_sub(&self) -> bool {
        matches!(self, Self::Sub | Self::PubSub)
    }
}

/// Allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Allow list.
    Allow,
    /// Deny list.
    Deny,
}

impl Polarity {
    fn label(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

/// One field-level edit of a user claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// Union comma-separated tags, lowercased.
    AddTag(Vec<String>),
    /// Remove tags, lowercased.
    RemoveTag(Vec<String>),
    /// Union subjects into permission lists.
    AddPermission {
        /// Which direction(s).
        direction: Direction,
        /// Allow or deny.
        polarity: Polarity,
        /// Subjects, possibly comma-separated.
        values: Vec<String>,
    },
    /// Remove values from all four permission lists and from `src`.
    Remove(Vec<String>),
    /// Union CIDRs into `src`.
    AddSourceNetwork(Vec<String>),
    /// Remove CIDRs from `src`.
    RemoveSourceNetwork(Vec<String>),
    /// Append a `HH:MM:SS-HH:MM:SS` window.
    AddTimeRange(String),
    /// Remove every window starting at exactly this time.
    RemoveTimeRange(String),
    /// Set the locale; empty resets to UTC.
    SetLocale(String),
    /// Max payload bytes; negative means unlimited.
    SetPayload(i64),
    /// Max data bytes; negative means unlimited.
    SetData(i64),
    /// Max subscriptions; negative means unlimited.
    SetSubs(i64),
    /// Enable response permissions, overriding the given fields.
    SetResponsePermissions {
        /// Max responses; `None` keeps the current value (1 when newly
        /// enabled).
        max_msgs: Option<i64>,
        /// Permission TTL; `None` keeps the current value.
        ttl: Option<Duration>,
    },
    /// Disable response permissions.
    RemoveResponsePermissions,
    /// Set the bearer flag.
    SetBearer(bool),
    /// Allow connection types.
    AddConnectionType(Vec<String>),
    /// Disallow connection types.
    RemoveConnectionType(Vec<String>),
    /// Not-before, epoch seconds; `0` clears.
    SetNotBefore(i64),
    /// Expiry, epoch seconds; `0` clears.
    SetExpiry(i64),
}

impl EditOp {
    /// Add to one or both permission lists.
    pub fn permission(direction: Direction, polarity: Polarity, values: Vec<String>) -> Self {
        Self::AddPermission {
            direction,
            polarity,
            values,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddTag(_) => "add-tag",
            Self::RemoveTag(_) => "remove-tag",
            Self::AddPermission { .. } => "add-permission",
            Self::Remove(_) => "remove",
            Self::AddSourceNetwork(_) => "add-source-network",
            Self::RemoveSourceNetwork(_) => "remove-source-network",
            Self::AddTimeRange(_) => "add-time-range",
            Self::RemoveTimeRange(_) => "remove-time-range",
            Self::SetLocale(_) => "set-locale",
            Self::SetPayload(_) => "set-payload",
            Self::SetData(_) => "set-data",
            Self::SetSubs(_) => "set-subs",
            Self::SetResponsePermissions { .. } => "set-response-permissions",
            Self::RemoveResponsePermissions => "remove-response-permissions",
            Self::SetBearer(_) => "set-bearer",
            Self::AddConnectionType(_) => "add-connection-type",
            Self::RemoveConnectionType(_) => "remove-connection-type",
            Self::SetNotBefore(_) => "set-not-before",
            Self::SetExpiry(_) => "set-expiry",
        }
    }

    pub(crate) fn permission_label(direction: Direction, polarity: Polarity) -> String {
        format!("{} {}", direction.label(), polarity.label())
    }
}

/// Split comma-separated values, trimming whitespace and dropping empties.
pub fn split_values<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .flat_map(|r| r.as_ref().split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// [`split_values()`], lowercased.
pub fn split_lower<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    split_values(raw).into_iter().map(|v| v.to_lowercase()).collect()
}
