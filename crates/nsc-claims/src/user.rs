//! # User Claim Payload
//!
//! The leaf credential. Holds the permission lists, connection
//! restrictions and limits a messaging server enforces for one user.
//!
//! Set-valued fields are `BTreeSet`s: membership is what matters, and the
//! sorted order keeps canonical bytes stable across edits. `times` is the
//! one ordered field, since overlapping windows are kept as entered.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Duration;

use chrono::NaiveTime;
use nsc_core::NO_LIMIT;
use serde::{Deserialize, Serialize};

use crate::error::ClaimError;

/// Locale used when none is set.
pub const DEFAULT_LOCALE: &str = "UTC";

/// Payload of a user claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    /// Free-form labels, lowercased.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Publish permissions.
    #[serde(rename = "pub", default)]
    pub publish: Permission,

    /// Subscribe permissions.
    #[serde(rename = "sub", default)]
    pub subscribe: Permission,

    /// Source networks the user may connect from (CIDR).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub src: BTreeSet<String>,

    /// Wall-clock windows during which connections are allowed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub times: Vec<TimeRange>,

    /// IANA time zone the `times` are interpreted in.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Connection limits.
    #[serde(default)]
    pub limits: UserLimits,

    /// Response permissions; present means enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resp: Option<ResponsePermission>,

    /// Whether the credential may be used without proof of key possession.
    #[serde(default)]
    pub bearer_token: bool,

    /// Connection types the user may use; empty means any.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub allowed_connection_types: BTreeSet<ConnectionType>,
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

impl Default for UserPayload {
    fn default() -> Self {
        Self {
            tags: BTreeSet::new(),
            publish: Permission::default(),
            subscribe: Permission::default(),
            src: BTreeSet::new(),
            times: Vec::new(),
            locale: default_locale(),
            limits: UserLimits::default(),
            resp: None,
            bearer_token: false,
            allowed_connection_types: BTreeSet::new(),
        }
    }
}

/// Allow and deny subject lists for one direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Subjects explicitly allowed.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub allow: BTreeSet<String>,
    /// Subjects explicitly denied.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub deny: BTreeSet<String>,
}

impl Permission {
    /// Whether both lists are empty.
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}

/// Subscription, data and payload limits. `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLimits {
    /// Maximum number of subscriptions.
    pub subs: i64,
    /// Maximum bytes transferred.
    pub data: i64,
    /// Maximum message payload size in bytes.
    pub payload: i64,
}

impl Default for UserLimits {
    fn default() -> Self {
        Self {
            subs: NO_LIMIT,
            data: NO_LIMIT,
            payload: NO_LIMIT,
        }
    }
}

/// Permission to publish replies to request inboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePermission {
    /// Maximum number of responses per request.
    pub max: i64,
    /// How long the permission lasts after the request.
    #[serde(with = "ttl_nanos")]
    pub ttl: Duration,
}

impl Default for ResponsePermission {
    fn default() -> Self {
        Self {
            max: 1,
            ttl: Duration::ZERO,
        }
    }
}

/// TTLs are stored as integer nanoseconds.
mod ttl_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(d.as_nanos())
            .map_err(|_| serde::ser::Error::custom("ttl exceeds u64 nanoseconds"))?;
        s.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_nanos)
    }
}

/// A daily connection window, `HH:MM:SS` to `HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Window start.
    pub start: String,
    /// Window end.
    pub end: String,
}

impl TimeRange {
    /// Parse `HH:MM:SS-HH:MM:SS`.
    pub fn parse(value: &str) -> Result<Self, ClaimError> {
        let (start, end) = value
            .trim()
            .split_once('-')
            .ok_or_else(|| ClaimError::invalid("time range", value, "expected HH:MM:SS-HH:MM:SS"))?;
        let start = validate_clock(start.trim(), value)?;
        let end = validate_clock(end.trim(), value)?;
        Ok(Self { start, end })
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

fn validate_clock(part: &str, whole: &str) -> Result<String, ClaimError> {
    NaiveTime::parse_from_str(part, "%H:%M:%S")
        .map(|_| part.to_string())
        .map_err(|e| ClaimError::invalid("time range", whole, format!("{part:?}: {e}")))
}

/// Transport a user may connect over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionType {
    /// Plain client connection.
    Standard,
    /// Client over WebSocket.
    Websocket,
    /// Leaf node connection.
    Leafnode,
    /// Leaf node over WebSocket.
    LeafnodeWs,
    /// MQTT client.
    Mqtt,
    /// MQTT over WebSocket.
    MqttWs,
    /// In-process client.
    InProcess,
}

impl ConnectionType {
    /// Every known connection type.
    pub const ALL: [ConnectionType; 7] = [
        Self::Standard,
        Self::Websocket,
        Self::Leafnode,
        Self::LeafnodeWs,
        Self::Mqtt,
        Self::MqttWs,
        Self::InProcess,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Websocket => "WEBSOCKET",
            Self::Leafnode => "LEAFNODE",
            Self::LeafnodeWs => "LEAFNODE_WS",
            Self::Mqtt => "MQTT",
            Self::MqttWs => "MQTT_WS",
            Self::InProcess => "IN_PROCESS",
        }
    }

    /// Parse a connection type name, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, ClaimError> {
        let upper = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|t| t.as_str()).collect();
                ClaimError::invalid(
                    "connection type",
                    value,
                    format!("expected one of {}", known.join(", ")),
                )
            })
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate and normalize a source network. Accepts CIDR notation only.
pub fn validate_cidr(value: &str) -> Result<String, ClaimError> {
    let v = value.trim().to_lowercase();
    let (addr, prefix) = v
        .split_once('/')
        .ok_or_else(|| ClaimError::invalid("source network", value, "expected CIDR notation"))?;
    let addr: IpAddr = addr
        .parse()
        .map_err(|e| ClaimError::invalid("source network", value, format!("{e}")))?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| ClaimError::invalid("source network", value, "prefix is not a number"))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(ClaimError::invalid(
            "source network",
            value,
            format!("prefix length exceeds {max}"),
        ));
    }
    Ok(v)
}

/// Validate a locale. Empty resets to [`DEFAULT_LOCALE`].
pub fn validate_locale(value: &str) -> Result<String, ClaimError> {
    let v = value.trim();
    if v.is_empty() {
        return Ok(default_locale());
    }
    v.parse::<chrono_tz::Tz>()
        .map(|tz| tz.name().to_string())
        .map_err(|_| ClaimError::invalid("locale", value, "unknown time zone"))
}
