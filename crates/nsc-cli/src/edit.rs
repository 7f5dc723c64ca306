//! # Edit Subcommand
//!
//! - `edit user`: change a user claim in place and re-sign it.
//! - `edit account`: add or remove account signing keys.
//!
//! Flags become one batch of [`EditOp`]s in a fixed order: tags,
//! permissions, removals, networks, times, locale, limits, response
//! permissions, bearer, connection types, validity window. Repeated flags
//! keep their command-line order within their group.

use std::time::Duration;

use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::{Args, Subcommand};
use nsc_core::{parse_data_size, parse_duration, parse_expiry, parse_limit};
use nsc_edit::{
    Direction, EditAccountOptions, EditOp, EditOrchestrator, EditUserOptions, Polarity, Prompt, Provisioner,
};

use crate::context::Context;
use crate::print_lines;
use crate::prompt::TerminalPrompt;

/// Arguments for `nsc edit`.
#[derive(Args, Debug)]
pub struct EditArgs {
    #[command(subcommand)]
    pub command: EditCommand,
}

/// Edit subcommands.
#[derive(Subcommand, Debug)]
pub enum EditCommand {
    /// Edit a user.
    User(EditUserArgs),
    /// Edit an account's signing keys.
    Account(EditAccountArgs),
}

/// Permission and tag flags shared by `add user` and `edit user`.
#[derive(Args, Debug, Clone, Default)]
pub struct PermissionArgs {
    /// Add tags (comma separated, lowercased).
    #[arg(long = "tag")]
    pub tag: Vec<String>,

    /// Allow publishing to subjects.
    #[arg(long)]
    pub allow_pub: Vec<String>,

    /// Allow subscribing to subjects.
    #[arg(long)]
    pub allow_sub: Vec<String>,

    /// Allow publishing and subscribing to subjects.
    #[arg(long)]
    pub allow_pubsub: Vec<String>,

    /// Deny publishing to subjects.
    #[arg(long)]
    pub deny_pub: Vec<String>,

    /// Deny subscribing to subjects.
    #[arg(long)]
    pub deny_sub: Vec<String>,

    /// Deny publishing and subscribing to subjects.
    #[arg(long)]
    pub deny_pubsub: Vec<String>,

    /// Allow replies to request inboxes, optionally with a max count
    /// (`--allow-pub-response=100`).
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "1",
        value_parser = parse_limit,
        conflicts_with = "max_responses",
    )]
    pub allow_pub_response: Option<i64>,

    /// Max number of responses to a request.
    #[arg(long, allow_hyphen_values = true, value_parser = parse_limit)]
    pub max_responses: Option<i64>,

    /// How long the response permission lasts (`2ms`, `1s`, `1h30m`).
    #[arg(long, value_parser = parse_duration)]
    pub response_ttl: Option<Duration>,

    /// Credential may be used without proof of key possession
    /// (`--bearer`, `--bearer=false`).
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
    )]
    pub bearer: Option<bool>,
}

impl PermissionArgs {
    fn push_adds(&self, ops: &mut Vec<EditOp>) {
        if !self.tag.is_empty() {
            ops.push(EditOp::AddTag(self.tag.clone()));
        }
        let lists = [
            (Direction::Pub, Polarity::Allow, &self.allow_pub),
            (Direction::Sub, Polarity::Allow, &self.allow_sub),
            (Direction::PubSub, Polarity::Allow, &self.allow_pubsub),
            (Direction::Pub, Polarity::Deny, &self.deny_pub),
            (Direction::Sub, Polarity::Deny, &self.deny_sub),
            (Direction::PubSub, Polarity::Deny, &self.deny_pubsub),
        ];
        for (direction, polarity, values) in lists {
            if !values.is_empty() {
                ops.push(EditOp::permission(direction, polarity, values.clone()));
            }
        }
    }

    fn push_response(&self, ops: &mut Vec<EditOp>) {
        if self.allow_pub_response.is_some() || self.max_responses.is_some() || self.response_ttl.is_some() {
            ops.push(EditOp::SetResponsePermissions {
                max_msgs: self.allow_pub_response.or(self.max_responses),
                ttl: self.response_ttl,
            });
        }
    }

    fn push_bearer(&self, ops: &mut Vec<EditOp>) {
        if let Some(b) = self.bearer {
            ops.push(EditOp::SetBearer(b));
        }
    }

    /// Ops for a newly added user.
    pub fn to_ops(&self) -> Vec<EditOp> {
        let mut ops = Vec::new();
        self.push_adds(&mut ops);
        self.push_response(&mut ops);
        self.push_bearer(&mut ops);
        ops
    }
}

/// Arguments for `nsc edit user`.
#[derive(Args, Debug, Clone, Default)]
pub struct EditUserArgs {
    /// User to edit.
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Account the user belongs to.
    #[arg(short = 'a', long)]
    pub account: Option<String>,

    #[command(flatten)]
    pub permissions: PermissionArgs,

    /// Remove tags.
    #[arg(long)]
    pub rm_tag: Vec<String>,

    /// Remove subjects from every permission list, and networks from the
    /// source network list.
    #[arg(long)]
    pub rm: Vec<String>,

    /// Allow connections from CIDR networks.
    #[arg(long)]
    pub source_network: Vec<String>,

    /// Remove source networks.
    #[arg(long)]
    pub rm_source_network: Vec<String>,

    /// Allow connections during a daily window `HH:MM:SS-HH:MM:SS`.
    #[arg(long)]
    pub time: Vec<String>,

    /// Remove the windows starting at `HH:MM:SS`.
    #[arg(long)]
    pub rm_time: Vec<String>,

    /// Time zone for `--time` windows; empty resets to UTC.
    #[arg(long)]
    pub locale: Option<String>,

    /// Max message payload (`1024`, `1K`, `1Kib`; `-1` is unlimited).
    #[arg(long, allow_hyphen_values = true, value_parser = parse_data_size)]
    pub payload: Option<i64>,

    /// Max data in flight (`-1` is unlimited).
    #[arg(long, allow_hyphen_values = true, value_parser = parse_data_size)]
    pub data: Option<i64>,

    /// Max subscriptions (`-1` is unlimited).
    #[arg(long, allow_hyphen_values = true, value_parser = parse_limit)]
    pub subs: Option<i64>,

    /// Remove response permissions.
    #[arg(long, conflicts_with_all = ["allow_pub_response", "max_responses", "response_ttl"])]
    pub rm_response_perms: bool,

    /// Allow connection types (`STANDARD`, `WEBSOCKET`, `LEAFNODE`, `MQTT`, ...).
    #[arg(long)]
    pub conn_type: Vec<String>,

    /// Disallow connection types.
    #[arg(long)]
    pub rm_conn_type: Vec<String>,

    /// Valid from (`0`, `2024-01-01`, RFC 3339, or relative like `1w`).
    #[arg(long, value_parser = parse_expiry)]
    pub start: Option<i64>,

    /// Valid until (`0`, `2024-01-01`, RFC 3339, or relative like `1y`).
    #[arg(long, value_parser = parse_expiry)]
    pub expiry: Option<i64>,
}

impl EditUserArgs {
    /// The edit batch these flags describe.
    pub fn to_ops(&self) -> Vec<EditOp> {
        let mut ops = Vec::new();
        self.permissions.push_adds(&mut ops);
        if !self.rm_tag.is_empty() {
            ops.push(EditOp::RemoveTag(self.rm_tag.clone()));
        }
        if !self.rm.is_empty() {
            ops.push(EditOp::Remove(self.rm.clone()));
        }
        if !self.source_network.is_empty() {
            ops.push(EditOp::AddSourceNetwork(self.source_network.clone()));
        }
        if !self.rm_source_network.is_empty() {
            ops.push(EditOp::RemoveSourceNetwork(self.rm_source_network.clone()));
        }
        ops.extend(self.time.iter().cloned().map(EditOp::AddTimeRange));
        ops.extend(self.rm_time.iter().cloned().map(EditOp::RemoveTimeRange));
        if let Some(locale) = &self.locale {
            ops.push(EditOp::SetLocale(locale.clone()));
        }
        if let Some(n) = self.payload {
            ops.push(EditOp::SetPayload(n));
        }
        if let Some(n) = self.data {
            ops.push(EditOp::SetData(n));
        }
        if let Some(n) = self.subs {
            ops.push(EditOp::SetSubs(n));
        }
        self.permissions.push_response(&mut ops);
        if self.rm_response_perms {
            ops.push(EditOp::RemoveResponsePermissions);
        }
        self.permissions.push_bearer(&mut ops);
        if !self.conn_type.is_empty() {
            ops.push(EditOp::AddConnectionType(self.conn_type.clone()));
        }
        if !self.rm_conn_type.is_empty() {
            ops.push(EditOp::RemoveConnectionType(self.rm_conn_type.clone()));
        }
        if let Some(t) = self.start {
            ops.push(EditOp::SetNotBefore(t));
        }
        if let Some(t) = self.expiry {
            ops.push(EditOp::SetExpiry(t));
        }
        ops
    }

    /// Orchestrator options for these flags.
    pub fn to_options(&self, private_key: Option<&str>, interactive: bool) -> EditUserOptions {
        EditUserOptions {
            account: self.account.clone(),
            user: self.name.clone(),
            signing_key: private_key.map(str::to_string),
            interactive,
            ops: self.to_ops(),
        }
    }
}

/// Arguments for `nsc edit account`.
#[derive(Args, Debug, Clone, Default)]
pub struct EditAccountArgs {
    /// Account to edit.
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Add a signing key: an account public key, or `generate`.
    #[arg(long)]
    pub sk: Vec<String>,

    /// Remove a signing key.
    #[arg(long)]
    pub rm_sk: Vec<String>,
}

/// Dispatch `nsc edit`.
pub fn run_edit(args: &EditArgs, ctx: &Context) -> Result<u8> {
    match &args.command {
        EditCommand::User(user) => cmd_edit_user(user, ctx),
        EditCommand::Account(account) => cmd_edit_account(account, ctx),
    }
}

fn cmd_edit_user(args: &EditUserArgs, ctx: &Context) -> Result<u8> {
    let store = ctx.open_store()?;
    let opts = args.to_options(ctx.flags.private_key.as_deref(), ctx.flags.interactive);
    let orchestrator = EditOrchestrator::new(&store, &ctx.keys).with_default_account(ctx.config.account.clone());

    let mut terminal = TerminalPrompt::stdio();
    let prompt: Option<&mut dyn Prompt> = if ctx.flags.interactive { Some(&mut terminal) } else { None };
    let report = orchestrator.edit_user(&opts, prompt)?;
    print_lines(&report.lines());
    Ok(0)
}

fn cmd_edit_account(args: &EditAccountArgs, ctx: &Context) -> Result<u8> {
    let store = ctx.open_store()?;
    let opts = EditAccountOptions {
        account: args.name.clone(),
        add_signing_keys: args.sk.clone(),
        remove_signing_keys: args.rm_sk.clone(),
    };
    let log = Provisioner::new(&store, &ctx.keys)
        .with_default_account(ctx.config.account.clone())
        .edit_account(&opts)?;
    print_lines(log.lines());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        args: EditUserArgs,
    }

    fn parse(argv: &[&str]) -> EditUserArgs {
        let mut full = vec!["edit-user"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn no_flags_no_ops() {
        assert!(parse(&[]).to_ops().is_empty());
    }

    #[test]
    fn permission_flags_in_fixed_order() {
        let ops = parse(&["--deny-pubsub", "bar", "--allow-pub", "a,b", "--allow-pubsub", "c", "--deny-pub", "foo"]).to_ops();
        assert_eq!(
            ops,
            vec![
                EditOp::permission(Direction::Pub, Polarity::Allow, vec!["a,b".into()]),
                EditOp::permission(Direction::PubSub, Polarity::Allow, vec!["c".into()]),
                EditOp::permission(Direction::Pub, Polarity::Deny, vec!["foo".into()]),
                EditOp::permission(Direction::PubSub, Polarity::Deny, vec!["bar".into()]),
            ]
        );
    }

    #[test]
    fn response_shorthand_and_explicit_count() {
        let ops = parse(&["--allow-pub-response"]).to_ops();
        assert_eq!(ops, vec![EditOp::SetResponsePermissions { max_msgs: Some(1), ttl: None }]);

        let ops = parse(&["--allow-pub-response=100"]).to_ops();
        assert_eq!(ops, vec![EditOp::SetResponsePermissions { max_msgs: Some(100), ttl: None }]);

        let ops = parse(&["--max-responses", "1000", "--response-ttl", "4ms"]).to_ops();
        assert_eq!(
            ops,
            vec![EditOp::SetResponsePermissions {
                max_msgs: Some(1000),
                ttl: Some(Duration::from_millis(4)),
            }]
        );
    }

    #[test]
    fn response_shorthand_conflicts_with_max_responses() {
        let argv = ["edit-user", "--allow-pub-response=5", "--max-responses", "10"];
        assert!(Harness::try_parse_from(argv).is_err());
        let argv = ["edit-user", "--allow-pub-response", "--max-responses", "10"];
        assert!(Harness::try_parse_from(argv).is_err());
    }

    #[test]
    fn rm_response_perms_conflicts_with_setting_them() {
        let argv = ["edit-user", "--rm-response-perms", "--max-responses", "3"];
        assert!(Harness::try_parse_from(argv).is_err());
        assert_eq!(parse(&["--rm-response-perms"]).to_ops(), vec![EditOp::RemoveResponsePermissions]);
    }

    #[test]
    fn bearer_forms() {
        assert_eq!(parse(&["--bearer"]).to_ops(), vec![EditOp::SetBearer(true)]);
        assert_eq!(parse(&["--bearer=false"]).to_ops(), vec![EditOp::SetBearer(false)]);
    }

    #[test]
    fn sizes_and_negative_limits() {
        let ops = parse(&["--data", "1Kib", "--payload", "-1", "--subs", "100"]).to_ops();
        assert_eq!(ops, vec![EditOp::SetPayload(-1), EditOp::SetData(1024), EditOp::SetSubs(100)]);
    }

    #[test]
    fn times_and_empty_locale() {
        let ops = parse(&["--time", "16:04:05-17:04:09", "--time", "18:04:05-19:04:09", "--locale", ""]).to_ops();
        assert_eq!(
            ops,
            vec![
                EditOp::AddTimeRange("16:04:05-17:04:09".into()),
                EditOp::AddTimeRange("18:04:05-19:04:09".into()),
                EditOp::SetLocale(String::new()),
            ]
        );
    }

    #[test]
    fn validity_window_flags() {
        let ops = parse(&["--start", "2018-01-01", "--expiry", "0"]).to_ops();
        assert_eq!(ops, vec![EditOp::SetNotBefore(1_514_764_800), EditOp::SetExpiry(0)]);
        let argv = ["edit-user", "--expiry", "soon"];
        assert!(Harness::try_parse_from(argv).is_err());
    }

    #[test]
    fn options_carry_selection_and_key() {
        let args = parse(&["-n", "u", "-a", "A", "--subs", "1"]);
        let opts = args.to_options(Some("account"), false);
        assert_eq!(opts.user.as_deref(), Some("u"));
        assert_eq!(opts.account.as_deref(), Some("A"));
        assert_eq!(opts.signing_key.as_deref(), Some("account"));
        assert_eq!(opts.ops.len(), 1);
    }
}
