//! `edit user` end to end over a file-backed store and key store.

mod common;

use std::time::Duration;

use clap::Parser;
use nsc_claims::{ConnectionType, TimeRange};
use nsc_cli::add::AddUserArgs;
use nsc_core::NO_LIMIT;
use nsc_edit::{EditError, PromptValue};
use nsc_state::CommandPath;

use common::TestStore;

#[derive(Parser, Debug)]
struct AddUserCli {
    #[command(flatten)]
    args: AddUserArgs,
}

fn add_user_flags(ts: &mut TestStore, account: &str, argv: &[&str]) {
    let mut full = vec!["add-user"];
    full.extend_from_slice(argv);
    let cli = AddUserCli::try_parse_from(full).unwrap();
    let opts = cli.args.to_options(None);
    ts.add_user_with(account, &opts.name, None, opts.ops);
}

fn sorted(values: &[&str]) -> Vec<String> {
    let mut v: Vec<String> = values.iter().map(|s| s.to_string()).collect();
    v.sort();
    v
}

fn set(values: &std::collections::BTreeSet<String>) -> Vec<String> {
    values.iter().cloned().collect()
}

#[test]
fn edit_requires_an_option_and_a_user() {
    let mut ts = TestStore::new("edit user");
    ts.add_user("A", "a");
    ts.add_user("B", "b");
    ts.add_user("B", "bb");

    assert!(matches!(ts.edit_user(&[]), Err(EditError::NoEditSpecified)));
    assert!(ts.edit_user(&["--tag", "A", "--account", "A"]).is_ok());
    assert!(matches!(
        ts.edit_user(&["--tag", "B", "--account", "B"]),
        Err(EditError::UserNameRequired)
    ));

    let report = ts.edit_user(&["--tag", "B", "--account", "B", "-n", "bb"]).unwrap();
    assert_eq!(report.user, "bb");
    assert!(ts.user("B", "bb").tags.contains("b"));
}

#[test]
fn account_is_required_when_ambiguous() {
    let mut ts = TestStore::new("edit user");
    ts.add_user("A", "a");
    ts.add_user("B", "b");
    ts.current_account = None;

    assert!(matches!(ts.edit_user(&["--tag", "A"]), Err(EditError::AccountRequired)));
}

#[test]
fn tags_are_lowercased_and_removed() {
    let mut ts = TestStore::new("edit user");
    ts.add_user("A", "a");

    ts.edit_user(&["--tag", "A,B,C"]).unwrap();
    assert_eq!(set(&ts.user("A", "a").tags), sorted(&["a", "b", "c"]));

    ts.edit_user(&["--rm-tag", "A,B"]).unwrap();
    assert_eq!(set(&ts.user("A", "a").tags), sorted(&["c"]));
}

#[test]
fn pub_sub_permissions_and_generic_remove() {
    let mut ts = TestStore::new("edit user");
    ts.add_user("A", "a");

    ts.edit_user(&[
        "--allow-pub",
        "a,b",
        "--allow-pubsub",
        "c",
        "--deny-pub",
        "foo",
        "--deny-pubsub",
        "bar",
    ])
    .unwrap();
    let user = ts.user("A", "a");
    assert_eq!(set(&user.publish.allow), sorted(&["a", "b", "c"]));
    assert_eq!(set(&user.subscribe.allow), sorted(&["c"]));
    assert_eq!(set(&user.publish.deny), sorted(&["foo", "bar"]));
    assert_eq!(set(&user.subscribe.deny), sorted(&["bar"]));

    ts.edit_user(&["--rm", "c,bar"]).unwrap();
    let user = ts.user("A", "a");
    assert_eq!(set(&user.publish.allow), sorted(&["a", "b"]));
    assert!(user.subscribe.allow.is_empty());
    assert_eq!(set(&user.publish.deny), sorted(&["foo"]));
    assert!(user.subscribe.deny.is_empty());
}

#[test]
fn source_networks() {
    let mut ts = TestStore::new("edit user");
    ts.add_user("A", "a");

    ts.edit_user(&["--source-network", "192.0.2.0/24,192.0.1.0/8"]).unwrap();
    assert_eq!(set(&ts.user("A", "a").src), sorted(&["192.0.2.0/24", "192.0.1.0/8"]));

    ts.edit_user(&["--rm-source-network", "192.0.2.0/24"]).unwrap();
    assert_eq!(set(&ts.user("A", "a").src), sorted(&["192.0.1.0/8"]));
}

#[test]
fn invalid_network_leaves_claim_untouched() {
    let mut ts = TestStore::new("edit user");
    ts.add_user("A", "a");
    let before = ts.user_claim("A", "a");

    assert!(ts.edit_user(&["--tag", "x", "--source-network", "not-a-cidr"]).is_err());
    assert_eq!(ts.user_claim("A", "a"), before);
}

#[test]
fn time_ranges_and_locale() {
    let mut ts = TestStore::new("edit user");
    ts.add_user("A", "a");

    ts.edit_user(&[
        "--time",
        "16:04:05-17:04:09",
        "--time",
        "18:04:05-19:04:09",
        "--locale",
        "America/New_York",
    ])
    .unwrap();
    let user = ts.user("A", "a");
    assert_eq!(
        user.times,
        vec![
            TimeRange {
                start: "16:04:05".into(),
                end: "17:04:09".into()
            },
            TimeRange {
                start: "18:04:05".into(),
                end: "19:04:09".into()
            },
        ]
    );
    assert_eq!(user.locale, "America/New_York");

    ts.edit_user(&["--rm-time", "16:04:05", "--locale", ""]).unwrap();
    let user = ts.user("A", "a");
    assert_eq!(
        user.times,
        vec![TimeRange {
            start: "18:04:05".into(),
            end: "19:04:09".into()
        }]
    );
    assert_eq!(user.locale, "UTC");
}

#[test]
fn payload_then_unlimited() {
    let mut ts = TestStore::new("edit user");
    ts.add_user("A", "U");

    ts.edit_user(&["--payload", "1000"]).unwrap();
    assert_eq!(ts.user("A", "U").limits.payload, 1000);

    ts.edit_user(&["--payload", "-1"]).unwrap();
    assert_eq!(ts.user("A", "U").limits.payload, NO_LIMIT);
}

#[test]
fn subs_default_then_set() {
    let mut ts = TestStore::new("O");
    ts.add_user("A", "U");
    assert_eq!(ts.user("A", "U").limits.subs, NO_LIMIT);

    ts.edit_user(&["--subs", "100"]).unwrap();
    assert_eq!(ts.user("A", "U").limits.subs, 100);
}

#[test]
fn data_accepts_binary_units() {
    let mut ts = TestStore::new("O");
    ts.add_user("A", "U");
    assert_eq!(ts.user("A", "U").limits.data, NO_LIMIT);

    ts.edit_user(&["--data", "1Kib"]).unwrap();
    assert_eq!(ts.user("A", "U").limits.data, 1024);
}

#[test]
fn response_permissions_set_edit_remove() {
    let mut ts = TestStore::new("O");
    ts.add_account("A");
    add_user_flags(&mut ts, "A", &["-n", "U", "--max-responses", "100", "--response-ttl", "2ms"]);
    assert!(ts.user("A", "U").resp.is_some());

    ts.edit_user(&["--max-responses", "1000", "--response-ttl", "4ms"]).unwrap();
    let resp = ts.user("A", "U").resp.unwrap();
    assert_eq!(resp.max, 1000);
    assert_eq!(resp.ttl, Duration::from_millis(4));

    ts.edit_user(&["--rm-response-perms"]).unwrap();
    assert!(ts.user("A", "U").resp.is_none());
}

#[test]
fn response_shorthand_defaults_to_one() {
    let mut ts = TestStore::new("O");
    ts.add_account("A");
    add_user_flags(&mut ts, "A", &["-n", "U", "--allow-pub-response", "--response-ttl", "2ms"]);
    assert_eq!(ts.user("A", "U").resp.unwrap().max, 1);

    ts.edit_user(&["-n", "U", "--allow-pub-response=100", "--response-ttl", "2ms"]).unwrap();
    assert_eq!(ts.user("A", "U").resp.unwrap().max, 100);

    ts.edit_user(&["--rm-response-perms"]).unwrap();
    assert!(ts.user("A", "U").resp.is_none());
}

#[test]
fn bearer_toggles_and_logs() {
    let mut ts = TestStore::new("O");
    ts.add_user("A", "U");
    assert!(!ts.user("A", "U").bearer_token);

    let report = ts.edit_user(&["--name", "U", "--bearer"]).unwrap();
    assert!(report.lines().iter().any(|l| l.contains("changed bearer to true")));
    assert!(ts.user("A", "U").bearer_token);

    let report = ts.edit_user(&["--name", "U", "--bearer=false"]).unwrap();
    assert!(report.lines().iter().any(|l| l.contains("changed bearer to false")));
    assert!(!ts.user("A", "U").bearer_token);
}

#[test]
fn connection_types() {
    let mut ts = TestStore::new("O");
    ts.add_user("A", "U");

    ts.edit_user(&["--conn-type", "standard,websocket"]).unwrap();
    let types = ts.user("A", "U").allowed_connection_types;
    assert!(types.contains(&ConnectionType::Standard));
    assert!(types.contains(&ConnectionType::Websocket));

    ts.edit_user(&["--rm-conn-type", "websocket"]).unwrap();
    let types = ts.user("A", "U").allowed_connection_types;
    assert_eq!(types.len(), 1);
}

#[test]
fn interactive_sets_limits_and_window() {
    let mut ts = TestStore::new("edit user");
    ts.add_user("A", "a");

    ts.edit_user_interactive(
        &[],
        vec![
            PromptValue::Text("-1".into()),
            PromptValue::Text("2018-01-01".into()),
            PromptValue::Text("2050-01-01".into()),
            PromptValue::Bool(false),
        ],
    )
    .unwrap();

    let claim = ts.user_claim("A", "a");
    assert_eq!(claim.nbf, 1_514_764_800);
    assert_eq!(claim.exp, 2_524_608_000);
    assert_eq!(claim.user().unwrap().limits.payload, NO_LIMIT);
}

#[test]
fn explicit_signing_key_becomes_issuer() {
    let mut ts = TestStore::new("O");
    ts.add_user("A", "U");
    let account = ts.account_claim("A");
    assert_eq!(ts.user_claim("A", "U").iss, account.sub);

    let sk = ts.add_signing_key("A");
    let seed = sk.seed();
    ts.edit_user(&["--tag", "foo", "-K", seed.as_str()]).unwrap();

    let claim = ts.user_claim("A", "U");
    assert_eq!(claim.iss, sk.public_identity());
    assert_eq!(claim.issuer_account.as_ref(), Some(&account.sub));
}

#[test]
fn added_with_signing_key_keeps_it_on_edit() {
    let mut ts = TestStore::new("O");
    ts.add_account("A");
    let sk = ts.add_signing_key("A");
    let account = ts.account_claim("A");

    ts.add_user_with("A", "U", Some(sk.seed().to_string()), Vec::new());
    assert_eq!(ts.user_claim("A", "U").iss, sk.public_identity());

    ts.edit_user(&["--tag", "foo"]).unwrap();
    let claim = ts.user_claim("A", "U");
    assert_eq!(claim.iss, sk.public_identity());
    assert_eq!(claim.issuer_account.as_ref(), Some(&account.sub));
    assert!(claim.user().unwrap().tags.contains("foo"));
}

#[test]
fn signing_key_only_store() {
    use nsc_crypto::KeyMaterialStore;

    let mut ts = TestStore::new("O");
    ts.add_account("A");
    let sk = ts.add_signing_key("A");
    let account = ts.account_claim("A");
    assert!(ts.keys.remove(&account.sub).unwrap());

    ts.add_user("A", "U");
    assert_eq!(ts.user_claim("A", "U").iss, sk.public_identity());

    ts.edit_user(&["--payload", "5"]).unwrap();
    let claim = ts.user_claim("A", "U");
    assert_eq!(claim.iss, sk.public_identity());
    assert_eq!(claim.issuer_account.as_ref(), Some(&account.sub));
    assert_eq!(claim.user().unwrap().limits.payload, 5);
}

#[test]
fn interactive_signer_selection() {
    let mut ts = TestStore::new("O");
    ts.add_user("A", "AAA");
    let sk = ts.add_signing_key("A");
    let account = ts.account_claim("A");
    assert_eq!(ts.user_claim("A", "AAA").iss, account.sub);

    ts.edit_user_interactive(
        &[],
        vec![
            PromptValue::Index(1),
            PromptValue::Text("5".into()),
            PromptValue::Text("0".into()),
            PromptValue::Text("0".into()),
            PromptValue::Bool(false),
        ],
    )
    .unwrap();

    let claim = ts.user_claim("A", "AAA");
    assert_eq!(claim.iss, sk.public_identity());
    assert_eq!(claim.issuer_account.as_ref(), Some(&account.sub));
    assert_eq!(claim.user().unwrap().limits.payload, 5);
}

#[test]
fn v1_store_blocks_edit_until_upgraded() {
    let mut ts = TestStore::with_version("O", Some(1));
    let ctx = ts.context();
    let edit = CommandPath::new(["edit", "user"]);

    let err = ctx.check_gate(&edit).unwrap_err();
    assert!(format!("{err:#}").contains("upgrade-jwt"));
    assert!(ctx.check_gate(&CommandPath::new(["upgrade-jwt"])).is_ok());
    assert!(ctx.check_gate(&CommandPath::new(["add", "operator"])).is_ok());

    ts.provisioner().upgrade_jwt().unwrap();
    assert!(ctx.check_gate(&edit).is_ok());

    ts.add_user("A", "U");
    ts.edit_user(&["--tag", "after"]).unwrap();
    assert!(ts.user("A", "U").tags.contains("after"));
}

#[test]
fn future_store_is_refused() {
    let ts = TestStore::with_version("O", Some(3));
    let err = ts.context().check_gate(&CommandPath::new(["edit", "user"])).unwrap_err();
    assert!(format!("{err:#}").contains("nsc update"));
}
