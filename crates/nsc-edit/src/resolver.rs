//! # Signing Key Resolution
//!
//! Decides which key signs an edited user claim and how the trust chain is
//! recorded on it. Resolution order:
//!
//! 1. An explicit reference (`-K`): a seed, a held public key, a seed file,
//!    or the keyword `account`. It must be the account key or one of the
//!    account's signing keys.
//! 2. The claim's previous issuer, when it is still a valid signer and its
//!    key is held. Repeated edits keep the same issuer.
//! 3. The account key, when held.
//! 4. Exactly one held signing key. Several held signing keys is an
//!    ambiguity the caller must settle with `-K`; none is an error that
//!    names the candidates.
//!
//! The chosen key determines the stamp: the account key gives
//! `iss = account, issuer_account = None`; a signing key gives
//! `iss = signing key, issuer_account = Some(account)`.

use nsc_claims::Claim;
use nsc_core::PublicIdentity;
use nsc_crypto::{KeyMaterialStore, KeyPair, KeyStoreError};

use crate::error::EditError;

/// Keyword that resolves to the account's own key.
pub const ACCOUNT_KEYWORD: &str = "account";

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerSource {
    /// Supplied by the caller.
    Explicit,
    /// The issuer already recorded on the claim.
    Previous,
    /// The account's own key.
    AccountKey,
    /// The only held signing key.
    SigningKey,
}

/// A signing key and the trust-chain fields it implies.
#[derive(Debug)]
pub struct ResolvedSigner {
    /// The key to sign with.
    pub key: KeyPair,
    /// Value for `iss`.
    pub issuer: PublicIdentity,
    /// Value for `issuer_account`.
    pub issuer_account: Option<PublicIdentity>,
    /// How the key was chosen.
    pub source: SignerSource,
}

impl ResolvedSigner {
    fn new(key: KeyPair, account: &Claim, source: SignerSource) -> Self {
        let id = key.public_identity();
        let issuer_account = (id != account.sub).then(|| account.sub.clone());
        Self {
            key,
            issuer: id,
            issuer_account,
            source,
        }
    }

    /// Write `iss` and `issuer_account` onto `claim`.
    pub fn stamp(&self, claim: &mut Claim) {
        claim.iss = self.issuer.clone();
        claim.issuer_account = self.issuer_account.clone();
    }
}

/// Resolves signers against a key store.
pub struct SigningKeyResolver<'a> {
    keys: &'a dyn KeyMaterialStore,
}

impl<'a> SigningKeyResolver<'a> {
    /// A resolver over `keys`.
    pub fn new(keys: &'a dyn KeyMaterialStore) -> Self {
        Self { keys }
    }

    /// Resolve the signer for a claim issued under `account`.
    pub fn resolve(
        &self,
        explicit: Option<&str>,
        account: &Claim,
        previous: Option<&PublicIdentity>,
    ) -> Result<ResolvedSigner, EditError> {
        account.account()?;

        if let Some(reference) = explicit {
            let key = self.resolve_explicit(reference, account)?;
            return Ok(self.chosen(key, account, SignerSource::Explicit));
        }

        if let Some(prev) = previous.filter(|p| account.is_valid_signer(p)) {
            if let Some(key) = self.keys.get(prev)? {
                return Ok(self.chosen(key, account, SignerSource::Previous));
            }
        }

        if let Some(key) = self.keys.get(&account.sub)? {
            return Ok(self.chosen(key, account, SignerSource::AccountKey));
        }

        let signing_keys: Vec<PublicIdentity> = account.account()?.signing_keys.iter().cloned().collect();
        let mut held = self.keys.list_candidates(&signing_keys)?;
        match held.len() {
            1 => {
                let key = held.remove(0);
                Ok(self.chosen(key, account, SignerSource::SigningKey))
            }
            0 if signing_keys.is_empty() => Err(EditError::NoUsableSigningKey {
                account: account.name.clone(),
                detail: format!("the account key {} is not in the key store", account.sub),
            }),
            0 => Err(EditError::NoUsableSigningKey {
                account: account.name.clone(),
                detail: format!(
                    "neither the account key nor any of its signing keys ({}) are in the key store",
                    join_ids(&signing_keys)
                ),
            }),
            _ => Err(EditError::NoUsableSigningKey {
                account: account.name.clone(),
                detail: format!(
                    "several signing keys are held ({}); select one with --private-key",
                    join_ids(&held.iter().map(KeyPair::public_identity).collect::<Vec<_>>())
                ),
            }),
        }
    }

    /// Held keys that may sign for `account`: the account key first, then
    /// signing keys in sorted order.
    pub fn usable_candidates(&self, account: &Claim) -> Result<Vec<PublicIdentity>, EditError> {
        let mut ids = vec![account.sub.clone()];
        ids.extend(account.account()?.signing_keys.iter().cloned());
        Ok(self
            .keys
            .list_candidates(&ids)?
            .iter()
            .map(KeyPair::public_identity)
            .collect())
    }

    fn resolve_explicit(&self, reference: &str, account: &Claim) -> Result<KeyPair, EditError> {
        let shown = redact(reference);
        let key = if reference.trim().eq_ignore_ascii_case(ACCOUNT_KEYWORD) {
            self.keys
                .get(&account.sub)?
                .ok_or_else(|| EditError::KeyResolution {
                    reference: shown.clone(),
                    reason: format!("the account key {} is not in the key store", account.sub),
                })?
        } else {
            self.keys.resolve(reference).map_err(|e| match e {
                KeyStoreError::Io { .. } => EditError::KeyStore(e),
                other => EditError::KeyResolution {
                    reference: shown.clone(),
                    reason: other.to_string(),
                },
            })?
        };

        if !account.is_valid_signer(&key.public_identity()) {
            return Err(EditError::KeyResolution {
                reference: shown,
                reason: format!(
                    "{} is not a valid signer for account {:?}",
                    key.public_identity(),
                    account.name
                ),
            });
        }
        Ok(key)
    }

    fn chosen(&self, key: KeyPair, account: &Claim, source: SignerSource) -> ResolvedSigner {
        let signer = ResolvedSigner::new(key, account, source);
        tracing::debug!(
            account = %account.name,
            issuer = %signer.issuer.short(),
            delegated = signer.issuer_account.is_some(),
            source = ?source,
            "resolved signing key"
        );
        signer
    }
}

fn join_ids(ids: &[PublicIdentity]) -> String {
    ids.iter().map(PublicIdentity::as_str).collect::<Vec<_>>().join(", ")
}

/// Seeds never appear in messages.
fn redact(reference: &str) -> String {
    if KeyPair::is_seed(reference) {
        "<seed>".to_string()
    } else {
        format!("{:?}", reference.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsc_claims::{AccountPayload, ClaimPayload};
    use nsc_core::KeyRole;
    use nsc_crypto::MemoryKeyStore;

    struct Fixture {
        keys: MemoryKeyStore,
        account_key: KeyPair,
        sk1: KeyPair,
        sk2: KeyPair,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                keys: MemoryKeyStore::new(),
                account_key: KeyPair::generate(KeyRole::Account),
                sk1: KeyPair::generate(KeyRole::Account),
                sk2: KeyPair::generate(KeyRole::Account),
            }
        }

        fn account(&self, signing: &[&KeyPair]) -> Claim {
            let mut payload = AccountPayload::default();
            for k in signing {
                payload.signing_keys.insert(k.public_identity());
            }
            Claim::new("A", self.account_key.public_identity(), ClaimPayload::Account(payload))
        }
    }

    #[test]
    fn account_key_signs_without_issuer_account() {
        let f = Fixture::new();
        f.keys.store(&f.account_key).unwrap();
        let account = f.account(&[]);
        let s = SigningKeyResolver::new(&f.keys).resolve(None, &account, None).unwrap();
        assert_eq!(s.issuer, account.sub);
        assert_eq!(s.issuer_account, None);
        assert_eq!(s.source, SignerSource::AccountKey);
    }

    #[test]
    fn explicit_signing_key_sets_issuer_account() {
        let f = Fixture::new();
        f.keys.store(&f.account_key).unwrap();
        let account = f.account(&[&f.sk1]);
        let seed = f.sk1.seed();
        let s = SigningKeyResolver::new(&f.keys)
            .resolve(Some(seed.as_str()), &account, Some(&account.sub))
            .unwrap();
        assert_eq!(s.issuer, f.sk1.public_identity());
        assert_eq!(s.issuer_account, Some(account.sub.clone()));
        assert_eq!(s.source, SignerSource::Explicit);
    }

    #[test]
    fn explicit_account_keyword() {
        let f = Fixture::new();
        f.keys.store(&f.account_key).unwrap();
        f.keys.store(&f.sk1).unwrap();
        let account = f.account(&[&f.sk1]);
        let s = SigningKeyResolver::new(&f.keys)
            .resolve(Some("account"), &account, Some(&f.sk1.public_identity()))
            .unwrap();
        assert_eq!(s.issuer, account.sub);
        assert!(s.issuer_account.is_none());
    }

    #[test]
    fn explicit_key_must_belong_to_account() {
        let f = Fixture::new();
        let stranger = KeyPair::generate(KeyRole::Account);
        let account = f.account(&[&f.sk1]);
        let err = SigningKeyResolver::new(&f.keys)
            .resolve(Some(stranger.seed().as_str()), &account, None)
            .unwrap_err();
        match err {
            EditError::KeyResolution { reference, reason } => {
                assert_eq!(reference, "<seed>");
                assert!(reason.contains("not a valid signer"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unresolvable_explicit_reference() {
        let f = Fixture::new();
        let account = f.account(&[]);
        let err = SigningKeyResolver::new(&f.keys)
            .resolve(Some("/no/such/file"), &account, None)
            .unwrap_err();
        assert!(matches!(err, EditError::KeyResolution { .. }));
    }

    #[test]
    fn previous_signing_key_is_kept() {
        let f = Fixture::new();
        f.keys.store(&f.account_key).unwrap();
        f.keys.store(&f.sk1).unwrap();
        let account = f.account(&[&f.sk1]);
        let prev = f.sk1.public_identity();
        let s = SigningKeyResolver::new(&f.keys)
            .resolve(None, &account, Some(&prev))
            .unwrap();
        assert_eq!(s.issuer, prev);
        assert_eq!(s.issuer_account, Some(account.sub.clone()));
        assert_eq!(s.source, SignerSource::Previous);
    }

    #[test]
    fn revoked_previous_signer_falls_back_to_account_key() {
        let f = Fixture::new();
        f.keys.store(&f.account_key).unwrap();
        f.keys.store(&f.sk1).unwrap();
        let account = f.account(&[]);
        let s = SigningKeyResolver::new(&f.keys)
            .resolve(None, &account, Some(&f.sk1.public_identity()))
            .unwrap();
        assert_eq!(s.issuer, account.sub);
    }

    #[test]
    fn single_held_signing_key_is_used() {
        let f = Fixture::new();
        f.keys.store(&f.sk2).unwrap();
        let account = f.account(&[&f.sk1, &f.sk2]);
        let s = SigningKeyResolver::new(&f.keys).resolve(None, &account, None).unwrap();
        assert_eq!(s.issuer, f.sk2.public_identity());
        assert_eq!(s.issuer_account, Some(account.sub.clone()));
        assert_eq!(s.source, SignerSource::SigningKey);
    }

    #[test]
    fn several_held_signing_keys_are_ambiguous() {
        let f = Fixture::new();
        f.keys.store(&f.sk1).unwrap();
        f.keys.store(&f.sk2).unwrap();
        let account = f.account(&[&f.sk1, &f.sk2]);
        let err = SigningKeyResolver::new(&f.keys).resolve(None, &account, None).unwrap_err();
        match err {
            EditError::NoUsableSigningKey { detail, .. } => {
                assert!(detail.contains("several signing keys"));
                assert!(detail.contains(f.sk1.public_identity().as_str()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_held_keys_names_candidates() {
        let f = Fixture::new();
        let account = f.account(&[&f.sk1]);
        let err = SigningKeyResolver::new(&f.keys).resolve(None, &account, None).unwrap_err();
        match err {
            EditError::NoUsableSigningKey { detail, .. } => {
                assert!(detail.contains(f.sk1.public_identity().as_str()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_keys_and_no_signing_keys() {
        let f = Fixture::new();
        let account = f.account(&[]);
        let err = SigningKeyResolver::new(&f.keys).resolve(None, &account, None).unwrap_err();
        assert!(err.to_string().contains("account key"));
    }

    #[test]
    fn usable_candidates_lists_account_key_first() {
        let f = Fixture::new();
        f.keys.store(&f.account_key).unwrap();
        f.keys.store(&f.sk1).unwrap();
        let account = f.account(&[&f.sk1, &f.sk2]);
        let got = SigningKeyResolver::new(&f.keys).usable_candidates(&account).unwrap();
        assert_eq!(got, vec![account.sub.clone(), f.sk1.public_identity()]);
    }

    #[test]
    fn resolution_is_deterministic() {
        let f = Fixture::new();
        f.keys.store(&f.sk1).unwrap();
        let account = f.account(&[&f.sk1, &f.sk2]);
        let r = SigningKeyResolver::new(&f.keys);
        let a = r.resolve(None, &account, None).unwrap().issuer;
        let b = r.resolve(None, &account, None).unwrap().issuer;
        assert_eq!(a, b);
    }

    #[test]
    fn resolver_rejects_non_account_claim() {
        let f = Fixture::new();
        let user = Claim::new(
            "u",
            KeyPair::generate(KeyRole::User).public_identity(),
            ClaimPayload::User(Default::default()),
        );
        let err = SigningKeyResolver::new(&f.keys).resolve(None, &user, None).unwrap_err();
        assert!(matches!(err, EditError::Claim(_)));
    }
}
