use bastion_envelope::{derive_root_key, open, random_dek, seal, AuthFailure, KEY_LEN, SALT_LEN, TAG_LEN};
use proptest::prelude::*;

#[test]
fn roundtrip_basic() {
    let key = [0xA5u8; KEY_LEN];
    let plaintext = b"hello envelope world";
    let (nonce, ct) = seal(&key, plaintext).unwrap();
    let pt = open(&key, &nonce, &ct).unwrap();
    assert_eq!(&pt, plaintext);
}

#[test]
fn roundtrip_large_plaintext() {
    let key = [0x11u8; KEY_LEN];
    let plaintext = vec![0xABu8; 65536];
    let (nonce, ct) = seal(&key, &plaintext).unwrap();
    let pt = open(&key, &nonce, &ct).unwrap();
    assert_eq!(pt, plaintext);
}

#[test]
fn derived_key_seals_and_opens() {
    let salt = [9u8; SALT_LEN];
    let key = derive_root_key("MyMasterPass123", &salt, 1_000);
    let (nonce, ct) = seal(&key, b"vault-verification-token").unwrap();

    let rederived = derive_root_key("MyMasterPass123", &salt, 1_000);
    assert_eq!(open(&rederived, &nonce, &ct).unwrap(), b"vault-verification-token");

    let wrong = derive_root_key("Wrong", &salt, 1_000);
    assert_eq!(open(&wrong, &nonce, &ct), Err(AuthFailure));
}

#[test]
fn fresh_deks_differ() {
    let a = random_dek().unwrap();
    let b = random_dek().unwrap();
    assert_ne!(a, b);
}

proptest! {
    #[test]
    fn roundtrip_any_plaintext(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let key = [0x3Cu8; KEY_LEN];
        let (nonce, ct) = seal(&key, &data).unwrap();
        prop_assert_eq!(ct.len(), data.len() + TAG_LEN);
        prop_assert_eq!(open(&key, &nonce, &ct).unwrap(), data);
    }

    // Two seals of the same plaintext under the same key must never share
    // a nonce or a ciphertext.
    #[test]
    fn nonces_never_repeat(data in proptest::collection::vec(any::<u8>(), 1..256)) {
        let key = [0x77u8; KEY_LEN];
        let (n1, c1) = seal(&key, &data).unwrap();
        let (n2, c2) = seal(&key, &data).unwrap();
        prop_assert_ne!(n1, n2);
        prop_assert_ne!(c1, c2);
    }

    #[test]
    fn truncated_ciphertext_fails(data in proptest::collection::vec(any::<u8>(), 1..256)) {
        let key = [0x55u8; KEY_LEN];
        let (nonce, ct) = seal(&key, &data).unwrap();
        let truncated = &ct[..ct.len() - 1];
        prop_assert_eq!(open(&key, &nonce, truncated), Err(AuthFailure));
    }
}
