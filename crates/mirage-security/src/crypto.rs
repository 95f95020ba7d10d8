//! Per-packet AEAD seal/open (spec.md §4.2, §8: "Encrypt(plaintext, ad) →
//! Decrypt(ciphertext, ad) → equal plaintext when keys and nonce match;
//! decrypt fails otherwise").

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::error::SecurityError;

/// Encrypt `plaintext` under `key`/`nonce`, binding `associated_data` (the
/// cleartext `FrameHeader` bytes) without encrypting it. Returns
/// `ciphertext || tag`.
pub fn seal(key: &[u8; 32], nonce: &[u8; 12], associated_data: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce);
    cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: associated_data })
        .expect("AES-256-GCM sealing with a correctly sized key/nonce cannot fail")
}

/// Decrypt `ciphertext_and_tag` under `key`/`nonce`, verifying
/// `associated_data`. Fails with `SecurityError::DecryptionFailed` if the
/// tag, key, nonce, or associated data don't match.
pub fn open(
    key: &[u8; 32],
    nonce: &[u8; 12],
    associated_data: &[u8],
    ciphertext_and_tag: &[u8],
) -> Result<Vec<u8>, SecurityError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce);
    cipher
        .decrypt(nonce, Payload { msg: ciphertext_and_tag, aad: associated_data })
        .map_err(|_| SecurityError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_recovers_plaintext() {
        let key = [7u8; 32];
        let nonce = [1u8; 12];
        let aad = b"frame-header-bytes";
        let plaintext = b"encoded video payload";

        let sealed = seal(&key, &nonce, aad, plaintext);
        let opened = open(&key, &nonce, aad, &sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn open_fails_on_wrong_key() {
        let nonce = [1u8; 12];
        let aad = b"frame-header-bytes";
        let sealed = seal(&[1u8; 32], &nonce, aad, b"payload");
        assert!(open(&[2u8; 32], &nonce, aad, &sealed).is_err());
    }

    #[test]
    fn open_fails_on_tampered_associated_data() {
        let key = [3u8; 32];
        let nonce = [1u8; 12];
        let sealed = seal(&key, &nonce, b"original-header", b"payload");
        assert!(open(&key, &nonce, b"tampered-header", &sealed).is_err());
    }

    #[test]
    fn open_fails_on_wrong_nonce() {
        let key = [3u8; 32];
        let aad = b"frame-header-bytes";
        let sealed = seal(&key, &[1u8; 12], aad, b"payload");
        assert!(open(&key, &[2u8; 12], aad, &sealed).is_err());
    }
}
