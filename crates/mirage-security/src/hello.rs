//! Signed `hello` handshake payload (spec.md §4.2: "Hello signatures cover:
//! device identifiers, declared protocol version, declared capabilities,
//! negotiation, iCloud/user-scope identifier, key ID, public key,
//! timestamp, nonce").
//!
//! Signing uses HMAC-SHA256 keyed by the long-term pairing secret
//! established out of band between host and client — distinct from the
//! per-session [`crate::kdf::SessionKeys`], which only exist once a hello
//! has already been accepted.

use hmac::{Hmac, Mac};
use mirage_core::DeviceId;
use sha2::Sha256;

use crate::error::SecurityError;

type HmacSha256 = Hmac<Sha256>;

/// Fields covered by a hello signature. `capabilities` and `negotiation`
/// are carried as their already-serialized bytes (owned by `mirage-control`)
/// so this module stays agnostic to the control-message schema.
#[derive(Debug, Clone)]
pub struct HelloPayload {
    pub device_id: DeviceId,
    pub target_device_id: Option<DeviceId>,
    pub protocol_version: u32,
    pub declared_capabilities: Vec<u8>,
    pub negotiation: Vec<u8>,
    pub user_scope_id: String,
    pub key_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub timestamp_ms: u64,
    pub nonce: Vec<u8>,
}

impl HelloPayload {
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        push_lp(&mut buf, &self.device_id.as_bytes());
        push_lp(&mut buf, &self.target_device_id.map(|d| d.as_bytes()).unwrap_or([0u8; 16]));
        push_lp(&mut buf, &self.protocol_version.to_le_bytes());
        push_lp(&mut buf, &self.declared_capabilities);
        push_lp(&mut buf, &self.negotiation);
        push_lp(&mut buf, self.user_scope_id.as_bytes());
        push_lp(&mut buf, &self.key_id);
        push_lp(&mut buf, &self.public_key);
        push_lp(&mut buf, &self.timestamp_ms.to_le_bytes());
        push_lp(&mut buf, &self.nonce);
        buf
    }

    pub fn sign(&self, pairing_key: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(pairing_key).expect("HMAC-SHA256 accepts any key length");
        mac.update(&self.canonical_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Verify `signature` against `pairing_key`. Fails with
    /// `UnauthorizedIdentity` on any mismatch (spec.md §4.2 error kinds).
    pub fn verify(&self, pairing_key: &[u8], signature: &[u8]) -> Result<(), SecurityError> {
        let mut mac =
            HmacSha256::new_from_slice(pairing_key).expect("HMAC-SHA256 accepts any key length");
        mac.update(&self.canonical_bytes());
        mac.verify_slice(signature).map_err(|_| SecurityError::UnauthorizedIdentity)
    }
}

fn push_lp(buf: &mut Vec<u8>, field: &[u8]) {
    buf.extend_from_slice(&(field.len() as u32).to_le_bytes());
    buf.extend_from_slice(field);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> HelloPayload {
        HelloPayload {
            device_id: DeviceId::new_random(),
            target_device_id: Some(DeviceId::new_random()),
            protocol_version: 2,
            declared_capabilities: vec![1, 2, 3],
            negotiation: vec![9, 9],
            user_scope_id: "user-scope-abc".to_string(),
            key_id: vec![0xAA, 0xBB],
            public_key: vec![1; 32],
            timestamp_ms: 1_700_000_000_000,
            nonce: vec![5; 16],
        }
    }

    #[test]
    fn signature_verifies_with_the_matching_key() {
        let payload = sample_payload();
        let signature = payload.sign(b"pairing-secret");
        assert!(payload.verify(b"pairing-secret", &signature).is_ok());
    }

    #[test]
    fn signature_rejects_wrong_key() {
        let payload = sample_payload();
        let signature = payload.sign(b"pairing-secret");
        assert!(matches!(
            payload.verify(b"different-secret", &signature),
            Err(SecurityError::UnauthorizedIdentity)
        ));
    }

    #[test]
    fn signature_rejects_tampered_field() {
        let mut payload = sample_payload();
        let signature = payload.sign(b"pairing-secret");
        payload.protocol_version = 3;
        assert!(payload.verify(b"pairing-secret", &signature).is_err());
    }
}
