//! UDP registration tokens (spec.md §4.2, GLOSSARY "Registration token"):
//! "an opaque authenticator embedded in the first UDP packet a participant
//! sends to a new socket, proving it negotiated the session on the control
//! channel."
//!
//! The token is `payload || HMAC-SHA256(macKey, payload)[..16]`, where
//! `payload` binds the token to a specific `DeviceId` + `StreamId` and
//! carries an issue time. It is opaque to the client: they echo it back
//! unmodified on the registration datagram.

use hmac::{Hmac, Mac};
use mirage_core::{DeviceId, StreamId};
use sha2::Sha256;
use subtle_eq::ct_eq;

use crate::error::SecurityError;
use crate::kdf::SessionKeys;

type HmacSha256 = Hmac<Sha256>;

const TAG_LEN: usize = 16;
const PAYLOAD_LEN: usize = 16 + 4 + 8; // deviceId + streamId + issuedAtMs

pub struct RegistrationToken(Vec<u8>);

impl RegistrationToken {
    pub fn issue(keys: &SessionKeys, device_id: DeviceId, stream_id: StreamId, issued_at_ms: u64) -> Self {
        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        payload.extend_from_slice(&device_id.as_bytes());
        payload.extend_from_slice(&stream_id.0.to_le_bytes());
        payload.extend_from_slice(&issued_at_ms.to_le_bytes());

        let mut mac = HmacSha256::new_from_slice(&keys.registration_mac_key)
            .expect("HMAC-SHA256 accepts any key length");
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();

        let mut token = payload;
        token.extend_from_slice(&tag[..TAG_LEN]);
        Self(token)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Validate `token` against `keys` and confirm it was issued for
    /// exactly `device_id`/`stream_id` (spec.md §4.2: "bound to DeviceID +
    /// StreamID").
    pub fn validate(
        keys: &SessionKeys,
        token: &[u8],
        expected_device_id: DeviceId,
        expected_stream_id: StreamId,
    ) -> Result<(), SecurityError> {
        if token.len() != PAYLOAD_LEN + TAG_LEN {
            return Err(SecurityError::InvalidToken);
        }
        let (payload, tag) = token.split_at(PAYLOAD_LEN);

        let mut mac = HmacSha256::new_from_slice(&keys.registration_mac_key)
            .expect("HMAC-SHA256 accepts any key length");
        mac.update(payload);
        let expected_tag = mac.finalize().into_bytes();

        if !ct_eq(&expected_tag[..TAG_LEN], tag) {
            return Err(SecurityError::InvalidToken);
        }

        let device_bytes: [u8; 16] = payload[0..16].try_into().unwrap();
        let device_id = DeviceId::from_bytes(device_bytes);
        let stream_id = StreamId(u32::from_le_bytes(payload[16..20].try_into().unwrap()));

        if device_id != expected_device_id || stream_id != expected_stream_id {
            return Err(SecurityError::InvalidToken);
        }

        Ok(())
    }
}

/// Minimal constant-time byte comparison, avoided pulling in the
/// `subtle` crate for one call site.
mod subtle_eq {
    pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        let mut diff = 0u8;
        for (x, y) in a.iter().zip(b.iter()) {
            diff |= x ^ y;
        }
        diff == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_validates_for_the_bound_identity() {
        let keys = SessionKeys::derive(b"shared-secret", b"nonce");
        let device_id = DeviceId::new_random();
        let stream_id = StreamId(5);
        let token = RegistrationToken::issue(&keys, device_id, stream_id, 1_700_000_000_000);

        assert!(RegistrationToken::validate(&keys, token.as_bytes(), device_id, stream_id).is_ok());
    }

    #[test]
    fn token_rejects_wrong_stream() {
        let keys = SessionKeys::derive(b"shared-secret", b"nonce");
        let device_id = DeviceId::new_random();
        let token = RegistrationToken::issue(&keys, device_id, StreamId(5), 0);

        assert!(RegistrationToken::validate(&keys, token.as_bytes(), device_id, StreamId(6)).is_err());
    }

    #[test]
    fn token_rejects_tampered_bytes() {
        let keys = SessionKeys::derive(b"shared-secret", b"nonce");
        let device_id = DeviceId::new_random();
        let stream_id = StreamId(5);
        let mut token = RegistrationToken::issue(&keys, device_id, stream_id, 0).0;
        *token.last_mut().unwrap() ^= 0xFF;

        assert!(RegistrationToken::validate(&keys, &token, device_id, stream_id).is_err());
    }
}
