//! Per-direction AEAD key and per-packet nonce derivation (spec.md §4.2:
//! "On hello acceptance both parties derive two AEAD keys `K_h2c`, `K_c2h`
//! from the shared secret and nonce").
//!
//! Both the AEAD keys and the per-packet nonces are derived from the same
//! HKDF-SHA256 pseudorandom key, with distinct `info` labels keeping the
//! two derivations — and the two directions — independent.

use hkdf::Hkdf;
use mirage_core::StreamId;
use sha2::Sha256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HostToClient,
    ClientToHost,
}

impl Direction {
    fn key_info(self) -> &'static [u8] {
        match self {
            Direction::HostToClient => b"mirage-v2 aead-key h2c",
            Direction::ClientToHost => b"mirage-v2 aead-key c2h",
        }
    }

    fn nonce_tag(self) -> u8 {
        match self {
            Direction::HostToClient => 0,
            Direction::ClientToHost => 1,
        }
    }
}

/// Keys negotiated for one session at hello acceptance. Holds the HKDF
/// pseudorandom key (so per-packet nonces can be derived on demand) plus
/// the two cached AEAD keys.
pub struct SessionKeys {
    hkdf: Hkdf<Sha256>,
    pub key_h2c: [u8; 32],
    pub key_c2h: [u8; 32],
    pub registration_mac_key: [u8; 32],
}

impl SessionKeys {
    /// Derive session keys from the long-term pairing secret shared out of
    /// band and the per-handshake nonce exchanged in `hello` (spec.md
    /// §4.2). `shared_secret` and `nonce` must match on both ends or the
    /// derived keys, and therefore every subsequent AEAD operation, will
    /// silently diverge.
    pub fn derive(shared_secret: &[u8], nonce: &[u8]) -> Self {
        let hkdf = Hkdf::<Sha256>::new(Some(nonce), shared_secret);

        let mut key_h2c = [0u8; 32];
        hkdf.expand(Direction::HostToClient.key_info(), &mut key_h2c)
            .expect("32 bytes is a valid HKDF-SHA256 output length");

        let mut key_c2h = [0u8; 32];
        hkdf.expand(Direction::ClientToHost.key_info(), &mut key_c2h)
            .expect("32 bytes is a valid HKDF-SHA256 output length");

        let mut registration_mac_key = [0u8; 32];
        hkdf.expand(b"mirage-v2 registration-token-mac", &mut registration_mac_key)
            .expect("32 bytes is a valid HKDF-SHA256 output length");

        Self { hkdf, key_h2c, key_c2h, registration_mac_key }
    }

    pub fn key_for(&self, direction: Direction) -> &[u8; 32] {
        match direction {
            Direction::HostToClient => &self.key_h2c,
            Direction::ClientToHost => &self.key_c2h,
        }
    }

    /// Derive the 96-bit AEAD nonce for one packet. Unique as long as
    /// `(stream_id, frame_number, sequence_number, direction)` is unique
    /// within the session (spec.md §4.2, §8 invariant).
    pub fn packet_nonce(
        &self,
        direction: Direction,
        stream_id: StreamId,
        frame_number: u32,
        sequence_number: u32,
    ) -> [u8; 12] {
        let mut info = Vec::with_capacity(1 + 4 + 4 + 4 + 1);
        info.extend_from_slice(b"n");
        info.extend_from_slice(&stream_id.0.to_le_bytes());
        info.extend_from_slice(&frame_number.to_le_bytes());
        info.extend_from_slice(&sequence_number.to_le_bytes());
        info.push(direction.nonce_tag());

        let mut nonce = [0u8; 12];
        self.hkdf
            .expand(&info, &mut nonce)
            .expect("12 bytes is a valid HKDF-SHA256 output length");
        nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_derive_distinct_keys() {
        let keys = SessionKeys::derive(b"shared-secret", b"handshake-nonce");
        assert_ne!(keys.key_h2c, keys.key_c2h);
    }

    #[test]
    fn derivation_is_deterministic_given_identical_inputs() {
        let a = SessionKeys::derive(b"shared-secret", b"handshake-nonce");
        let b = SessionKeys::derive(b"shared-secret", b"handshake-nonce");
        assert_eq!(a.key_h2c, b.key_h2c);
        assert_eq!(a.key_c2h, b.key_c2h);
    }

    #[test]
    fn packet_nonce_is_unique_per_tuple() {
        let keys = SessionKeys::derive(b"shared-secret", b"handshake-nonce");
        let stream = StreamId(1);
        let a = keys.packet_nonce(Direction::HostToClient, stream, 10, 0);
        let b = keys.packet_nonce(Direction::HostToClient, stream, 10, 1);
        let c = keys.packet_nonce(Direction::ClientToHost, stream, 10, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
