//! UDP registration datagrams (spec.md §4.1, §6): the first packet a sender
//! emits on a data socket so the receiver can bind the flow to a stream and
//! an authenticated device before any media is accepted.
//!
//! ```text
//! magic(4) || streamID(4, le)? || deviceID(16) || registrationToken(variable)
//! ```
//!
//! `streamID` is present for video/audio registrations and absent for
//! quality-test registrations.

use bytes::Bytes;
use mirage_core::{DeviceId, StreamId};

use crate::error::WireError;

pub const MAGIC_VIDEO: [u8; 4] = *b"MIRG";
pub const MAGIC_AUDIO: [u8; 4] = *b"MIRA";
pub const MAGIC_QUALITY_TEST: [u8; 4] = *b"MIRQ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    Video,
    Audio,
    QualityTest,
}

impl RegistrationKind {
    pub fn magic(self) -> [u8; 4] {
        match self {
            RegistrationKind::Video => MAGIC_VIDEO,
            RegistrationKind::Audio => MAGIC_AUDIO,
            RegistrationKind::QualityTest => MAGIC_QUALITY_TEST,
        }
    }

    fn from_magic(magic: [u8; 4]) -> Result<Self, WireError> {
        match &magic {
            &MAGIC_VIDEO => Ok(RegistrationKind::Video),
            &MAGIC_AUDIO => Ok(RegistrationKind::Audio),
            &MAGIC_QUALITY_TEST => Ok(RegistrationKind::QualityTest),
            _ => Err(WireError::UnknownMagic(magic)),
        }
    }

    fn carries_stream_id(self) -> bool {
        !matches!(self, RegistrationKind::QualityTest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPacket {
    pub kind: RegistrationKind,
    pub stream_id: Option<StreamId>,
    pub device_id: DeviceId,
    pub token: Bytes,
}

impl RegistrationPacket {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 4 + 16 + self.token.len());
        buf.extend_from_slice(&self.kind.magic());
        if let Some(stream_id) = self.stream_id {
            buf.extend_from_slice(&stream_id.0.to_le_bytes());
        }
        buf.extend_from_slice(&self.device_id.as_bytes());
        buf.extend_from_slice(&self.token);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < 4 {
            return Err(WireError::InvalidHeader);
        }
        let magic: [u8; 4] = buf[0..4].try_into().unwrap();
        let kind = RegistrationKind::from_magic(magic)?;

        let mut offset = 4;
        let stream_id = if kind.carries_stream_id() {
            if buf.len() < offset + 4 {
                return Err(WireError::InvalidHeader);
            }
            let id = u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap());
            offset += 4;
            Some(StreamId(id))
        } else {
            None
        };

        if buf.len() < offset + 16 {
            return Err(WireError::InvalidHeader);
        }
        let device_bytes: [u8; 16] = buf[offset..offset + 16].try_into().unwrap();
        let device_id = DeviceId::from_bytes(device_bytes);
        offset += 16;

        let token = Bytes::copy_from_slice(&buf[offset..]);

        Ok(RegistrationPacket { kind, stream_id, device_id, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_registration_roundtrips() {
        let packet = RegistrationPacket {
            kind: RegistrationKind::Video,
            stream_id: Some(StreamId(3)),
            device_id: DeviceId::new_random(),
            token: Bytes::from_static(b"opaque-token-bytes"),
        };
        let encoded = packet.encode();
        let decoded = RegistrationPacket::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn quality_test_registration_has_no_stream_id() {
        let packet = RegistrationPacket {
            kind: RegistrationKind::QualityTest,
            stream_id: None,
            device_id: DeviceId::new_random(),
            token: Bytes::from_static(b"tok"),
        };
        let encoded = packet.encode();
        // magic(4) + deviceID(16) + token(3), no streamID field.
        assert_eq!(encoded.len(), 4 + 16 + 3);
        let decoded = RegistrationPacket::decode(&encoded).unwrap();
        assert_eq!(decoded.stream_id, None);
    }

    #[test]
    fn unknown_magic_is_rejected() {
        let mut buf = vec![b'X', b'X', b'X', b'X'];
        buf.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            RegistrationPacket::decode(&buf),
            Err(WireError::UnknownMagic(_))
        ));
    }

    #[test]
    fn truncated_registration_is_rejected() {
        assert!(matches!(
            RegistrationPacket::decode(&MAGIC_VIDEO),
            Err(WireError::InvalidHeader)
        ));
    }
}
