//! `QualityTestPacketHeader`: the fixed header prefixing each paced UDP
//! packet the host emits while running a quality-probe stage (spec.md
//! §4.11, §6).
//!
//! ```text
//! magic(4) || testID(16) || stageID(4,le) || sequenceNumber(4,le)
//!   || payloadLength(4,le) || sentAtNs(8,le)
//! ```

use uuid::Uuid;

use crate::error::WireError;
use crate::registration::MAGIC_QUALITY_TEST;

pub const PROBE_HEADER_SIZE: usize = 4 + 16 + 4 + 4 + 4 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityTestPacketHeader {
    pub test_id: Uuid,
    pub stage_id: u32,
    pub sequence_number: u32,
    pub payload_length: u32,
    pub sent_at_ns: u64,
}

impl QualityTestPacketHeader {
    pub fn encode(&self) -> [u8; PROBE_HEADER_SIZE] {
        let mut buf = [0u8; PROBE_HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC_QUALITY_TEST);
        buf[4..20].copy_from_slice(self.test_id.as_bytes());
        buf[20..24].copy_from_slice(&self.stage_id.to_le_bytes());
        buf[24..28].copy_from_slice(&self.sequence_number.to_le_bytes());
        buf[28..32].copy_from_slice(&self.payload_length.to_le_bytes());
        buf[32..40].copy_from_slice(&self.sent_at_ns.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < PROBE_HEADER_SIZE {
            return Err(WireError::InvalidHeader);
        }
        let magic: [u8; 4] = buf[0..4].try_into().unwrap();
        if magic != MAGIC_QUALITY_TEST {
            return Err(WireError::UnknownMagic(magic));
        }
        let test_id = Uuid::from_bytes(buf[4..20].try_into().unwrap());
        let stage_id = u32::from_le_bytes(buf[20..24].try_into().unwrap());
        let sequence_number = u32::from_le_bytes(buf[24..28].try_into().unwrap());
        let payload_length = u32::from_le_bytes(buf[28..32].try_into().unwrap());
        let sent_at_ns = u64::from_le_bytes(buf[32..40].try_into().unwrap());
        Ok(Self { test_id, stage_id, sequence_number, payload_length, sent_at_ns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_header_roundtrips() {
        let header = QualityTestPacketHeader {
            test_id: Uuid::new_v4(),
            stage_id: 2,
            sequence_number: 901,
            payload_length: 1200,
            sent_at_ns: 1_234_567_890,
        };
        let encoded = header.encode();
        assert_eq!(encoded.len(), PROBE_HEADER_SIZE);
        let decoded = QualityTestPacketHeader::decode(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn probe_header_rejects_wrong_magic() {
        let mut buf = [0u8; PROBE_HEADER_SIZE];
        buf[0..4].copy_from_slice(b"MIRG");
        assert!(matches!(
            QualityTestPacketHeader::decode(&buf),
            Err(WireError::UnknownMagic(_))
        ));
    }
}
