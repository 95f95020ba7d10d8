//! `FrameHeader` binary layout: fixed size `H`, prefixing every UDP media
//! datagram (spec.md §4.1, §6 "Data-plane UDP datagram"). All multi-byte
//! integers here are little-endian; the 4-byte magics used by registration
//! datagrams (see `registration.rs`) are the only network-byte-order field
//! on the wire.

use mirage_core::{ContentRect, DimensionToken, Epoch, FrameFlags, FrameHeader, StreamId};

use crate::error::WireError;

/// Fixed encoded size of [`FrameHeader`] in bytes.
pub const HEADER_SIZE: usize = 55;

/// Compute the CRC32 of a plaintext payload (spec.md §4.1: "computed over
/// the plaintext payload before optional AEAD encryption").
pub fn compute_crc32(plaintext: &[u8]) -> u32 {
    crc32fast::hash(plaintext)
}

/// Encode a [`FrameHeader`] into its fixed-size wire representation.
pub fn encode_header(header: &FrameHeader) -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    buf[0] = header.flags.0;
    buf[1..5].copy_from_slice(&header.stream_id.0.to_le_bytes());
    buf[5..9].copy_from_slice(&header.sequence_number.to_le_bytes());
    buf[9..17].copy_from_slice(&header.timestamp_ns.to_le_bytes());
    buf[17..21].copy_from_slice(&header.frame_number.to_le_bytes());
    buf[21..23].copy_from_slice(&header.fragment_index.to_le_bytes());
    buf[23..25].copy_from_slice(&header.fragment_count.to_le_bytes());
    buf[25..27].copy_from_slice(&header.payload_length.to_le_bytes());
    buf[27..31].copy_from_slice(&header.frame_byte_count.to_le_bytes());
    buf[31..35].copy_from_slice(&header.crc32.to_le_bytes());
    buf[35..39].copy_from_slice(&header.content_rect.x.to_le_bytes());
    buf[39..43].copy_from_slice(&header.content_rect.y.to_le_bytes());
    buf[43..47].copy_from_slice(&header.content_rect.w.to_le_bytes());
    buf[47..51].copy_from_slice(&header.content_rect.h.to_le_bytes());
    buf[51..53].copy_from_slice(&header.dimension_token.0.to_le_bytes());
    buf[53..55].copy_from_slice(&header.epoch.0.to_le_bytes());
    buf
}

/// Parse a [`FrameHeader`] from the front of `buf`. Returns
/// `WireError::InvalidHeader` if `buf` is shorter than [`HEADER_SIZE`].
pub fn decode_header(buf: &[u8]) -> Result<FrameHeader, WireError> {
    if buf.len() < HEADER_SIZE {
        return Err(WireError::InvalidHeader);
    }
    let flags = FrameFlags(buf[0]);
    let stream_id = StreamId(u32::from_le_bytes(buf[1..5].try_into().unwrap()));
    let sequence_number = u32::from_le_bytes(buf[5..9].try_into().unwrap());
    let timestamp_ns = u64::from_le_bytes(buf[9..17].try_into().unwrap());
    let frame_number = u32::from_le_bytes(buf[17..21].try_into().unwrap());
    let fragment_index = u16::from_le_bytes(buf[21..23].try_into().unwrap());
    let fragment_count = u16::from_le_bytes(buf[23..25].try_into().unwrap());
    let payload_length = u16::from_le_bytes(buf[25..27].try_into().unwrap());
    let frame_byte_count = u32::from_le_bytes(buf[27..31].try_into().unwrap());
    let crc32 = u32::from_le_bytes(buf[31..35].try_into().unwrap());
    let content_rect = ContentRect {
        x: i32::from_le_bytes(buf[35..39].try_into().unwrap()),
        y: i32::from_le_bytes(buf[39..43].try_into().unwrap()),
        w: u32::from_le_bytes(buf[43..47].try_into().unwrap()),
        h: u32::from_le_bytes(buf[47..51].try_into().unwrap()),
    };
    let dimension_token = DimensionToken(u16::from_le_bytes(buf[51..53].try_into().unwrap()));
    let epoch = Epoch(u16::from_le_bytes(buf[53..55].try_into().unwrap()));

    if fragment_index >= fragment_count {
        return Err(WireError::InvalidHeader);
    }

    Ok(FrameHeader {
        flags,
        stream_id,
        sequence_number,
        timestamp_ns,
        frame_number,
        fragment_index,
        fragment_count,
        payload_length,
        frame_byte_count,
        crc32,
        content_rect,
        dimension_token,
        epoch,
    })
}

/// Verify that `plaintext`'s CRC32 matches the value carried in `header`.
pub fn verify_crc32(header: &FrameHeader, plaintext: &[u8]) -> Result<(), WireError> {
    if compute_crc32(plaintext) != header.crc32 {
        return Err(WireError::ChecksumMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> FrameHeader {
        FrameHeader {
            flags: FrameFlags::empty().with(FrameFlags::KEYFRAME),
            stream_id: StreamId(7),
            sequence_number: 123_456,
            timestamp_ns: 1_700_000_000_000,
            frame_number: 42,
            fragment_index: 0,
            fragment_count: 3,
            payload_length: 1200,
            frame_byte_count: 3500,
            crc32: 0xDEAD_BEEF,
            content_rect: ContentRect { x: 0, y: 0, w: 1920, h: 1080 },
            dimension_token: DimensionToken(9),
            epoch: Epoch(1),
        }
    }

    #[test]
    fn header_roundtrips() {
        let header = sample_header();
        let bytes = encode_header(&header);
        assert_eq!(bytes.len(), HEADER_SIZE);
        let decoded = decode_header(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let bytes = encode_header(&sample_header());
        assert!(matches!(
            decode_header(&bytes[..HEADER_SIZE - 1]),
            Err(WireError::InvalidHeader)
        ));
    }

    #[test]
    fn decode_rejects_fragment_index_out_of_range() {
        let mut header = sample_header();
        header.fragment_index = 5;
        header.fragment_count = 3;
        let bytes = encode_header(&header);
        assert!(matches!(decode_header(&bytes), Err(WireError::InvalidHeader)));
    }

    #[test]
    fn crc32_detects_tampering() {
        let mut header = sample_header();
        let payload = b"a frame of encoded video bytes";
        header.crc32 = compute_crc32(payload);
        assert!(verify_crc32(&header, payload).is_ok());
        assert!(verify_crc32(&header, b"a frame of encoded VIDEO bytes").is_err());
    }

    #[test]
    fn crc32_is_stable_for_equal_byte_sequences() {
        let a = compute_crc32(b"identical payload");
        let b = compute_crc32(b"identical payload");
        assert_eq!(a, b);
    }
}
