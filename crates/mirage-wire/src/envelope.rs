//! Control-channel envelope framing (spec.md §4.1): every message on the
//! reliable transport is `{type:u8, length:u32-LE, body:bytes}`. The body
//! is a self-describing structured payload owned by `mirage-control`;
//! this module only frames and unframes it.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::error::WireError;

/// Refuses to allocate more than this many bytes for one envelope body,
/// guarding against a corrupt or hostile length field.
pub const MAX_BODY_BYTES: u32 = 64 * 1024 * 1024;

/// One framed control message: a type tag and its raw body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub message_type: u8,
    pub body: Bytes,
}

/// Write `body` as a single envelope. Spec.md §4.1: "unknown types MUST be
/// ignored with a log, not a disconnect" — that policy lives with the
/// reader of `message_type`, not here.
pub async fn write_envelope<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message_type: u8,
    body: &[u8],
) -> Result<(), WireError> {
    writer.write_u8(message_type).await?;
    writer.write_u32_le(body.len() as u32).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one envelope from `reader`, blocking until a full header and body
/// have arrived.
pub async fn read_envelope<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Envelope, WireError> {
    let message_type = reader.read_u8().await?;
    let length = reader.read_u32_le().await?;
    if length > MAX_BODY_BYTES {
        warn!(length, "control envelope body exceeds size ceiling");
        return Err(WireError::BodyTooLarge(length));
    }
    let mut body = vec![0u8; length as usize];
    reader.read_exact(&mut body).await?;
    Ok(Envelope { message_type, body: Bytes::from(body) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn envelope_roundtrips_over_a_pipe() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        write_envelope(&mut client, 7, b"hello world").await.unwrap();
        let envelope = read_envelope(&mut server).await.unwrap();
        assert_eq!(envelope.message_type, 7);
        assert_eq!(&envelope.body[..], b"hello world");
    }

    #[tokio::test]
    async fn oversized_length_is_rejected_before_allocating() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_u8(1).await.unwrap();
        client.write_u32_le(MAX_BODY_BYTES + 1).await.unwrap();
        let err = read_envelope(&mut server).await.unwrap_err();
        assert!(matches!(err, WireError::BodyTooLarge(_)));
    }
}
