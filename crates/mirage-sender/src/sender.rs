//! Per-stream packet sender actor (spec.md §4.3). Consumes `WorkItem`s,
//! fragments them, attaches XOR parity, paces egress, and emits encrypted
//! datagrams onto a [`DatagramSink`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use mirage_core::{FrameFlags, FrameHeader};
use mirage_security::{Direction, SessionKeys};
use tokio::sync::Mutex as AsyncMutex;
use tracing::trace;

use crate::error::SenderError;
use crate::fec;
use crate::pacer::Pacer;
use crate::sink::DatagramSink;
use crate::state::GenerationControl;
use crate::work_item::WorkItem;

pub struct PacketSender {
    sink: Arc<dyn DatagramSink>,
    keys: Option<Arc<SessionKeys>>,
    pub generation: Arc<GenerationControl>,
    pacer: AsyncMutex<Pacer>,
    max_payload: usize,
    latest_keyframe_frame_number: AtomicU32,
}

impl PacketSender {
    pub fn new(
        sink: Arc<dyn DatagramSink>,
        keys: Option<Arc<SessionKeys>>,
        pacer: Pacer,
        max_payload: usize,
    ) -> Self {
        Self {
            sink,
            keys,
            generation: Arc::new(GenerationControl::new()),
            pacer: AsyncMutex::new(pacer),
            max_payload,
            latest_keyframe_frame_number: AtomicU32::new(0),
        }
    }

    pub async fn set_bitrate(&self, bitrate_bps: u64) {
        self.pacer.lock().await.set_bitrate(bitrate_bps);
    }

    /// Process one `WorkItem` through fragmentation, FEC, pacing, and
    /// egress (spec.md §4.3 points 1-5).
    pub async fn process_item(&self, item: WorkItem) -> Result<(), SenderError> {
        let current_generation = self.generation.current_generation();
        if item.generation != current_generation {
            return Err(SenderError::StaleGeneration);
        }

        if item.is_keyframe {
            let previous = self.latest_keyframe_frame_number.fetch_max(item.frame_number, Ordering::AcqRel);
            if previous > item.frame_number {
                return Err(SenderError::SupersededByKeyframe);
            }
        } else if self.generation.should_drop_non_keyframes() {
            return Err(SenderError::AwaitingKeyframe);
        }

        if item.is_keyframe {
            if let Some(callbacks) = &item.callbacks {
                callbacks.on_send_start(item.frame_number);
            }
        }

        let frame_bytes = item.encoded_data.len() as u32;
        let data_fragments: Vec<&[u8]> = item.encoded_data.chunks(self.max_payload).collect();
        let data_fragment_count = data_fragments.len() as u32;
        let parity_count = fec::parity_fragment_count(data_fragment_count, item.fec_block_size);
        if data_fragment_count + parity_count > u16::MAX as u32 {
            return Err(SenderError::FrameTooLarge);
        }
        let fragment_count = (data_fragment_count + parity_count) as u16;

        let mut sequence_number = item.sequence_start;

        for (i, payload) in data_fragments.iter().enumerate() {
            if self.generation.current_generation() != item.generation {
                return Err(SenderError::StaleGeneration);
            }

            let mut flags = FrameFlags::empty();
            if item.is_keyframe {
                flags = flags.with(FrameFlags::KEYFRAME);
            }
            if i == 0 && item.is_keyframe {
                flags = flags.with(FrameFlags::PARAMETER_SET);
            }
            if i == 0 && item.discontinuity {
                flags = flags.with(FrameFlags::DISCONTINUITY);
            }
            if parity_count == 0 && i + 1 == data_fragments.len() {
                flags = flags.with(FrameFlags::END_OF_FRAME);
            }

            self.emit_fragment(&item, flags, i as u16, fragment_count, frame_bytes, sequence_number, payload)
                .await?;
            sequence_number = sequence_number.wrapping_add(1);
        }

        if parity_count > 0 {
            let block_size = item.fec_block_size as usize;
            for block_index in 0..parity_count as usize {
                let start = block_index * block_size;
                let end = ((block_index + 1) * block_size).min(data_fragments.len());
                let parity = fec::compute_parity(&data_fragments[start..end]);

                let mut flags = FrameFlags::empty().with(FrameFlags::FEC_PARITY);
                if item.is_keyframe {
                    flags = flags.with(FrameFlags::KEYFRAME);
                }
                if block_index + 1 == parity_count as usize {
                    flags = flags.with(FrameFlags::END_OF_FRAME);
                }

                let fragment_index = data_fragments.len() as u16 + block_index as u16;
                self.emit_fragment(&item, flags, fragment_index, fragment_count, frame_bytes, sequence_number, &parity)
                    .await?;
                sequence_number = sequence_number.wrapping_add(1);
            }
        }

        if item.is_keyframe {
            if let Some(callbacks) = &item.callbacks {
                callbacks.on_send_complete(item.frame_number);
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit_fragment(
        &self,
        item: &WorkItem,
        mut flags: FrameFlags,
        fragment_index: u16,
        fragment_count: u16,
        frame_byte_count: u32,
        sequence_number: u32,
        plaintext: &[u8],
    ) -> Result<(), SenderError> {
        if self.keys.is_some() {
            flags = flags.with(FrameFlags::ENCRYPTED_PAYLOAD);
        }

        let header = FrameHeader {
            flags,
            stream_id: item.stream_id,
            sequence_number,
            timestamp_ns: item.presentation_time_ns,
            frame_number: item.frame_number,
            fragment_index,
            fragment_count,
            payload_length: plaintext.len() as u16,
            frame_byte_count,
            crc32: mirage_wire::compute_crc32(plaintext),
            content_rect: item.content_rect,
            dimension_token: item.dimension_token,
            epoch: item.epoch,
        };
        let header_bytes = mirage_wire::encode_header(&header);

        let mut datagram = Vec::with_capacity(header_bytes.len() + plaintext.len() + 16);
        datagram.extend_from_slice(&header_bytes);
        if let Some(keys) = &self.keys {
            let nonce =
                keys.packet_nonce(Direction::HostToClient, item.stream_id, item.frame_number, sequence_number);
            let sealed = mirage_security::seal(&keys.key_h2c, &nonce, &header_bytes, plaintext);
            datagram.extend_from_slice(&sealed);
        } else {
            datagram.extend_from_slice(plaintext);
        }

        if let Some(wait) = self.pacer.lock().await.consume(datagram.len()) {
            trace!(wait_ms = wait.as_millis() as u64, "pacer deficit, suspending");
            tokio::time::sleep(wait).await;
        }

        self.sink.send(&datagram).await?;
        Ok(())
    }
}
