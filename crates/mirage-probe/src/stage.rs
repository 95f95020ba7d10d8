//! Host-driven staged bandwidth sweep (spec.md §4.11).
//!
//! [`HostProbeDriver`] emits the paced UDP packets for one stage from the
//! host side. [`StageAccumulator`] is the client-side counterpart: armed
//! per `testID` before the host starts sending, it tallies received bytes
//! and packets and finalizes into a [`QualityTestStageResult`] (spec.md
//! §4.11 points 1-4). [`SweepPlanner`] decides which stage to run next
//! given the results reported so far.

use std::time::{Duration, Instant};

use mirage_core::policy::ProbePolicy;
use mirage_core::{QualityTestPlan, QualityTestStage, QualityTestStageResult};
use mirage_sender::{DatagramSink, Pacer};
use mirage_wire::probe::{QualityTestPacketHeader, PROBE_HEADER_SIZE};
use uuid::Uuid;

use crate::error::ProbeError;

/// Paces and emits one stage's worth of probe packets onto `sink` (spec.md
/// §4.11 point 2). The pacer's bitrate is the stage's `targetBitrateBps`,
/// not an adaptive value, since the whole point of the sweep is to probe
/// at a fixed rate.
pub struct HostProbeDriver<'a> {
    test_id: Uuid,
    sink: &'a dyn DatagramSink,
}

impl<'a> HostProbeDriver<'a> {
    pub fn new(test_id: Uuid, sink: &'a dyn DatagramSink) -> Self {
        Self { test_id, sink }
    }

    /// Sends paced packets for `stage.durationMs`, returns the number of
    /// packets emitted.
    pub async fn run_stage(&self, stage: &QualityTestStage) -> Result<u32, ProbeError> {
        let mut pacer = Pacer::new(mirage_core::policy::PacerPolicy::default(), stage.target_bitrate_bps);
        let packet_len = PROBE_HEADER_SIZE + stage.payload_bytes as usize;
        let payload = vec![0u8; stage.payload_bytes as usize];

        let stage_start = Instant::now();
        let deadline = stage_start + Duration::from_millis(stage.duration_ms as u64);
        let mut sequence_number = 0u32;

        while Instant::now() < deadline {
            if let Some(wait) = pacer.consume(packet_len) {
                tokio::time::sleep(wait.min(deadline.saturating_duration_since(Instant::now()))).await;
                if Instant::now() >= deadline {
                    break;
                }
                continue;
            }
            let header = QualityTestPacketHeader {
                test_id: self.test_id,
                stage_id: stage.id,
                sequence_number,
                payload_length: stage.payload_bytes as u32,
                sent_at_ns: Instant::now().duration_since(stage_start).as_nanos() as u64,
            };
            let mut datagram = Vec::with_capacity(packet_len);
            datagram.extend_from_slice(&header.encode());
            datagram.extend_from_slice(&payload);
            self.sink.send(&datagram).await?;
            sequence_number += 1;
        }
        Ok(sequence_number)
    }
}

/// Client-side per-stage receive accumulator, armed before the host starts
/// sending a stage (spec.md §4.11 point 1, "host arms an accumulator on
/// the client keyed by testID and plan").
pub struct StageAccumulator {
    test_id: Uuid,
    stage: QualityTestStage,
    bytes_received: u64,
    packets_received: u32,
    highest_sequence_seen: Option<u32>,
    started_at: Instant,
}

impl StageAccumulator {
    pub fn arm(test_id: Uuid, stage: QualityTestStage, now: Instant) -> Self {
        Self {
            test_id,
            stage,
            bytes_received: 0,
            packets_received: 0,
            highest_sequence_seen: None,
            started_at: now,
        }
    }

    /// Records one received probe packet. Ignores packets for a different
    /// `testID`/`stageID` (a stale stage's trailing packets after the
    /// client has already armed the next one).
    pub fn record(&mut self, header: &QualityTestPacketHeader, payload_len: usize) {
        if header.test_id != self.test_id || header.stage_id != self.stage.id {
            return;
        }
        self.bytes_received += payload_len as u64;
        self.packets_received += 1;
        self.highest_sequence_seen = Some(match self.highest_sequence_seen {
            Some(current) => current.max(header.sequence_number),
            None => header.sequence_number,
        });
    }

    /// Finalizes the stage (spec.md §4.11 point 3-4): computes throughput
    /// from elapsed wall time and loss from the gap between packets
    /// received and the highest sequence number observed (0-indexed, so
    /// `expected = highest_sequence_seen + 1`).
    pub fn finish(self, now: Instant, probe_policy: ProbePolicy) -> QualityTestStageResult {
        let elapsed = now.duration_since(self.started_at).as_secs_f64().max(f64::MIN_POSITIVE);
        let throughput_bps = (self.bytes_received as f64 * 8.0) / elapsed;

        let expected_packets = self.highest_sequence_seen.map(|s| s + 1).unwrap_or(0);
        let loss_percent = if expected_packets == 0 {
            100.0
        } else {
            let lost = expected_packets.saturating_sub(self.packets_received);
            lost as f64 / expected_packets as f64 * 100.0
        };

        QualityTestStageResult::evaluate(
            &self.stage,
            PROBE_HEADER_SIZE as u16,
            throughput_bps,
            loss_percent,
            probe_policy.throughput_floor,
            probe_policy.loss_ceiling_percent,
        )
    }
}

/// Decides which stage to run next, or whether the sweep is complete or
/// should abort (spec.md §4.11: "the host ladder may continue or abort
/// based on stage stability").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    RunStage(u32),
    Aborted { at_stage: u32 },
    Completed,
}

pub struct SweepPlanner;

impl SweepPlanner {
    /// `results_so_far` must be in stage-completion order. The sweep
    /// aborts as soon as a stage reports unstable, since higher stages in
    /// the ladder only ask for more bandwidth.
    pub fn next_action(plan: &QualityTestPlan, results_so_far: &[QualityTestStageResult]) -> Result<SweepAction, ProbeError> {
        if plan.stages.is_empty() {
            return Err(ProbeError::EmptyPlan);
        }
        if let Some(last) = results_so_far.last() {
            if !last.stable {
                return Ok(SweepAction::Aborted { at_stage: last.stage_id });
            }
        }
        match plan.stages.get(results_so_far.len()) {
            Some(stage) => Ok(SweepAction::RunStage(stage.id)),
            None => Ok(SweepAction::Completed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(id: u32, bitrate: u64) -> QualityTestStage {
        QualityTestStage { id, target_bitrate_bps: bitrate, duration_ms: 200, payload_bytes: 1200 }
    }

    fn header(test_id: Uuid, stage_id: u32, sequence_number: u32) -> QualityTestPacketHeader {
        QualityTestPacketHeader {
            test_id,
            stage_id,
            sequence_number,
            payload_length: 1200,
            sent_at_ns: 0,
        }
    }

    #[test]
    fn accumulator_ignores_packets_from_a_different_test_or_stage() {
        let test_id = Uuid::new_v4();
        let t0 = Instant::now();
        let mut acc = StageAccumulator::arm(test_id, stage(1, 10_000_000), t0);
        acc.record(&header(Uuid::new_v4(), 1, 0), 1200);
        acc.record(&header(test_id, 2, 0), 1200);
        assert_eq!(acc.packets_received, 0);
    }

    #[test]
    fn accumulator_computes_loss_from_sequence_gaps() {
        let test_id = Uuid::new_v4();
        let t0 = Instant::now();
        let mut acc = StageAccumulator::arm(test_id, stage(1, 80_000_000), t0);
        for seq in [0u32, 1, 3, 4] {
            acc.record(&header(test_id, 1, seq), 1200);
        }
        let result = acc.finish(t0 + Duration::from_millis(200), ProbePolicy::default());
        // 4 received out of 5 expected (0..=4) -> 20% loss.
        assert!((result.loss_percent - 20.0).abs() < 1e-9);
        assert!(!result.stable);
    }

    #[test]
    fn sweep_planner_aborts_after_first_unstable_stage() {
        let plan = QualityTestPlan::new(vec![stage(1, 10_000_000), stage(2, 80_000_000)]);
        let results = vec![QualityTestStageResult { stage_id: 1, throughput_bps: 1.0, loss_percent: 50.0, stable: false }];
        assert_eq!(
            SweepPlanner::next_action(&plan, &results).unwrap(),
            SweepAction::Aborted { at_stage: 1 }
        );
    }

    #[test]
    fn sweep_planner_completes_after_last_stable_stage() {
        let plan = QualityTestPlan::new(vec![stage(1, 10_000_000)]);
        let results = vec![QualityTestStageResult { stage_id: 1, throughput_bps: 9_000_000.0, loss_percent: 0.0, stable: true }];
        assert_eq!(SweepPlanner::next_action(&plan, &results).unwrap(), SweepAction::Completed);
    }

    #[test]
    fn sweep_planner_runs_first_stage_with_no_results_yet() {
        let plan = QualityTestPlan::new(vec![stage(1, 10_000_000)]);
        assert_eq!(SweepPlanner::next_action(&plan, &[]).unwrap(), SweepAction::RunStage(1));
    }

    #[test]
    fn sweep_planner_rejects_an_empty_plan() {
        let plan = QualityTestPlan::new(vec![]);
        assert!(matches!(SweepPlanner::next_action(&plan, &[]), Err(ProbeError::EmptyPlan)));
    }
}
