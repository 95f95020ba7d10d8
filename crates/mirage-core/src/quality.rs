use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One `{bitrate, duration, payload}` triple of a probe ladder (GLOSSARY:
/// Stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTestStage {
    pub id: u32,
    pub target_bitrate_bps: u64,
    pub duration_ms: u32,
    pub payload_bytes: u16,
}

/// Ordered list of stages executed sequentially by the quality-probe
/// subsystem (spec.md §4.11).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTestPlan {
    pub test_id: Uuid,
    pub stages: Vec<QualityTestStage>,
}

impl QualityTestPlan {
    pub fn new(stages: Vec<QualityTestStage>) -> Self {
        Self {
            test_id: Uuid::new_v4(),
            stages,
        }
    }
}

/// Result of one stage, reported by the client back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityTestStageResult {
    pub stage_id: u32,
    pub throughput_bps: f64,
    pub loss_percent: f64,
    pub stable: bool,
}

impl QualityTestStageResult {
    /// A stage is "stable" iff observed throughput clears the floor ratio
    /// of the *payload* bitrate (excluding header overhead) and loss stays
    /// under the ceiling (spec.md §4.11 point 4).
    pub fn evaluate(
        stage: &QualityTestStage,
        header_bytes: u16,
        throughput_bps: f64,
        loss_percent: f64,
        throughput_floor: f64,
        loss_ceiling: f64,
    ) -> Self {
        let payload_ratio =
            stage.payload_bytes as f64 / (stage.payload_bytes as f64 + header_bytes as f64);
        let target_payload_bps = stage.target_bitrate_bps as f64 * payload_ratio;
        let stable =
            throughput_bps >= target_payload_bps * throughput_floor && loss_percent <= loss_ceiling;
        Self {
            stage_id: stage.id,
            throughput_bps,
            loss_percent,
            stable,
        }
    }
}
