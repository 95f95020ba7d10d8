//! Client-side decode-only probe (spec.md §4.11, last point: "Client can
//! also run a short decode-only probe to characterize its decoder without
//! a network leg"). No network I/O here — the caller supplies a decode
//! closure (backed by the opaque external decoder) and a fixed synthetic
//! payload; this module only times it and summarizes the result.

use std::time::{Duration, Instant};

/// Summary of a decode-only probe run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeProbeResult {
    pub samples: u32,
    pub mean_decode_ms: f64,
    pub p95_decode_ms: f64,
    pub worst_decode_ms: f64,
}

/// Runs `decode_one` `sample_count` times, feeding it `payload` each time,
/// and summarizes the wall-clock cost. `decode_one` is expected to be the
/// same decode call path used on the live media path so the result is
/// representative of `DecodedFrameEntry` production cost.
pub fn run_decode_probe<F>(sample_count: u32, payload: &[u8], mut decode_one: F) -> DecodeProbeResult
where
    F: FnMut(&[u8]),
{
    assert!(sample_count > 0, "decode probe requires at least one sample");
    let mut samples_ms = Vec::with_capacity(sample_count as usize);
    for _ in 0..sample_count {
        let start = Instant::now();
        decode_one(payload);
        samples_ms.push(elapsed_ms(start));
    }
    summarize(&mut samples_ms)
}

fn elapsed_ms(start: Instant) -> f64 {
    let elapsed: Duration = start.elapsed();
    elapsed.as_secs_f64() * 1000.0
}

fn summarize(samples_ms: &mut [f64]) -> DecodeProbeResult {
    samples_ms.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let samples = samples_ms.len() as u32;
    let mean = samples_ms.iter().sum::<f64>() / samples_ms.len() as f64;
    let p95_index = ((samples_ms.len() as f64) * 0.95).ceil() as usize;
    let p95 = samples_ms[p95_index.min(samples_ms.len() - 1)];
    let worst = *samples_ms.last().unwrap();
    DecodeProbeResult { samples, mean_decode_ms: mean, p95_decode_ms: p95, worst_decode_ms: worst }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn probe_runs_the_decode_closure_once_per_sample() {
        let calls = AtomicU32::new(0);
        let result = run_decode_probe(10, &[0u8; 16], |_payload| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(result.samples, 10);
        assert!(result.mean_decode_ms >= 0.0);
        assert!(result.p95_decode_ms >= result.mean_decode_ms || result.samples == 1);
        assert!(result.worst_decode_ms >= result.p95_decode_ms);
    }

    #[test]
    #[should_panic(expected = "at least one sample")]
    fn probe_rejects_zero_samples() {
        run_decode_probe(0, &[], |_| {});
    }
}
