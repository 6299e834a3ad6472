use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

const LATENCY_BUCKETS: [f64; 16] = [
    0.001, 0.002, 0.005, 0.007, 0.01, 0.015, 0.02, 0.025, 0.03, 0.04, 0.05, 0.075, 0.1, 0.15,
    0.2, 0.5,
];

/// Per-handle instruments. No-ops unless the host installed a meter provider.
pub struct InferenceMetrics {
    duration: Histogram<f64>,
    runs: Counter<u64>,
    failures: Counter<u64>,
}

impl InferenceMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let duration = meter
            .f64_histogram("inference_duration_seconds")
            .with_description("Time to run a single image (decode + preprocess + infer)")
            .with_unit("s")
            .with_boundaries(LATENCY_BUCKETS.to_vec())
            .build();
        let runs = meter
            .u64_counter("inference_runs_total")
            .with_description("Total inference calls completed successfully")
            .build();
        let failures = meter
            .u64_counter("inference_failures_total")
            .with_description("Total inference calls that returned an error")
            .build();

        Self {
            duration,
            runs,
            failures,
        }
    }

    pub fn record_success(&self, elapsed: Duration) {
        self.duration.record(elapsed.as_secs_f64(), &[]);
        self.runs.add(1, &[]);
    }

    pub fn record_failure(&self, kind: &'static str) {
        self.failures.add(1, &[KeyValue::new("error", kind)]);
    }
}

impl Default for InferenceMetrics {
    fn default() -> Self {
        Self::new("inference")
    }
}
