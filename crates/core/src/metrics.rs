//! Prometheus metrics for catalog operations.
//!
//! The server registers these alongside its HTTP metrics.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Artifact operations
// =============================================================================

/// Artifact operations by content type, operation and outcome.
pub static ARTIFACT_OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "libris_artifact_operations_total",
            "Total artifact operations",
        ),
        &["content_type", "operation", "outcome"], // outcome: "ok" or an error kind
    )
    .unwrap()
});

/// Artifact operation duration in seconds.
pub static ARTIFACT_OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "libris_artifact_operation_duration_seconds",
            "Duration of artifact operations",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        &["content_type", "operation"],
    )
    .unwrap()
});

/// Rows deleted again because their staged assets could not be promoted.
pub static CREATE_COMPENSATIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "libris_create_compensations_total",
        "Created rows removed after asset promotion failed",
    )
    .unwrap()
});

/// Old files left behind after a rename-style file replacement.
pub static ORPHANED_FILES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "libris_orphaned_files_total",
        "Replaced asset files that could not be removed",
    )
    .unwrap()
});

// =============================================================================
// Asset storage
// =============================================================================

/// Bytes written to final asset paths.
pub static ASSET_BYTES_WRITTEN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "libris_asset_bytes_written_total",
        "Total bytes written to asset storage",
    )
    .unwrap()
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ARTIFACT_OPERATIONS.clone()),
        Box::new(ARTIFACT_OPERATION_DURATION.clone()),
        Box::new(CREATE_COMPENSATIONS.clone()),
        Box::new(ORPHANED_FILES.clone()),
        Box::new(ASSET_BYTES_WRITTEN.clone()),
    ]
}
