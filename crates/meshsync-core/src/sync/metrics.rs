//! Cross-zone synchronization metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding application installs a recorder.
//!
//! ## Metrics
//!
//! - `meshsync_sync_total` - Successful remote state fetches, by zone
//! - `meshsync_sync_errors_total` - Failed polls, by zone and operation (`get-instances`, `get-state`)
//! - `meshsync_sync_duration_seconds` - Duration of one poll, by zone
//! - `meshsync_sync_cancelled_total` - Poller streams cancelled by their consumer
//! - `meshsync_dropped_items_total` - Values overwritten in most-recent-wins buffers, by stage
//! - `meshsync_aggregator_source_errors_total` - Errors reported by aggregator sources, by source

use meshsync_types::error::SyncError;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::sync::Once;
use std::time::Duration;

static DESCRIBE: Once = Once::new();

/// Register metric descriptions with the installed recorder (once).
pub fn describe_sync_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!("meshsync_sync_total", "Total successful remote zone state fetches");
        describe_counter!(
            "meshsync_sync_errors_total",
            "Total failed remote zone polls by operation"
        );
        describe_histogram!(
            "meshsync_sync_duration_seconds",
            "Duration of one remote zone poll in seconds"
        );
        describe_counter!(
            "meshsync_sync_cancelled_total",
            "Total remote zone pollers cancelled by their consumer"
        );
        describe_counter!(
            "meshsync_dropped_items_total",
            "Total values overwritten before delivery in most-recent-wins buffers"
        );
        describe_counter!(
            "meshsync_aggregator_source_errors_total",
            "Total errors reported by aggregator sources"
        );
    });
}

pub fn record_sync_success(zone: &str) {
    counter!("meshsync_sync_total", "zone" => zone.to_string()).increment(1);
}

pub fn record_sync_error(error: &SyncError) {
    let labels = [
        ("zone", error.zone().unwrap_or("unknown").to_string()),
        ("operation", error.operation().to_string()),
    ];
    counter!("meshsync_sync_errors_total", &labels).increment(1);
}

pub fn record_sync_duration(zone: &str, elapsed: Duration) {
    histogram!("meshsync_sync_duration_seconds", "zone" => zone.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_sync_cancelled(zone: &str) {
    counter!("meshsync_sync_cancelled_total", "zone" => zone.to_string()).increment(1);
}

pub fn record_dropped_item(stage: &str) {
    counter!("meshsync_dropped_items_total", "stage" => stage.to_string()).increment(1);
}

pub fn record_source_error(source: &str) {
    counter!("meshsync_aggregator_source_errors_total", "source" => source.to_string())
        .increment(1);
}
