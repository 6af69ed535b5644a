//! Metric descriptions. Recording goes through whatever recorder the host
//! process installs; without one the counters are no-ops.

use metrics::{Unit, describe_counter};

pub fn describe_metrics() {
    describe_counter!(
        "doris_records_transformed_total",
        Unit::Count,
        "Records turned into row payloads, by conversion mode or value shape"
    );
    describe_counter!(
        "doris_tombstones_skipped_total",
        Unit::Count,
        "Tombstone records skipped without output"
    );
    describe_counter!(
        "doris_schema_columns_added_total",
        Unit::Count,
        "Columns added to destination tables"
    );
    describe_counter!(
        "doris_table_schema_loads_total",
        Unit::Count,
        "Table schema fetches from the catalog"
    );
    describe_counter!(
        "doris_transform_errors_total",
        Unit::Count,
        "Records that failed to transform, by error kind"
    );
    describe_counter!(
        "doris_sink_payloads_total",
        Unit::Count,
        "Payloads written to a sink"
    );
    describe_counter!(
        "doris_panics_total",
        Unit::Count,
        "Panics captured by the panic hook"
    );
}
