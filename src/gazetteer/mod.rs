//! Gazetteer assembly, normalization and aggregation.

mod aggregate;
mod assemble;
mod build;
mod normalize;

pub use aggregate::{
    aggregate, group_runs, metric_elrs, write_aggregate_rows, write_aggregated_csv,
    write_aggregated_gazetteer, AggregateGroup, AggregateRow, AggregateSummary, DistanceStats,
    ADMIN_AREA_GROUP, PLACE_GROUP, REGION_GROUP,
};
pub use assemble::{assemble, read_csv, read_records, write_csv, write_records};
pub use build::{BuildSummary, GazetteerBuilder};
pub use normalize::{
    load_into_store, normalize, normalize_command, sqlite_load_command, AGGREGATED_CSV_PLACEHOLDER,
    RAW_CSV_PLACEHOLDER,
};
