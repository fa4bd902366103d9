//! Metrics definitions for the megaverse core.

use shared::metrics_defs::{MetricDef, MetricType};

pub const UPSTREAM_REQUESTS: MetricDef = MetricDef {
    name: "upstream.requests",
    metric_type: MetricType::Counter,
    description: "Requests sent to the map API. Tagged with object_type, method, outcome.",
};

pub const UPSTREAM_REQUEST_DURATION: MetricDef = MetricDef {
    name: "upstream.request.duration",
    metric_type: MetricType::Histogram,
    description: "Duration of a single map API request in seconds. Tagged with object_type.",
};

pub const UPSTREAM_RETRIES: MetricDef = MetricDef {
    name: "upstream.retries",
    metric_type: MetricType::Counter,
    description: "Attempts beyond the first for a single dispatch. Tagged with object_type.",
};

pub const GRID_RESET_CELLS: MetricDef = MetricDef {
    name: "grid.reset.cells",
    metric_type: MetricType::Counter,
    description: "Cells cleared by grid resets. Tagged with outcome.",
};

pub const BULK_OPERATIONS: MetricDef = MetricDef {
    name: "bulk.operations",
    metric_type: MetricType::Counter,
    description: "Operations executed by bulk and plan runs. Tagged with source, outcome.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    UPSTREAM_REQUESTS,
    UPSTREAM_REQUEST_DURATION,
    UPSTREAM_RETRIES,
    GRID_RESET_CELLS,
    BULK_OPERATIONS,
];
