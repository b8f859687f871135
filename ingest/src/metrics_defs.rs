use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with status, handler.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const IMPORT_ROWS: MetricDef = MetricDef {
    name: "import.rows",
    metric_type: MetricType::Counter,
    description: "Rows committed to the call record table",
};

pub const IMPORT_FAILURES: MetricDef = MetricDef {
    name: "import.failures",
    metric_type: MetricType::Counter,
    description: "Import attempts that were rolled back",
};

pub const UPSERT_CHUNKS: MetricDef = MetricDef {
    name: "upsert.chunks",
    metric_type: MetricType::Counter,
    description: "Chunk statements executed against the store",
};

pub const UPSERT_DURATION: MetricDef = MetricDef {
    name: "upsert.duration",
    metric_type: MetricType::Histogram,
    description: "Time from begin to commit or rollback in seconds. Tagged with status.",
};

pub const DEDUP_FRESH: MetricDef = MetricDef {
    name: "dedup.fresh",
    metric_type: MetricType::Counter,
    description: "Submission keys seen for the first time inside the window",
};

pub const DEDUP_DUPLICATE: MetricDef = MetricDef {
    name: "dedup.duplicate",
    metric_type: MetricType::Counter,
    description: "Submission keys short-circuited as duplicates",
};

pub const PUSH_ENQUEUED: MetricDef = MetricDef {
    name: "push.enqueued",
    metric_type: MetricType::Counter,
    description: "Push jobs handed to the persistence worker",
};

pub const PUSH_FAILED: MetricDef = MetricDef {
    name: "push.failed",
    metric_type: MetricType::Counter,
    description: "Push jobs whose persistence failed",
};

pub const AUDIT_WRITE_FAILURES: MetricDef = MetricDef {
    name: "audit.write_failures",
    metric_type: MetricType::Counter,
    description: "Import outcomes that could not be written to the audit log",
};

// Described to the recorder at startup.
pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    IMPORT_ROWS,
    IMPORT_FAILURES,
    UPSERT_CHUNKS,
    UPSERT_DURATION,
    DEDUP_FRESH,
    DEDUP_DUPLICATE,
    PUSH_ENQUEUED,
    PUSH_FAILED,
    AUDIT_WRITE_FAILURES,
];
