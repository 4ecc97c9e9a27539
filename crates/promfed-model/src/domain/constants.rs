/// Reserved label carrying the series name in upstream query results.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Label matched by the `source_id[]` filter of the render endpoint.
pub const SOURCE_ID_LABEL: &str = "source_id";
