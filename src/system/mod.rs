pub(crate) mod summary_output;

pub(crate) use summary_output::{selection_lines, summary_json, summary_lines, write_summary_json};
