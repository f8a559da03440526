//! Export of collected achievements.

mod format;
mod json;

pub use format::ExportFormat;
pub use json::{JsonExporter, format_json_entry};
