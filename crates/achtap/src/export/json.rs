//! JSON export format implementation

use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use crate::achievement::AchievementItem;
use crate::error::Result;

use super::format::ExportFormat;

/// Pretty JSON document `{"achievement_list": [...]}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

#[derive(Serialize)]
struct AchievementList<'a> {
    achievement_list: &'a [AchievementItem],
}

impl ExportFormat for JsonExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn format_item(&self, item: &AchievementItem) -> Result<String> {
        Ok(format_json_entry(item).to_string())
    }

    fn format_items(&self, items: &[AchievementItem]) -> Result<String> {
        let mut output = serde_json::to_string_pretty(&AchievementList {
            achievement_list: items,
        })?;
        output.push('\n');
        Ok(output)
    }
}

/// One achievement with its completion time spelled out, for logs and
/// line-oriented consumers.
pub fn format_json_entry(item: &AchievementItem) -> JsonValue {
    json!({
        "id": item.id,
        "status": item.status.short_name(),
        "current_progress": item.current_progress,
        "total_progress": item.total_progress,
        "finished_at": item.finished_at().map(|t| t.to_rfc3339()),
    })
}
