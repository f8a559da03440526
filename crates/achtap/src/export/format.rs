//! ExportFormat trait definition

use std::fs;
use std::path::Path;

use crate::achievement::AchievementItem;
use crate::error::Result;

/// Trait for export format implementations
///
/// Receives the final item list of a collection run.
pub trait ExportFormat {
    /// File extension without the dot
    fn extension(&self) -> &'static str;

    /// Returns the header line for the format (empty for formats without headers)
    fn header(&self) -> Option<String> {
        None
    }

    /// Format a single achievement
    fn format_item(&self, item: &AchievementItem) -> Result<String>;

    /// Format the whole list
    fn format_items(&self, items: &[AchievementItem]) -> Result<String> {
        let mut output = String::new();
        if let Some(header) = self.header() {
            output.push_str(&header);
            output.push('\n');
        }
        for item in items {
            output.push_str(&self.format_item(item)?);
            output.push('\n');
        }
        Ok(output)
    }

    fn write_to(&self, path: &Path, items: &[AchievementItem]) -> Result<()> {
        fs::write(path, self.format_items(items)?)?;
        Ok(())
    }
}
