use std::path::PathBuf;

use super::{Step, StepKind};
use crate::runner::CommandSpec;

/// `notion-upload <markdown> --title <title> --database-id <id>`
#[derive(Debug, Clone)]
pub struct NotionUpload {
    pub markdown_file: PathBuf,
    pub title: String,
    pub database_id: String,
}

impl Step for NotionUpload {
    const KIND: StepKind = StepKind::NotionUpload;

    fn command(&self) -> CommandSpec {
        CommandSpec::new("notion-upload")
            .arg(&self.markdown_file)
            .arg("--title")
            .arg(&self.title)
            .arg("--database-id")
            .arg(&self.database_id)
    }

    // Uploads leave nothing on disk.
    fn expected_output(&self) -> Option<PathBuf> {
        None
    }
}
