use std::io::Write;

use anyhow::{Context, Result};

use crate::sync_command::SyncSummary;

/// Consoleに同期結果を表示するためのtrait。
pub trait ConsolePresenter {
    /// 同期結果の件数を表示する。
    ///
    /// # Arguments
    ///
    /// * `summary` - 表示する同期結果
    fn show_summary(&mut self, summary: &SyncSummary) -> Result<()>;
}

/// 同期結果をMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    fn show_summary(&mut self, summary: &SyncSummary) -> Result<()> {
        let rows = [
            ("Tasks synced", summary.synced_tasks),
            ("Tasks already synced", summary.already_synced_tasks),
            ("Tasks skipped", summary.skipped_tasks),
            ("Tasks failed", summary.failed_tasks),
            ("Entries created", summary.created_entries),
            ("Entries already in Asana", summary.existing_entries),
        ];

        writeln!(self.writer, "## Sync summary").context("Failed to write summary header")?;
        for (label, count) in rows {
            writeln!(self.writer, "- {}: {}", label, count)
                .with_context(|| format!("Failed to write summary row: {}", label))?;
        }

        Ok(())
    }
}
