//! Progress reporting and the run summary. Replaces the "global progress
//! dialog singleton" anti-pattern (see DESIGN.md / SPEC_FULL.md §9) with a
//! capability object passed into the driver, on the same
//! feedback-channel shape as `kitchen-fridge::provider`'s
//! `FeedbackSender`/`SyncEvent`.

use std::fmt::Write as _;

use tokio::sync::mpsc::UnboundedSender;

/// Which half of the run a log line belongs to, for the two-section run
/// summary (§6 of SPEC_FULL.md). An explicit extension over the distilled
/// spec's single-argument `label(text)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogSection {
    /// Phases 1-3: changes pushed to the remote.
    Remote,
    /// Phase 4: changes applied locally.
    Local,
}

#[derive(Clone, Debug)]
pub enum SyncEvent {
    Started,
    Tick { step: usize, out_of: usize },
    Label { text: String, section: LogSection },
    Finished { success: bool },
}

pub type FeedbackSender = UnboundedSender<SyncEvent>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub remote_created_tasks: usize,
    pub remote_updated_tasks: usize,
    pub remote_deleted_tasks: usize,
    pub merged_tasks: usize,
    pub local_created_tasks: usize,
    pub local_updated_tasks: usize,
    pub local_deleted_tasks: usize,
}

impl RunStats {
    pub fn is_all_zero(&self) -> bool {
        *self == RunStats::default()
    }
}

/// Accumulates the run's visible log and forwards a non-blocking feedback
/// stream to the UI, mirroring `kitchen-fridge::provider`'s `SyncProgress`.
pub struct SyncProgress {
    feedback_sender: Option<FeedbackSender>,
    remote_log: Vec<String>,
    local_log: Vec<String>,
    background_mode: bool,
}

impl SyncProgress {
    pub fn new() -> Self {
        Self {
            feedback_sender: None,
            remote_log: Vec::new(),
            local_log: Vec::new(),
            background_mode: false,
        }
    }

    pub fn with_feedback_channel(sender: FeedbackSender, background_mode: bool) -> Self {
        Self {
            feedback_sender: Some(sender),
            remote_log: Vec::new(),
            local_log: Vec::new(),
            background_mode,
        }
    }

    fn feedback(&self, event: SyncEvent) {
        if let Some(sender) = &self.feedback_sender {
            // Non-blocking: an unbounded channel never awaits the UI thread.
            let _ = sender.send(event);
        }
    }

    pub fn started(&self) {
        log::info!("Starting a sync.");
        self.feedback(SyncEvent::Started);
    }

    pub fn tick(&self, step: usize, out_of: usize) {
        self.feedback(SyncEvent::Tick { step, out_of });
    }

    /// Records a visible log line. In background mode this is the *only*
    /// kind of progress output retained.
    pub fn label(&mut self, text: impl Into<String>, section: LogSection) {
        let text = text.into();
        log::debug!("{}", text);
        match section {
            LogSection::Remote => self.remote_log.push(text.clone()),
            LogSection::Local => self.local_log.push(text.clone()),
        }
        self.feedback(SyncEvent::Label { text, section });
    }

    pub fn warn(&self, text: &str) {
        log::warn!("{}", text);
    }

    pub fn error(&self, text: &str) {
        log::error!("{}", text);
    }

    pub fn remote_log(&self) -> &[String] {
        &self.remote_log
    }

    pub fn local_log(&self) -> &[String] {
        &self.local_log
    }

    pub fn finished(&self, success: bool) {
        self.feedback(SyncEvent::Finished { success });
    }

    /// Renders the run summary, or `None` if every counter is zero or the
    /// host asked to suppress it.
    pub fn summary(&self, provider_display_name: &str, stats: &RunStats, suppress: bool) -> Option<String> {
        if suppress || stats.is_all_zero() {
            return None;
        }
        if self.background_mode && self.remote_log.is_empty() && self.local_log.is_empty() {
            return None;
        }

        let mut out = String::new();
        let _ = writeln!(out, "Sync with {}", provider_display_name);

        if !self.remote_log.is_empty() {
            let _ = writeln!(out, "\non remote server:");
            for line in &self.remote_log {
                let _ = writeln!(out, "  {}", line);
            }
        }
        if !self.local_log.is_empty() {
            let _ = writeln!(out, "\non astrid:");
            for line in &self.local_log {
                let _ = writeln!(out, "  {}", line);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "created locally: {}", stats.local_created_tasks);
        let _ = writeln!(out, "updated locally: {}", stats.local_updated_tasks);
        let _ = writeln!(out, "deleted locally: {}", stats.local_deleted_tasks);
        let _ = writeln!(out, "merged: {}", stats.merged_tasks);
        let _ = writeln!(out, "created remotely: {}", stats.remote_created_tasks);
        let _ = writeln!(out, "updated remotely: {}", stats.remote_updated_tasks);
        let _ = writeln!(out, "deleted remotely: {}", stats.remote_deleted_tasks);

        Some(out)
    }
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_suppressed_when_all_zero() {
        let progress = SyncProgress::new();
        let stats = RunStats::default();
        assert!(progress.summary("Test Provider", &stats, false).is_none());
    }

    #[test]
    fn summary_groups_lines_by_section() {
        let mut progress = SyncProgress::new();
        progress.label("added 'Buy milk'", LogSection::Remote);
        progress.label("updated 'Gym'", LogSection::Local);
        let stats = RunStats {
            remote_created_tasks: 1,
            local_updated_tasks: 1,
            ..RunStats::default()
        };
        let text = progress.summary("Test Provider", &stats, false).unwrap();
        assert!(text.contains("on remote server"));
        assert!(text.contains("on astrid"));
        assert!(text.contains("added 'Buy milk'"));
    }
}
