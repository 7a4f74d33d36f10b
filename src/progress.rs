//! Per-item progress notifications emitted by the analyzer.

use parking_lot::Mutex;

/// Snapshot handed to observers once an item has been resolved (or not).
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// 1-based position of the finished item.
    pub current: usize,
    pub total: usize,
    pub source_url: &'a str,
    pub succeeded: bool,
    pub title: &'a str,
}

pub trait ProgressObserver {
    fn item_finished(&self, progress: &Progress<'_>);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress<'_>),
{
    fn item_finished(&self, progress: &Progress<'_>) {
        self(progress)
    }
}

/// Discards every notification.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn item_finished(&self, _progress: &Progress<'_>) {}
}

/// Prints one line per item, the way the CLI reports progress.
pub struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn item_finished(&self, progress: &Progress<'_>) {
        println!("{}", format_line(progress));
    }
}

/// Records progress lines in memory.
#[derive(Default)]
pub struct ProgressLog {
    lines: Mutex<Vec<String>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl ProgressObserver for ProgressLog {
    fn item_finished(&self, progress: &Progress<'_>) {
        self.lines.lock().push(format_line(progress));
    }
}

pub fn format_line(progress: &Progress<'_>) -> String {
    let status = if progress.succeeded { "ok" } else { "failed" };
    format!(
        "[{}/{}] {status}: {} ({})",
        progress.current, progress.total, progress.title, progress.source_url
    )
}
