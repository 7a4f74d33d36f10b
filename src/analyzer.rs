//! Batch orchestration: one record per input, in input order.

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{BackendMode, FetchRequest, MetadataFetcher, select_backend};
use crate::config::AnalyzerSettings;
use crate::error::FetchError;
use crate::extract::extract_video_id;
use crate::progress::{Progress, ProgressObserver};
use crate::record::CanonicalRecord;

const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Resolved(CanonicalRecord),
    Failed {
        record: CanonicalRecord,
        reason: FetchError,
    },
}

impl ItemOutcome {
    pub fn record(&self) -> &CanonicalRecord {
        match self {
            ItemOutcome::Resolved(record) | ItemOutcome::Failed { record, .. } => record,
        }
    }

    pub fn into_record(self) -> CanonicalRecord {
        match self {
            ItemOutcome::Resolved(record) | ItemOutcome::Failed { record, .. } => record,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ItemOutcome::Resolved(_))
    }

    fn failed(source_url: &str, identifier: Option<&str>, reason: FetchError) -> Self {
        ItemOutcome::Failed {
            record: CanonicalRecord::placeholder(source_url, identifier, &reason),
            reason,
        }
    }
}

/// How long to wait after the item at `index` before starting the next one.
pub trait DelayPolicy {
    fn delay_after(&self, index: usize, total: usize, mode: BackendMode) -> Duration;
}

/// Uniform random pause in `[min, max)` between fallback requests. The API
/// backend is never paced and nothing follows the last item.
#[derive(Debug, Clone, Copy)]
pub struct RandomPacing {
    pub min: Duration,
    pub max: Duration,
}

impl RandomPacing {
    pub fn from_settings(settings: &AnalyzerSettings) -> Self {
        Self {
            min: settings.pacing_min,
            max: settings.pacing_max,
        }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..self.max)
    }
}

impl DelayPolicy for RandomPacing {
    fn delay_after(&self, index: usize, total: usize, mode: BackendMode) -> Duration {
        if mode != BackendMode::Fallback || index + 1 >= total {
            return Duration::ZERO;
        }
        self.sample()
    }
}

pub struct NoPacing;

impl DelayPolicy for NoPacing {
    fn delay_after(&self, _index: usize, _total: usize, _mode: BackendMode) -> Duration {
        Duration::ZERO
    }
}

/// Owns the backend chosen for this session. Not `Sync`: one batch at a time.
pub struct Analyzer {
    fetcher: Box<dyn MetadataFetcher + Send>,
    pacing: Box<dyn DelayPolicy + Send>,
}

impl Analyzer {
    /// Probes the configured credential and picks a backend. Blocking.
    pub fn new(settings: &AnalyzerSettings) -> Self {
        Self::with_fetcher(
            select_backend(settings),
            Box::new(RandomPacing::from_settings(settings)),
        )
    }

    pub fn with_fetcher(
        fetcher: Box<dyn MetadataFetcher + Send>,
        pacing: Box<dyn DelayPolicy + Send>,
    ) -> Self {
        Self { fetcher, pacing }
    }

    pub fn mode(&self) -> BackendMode {
        self.fetcher.mode()
    }

    pub fn analyze_single(&self, input: &str) -> ItemOutcome {
        let Some(identifier) = extract_video_id(input) else {
            warn!(input, "no video identifier in input");
            return ItemOutcome::failed(input, None, FetchError::UnrecognizedInput(input.to_owned()));
        };

        let request = FetchRequest {
            source_url: input,
            identifier: &identifier,
        };
        match self.fetcher.fetch(&request) {
            Ok(record) => ItemOutcome::Resolved(record),
            Err(reason) => {
                warn!(input, %identifier, error = %reason, "item failed");
                ItemOutcome::failed(input, Some(&identifier), reason)
            }
        }
    }

    /// Resolves every input; failures become placeholders.
    pub fn analyze_all<S: AsRef<str>>(
        &self,
        inputs: &[S],
        observer: &dyn ProgressObserver,
    ) -> Vec<CanonicalRecord> {
        self.analyze_all_with_cancel(inputs, observer, &CancellationToken::new())
            .into_iter()
            .map(ItemOutcome::into_record)
            .collect()
    }

    /// Like [`Analyzer::analyze_all`], but stops fetching once `cancel` fires.
    /// Items not yet started are returned as `Cancelled` placeholders, so the
    /// output always has one entry per input.
    pub fn analyze_all_with_cancel<S: AsRef<str>>(
        &self,
        inputs: &[S],
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Vec<ItemOutcome> {
        let total = inputs.len();
        let mode = self.mode();
        info!(total, %mode, "starting analysis");

        let mut outcomes = Vec::with_capacity(total);
        for (index, input) in inputs.iter().enumerate() {
            let input = input.as_ref();
            let outcome = if cancel.is_cancelled() {
                ItemOutcome::failed(input, extract_video_id(input).as_deref(), FetchError::Cancelled)
            } else {
                self.analyze_single(input)
            };

            observer.item_finished(&Progress {
                current: index + 1,
                total,
                source_url: input,
                succeeded: outcome.is_resolved(),
                title: &outcome.record().title,
            });
            outcomes.push(outcome);

            if cancel.is_cancelled() {
                continue;
            }
            let delay = self.pacing.delay_after(index, total, mode);
            if !delay.is_zero() {
                debug!(?delay, "pacing before next request");
                sleep_unless_cancelled(delay, cancel);
            }
        }

        let failed = outcomes.iter().filter(|o| !o.is_resolved()).count();
        info!(total, failed, "analysis finished");
        outcomes
    }
}

fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationToken) {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
