//! Title-resolution pipeline.
//!
//! [`Pipeline::run`] walks a title list in order and resolves each entry
//! through cache, search, and generation. Every failure mode short of a
//! worker panic degrades in-band: the run keeps going and the report says
//! what happened. [`Pipeline::spawn`] moves the same loop onto a background
//! task with a cancellation handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use topicforge_llm::{ChatClient, ContentGenerator};
use topicforge_search::SearchClient;
use topicforge_shared::{AppConfig, CancelFlag, Result, cache_db_path};
use topicforge_storage::{Store, cache_key};

// ---------------------------------------------------------------------------
// Events and reports
// ---------------------------------------------------------------------------

/// Emitted after each non-blank title, before its [`ResultEvent`].
///
/// `completed` is the 1-based position in the input list, so blank entries
/// advance the count even though they emit no events of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
}

/// Emitted once per non-blank title, carrying the resolved text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEvent {
    pub title: String,
    pub text: String,
}

/// Receives pipeline events as they happen. Implementations must be
/// callable from the worker task.
pub trait EventSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
    fn on_result(&self, event: &ResultEvent);
}

/// Sink that discards all events, for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl EventSink for SilentSink {
    fn on_progress(&self, _event: &ProgressEvent) {}
    fn on_result(&self, _event: &ResultEvent) {}
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Every title was visited.
    Completed,
    /// Stopped early by the cancel flag; partial results are retained.
    Cancelled,
    /// The worker task panicked or was aborted.
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Completed => write!(f, "completed"),
            RunState::Cancelled => write!(f, "cancelled"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// Final accounting for one run.
#[derive(Debug)]
pub struct RunReport {
    pub state: RunState,
    /// Resolved text keyed by trimmed title.
    pub results: HashMap<String, String>,
    /// Non-blank titles actually resolved.
    pub processed: usize,
    /// Length of the input list, blanks included.
    pub total: usize,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Resolves title lists through cache, search, and generation.
pub struct Pipeline {
    store: Store,
    search: SearchClient,
    generator: ContentGenerator,
}

impl Pipeline {
    pub fn new(store: Store, search: SearchClient, generator: ContentGenerator) -> Self {
        Self {
            store,
            search,
            generator,
        }
    }

    /// Assemble a pipeline from the application config: cache store at the
    /// configured path, search and generation clients with keys from the
    /// environment.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store = Store::open(&cache_db_path(config)?).await?;
        let search = SearchClient::from_config(config)?;
        let client = ChatClient::from_config(config)?;
        let generator = ContentGenerator::new(client, config.openai.generation_model.clone());
        Ok(Self::new(store, search, generator))
    }

    /// Resolve `titles` in order, emitting progress and result events to
    /// `sink`. Blank titles are skipped without events but still advance
    /// the progress position. Checks `cancel` before each title; once a
    /// title has started it runs to completion.
    #[instrument(skip_all, fields(titles = titles.len()))]
    pub async fn run(
        &self,
        titles: &[String],
        sink: &dyn EventSink,
        cancel: &CancelFlag,
    ) -> RunReport {
        let started = Instant::now();
        let total = titles.len();
        let mut results = HashMap::new();
        let mut processed = 0;

        for (index, raw_title) in titles.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(processed, total, "run cancelled");
                return RunReport {
                    state: RunState::Cancelled,
                    results,
                    processed,
                    total,
                    elapsed: started.elapsed(),
                };
            }

            let title = raw_title.trim();
            if title.is_empty() {
                debug!(position = index + 1, "skipping blank title");
                continue;
            }

            let text = self.resolve(title, cancel).await;

            let completed = index + 1;
            sink.on_progress(&ProgressEvent {
                completed,
                total,
                percent: completed as f64 / total as f64 * 100.0,
            });
            sink.on_result(&ResultEvent {
                title: title.to_string(),
                text: text.clone(),
            });

            results.insert(title.to_string(), text);
            processed += 1;
        }

        info!(processed, total, "run completed");
        RunReport {
            state: RunState::Completed,
            results,
            processed,
            total,
            elapsed: started.elapsed(),
        }
    }

    /// Resolve one title: cache hit wins, otherwise search then generate.
    /// Always produces text; a failed generation yields an in-band
    /// diagnostic instead of an error.
    async fn resolve(&self, title: &str, cancel: &CancelFlag) -> String {
        let key = cache_key(title);

        match self.store.get(&key).await {
            Ok(Some(text)) => {
                debug!(%title, "cache hit");
                return text;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, %title, "cache read failed, regenerating");
            }
        }

        let snippets = self.search.query(title, cancel).await;

        match self.generator.generate(title, &snippets).await {
            Ok(text) => {
                if let Err(e) = self.store.put(&key, &text).await {
                    warn!(error = %e, %title, "cache write failed, result kept in memory");
                }
                text
            }
            Err(failure) => {
                warn!(error = %failure, %title, "generation failed");
                format!("[generation error] {failure}")
            }
        }
    }

    /// Run on a background task. Each spawn gets its own fresh cancel flag;
    /// cancelling one run never affects a later one.
    pub fn spawn(self: Arc<Self>, titles: Vec<String>, sink: Arc<dyn EventSink>) -> RunHandle {
        let cancel = CancelFlag::new();
        let task_cancel = cancel.clone();
        let task =
            tokio::spawn(async move { self.run(&titles, sink.as_ref(), &task_cancel).await });
        RunHandle { cancel, task }
    }
}

/// Handle to a background run started by [`Pipeline::spawn`].
pub struct RunHandle {
    cancel: CancelFlag,
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    /// Request cancellation. The worker stops before the next title.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Clone of this run's cancel flag, for wiring into signal handlers.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Wait for the worker to finish. A panicked worker is reported as a
    /// [`RunState::Failed`] report rather than propagating the panic.
    pub async fn wait(self) -> RunReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "pipeline worker panicked");
                RunReport {
                    state: RunState::Failed,
                    results: HashMap::new(),
                    processed: 0,
                    total: 0,
                    elapsed: Duration::ZERO,
                }
            }
        }
    }
}
