//! Incremental analysis runner.
//!
//! Every run is keyed by `(analyzer, scope)`. A new submission for a key
//! cancels the key's active run and waits for it to drain before starting,
//! so at most one run per key is in flight and results for a key land in
//! submission order. A shared semaphore caps how many analyses execute at
//! once; analyzers themselves run on blocking threads.
//!
//! A run cancelled before its store write begins never writes. The write
//! happens on the run's blocking thread with no runner lock held, and the
//! key's next run starts only after it completes. A run that failed leaves
//! the key's previous findings in place.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Serializer};
use tokio::sync::{watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::analysis::{FileAnalyzer, ProjectAnalyzer};
use crate::error::{Error, Result};
use crate::model::{Analyzer, Finding};
use crate::parser::Parser;
use crate::store::{FindingsStore, StatsFilter};
use crate::walk::{collect_files, is_ignored, IgnoreMatcher};

mod status;

pub use status::{AnalyzerStatus, RunState};
use status::Outcome;

pub const DEFAULT_MAX_CONCURRENCY: usize = 16;
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// What a run covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    File(PathBuf),
    Project,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::File(path) => write!(f, "{}", path.display()),
            Scope::Project => f.write_str("project"),
        }
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub analyzer: Analyzer,
    pub scope: Scope,
}

impl RunKey {
    pub fn file(analyzer: Analyzer, path: impl Into<PathBuf>) -> Self {
        Self {
            analyzer,
            scope: Scope::File(path.into()),
        }
    }

    pub fn project(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            scope: Scope::Project,
        }
    }
}

/// Kind of change reported for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Create,
    Modify,
    Remove,
    Rename,
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Analyses allowed to execute at once, across all keys.
    pub max_concurrency: usize,
    /// How long [`Runner::stop`] waits for in-flight runs.
    pub stop_timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

/// Unit of work for one run. Executed on a blocking thread.
pub type AnalysisTask = Box<dyn FnOnce(&CancellationToken) -> Result<Vec<Finding>> + Send + 'static>;

struct ActiveRun {
    run_id: u64,
    token: CancellationToken,
    /// Closes when the run has fully finished.
    done: watch::Receiver<()>,
}

#[derive(Default)]
struct Runs {
    /// Newest submission per key.
    latest: HashMap<RunKey, u64>,
    active: HashMap<RunKey, ActiveRun>,
}

struct Inner {
    store: Arc<dyn FindingsStore>,
    ignore: Arc<dyn IgnoreMatcher>,
    parser: Arc<Parser>,
    options: RunnerOptions,
    file_analyzers: RwLock<Vec<Arc<dyn FileAnalyzer>>>,
    project_analyzers: RwLock<Vec<Arc<dyn ProjectAnalyzer>>>,
    roots: RwLock<Vec<PathBuf>>,
    semaphore: Arc<Semaphore>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    next_run_id: AtomicU64,
    runs: Mutex<Runs>,
    status: Mutex<BTreeMap<Analyzer, AnalyzerStatus>>,
}

/// Schedules analyzer runs in response to file changes.
///
/// Cheap to clone; clones share all state. Scheduling methods spawn tasks
/// and must be called from within a tokio runtime.
#[derive(Clone)]
pub struct Runner {
    inner: Arc<Inner>,
}

impl Runner {
    pub fn new(
        store: Arc<dyn FindingsStore>,
        ignore: Arc<dyn IgnoreMatcher>,
        parser: Arc<Parser>,
        options: RunnerOptions,
    ) -> Self {
        let permits = options.max_concurrency.max(1);
        Self {
            inner: Arc::new(Inner {
                store,
                ignore,
                parser,
                options,
                file_analyzers: RwLock::new(Vec::new()),
                project_analyzers: RwLock::new(Vec::new()),
                roots: RwLock::new(Vec::new()),
                semaphore: Arc::new(Semaphore::new(permits)),
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
                next_run_id: AtomicU64::new(0),
                runs: Mutex::new(Runs::default()),
                status: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn with_file_analyzer(self, analyzer: Arc<dyn FileAnalyzer>) -> Self {
        self.add_file_analyzer(analyzer);
        self
    }

    pub fn with_project_analyzer(self, analyzer: Arc<dyn ProjectAnalyzer>) -> Self {
        self.add_project_analyzer(analyzer);
        self
    }

    pub fn add_file_analyzer(&self, analyzer: Arc<dyn FileAnalyzer>) {
        self.inner.register_status(analyzer.analyzer());
        self.inner.file_analyzers.write().push(analyzer);
    }

    pub fn add_project_analyzer(&self, analyzer: Arc<dyn ProjectAnalyzer>) {
        self.inner.register_status(analyzer.analyzer());
        self.inner.project_analyzers.write().push(analyzer);
    }

    /// Roots walked by project analyzers and used to resolve ignore rules
    /// for change events.
    pub fn set_roots(&self, roots: Vec<PathBuf>) {
        *self.inner.roots.write() = roots;
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.inner.roots.read().clone()
    }

    /// Schedule analyses for a batch of changed paths.
    ///
    /// Returns the number of paths that were scheduled. Project analyzers run
    /// once per batch when at least one supported path changed.
    pub fn on_changes(&self, batch: HashMap<PathBuf, FileOp>) -> usize {
        let roots = self.roots();
        let mut changes: Vec<_> = batch.into_iter().collect();
        changes.sort_by(|a, b| a.0.cmp(&b.0));

        let mut scheduled = 0;
        for (path, op) in changes {
            if is_ignored(self.inner.ignore.as_ref(), &path, &roots) {
                debug!(path = %path.display(), "ignored change");
                continue;
            }

            // A removed file cannot be sniffed, so only its name is consulted.
            let supported = match op {
                FileOp::Remove => self.inner.parser.detect_language(&path, None).is_some(),
                _ => self.inner.parser.detect_language_for_file(&path).is_some(),
            };
            if !supported {
                continue;
            }

            self.schedule_file(path, op);
            scheduled += 1;
        }

        if scheduled > 0 {
            self.schedule_project(roots);
        }
        scheduled
    }

    /// Walk `roots` and schedule every analyzer for every supported file.
    ///
    /// The roots replace the runner's current roots. Returns the number of
    /// files scheduled.
    pub fn run_all(&self, roots: &[PathBuf]) -> usize {
        self.set_roots(roots.to_vec());

        let parser = Arc::clone(&self.inner.parser);
        let files = collect_files(roots, self.inner.ignore.as_ref(), |path| {
            parser.detect_language_for_file(path).is_some()
        });
        let count = files.len();
        info!(files = count, "scheduling full analysis");

        for path in files {
            self.schedule_file(path, FileOp::Modify);
        }
        self.schedule_project(roots.to_vec());
        count
    }

    fn schedule_file(&self, path: PathBuf, op: FileOp) {
        let analyzers = self.inner.file_analyzers.read().clone();
        for analyzer in analyzers {
            let key = RunKey::file(analyzer.analyzer(), path.clone());
            let task: AnalysisTask = if op == FileOp::Remove {
                Box::new(|_| Ok(Vec::new()))
            } else {
                let path = path.clone();
                Box::new(move |cancel| analyzer.analyze_file(&path, cancel))
            };
            self.run_analyzer(key, task);
        }
    }

    fn schedule_project(&self, roots: Vec<PathBuf>) {
        let analyzers = self.inner.project_analyzers.read().clone();
        for analyzer in analyzers {
            let key = RunKey::project(analyzer.analyzer());
            let roots = roots.clone();
            self.run_analyzer(
                key,
                Box::new(move |cancel| analyzer.analyze_project(&roots, cancel)),
            );
        }
    }

    /// Submit `task` for `key`, superseding any earlier submission.
    ///
    /// Returns the run id assigned to the submission.
    pub fn run_analyzer(&self, key: RunKey, task: AnalysisTask) -> u64 {
        let run_id = self.inner.next_run_id.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut runs = self.inner.runs.lock();
            runs.latest.insert(key.clone(), run_id);
            if let Some(active) = runs.active.get(&key) {
                debug!(analyzer = %key.analyzer, scope = %key.scope, superseded = active.run_id, run_id, "cancelling active run");
                active.token.cancel();
            }
        }

        let inner = Arc::clone(&self.inner);
        self.inner
            .tracker
            .spawn(async move { inner.execute(key, run_id, task).await });
        run_id
    }

    /// Cancel everything and wait up to the configured timeout for in-flight
    /// runs to finish.
    pub async fn stop(&self) {
        self.inner.shutdown.cancel();
        self.inner.tracker.close();

        let timeout = self.inner.options.stop_timeout;
        if tokio::time::timeout(timeout, self.inner.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                timeout_secs = timeout.as_secs_f64(),
                "timed out waiting for analysis runs to stop"
            );
        }
    }

    /// Wait until every scheduled run has finished.
    pub async fn wait_all(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.tracker.reopen();
    }

    /// Status of every registered analyzer, ordered by analyzer.
    pub fn status(&self) -> Vec<AnalyzerStatus> {
        self.inner.status.lock().values().cloned().collect()
    }
}

impl Inner {
    fn register_status(&self, analyzer: Analyzer) {
        self.status
            .lock()
            .entry(analyzer)
            .or_insert_with(|| AnalyzerStatus::new(analyzer));
    }

    async fn execute(self: Arc<Self>, key: RunKey, run_id: u64, task: AnalysisTask) {
        let Some((token, done)) = self.register(&key, run_id).await else {
            return;
        };

        self.status
            .lock()
            .entry(key.analyzer)
            .or_insert_with(|| AnalyzerStatus::new(key.analyzer))
            .started(&key.scope);

        let permit = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok(),
        };

        let mut elapsed = None;
        let outcome = match permit {
            None => Outcome::Cancelled,
            Some(permit) => {
                let started = Instant::now();
                let run_token = token.clone();
                let inner = Arc::clone(&self);
                let run_key = key.clone();
                // The store write happens here too, off the async workers and
                // before `done` closes, so the key's next run waits for it.
                let joined = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    if run_token.is_cancelled() {
                        return Outcome::Cancelled;
                    }
                    let result = task(&run_token);
                    inner.commit(&run_key, &run_token, result)
                })
                .await;
                elapsed = Some(started.elapsed());
                joined.unwrap_or_else(|e| Outcome::Failed(Error::Task(e.to_string()).to_string()))
            }
        };

        self.deregister(&key, run_id);
        match &outcome {
            Outcome::Written { stored } => {
                debug!(analyzer = %key.analyzer, scope = %key.scope, run_id, stored, "findings written")
            }
            Outcome::Failed(message) => {
                warn!(analyzer = %key.analyzer, scope = %key.scope, run_id, error = %message, "analysis failed; previous findings kept")
            }
            Outcome::Cancelled => {
                debug!(analyzer = %key.analyzer, scope = %key.scope, run_id, "run cancelled")
            }
        }

        if let Some(status) = self.status.lock().get_mut(&key.analyzer) {
            status.finished(&outcome, elapsed);
        }
        drop(done);
    }

    /// Wait for the key's active run to drain, then register this run.
    ///
    /// Returns `None` if the submission was superseded or the runner is
    /// shutting down.
    async fn register(
        &self,
        key: &RunKey,
        run_id: u64,
    ) -> Option<(CancellationToken, watch::Sender<()>)> {
        loop {
            let mut previous = {
                let mut runs = self.runs.lock();
                if runs.latest.get(key) != Some(&run_id) {
                    debug!(analyzer = %key.analyzer, scope = %key.scope, run_id, "superseded before start");
                    return None;
                }
                if self.shutdown.is_cancelled() {
                    runs.latest.remove(key);
                    return None;
                }

                match runs.active.get(key) {
                    Some(active) => {
                        active.token.cancel();
                        active.done.clone()
                    }
                    None => {
                        let token = self.shutdown.child_token();
                        let (done, receiver) = watch::channel(());
                        runs.active.insert(
                            key.clone(),
                            ActiveRun {
                                run_id,
                                token: token.clone(),
                                done: receiver,
                            },
                        );
                        return Some((token, done));
                    }
                }
            };

            // Nothing is ever sent; this resolves once the sender is dropped.
            while previous.changed().await.is_ok() {}
        }
    }

    /// Write the result unless the run was cancelled.
    ///
    /// Takes no runner lock; the store call is the only blocking work.
    fn commit(&self, key: &RunKey, token: &CancellationToken, result: Result<Vec<Finding>>) -> Outcome {
        if token.is_cancelled() {
            return Outcome::Cancelled;
        }
        match result.and_then(|findings| self.write(key, findings)) {
            Ok(stored) => Outcome::Written { stored },
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    /// Drop the run's bookkeeping if no newer run replaced it.
    fn deregister(&self, key: &RunKey, run_id: u64) {
        let mut runs = self.runs.lock();
        if runs.active.get(key).is_some_and(|active| active.run_id == run_id) {
            runs.active.remove(key);
        }
        if runs.latest.get(key) == Some(&run_id) {
            runs.latest.remove(key);
        }
    }

    /// Replace the key's findings and return the analyzer's stored total.
    fn write(&self, key: &RunKey, findings: Vec<Finding>) -> Result<usize> {
        let written = findings.len();
        match &key.scope {
            Scope::File(path) => self.store.replace_findings_for_analyzer_and_file(
                key.analyzer,
                &path.to_string_lossy(),
                findings,
            )?,
            Scope::Project => self
                .store
                .replace_findings_for_analyzer(key.analyzer, findings)?,
        }

        let filter = StatsFilter {
            analyzer: Some(key.analyzer),
            ..Default::default()
        };
        Ok(self
            .store
            .stats(&filter)
            .map(|stats| stats.total)
            .unwrap_or(written))
    }
}
