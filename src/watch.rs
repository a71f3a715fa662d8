//! Watch mode: rebuild and redeploy profiles as sources change
//!
//! Filesystem events from the debounced watcher are pushed into a bounded
//! channel. One coordinator loop resolves each event to the profiles it
//! affects and feeds the [`BuildQueue`], which owns debouncing and
//! single-flight execution.

use crate::build::{BuildOutcome, BuildQueue, Pipeline};
use crate::deploy::{DeployError, DeployReport, Deployer};
use crate::project::Project;
use chrono::Local;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::fs;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Quiet period the OS watcher waits before emitting a batch
const WATCHER_TICK: Duration = Duration::from_millis(50);

/// Change events buffered between the watcher thread and the loop
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Error during watch mode
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch '{path}': {source}")]
    WatchPath { path: PathBuf, source: notify::Error },
    /// Source directory not found
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// No profiles to watch
    #[error("No profiles to watch")]
    NoProfiles,
}

/// A raw filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Which profiles a change affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeScope {
    /// Shared tree or loose top-level file: every profile
    Shared,
    /// One profile's override tree
    Profile(String),
    /// Outside every watched root
    Ignored,
}

/// Maps change paths to scopes.
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    shared_root: PathBuf,
    versions_root: PathBuf,
    source_root: PathBuf,
    profiles: Vec<String>,
}

impl ScopeResolver {
    pub fn new(
        shared_root: impl Into<PathBuf>,
        versions_root: impl Into<PathBuf>,
        source_root: impl Into<PathBuf>,
        profiles: Vec<String>,
    ) -> Self {
        Self {
            shared_root: shared_root.into(),
            versions_root: versions_root.into(),
            source_root: source_root.into(),
            profiles,
        }
    }

    /// Resolver over a project's source layout, with canonical roots.
    pub fn for_project(project: &Project, profiles: Vec<String>) -> Self {
        Self::new(
            canonical(&project.shared_dir()),
            canonical(&project.versions_dir()),
            canonical(&project.source_root()),
            profiles,
        )
    }

    /// Profiles being watched.
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// Resolve the scope of a change at `path`.
    ///
    /// Paths reported under a symlinked root are retried in canonical form.
    pub fn resolve(&self, path: &Path) -> ChangeScope {
        match self.resolve_lexical(path) {
            ChangeScope::Ignored => match canonical_event_path(path) {
                Some(real) if real != path => self.resolve_lexical(&real),
                _ => ChangeScope::Ignored,
            },
            scope => scope,
        }
    }

    fn resolve_lexical(&self, path: &Path) -> ChangeScope {
        if path.starts_with(&self.shared_root) {
            return ChangeScope::Shared;
        }
        if let Ok(rest) = path.strip_prefix(&self.versions_root) {
            return match rest.components().next() {
                Some(Component::Normal(id)) => {
                    let id = id.to_string_lossy();
                    if self.profiles.iter().any(|p| *p == id) {
                        ChangeScope::Profile(id.into_owned())
                    } else {
                        ChangeScope::Ignored
                    }
                }
                _ => ChangeScope::Ignored,
            };
        }
        // Loose files directly in the source root belong to every profile
        if path.parent() == Some(self.source_root.as_path()) {
            return ChangeScope::Shared;
        }
        ChangeScope::Ignored
    }

    /// Profiles to rebuild for a scope.
    pub fn profiles_for(&self, scope: &ChangeScope) -> Vec<String> {
        match scope {
            ChangeScope::Shared => self.profiles.clone(),
            ChangeScope::Profile(id) => vec![id.clone()],
            ChangeScope::Ignored => Vec::new(),
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Canonical form of a change path; deleted files resolve through their parent.
fn canonical_event_path(path: &Path) -> Option<PathBuf> {
    if let Ok(real) = fs::canonicalize(path) {
        return Some(real);
    }
    let parent = fs::canonicalize(path.parent()?).ok()?;
    Some(parent.join(path.file_name()?))
}

/// Deploys each successful watch rebuild.
#[derive(Debug, Clone)]
pub struct DeployOnChange {
    deployer: Deployer,
    project: Project,
}

impl DeployOnChange {
    pub fn new(project: Project) -> Self {
        let deployer = Deployer::new(project.config().deploy.backup);
        Self { deployer, project }
    }

    /// Deploy the artifact of a finished build.
    pub fn deploy(&self, outcome: &BuildOutcome) -> Result<DeployReport, DeployError> {
        let artifact = match &outcome.artifact {
            Some(artifact) => artifact.path.clone(),
            None => self.project.artifact_path(&outcome.profile_id),
        };
        let target = self.project.deploy_target(&outcome.profile_id);
        self.deployer.deploy(&outcome.profile_id, &artifact, target.as_deref())
    }
}

/// Session tuning.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Upper bound on waiting for running builds at shutdown
    pub shutdown_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { shutdown_timeout: Duration::from_secs(30) }
    }
}

/// Counters for one watch session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Change events received
    pub events: usize,
    /// Build requests issued to the queue
    pub scheduled: usize,
    /// Builds completed
    pub builds: usize,
    /// Builds that failed
    pub failures: usize,
    /// Successful deploys
    pub deploys: usize,
}

enum SessionEvent {
    Change(ChangeEvent),
    Built(BuildOutcome),
    Closed,
    Shutdown,
}

/// Coordinator loop.
///
/// Runs until `shutdown` resolves or the event channel closes. On a closed
/// channel, outstanding builds are finished first. On shutdown, pending
/// timers are cancelled and running builds get `options.shutdown_timeout`
/// to finish.
pub async fn run_session<F>(
    mut events: mpsc::Receiver<ChangeEvent>,
    resolver: &ScopeResolver,
    queue: &mut BuildQueue,
    deploy: Option<DeployOnChange>,
    shutdown: F,
    options: SessionOptions,
) -> SessionReport
where
    F: Future<Output = ()>,
{
    let mut report = SessionReport::default();
    tokio::pin!(shutdown);

    loop {
        let event = tokio::select! {
            _ = &mut shutdown => SessionEvent::Shutdown,
            change = events.recv() => match change {
                Some(change) => SessionEvent::Change(change),
                None => SessionEvent::Closed,
            },
            Some(outcome) = queue.next_completion() => SessionEvent::Built(outcome),
        };

        match event {
            SessionEvent::Change(change) => {
                report.events += 1;
                let scope = resolver.resolve(&change.path);
                let profiles = resolver.profiles_for(&scope);
                debug!(path = %change.path.display(), ?scope, count = profiles.len(), "change resolved");
                for id in profiles {
                    queue.schedule_build(&id);
                    report.scheduled += 1;
                }
            }
            SessionEvent::Built(outcome) => handle_outcome(&mut report, outcome, deploy.as_ref()).await,
            SessionEvent::Closed => {
                debug!("event channel closed, finishing outstanding builds");
                while let Some(outcome) = queue.next_completion().await {
                    handle_outcome(&mut report, outcome, deploy.as_ref()).await;
                }
                return report;
            }
            SessionEvent::Shutdown => break,
        }
    }

    let cancelled = queue.cancel_pending();
    info!(cancelled, running = queue.in_flight(), "shutting down watch session");
    for outcome in queue.drain(options.shutdown_timeout).await {
        handle_outcome(&mut report, outcome, None).await;
    }
    report
}

async fn handle_outcome(report: &mut SessionReport, outcome: BuildOutcome, deploy: Option<&DeployOnChange>) {
    report.builds += 1;
    let stamp = Local::now().format("%H:%M:%S").to_string();

    if !outcome.is_success() {
        report.failures += 1;
        eprintln!(
            "[{}] {} failed: {}",
            stamp,
            outcome.profile_id,
            outcome.error().unwrap_or("unknown error")
        );
        return;
    }

    println!(
        "[{}] {} built in {:?} ({} processed, {} skipped)",
        stamp,
        outcome.profile_id,
        outcome.duration,
        outcome.result.processed.len(),
        outcome.result.skipped.len()
    );

    let Some(hook) = deploy else {
        return;
    };
    let hook = hook.clone();
    let profile_id = outcome.profile_id.clone();
    match tokio::task::spawn_blocking(move || hook.deploy(&outcome)).await {
        Ok(Ok(deployed)) => {
            report.deploys += 1;
            println!("[{}] {} deployed to {}", stamp, profile_id, deployed.target.display());
        }
        Ok(Err(e)) => warn!(profile = %profile_id, error = %e, "deploy failed"),
        Err(e) => error!(profile = %profile_id, error = %e, "deploy task failed"),
    }
}

/// Start the debounced filesystem watcher on `root`.
///
/// Events are forwarded into `tx`; once the receiver is gone they are
/// dropped.
pub fn spawn_watcher(
    root: &Path,
    tx: mpsc::Sender<ChangeEvent>,
) -> Result<Debouncer<notify::RecommendedWatcher>, WatchError> {
    if !root.is_dir() {
        return Err(WatchError::SourceNotFound(root.to_path_buf()));
    }

    let mut debouncer = new_debouncer(WATCHER_TICK, move |result: DebounceEventResult| match result {
        Ok(batch) => {
            for event in batch {
                if tx.blocking_send(ChangeEvent { path: event.path }).is_err() {
                    break;
                }
            }
        }
        Err(e) => warn!(error = ?e, "watch error, continuing"),
    })
    .map_err(WatchError::WatcherInit)?;

    debouncer
        .watcher()
        .watch(root, RecursiveMode::Recursive)
        .map_err(|source| WatchError::WatchPath { path: root.to_path_buf(), source })?;

    Ok(debouncer)
}

/// Options for [`watch`].
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Build debounce window
    pub debounce: Duration,
    /// Deploy after each successful rebuild
    pub deploy: bool,
    /// Upper bound on closing the watcher and draining builds
    pub shutdown_timeout: Duration,
}

impl WatchOptions {
    pub fn from_project(project: &Project) -> Self {
        Self {
            debounce: Duration::from_millis(project.config().watch.debounce_ms),
            deploy: project.config().watch.deploy,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// Watch the project's sources and rebuild `profiles` until Ctrl+C.
///
/// Every watched profile is built once on startup.
pub async fn watch(pipeline: Pipeline, profiles: Vec<String>, options: WatchOptions) -> Result<SessionReport, WatchError> {
    if profiles.is_empty() {
        return Err(WatchError::NoProfiles);
    }

    let project = pipeline.project().clone();
    let source_root = project.source_root();
    let resolver = ScopeResolver::for_project(&project, profiles);

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let debouncer = spawn_watcher(&source_root, tx)?;

    let mut queue = BuildQueue::new(Arc::new(pipeline), options.debounce);
    for id in resolver.profiles() {
        queue.schedule_build(id);
    }
    let deploy = options.deploy.then(|| DeployOnChange::new(project));

    println!(
        "Watching {} for {} profile(s) (Ctrl+C to stop)",
        source_root.display(),
        resolver.profiles().len()
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    let session = SessionOptions { shutdown_timeout: options.shutdown_timeout };
    let report = run_session(rx, &resolver, &mut queue, deploy, shutdown, session).await;

    close_watcher(debouncer, options.shutdown_timeout).await;
    Ok(report)
}

/// Drop the watcher off the event loop, giving up after `timeout`.
async fn close_watcher(debouncer: Debouncer<notify::RecommendedWatcher>, timeout: Duration) {
    let closing = tokio::task::spawn_blocking(move || drop(debouncer));
    match tokio::time::timeout(timeout, closing).await {
        Ok(_) => debug!("watcher closed"),
        Err(_) => warn!(?timeout, "watcher did not close in time, abandoning it"),
    }
}
