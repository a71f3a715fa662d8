//! Debounced, single-flight build scheduling.
//!
//! Each profile moves through an explicit state machine:
//!
//! ```text
//!   Idle --schedule--> Pending{deadline} --deadline--> Running --done--> Idle
//!                         ^   |                          |
//!                         +---+ schedule resets          | schedule sets rerun
//!                                                        v
//!                                   done with rerun: Pending{deadline = now}
//! ```
//!
//! The queue is owned by one coordinator loop and never shared, so no
//! locking is involved. Builds themselves run on the blocking pool.

use super::BuildOutcome;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Unit of work the queue schedules.
pub trait ProfileBuilder: Send + Sync + 'static {
    /// Build one profile to completion.
    fn build_profile(&self, profile_id: &str) -> BuildOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileState {
    Idle,
    Pending { deadline: Instant },
    Running { rerun: bool },
}

/// Externally visible state of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Idle,
    Pending,
    Running,
    /// Running with another run requested
    RunningWithRerun,
}

/// What `schedule_build` did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAction {
    /// A new debounce timer was started
    Started,
    /// The pending timer was pushed back
    Reset,
    /// A build is running; one more run will follow it
    Deferred,
}

pub struct BuildQueue {
    builder: Arc<dyn ProfileBuilder>,
    debounce: Duration,
    states: HashMap<String, ProfileState>,
    tasks: JoinSet<(String, BuildOutcome)>,
}

impl BuildQueue {
    pub fn new(builder: Arc<dyn ProfileBuilder>, debounce: Duration) -> Self {
        Self { builder, debounce, states: HashMap::new(), tasks: JoinSet::new() }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Request a build of `profile_id`.
    pub fn schedule_build(&mut self, profile_id: &str) -> ScheduleAction {
        self.schedule_build_at(profile_id, Instant::now())
    }

    /// Request a build as of `now`.
    pub fn schedule_build_at(&mut self, profile_id: &str, now: Instant) -> ScheduleAction {
        let deadline = now + self.debounce;
        let state = self.states.entry(profile_id.to_string()).or_insert(ProfileState::Idle);
        let action = match *state {
            ProfileState::Idle => {
                *state = ProfileState::Pending { deadline };
                ScheduleAction::Started
            }
            ProfileState::Pending { .. } => {
                *state = ProfileState::Pending { deadline };
                ScheduleAction::Reset
            }
            ProfileState::Running { .. } => {
                *state = ProfileState::Running { rerun: true };
                ScheduleAction::Deferred
            }
        };
        debug!(profile = %profile_id, ?action, "build requested");
        action
    }

    pub fn status(&self, profile_id: &str) -> QueueStatus {
        match self.states.get(profile_id) {
            None | Some(ProfileState::Idle) => QueueStatus::Idle,
            Some(ProfileState::Pending { .. }) => QueueStatus::Pending,
            Some(ProfileState::Running { rerun: false }) => QueueStatus::Running,
            Some(ProfileState::Running { rerun: true }) => QueueStatus::RunningWithRerun,
        }
    }

    /// Earliest pending deadline across all profiles.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.states
            .values()
            .filter_map(|s| match s {
                ProfileState::Pending { deadline } => Some(*deadline),
                _ => None,
            })
            .min()
    }

    /// Move every profile whose deadline has passed to `Running`.
    ///
    /// # Returns
    /// The profiles that must now be executed, sorted.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        let mut due: Vec<String> = self
            .states
            .iter()
            .filter(|(_, s)| matches!(s, ProfileState::Pending { deadline } if *deadline <= now))
            .map(|(id, _)| id.clone())
            .collect();
        due.sort();
        for id in &due {
            self.states.insert(id.clone(), ProfileState::Running { rerun: false });
        }
        due
    }

    /// Mark a run of `profile_id` finished.
    ///
    /// # Returns
    /// `true` if a rerun was requested mid-run; the profile is then pending
    /// with an immediate deadline.
    pub fn finish(&mut self, profile_id: &str, now: Instant) -> bool {
        match self.states.get(profile_id).copied() {
            Some(ProfileState::Running { rerun: true }) => {
                self.states.insert(profile_id.to_string(), ProfileState::Pending { deadline: now });
                true
            }
            Some(ProfileState::Running { rerun: false }) => {
                self.states.insert(profile_id.to_string(), ProfileState::Idle);
                false
            }
            other => {
                warn!(profile = %profile_id, state = ?other, "finish for a profile that was not running");
                false
            }
        }
    }

    /// Start every due build on the blocking pool.
    pub fn fire_due(&mut self, now: Instant) -> Vec<String> {
        let due = self.take_due(now);
        for id in &due {
            self.spawn(id.clone());
        }
        due
    }

    fn spawn(&mut self, profile_id: String) {
        info!(profile = %profile_id, "build started");
        let builder = Arc::clone(&self.builder);
        self.tasks.spawn_blocking(move || {
            let started = std::time::Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| builder.build_profile(&profile_id)))
                .unwrap_or_else(|_| {
                    BuildOutcome::failed(profile_id.clone(), "build panicked", started.elapsed())
                });
            (profile_id, outcome)
        });
    }

    /// Number of builds currently executing.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is pending or running.
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty() && self.states.values().all(|s| *s == ProfileState::Idle)
    }

    /// Wait for the next build to complete, firing timers as they expire.
    ///
    /// # Returns
    /// `None` when nothing is pending or running. Cancel safe.
    pub async fn next_completion(&mut self) -> Option<BuildOutcome> {
        loop {
            self.fire_due(Instant::now());
            let deadline = self.next_deadline();
            if self.tasks.is_empty() && deadline.is_none() {
                return None;
            }

            let timer = async {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                joined = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    match joined {
                        Some(Ok((profile_id, outcome))) => {
                            self.complete(&profile_id, &outcome);
                            return Some(outcome);
                        }
                        Some(Err(e)) => error!(error = %e, "build task lost"),
                        None => {}
                    }
                }
                _ = timer => {}
            }
        }
    }

    fn complete(&mut self, profile_id: &str, outcome: &BuildOutcome) {
        if outcome.is_success() {
            info!(profile = %profile_id, elapsed = ?outcome.duration, "build finished");
        } else {
            warn!(
                profile = %profile_id,
                error = outcome.error().unwrap_or("unknown"),
                "build failed"
            );
        }
        if self.finish(profile_id, Instant::now()) {
            debug!(profile = %profile_id, "rerun requested during build");
        }
    }

    /// Drop every pending timer. Running builds are unaffected.
    ///
    /// # Returns
    /// Number of timers cancelled.
    pub fn cancel_pending(&mut self) -> usize {
        let mut cancelled = 0;
        for state in self.states.values_mut() {
            match state {
                ProfileState::Pending { .. } => {
                    *state = ProfileState::Idle;
                    cancelled += 1;
                }
                ProfileState::Running { rerun } if *rerun => {
                    *rerun = false;
                    cancelled += 1;
                }
                _ => {}
            }
        }
        cancelled
    }

    /// Wait for in-flight builds, up to `timeout`.
    ///
    /// Pending timers are not fired. Builds still running at the deadline
    /// are left to finish on their own.
    pub async fn drain(&mut self, timeout: Duration) -> Vec<BuildOutcome> {
        let mut finished = Vec::new();
        let waited = tokio::time::timeout(timeout, async {
            while let Some(joined) = self.tasks.join_next().await {
                match joined {
                    Ok((profile_id, outcome)) => {
                        self.complete(&profile_id, &outcome);
                        finished.push(outcome);
                    }
                    Err(e) => error!(error = %e, "build task lost"),
                }
            }
        })
        .await;
        if waited.is_err() {
            warn!(remaining = self.tasks.len(), "timed out waiting for running builds");
            self.tasks.detach_all();
        }
        finished
    }
}

impl std::fmt::Debug for BuildQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildQueue")
            .field("debounce", &self.debounce)
            .field("states", &self.states)
            .field("in_flight", &self.tasks.len())
            .finish()
    }
}
