//! Pipeline coordinator
//!
//! Owns all mutable pipeline state for one monitoring session: the active
//! tail task, its cancellation token, and (per start) a fresh rate
//! limiter. There are no process-wide singletons; construct a
//! `Coordinator`, `start` it with a target, `stop` it, drop it.
//!
//! Lifecycle rules:
//!
//! - `start` with the target already running is a no-op
//! - `start` with a different target stops the old tailer first, then
//!   attaches the new one
//! - the push listener is bound on the first `start` and reused afterwards
//!   (it survives `stop` and target changes; only a rate-limit trip closes
//!   it)
//! - a trip ends the pipeline task; the next `start` builds everything
//!   fresh

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use bidwatch_catalog::SharedCatalog;

use crate::broadcast::Broadcaster;
use crate::error::{PipelineError, Result};
use crate::event::UiSender;
use crate::limiter::{RateLimiter, Verdict};
use crate::matcher::resolve_tokens;
use crate::parse::extract_tokens;
use crate::tailer::{LineTailer, DEFAULT_POLL_INTERVAL};

/// Most tokens a single line may contribute. Longer pipe runs are chat
/// noise (a busy channel, not an item link) and are discarded before
/// matching.
const MAX_BATCH_TOKENS: usize = 9;

/// Status line for a rejected batch
const RATE_WARNING: &str = "You are sending too many requests to the server at this time.";

/// Operator-facing explanation emitted once, on trip
const TRIP_NOTICE: [&str; 4] = [
    "You hit the rate limit too many times. Please make sure your chat channel is accurate.",
    "Monitoring has stopped and all push connections have been closed.",
    "Restart monitoring once the chat channel is resolved: /join aspecificchannel in game, \
     then set the chat channel to aspecificchannel.",
    "Select a unique chat channel name, not something like 'guild' or 'raid', as it will \
     pick up too many lines from the log.",
];

/// What to monitor: one file, one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorTarget {
    pub file_path: PathBuf,
    pub channel_name: String,
}

impl MonitorTarget {
    pub fn new(file_path: impl Into<PathBuf>, channel_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            channel_name: channel_name.into(),
        }
    }
}

/// The running tail task and what identifies it
struct ActivePipeline {
    target: MonitorTarget,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Wires tailer, parser, matcher, limiter and broadcaster into one running
/// pipeline per monitoring target
pub struct Coordinator {
    catalog: SharedCatalog,
    broadcaster: Arc<Broadcaster>,
    ui: UiSender,
    poll_interval: Duration,
    active: Option<ActivePipeline>,
}

impl Coordinator {
    /// Create a coordinator with nothing running
    pub fn new(catalog: SharedCatalog, broadcaster: Arc<Broadcaster>, ui: UiSender) -> Self {
        Self {
            catalog,
            broadcaster,
            ui,
            poll_interval: DEFAULT_POLL_INTERVAL,
            active: None,
        }
    }

    /// Override the tailer's poll interval (tests use a short one)
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Start monitoring `target`.
    ///
    /// No-op if the same target is already being monitored; a different
    /// target supersedes the running one. The push listener is bound if it
    /// is not already up; a bind failure is the only error that fails the
    /// start outright. Configuration errors are surfaced on the status tap
    /// and returned without starting anything.
    pub async fn start(&mut self, target: MonitorTarget) -> Result<()> {
        if target.channel_name.trim().is_empty() {
            self.ui
                .status("A chat channel must be set before monitoring can start");
            return Err(PipelineError::EmptyChannel);
        }
        if target.file_path.as_os_str().is_empty() {
            self.ui
                .status("A log file path must be set before monitoring can start");
            return Err(PipelineError::EmptyPath);
        }

        if let Some(active) = &self.active {
            if active.target == target && !active.handle.is_finished() {
                debug!(path = %target.file_path.display(), "target already monitored, ignoring");
                return Ok(());
            }
        }

        self.stop().await;
        self.broadcaster.ensure_listening().await?;

        info!(
            path = %target.file_path.display(),
            channel = %target.channel_name,
            "starting pipeline"
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_pipeline(
            target.clone(),
            self.catalog.clone(),
            Arc::clone(&self.broadcaster),
            self.ui.clone(),
            cancel.clone(),
            self.poll_interval,
        ));

        self.active = Some(ActivePipeline {
            target,
            cancel,
            handle,
        });
        Ok(())
    }

    /// Stop the running tailer, if any.
    ///
    /// The push listener stays up; subscribers remain connected across
    /// target changes. Waits for the tail task to finish, so no line is
    /// processed after this returns.
    pub async fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            if let Err(e) = active.handle.await {
                error!(error = %e, "pipeline task panicked");
            }
            info!(path = %active.target.file_path.display(), "monitoring stopped");
            self.ui.status(format!(
                "Stopped monitoring {}",
                active.target.file_path.display()
            ));
        }
    }

    /// True while a pipeline task is alive for some target
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// The currently configured target, if any
    pub fn target(&self) -> Option<&MonitorTarget> {
        self.active.as_ref().map(|active| &active.target)
    }
}

/// The per-target pipeline task: drives the tailer and pushes every line
/// through filter → tokenizer → matcher → limiter → broadcaster, strictly
/// in order.
async fn run_pipeline(
    target: MonitorTarget,
    catalog: SharedCatalog,
    broadcaster: Arc<Broadcaster>,
    ui: UiSender,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    let mut tailer = match LineTailer::attach(&target.file_path, poll_interval, ui.clone()).await {
        Ok(tailer) => tailer,
        Err(e) => {
            error!(error = %e, "cannot start tailing");
            ui.status(format!(
                "Error trying to tail log file {}: {e}",
                target.file_path.display()
            ));
            return;
        }
    };
    ui.status(format!(
        "Tailing log file: {}",
        target.file_path.display()
    ));

    let mut limiter = RateLimiter::new();

    while let Some(line) = tailer.next_line(&cancel).await {
        let Some(tokens) = extract_tokens(&line, &target.channel_name) else {
            continue;
        };
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() > MAX_BATCH_TOKENS {
            ui.status(format!(
                "Ignored a line with {} tokens; the channel may be picking up unrelated chat",
                tokens.len()
            ));
            continue;
        }

        let batch = resolve_tokens(tokens, &catalog.load());
        if batch.is_empty() {
            continue;
        }

        // Local display is independent of network broadcast and of the
        // rate limiter guarding it
        ui.batch(batch.clone());

        match limiter.observe(Instant::now()) {
            Verdict::Admitted => {
                broadcaster.publish(&batch);
            }
            Verdict::Rejected => {
                warn!(
                    total_violations = limiter.total_violations(),
                    "batch rejected by rate limiter"
                );
                ui.status(RATE_WARNING);
            }
            Verdict::Tripped => {
                warn!("rate limiter tripped, tearing pipeline down");
                for notice in TRIP_NOTICE {
                    ui.status(notice);
                }
                broadcaster.clear();
                break;
            }
            Verdict::AlreadyTripped => break,
        }
    }

    debug!(path = %target.file_path.display(), "pipeline task ended");
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
