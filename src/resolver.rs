//! The resolution engine: one sequential pass enriching catalog records from a registry.
//!
//! A pass visits every record that carries a DOI, one lookup at a time, and publishes a
//! [`Snapshot`] after normalization and after every successful merge. Failures never
//! escape: they leave the local record in place and feed the consecutive-failure
//! breaker. Whatever was resolved before an abort is still returned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::record::PublicationRecord;
use crate::registry::crossref::CrossrefClient;
use crate::registry::{Registry, ResolutionStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub enabled: bool,
    /// Upper bound for one registry request.
    pub timeout: Duration,
    /// Pause between two lookups.
    pub request_interval: Duration,
    pub stop_after_failures: u32,
    pub proxy_prefix: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            enabled: true,
            timeout: Duration::from_millis(12_000),
            request_interval: Duration::from_millis(300),
            stop_after_failures: 5,
            proxy_prefix: None,
        }
    }
}

impl ResolverConfig {
    /// The pause before the next lookup; doubled after a rate-limited answer.
    pub fn delay_after(&self, status: ResolutionStatus) -> Duration {
        match status {
            ResolutionStatus::RateLimited => self.request_interval * 2,
            _ => self.request_interval,
        }
    }

    /// The proxy prefix actually used; blank prefixes count as no proxy.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy_prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    fn failure_threshold(&self) -> u32 {
        self.stop_after_failures.max(1)
    }
}

/// Cooperative cancellation for one pass.
///
/// Cloning shares the flag. Waiting on the token is how the engine sleeps between
/// lookups, so cancelling wakes it up right away.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for `timeout` or until cancelled. Returns `true` when cancelled.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// The record list as of one point in a pass. Records behind the `Arc` never change;
/// a later merge produces a new list.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub records: Arc<Vec<PublicationRecord>>,
    pub resolved: usize,
    pub attempted: usize,
}

/// Receives progressive updates from a pass.
///
/// Any `FnMut(&Snapshot)` closure is an observer.
pub trait SnapshotObserver {
    fn on_update(&mut self, snapshot: &Snapshot);

    /// Called after every lookup, successful or not.
    fn on_outcome(&mut self, _outcome: &RecordOutcome) {}
}

impl<F: FnMut(&Snapshot)> SnapshotObserver for F {
    fn on_update(&mut self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub ref_key: String,
    pub status: ResolutionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    Disabled,
    /// A network failure without a proxy; the rest of the pass was skipped.
    NetworkUnreachable,
    FailureThreshold,
    Cancelled,
    /// Another pass on the same session started.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct ResolutionReport {
    pub generation: u64,
    pub records: Arc<Vec<PublicationRecord>>,
    pub outcomes: Vec<RecordOutcome>,
    /// Records carrying a DOI.
    pub resolvable: usize,
    pub attempted: usize,
    pub resolved: usize,
    pub stop: StopReason,
}

impl ResolutionReport {
    /// Records with a DOI that are still shown as authored locally.
    pub fn fallback_count(&self) -> usize {
        self.resolvable - self.resolved
    }
}

/// Owns the registry and the single-flight guard for resolution passes.
///
/// Starting a pass cancels the previous one; the older pass notices before its next
/// lookup and returns [`StopReason::Superseded`] without publishing again.
pub struct ResolutionSession<R> {
    registry: R,
    config: ResolverConfig,
    generation: AtomicU64,
    active: Mutex<Option<CancelToken>>,
}

impl ResolutionSession<CrossrefClient> {
    pub fn crossref(config: ResolverConfig) -> Self {
        let client = CrossrefClient::new(config.timeout, config.proxy().map(str::to_string));
        ResolutionSession::new(client, config)
    }
}

impl<R: Registry> ResolutionSession<R> {
    pub fn new(registry: R, config: ResolverConfig) -> Self {
        ResolutionSession {
            registry,
            config,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Cancel the running pass, if any.
    pub fn cancel(&self) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = active.as_ref() {
            token.cancel();
        }
    }

    /// Run one resolution pass over `records` (already normalized, in catalog order).
    pub fn resolve(
        &self,
        records: Vec<PublicationRecord>,
        observer: &mut dyn SnapshotObserver,
    ) -> ResolutionReport {
        let (generation, token) = self.begin();
        let pending: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.doi().is_empty())
            .map(|(idx, _)| idx)
            .collect();

        let mut report = ResolutionReport {
            generation,
            records: Arc::new(records),
            outcomes: Vec::new(),
            resolvable: pending.len(),
            attempted: 0,
            resolved: 0,
            stop: StopReason::Completed,
        };
        tracing::info!(
            generation,
            records = report.records.len(),
            resolvable = report.resolvable,
            "starting resolution pass"
        );

        observer.on_update(&snapshot(&report));
        report.stop = if self.config.enabled {
            self.run(&pending, &token, &mut report, observer)
        } else {
            tracing::debug!("registry lookups disabled");
            StopReason::Disabled
        };
        self.finish(generation);

        let fallback = report.fallback_count();
        if fallback > 0 && report.stop != StopReason::Superseded {
            tracing::info!("fallback used for {fallback} publications");
        }
        tracing::info!(
            generation,
            attempted = report.attempted,
            resolved = report.resolved,
            stop = ?report.stop,
            "resolution pass finished"
        );
        report
    }

    fn run(
        &self,
        pending: &[usize],
        token: &CancelToken,
        report: &mut ResolutionReport,
        observer: &mut dyn SnapshotObserver,
    ) -> StopReason {
        let generation = report.generation;
        let threshold = self.config.failure_threshold();
        let mut failures = 0u32;

        for (n, &idx) in pending.iter().enumerate() {
            if let Some(reason) = self.halted(generation, token) {
                return reason;
            }

            let local = &report.records[idx];
            let ref_key = local.ref_key.clone();
            let outcome = self.registry.lookup(local.doi());
            report.attempted += 1;

            if let Some(reason) = self.halted(generation, token) {
                return reason;
            }

            let status = match (outcome.status, outcome.data) {
                (ResolutionStatus::Ok, Some(data)) => {
                    let merged = data.merge_into(&report.records[idx]);
                    Arc::make_mut(&mut report.records)[idx] = merged;
                    report.resolved += 1;
                    failures = 0;
                    ResolutionStatus::Ok
                }
                (ResolutionStatus::Ok, None) => ResolutionStatus::InvalidPayload,
                (status, _) => status,
            };
            tracing::debug!(%ref_key, %status, "lookup finished");

            let outcome = RecordOutcome { ref_key, status };
            observer.on_outcome(&outcome);
            report.outcomes.push(outcome);
            if status == ResolutionStatus::Ok {
                observer.on_update(&snapshot(report));
            }

            if status.is_failure() {
                failures += 1;
                if status == ResolutionStatus::Network && self.config.proxy().is_none() {
                    tracing::warn!("registry unreachable without a proxy; skipping remaining lookups");
                    return StopReason::NetworkUnreachable;
                }
                if failures >= threshold {
                    tracing::warn!(failures, "too many consecutive lookup failures; stopping");
                    return StopReason::FailureThreshold;
                }
            }

            if n + 1 < pending.len() && token.wait(self.config.delay_after(status)) {
                return self
                    .halted(generation, token)
                    .unwrap_or(StopReason::Cancelled);
            }
        }
        StopReason::Completed
    }

    fn begin(&self) -> (u64, CancelToken) {
        let token = CancelToken::new();
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = active.replace(token.clone()) {
            tracing::warn!(generation, "superseding a running resolution pass");
            previous.cancel();
        }
        (generation, token)
    }

    fn finish(&self, generation: u64) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) == generation {
            *active = None;
        }
    }

    /// The generation is bumped before the old token is cancelled, so checking it first
    /// reports a superseded pass as such.
    fn halted(&self, generation: u64, token: &CancelToken) -> Option<StopReason> {
        if self.generation.load(Ordering::SeqCst) != generation {
            Some(StopReason::Superseded)
        } else if token.is_cancelled() {
            Some(StopReason::Cancelled)
        } else {
            None
        }
    }
}

fn snapshot(report: &ResolutionReport) -> Snapshot {
    Snapshot {
        generation: report.generation,
        records: Arc::clone(&report.records),
        resolved: report.resolved,
        attempted: report.attempted,
    }
}
