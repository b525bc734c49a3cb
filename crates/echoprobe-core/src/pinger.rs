use crate::config::{RunConfig, SessionConfig};
use crate::error::{Error, Result};
use crate::event::{EventHandler, SessionEvent};
use crate::probe::{ProbeResult, ProbeState};
use crate::session::ProbeSession;
use crate::stats::RunStatistics;
use crate::types::Sequence;
use crossbeam::channel::{unbounded, RecvTimeoutError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use tracing::instrument;

/// The longest the run loop sleeps between looking at the world.
///
/// Bounds cancellation latency; deadlines closer than this are honoured
/// exactly.
const TICK: Duration = Duration::from_millis(50);

/// The shortest wait, to avoid a zero-timeout spin when a deadline is due.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// The outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The target as given by the caller.
    pub target: String,
    /// The resolved address, absent when resolution or socket setup failed.
    pub addr: Option<IpAddr>,
    /// One result per probe, in emission order.
    pub results: Vec<ProbeResult>,
}

impl RunReport {
    /// Aggregate statistics, derived on demand.
    #[must_use]
    pub fn statistics(&self) -> RunStatistics {
        RunStatistics::from_results(&self.results)
    }
}

/// A bounded ICMP echo probing run.
///
/// Use the [`crate::Builder`] type to create a `Pinger`.
///
/// Every failure mode is reported through the same result stream as normal
/// outcomes; none of the run methods has an error channel of its own.
#[derive(Debug, Clone)]
pub struct Pinger {
    target: String,
    config: RunConfig,
    session_config: SessionConfig,
}

impl Pinger {
    pub(crate) fn new(target: String, config: RunConfig, read_timeout: Duration) -> Self {
        let session_config = SessionConfig {
            payload_size: config.payload_size,
            payload_pattern: config.payload_pattern,
            read_timeout,
        };
        Self {
            target,
            config,
            session_config,
        }
    }

    /// The target as given by the caller.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> RunConfig {
        self.config
    }

    /// Run on the current thread and collect all results.
    #[must_use]
    pub fn run(&self) -> RunReport {
        self.run_with(|_| {})
    }

    /// Run on the current thread, handing each result to `on_result` as it
    /// is produced. Returns the report once, when the run completes.
    pub fn run_with<F: FnMut(&ProbeResult)>(&self, mut on_result: F) -> RunReport {
        execute(
            &self.target,
            self.config,
            self.session_config,
            &AtomicBool::new(false),
            &mut on_result,
        )
    }

    /// Run on a background thread, handing each result to `on_result` as it
    /// is produced.
    ///
    /// Returns immediately with a [`RunHandle`] which can cancel the run and
    /// wait for its report.
    pub fn spawn_with<F>(&self, on_result: F) -> Result<RunHandle>
    where
        F: FnMut(&ProbeResult) + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let partial = Arc::new(Mutex::new(Vec::new()));
        let target = self.target.clone();
        let config = self.config;
        let session_config = self.session_config;
        let run_cancelled = cancelled.clone();
        let run_partial = partial.clone();
        let mut on_result = on_result;
        let join = thread::Builder::new()
            .name(String::from("echoprobe-run"))
            .spawn(move || {
                let mut deliver = |result: &ProbeResult| {
                    run_partial.lock().push(result.clone());
                    on_result(result);
                };
                execute(&target, config, session_config, &run_cancelled, &mut deliver)
            })
            .map_err(|err| Error::Other(err.to_string()))?;
        Ok(RunHandle {
            cancelled,
            partial,
            join,
        })
    }
}

/// A handle to a run executing on a background thread.
pub struct RunHandle {
    cancelled: Arc<AtomicBool>,
    partial: Arc<Mutex<Vec<ProbeResult>>>,
    join: JoinHandle<RunReport>,
}

impl RunHandle {
    /// Request cancellation.
    ///
    /// No further probes are sent; each incomplete probe resolves to a
    /// `stopped by user` result and the report completes promptly.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// The results emitted so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ProbeResult> {
        self.partial.lock().clone()
    }

    /// A clonable token which cancels this run.
    ///
    /// Useful where cancellation must happen from another thread or a signal
    /// handler while the handle itself is being waited on.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        Canceller(self.cancelled.clone())
    }

    /// Wait for the run to complete and return its report.
    pub fn wait(self) -> Result<RunReport> {
        self.join
            .join()
            .map_err(|_| Error::Other(String::from("run thread panicked")))
    }
}

/// A clonable cancellation token for a running probe.
#[derive(Debug, Clone)]
pub struct Canceller(Arc<AtomicBool>);

impl Canceller {
    /// Request cancellation of the associated run.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Drive one bounded run to completion.
///
/// Probes are fire-and-forget: the next send never waits on the previous
/// reply. The session's receive loop feeds events through a channel, so
/// this thread is the only one touching the probe-state table.
#[instrument(skip_all, fields(target = %target), level = "debug")]
fn execute<F: FnMut(&ProbeResult)>(
    target: &str,
    config: RunConfig,
    session_config: SessionConfig,
    cancelled: &AtomicBool,
    on_result: &mut F,
) -> RunReport {
    let (tx, events) = unbounded();
    let handler: EventHandler = Arc::new(move |event| {
        let _ = tx.send(event);
    });
    let mut session = ProbeSession::new(target, session_config, handler);
    let addr = match session.start() {
        Ok(addr) => addr,
        Err(err) => {
            let result = ProbeResult::failure(Sequence(0), err.to_string());
            on_result(&result);
            return RunReport {
                target: target.to_string(),
                addr: None,
                results: vec![result],
            };
        }
    };
    let mut state = RunState::new(config, SystemTime::now());
    let mut results = Vec::with_capacity(config.count);
    let mut deliver = |batch: Vec<ProbeResult>, results: &mut Vec<ProbeResult>| {
        for result in batch {
            on_result(&result);
            results.push(result);
        }
    };
    loop {
        if cancelled.load(Ordering::SeqCst) {
            deliver(state.cancel(), &mut results);
            break;
        }
        let now = SystemTime::now();
        if state.send_due(now) {
            let sequence = state.record_sent(now);
            if let Err(err) = session.send_probe(sequence) {
                deliver(state.fail_probe(sequence, &err.to_string()), &mut results);
            }
        }
        deliver(state.sweep(SystemTime::now()), &mut results);
        if state.finished() {
            break;
        }
        match events.recv_timeout(state.wait_duration(SystemTime::now())) {
            Ok(event) => deliver(state.on_event(&event), &mut results),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    session.stop();
    RunReport {
        target: target.to_string(),
        addr: Some(addr),
        results,
    }
}

/// The per-run probe bookkeeping.
///
/// Sole owner of the [`ProbeState`] table; every sequence ever recorded
/// yields exactly one result, whether by reply, timeout, send failure,
/// receive failure or cancellation.
struct RunState {
    config: RunConfig,
    states: BTreeMap<Sequence, ProbeState>,
    next_sequence: u16,
    sent: usize,
    completed: usize,
    next_send_at: SystemTime,
    receive_failed: bool,
}

impl RunState {
    fn new(config: RunConfig, now: SystemTime) -> Self {
        Self {
            config,
            states: BTreeMap::new(),
            next_sequence: 0,
            sent: 0,
            completed: 0,
            next_send_at: now,
            receive_failed: false,
        }
    }

    /// Whether the next probe should be sent now.
    fn send_due(&self, now: SystemTime) -> bool {
        !self.receive_failed && self.sent < self.config.count && now >= self.next_send_at
    }

    /// Record the next probe as sent and schedule its successor.
    fn record_sent(&mut self, now: SystemTime) -> Sequence {
        let sequence = Sequence(self.next_sequence);
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.sent += 1;
        self.states.insert(sequence, ProbeState::new(sequence, now));
        self.next_send_at = now + self.config.interval;
        sequence
    }

    /// Fail a single probe, e.g. after a send error.
    fn fail_probe(&mut self, sequence: Sequence, message: &str) -> Vec<ProbeResult> {
        match self.states.get_mut(&sequence) {
            Some(state) if !state.completed => {
                state.completed = true;
                self.completed += 1;
                vec![ProbeResult::failure(sequence, message)]
            }
            _ => Vec::new(),
        }
    }

    /// Apply a session event to the table.
    fn on_event(&mut self, event: &SessionEvent) -> Vec<ProbeResult> {
        match event {
            SessionEvent::ReplyReceived {
                sequence,
                from,
                received,
            } => {
                let Some(state) = self.states.get_mut(sequence) else {
                    tracing::debug!(?sequence, "reply for unknown sequence ignored");
                    return Vec::new();
                };
                if state.completed {
                    tracing::debug!(?sequence, "late reply suppressed");
                    return Vec::new();
                }
                state.completed = true;
                state.received_at = Some(*received);
                self.completed += 1;
                let round_trip = received.duration_since(state.sent_at).unwrap_or_default();
                vec![ProbeResult::reply(*sequence, round_trip, *from)]
            }
            SessionEvent::Failed { error } => {
                self.receive_failed = true;
                self.complete_outstanding(error)
            }
            SessionEvent::UnexpectedPacket { from } => {
                tracing::debug!(%from, "unexpected packet ignored");
                Vec::new()
            }
            SessionEvent::Started { .. }
            | SessionEvent::Sent { .. }
            | SessionEvent::SendFailed { .. } => Vec::new(),
        }
    }

    /// Fail every incomplete probe which has outlived the probe timeout.
    ///
    /// Emits in sequence order; a late reply arriving after its timeout has
    /// fired is suppressed by the completed flag, never re-emitted.
    fn sweep(&mut self, now: SystemTime) -> Vec<ProbeResult> {
        let mut expired = Vec::new();
        for state in self.states.values_mut().filter(|state| !state.completed) {
            let age = now.duration_since(state.sent_at).unwrap_or_default();
            if age >= self.config.probe_timeout {
                state.completed = true;
                expired.push(ProbeResult::failure(state.sequence, "timeout"));
            }
        }
        self.completed += expired.len();
        expired
    }

    /// Resolve every incomplete probe as stopped by the user.
    fn cancel(&mut self) -> Vec<ProbeResult> {
        self.complete_outstanding("stopped by user")
    }

    fn complete_outstanding(&mut self, message: &str) -> Vec<ProbeResult> {
        let mut outstanding = Vec::new();
        for state in self.states.values_mut().filter(|state| !state.completed) {
            state.completed = true;
            outstanding.push(ProbeResult::failure(state.sequence, message));
        }
        self.completed += outstanding.len();
        outstanding
    }

    /// Whether every probe that will ever be sent has a result.
    fn finished(&self) -> bool {
        (self.receive_failed || self.sent == self.config.count) && self.completed == self.sent
    }

    /// How long the loop may sleep before the next deadline.
    fn wait_duration(&self, now: SystemTime) -> Duration {
        let mut deadline: Option<SystemTime> = None;
        if !self.receive_failed && self.sent < self.config.count {
            deadline = Some(self.next_send_at);
        }
        for state in self.states.values().filter(|state| !state.completed) {
            let timeout_at = state.sent_at + self.config.probe_timeout;
            deadline = Some(deadline.map_or(timeout_at, |d| d.min(timeout_at)));
        }
        deadline.map_or(TICK, |deadline| {
            deadline
                .duration_since(now)
                .unwrap_or(Duration::ZERO)
                .clamp(MIN_WAIT, TICK)
        })
    }
}
