use crate::config::FetchConfig;
use crate::ecs::EntityId;
use crate::record::EntityRecord;
use crate::source::RecordSource;
use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

const FETCH_WORKER_QUEUE_DEPTH: usize = 64;

/// Why a fetch was issued. Replacement results are matched back to the entity they replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTicket {
    Population,
    Replacement { vacated: EntityId },
}

pub struct FetchOutcome {
    pub ticket: FetchTicket,
    pub attempts: u32,
    pub records: Result<Vec<EntityRecord>>,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self { max_retries: config.max_retries, delay: Duration::from_millis(config.retry_delay_ms) }
    }
}

pub(crate) fn run_fetch_job(source: &dyn RecordSource, ticket: FetchTicket, policy: RetryPolicy) -> FetchOutcome {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let result = match ticket {
            FetchTicket::Population => source.fetch_batch(),
            FetchTicket::Replacement { .. } => source.fetch_one().map(|record| vec![record]),
        };
        match result {
            Ok(records) => return FetchOutcome { ticket, attempts, records: Ok(records) },
            Err(err) if attempts <= policy.max_retries => {
                log::debug!("[fetch] {ticket:?} attempt {attempts} failed: {err:#}; retrying");
                if !policy.delay.is_zero() {
                    thread::sleep(policy.delay);
                }
            }
            Err(err) => return FetchOutcome { ticket, attempts, records: Err(err) },
        }
    }
}

enum FetchMode {
    Workers { senders: Vec<mpsc::SyncSender<FetchTicket>>, next_sender: AtomicUsize },
    Inline { source: Arc<dyn RecordSource>, tx: mpsc::Sender<FetchOutcome> },
}

/// Runs record fetches off the tick. Completed outcomes queue up until the tick drains them.
pub struct RecordFetcher {
    mode: FetchMode,
    policy: RetryPolicy,
    rx: mpsc::Receiver<FetchOutcome>,
}

impl RecordFetcher {
    pub fn new(source: Arc<dyn RecordSource>, config: &FetchConfig) -> Self {
        let policy = RetryPolicy::from_config(config);
        if config.workers == 0 {
            return Self::inline(source, policy);
        }
        match Self::spawn_workers(Arc::clone(&source), config.workers, policy) {
            Some(fetcher) => fetcher,
            None => {
                log::error!("[fetch] failed to spawn fetch workers; falling back to inline fetches");
                Self::inline(source, policy)
            }
        }
    }

    pub fn inline(source: Arc<dyn RecordSource>, policy: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { mode: FetchMode::Inline { source, tx }, policy, rx }
    }

    fn spawn_workers(source: Arc<dyn RecordSource>, worker_count: usize, policy: RetryPolicy) -> Option<Self> {
        let (result_tx, result_rx) = mpsc::channel();
        let mut senders = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let (tx, rx) = mpsc::sync_channel::<FetchTicket>(FETCH_WORKER_QUEUE_DEPTH);
            let thread_result_tx = result_tx.clone();
            let thread_source = Arc::clone(&source);
            if thread::Builder::new()
                .name(format!("record-fetch-{index}"))
                .spawn(move || {
                    while let Ok(ticket) = rx.recv() {
                        let outcome = run_fetch_job(thread_source.as_ref(), ticket, policy);
                        if thread_result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                })
                .is_err()
            {
                return None;
            }
            senders.push(tx);
        }
        Some(Self { mode: FetchMode::Workers { senders, next_sender: AtomicUsize::new(0) }, policy, rx: result_rx })
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.mode, FetchMode::Inline { .. })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn submit(&self, ticket: FetchTicket) -> std::result::Result<(), FetchTicket> {
        match &self.mode {
            FetchMode::Inline { source, tx } => {
                let outcome = run_fetch_job(source.as_ref(), ticket, self.policy);
                tx.send(outcome).map_err(|err| err.0.ticket)
            }
            FetchMode::Workers { senders, next_sender } => {
                if senders.is_empty() {
                    return Err(ticket);
                }
                let len = senders.len();
                let start = next_sender.fetch_add(1, AtomicOrdering::Relaxed) % len;
                for offset in 0..len {
                    match senders[(start + offset) % len].try_send(ticket) {
                        Ok(()) => return Ok(()),
                        Err(mpsc::TrySendError::Full(_)) | Err(mpsc::TrySendError::Disconnected(_)) => {}
                    }
                }
                Err(ticket)
            }
        }
    }

    pub fn drain(&self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Blocks up to `timeout` for the first outcome, then drains whatever else is ready.
    pub fn drain_blocking(&self, timeout: Duration) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        if let Ok(first) = self.rx.recv_timeout(timeout) {
            outcomes.push(first);
            outcomes.extend(self.drain());
        }
        outcomes
    }
}
