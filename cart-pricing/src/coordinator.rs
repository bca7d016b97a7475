use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common_observability::{PricingMetrics, OUTCOME_ERROR, OUTCOME_OK, OUTCOME_SUPERSEDED};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::PricingBackend;
use crate::calculator::{CalculationRequest, PricingResult};
use crate::error::PricingError;

/// What the host renders. `result` is the last good calculation and survives failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingSnapshot {
    /// Latest scheduled generation.
    pub generation: u64,
    /// Generation that produced `result` / `error`.
    pub settled_generation: u64,
    pub pending: bool,
    pub result: Option<PricingResult>,
    pub error: Option<PricingError>,
}

impl PricingSnapshot {
    /// True when the newest request has completed successfully.
    pub fn is_current(&self) -> bool {
        !self.pending && self.error.is_none() && self.result.is_some() && self.settled_generation == self.generation
    }
}

/// Debounces recalculation requests and keeps only the newest one's answer.
///
/// Each `schedule` starts a new generation and aborts the previous task, whether it was
/// still waiting out the settle window or already talking to the backend. A response
/// that still lands after a newer generation was scheduled is discarded. Must be used
/// from within a tokio runtime.
pub struct RecalcCoordinator<B: PricingBackend + 'static> {
    backend: Arc<B>,
    settle_window: Duration,
    generation: Arc<AtomicU64>,
    inflight: Mutex<Option<JoinHandle<()>>>,
    snapshot: Arc<watch::Sender<PricingSnapshot>>,
    metrics: Arc<PricingMetrics>,
    log_recalculations: bool,
}

impl<B: PricingBackend + 'static> RecalcCoordinator<B> {
    pub fn new(backend: Arc<B>, settle_window: Duration, metrics: Arc<PricingMetrics>) -> Self {
        let (tx, _rx) = watch::channel(PricingSnapshot::default());
        RecalcCoordinator {
            backend,
            settle_window,
            generation: Arc::new(AtomicU64::new(0)),
            inflight: Mutex::new(None),
            snapshot: Arc::new(tx),
            metrics,
            log_recalculations: false,
        }
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log_recalculations = enabled;
        self
    }

    pub fn settle_window(&self) -> Duration { self.settle_window }

    pub fn snapshot(&self) -> PricingSnapshot { self.snapshot.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<PricingSnapshot> { self.snapshot.subscribe() }

    pub fn schedule(&self, request: CalculationRequest) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.abort_inflight() {
            self.metrics.debounced_edits.inc();
        }
        self.snapshot.send_modify(|s| {
            s.generation = generation;
            s.pending = true;
        });

        let backend = self.backend.clone();
        let current = self.generation.clone();
        let snapshot = self.snapshot.clone();
        let metrics = self.metrics.clone();
        let settle_window = self.settle_window;
        let log_recalculations = self.log_recalculations;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(settle_window).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }

            let timer = metrics.calculation_seconds.start_timer();
            let outcome = backend.calculate(request).await;
            timer.observe_duration();

            if current.load(Ordering::SeqCst) != generation {
                metrics.record_outcome(OUTCOME_SUPERSEDED);
                debug!(generation, "Discarding superseded pricing response");
                return;
            }

            match outcome {
                Ok(result) => {
                    metrics.record_outcome(OUTCOME_OK);
                    if log_recalculations {
                        info!(generation, final_price = %result.final_price, discount_percentage = %result.discount_percentage, "Pricing recalculated");
                    }
                    snapshot.send_modify(|s| {
                        s.settled_generation = generation;
                        s.pending = false;
                        s.result = Some(result);
                        s.error = None;
                    });
                }
                Err(err) => {
                    metrics.record_outcome(OUTCOME_ERROR);
                    warn!(generation, error = %err, retryable = err.is_retryable(), "Pricing recalculation failed; keeping last result");
                    snapshot.send_modify(|s| {
                        s.settled_generation = generation;
                        s.pending = false;
                        s.error = Some(err);
                    });
                }
            }
        });
        *self.inflight.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
        debug!(generation, settle_ms = settle_window.as_millis() as u64, "Recalculation scheduled");
        generation
    }

    /// Drop interest in anything outstanding without scheduling a new request. The last
    /// result stays visible but no longer counts as current.
    pub fn cancel(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_inflight();
        self.snapshot.send_modify(|s| {
            s.generation = generation;
            s.pending = false;
        });
    }

    /// True when an unfinished task was aborted.
    fn abort_inflight(&self) -> bool {
        let previous = self.inflight.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
        match previous {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Resolves once no request is pending.
    pub async fn settled(&self) -> PricingSnapshot {
        let mut rx = self.snapshot.subscribe();
        loop {
            {
                let current = rx.borrow_and_update();
                if !current.pending {
                    return current.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }
}

impl<B: PricingBackend + 'static> Drop for RecalcCoordinator<B> {
    fn drop(&mut self) {
        self.abort_inflight();
    }
}
