//! Serialized turn queue for the streaming channel
//!
//! Submissions from possibly-overlapping streaming inputs are drained one
//! at a time so exactly one queued turn is in flight. The drain task is
//! started idempotently on enqueue and stops itself when the queue is
//! observed empty.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::Result;

use super::{TurnOrchestrator, TurnOutcome, TurnRequest};

struct QueuedTurn {
    request: TurnRequest,
    respond_to: oneshot::Sender<Result<TurnOutcome>>,
}

/// FIFO of pending turns with a single-flight drain task
pub struct TurnQueue {
    orchestrator: Arc<TurnOrchestrator>,
    pending: Mutex<VecDeque<QueuedTurn>>,
    draining: AtomicBool,
}

impl TurnQueue {
    #[must_use]
    pub fn new(orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self {
            orchestrator,
            pending: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        }
    }

    /// Enqueue a turn and return the current queue depth
    ///
    /// The depth (including the new item) is the caller-visible
    /// backpressure signal. The result arrives on `respond_to`; a
    /// failing turn delivers its error there and never halts the drain.
    pub fn enqueue(
        self: &Arc<Self>,
        request: TurnRequest,
        respond_to: oneshot::Sender<Result<TurnOutcome>>,
    ) -> usize {
        let depth = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.push_back(QueuedTurn {
                request,
                respond_to,
            });
            pending.len()
        };

        self.start_drain();
        depth
    }

    /// Current queue depth
    #[must_use]
    pub fn depth(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether a drain task is currently running
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Start the drain task if one is not already running
    fn start_drain(self: &Arc<Self>) {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let queue = Arc::clone(self);
        tokio::spawn(async move { queue.drain().await });
    }

    /// Claim and process items one at a time until the queue is empty
    async fn drain(self: Arc<Self>) {
        loop {
            let item = self
                .pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front();

            let Some(item) = item else {
                self.draining.store(false, Ordering::Release);
                // An enqueue may have landed between the empty pop and
                // clearing the flag; reclaim the flag and keep going if so.
                if self.depth() == 0
                    || self
                        .draining
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_err()
                {
                    tracing::debug!("turn queue drained, stopping");
                    return;
                }
                continue;
            };

            let QueuedTurn {
                request,
                respond_to,
            } = item;

            let result = self
                .orchestrator
                .run_turn(request.input, &request.options)
                .await;

            if let Err(e) = &result {
                tracing::warn!(error = %e, "queued turn failed");
            }

            // Receiver may be gone (client disconnected); keep draining.
            let _ = respond_to.send(result);
        }
    }
}
