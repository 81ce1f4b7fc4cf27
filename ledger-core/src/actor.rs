//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task owns the [`CommandProcessor`] and applies mutations in mailbox order
//! - Balance queries never enter the mailbox; they read the last committed snapshot
//! - Bounded mailbox gives backpressure to connection tasks
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              Connection tasks (one per teller)        │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │   balance ──► snapshot (RwLock<Arc<Vec<Entry>>>)      │
//! │   register/deposit/withdraw ──► mailbox               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   processor.execute() ─► persist ─► commit            │
//! │   publish snapshot, reply on oneshot                  │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! A request is processed to completion once it reaches the mailbox, even if
//! the requester has gone away. On a multi-threaded runtime the sign, seal and
//! fsync step runs under `block_in_place` so connection tasks keep moving.

use crate::metrics::Metrics;
use crate::processor::{observe, query_balance, CommandProcessor};
use crate::protocol::{Message, Request, Response};
use crate::types::Entry;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Committed entries shared between the actor and its handles
pub type Snapshot = Arc<Vec<Entry>>;

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Execute a request against the ledger
    Execute {
        /// Decoded request
        request: Request,
        /// Reply channel
        response: oneshot::Sender<Result<Response>>,
    },

    /// Shutdown actor after draining queued requests
    Shutdown,
}

/// Actor that processes ledger messages
#[derive(Debug)]
pub struct LedgerActor {
    /// Command processor owning the ledger
    processor: CommandProcessor,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Last committed snapshot, read by handles
    snapshot: Arc<RwLock<Snapshot>>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        processor: CommandProcessor,
        mailbox: mpsc::Receiver<LedgerMessage>,
        snapshot: Arc<RwLock<Snapshot>>,
    ) -> Self {
        Self {
            processor,
            mailbox,
            snapshot,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Execute { request, response } => {
                    let result = self.execute(request);

                    if response.send(result).is_err() {
                        tracing::debug!("Requester went away before the reply was sent");
                    }
                }
                LedgerMessage::Shutdown => {
                    self.drain();
                    break;
                }
            }
        }

        tracing::info!(
            entries = self.processor.ledger().len(),
            "Ledger actor stopped"
        );
    }

    /// Process whatever is already queued, then stop accepting
    fn drain(&mut self) {
        self.mailbox.close();

        while let Ok(msg) = self.mailbox.try_recv() {
            if let LedgerMessage::Execute { request, response } = msg {
                let result = self.execute(request);
                let _ = response.send(result);
            }
        }
    }

    fn execute(&mut self, request: Request) -> Result<Response> {
        let processor = &mut self.processor;
        let result = run_blocking(|| processor.execute(request));
        self.publish();
        result
    }

    fn publish(&self) {
        *self.snapshot.write() = self.processor.ledger().snapshot();
    }
}

/// Run blocking work in place, handing this worker's other tasks to another
/// thread when the runtime has one.
fn run_blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
    snapshot: Arc<RwLock<Snapshot>>,
    metrics: Metrics,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(
        sender: mpsc::Sender<LedgerMessage>,
        snapshot: Arc<RwLock<Snapshot>>,
        metrics: Metrics,
    ) -> Self {
        Self {
            sender,
            snapshot,
            metrics,
        }
    }

    /// Submit a request.
    ///
    /// Balance queries are answered from the last committed snapshot on the
    /// caller's task; everything else goes through the actor.
    pub async fn submit(&self, request: Request) -> Result<Response> {
        match request.message {
            Message::Balance { .. } => self.query(&request),
            _ => self.execute(request).await,
        }
    }

    /// Last committed entries
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.read().clone()
    }

    /// Metrics shared with the actor
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn query(&self, request: &Request) -> Result<Response> {
        let entries = self.snapshot();
        let result = query_balance(&entries, request);
        observe(&self.metrics, request.message.cmd(), &result);
        result
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Execute {
                request,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    processor: CommandProcessor,
    mailbox_capacity: usize,
) -> (LedgerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let snapshot = Arc::new(RwLock::new(processor.ledger().snapshot()));
    let metrics = processor.metrics().clone();

    let actor = LedgerActor::new(processor, rx, Arc::clone(&snapshot));
    let task = tokio::spawn(async move {
        actor.run().await;
    });

    (LedgerHandle::new(tx, snapshot, metrics), task)
}
