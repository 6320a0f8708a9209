// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Scan event bus.
//!
//! Fine-grained progress events distributed over a tokio broadcast
//! channel. Listeners consume a [`broadcast::Receiver`] on their own
//! tasks, so a misbehaving listener can never unwind into runner state.
//! [`EventCollector`] accumulates events for tests and progress UIs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::ErrorCode;
use crate::types::{Finding, InterruptReason};

const CHANNEL_CAPACITY: usize = 1024;

/// Everything the engine reports while a scan runs.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Emitted exactly once, before any check event.
    Started,

    /// Emitted exactly once, after all check events.
    Finished,

    /// The scan was cancelled or timed out.
    Interrupted { reason: InterruptReason },

    CheckStarted {
        check_id: String,
        target_request_id: String,
    },

    CheckFinished {
        check_id: String,
        target_request_id: String,
    },

    CheckFailed {
        check_id: String,
        target_request_id: String,
        error_code: ErrorCode,
        error_message: String,
    },

    Finding {
        target_request_id: String,
        check_id: String,
        finding: Finding,
    },

    /// A check-issued send entered the request queue.
    RequestPending {
        pending_request_id: String,
        target_request_id: String,
        check_id: String,
    },

    /// A check-issued send completed; ids reference the host's copies.
    RequestCompleted {
        pending_request_id: String,
        request_id: String,
        response_id: String,
    },
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEvent::Started => write!(f, "scan:started"),
            ScanEvent::Finished => write!(f, "scan:finished"),
            ScanEvent::Interrupted { reason } => write!(f, "scan:interrupted ({})", reason),
            ScanEvent::CheckStarted {
                check_id,
                target_request_id,
            } => write!(f, "scan:check-started {} on {}", check_id, target_request_id),
            ScanEvent::CheckFinished {
                check_id,
                target_request_id,
            } => write!(f, "scan:check-finished {} on {}", check_id, target_request_id),
            ScanEvent::CheckFailed {
                check_id,
                target_request_id,
                error_code,
                ..
            } => write!(
                f,
                "scan:check-failed {} on {} ({})",
                check_id, target_request_id, error_code
            ),
            ScanEvent::Finding {
                check_id, finding, ..
            } => write!(f, "scan:finding {} [{}]", check_id, finding.severity),
            ScanEvent::RequestPending {
                pending_request_id,
                check_id,
                ..
            } => write!(f, "scan:request-pending {} ({})", pending_request_id, check_id),
            ScanEvent::RequestCompleted {
                pending_request_id, ..
            } => write!(f, "scan:request-completed {}", pending_request_id),
        }
    }
}

/// Broadcast hub for scan events. Cheap to clone; all clones feed the
/// same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScanEvent>,
    event_count: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            event_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }

    /// Emit an event. Never fails: with no subscribers the event is
    /// counted and dropped.
    pub fn emit(&self, event: ScanEvent) {
        self.event_count.fetch_add(1, Ordering::Relaxed);
        debug!("{}", event);
        if self.sender.receiver_count() > 0 {
            // send only errors when every receiver is gone; nothing to do
            let _ = self.sender.send(event);
        }
    }
}

/// Accumulates events from a bus in the background. Test and UI helper.
pub struct EventCollector {
    bus: EventBus,
    events: Arc<RwLock<Vec<ScanEvent>>>,
}

impl EventCollector {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Start collecting. The handle stops when the bus is dropped or the
    /// caller aborts it.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let events = Arc::clone(&self.events);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => events.write().await.push(event),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("event collector lagged by {} events", n);
                    }
                }
            }
        })
    }

    pub async fn events(&self) -> Vec<ScanEvent> {
        self.events.read().await.clone()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}
