// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Request Queue
 * Bounded-concurrency FIFO for check-issued sends with inter-send spacing
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::debug;

use crate::errors::ScanInterrupted;
use crate::events::{EventBus, ScanEvent};
use crate::host::{Exchange, HostSdk, RequestSpec};
use crate::interrupt::InterruptSignal;
use crate::types::ScanConfig;

struct QueuedSend {
    spec: RequestSpec,
    pending_request_id: String,
    reply: oneshot::Sender<Result<Exchange>>,
}

/// Serializes check-issued sends: at most `concurrent_requests` in
/// flight, `requests_delay_ms` between dispatches (never before the
/// first), strict FIFO pickup. The queue does not retry, does not
/// deduplicate, and leaves scan-level timeouts to the runner.
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<QueuedSend>,
    events: EventBus,
    interrupt: Arc<InterruptSignal>,
}

impl RequestQueue {
    pub fn new(
        host: Arc<dyn HostSdk>,
        config: &ScanConfig,
        events: EventBus,
        interrupt: Arc<InterruptSignal>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(dispatch_loop(
            rx,
            host,
            events.clone(),
            Arc::clone(&interrupt),
            config.concurrent_requests.max(1),
            config.requests_delay_ms,
        ));

        Arc::new(Self {
            tx,
            events,
            interrupt,
        })
    }

    /// Queue one send. Emits `scan:request-pending` immediately; resolves
    /// with the host's exchange, the host's transport error, or
    /// `ScanInterrupted` when cancellation lands before dispatch.
    pub async fn enqueue(
        &self,
        spec: RequestSpec,
        pending_request_id: String,
        target_request_id: String,
        check_id: String,
    ) -> Result<Exchange> {
        self.events.emit(ScanEvent::RequestPending {
            pending_request_id: pending_request_id.clone(),
            target_request_id,
            check_id,
        });

        self.interrupt.check()?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let item = QueuedSend {
            spec,
            pending_request_id,
            reply: reply_tx,
        };
        if self.tx.send(item).is_err() {
            return Err(self.shutdown_error());
        }

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(self.shutdown_error()),
        }
    }

    fn shutdown_error(&self) -> anyhow::Error {
        match self.interrupt.reason() {
            Some(reason) => ScanInterrupted::new(reason).into(),
            None => anyhow::anyhow!("request queue shut down"),
        }
    }
}

async fn dispatch_loop(
    mut rx: mpsc::UnboundedReceiver<QueuedSend>,
    host: Arc<dyn HostSdk>,
    events: EventBus,
    interrupt: Arc<InterruptSignal>,
    concurrent_requests: usize,
    delay_ms: u64,
) {
    let semaphore = Arc::new(Semaphore::new(concurrent_requests));
    let mut dispatched_any = false;

    while let Some(item) = rx.recv().await {
        if let Some(reason) = interrupt.reason() {
            let _ = item.reply.send(Err(ScanInterrupted::new(reason).into()));
            continue;
        }

        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };

        // spacing applies between sends, never before the first
        if dispatched_any && delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if let Some(reason) = interrupt.reason() {
            let _ = item.reply.send(Err(ScanInterrupted::new(reason).into()));
            continue;
        }

        dispatched_any = true;
        let host = Arc::clone(&host);
        let events = events.clone();
        let QueuedSend {
            spec,
            pending_request_id,
            reply,
        } = item;

        tokio::spawn(async move {
            let result = host.send(spec).await;
            match &result {
                Ok(exchange) => {
                    events.emit(ScanEvent::RequestCompleted {
                        pending_request_id: pending_request_id.clone(),
                        request_id: exchange.request.id(),
                        response_id: exchange.response.id(),
                    });
                }
                Err(err) => {
                    debug!("queued send {} failed: {}", pending_request_id, err);
                }
            }
            let _ = reply.send(result);
            drop(permit);
        });
    }
}
