//! Forwards game events to an SQS queue.
//!
//! `publish` only enqueues onto an in-process channel, so it never blocks the
//! caller holding a match lock. A single forwarder drains the channel in
//! order; on a `.fifo` queue each match id is its own message group, which
//! keeps per-match ordering downstream.

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_sqs::Client as SqsClient;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::events::{EventBus, GameEvent};

const SEND_ATTEMPTS: u32 = 5;
const SEND_BACKOFF: Duration = Duration::from_millis(100);

/// Publishing half: cheap to call from the service.
pub struct SqsEventBus {
    tx: mpsc::UnboundedSender<GameEvent>,
}

impl EventBus for SqsEventBus {
    fn publish(&self, event: GameEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("SQS forwarder is gone, dropping event");
        }
    }
}

/// Draining half, run under supervision. Clones share one receiver so a
/// restarted forwarder resumes where the last one stopped.
#[derive(Clone)]
pub struct SqsForwarder {
    sqs: SqsClient,
    queue_url: String,
    fifo: bool,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<GameEvent>>>,
}

impl SqsEventBus {
    /// Create the bus and its forwarder from config.
    /// Returns None if SQS is not configured.
    pub async fn new(config: &Config) -> Option<(Self, SqsForwarder)> {
        let queue_url = config.sqs_queue_url.as_ref()?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let sqs = if let Some(endpoint) = &config.sqs_endpoint_url {
            // LocalStack or custom endpoint
            let sqs_config = aws_sdk_sqs::config::Builder::from(&aws_config)
                .endpoint_url(endpoint)
                .build();
            SqsClient::from_conf(sqs_config)
        } else {
            SqsClient::new(&aws_config)
        };

        let (tx, rx) = mpsc::unbounded_channel();
        Some((
            Self { tx },
            SqsForwarder {
                sqs,
                queue_url: queue_url.clone(),
                fifo: queue_url.ends_with(".fifo"),
                rx: Arc::new(Mutex::new(rx)),
            },
        ))
    }
}

impl SqsForwarder {
    /// Forward events until cancelled or every sender is dropped. An event
    /// that still fails after retries is logged and skipped.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut rx = self.rx.lock().await;
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            if let Err(e) = self.send_with_retry(&event).await {
                tracing::error!(
                    match_id = %event.match_id(),
                    topic = event.topic(),
                    "Dropping event: {e}"
                );
            }
        }
    }

    async fn send_with_retry(&self, event: &GameEvent) -> Result<(), String> {
        let body = serde_json::to_string(event)
            .map_err(|e| format!("Failed to serialize event: {e}"))?;
        let dedup_id = uuid::Uuid::new_v4().to_string();

        let mut attempt = 1;
        loop {
            match self.send(event, &body, &dedup_id).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < SEND_ATTEMPTS => {
                    let delay = SEND_BACKOFF * 2u32.pow(attempt - 1);
                    tracing::warn!(attempt, ?delay, "{e}, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(&self, event: &GameEvent, body: &str, dedup_id: &str) -> Result<(), String> {
        let mut request = self
            .sqs
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body);
        if self.fifo {
            request = request
                .message_group_id(event.match_id().to_string())
                .message_deduplication_id(dedup_id);
        }
        request
            .send()
            .await
            .map_err(|e| format!("Failed to send SQS message: {e}"))?;
        Ok(())
    }
}
