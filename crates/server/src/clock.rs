//! Background clock scanner. Ends matches whose side to move has run out
//! of time, going through the service so the per-match lock serializes the
//! expiry with concurrent moves.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::GameError;
use crate::service::GameService;

pub struct ClockService {
    service: Arc<GameService>,
    interval: Duration,
    scan_limit: i64,
}

impl ClockService {
    pub fn new(service: Arc<GameService>, interval: Duration, scan_limit: i64) -> Self {
        Self {
            service,
            interval,
            scan_limit,
        }
    }

    /// Scan until `cancel` fires. A failed scan is logged and the loop goes on.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Clock scanner started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {
                    if let Err(e) = self.scan_once(Utc::now()).await {
                        error!("Clock scan failed: {e}");
                    }
                }
            }
        }
        info!("Clock scanner stopped");
    }

    /// One pass over running clocks, earliest deadline first. Returns how
    /// many matches were ended. A failure on one match is logged and does not
    /// stop the others.
    pub async fn scan_once(&self, now: DateTime<Utc>) -> Result<usize, GameError> {
        let running = self.service.matches_by_deadline(self.scan_limit).await?;
        let mut expired = 0;
        for candidate in running {
            if candidate.clock.overdue(candidate.status, now).is_none() {
                break;
            }
            match self.service.expire_if_overdue(candidate.id, now).await {
                Ok(true) => expired += 1,
                Ok(false) => debug!(match_id = %candidate.id, "Match no longer overdue"),
                Err(e) => warn!(match_id = %candidate.id, "Failed to expire match: {e}"),
            }
        }
        Ok(expired)
    }
}
