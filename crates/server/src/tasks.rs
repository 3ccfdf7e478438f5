//! Supervision for long-running background tasks.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const BASE_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
/// A run lasting this long counts as healthy and resets the backoff.
const HEALTHY_RUN: Duration = Duration::from_secs(60);

fn backoff(failures: u32) -> Duration {
    BASE_BACKOFF
        .saturating_mul(2u32.saturating_pow(failures.saturating_sub(1)))
        .min(MAX_BACKOFF)
}

/// Run the task built by `factory` until `cancel` fires, restarting it with
/// capped exponential backoff whenever it panics or returns on its own.
pub fn spawn_supervised<F, Fut>(
    name: &'static str,
    cancel: CancellationToken,
    factory: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut failures: u32 = 0;
        loop {
            let started = Instant::now();
            let mut run = tokio::spawn(factory());
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    run.abort();
                    break;
                }
                result = &mut run => result,
            };
            if cancel.is_cancelled() {
                break;
            }

            if started.elapsed() >= HEALTHY_RUN {
                failures = 0;
            }
            failures += 1;
            let delay = backoff(failures);
            match result {
                Ok(()) => warn!(task = name, attempt = failures, ?delay, "Background task exited, restarting"),
                Err(e) => error!(task = name, attempt = failures, ?delay, "Background task failed: {e}, restarting"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        info!(task = name, "Background task stopped");
    })
}
