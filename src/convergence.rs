// File: src/convergence.rs
//
// Convergence Polling
//
// Cross-node effects are asynchronous: a transfer returns before the
// recipient observes the funds. Polling an observation until it matches,
// bounded by a deadline, is therefore the only correctness-observation
// mechanism the harness has. This is also the only retry loop in the
// system.

use std::future::Future;
use std::time::Duration;

use log::trace;
use tokio::time::{sleep, Instant};

use crate::control::ControlSession;
use crate::error::{HarnessError, Result};

/// Poll `observe` every `interval` until it reports true or `timeout`
/// elapses.
///
/// The observation runs once immediately. An observation error (for
/// example, a dropped control connection) aborts the wait at once; only a
/// false observation is retried. On deadline expiry the error names `what`
/// and carries the elapsed time.
pub async fn wait_until<F, Fut>(
    mut observe: F,
    interval: Duration,
    timeout: Duration,
    what: &str,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    loop {
        if observe().await? {
            trace!("{} converged after {:?}", what, start.elapsed());
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(HarnessError::Timeout {
                what: what.to_string(),
                elapsed: start.elapsed(),
            });
        }
        sleep(interval).await;
    }
}

/// Wait until `session` reports exactly `expected` as its balance.
pub async fn wait_for_balance(
    session: &ControlSession,
    min_confirmations: u32,
    expected: u64,
    interval: Duration,
    timeout: Duration,
    what: &str,
) -> Result<()> {
    wait_until(
        move || async move { Ok(session.get_balance(min_confirmations).await? == expected) },
        interval,
        timeout,
        what,
    )
    .await
}
