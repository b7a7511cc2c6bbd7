//! Generic state reconciliation loop shared by the lifecycle waits.
//!
//! The remote API is asynchronous: every mutating call returns immediately
//! with a transient-state record. This loop turns that into a synchronous
//! call by re-fetching the record until its state leaves the transient set.
//! Interpretation of the settled observation is left to the call site, which
//! is what lets volume creation, attachment, detachment, and snapshot
//! completion share one mechanism despite their different terminal rules.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::debug;

use super::error::ManagerError;

/// Outcome of a single poll against the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Observed<S> {
    /// The entity (or its attachment) exists and reports the given state.
    Present(S),
    /// The provider no longer reports the entity or its attachment.
    Absent,
}

/// Pacing and bounding for a reconciliation wait.
///
/// `deadline` is `None` by default: the wait is unbounded and a stalled
/// provider-side operation stalls the caller. Configuring a deadline trades
/// that hang for a [`ManagerError::Timeout`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct PollPolicy {
    pub(crate) interval: Duration,
    pub(crate) deadline: Option<Duration>,
}

/// Polls `fetch` until the observation settles outside the transient set.
///
/// `Absent` settles immediately; whether that means success (detach) or
/// failure (attach) is the call site's decision.
pub(crate) async fn await_settled<S, F, Fut>(
    policy: PollPolicy,
    action: &str,
    entity: &str,
    transient: &[S],
    mut fetch: F,
) -> Result<Observed<S>, ManagerError>
where
    S: PartialEq,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observed<S>, ManagerError>>,
{
    let started = Instant::now();
    loop {
        let observed = fetch().await?;
        match observed {
            Observed::Present(ref state) if transient.contains(state) => {}
            settled => return Ok(settled),
        }
        if let Some(deadline) = policy.deadline
            && started.elapsed() >= deadline
        {
            return Err(ManagerError::Timeout {
                action: action.to_owned(),
                entity: entity.to_owned(),
            });
        }
        debug!(action, entity, "waiting for state transition");
        sleep(policy.interval).await;
    }
}
