mod endpoint;
mod http;
pub(crate) mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::select;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::aggregate::{Aggregator, Report};
use crate::config::DispatchConfig;
use crate::partition::AddressGroup;
use crate::source::Address;

pub use endpoint::{EndpointError, EndpointTemplate};
pub use http::HttpCaller;

/// Classification of a single remote call
#[derive(Debug)]
pub enum CallOutcome {
    Success,
    Failure(CallError),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Why a call was counted as a failure
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("run cancelled")]
    Cancelled,

    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),

    #[error("caller panicked")]
    Panicked,
}

/// Performs the remote call for one address
///
/// A call happens in two phases. [`Caller::call`] issues the request and settles
/// the outcome, and is bounded by the call timeout. [`Caller::finish`] consumes
/// whatever is left, such as the response body, and cannot change that outcome.
///
/// Errors are never returned. They become [`CallOutcome::Failure`].
#[async_trait]
pub trait Caller: Send + Sync + 'static {
    /// What is left to consume once a call is classified
    type Remainder: Send + 'static;

    async fn call(&self, address: &Address) -> (CallOutcome, Option<Self::Remainder>);

    async fn finish(&self, _remainder: Self::Remainder) {}
}

/// Fans out one task per address, and waits for all of them
///
/// Grouping has no effect on scheduling. In-flight calls are bounded by a
/// semaphore if a concurrency limit is set, and unbounded otherwise.
#[derive(Debug)]
pub struct Dispatcher<C> {
    caller: Arc<C>,

    /// Permits for in-flight calls. `None` means unbounded
    permits: Option<Arc<Semaphore>>,

    call_timeout: Option<Duration>,

    run_deadline: Option<Duration>,

    /// Cancelling this fails every call that has not yet completed
    cancellation_token: CancellationToken,
}

impl<C: Caller> Dispatcher<C> {
    /// Unbounded, with no timeouts
    pub fn new(caller: C) -> Self {
        Self {
            caller: Arc::new(caller),
            permits: None,
            call_timeout: None,
            run_deadline: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn from_config(caller: C, config: &DispatchConfig) -> Self {
        Self::new(caller)
            .with_concurrency(config.concurrency_limit())
            .with_call_timeout(config.call_timeout())
            .with_run_deadline(config.run_deadline())
    }

    pub fn with_concurrency(mut self, limit: Option<usize>) -> Self {
        self.permits = limit
            .map(|n| n.min(Semaphore::MAX_PERMITS))
            .map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_run_deadline(mut self, run_deadline: Option<Duration>) -> Self {
        self.run_deadline = run_deadline;
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Dispatches every address of every group, and returns once all of them have
    /// an outcome recorded
    #[instrument(name = "dispatch", skip_all, fields(groups = groups.len()))]
    pub async fn dispatch(&self, groups: &[AddressGroup<'_>]) -> Report {
        let token = self.cancellation_token.child_token();
        let watchdog = self.run_deadline.map(|deadline| {
            let token = token.clone();
            tokio::spawn(async move {
                sleep(deadline).await;
                warn!(?deadline, "run deadline reached, cancelling pending calls");
                token.cancel();
            })
        });

        let mut aggregator = Aggregator::start();

        for (index, group) in groups.iter().enumerate() {
            debug!(group = index, size = group.len(), "dispatching group");

            for address in group.iter() {
                aggregator.spawn(execute(
                    self.caller.clone(),
                    address.clone(),
                    self.permits.clone(),
                    self.call_timeout,
                    token.clone(),
                ));
            }
        }

        debug!(dispatched = aggregator.dispatched(), "waiting for calls");
        let report = aggregator.wait().await;

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        report
    }
}

async fn execute<C: Caller>(
    caller: Arc<C>,
    address: Address,
    permits: Option<Arc<Semaphore>>,
    call_timeout: Option<Duration>,
    token: CancellationToken,
) -> CallOutcome {
    let _permit = match permits {
        Some(permits) => select! {
            biased;
            _ = token.cancelled() => return CallOutcome::Failure(CallError::Cancelled),
            permit = permits.acquire_owned() => match permit {
                Ok(permit) => Some(permit),
                Err(_) => return CallOutcome::Failure(CallError::Cancelled),
            },
        },
        None => None,
    };

    let call = async {
        match call_timeout {
            Some(limit) => timeout(limit, caller.call(&address))
                .await
                .unwrap_or((CallOutcome::Failure(CallError::Timeout(limit)), None)),
            None => caller.call(&address).await,
        }
    };

    let (outcome, remainder) = select! {
        biased;
        _ = token.cancelled() => return CallOutcome::Failure(CallError::Cancelled),
        classified = call => classified,
    };

    // the outcome is settled at this point, the rest only feeds logs
    if let Some(remainder) = remainder {
        let finish = async {
            match call_timeout {
                Some(limit) => {
                    if timeout(limit, caller.finish(remainder)).await.is_err() {
                        warn!(%address, ?limit, "gave up reading response");
                    }
                }
                None => caller.finish(remainder).await,
            }
        };

        select! {
            biased;
            _ = token.cancelled() => {}
            _ = finish => {}
        }
    }

    outcome
}
