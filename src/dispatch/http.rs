use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument, warn};

use super::{CallError, CallOutcome, Caller, EndpointTemplate};
use crate::config::Config;
use crate::source::Address;

/// Queries the txlist endpoint over HTTP
///
/// Only the status code decides the outcome. The body is read and optionally
/// logged, but never parsed.
#[derive(Debug, Clone)]
pub struct HttpCaller {
    client: Client,
    endpoint: EndpointTemplate,
    log_bodies: bool,
}

impl HttpCaller {
    pub fn new(
        endpoint: EndpointTemplate,
        timeout: Option<Duration>,
        log_bodies: bool,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            log_bodies,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.api.endpoint(),
            config.dispatch.call_timeout(),
            config.api.log_bodies,
        )
    }
}

#[async_trait]
impl Caller for HttpCaller {
    type Remainder = Response;

    #[instrument(name = "call", skip(self), fields(%address))]
    async fn call(&self, address: &Address) -> (CallOutcome, Option<Response>) {
        let url = match self.endpoint.render(address) {
            Ok(url) => url,
            Err(e) => return (CallOutcome::Failure(e.into()), None),
        };

        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(error = %e, "request failed");
                return (CallOutcome::Failure(e.into()), None);
            }
        };

        let status = resp.status();
        let outcome = if status == StatusCode::OK {
            CallOutcome::Success
        } else {
            debug!(%status, "unexpected status");
            CallOutcome::Failure(CallError::Status(status.as_u16()))
        };

        (outcome, Some(resp))
    }

    #[instrument(name = "body", skip_all, fields(url = %resp.url()))]
    async fn finish(&self, resp: Response) {
        match resp.text().await {
            Ok(body) if self.log_bodies => debug!(%body),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to read response body"),
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use rstest::rstest;
    use tokio::time::timeout;

    use super::*;
    use crate::dispatch::test_utils::{BrokenBodyApi, MockApi};

    #[tokio::test]
    async fn test_ok() -> Result<()> {
        let api = MockApi::start().await;
        let caller = HttpCaller::new(api.endpoint(), None, false)?;

        let (outcome, _) = caller.call(&Address::from("0xAAA")).await;

        assert!(outcome.is_success());
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error() -> Result<()> {
        let api = MockApi::start().await;
        let caller = HttpCaller::new(api.endpoint(), None, true)?;

        let (outcome, _) = caller.call(&Address::from("0xBBB")).await;

        assert!(matches!(
            outcome,
            CallOutcome::Failure(CallError::Status(500))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_api_key() -> Result<()> {
        let api = MockApi::start().await;
        let endpoint: EndpointTemplate =
            format!("{}/api?address={{address}}&apikey={{api_key}}", api.url)
                .try_into()?;
        let caller = HttpCaller::new(endpoint.with_api_key("wrong"), None, false)?;

        let (outcome, _) = caller.call(&Address::from("0xAAA")).await;

        assert!(matches!(
            outcome,
            CallOutcome::Failure(CallError::Status(403))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable() -> Result<()> {
        let caller = HttpCaller::new(MockApi::unreachable(), None, false)?;

        let (outcome, _) = caller.call(&Address::from("0xAAA")).await;

        assert!(matches!(outcome, CallOutcome::Failure(CallError::Transport(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_client_timeout() -> Result<()> {
        let api = MockApi::start().await;
        let caller = HttpCaller::new(api.endpoint(), Some(Duration::from_millis(200)), false)?;

        let (outcome, _) = caller.call(&Address::from("0xSLOW")).await;

        assert!(matches!(outcome, CallOutcome::Failure(CallError::Transport(e)) if e.is_timeout()));
        Ok(())
    }

    #[rstest]
    #[case::stalled(true)]
    #[case::truncated(false)]
    #[tokio::test]
    async fn test_broken_body_keeps_status_outcome(#[case] stall: bool) -> Result<()> {
        let api = BrokenBodyApi::start(stall).await;
        let caller = HttpCaller::new(api.endpoint(), Some(Duration::from_millis(300)), true)?;

        let (outcome, resp) = caller.call(&Address::from("0xAAA")).await;
        assert!(outcome.is_success());

        let resp = resp.expect("a 200 leaves its body to read");
        timeout(Duration::from_secs(2), caller.finish(resp)).await?;

        Ok(())
    }
}
