pub mod aggregate;
pub mod config;
pub mod dispatch;
pub mod partition;
pub mod source;

use color_eyre::eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use self::aggregate::Report;
use self::config::Config;
use self::dispatch::{Dispatcher, HttpCaller};
use self::partition::partition;
use self::source::{AddressSource, JsonFileSource};

/// Loads every address, queries each one once, and reports the results
///
/// Fails only if the addresses or the HTTP client cannot be set up. Individual
/// call failures are counted in the report.
#[instrument(name = "run", skip_all)]
pub async fn run(config: &Config, cancellation_token: CancellationToken) -> Result<Report> {
    let addresses = JsonFileSource::new(&config.input.file).load()?;
    let groups = partition(&addresses, config.dispatch.group_size);

    info!(
        addresses = addresses.len(),
        groups = groups.len(),
        concurrency = ?config.dispatch.concurrency_limit(),
        call_timeout = ?config.dispatch.call_timeout(),
        "starting"
    );

    let caller = HttpCaller::from_config(config)?;
    let dispatcher = Dispatcher::from_config(caller, &config.dispatch)
        .with_cancellation_token(cancellation_token);

    Ok(dispatcher.dispatch(&groups).await)
}
