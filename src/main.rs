use color_eyre::eyre::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use ethui_fetcher::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = Config::read()?;
    let token = CancellationToken::new();

    // pending calls fail on ctrl-c, so an interrupted run still reports
    tokio::spawn({
        let token = token.clone();
        async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling pending calls");
                token.cancel();
            }
        }
    });

    let report = ethui_fetcher::run(&config, token).await?;

    info!("================");
    for line in report.to_string().lines() {
        info!("{}", line);
    }

    Ok(())
}

fn setup() -> Result<()> {
    color_eyre::install()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::NEW)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
