use anyhow::Context;
use inmet_humidity::{routes, InmetPanel, Settings};
use log::{info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("Failed to load settings")?;
    let address = settings.bind_address()?;
    if settings.refresh_token.is_empty() {
        warn!("REFRESH_TOKEN is empty, /refresh is open to anyone");
    }

    let panel = Arc::new(
        InmetPanel::from_settings(&settings)
            .await
            .context("Failed to set up the panel")?,
    );

    // Build the first dataset before accepting requests.
    let status = panel.status().await?;
    info!(
        "Serving {} rows for {} (degraded: {})",
        status.rows, status.day_key, status.degraded
    );

    info!("Listening on http://{}", address);
    warp::serve(routes(panel, settings.refresh_token.clone()))
        .run(address)
        .await;
    Ok(())
}
