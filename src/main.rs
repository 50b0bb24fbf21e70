use anyhow::Result;
use fdscraper::{
    config::Config, navigate::http::HttpNavigator, pipeline::Pipeline, util::CancelToken,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let cfg = Config::from_env()?;
    info!(
        base_url = %cfg.base_url,
        years = ?cfg.years,
        current_year = %cfg.effective_current_year(),
        "configured"
    );

    // ─── 3) wire cancellation to ctrl-c ──────────────────────────────
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received; stopping at the next poll");
                cancel.cancel();
            }
        });
    }

    // ─── 4) run the pipeline ─────────────────────────────────────────
    let nav = HttpNavigator::new(cfg.download_dir.clone());
    let summary = Pipeline::new(&nav, &cfg, cancel).run().await?;

    for (year, err) in &summary.failed {
        error!(year = %year, error = %err, "year failed");
    }
    info!(
        fetched = summary.fetched.len(),
        reused = summary.reused.len(),
        failed = summary.failed.len(),
        converted = summary.converted,
        transform_failures = summary.transform_failures,
        "all done"
    );
    Ok(())
}
