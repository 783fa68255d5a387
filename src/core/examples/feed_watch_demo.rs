use env_logger::Env;
use flagwatch::api::{Api, HttpApiClient};
use flagwatch::feed::{FeedOptions, FeedSynchronizer, PollOutcome};
use flagwatch::notification::LogNotifier;
use flagwatch::presentation::render_row;
use log::info;
use std::env;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize logger (RUST_LOG can override; default to info)
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info")).try_init();

    // Point at a running backend, defaulting to the local one
    let base_url =
        env::var("FLAGWATCH_BASE_URL").unwrap_or_else(|_| "http://localhost:2137".to_string());
    let api: Arc<dyn Api> = Arc::new(HttpApiClient::new(base_url.clone()));
    info!("Following {}", base_url);

    let feed = FeedSynchronizer::new(api, Arc::new(LogNotifier), FeedOptions::default());
    if feed.mount(10).await.is_err() {
        info!("Backend unreachable, nothing to show");
        return;
    }
    for row in feed.with_state(|state| state.streams.iter().map(render_row).collect::<Vec<_>>()) {
        println!("{}", row);
    }

    // Three manual polls, one second apart
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if let Ok(PollOutcome::Merged(report)) = feed.poll_increment().await {
            info!("{} new streams", report.added);
        }
    }

    let status = feed.status();
    info!(
        "Watermark {}, {} streams, {} polls",
        status.watermark, status.streams, status.polls
    );
    feed.teardown();
}
