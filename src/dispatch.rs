use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::webhook::AppState;

const START_NOTICE: &str = "🚀 Running speed test... this may take a while.";

/// Launch a speed-test task for `to`, detached from the calling request.
/// The task reports its outcome (or failure) back over chat on its own;
/// nothing in the webhook path awaits the returned handle.
pub fn spawn(state: AppState, to: String, quick: bool) -> JoinHandle<()> {
    tokio::spawn(run(state, to, quick))
}

async fn run(state: AppState, to: String, quick: bool) {
    info!("Speed test for {} started (quick: {})", to, quick);

    if let Err(e) = state.wa.send_text(&to, START_NOTICE).await {
        warn!("Failed to send start notice to {}: {:#}", to, e);
    }

    match state.meter.measure(quick).await {
        Ok(m) => {
            let report = format!(
                "✅ Speedtest Complete!\n\n\
                 Ping: {:.2} ms\n\
                 Download: {:.2} Mbps\n\
                 Upload: {:.2} Mbps",
                m.ping_ms, m.download_mbps, m.upload_mbps
            );
            if let Err(e) = state.wa.send_text(&to, &report).await {
                warn!("Failed to send speed test report to {}: {:#}", to, e);
            }
        }
        Err(e) => {
            warn!("Speed test for {} failed: {:#}", to, e);
            let notice = format!("⚠️ Speedtest failed: {:#}", e);
            if let Err(send_err) = state.wa.send_text(&to, &notice).await {
                warn!("Failed to send failure notice to {}: {:#}", to, send_err);
            }
        }
    }
}
