use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Url;
use tracing::{debug, warn};

const PING_PROBES: u32 = 3;
const FULL_STREAMS: usize = 4;
const DOWNLOAD_BYTES_PER_STREAM: u64 = 10_000_000;
const UPLOAD_BYTES_PER_STREAM: usize = 4_000_000;

/// Result of one full measurement run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub ping_ms: f64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

/// The measurement seam. The webhook layer only ever talks to this
/// trait, so tests and future engines can swap the implementation.
#[async_trait]
pub trait SpeedMeter: Send + Sync {
    /// Run a full measurement. `quick` trades accuracy for speed by
    /// using a single transfer stream instead of several.
    async fn measure(&self, quick: bool) -> Result<Measurement>;

    /// Select the best server and report its latency in milliseconds.
    async fn ping(&self) -> Result<f64>;
}

/// Speed measurement over plain HTTP against servers exposing
/// `GET /__down?bytes=N` and `POST /__up` endpoints.
pub struct HttpSpeedMeter {
    http: reqwest::Client,
    servers: Vec<Url>,
}

impl HttpSpeedMeter {
    /// Build a meter from candidate server base URLs.
    pub fn new(http: reqwest::Client, servers: &[String]) -> Result<Self> {
        if servers.is_empty() {
            bail!("At least one measurement server is required");
        }
        let servers = servers
            .iter()
            .map(|raw| {
                Url::parse(raw).with_context(|| format!("Invalid measurement server URL: {}", raw))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { http, servers })
    }

    /// Probe every candidate and return the fastest together with its
    /// average latency. Unreachable candidates are skipped.
    async fn best_server(&self) -> Result<(&Url, f64)> {
        let mut best: Option<(&Url, f64)> = None;
        for server in &self.servers {
            match self.probe_latency(server).await {
                Ok(latency_ms) => {
                    debug!("{}: {:.2} ms", server, latency_ms);
                    if best.map_or(true, |(_, fastest)| latency_ms < fastest) {
                        best = Some((server, latency_ms));
                    }
                }
                Err(e) => warn!("Skipping measurement server {}: {:#}", server, e),
            }
        }
        best.context("No measurement server reachable")
    }

    async fn probe_latency(&self, server: &Url) -> Result<f64> {
        let mut total_ms = 0.0;
        for _ in 0..PING_PROBES {
            let started = Instant::now();
            self.http
                .get(endpoint(server, "__down")?)
                .query(&[("bytes", 0u64)])
                .send()
                .await
                .context("Latency probe failed")?
                .error_for_status()
                .context("Latency probe rejected")?;
            total_ms += started.elapsed().as_secs_f64() * 1000.0;
        }
        Ok(total_ms / f64::from(PING_PROBES))
    }

    /// Timed parallel download; returns megabits per second.
    async fn download(&self, server: &Url, streams: usize) -> Result<f64> {
        let url = endpoint(server, "__down")?;
        let started = Instant::now();
        let transfers = (0..streams).map(|_| {
            let url = url.clone();
            async move {
                let response = self
                    .http
                    .get(url)
                    .query(&[("bytes", DOWNLOAD_BYTES_PER_STREAM)])
                    .send()
                    .await
                    .context("Download stream failed")?
                    .error_for_status()
                    .context("Download stream rejected")?;
                drain(response).await
            }
        });
        let received = try_join_all(transfers).await?;
        Ok(throughput_mbps(received.iter().sum(), started.elapsed()))
    }

    /// Timed parallel upload; returns megabits per second.
    async fn upload(&self, server: &Url, streams: usize) -> Result<f64> {
        let url = endpoint(server, "__up")?;
        let started = Instant::now();
        let transfers = (0..streams).map(|_| {
            let url = url.clone();
            async move {
                self.http
                    .post(url)
                    .body(vec![0u8; UPLOAD_BYTES_PER_STREAM])
                    .send()
                    .await
                    .context("Upload stream failed")?
                    .error_for_status()
                    .context("Upload stream rejected")?;
                Ok::<u64, anyhow::Error>(UPLOAD_BYTES_PER_STREAM as u64)
            }
        });
        let sent = try_join_all(transfers).await?;
        Ok(throughput_mbps(sent.iter().sum(), started.elapsed()))
    }
}

#[async_trait]
impl SpeedMeter for HttpSpeedMeter {
    async fn measure(&self, quick: bool) -> Result<Measurement> {
        let streams = if quick { 1 } else { FULL_STREAMS };
        let (server, ping_ms) = self.best_server().await?;
        let download_mbps = self.download(server, streams).await?;
        let upload_mbps = self.upload(server, streams).await?;
        Ok(Measurement {
            ping_ms,
            download_mbps,
            upload_mbps,
        })
    }

    async fn ping(&self) -> Result<f64> {
        let (_, ping_ms) = self.best_server().await?;
        Ok(ping_ms)
    }
}

fn endpoint(server: &Url, segment: &str) -> Result<Url> {
    server
        .join(segment)
        .with_context(|| format!("Invalid endpoint {} on {}", segment, server))
}

/// Read a response body to completion, returning the byte count.
async fn drain(mut response: reqwest::Response) -> Result<u64> {
    let mut received = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .context("Download stream interrupted")?
    {
        received += chunk.len() as u64;
    }
    Ok(received)
}

/// Bits transferred over wall time, in megabits per second.
fn throughput_mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    (bytes as f64 * 8.0) / secs / 1_000_000.0
}
