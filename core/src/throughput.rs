//! Second-phase deep test: a bounded-duration HTTPS download through one
//! specific candidate address.
//!
//! The client is forced to dial the candidate for every connection while the
//! request still presents the real hostname (SNI and Host header), so any
//! edge node can be measured against any virtual host. The throughput clock
//! starts at the first received byte; handshake and time-to-first-byte never
//! count against the rate.

use std::cmp;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

const DOWNLOAD_PORT: u16 = 443;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A candidate that accepts the connection but then stalls is cut off once
/// no byte has arrived within this grace period.
const FIRST_BYTE_GRACE: Duration = Duration::from_secs(2);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Error)]
pub enum SpeedTestError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Nothing usable arrived before the deadline: zero bytes, or a
    /// non-positive measurement window.
    #[error("no usable data received before the deadline")]
    InsufficientData,
}

/// Sequential download tester; `measure` is called once per shortlisted
/// candidate.
pub struct SpeedTester {
    host: String,
    url: String,
    duration: Duration,
    port: u16,
}

impl SpeedTester {
    /// `host` must be the cleaned hostname (no scheme, no path); `url` is
    /// the full download URL including the path.
    pub fn new(host: &str, url: &str, duration: Duration) -> Self {
        Self {
            host: host.to_string(),
            url: url.to_string(),
            duration,
            port: DOWNLOAD_PORT,
        }
    }

    /// Overrides the HTTPS port. The download URL must carry the same port
    /// explicitly, since an override in the resolved address alone does not
    /// reach servers off the conventional port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Downloads from `addr` for at most the configured duration and returns
    /// the measured rate in Mbps.
    pub async fn measure(&self, addr: IpAddr) -> Result<f64, SpeedTestError> {
        let client = reqwest::Client::builder()
            .resolve(&self.host, SocketAddr::new(addr, self.port))
            .danger_accept_invalid_certs(true)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        let deadline = Instant::now() + self.duration;

        let request = client.get(&self.url).header(reqwest::header::ACCEPT, ACCEPT);
        let mut response = match timeout_at(deadline, request.send()).await {
            Ok(response) => response?,
            // The whole budget went by without a response; nothing was read.
            Err(_) => return Err(SpeedTestError::InsufficientData),
        };

        let mut bytes: u64 = 0;
        let mut clock: Option<Instant> = None;

        loop {
            // Until the first byte shows up the wait is additionally capped
            // by the watchdog grace period.
            let limit = match clock {
                Some(_) => deadline,
                None => cmp::min(deadline, Instant::now() + FIRST_BYTE_GRACE),
            };

            match timeout_at(limit, response.chunk()).await {
                Ok(Ok(Some(chunk))) => {
                    if clock.is_none() {
                        clock = Some(Instant::now());
                    }
                    bytes += chunk.len() as u64;
                }
                // End of stream: the server sent everything it had.
                Ok(Ok(None)) => break,
                Ok(Err(err)) => return Err(err.into()),
                // Deadline or first-byte watchdog; expected, not an error.
                Err(_) => {
                    if clock.is_none() {
                        debug!(%addr, "no first byte within {FIRST_BYTE_GRACE:?}, aborting read");
                    }
                    break;
                }
            }
        }

        let elapsed = clock.map(|started| started.elapsed().as_secs_f64());
        throughput_mbps(bytes, elapsed).ok_or(SpeedTestError::InsufficientData)
    }
}

/// `bytes * 8 / 1_048_576 / seconds`, or `None` when there is nothing to
/// measure.
fn throughput_mbps(bytes: u64, elapsed_secs: Option<f64>) -> Option<f64> {
    let elapsed = elapsed_secs?;
    if bytes == 0 || elapsed <= 0.0 {
        return None;
    }
    Some(bytes as f64 * 8.0 / 1_048_576.0 / elapsed)
}
