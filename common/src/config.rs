use std::time::Duration;

/// Parameters for one scan run.
///
/// `domain` carries the hostname plus an optional download path, e.g.
/// `speed.cloudflare.com/__down?bytes=100000000`. A leading scheme is
/// tolerated and stripped wherever the bare host is needed.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// Target hostname, optionally followed by a download path.
    pub domain: String,
    /// Number of concurrent probe workers.
    pub workers: usize,
    /// Probes slower than this are discarded.
    pub latency_ceiling_ms: u64,
    /// Desired number of candidates sampled per input block.
    pub sample_target: usize,
    /// Download results below this rate (Mbps) are discarded.
    pub min_speed_mbps: f64,
    /// Maximum number of final results.
    pub out_count: usize,
    /// Connect + handshake deadline for a single probe.
    pub probe_timeout: Duration,
    /// Overall duration of one download measurement.
    pub download_duration: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            domain: "speed.cloudflare.com/__down?bytes=100000000".to_string(),
            workers: 100,
            latency_ceiling_ms: 200,
            sample_target: 500,
            min_speed_mbps: 10.0,
            out_count: 100,
            probe_timeout: Duration::from_secs(2),
            download_duration: Duration::from_secs(5),
        }
    }
}

impl ScanConfig {
    /// Bare hostname, used as SNI and as the pinned-resolution key.
    pub fn sni_host(&self) -> &str {
        strip_scheme(&self.domain)
            .split('/')
            .next()
            .unwrap_or_default()
    }

    /// Full download URL, always with an explicit https scheme.
    pub fn download_url(&self) -> String {
        format!("https://{}", strip_scheme(&self.domain))
    }
}

fn strip_scheme(domain: &str) -> &str {
    domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain)
}
