use std::path::PathBuf;

use clap::Parser;
use edgescan_common::config::ScanConfig;

#[derive(Parser)]
#[command(name = "edgescan")]
#[command(version)]
#[command(about = "Finds the fastest edge endpoints reachable behind a hostname.")]
pub struct CommandLine {
    /// Hostname (plus optional download path) used for SNI and speed tests
    #[arg(
        short,
        long,
        default_value = "speed.cloudflare.com/__down?bytes=100000000"
    )]
    pub domain: String,

    /// Input file: CIDR blocks / IP literals per line, or a JSON address list
    #[arg(short, long, default_value = "ip.txt")]
    pub file: PathBuf,

    /// Output path prefix, written as <prefix>.csv and <prefix>.json
    #[arg(short, long, default_value = "result")]
    pub out: String,

    /// Concurrent probe workers
    #[arg(short = 'n', long, default_value_t = 100)]
    pub workers: usize,

    /// Highest acceptable probe latency in milliseconds
    #[arg(short, long, default_value_t = 200)]
    pub latency: u64,

    /// Lowest acceptable download speed in Mbps
    #[arg(short = 's', long, default_value_t = 10.0)]
    pub min_speed: f64,

    /// Number of final results to keep
    #[arg(long, default_value_t = 100)]
    pub out_count: usize,

    /// Candidates to sample from each input block
    #[arg(long, default_value_t = 500)]
    pub test_count: usize,

    /// Merge the result addresses into the pool file as well
    #[arg(short, long)]
    pub append: bool,

    /// Pool file used by --append
    #[arg(short = 'p', long, default_value = "./okresult.json")]
    pub pool_file: PathBuf,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            domain: self.domain.clone(),
            workers: self.workers,
            latency_ceiling_ms: self.latency,
            sample_target: self.test_count,
            min_speed_mbps: self.min_speed,
            out_count: self.out_count,
            ..ScanConfig::default()
        }
    }
}
