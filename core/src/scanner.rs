//! The two-phase scan pipeline.
//!
//! Phase one fans all candidates out over a fixed-size worker pool that runs
//! the latency probe; successes are ranked by latency and the best `2 × N`
//! go onto the shortlist. Phase two walks the shortlist strictly one at a
//! time (parallel downloads would corrupt each other's bandwidth numbers)
//! and keeps the first `N` candidates above the minimum speed.
//!
//! Probing and testing are generic over the closure that does the actual
//! network work, so the pool mechanics and the stop-early selection can be
//! exercised without opening a single socket.

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use edgescan_common::config::ScanConfig;
use edgescan_common::network::outcome::{ProbeResult, SpeedResult};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::probe::LatencyProber;
use crate::throughput::{SpeedTestError, SpeedTester};

/// Depth of the job queue and of the success channel.
const QUEUE_DEPTH: usize = 200;

/// Called with the running total after every finished probe, success or not.
pub type ProgressFn = Box<dyn Fn(usize) + Send + Sync>;

/// Runs the full pipeline and returns the final, throughput-sorted results.
///
/// `groups` holds one address list per input token; they are probed as one
/// flat batch and ranked globally.
pub async fn perform_scan(
    groups: Vec<Vec<IpAddr>>,
    cfg: &ScanConfig,
    on_probe_done: Option<ProgressFn>,
) -> anyhow::Result<Vec<SpeedResult>> {
    let candidates: Vec<IpAddr> = groups.into_iter().flatten().collect();
    info!("probing {} candidates", candidates.len());

    let prober = Arc::new(LatencyProber::new(
        cfg.sni_host(),
        cfg.probe_timeout,
        cfg.latency_ceiling_ms,
    )?);
    let probe = move |addr: IpAddr| {
        let prober = Arc::clone(&prober);
        async move { prober.probe(addr).await }
    };

    let outcomes = run_probe_pool(candidates, cfg.workers, probe, on_probe_done).await;
    let ranked = rank_by_latency(outcomes);
    let shortlist = shortlist(&ranked, cfg.out_count);
    info!(
        "{} candidates responded, deep testing the best {}",
        ranked.len(),
        shortlist.len()
    );

    let tester = SpeedTester::new(cfg.sni_host(), &cfg.download_url(), cfg.download_duration);
    let fastest = deep_test(shortlist, cfg.out_count, cfg.min_speed_mbps, |addr| {
        tester.measure(addr)
    })
    .await;

    Ok(fastest)
}

/// Drains `candidates` through `workers` concurrent probe tasks.
///
/// One bounded queue feeds the workers; a second bounded channel carries
/// only successful probes back to the single collector. Every dequeued job
/// bumps the shared completion counter exactly once. The pool is done when
/// the feeder has closed the queue, every worker has exited, and the result
/// channel has been drained, so no outcome can be lost.
pub async fn run_probe_pool<F, Fut>(
    candidates: Vec<IpAddr>,
    workers: usize,
    probe: F,
    on_probe_done: Option<ProgressFn>,
) -> Vec<ProbeResult>
where
    F: Fn(IpAddr) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Option<ProbeResult>> + Send + 'static,
{
    let (job_tx, job_rx) = mpsc::channel::<IpAddr>(QUEUE_DEPTH);
    let (result_tx, mut result_rx) = mpsc::channel::<ProbeResult>(QUEUE_DEPTH);
    let job_rx = Arc::new(Mutex::new(job_rx));
    let completed = Arc::new(AtomicUsize::new(0));
    let on_probe_done: Option<Arc<dyn Fn(usize) + Send + Sync>> = on_probe_done.map(Arc::from);

    let mut pool = JoinSet::new();
    for _ in 0..workers.max(1) {
        let jobs = Arc::clone(&job_rx);
        let results = result_tx.clone();
        let probe = probe.clone();
        let completed = Arc::clone(&completed);
        let notify = on_probe_done.clone();

        pool.spawn(async move {
            loop {
                // The guard is dropped before the probe runs, so a slow
                // handshake never blocks the other workers' dequeues.
                let job = { jobs.lock().await.recv().await };
                let Some(addr) = job else { break };

                if let Some(outcome) = probe(addr).await {
                    if results.send(outcome).await.is_err() {
                        break;
                    }
                }

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(callback) = &notify {
                    callback(done);
                }
            }
        });
    }
    drop(result_tx);

    let feeder = tokio::spawn(async move {
        for addr in candidates {
            if job_tx.send(addr).await.is_err() {
                break;
            }
        }
        // job_tx drops here, closing the queue behind the last candidate.
    });

    let mut outcomes = Vec::new();
    while let Some(outcome) = result_rx.recv().await {
        outcomes.push(outcome);
    }

    let _ = feeder.await;
    while pool.join_next().await.is_some() {}
    outcomes
}

/// Ascending latency order; the sort is stable, so equal latencies keep
/// their arrival order.
pub fn rank_by_latency(mut outcomes: Vec<ProbeResult>) -> Vec<ProbeResult> {
    outcomes.sort_by_key(|outcome| outcome.latency_ms);
    outcomes
}

/// The top `min(2 × out_count, available)` of the ranking. The 2×
/// oversampling covers attrition during the download phase.
pub fn shortlist(ranked: &[ProbeResult], out_count: usize) -> &[ProbeResult] {
    &ranked[..ranked.len().min(out_count * 2)]
}

/// Walks the shortlist in latency order, measuring one candidate at a time.
///
/// Tester errors and sub-minimum rates drop the candidate; the walk stops as
/// soon as `out_count` results are accepted, even if part of the shortlist
/// is still untested. Accepted results come back sorted fastest-first.
pub async fn deep_test<F, Fut>(
    shortlist: &[ProbeResult],
    out_count: usize,
    min_speed_mbps: f64,
    mut tester: F,
) -> Vec<SpeedResult>
where
    F: FnMut(IpAddr) -> Fut,
    Fut: Future<Output = Result<f64, SpeedTestError>>,
{
    let mut accepted: Vec<SpeedResult> = Vec::new();

    for candidate in shortlist {
        match tester(candidate.addr).await {
            Err(err) => {
                warn!("[{}] download test failed: {err}", candidate.addr);
                continue;
            }
            Ok(mbps) if mbps < min_speed_mbps => {
                info!("[{}] too slow: {mbps:.2} Mbps", candidate.addr);
                continue;
            }
            Ok(mbps) => {
                info!("[{}] {mbps:.2} Mbps", candidate.addr);
                accepted.push(SpeedResult {
                    addr: candidate.addr,
                    latency_ms: candidate.latency_ms,
                    mbps,
                    created_at: chrono::Local::now(),
                });
            }
        }

        if accepted.len() == out_count {
            break;
        }
    }

    accepted.sort_by(|a, b| b.mbps.total_cmp(&a.mbps));
    accepted
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
