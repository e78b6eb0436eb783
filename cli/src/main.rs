mod commands;
mod input;
mod output;
mod terminal;

use std::net::IpAddr;
use std::path::Path;

use commands::CommandLine;
use edgescan_common::network::{expand, sample};
use edgescan_core::scanner::{self, ProgressFn};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CommandLine::parse_args();
    terminal::logging::init();

    let cfg = args.scan_config();
    let groups = build_groups(&args.file, cfg.sample_target)?;
    let total: usize = groups.iter().map(Vec::len).sum();
    if total == 0 {
        warn!("no candidates to probe, nothing to do");
        return Ok(());
    }

    terminal::print::header("probing candidates");
    let bar = terminal::progress::probe_bar(total);
    let ticker = bar.clone();
    // Workers report completions out of order, so advance by one per report
    // instead of seeking to the delivered total.
    let on_probe_done: ProgressFn = Box::new(move |_done| ticker.inc(1));

    let results = scanner::perform_scan(groups, &cfg, Some(on_probe_done)).await?;
    bar.finish_and_clear();

    terminal::print::header("results");
    if results.is_empty() {
        // Existing output files are left alone so a bad run cannot wipe a
        // good one.
        warn!("no endpoint met the thresholds this run");
        return Ok(());
    }

    terminal::print::results_table(&results);
    terminal::print::best_pick(&results);

    let csv_path = format!("{}.csv", args.out);
    let json_path = format!("{}.json", args.out);
    output::write_csv(Path::new(&csv_path), &results)?;
    output::write_json(Path::new(&json_path), &results)?;
    info!("results saved to {csv_path} and {json_path}");

    if args.append {
        let added = output::append_pool(&args.pool_file, &results)?;
        info!("{added} new addresses merged into {}", args.pool_file.display());
    }

    Ok(())
}

/// Expands the input file into per-token candidate groups.
///
/// A JSON address list is probed as-is in a single group. Text tokens are
/// expanded and sampled one by one; tokens that fail to parse are skipped,
/// never fatal.
fn build_groups(file: &Path, sample_target: usize) -> anyhow::Result<Vec<Vec<IpAddr>>> {
    let mut rng = rand::rng();

    match input::read_input(file)? {
        input::Input::Literals(addrs) => {
            info!("{} pre-expanded addresses loaded, sampling skipped", addrs.len());
            Ok(vec![addrs])
        }
        input::Input::Tokens(tokens) => {
            let mut groups = Vec::new();
            for token in tokens {
                match expand::expand_token(&token, &mut rng) {
                    Ok(addrs) => {
                        let sampled = sample::stride_sample(&addrs, sample_target, &mut rng);
                        info!("[{token}] {} candidates sampled", sampled.len());
                        groups.push(sampled);
                    }
                    Err(err) => warn!("skipping '{token}': {err}"),
                }
            }
            Ok(groups)
        }
    }
}
