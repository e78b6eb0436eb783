use colored::*;
use edgescan_common::network::outcome::SpeedResult;

pub const TOTAL_WIDTH: usize = 64;

pub fn header(msg: &str) {
    let formatted = format!("⟦ {} ⟧", msg);
    let msg_len = formatted.chars().count();

    let dash_count = TOTAL_WIDTH.saturating_sub(msg_len);
    let left = dash_count / 2;
    let right = dash_count - left;

    println!(
        "{}{}{}",
        "─".repeat(left).bright_black(),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right).bright_black(),
    );
}

/// Final ranking, fastest first.
pub fn results_table(results: &[SpeedResult]) {
    for (idx, result) in results.iter().enumerate() {
        let rank = format!("{:>3}.", idx + 1).bright_black();
        let addr = format!("[{}]", result.addr).cyan().bold();
        let latency = result.latency_label().yellow();
        let speed = format!("{:.2} Mbps", result.mbps).green().bold();
        println!("{rank} {addr} {latency} {speed}");
    }
}

pub fn best_pick(results: &[SpeedResult]) {
    if let Some(best) = results.first() {
        let line = format!(
            "best endpoint: [{}] at {:.2} Mbps ({})",
            best.addr,
            best.mbps,
            best.latency_label()
        );
        println!("{}", line.bold());
    }
}
