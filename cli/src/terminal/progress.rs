use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Bar for the probe phase, driven by the pool's completion counter.
pub fn probe_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template("{spinner:.blue} {msg} [{bar:20.green}] {pos}/{len}")
        .unwrap()
        .progress_chars("=> ");

    bar.set_style(style);
    bar.set_message("probing candidates");
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
