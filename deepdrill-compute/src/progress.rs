//! Progress reporting for the long-running phases.

use indicatif::{ProgressBar, ProgressStyle};

/// A bar for a drill phase. Rendering is skipped automatically when stdout
/// is not a terminal; updates are thread-safe.
pub fn phase(label: &str, len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{msg:>28}: [{bar:33}] {pos}/{len} ({elapsed})")
            .expect("static template")
            .progress_chars("=> "),
    );
    bar.set_message(label.to_string());
    bar
}
