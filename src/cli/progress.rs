//! CLI-specific progress handling for distance-matrix
//!
//! Provides the pair-count progress bar for the command-line interface.

use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {human_pos}/{human_len} pairs ({percent}%) {per_sec} ETA: {eta}";

/// Creates a progress bar counting computed pairs.
///
/// The length starts unknown and is set by the first progress report that
/// carries a total.
pub fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    match ProgressStyle::default_bar().template(BAR_TEMPLATE) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => log::warn!("Falling back to the default progress style: {e}"),
    }
    pb
}

/// Progress manager for a distance-matrix run
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(message: &str) -> Self {
        let pb = create_progress_bar();

        // Print initial message to stderr
        eprintln!("{}", message);

        Self { pb }
    }
}
