//! Console progress reporting for per-split passes.

use crate::common::*;
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{prefix:>5} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

/// Create a bar that counts the samples of one split.
pub fn split_progress(len: usize, split: &str, task: &str) -> Result<ProgressBar> {
    let style = ProgressStyle::default_bar()
        .template(TEMPLATE)?
        .progress_chars("#>-");
    let pb = ProgressBar::new(len as u64).with_style(style);
    pb.set_prefix(split.to_string());
    pb.set_message(task.to_string());
    Ok(pb)
}
