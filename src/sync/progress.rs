use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_LEN: usize = 10;

/// Format a progress line: `[====>------] [ 2/18] Message`.
pub fn progress_msg(index: usize, count: usize, msg: &str) -> String {
    let done = if count == 0 {
        0
    } else {
        (index.min(count) * BAR_LEN) / count
    };
    let bar = format!("{}>{}", "=".repeat(done), "-".repeat(BAR_LEN - done));
    let width = count.to_string().len();
    format!("[{}] [{:>width$}/{}] {}", bar, index, count, msg, width = width)
}

/// Spinner used by the CLI while uploading.
pub fn upload_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_msg_padding() {
        assert_eq!(
            progress_msg(2, 18, "Uploading a.txt"),
            "[=>---------] [ 2/18] Uploading a.txt"
        );
    }

    #[test]
    fn test_progress_msg_bounds() {
        assert_eq!(progress_msg(0, 5, "start"), "[>----------] [0/5] start");
        assert_eq!(progress_msg(5, 5, "done"), "[==========>] [5/5] done");
        assert_eq!(progress_msg(0, 0, "none"), "[>----------] [0/0] none");
    }

    #[test]
    fn test_progress_msg_floor() {
        // 9/10 of the way is nine segments, never rounded up
        assert_eq!(progress_msg(99, 110, "x"), "[=========>-] [ 99/110] x");
    }
}
