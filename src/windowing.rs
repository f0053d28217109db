//! Windowing of a continuous audio timeline.
//!
//! Produces the deterministic slice plan that the map stage executes. The
//! arithmetic is pure; actually cutting the audio lives in [`crate::audio`].

/// One bounded time range of the source audio.
///
/// The range is half-open `[start_ms, end_ms)`. Consecutive windows overlap
/// by the configured overlap so that speech cut mid-sentence at a boundary is
/// fully contained in at least one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioWindow {
    /// Position of this window in the plan, starting at 0.
    pub index: usize,
    /// Start of the window in milliseconds.
    pub start_ms: u64,
    /// End of the window in milliseconds (exclusive, clamped to the source
    /// duration).
    pub end_ms: u64,
}

impl AudioWindow {
    /// Length of the window in milliseconds.
    pub fn len_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Plan the windows covering `duration_ms` of audio.
///
/// Window `i` spans `[i * window_ms, min(i * window_ms + window_ms +
/// overlap_ms, duration_ms))`. A zero duration yields an empty plan rather
/// than an error. `window_ms` must be non-zero; [`crate::config::Settings`]
/// validation enforces this before a pipeline is built.
pub fn plan_windows(duration_ms: u64, window_ms: u64, overlap_ms: u64) -> Vec<AudioWindow> {
    debug_assert!(window_ms > 0, "window length must be non-zero");

    if duration_ms == 0 {
        return Vec::new();
    }

    let count = duration_ms.div_ceil(window_ms) as usize;
    let mut windows = Vec::with_capacity(count);

    for index in 0..count {
        let start_ms = index as u64 * window_ms;
        let end_ms = (start_ms + window_ms + overlap_ms).min(duration_ms);
        windows.push(AudioWindow {
            index,
            start_ms,
            end_ms,
        });
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_MIN: u64 = 5 * 60 * 1000;
    const TWENTY_SEC: u64 = 20 * 1000;

    #[test]
    fn test_zero_duration_yields_no_windows() {
        assert!(plan_windows(0, FIVE_MIN, TWENTY_SEC).is_empty());
    }

    #[test]
    fn test_short_audio_yields_single_window() {
        let windows = plan_windows(90_000, FIVE_MIN, TWENTY_SEC);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start_ms, 0);
        assert_eq!(windows[0].end_ms, 90_000);
    }

    #[test]
    fn test_twelve_minute_source() {
        // 12 minutes at 5-minute windows with 20s overlap: exactly 3 windows.
        let windows = plan_windows(720_000, FIVE_MIN, TWENTY_SEC);

        assert_eq!(windows.len(), 3);
        assert_eq!((windows[0].start_ms, windows[0].end_ms), (0, 320_000));
        assert_eq!((windows[1].start_ms, windows[1].end_ms), (300_000, 620_000));
        assert_eq!((windows[2].start_ms, windows[2].end_ms), (600_000, 720_000));
    }

    #[test]
    fn test_last_window_clamped_to_duration() {
        let windows = plan_windows(610_000, FIVE_MIN, TWENTY_SEC);

        assert_eq!(windows.len(), 3);
        let last = windows.last().unwrap();
        assert_eq!(last.end_ms, 610_000);
        assert!(last.len_ms() < FIVE_MIN + TWENTY_SEC);
    }

    #[test]
    fn test_starts_are_increasing_multiples_of_window_length() {
        let windows = plan_windows(3_605_000, FIVE_MIN, TWENTY_SEC);

        for (i, w) in windows.iter().enumerate() {
            assert_eq!(w.index, i);
            assert_eq!(w.start_ms, i as u64 * FIVE_MIN);
            assert!(w.start_ms < w.end_ms);
        }
        assert_eq!(windows.last().unwrap().end_ms, 3_605_000);
    }

    #[test]
    fn test_consecutive_windows_overlap_by_overlap_length() {
        let windows = plan_windows(1_800_000, FIVE_MIN, TWENTY_SEC);

        for pair in windows.windows(2) {
            let overlap = pair[0].end_ms.saturating_sub(pair[1].start_ms);
            let remaining = 1_800_000 - pair[1].start_ms;
            assert_eq!(overlap, TWENTY_SEC.min(remaining));
        }
    }

    #[test]
    fn test_exact_multiple_duration() {
        // Duration that lands exactly on a window boundary must not produce
        // an empty trailing window.
        let windows = plan_windows(FIVE_MIN * 4, FIVE_MIN, TWENTY_SEC);

        assert_eq!(windows.len(), 4);
        assert_eq!(windows[3].start_ms, FIVE_MIN * 3);
        assert_eq!(windows[3].end_ms, FIVE_MIN * 4);
    }

    #[test]
    fn test_no_overlap() {
        let windows = plan_windows(720_000, FIVE_MIN, 0);

        assert_eq!(windows.len(), 3);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end_ms, pair[1].start_ms);
        }
    }
}
