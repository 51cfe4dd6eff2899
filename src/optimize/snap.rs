//! Moving split times onto pauses in the speech

use crate::config::Tunables;
use crate::types::{SpeechInterval, SpeechTimings};

/// Nudge `target_ms` to the middle of the best nearby silence inside
/// `[start_ms, end_ms]`.
///
/// Segment gaps are tried first, then word gaps; a candidate scores
/// `distance - weight * gap` and the lowest score wins. Without speech data
/// the target is returned unchanged.
pub fn snap_to_speech_gap(
    target_ms: i64,
    start_ms: i64,
    end_ms: i64,
    speech: &SpeechTimings,
    tunables: &Tunables,
) -> i64 {
    let mut best = (target_ms, f64::INFINITY);

    let passes = [
        (&speech.segments, tunables.segment_gap_min_ms, 0.5),
        (&speech.words, tunables.word_gap_min_ms, 0.2),
    ];
    for (intervals, min_gap, weight) in passes {
        let clipped = clip_sorted(intervals, start_ms, end_ms);
        for pair in clipped.windows(2) {
            let gap_start = pair[0].end_ms;
            let gap_end = pair[1].start_ms;
            let gap = gap_end - gap_start;
            if gap <= min_gap {
                continue;
            }
            let gap_mid = (gap_start + gap_end) / 2;
            let distance = (gap_mid - target_ms).abs();
            if distance >= tunables.snap_window_ms {
                continue;
            }
            let score = distance as f64 - gap as f64 * weight;
            if score < best.1 {
                best = (gap_mid, score);
            }
        }
    }

    best.0
}

/// Intervals overlapping the window, clipped to it and sorted
fn clip_sorted(intervals: &[SpeechInterval], start_ms: i64, end_ms: i64) -> Vec<SpeechInterval> {
    let mut clipped: Vec<SpeechInterval> = intervals
        .iter()
        .filter(|s| s.start_ms < end_ms && s.end_ms > start_ms)
        .map(|s| SpeechInterval::new(s.start_ms.max(start_ms), s.end_ms.min(end_ms)))
        .collect();
    clipped.sort_by_key(|s| (s.start_ms, s.end_ms));
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timings(segments: &[(i64, i64)], words: &[(i64, i64)]) -> SpeechTimings {
        SpeechTimings {
            segments: segments
                .iter()
                .map(|&(s, e)| SpeechInterval::new(s, e))
                .collect(),
            words: words.iter().map(|&(s, e)| SpeechInterval::new(s, e)).collect(),
        }
    }

    #[test]
    fn no_speech_keeps_target() {
        let speech = SpeechTimings::default();
        assert_eq!(
            snap_to_speech_gap(5000, 0, 10_000, &speech, &Tunables::default()),
            5000
        );
    }

    #[test]
    fn snaps_to_segment_gap_midpoint() {
        let speech = timings(&[(0, 4000), (4600, 10_000)], &[]);
        assert_eq!(
            snap_to_speech_gap(5000, 0, 10_000, &speech, &Tunables::default()),
            4300
        );
    }

    #[test]
    fn ignores_gaps_outside_window() {
        let speech = timings(&[(0, 1000), (1500, 10_000)], &[]);
        assert_eq!(
            snap_to_speech_gap(7000, 0, 10_000, &speech, &Tunables::default()),
            7000
        );
    }

    #[test]
    fn wide_word_gap_can_beat_narrow_segment_gap() {
        // segment gap 4000..4150 scores 925 - 75 = 850, word gap 5100..5900 scores 500 - 160 = 340
        let speech = timings(&[(0, 4000), (4150, 10_000)], &[(4200, 5100), (5900, 7000)]);
        assert_eq!(
            snap_to_speech_gap(5000, 0, 10_000, &speech, &Tunables::default()),
            5500
        );
    }
}
