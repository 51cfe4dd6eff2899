//! Closing near-minimal gaps so consecutive blocks chain cleanly

use tracing::debug;

use super::StageOutcome;
use crate::config::OptimizeConfig;
use crate::types::Block;

const CHAIN_MIN_FRAMES: f64 = 3.0;
const CHAIN_MAX_FRAMES: f64 = 11.0;

/// Gaps between 3 and 11 frames become exactly `min_gap_ms` by moving the
/// earlier block's end.
pub fn chain(mut blocks: Vec<Block>, config: &OptimizeConfig) -> StageOutcome {
    let frame_ms = config.frame_ms();
    let shortest = (CHAIN_MIN_FRAMES * frame_ms) as i64;
    let longest = (CHAIN_MAX_FRAMES * frame_ms) as i64;
    let mut changed = 0;

    for i in 1..blocks.len() {
        let next_start = blocks[i].start_ms;
        let gap = next_start - blocks[i - 1].end_ms;
        if gap > config.min_gap_ms && (shortest..=longest).contains(&gap) {
            blocks[i - 1].end_ms = next_start - config.min_gap_ms;
            changed += 1;
        }
    }

    debug!(changed, shortest, longest, "chained gaps");
    StageOutcome::new(blocks, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_gaps_within_frame_window() {
        // 24 fps: 125..=458 ms
        let blocks = vec![
            Block::new(1, 0, 1000, "a"),
            Block::new(2, 1300, 2000, "b"),
            Block::new(3, 2124, 3000, "c"),
            Block::new(4, 3459, 4000, "d"),
        ];
        let outcome = chain(blocks, &OptimizeConfig::default());
        assert_eq!(outcome.changed, 1);
        assert_eq!(outcome.blocks[0].end_ms, 1220);
        assert_eq!(outcome.blocks[1].end_ms, 2000);
        assert_eq!(outcome.blocks[2].end_ms, 3000);
    }

    #[test]
    fn window_follows_frame_rate() {
        let config = OptimizeConfig {
            fps: 25,
            ..OptimizeConfig::default()
        };
        // 25 fps: 120..=440 ms
        let blocks = vec![Block::new(1, 0, 1000, "a"), Block::new(2, 1120, 2000, "b")];
        let outcome = chain(blocks, &config);
        assert_eq!(outcome.blocks[0].end_ms, 1040);
    }

    #[test]
    fn gap_at_minimum_is_untouched() {
        let config = OptimizeConfig {
            min_gap_ms: 200,
            ..OptimizeConfig::default()
        };
        let blocks = vec![Block::new(1, 0, 1000, "a"), Block::new(2, 1200, 2000, "b")];
        let outcome = chain(blocks.clone(), &config);
        assert_eq!(outcome.changed, 0);
        assert_eq!(outcome.blocks, blocks);
    }
}
