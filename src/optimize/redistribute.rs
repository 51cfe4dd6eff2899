//! Giving fast blocks more time: free silence first, then time borrowed
//! from slower neighbors, then large gaps further along the track.

use tracing::debug;

use super::normalize::repair_gaps;
use super::StageOutcome;
use crate::config::{OptimizeConfig, Tunables};
use crate::types::Block;

/// How far the last block may grow past its current end
const TAIL_ROOM_MS: i64 = 60_000;
const CASCADE_PASSES: usize = 5;
const GAP_PASSES: usize = 3;

/// Extra milliseconds a block needs to read at `target_cps`, if any
fn shortfall(block: &Block, config: &OptimizeConfig) -> Option<i64> {
    if block.cps() <= config.target_cps {
        return None;
    }
    let missing = block.reading_time_ms(config.target_cps) - block.duration_ms();
    (missing > 0).then_some(missing)
}

/// Grow over-target blocks into the silence around them: end first, then
/// start. Returns the number of blocks that actually moved.
pub fn extend(mut blocks: Vec<Block>, config: &OptimizeConfig) -> StageOutcome {
    let gap = config.min_gap_ms;
    let mut changed = 0;

    for i in 0..blocks.len() {
        let Some(mut missing) = shortfall(&blocks[i], config) else {
            continue;
        };

        let max_end = match blocks.get(i + 1) {
            Some(next) => next.start_ms - gap,
            None => blocks[i].end_ms + TAIL_ROOM_MS,
        };
        let min_start = match i.checked_sub(1) {
            Some(prev) => blocks[prev].end_ms + gap,
            None => 0,
        };

        let block = &mut blocks[i];
        let before = (block.start_ms, block.end_ms);

        let room_after = max_end - block.end_ms;
        if room_after > 0 {
            let grow = missing.min(room_after);
            block.end_ms += grow;
            missing -= grow;
        }

        let room_before = block.start_ms - min_start;
        if missing > 0 && room_before > 0 {
            block.start_ms -= missing.min(room_before);
        }

        if (block.start_ms, block.end_ms) != before {
            changed += 1;
        }
    }

    debug!(changed, "extended blocks");
    StageOutcome::new(blocks, changed)
}

/// Time a block can give away and still read at target speed with a
/// minimum gap to spare
fn donor_slack(block: &Block, config: &OptimizeConfig) -> i64 {
    if block.cps() >= config.target_cps {
        return 0;
    }
    let keep = block
        .reading_time_ms(config.target_cps)
        .max(config.min_duration_ms);
    (block.duration_ms() - keep - config.min_gap_ms).max(0)
}

fn shift_range(blocks: &mut [Block], range: std::ops::Range<usize>, delta_ms: i64) {
    for block in &mut blocks[range] {
        block.shift(delta_ms);
    }
}

/// Borrow time for over-target blocks from slower blocks up to
/// `cascade_radius` positions away. Everything between donor and target
/// slides toward the donor, so gaps between them keep their width.
pub fn cascade(blocks: Vec<Block>, config: &OptimizeConfig, tunables: &Tunables) -> StageOutcome {
    let mut outcome = StageOutcome::new(blocks, 0);

    for _ in 0..CASCADE_PASSES {
        let mut blocks = std::mem::take(&mut outcome.blocks);
        let mut donations = 0;

        for i in 0..blocks.len() {
            let Some(mut missing) = shortfall(&blocks[i], config) else {
                continue;
            };

            for dist in 1..=tunables.cascade_radius.min(i) {
                if missing <= 0 {
                    break;
                }
                let donor = i - dist;
                let give = missing.min(donor_slack(&blocks[donor], config));
                if give <= tunables.noise_floor_ms {
                    continue;
                }
                blocks[donor].end_ms -= give;
                shift_range(&mut blocks, donor + 1..i, -give);
                blocks[i].start_ms -= give;
                missing -= give;
                donations += 1;
            }

            let forward_reach = tunables.cascade_radius.min(blocks.len() - 1 - i);
            for dist in 1..=forward_reach {
                if missing <= 0 {
                    break;
                }
                let donor = i + dist;
                let give = missing.min(donor_slack(&blocks[donor], config));
                if give <= tunables.noise_floor_ms {
                    continue;
                }
                blocks[donor].start_ms += give;
                shift_range(&mut blocks, i + 1..donor, give);
                blocks[i].end_ms += give;
                missing -= give;
                donations += 1;
            }
        }

        outcome.changed += donations;
        outcome.absorb(repair_gaps(blocks, config));
        if donations == 0 {
            break;
        }
    }

    debug!(changed = outcome.changed, "cascade redistribution");
    outcome
}

/// Slide the chain between an over-target block and a wide gap into that
/// gap, handing the freed time to the block.
pub fn absorb_gaps(blocks: Vec<Block>, config: &OptimizeConfig, tunables: &Tunables) -> StageOutcome {
    let gap = config.min_gap_ms;
    let mut outcome = StageOutcome::new(blocks, 0);

    for _ in 0..GAP_PASSES {
        let mut blocks = std::mem::take(&mut outcome.blocks);
        let mut absorbed = 0;

        for i in 0..blocks.len() {
            let Some(mut missing) = shortfall(&blocks[i], config) else {
                continue;
            };

            let forward_reach = tunables.gap_search_radius.min(blocks.len() - 1 - i);
            for dist in 1..=forward_reach {
                if missing <= 0 {
                    break;
                }
                let j = i + dist;
                let silence = blocks[j].start_ms - blocks[j - 1].end_ms;
                if silence <= tunables.large_gap_ms {
                    continue;
                }
                let give = missing.min(silence - gap);
                if give <= tunables.noise_floor_ms {
                    continue;
                }
                shift_range(&mut blocks, i + 1..j, give);
                blocks[i].end_ms += give;
                missing -= give;
                absorbed += 1;
            }

            for dist in 1..=tunables.gap_search_radius.min(i) {
                if missing <= 0 {
                    break;
                }
                let j = i - dist;
                let silence = blocks[j + 1].start_ms - blocks[j].end_ms;
                if silence <= tunables.large_gap_ms {
                    continue;
                }
                let give = missing.min(silence - gap);
                if give <= tunables.noise_floor_ms {
                    continue;
                }
                shift_range(&mut blocks, j + 1..i, -give);
                blocks[i].start_ms -= give;
                missing -= give;
                absorbed += 1;
            }
        }

        outcome.changed += absorbed;
        outcome.absorb(repair_gaps(blocks, config));
        if absorbed == 0 {
            break;
        }
    }

    debug!(changed = outcome.changed, "gap absorption");
    outcome
}
