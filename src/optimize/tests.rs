use super::pipeline::{enforce_min_duration, trim_oversized_sparse};
use super::Optimizer;
use crate::config::{OptimizeConfig, Tunables};
use crate::types::{Block, SpeechInterval, SpeechTimings};

fn normalized_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn assert_well_formed(blocks: &[Block], config: &OptimizeConfig) {
    for (i, block) in blocks.iter().enumerate() {
        assert_eq!(block.ordinal, i + 1);
        assert!(block.duration_ms() > 0, "non-positive duration: {:?}", block);
    }
    for pair in blocks.windows(2) {
        assert!(
            pair[1].start_ms - pair[0].end_ms >= config.min_gap_ms,
            "gap below minimum between {:?} and {:?}",
            pair[0],
            pair[1]
        );
    }
}

fn messy_track() -> Vec<Block> {
    vec![
        Block::new(1, 0, 900, "Hi"),
        Block::new(2, 850, 2000, "there,  how   are you doing today?"),
        Block::new(3, 2000, 2000, "Blink"),
        Block::new(4, 2100, 19_000, "This block lingers far too long on screen. It should be split into smaller pieces so people can read it."),
        Block::new(5, 19_100, 20_000, "Way too much text crammed into a tiny window, nobody could ever read this"),
        Block::new(6, 20_000, 21_000, "Two\nlines"),
        Block::new(7, 25_000, 27_000, "Okay"),
        Block::new(8, 27_300, 30_000, "A calm and reasonable closing line."),
    ]
}

#[test]
fn test_compliant_track_is_untouched() {
    let config = OptimizeConfig::default();
    let tunables = Tunables::default();
    let blocks = vec![
        Block::new(1, 1000, 4000, "Good evening and welcome to the show."),
        Block::new(2, 5000, 8000, "Tonight we talk about rivers and seas."),
        Block::new(3, 9000, 12_000, "Stay with us until the very end."),
    ];

    let optimized = Optimizer::new(&config, &tunables).run(blocks.clone(), &SpeechTimings::default());

    assert_eq!(optimized.total_changes(), 0);
    assert!(optimized.stages.iter().all(|s| s.changed == 0));
    assert!(optimized.diagnostics.is_empty());
    assert_eq!(optimized.blocks, blocks);
}

#[test]
fn test_messy_track_keeps_text_and_order() {
    let config = OptimizeConfig::default();
    let tunables = Tunables::default();
    let blocks = messy_track();
    let before = normalized_text(&blocks);

    let optimized = Optimizer::new(&config, &tunables).run(blocks, &SpeechTimings::default());

    assert_eq!(normalized_text(&optimized.blocks), before);
    assert_well_formed(&optimized.blocks, &config);
    assert!(optimized.blocks.iter().all(|b| !b.text.contains('\n')));
    assert!(optimized.total_changes() > 0);
}

#[test]
fn test_line_oriented_track_wraps_lines() {
    let config = OptimizeConfig::line_oriented();
    let tunables = Tunables::default();
    let blocks = messy_track();
    let before = normalized_text(&blocks);

    let optimized = Optimizer::new(&config, &tunables).run(blocks, &SpeechTimings::default());

    assert_eq!(normalized_text(&optimized.blocks), before);
    assert_well_formed(&optimized.blocks, &config);
    assert!(optimized.blocks.iter().all(|b| b.line_count() <= 2));
}

#[test]
fn test_forced_duration_split() {
    let config = OptimizeConfig {
        max_duration_ms: 7000,
        min_duration_ms: 1000,
        ..OptimizeConfig::default()
    };
    let tunables = Tunables::default();
    let text = "The first sentence runs here. The second sentence follows it.";

    let optimized = Optimizer::new(&config, &tunables)
        .run(vec![Block::new(1, 0, 15_000, text)], &SpeechTimings::default());

    assert!(optimized.blocks.len() >= 2);
    let joined: Vec<&str> = optimized.blocks.iter().map(|b| b.text.as_str()).collect();
    assert_eq!(joined.join(" "), text);
    assert_well_formed(&optimized.blocks, &config);
}

#[test]
fn test_short_blocks_merge_into_one() {
    let config = OptimizeConfig {
        min_duration_ms: 1200,
        ..OptimizeConfig::default()
    };
    let tunables = Tunables::default();
    let blocks = vec![Block::new(1, 0, 800, "Hi"), Block::new(2, 900, 1700, "there")];

    let optimized = Optimizer::new(&config, &tunables).run(blocks, &SpeechTimings::default());

    assert_eq!(optimized.blocks.len(), 1);
    assert_eq!(optimized.blocks[0].text, "Hi there");
    assert_eq!(optimized.blocks[0].ordinal, 1);
}

#[test]
fn test_oversized_sparse_block_trimmed_to_speech() {
    let config = OptimizeConfig::default();
    let tunables = Tunables::default();
    let blocks = vec![Block::new(1, 0, 20_000, "Okay")];
    let speech = SpeechTimings {
        segments: vec![SpeechInterval::new(0, 2000)],
        words: Vec::new(),
    };

    let optimizer = Optimizer::new(&config, &tunables);
    let trimmed = optimizer.run(blocks.clone(), &speech);
    assert_eq!(trimmed.blocks[0].end_ms, 2500);

    let untouched = optimizer.run(blocks, &SpeechTimings::default());
    assert_eq!(untouched.blocks[0].end_ms, 20_000);
}

#[test]
fn test_trim_needs_meaningful_saving() {
    let config = OptimizeConfig::default();
    let tunables = Tunables::default();
    let speech = SpeechTimings {
        segments: vec![SpeechInterval::new(0, 15_000)],
        words: Vec::new(),
    };
    // would only save 500 ms
    let blocks = vec![Block::new(1, 0, 16_000, "Okay")];
    let outcome = trim_oversized_sparse(blocks, &config, &tunables, &speech);
    assert_eq!(outcome.changed, 0);
    assert_eq!(outcome.blocks[0].end_ms, 16_000);
}

#[test]
fn test_min_duration_respects_neighbors() {
    let config = OptimizeConfig::default();
    let blocks = vec![
        Block::new(1, 0, 500, "first"),
        Block::new(2, 1000, 1400, "second"),
        Block::new(3, 1600, 4000, "third"),
    ];
    let outcome = enforce_min_duration(blocks, &config);
    let b = &outcome.blocks;
    assert_eq!(b[0].end_ms, 920);
    assert_eq!(b[1].end_ms, 1520);
    assert_eq!(b[1].start_ms, 1000);
    assert_eq!(outcome.changed, 2);
}

#[test]
fn test_unsorted_input_is_ordered() {
    let config = OptimizeConfig::default();
    let tunables = Tunables::default();
    let blocks = vec![
        Block::new(1, 5000, 8000, "Tonight we talk about rivers and seas."),
        Block::new(2, 1000, 4000, "Good evening and welcome to the show."),
    ];
    let optimized = Optimizer::new(&config, &tunables).run(blocks, &SpeechTimings::default());
    assert_eq!(optimized.blocks[0].text, "Good evening and welcome to the show.");
    assert_well_formed(&optimized.blocks, &config);
}

#[test]
fn test_tracks_optimize_in_parallel() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Optimizer<'static>>();

    let config = OptimizeConfig::default();
    let tunables = Tunables::default();
    let optimizer = Optimizer::new(&config, &tunables);
    let speech = SpeechTimings::default();

    let expected = optimizer.run(messy_track(), &speech).blocks;
    let results: Vec<Vec<Block>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| optimizer.run(messy_track(), &speech).blocks))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    for blocks in results {
        assert_eq!(blocks, expected);
    }
}

#[test]
fn test_empty_track() {
    let config = OptimizeConfig::default();
    let tunables = Tunables::default();
    let optimized = Optimizer::new(&config, &tunables).run(Vec::new(), &SpeechTimings::default());
    assert!(optimized.blocks.is_empty());
    assert_eq!(optimized.total_changes(), 0);
}
