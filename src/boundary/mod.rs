//! Text boundary search for line breaks and block splits
//!
//! Offsets returned here are byte offsets into the input, always on a char
//! boundary, while every length comparison is done in characters.

use crate::config::Tunables;

/// How natural a line break is; lower sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SplitPriority {
    SentenceEnd,
    ClauseEnd,
    BeforeConjunction,
    BeforePreposition,
    Plain,
}

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];
const LINE_CLAUSE_MARKS: [char; 3] = [',', ';', ':'];
const BLOCK_CLAUSE_MARKS: [char; 4] = [',', ';', ':', '—'];

fn classify(left_word: &str, next_word: &str, tunables: &Tunables) -> SplitPriority {
    if left_word.ends_with(SENTENCE_TERMINATORS) {
        SplitPriority::SentenceEnd
    } else if left_word.ends_with(LINE_CLAUSE_MARKS) {
        SplitPriority::ClauseEnd
    } else if tunables.is_conjunction(next_word) {
        SplitPriority::BeforeConjunction
    } else if tunables.is_preposition(next_word) {
        SplitPriority::BeforePreposition
    } else {
        SplitPriority::Plain
    }
}

/// Byte offset of the space where `text` should wrap onto a second line.
///
/// Returns `None` when the text already fits or has no space to break at.
/// Both lines are `text[..p]` and `text[p + 1..]`.
pub fn find_line_split(text: &str, max_line_len: usize, tunables: &Tunables) -> Option<usize> {
    let total = text.chars().count();
    if total <= max_line_len {
        return None;
    }

    let words: Vec<&str> = text.split(' ').collect();
    let boundaries = words.len().saturating_sub(1);
    let mut best: Option<(SplitPriority, usize, usize)> = None;
    let mut left_chars = 0;
    let mut byte_pos = 0;

    for (i, word) in words.iter().take(boundaries).enumerate() {
        left_chars += word.chars().count();
        byte_pos += word.len();
        let right_chars = total - left_chars - 1;

        if left_chars <= max_line_len && right_chars <= max_line_len {
            let key = (
                classify(word, words[i + 1], tunables),
                left_chars.abs_diff(right_chars),
                byte_pos,
            );
            if best.map_or(true, |current| key < current) {
                best = Some(key);
            }
        }

        left_chars += 1;
        byte_pos += 1;
    }

    if let Some((_, _, pos)) = best {
        return Some(pos);
    }

    // Nothing fits both lines: break at the first space past the middle
    let mid = total / 2;
    let mut left_chars = 0;
    let mut byte_pos = 0;
    for word in words.iter().take(boundaries) {
        left_chars += word.chars().count();
        byte_pos += word.len();
        if left_chars >= mid {
            return Some(byte_pos);
        }
        left_chars += 1;
        byte_pos += 1;
    }
    None
}

/// Candidate split point: char index and byte offset where the second half begins
#[derive(Debug, Clone, Copy)]
struct Cut {
    char_pos: usize,
    byte_pos: usize,
}

/// Byte offset where the second half of a block's text should begin.
///
/// Prefers the sentence boundary nearest the middle, then clause punctuation,
/// then any word boundary. `None` only when there is no whitespace inside the
/// text.
pub fn find_block_split(text: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mid = chars.len() / 2;

    let sentence_cuts = cuts_after(&chars, |prev| SENTENCE_TERMINATORS.contains(&prev));
    if !sentence_cuts.is_empty() {
        return closest_to(&sentence_cuts, mid);
    }

    let clause_cuts = cuts_after(&chars, |prev| BLOCK_CLAUSE_MARKS.contains(&prev));
    if !clause_cuts.is_empty() {
        return closest_to(&clause_cuts, mid);
    }

    let word_cuts = cuts_after(&chars, |prev| !prev.is_whitespace());
    closest_to(&word_cuts, mid)
}

/// Cuts after each whitespace run whose preceding char satisfies `accept`.
/// Runs at either end of the text are not cuts.
fn cuts_after(chars: &[(usize, char)], accept: impl Fn(char) -> bool) -> Vec<Cut> {
    let mut cuts = Vec::new();
    let mut i = 1;
    while i < chars.len() {
        if chars[i].1.is_whitespace() && !chars[i - 1].1.is_whitespace() {
            let prev = chars[i - 1].1;
            let mut end = i;
            while end < chars.len() && chars[end].1.is_whitespace() {
                end += 1;
            }
            if end < chars.len() && accept(prev) {
                cuts.push(Cut {
                    char_pos: end,
                    byte_pos: chars[end].0,
                });
            }
            i = end;
        } else {
            i += 1;
        }
    }
    cuts
}

fn closest_to(cuts: &[Cut], mid: usize) -> Option<usize> {
    cuts.iter()
        .min_by_key(|cut| cut.char_pos.abs_diff(mid))
        .map(|cut| cut.byte_pos)
}

/// Split `text` at `pos` into two trimmed halves
pub fn split_at_boundary(text: &str, pos: usize) -> (String, String) {
    let (left, right) = text.split_at(pos);
    (left.trim().to_string(), right.trim().to_string())
}
