//! Grouping of word-level timings into readable cues.

use serde::{Deserialize, Serialize};

use crate::model::CueDraft;

/// Largest silence between two words that still keeps them in one cue.
pub const MAX_GAP_SECS: f64 = 1.0;

/// A cue whose text is already longer than this is closed before the next word.
pub const MAX_CHARS: usize = 80;

/// Longest span a cue may grow to.
pub const MAX_DURATION_SECS: f64 = 5.0;

/// Thresholds for closing the open cue; `[grouping]` in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordGrouping {
    pub max_gap_secs: f64,
    pub max_chars: usize,
    pub max_duration_secs: f64,
    /// Close the open cue after a word ending in `.`, `!` or `?`.
    pub split_on_sentence_end: bool,
}

impl Default for WordGrouping {
    fn default() -> Self {
        Self {
            max_gap_secs: MAX_GAP_SECS,
            max_chars: MAX_CHARS,
            max_duration_secs: MAX_DURATION_SECS,
            split_on_sentence_end: false,
        }
    }
}

/// One timed token. Tokens without both times are dropped before grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub text: String,
}

#[derive(Default)]
struct Grouped {
    closed: Vec<CueDraft>,
    open: Option<CueDraft>,
}

/// Folds tokens, in order, into cue drafts.
pub fn group_words(words: &[Word], rules: &WordGrouping) -> Vec<CueDraft> {
    let grouped = words
        .iter()
        .filter_map(|w| {
            let (start, end) = (w.start?, w.end?);
            CueDraft::new(start, end, "")?;
            Some((start, end, w.text.as_str()))
        })
        .fold(Grouped::default(), |mut acc, (start, end, text)| {
            acc.open = match acc.open.take() {
                Some(cur) if continues(&cur, start, end, rules) => Some(CueDraft {
                    start_time: cur.start_time,
                    end_time: end,
                    text: format!("{} {}", cur.text, text),
                }),
                prev => {
                    acc.closed.extend(prev);
                    Some(CueDraft {
                        start_time: start,
                        end_time: end,
                        text: text.to_string(),
                    })
                }
            };

            if rules.split_on_sentence_end && ends_sentence(text) {
                acc.closed.extend(acc.open.take());
            }
            acc
        });

    let mut drafts = grouped.closed;
    drafts.extend(grouped.open);

    drafts
        .into_iter()
        .filter_map(|d| CueDraft::new(d.start_time, d.end_time, d.text))
        .collect()
}

fn continues(cur: &CueDraft, start: f64, end: f64, rules: &WordGrouping) -> bool {
    let gap = start - cur.end_time;
    let duration = end - cur.start_time;
    gap <= rules.max_gap_secs
        && cur.text.chars().count() <= rules.max_chars
        && duration <= rules.max_duration_secs
}

fn ends_sentence(text: &str) -> bool {
    matches!(text.trim_end().chars().last(), Some('.' | '!' | '?'))
}
