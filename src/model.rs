use serde::{Deserialize, Serialize};

/// A single timed caption entry, numbered in output order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub sequence_number: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

impl Cue {
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    /// Start- and end-inclusive containment.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t <= self.end_time
    }
}

/// A parsed cue that has not been assigned a sequence number yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CueDraft {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

impl CueDraft {
    /// Builds a draft, rejecting negative, non-finite or inverted ranges.
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Option<Self> {
        if !start_time.is_finite() || !end_time.is_finite() {
            return None;
        }
        if start_time < 0.0 || end_time < start_time {
            return None;
        }
        let text: String = text.into();
        Some(Self {
            start_time,
            end_time,
            text: clean_text(&text),
        })
    }
}

/// Unifies line endings and drops whitespace-only lines, which SRT reads as
/// block separators.
fn clean_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assigns contiguous 1-based sequence numbers in the given order.
pub fn sequence(drafts: Vec<CueDraft>) -> Vec<Cue> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(i, d)| Cue {
            sequence_number: i + 1,
            start_time: d.start_time,
            end_time: d.end_time,
            text: d.text,
        })
        .collect()
}

/// End time of the last cue, or zero for an empty track.
pub fn track_end(cues: &[Cue]) -> f64 {
    cues.iter().map(|c| c.end_time).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_rejects_inverted_and_negative_ranges() {
        assert!(CueDraft::new(2.0, 1.0, "x").is_none());
        assert!(CueDraft::new(-0.5, 1.0, "x").is_none());
        assert!(CueDraft::new(0.0, f64::NAN, "x").is_none());
        assert!(CueDraft::new(1.0, 1.0, "").is_some());
    }

    #[test]
    fn draft_text_loses_blank_lines_only() {
        let d = CueDraft::new(0.0, 1.0, "  lead\r\n\n   \ntrail  ").unwrap();
        assert_eq!(d.text, "  lead\ntrail  ");
        assert_eq!(CueDraft::new(0.0, 1.0, " \t ").unwrap().text, "");
    }

    #[test]
    fn sequence_numbers_are_contiguous_from_one() {
        let drafts = vec![
            CueDraft::new(0.0, 1.0, "a").unwrap(),
            CueDraft::new(1.0, 2.0, "b").unwrap(),
            CueDraft::new(2.0, 3.0, "c").unwrap(),
        ];
        let cues = sequence(drafts);
        let numbers: Vec<usize> = cues.iter().map(|c| c.sequence_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(track_end(&cues), 3.0);
    }
}
