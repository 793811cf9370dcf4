//! Shape detection and dispatch from raw caption payloads to numbered cues.
//!
//! Strategies are tried in a fixed order: paragraph arrays inside a JSON
//! object, a bare JSON array, a JSON `words` array, then SRT text. The first
//! strategy producing at least one cue wins. Unrecognized or empty input is
//! not an error, it just yields no cues.

use serde::Serialize;
use serde_json::Value;

use crate::{
    formats::{json, srt, words},
    model::{Cue, CueDraft, sequence},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    Paragraphs,
    BareArray,
    Words,
    Srt,
    Unrecognized,
}

/// The strategies worth trying for this payload, in policy order.
pub fn candidates(payload: &str) -> Vec<PayloadShape> {
    let parsed = serde_json::from_str::<Value>(payload).ok();
    candidates_for(payload, parsed.as_ref())
}

fn candidates_for(payload: &str, parsed: Option<&Value>) -> Vec<PayloadShape> {
    let mut out = Vec::new();
    match parsed {
        Some(Value::Object(obj)) => {
            if !json::paragraph_arrays(obj).is_empty() {
                out.push(PayloadShape::Paragraphs);
            }
            if json::words_array(obj).is_some() {
                out.push(PayloadShape::Words);
            }
        }
        Some(Value::Array(_)) => out.push(PayloadShape::BareArray),
        _ => {}
    }
    if !payload.trim().is_empty() {
        out.push(PayloadShape::Srt);
    }
    out
}

/// The shape that would be tried first, or `Unrecognized` for blank input.
pub fn detect(payload: &str) -> PayloadShape {
    candidates(payload)
        .into_iter()
        .next()
        .unwrap_or(PayloadShape::Unrecognized)
}

/// Normalizes with the default word-grouping thresholds.
pub fn normalize(payload: &str) -> Vec<Cue> {
    normalize_with(payload, &words::WordGrouping::default())
}

/// Returns the cues of the first strategy that yields any; empty when none do.
pub fn normalize_with(payload: &str, grouping: &words::WordGrouping) -> Vec<Cue> {
    normalize_detailed(payload, grouping).1
}

/// Like [`normalize_with`], also reporting which strategy produced the cues.
pub fn normalize_detailed(
    payload: &str,
    grouping: &words::WordGrouping,
) -> (PayloadShape, Vec<Cue>) {
    let parsed = serde_json::from_str::<Value>(payload).ok();

    for shape in candidates_for(payload, parsed.as_ref()) {
        let drafts = extract(shape, payload, parsed.as_ref(), grouping);
        if drafts.is_empty() {
            tracing::trace!(?shape, "strategy yielded no cues");
            continue;
        }
        tracing::debug!(?shape, cues = drafts.len(), "normalized caption payload");
        return (shape, sequence(drafts));
    }

    tracing::debug!(bytes = payload.len(), "no caption cues found");
    (PayloadShape::Unrecognized, Vec::new())
}

fn extract(
    shape: PayloadShape,
    payload: &str,
    parsed: Option<&Value>,
    grouping: &words::WordGrouping,
) -> Vec<CueDraft> {
    match (shape, parsed) {
        (PayloadShape::Paragraphs, Some(Value::Object(obj))) => json::paragraph_arrays(obj)
            .into_iter()
            .map(json::parse_cue_items)
            .find(|drafts| !drafts.is_empty())
            .unwrap_or_default(),
        (PayloadShape::BareArray, Some(Value::Array(items))) => json::parse_cue_items(items),
        (PayloadShape::Words, Some(Value::Object(obj))) => json::words_array(obj)
            .map(|items| words::group_words(&json::parse_words(items), grouping))
            .unwrap_or_default(),
        (PayloadShape::Srt, _) => srt::parse_srt(payload),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::srt::to_srt;

    fn numbers(cues: &[Cue]) -> Vec<usize> {
        cues.iter().map(|c| c.sequence_number).collect()
    }

    #[test]
    fn paragraphs_object_keeps_source_order() {
        let payload = r#"{"paragraphs":[
            {"start":0.0,"end":1.0,"text":"a"},
            {"start":1.0,"end":2.0,"text":"b"},
            {"start":2.5,"end":4.0,"text":"c"}]}"#;
        assert_eq!(detect(payload), PayloadShape::Paragraphs);
        let cues = normalize(payload);
        assert_eq!(numbers(&cues), vec![1, 2, 3]);
        let starts: Vec<f64> = cues.iter().map(|c| c.start_time).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.5]);
    }

    #[test]
    fn bare_array_with_a_bad_element_stays_contiguous() {
        let payload = r#"[
            {"start":"0","end":"1","text":"a"},
            {"start":"x","end":"2","text":"bad"},
            {"start":2,"end":3,"text":"c"}]"#;
        assert_eq!(detect(payload), PayloadShape::BareArray);
        let cues = normalize(payload);
        assert_eq!(numbers(&cues), vec![1, 2]);
        assert_eq!(cues[1].text, "c");
    }

    #[test]
    fn words_object_is_grouped() {
        let payload = r#"{"words":[
            {"start":0,"end":0.5,"text":"Hello"},
            {"start":0.6,"end":1.0,"text":"world"},
            {"start":3.0,"end":3.5,"text":"Next"}]}"#;
        let (shape, cues) = normalize_detailed(payload, &words::WordGrouping::default());
        assert_eq!(shape, PayloadShape::Words);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "Hello world");
        assert_eq!((cues[0].start_time, cues[0].end_time), (0.0, 1.0));
        assert_eq!(cues[1].text, "Next");
        assert_eq!((cues[1].start_time, cues[1].end_time), (3.0, 3.5));
    }

    #[test]
    fn empty_paragraphs_fall_through_to_words() {
        let payload = r#"{"paragraphs":[{"start":"bad","end":1,"text":"x"}],
                          "words":[{"start":0,"end":1,"text":"w"}]}"#;
        let (shape, cues) = normalize_detailed(payload, &words::WordGrouping::default());
        assert_eq!(shape, PayloadShape::Words);
        assert_eq!(cues.len(), 1);
    }

    #[test]
    fn srt_text_is_detected_when_json_fails() {
        let payload = "1\n00:00:00,000 --> 00:00:01,000\nhi\n";
        assert_eq!(detect(payload), PayloadShape::Srt);
        assert_eq!(normalize(payload).len(), 1);
    }

    #[test]
    fn unrecognized_payloads_yield_no_cues() {
        assert_eq!(detect("   "), PayloadShape::Unrecognized);
        assert!(normalize("").is_empty());
        assert!(normalize("just some prose").is_empty());
        assert!(normalize(r#"{"title":"nothing here"}"#).is_empty());
        assert!(normalize("42").is_empty());
    }

    #[test]
    fn srt_export_round_trips_json_sources() {
        let payload = r#"[
            {"start":0.1234,"end":1.5,"text":"first"},
            {"start":1.5,"end":2.0,"text":"two\nlines"},
            {"start":2.0,"end":9.9996,"text":"last"}]"#;
        let cues = normalize(payload);
        let again = normalize(&to_srt(&cues));
        assert_eq!(again.len(), cues.len());
        for (a, b) in cues.iter().zip(&again) {
            assert!((a.start_time - b.start_time).abs() <= 0.001);
            assert!((a.end_time - b.end_time).abs() <= 0.001);
            assert_eq!(a.text, b.text);
        }
    }
}
