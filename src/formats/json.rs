use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    formats::words::Word,
    model::{Cue, CueDraft},
};

/// Array fields searched for paragraph-like cues, in priority order.
pub const PARAGRAPH_KEYS: [&str; 3] = ["paragraphs", "segments", "cues"];

const WORDS_KEY: &str = "words";
const START_KEYS: [&str; 4] = ["start", "start_time", "startTime", "data_start"];
const END_KEYS: [&str; 4] = ["end", "end_time", "endTime", "data_end"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphsJson {
    pub paragraphs: Vec<JsonCue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Exports cues in the paragraphs shape, which normalizes back to the same cues.
pub fn write_json(cues: &[Cue], pretty: bool) -> serde_json::Result<String> {
    let doc = ParagraphsJson {
        paragraphs: cues
            .iter()
            .map(|c| JsonCue {
                start: c.start_time,
                end: c.end_time,
                text: c.text.clone(),
            })
            .collect(),
    };
    if pretty {
        serde_json::to_string_pretty(&doc)
    } else {
        serde_json::to_string(&doc)
    }
}

/// Finds the paragraph-like array inside a JSON object: the well-known keys
/// first, then any other array field except `words`.
pub fn paragraph_arrays(obj: &Map<String, Value>) -> Vec<&[Value]> {
    let known = PARAGRAPH_KEYS
        .iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_array));
    let others = obj
        .iter()
        .filter(|(k, _)| k.as_str() != WORDS_KEY && !PARAGRAPH_KEYS.contains(&k.as_str()))
        .filter_map(|(_, v)| v.as_array());

    known
        .chain(others)
        .filter(|arr| arr.iter().any(looks_like_cue))
        .map(Vec::as_slice)
        .collect()
}

/// The `words` array of a JSON object, if present.
pub fn words_array(obj: &Map<String, Value>) -> Option<&[Value]> {
    obj.get(WORDS_KEY)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

fn looks_like_cue(item: &Value) -> bool {
    item.as_object().is_some_and(|o| {
        START_KEYS.iter().any(|k| o.contains_key(*k))
            && END_KEYS.iter().any(|k| o.contains_key(*k))
            && o.contains_key("text")
    })
}

/// Extracts one draft per well-formed element, preserving array order.
pub fn parse_cue_items(items: &[Value]) -> Vec<CueDraft> {
    let mut drafts = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match parse_cue_item(item) {
            Some(d) => drafts.push(d),
            None => tracing::debug!(idx, "skipping malformed JSON cue element"),
        }
    }
    drafts
}

fn parse_cue_item(item: &Value) -> Option<CueDraft> {
    let obj = item.as_object()?;
    let start = first_time(obj, &START_KEYS)?;
    let end = first_time(obj, &END_KEYS)?;
    let text = obj.get("text")?.as_str()?;
    CueDraft::new(start, end, text)
}

/// Reads word tokens; missing or uncoercible times become `None`.
pub fn parse_words(items: &[Value]) -> Vec<Word> {
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let text = obj.get("text")?.as_str()?;
            Some(Word {
                start: first_time(obj, &START_KEYS),
                end: first_time(obj, &END_KEYS),
                text: text.to_string(),
            })
        })
        .collect()
}

fn first_time(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    let v = keys.iter().find_map(|k| obj.get(*k))?;
    coerce_seconds(v)
}

/// Numbers pass through; numeric strings are parsed; anything else fails.
pub fn coerce_seconds(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
