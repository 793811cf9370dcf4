use std::sync::LazyLock;

use regex::{Captures, Regex};
use textwrap::wrap;

use crate::{
    config::Config,
    formats::time::{components_to_seconds, format_srt_timestamp},
    model::{Cue, CueDraft},
};

static TIMING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})",
    )
    .expect("timing line pattern is valid")
});

/// Parses SRT text into cue drafts, skipping malformed blocks.
///
/// The numeric index heading each block is required but otherwise ignored;
/// callers number the drafts by position.
pub fn parse_srt(input: &str) -> Vec<CueDraft> {
    let text = input
        .strip_prefix('\u{feff}')
        .unwrap_or(input)
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut drafts = Vec::new();
    for (block_no, block) in split_blocks(&text).into_iter().enumerate() {
        match parse_block(&block) {
            Some(d) => drafts.push(d),
            None => tracing::debug!(block = block_no + 1, "skipping malformed SRT block"),
        }
    }
    drafts
}

fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn parse_block(lines: &[&str]) -> Option<CueDraft> {
    let index = lines.first()?;
    index.trim().parse::<u64>().ok()?;

    let caps = TIMING_LINE.captures(lines.get(1)?)?;
    let start = timestamp_from(&caps, 1)?;
    let end = timestamp_from(&caps, 5)?;

    let text = lines[2..].join("\n");
    CueDraft::new(start, end, text)
}

fn timestamp_from(caps: &Captures<'_>, first: usize) -> Option<f64> {
    let part = |i: usize| caps.get(first + i)?.as_str().parse::<u64>().ok();
    components_to_seconds(part(0)?, part(1)?, part(2)?, part(3)?)
}

/// Serializes cues as SRT, text untouched, so the output parses back to the same cues.
pub fn to_srt(cues: &[Cue]) -> String {
    render(cues, |text| text.to_string())
}

/// SRT export for the CLI; wraps long lines when `formats.srt.wrap_width` is set.
pub fn write_srt(cues: &[Cue], cfg: &Config) -> String {
    let width = cfg.formats.srt.wrap_width;
    if width == 0 {
        return to_srt(cues);
    }

    render(cues, |text| {
        text.lines()
            .flat_map(|line| wrap(line, width))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn render(cues: &[Cue], text_for: impl Fn(&str) -> String) -> String {
    let mut out = String::new();

    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&(i + 1).to_string());
        out.push('\n');

        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(cue.start_time),
            format_srt_timestamp(cue.end_time)
        ));

        let text = text_for(&cue.text);
        if !text.is_empty() {
            out.push_str(&text);
            out.push('\n');
        }

        out.push('\n');
    }

    out
}
