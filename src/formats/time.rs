/// Formats seconds as an SRT timestamp, `HH:MM:SS,mmm`.
pub fn format_srt_timestamp(seconds: f64) -> String {
    format_timestamp(seconds, ',')
}

/// Formats seconds as `HH:MM:SS.mmm`, used for human-readable log and CLI output.
pub fn format_clock(seconds: f64) -> String {
    format_timestamp(seconds, '.')
}

fn format_timestamp(seconds: f64, ms_sep: char) -> String {
    let ms = seconds_to_ms(seconds);

    let total_seconds = ms / 1000;
    let milli = ms % 1000;

    let sec = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let min = total_minutes % 60;
    let hour = total_minutes / 60;

    format!("{hour:02}:{min:02}:{sec:02}{ms_sep}{milli:03}")
}

/// Rounds to whole milliseconds, clamping negatives and non-finite input to zero.
pub fn seconds_to_ms(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).round() as u64
}

/// `H*3600 + M*60 + S + ms/1000`, or `None` when the whole seconds overflow.
pub fn components_to_seconds(
    hours: u64,
    minutes: u64,
    seconds: u64,
    millis: u64,
) -> Option<f64> {
    let whole = hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?;
    Some(whole as f64 + millis as f64 / 1000.0)
}
