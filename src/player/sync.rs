use crate::model::Cue;

/// First cue, in sequence order, whose inclusive range holds `clock`.
///
/// Adjacent cues sharing a boundary both contain it; the earlier one wins.
pub fn active_cue(cues: &[Cue], clock: f64) -> Option<&Cue> {
    cues.iter().find(|c| c.contains(clock))
}

/// Overlay text for the clock position; empty when captions are off or no cue matches.
pub fn active_cue_text(cues: &[Cue], clock: f64, captions_enabled: bool) -> &str {
    if !captions_enabled {
        return "";
    }
    active_cue(cues, clock).map(|c| c.text.as_str()).unwrap_or("")
}
