//! Synchronized caption playback.
//!
//! [`CaptionPlayer`] owns one playback session at a time: the media element,
//! the cue list of the current source, and the control state. Cue lists are
//! only ever replaced whole. Every load is tagged with a [`LoadTicket`]; a
//! result carrying an older ticket than the current session is dropped.

pub mod fetch;
pub mod loader;
pub mod media;
pub mod store;
pub mod sync;

use std::time::Duration;
use tokio::time::Instant;

use crate::{
    config::PlayerCfg,
    model::Cue,
    player::{
        loader::{CaptionSource, CueOrigin, LoadOutcome, LoadState},
        media::MediaElement,
    },
};

/// Identifies the session a load was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

pub struct CaptionPlayer<M: MediaElement> {
    media: M,
    generation: u64,
    source: Option<CaptionSource>,
    cues: Vec<Cue>,
    origin: Option<CueOrigin>,
    load_state: LoadState,
    clock: f64,
    captions_enabled: bool,
    playing: bool,
    muted: bool,
    fullscreen: bool,
    last_tick: Option<Instant>,
    stall_interval: Duration,
}

impl<M: MediaElement> CaptionPlayer<M> {
    pub fn new(media: M, cfg: &PlayerCfg) -> Self {
        Self {
            media,
            generation: 0,
            source: None,
            cues: Vec::new(),
            origin: None,
            load_state: LoadState::Empty,
            clock: 0.0,
            captions_enabled: cfg.captions_enabled,
            playing: false,
            muted: false,
            fullscreen: false,
            last_tick: None,
            stall_interval: Duration::from_millis(cfg.stall_interval_ms),
        }
    }

    /// Starts a new session for `source`, discarding the previous cues.
    pub fn begin_load(&mut self, source: CaptionSource) -> LoadTicket {
        self.generation += 1;
        self.source = Some(source);
        self.cues = Vec::new();
        self.origin = None;
        self.load_state = LoadState::LoadingPrimary;
        tracing::debug!(generation = self.generation, "caption load started");
        LoadTicket {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Records an in-flight phase change. Returns `false` for a stale ticket.
    pub fn apply_phase(&mut self, ticket: LoadTicket, state: LoadState) -> bool {
        if !self.is_current(ticket) || self.is_settled() {
            return false;
        }
        self.load_state = state;
        true
    }

    /// Adopts a finished load. Returns `false` and changes nothing for a stale ticket.
    pub fn finish_load(&mut self, ticket: LoadTicket, outcome: LoadOutcome) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding caption load for a replaced session"
            );
            return false;
        }
        self.load_state = outcome.state();
        self.origin = outcome.origin;
        self.cues = outcome.cues;
        tracing::info!(
            cues = self.cues.len(),
            state = ?self.load_state,
            origin = ?self.origin,
            "captions loaded"
        );
        true
    }

    fn is_settled(&self) -> bool {
        matches!(self.load_state, LoadState::Ready | LoadState::Error)
    }

    /// Clock-tick handler: re-reads the element clock.
    pub fn on_time_update(&mut self, now: Instant) {
        self.clock = self.media.current_time();
        self.last_tick = Some(now);

        if self.playing
            && let Some(duration) = self.media.duration()
            && self.clock >= duration
        {
            tracing::debug!(clock = self.clock, "playback reached the end");
            self.playing = false;
        }
    }

    /// Forces a clock re-read when playing and no tick arrived for a stall interval.
    pub fn check_stall(&mut self, now: Instant) -> bool {
        if !self.playing {
            return false;
        }
        let stalled = self
            .last_tick
            .is_none_or(|t| now.saturating_duration_since(t) > self.stall_interval);
        if stalled {
            tracing::debug!(clock = self.clock, "no time update observed, re-reading clock");
            self.on_time_update(now);
        }
        stalled
    }

    /// Requests playback. A rejection by the element leaves the player paused.
    pub fn play(&mut self) -> bool {
        self.playing = true;
        if let Err(e) = self.media.play() {
            tracing::warn!(error = %e, "playback failed to start");
            self.playing = false;
        }
        self.playing
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.media.pause();
        self.clock = self.media.current_time();
    }

    /// Moves to `seconds`, clamped to the media range; the clock updates immediately.
    pub fn seek(&mut self, seconds: f64) -> f64 {
        let mut target = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if let Some(duration) = self.media.duration().filter(|d| d.is_finite()) {
            target = target.min(duration.max(0.0));
        }
        self.clock = target;
        self.media.set_current_time(target);
        target
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.media.set_muted(self.muted);
        self.muted
    }

    pub fn toggle_captions(&mut self) -> bool {
        self.captions_enabled = !self.captions_enabled;
        self.captions_enabled
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        let wanted = !self.fullscreen;
        match self.media.set_fullscreen(wanted) {
            Ok(()) => self.fullscreen = wanted,
            Err(e) => tracing::warn!(error = %e, "fullscreen change failed"),
        }
        self.fullscreen
    }

    /// Overlay text for the current clock.
    pub fn active_cue_text(&self) -> &str {
        sync::active_cue_text(&self.cues, self.clock, self.captions_enabled)
    }

    pub fn active_cue(&self) -> Option<&Cue> {
        if !self.captions_enabled {
            return None;
        }
        sync::active_cue(&self.cues, self.clock)
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn source(&self) -> Option<&CaptionSource> {
        self.source.as_ref()
    }

    pub fn origin(&self) -> Option<CueOrigin> {
        self.origin
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn captions_enabled(&self) -> bool {
        self.captions_enabled
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }
}
