use tokio::time::Instant;

use crate::error::MediaError;

/// The host media surface the player drives.
///
/// Mirrors the small part of a video element the caption player needs:
/// a readable clock, transport commands and the fullscreen request.
pub trait MediaElement {
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Total length in seconds, `None` while unknown.
    fn duration(&self) -> Option<f64>;

    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn set_current_time(&mut self, seconds: f64);

    fn set_muted(&mut self, muted: bool);

    /// Requests (`true`) or exits (`false`) platform fullscreen for the video surface.
    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), MediaError>;
}

/// A headless element whose clock advances with (tokio) wall time.
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    duration: f64,
    speed: f64,
    position: f64,
    playing_since: Option<Instant>,
    muted: bool,
    fullscreen: bool,
}

impl SimulatedMedia {
    pub fn new(duration: f64, speed: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            speed: if speed.is_finite() && speed > 0.0 { speed } else { 1.0 },
            position: 0.0,
            playing_since: None,
            muted: false,
            fullscreen: false,
        }
    }

    /// Replaces the media length once it becomes known; the clock is clamped to it.
    pub fn set_duration(&mut self, duration: f64) {
        let now = self.current_time();
        self.duration = duration.max(0.0);
        self.position = now.min(self.duration);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some() && !self.ended()
    }

    pub fn ended(&self) -> bool {
        self.current_time() >= self.duration
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

impl MediaElement for SimulatedMedia {
    fn current_time(&self) -> f64 {
        let elapsed = self
            .playing_since
            .map(|t| t.elapsed().as_secs_f64() * self.speed)
            .unwrap_or(0.0);
        (self.position + elapsed).min(self.duration)
    }

    fn duration(&self) -> Option<f64> {
        Some(self.duration)
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.duration <= 0.0 {
            return Err(MediaError::PlaybackRejected("no media loaded".to_string()));
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.position = self.current_time();
        self.playing_since = None;
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.duration);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), MediaError> {
        self.fullscreen = fullscreen;
        Ok(())
    }
}
