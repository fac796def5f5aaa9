use serde::{Deserialize, Serialize};

/// Timestamp-anchored playback state.
///
/// Times are milliseconds on the shared virtual clock. The position is never
/// ticked; it is derived from the anchor whenever it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WirePlayState", into = "WirePlayState")]
pub enum PlayState {
    /// Position 0 was (or would have been) reached at `time_start`.
    Playing { time_start: f64, rate: f64 },
    /// Frozen at `time_at` milliseconds into the item.
    Paused { time_at: f64, rate: f64 },
}

impl Default for PlayState {
    fn default() -> Self {
        Self::Paused {
            time_at: 0.0,
            rate: 1.0,
        }
    }
}

impl PlayState {
    pub fn rate(&self) -> f64 {
        match *self {
            Self::Playing { rate, .. } | Self::Paused { rate, .. } => rate,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing { .. })
    }

    /// Elapsed media milliseconds at shared-clock instant `now`.
    pub fn position_at(&self, now: f64) -> f64 {
        match *self {
            Self::Playing { time_start, rate } => (now - time_start) * rate,
            Self::Paused { time_at, .. } => time_at,
        }
    }

    /// Paused at 0, keeping the rate. Used whenever the current item changes.
    pub fn reset(self) -> Self {
        Self::Paused {
            time_at: 0.0,
            rate: self.rate(),
        }
    }

    pub fn played(self, now: f64) -> Self {
        match self {
            Self::Paused { time_at, rate } => Self::Playing {
                time_start: now - time_at / rate,
                rate,
            },
            playing => playing,
        }
    }

    pub fn paused(self, now: f64) -> Self {
        match self {
            Self::Playing { rate, .. } => Self::Paused {
                time_at: self.position_at(now),
                rate,
            },
            paused => paused,
        }
    }

    pub fn toggled(self, now: f64) -> Self {
        if self.is_playing() {
            self.paused(now)
        } else {
            self.played(now)
        }
    }

    /// Jumps to `position` without changing play/pause.
    pub fn seeked(self, position: f64, now: f64) -> Self {
        let position = position.max(0.0);
        match self {
            Self::Playing { rate, .. } => Self::Playing {
                time_start: now - position / rate,
                rate,
            },
            Self::Paused { rate, .. } => Self::Paused {
                time_at: position,
                rate,
            },
        }
    }

    /// Changes the rate while keeping the position at `now` unchanged.
    pub fn with_rate(self, rate: f64, now: f64) -> Self {
        match self {
            Self::Playing { .. } => Self::Playing {
                time_start: now - self.position_at(now) / rate,
                rate,
            },
            Self::Paused { time_at, .. } => Self::Paused { time_at, rate },
        }
    }

    /// Applies `clamp` to the rate only, leaving the anchor as sent.
    pub fn map_rate(self, clamp: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Self::Playing { time_start, rate } => Self::Playing {
                time_start,
                rate: clamp(rate),
            },
            Self::Paused { time_at, rate } => Self::Paused {
                time_at,
                rate: clamp(rate),
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WirePlayState {
    playing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_at: Option<f64>,
    rate: f64,
}

impl TryFrom<WirePlayState> for PlayState {
    type Error = &'static str;

    fn try_from(wire: WirePlayState) -> Result<Self, Self::Error> {
        match wire {
            WirePlayState {
                playing: true,
                time_start: Some(time_start),
                time_at: None,
                rate,
            } => Ok(Self::Playing { time_start, rate }),
            WirePlayState {
                playing: false,
                time_start: None,
                time_at: Some(time_at),
                rate,
            } => Ok(Self::Paused { time_at, rate }),
            _ => Err("play state must carry time_start when playing and time_at when paused"),
        }
    }
}

impl From<PlayState> for WirePlayState {
    fn from(state: PlayState) -> Self {
        match state {
            PlayState::Playing { time_start, rate } => Self {
                playing: true,
                time_start: Some(time_start),
                time_at: None,
                rate,
            },
            PlayState::Paused { time_at, rate } => Self {
                playing: false,
                time_start: None,
                time_at: Some(time_at),
                rate,
            },
        }
    }
}
