use std::fmt;

use thiserror::Error;

use crate::actors::Field;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimelineError {
    #[error("label '{label}' is not defined")]
    UnknownLabel { label: String },
    #[error("label '{label}' is already defined")]
    DuplicateLabel { label: String },
    #[error("invalid position '{raw}'")]
    InvalidPosition { raw: String },
    #[error("position '{raw}' resolves to negative time {time}")]
    NegativeTime { raw: String, time: f32 },
    #[error("{what} must be finite and non-negative, got {value}")]
    NegativeDuration { what: &'static str, value: f32 },
    #[error("binding gain must be finite and non-zero, got {gain}")]
    InvalidGain { gain: f32 },
    #[error("timeline '{timeline}' repeats forever but its cycle has zero length")]
    EmptyLoop { timeline: String },
}

/// How many times a timeline body plays after the first pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    #[default]
    Once,
    Count(u32),
    Infinite,
}

impl Repeat {
    /// Whether a cycle with this index is the final one.
    pub fn is_last_cycle(self, cycle_index: u64) -> bool {
        match self {
            Self::Once => true,
            Self::Count(extra) => cycle_index >= u64::from(extra),
            Self::Infinite => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NonFiniteStart,
    NonFiniteEnd,
    NonFiniteValue,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NonFiniteStart => "non_finite_start",
            Self::NonFiniteEnd => "non_finite_end",
            Self::NonFiniteValue => "non_finite_value",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tween the player refused to apply. Playback carries on without it.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDiagnostic {
    pub timeline: String,
    pub cycle: u64,
    pub time: f32,
    pub actor: String,
    pub field: Field,
    pub reason: SkipReason,
}

impl fmt::Display for StepDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: skipped tween on {}.{} at {:.3}s of cycle {} ({})",
            self.timeline, self.actor, self.field, self.time, self.cycle, self.reason
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub cycles_started: u64,
    pub callbacks_fired: u64,
    pub tweens_completed: u64,
    pub steps_skipped: u64,
}

impl PlaybackStats {
    pub fn merge(&mut self, other: PlaybackStats) {
        self.cycles_started = self.cycles_started.saturating_add(other.cycles_started);
        self.callbacks_fired = self.callbacks_fired.saturating_add(other.callbacks_fired);
        self.tweens_completed = self.tweens_completed.saturating_add(other.tweens_completed);
        self.steps_skipped = self.steps_skipped.saturating_add(other.steps_skipped);
    }
}

pub(crate) fn check_duration(what: &'static str, value: f32) -> Result<f32, TimelineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(TimelineError::NegativeDuration { what, value })
    }
}
