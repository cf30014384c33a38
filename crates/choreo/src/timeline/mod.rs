mod builder;
mod player;
mod position;
mod types;

pub use builder::{Callback, Step, Timeline, TimelineBuilder};
pub use player::{Cue, Stage, TimelinePlayer, MAX_REPLAYED_CYCLES};
pub use position::{IntoPosition, Position};
pub use types::{PlaybackStats, Repeat, SkipReason, StepDiagnostic, TimelineError};
