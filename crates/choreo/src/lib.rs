pub mod actors;
pub mod app;
pub mod motion;
pub mod timeline;

pub use actors::{
    group_member_name, Actor, ActorGroup, ActorId, ActorRegistry, ActorState, Color,
    ColorParseError, Field, LookupError, RegistryError, RegistrySnapshot, Transform, Vec3,
};
pub use app::{
    run_headless, run_headless_with_metrics, AppError, AuthoringScope, DiagnosticHook, LoopConfig,
    MetricsHandle, PlaybackSnapshot, RunSummary, Scene, SceneCommand, SceneContext, SceneError,
};
pub use motion::{
    bearing_or, bearing_to, drop_distance, floor_drop_height, nearest_heading,
    stack_pickup_height, Easing, EasingParseError, Tween, Xz,
};
pub use timeline::{
    Cue, IntoPosition, PlaybackStats, Position, Repeat, SkipReason, Stage, Step, StepDiagnostic,
    Timeline, TimelineBuilder, TimelineError, TimelinePlayer, MAX_REPLAYED_CYCLES,
};
