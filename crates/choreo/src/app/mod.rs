mod lifecycle;
mod loop_runner;
mod metrics;
mod scene;

pub use lifecycle::{AuthoringScope, DiagnosticHook, SceneContext};
pub use loop_runner::{run_headless, run_headless_with_metrics, AppError, LoopConfig, RunSummary};
pub use metrics::{MetricsHandle, PlaybackSnapshot};
pub use scene::{Scene, SceneCommand, SceneError};
