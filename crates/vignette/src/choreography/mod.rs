use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;

use choreo::{
    bearing_or, bearing_to, drop_distance, floor_drop_height, nearest_heading,
    stack_pickup_height, ActorGroup, ActorId, ActorRegistry, AuthoringScope, Cue, Easing, Field,
    LookupError, PlaybackStats, Position, RegistryError, RegistrySnapshot, Repeat, Scene,
    SceneCommand, SceneContext, SceneError, StepDiagnostic, TimelineBuilder, TimelineError,
    Transform, Tween, Vec3, Xz,
};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, VignetteConfig, BALL_HANG};

pub const TIMELINE_NAME: &str = "construction";
pub const ARRIVAL_LABEL: &str = "arrival-done";
pub const IMPACT_LABEL: &str = "impact";

pub const TRUCK: &str = "truck";
pub const CRANE_PIVOT: &str = "crane.pivot";
pub const CRANE_HOOK: &str = "crane.hook";
pub const CRANE_CABLE: &str = "crane.cable";
pub const CRANE_CLAW: &str = "crane.claw";
pub const CARRIED_BLOCK: &str = "carried.block";
pub const CARRIED_BALL: &str = "carried.ball";
pub const BALL_STAND: &str = "ball.stand";
pub const CARGO_ROLE: &str = "truck.cargo";
pub const FLOOR_ROLE: &str = "building.floor";
pub const DEBRIS_ROLE: &str = "debris";

const TRUCK_INBOUND_HEADING: f32 = -FRAC_PI_2;
const TRUCK_OUTBOUND_HEADING: f32 = FRAC_PI_2;
const TRUCK_BOUNCE_HEIGHT: f32 = 0.04;
const TRUCK_SQUASH: (f32, f32) = (1.06, 0.88);
const BALL_SIZE: f32 = 0.8;
const DEBRIS_SIZE: f32 = 0.35;
const DEBRIS_REST_HEIGHT: f32 = 0.2;
const DEBRIS_SCATTER: f32 = 3.0;
const DEBRIS_STAGGER_SECONDS: f32 = 0.15;
const WIND_UP_FRACTION: f32 = 0.35;

const ARRIVAL_SECONDS: f32 = 1.5;
const BOUNCE_SECONDS: f32 = 0.15;
const BOUNCE_REPEATS: u32 = 9;
const SQUASH_SECONDS: f32 = 0.12;
const RECOVER_SECONDS: f32 = 0.3;
const ROTATE_SECONDS: f32 = 0.6;
const HOIST_SECONDS: f32 = 0.5;
const SETTLE_SECONDS: f32 = 0.2;
const TRUCK_TURN_SECONDS: f32 = 0.4;
const TRUCK_EXIT_SECONDS: f32 = 1.0;
const STORAGE_SWING_SECONDS: f32 = 0.8;
const GRAB_PAUSE_SECONDS: f32 = 0.2;
const WIND_UP_SECONDS: f32 = 0.6;
const SWING_SECONDS: f32 = 0.4;
const IMPACT_PAUSE_SECONDS: f32 = 0.1;
const DEBRIS_FLIGHT_SECONDS: f32 = 0.8;
const DEBRIS_SHRINK_DELAY_SECONDS: f32 = 0.6;
const DEBRIS_SHRINK_SECONDS: f32 = 0.4;
const RETURN_SWING_SECONDS: f32 = 1.0;

include!("rig.rs");
include!("hook.rs");
include!("script.rs");
include!("scene.rs");

pub fn floor_label(floor: usize) -> String {
    format!("floor-{floor}-placed")
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("actor lookup failed: {0}")]
    Lookup(#[from] LookupError),
    #[error("timeline authoring failed: {0}")]
    Timeline(#[from] TimelineError),
}

/// A running vignette. Dropping it or passing it to [`stop`] ends playback.
pub struct VignetteHandle {
    context: SceneContext<ScriptState>,
    rig: ConstructionRig,
}

impl fmt::Debug for VignetteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VignetteHandle")
            .field("seed", &self.context.seed())
            .field("cycle_index", &self.context.cycle_index())
            .field("phase", &self.context.state().phase)
            .field("stopped", &self.context.is_stopped())
            .finish()
    }
}

impl VignetteHandle {
    pub fn advance(&mut self, dt: f32) {
        self.context.advance(dt);
    }

    pub fn actors(&self) -> &ActorRegistry {
        self.context.actors()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.context.actors().snapshot()
    }

    pub fn rig(&self) -> &ConstructionRig {
        &self.rig
    }

    pub fn state(&self) -> &ScriptState {
        self.context.state()
    }

    pub fn phase(&self) -> Phase {
        self.context.state().phase
    }

    pub fn hook_load(&self) -> HookLoad {
        self.context.state().hook
    }

    pub fn seed(&self) -> u64 {
        self.context.seed()
    }

    pub fn cycle_index(&self) -> u64 {
        self.context.cycle_index()
    }

    pub fn cycle_time(&self) -> f32 {
        self.context
            .player(TIMELINE_NAME)
            .map(|player| player.cycle_time())
            .unwrap_or_default()
    }

    pub fn time_until_cycle_end(&self) -> f32 {
        self.context.time_until_cycle_end()
    }

    /// `None` once stopped.
    pub fn label_time(&self, name: &str) -> Option<f32> {
        self.context
            .player(TIMELINE_NAME)
            .and_then(|player| player.label_time(name))
    }

    pub fn stats(&self) -> PlaybackStats {
        self.context.stats()
    }

    pub fn is_stopped(&self) -> bool {
        self.context.is_stopped()
    }

    pub fn set_diagnostic_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&StepDiagnostic) + 'static,
    {
        self.context.set_diagnostic_hook(hook);
    }
}

/// Validates `config`, resolves the cast in `actors` and starts the looping
/// construction timeline. Nothing plays if any step fails.
pub fn start(actors: ActorRegistry, config: &VignetteConfig) -> Result<VignetteHandle, StartError> {
    config.validate()?;
    let rig = ConstructionRig::resolve(&actors, config)?;
    let context = SceneContext::author(actors, ScriptState::default(), config.random_seed, |scope| {
        author_construction(scope, &rig, config)
    })?;
    info!(
        floors = config.floors,
        debris = config.debris_count,
        seed = context.seed(),
        "vignette_started"
    );
    Ok(VignetteHandle { context, rig })
}

pub fn stop(handle: &mut VignetteHandle) {
    handle.context.stop();
}
