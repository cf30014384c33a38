pub mod choreography;
pub mod config;

pub use choreography::{
    default_registry, start, stop, ConstructionRig, ConstructionScene, HookLoad, Phase,
    ScriptState, StartError, VignetteHandle,
};
pub use config::{load_config, parse_config, ConfigError, VignetteConfig};
