use std::env;
use std::path::PathBuf;
use std::time::Duration;

use choreo::{LoopConfig, RegistryError, Scene};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vignette::{default_registry, load_config, ConfigError, ConstructionScene, VignetteConfig};

const CONFIG_ENV_VAR: &str = "VIGNETTE_CONFIG";
const RUN_SECONDS_ENV_VAR: &str = "VIGNETTE_RUN_SECONDS";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build the default cast: {0}")]
    Cast(#[from] RegistryError),
    #[error("VIGNETTE_RUN_SECONDS must be a positive number of seconds, got '{raw}'")]
    RunSeconds { raw: String },
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Construction Vignette Startup ===");

    let vignette_config = match config_path_from_env() {
        Some(path) => {
            info!(path = %path.display(), "config_loading");
            load_config(&path)?
        }
        None => VignetteConfig::default(),
    };
    let cast = default_registry(&vignette_config)?;
    let config = LoopConfig {
        run_duration: parse_run_duration_from_env()?,
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        scene: Box::new(ConstructionScene::new(vignette_config, Some(cast))),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn config_path_from_env() -> Option<PathBuf> {
    env::var_os(CONFIG_ENV_VAR)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

fn parse_run_duration_from_env() -> Result<Option<Duration>, BootstrapError> {
    match env::var(RUN_SECONDS_ENV_VAR) {
        Ok(raw) => parse_run_seconds(&raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_run_seconds(raw: &str) -> Result<Duration, BootstrapError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| BootstrapError::RunSeconds {
            raw: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_seconds_accepts_positive_numbers() {
        let duration = parse_run_seconds(" 2.5 ").expect("valid");
        assert_eq!(duration, Duration::from_millis(2500));
    }

    #[test]
    fn run_seconds_rejects_garbage() {
        for raw in ["", "zero", "0", "-3", "inf"] {
            let err = parse_run_seconds(raw).expect_err(raw);
            assert!(err.to_string().contains(RUN_SECONDS_ENV_VAR));
        }
    }
}
