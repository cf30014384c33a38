use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use choreo::{Color, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_DEBRIS: u32 = 8;
pub const MAX_DEBRIS: u32 = 12;
/// Distance from the hook down to the centre of a hanging ball.
pub const BALL_HANG: f32 = 0.5;

/// Knobs for one construction vignette. Every historical variant of the
/// scene is a different set of these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct VignetteConfig {
    pub floors: u32,
    /// Pause between loop iterations, seconds.
    pub repeat_delay: f32,
    pub block_size: Vec3,
    pub crane_anchor_height: f32,
    pub hook_safe_height: f32,
    pub random_seed: Option<u64>,
    pub truck_start_x: f32,
    pub truck_stop_x: f32,
    pub truck_lane_z: f32,
    pub truck_bed_height: f32,
    pub building_position: Vec3,
    pub crane_position: Vec3,
    pub ball_rest_position: Vec3,
    pub ball_rest_height: f32,
    pub smash_height: f32,
    pub base_offset: f32,
    pub debris_count: u32,
    pub palette: Vec<Color>,
    /// Multiplies every authored duration.
    pub time_scale: f32,
}

impl Default for VignetteConfig {
    fn default() -> Self {
        Self {
            floors: 4,
            repeat_delay: 0.5,
            block_size: Vec3::new(1.5, 0.6, 1.5),
            crane_anchor_height: 6.0,
            hook_safe_height: 4.0,
            random_seed: None,
            truck_start_x: 12.0,
            truck_stop_x: 3.0,
            truck_lane_z: 2.0,
            truck_bed_height: 0.9,
            building_position: Vec3::new(2.0, 0.0, -1.0),
            crane_position: Vec3::new(-2.0, 0.0, -2.0),
            ball_rest_position: Vec3::new(-2.0, 0.0, -5.0),
            ball_rest_height: 0.7,
            smash_height: 1.4,
            base_offset: 0.2,
            debris_count: 10,
            palette: vec![
                Color::rgb(0xE8, 0xD5, 0xB7),
                Color::rgb(0xD6, 0xC4, 0xA8),
                Color::rgb(0xC9, 0xB7, 0x9C),
                Color::rgb(0xBF, 0xAE, 0x94),
            ],
            time_scale: 1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config field {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    /// The offending field, when the error can be pinned to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Read { .. } => None,
            Self::Parse { path, .. } => Some(path.as_str()),
            Self::Invalid { field, .. } => Some(field),
        }
    }
}

impl VignetteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.floors < 1 {
            return Err(invalid("floors", format!("must be at least 1, got {}", self.floors)));
        }
        non_negative("repeatDelay", self.repeat_delay)?;
        for (component, value) in [
            ("blockSize", self.block_size.x),
            ("blockSize", self.block_size.y),
            ("blockSize", self.block_size.z),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(component, format!("must be positive, got {value}")));
            }
        }
        non_negative("craneAnchorHeight", self.crane_anchor_height)?;
        non_negative("hookSafeHeight", self.hook_safe_height)?;
        if self.hook_safe_height > self.crane_anchor_height {
            return Err(invalid(
                "hookSafeHeight",
                format!(
                    "must not exceed craneAnchorHeight ({}), got {}",
                    self.crane_anchor_height, self.hook_safe_height
                ),
            ));
        }
        finite("truckStartX", self.truck_start_x)?;
        finite("truckStopX", self.truck_stop_x)?;
        finite("truckLaneZ", self.truck_lane_z)?;
        non_negative("truckBedHeight", self.truck_bed_height)?;
        finite_vec("buildingPosition", self.building_position)?;
        finite_vec("cranePosition", self.crane_position)?;
        finite_vec("ballRestPosition", self.ball_rest_position)?;
        non_negative("ballRestHeight", self.ball_rest_height)?;
        non_negative("smashHeight", self.smash_height)?;
        non_negative("baseOffset", self.base_offset)?;
        self.check_crane_reach()?;
        if !(MIN_DEBRIS..=MAX_DEBRIS).contains(&self.debris_count) {
            return Err(invalid(
                "debrisCount",
                format!(
                    "must be within {MIN_DEBRIS}..={MAX_DEBRIS}, got {}",
                    self.debris_count
                ),
            ));
        }
        if self.palette.is_empty() {
            return Err(invalid("palette", "must contain at least one colour"));
        }
        if !(self.time_scale.is_finite() && self.time_scale > 0.0) {
            return Err(invalid(
                "timeScale",
                format!("must be positive, got {}", self.time_scale),
            ));
        }
        Ok(())
    }

    /// Every height the hook is lowered to must sit at or below the jib.
    fn check_crane_reach(&self) -> Result<(), ConfigError> {
        let stack = self.floors as f32 * self.block_size.y;
        for (field, what, height) in [
            ("floors", "building top", self.base_offset + stack),
            ("floors", "truck cargo top", self.truck_bed_height + stack),
            ("ballRestHeight", "ball pickup", self.ball_rest_height + BALL_HANG),
            ("smashHeight", "ball swing", self.smash_height + BALL_HANG),
        ] {
            if height > self.crane_anchor_height {
                return Err(invalid(
                    field,
                    format!(
                        "{what} at {height} is above craneAnchorHeight ({})",
                        self.crane_anchor_height
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Scales an authored duration by `timeScale`.
    pub fn seconds(&self, authored: f32) -> f32 {
        authored * self.time_scale
    }

    pub fn floor_color(&self, floor: usize) -> Color {
        self.palette[floor % self.palette.len()]
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("must be finite and non-negative, got {value}"),
        ))
    }
}

fn finite_vec(field: &'static str, value: Vec3) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, "must have finite components"))
    }
}

/// Parses and validates a JSON config document.
pub fn parse_config(raw: &str) -> Result<VignetteConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let config: VignetteConfig = serde_path_to_error::deserialize(&mut deserializer).map_err(
        |error| {
            let path = error.path().to_string();
            ConfigError::Parse {
                path,
                source: error.into_inner(),
            }
        },
    )?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<VignetteConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = VignetteConfig::default();
        config.validate().expect("defaults");
        assert_eq!(config.floors, 4);
        assert_eq!(config.palette.len(), 4);
        assert_eq!(config.floor_color(5), config.palette[1]);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = parse_config(
            r##"{ "floors": 6, "repeatDelay": 1.0, "randomSeed": 42, "palette": ["#333333"] }"##,
        )
        .expect("parse");
        assert_eq!(config.floors, 6);
        assert_eq!(config.repeat_delay, 1.0);
        assert_eq!(config.random_seed, Some(42));
        assert_eq!(config.palette, vec![Color::rgb(0x33, 0x33, 0x33)]);
        assert_eq!(config.crane_anchor_height, 6.0);
        assert_eq!(config.block_size, Vec3::new(1.5, 0.6, 1.5));
    }

    #[test]
    fn zero_floors_is_rejected_by_name() {
        let err = parse_config(r#"{ "floors": 0 }"#).expect_err("floors");
        assert_eq!(err.field(), Some("floors"));
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn out_of_range_values_name_their_field() {
        let cases = [
            (r#"{ "repeatDelay": -0.5 }"#, "repeatDelay"),
            (r#"{ "debrisCount": 13 }"#, "debrisCount"),
            (r#"{ "debrisCount": 7 }"#, "debrisCount"),
            (r#"{ "timeScale": 0 }"#, "timeScale"),
            (r#"{ "palette": [] }"#, "palette"),
            (r#"{ "hookSafeHeight": 7 }"#, "hookSafeHeight"),
            (r#"{ "blockSize": { "x": 1.5, "y": 0, "z": 1.5 } }"#, "blockSize"),
            (r#"{ "smashHeight": -1 }"#, "smashHeight"),
        ];
        for (raw, field) in cases {
            let err = parse_config(raw).expect_err(raw);
            assert_eq!(err.field(), Some(field), "{raw}");
        }
    }

    #[test]
    fn heights_out_of_crane_reach_are_rejected() {
        let cases = [
            (r#"{ "floors": 10 }"#, "floors"),
            (r#"{ "floors": 9 }"#, "floors"),
            (r#"{ "truckBedHeight": 3.7 }"#, "floors"),
            (r#"{ "floors": 6, "blockSize": { "x": 1.5, "y": 1.0, "z": 1.5 } }"#, "floors"),
            (r#"{ "ballRestHeight": 5.6 }"#, "ballRestHeight"),
            (r#"{ "smashHeight": 5.8 }"#, "smashHeight"),
        ];
        for (raw, field) in cases {
            let err = parse_config(raw).expect_err(raw);
            assert_eq!(err.field(), Some(field), "{raw}");
            assert!(err.to_string().contains("craneAnchorHeight"), "{raw}");
        }

        let tallest = parse_config(r#"{ "floors": 8 }"#).expect("eight floors fit");
        assert_eq!(tallest.floors, 8);
    }

    #[test]
    fn malformed_json_reports_the_path() {
        let err = parse_config(r##"{ "palette": ["#E8D5B7", "beige"] }"##).expect_err("colour");
        match &err {
            ConfigError::Parse { path, .. } => assert_eq!(path, "palette[1]"),
            other => panic!("unexpected error: {other}"),
        }

        let err = parse_config(r#"{ "floors": "four" }"#).expect_err("type");
        assert_eq!(err.field(), Some("floors"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_config(r#"{ "flors": 3 }"#).expect_err("unknown");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "floors": 2, "debrisCount": 8, "timeScale": 0.5 }}"#).expect("write");

        let config = load_config(file.path()).expect("load");
        assert_eq!(config.floors, 2);
        assert_eq!(config.debris_count, 8);
        assert_eq!(config.seconds(1.5), 0.75);
    }

    #[test]
    fn load_config_reports_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.json");
        let err = load_config(&path).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(err.field(), None);
    }
}
