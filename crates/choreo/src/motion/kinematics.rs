//! Derived crane kinematics.
//!
//! Bearing convention: `atan2(dx, dz)`. A yaw of 0 faces +Z and the angle grows
//! toward +X, so `bearing_to((0,0), (0,1)) == 0` and
//! `bearing_to((0,0), (1,0)) == PI / 2`.

use std::f32::consts::{PI, TAU};

use crate::actors::Vec3;

/// A point on the ground plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Xz {
    pub x: f32,
    pub z: f32,
}

impl Xz {
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }
}

impl From<Vec3> for Xz {
    fn from(value: Vec3) -> Self {
        Self {
            x: value.x,
            z: value.z,
        }
    }
}

/// Yaw a turret at `origin` must rotate to face `target`.
///
/// Coincident points yield `atan2(0, 0) == 0`; use [`bearing_or`] when the
/// previous heading should be kept instead.
pub fn bearing_to(origin: Xz, target: Xz) -> f32 {
    (target.x - origin.x).atan2(target.z - origin.z)
}

pub fn bearing_or(origin: Xz, target: Xz, previous: f32) -> f32 {
    if origin == target {
        return previous;
    }
    bearing_to(origin, target)
}

/// `target` shifted by whole turns so that a rotation from `current` takes the
/// short way round.
pub fn nearest_heading(current: f32, target: f32) -> f32 {
    let delta = (target - current).rem_euclid(TAU);
    if delta > PI {
        current + delta - TAU
    } else {
        current + delta
    }
}

/// How far a hook hanging from `anchor_height` travels down to reach
/// `target_height`. Hook offset is `-distance`, cable length is `distance`.
pub fn drop_distance(anchor_height: f32, target_height: f32) -> f32 {
    anchor_height - target_height
}

/// Centre height of stacked block `index` resting on a surface at `base`.
pub fn stacked_center_height(base: f32, index: usize, block_height: f32) -> f32 {
    base + index as f32 * block_height + block_height / 2.0
}

/// Resting centre of building floor `floor_index` above the foundation.
pub fn floor_drop_height(base_offset: f32, floor_index: usize, block_height: f32) -> f32 {
    stacked_center_height(base_offset, floor_index, block_height)
}

pub fn stack_pickup_height(bed_height: f32, stack_index: usize, block_height: f32) -> f32 {
    stacked_center_height(bed_height, stack_index, block_height)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    const EPSILON: f32 = 0.0001;

    #[test]
    fn bearing_follows_atan2_dx_dz_convention() {
        let origin = Xz::new(0.0, 0.0);
        assert_eq!(bearing_to(origin, Xz::new(0.0, 1.0)), 0.0);
        assert!((bearing_to(origin, Xz::new(1.0, 0.0)) - FRAC_PI_2).abs() < EPSILON);
        assert!((bearing_to(origin, Xz::new(0.0, -1.0)) - PI).abs() < EPSILON);
        assert!((bearing_to(origin, Xz::new(-1.0, 0.0)) + FRAC_PI_2).abs() < EPSILON);
    }

    #[test]
    fn bearing_is_translation_invariant() {
        let crane = Xz::new(-2.0, -2.0);
        let truck = Xz::new(3.0, 2.0);
        let shifted = bearing_to(Xz::new(0.0, 0.0), Xz::new(5.0, 4.0));
        assert!((bearing_to(crane, truck) - shifted).abs() < EPSILON);
        assert!((bearing_to(crane, truck) - 0.896_055).abs() < 0.001);
    }

    #[test]
    fn coincident_points_have_documented_zero_bearing() {
        let point = Xz::new(4.0, -1.0);
        assert_eq!(bearing_to(point, point), 0.0);
    }

    #[test]
    fn bearing_or_keeps_previous_for_coincident_points() {
        let point = Xz::new(4.0, -1.0);
        assert_eq!(bearing_or(point, point, 1.25), 1.25);
        assert!((bearing_or(point, Xz::new(5.0, -1.0), 1.25) - FRAC_PI_2).abs() < EPSILON);
    }

    #[test]
    fn nearest_heading_takes_the_short_way() {
        assert!((nearest_heading(0.0, FRAC_PI_2) - FRAC_PI_2).abs() < EPSILON);
        assert!((nearest_heading(3.0, -3.0) - (TAU - 3.0)).abs() < EPSILON);
        assert!((nearest_heading(-3.0, 3.0) - (3.0 - TAU)).abs() < EPSILON);
        assert!((nearest_heading(4.0 * PI, 0.1) - (4.0 * PI + 0.1)).abs() < 0.001);
    }

    #[test]
    fn drop_distance_is_anchor_minus_target() {
        assert_eq!(drop_distance(10.0, 4.0), 6.0);
        assert_eq!(drop_distance(6.0, 6.0), 0.0);
        assert_eq!(drop_distance(6.0, 7.0), -1.0);
    }

    #[test]
    fn floor_and_pickup_heights_share_the_stack_formula() {
        assert!((floor_drop_height(0.2, 3, 0.6) - 2.3).abs() < EPSILON);
        assert!((stack_pickup_height(0.9, 1, 0.6) - 1.8).abs() < EPSILON);
    }

    #[test]
    fn stacked_heights_increase_by_block_height() {
        let base = 0.2;
        let height = 0.6;
        assert!((stacked_center_height(base, 0, height) - 0.5).abs() < EPSILON);
        for index in 1..16 {
            let below = stacked_center_height(base, index - 1, height);
            let here = stacked_center_height(base, index, height);
            assert!(here > below);
            assert!((here - below - height).abs() < EPSILON);
        }
    }
}
