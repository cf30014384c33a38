mod easing;
mod kinematics;
mod tween;

pub use easing::{
    Easing, EasingParseError, DEFAULT_BACK_OVERSHOOT, DEFAULT_ELASTIC_AMPLITUDE,
    DEFAULT_ELASTIC_PERIOD,
};
pub use kinematics::{
    bearing_or, bearing_to, drop_distance, floor_drop_height, nearest_heading,
    stack_pickup_height, stacked_center_height, Xz,
};
pub use tween::{
    interpolate, Binding, Channel, Tween, DEFAULT_TWEEN_DURATION, DEFAULT_TWEEN_EASE,
};
