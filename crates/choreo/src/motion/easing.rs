use std::f32::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_BACK_OVERSHOOT: f32 = 1.70158;
pub const DEFAULT_ELASTIC_AMPLITUDE: f32 = 1.0;
pub const DEFAULT_ELASTIC_PERIOD: f32 = 0.3;

/// Easing curves, named after the `family.direction(params)` strings used by
/// web animation tooling (`"power2.out"`, `"back.out(1.5)"`, ...).
///
/// `Power` levels follow that naming: level 1 is quadratic, level 2 cubic.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    #[default]
    Linear,
    PowerIn(u8),
    PowerOut(u8),
    PowerInOut(u8),
    SineInOut,
    BackOut(f32),
    ElasticOut {
        amplitude: f32,
        period: f32,
    },
    BounceOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown easing '{name}'")]
pub struct EasingParseError {
    pub name: String,
}

impl Easing {
    pub fn elastic_out() -> Self {
        Self::ElasticOut {
            amplitude: DEFAULT_ELASTIC_AMPLITUDE,
            period: DEFAULT_ELASTIC_PERIOD,
        }
    }

    /// Maps linear progress in `[0, 1]` onto the curve. Endpoints are exact.
    pub fn apply(self, progress: f32) -> f32 {
        if progress <= 0.0 {
            return 0.0;
        }
        if progress >= 1.0 {
            return 1.0;
        }
        let p = progress;
        match self {
            Self::Linear => p,
            Self::PowerIn(level) => p.powi(power_exponent(level)),
            Self::PowerOut(level) => 1.0 - (1.0 - p).powi(power_exponent(level)),
            Self::PowerInOut(level) => {
                let exponent = power_exponent(level);
                if p < 0.5 {
                    (2.0 * p).powi(exponent) / 2.0
                } else {
                    1.0 - (2.0 * (1.0 - p)).powi(exponent) / 2.0
                }
            }
            Self::SineInOut => -((PI * p).cos() - 1.0) / 2.0,
            Self::BackOut(overshoot) => {
                let q = p - 1.0;
                1.0 + (overshoot + 1.0) * q * q * q + overshoot * q * q
            }
            Self::ElasticOut { amplitude, period } => {
                let amplitude = amplitude.max(1.0);
                let period = if period > 0.0 {
                    period
                } else {
                    DEFAULT_ELASTIC_PERIOD
                };
                let phase = period / TAU * (1.0 / amplitude).asin();
                amplitude * 2f32.powf(-10.0 * p) * ((p - phase) * TAU / period).sin() + 1.0
            }
            Self::BounceOut => bounce_out(p),
        }
    }
}

fn power_exponent(level: u8) -> i32 {
    i32::from(level.max(1)) + 1
}

fn bounce_out(p: f32) -> f32 {
    const N: f32 = 7.5625;
    const D: f32 = 2.75;
    if p < 1.0 / D {
        N * p * p
    } else if p < 2.0 / D {
        let q = p - 1.5 / D;
        N * q * q + 0.75
    } else if p < 2.5 / D {
        let q = p - 2.25 / D;
        N * q * q + 0.9375
    } else {
        let q = p - 2.625 / D;
        N * q * q + 0.984375
    }
}

impl FromStr for Easing {
    type Err = EasingParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let unknown = || EasingParseError {
            name: raw.to_string(),
        };
        let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
        let (head, params) = match compact.split_once('(') {
            Some((head, rest)) => {
                let inner = rest.strip_suffix(')').ok_or_else(unknown)?;
                let params = inner
                    .split(',')
                    .filter(|value| !value.is_empty())
                    .map(|value| value.parse::<f32>().map_err(|_| unknown()))
                    .collect::<Result<Vec<_>, _>>()?;
                (head.to_string(), params)
            }
            None => (compact, Vec::new()),
        };

        let (family, direction) = head.split_once('.').unwrap_or((head.as_str(), "out"));
        let easing = match (family, direction) {
            ("none" | "linear", _) => Self::Linear,
            ("sine", "inOut") => Self::SineInOut,
            ("back", "out") => {
                Self::BackOut(params.first().copied().unwrap_or(DEFAULT_BACK_OVERSHOOT))
            }
            ("elastic", "out") => Self::ElasticOut {
                amplitude: params.first().copied().unwrap_or(DEFAULT_ELASTIC_AMPLITUDE),
                period: params.get(1).copied().unwrap_or(DEFAULT_ELASTIC_PERIOD),
            },
            ("bounce", "out") => Self::BounceOut,
            (power, direction) if power.starts_with("power") => {
                let level = power["power".len()..]
                    .parse::<u8>()
                    .map_err(|_| unknown())?;
                if level == 0 {
                    Self::Linear
                } else {
                    match direction {
                        "in" => Self::PowerIn(level),
                        "out" => Self::PowerOut(level),
                        "inOut" => Self::PowerInOut(level),
                        _ => return Err(unknown()),
                    }
                }
            }
            _ => return Err(unknown()),
        };
        Ok(easing)
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("none"),
            Self::PowerIn(level) => write!(f, "power{level}.in"),
            Self::PowerOut(level) => write!(f, "power{level}.out"),
            Self::PowerInOut(level) => write!(f, "power{level}.inOut"),
            Self::SineInOut => f.write_str("sine.inOut"),
            Self::BackOut(overshoot) => write!(f, "back.out({overshoot})"),
            Self::ElasticOut { amplitude, period } => {
                write!(f, "elastic.out({amplitude}, {period})")
            }
            Self::BounceOut => f.write_str("bounce.out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_easings() -> Vec<Easing> {
        vec![
            Easing::Linear,
            Easing::PowerIn(1),
            Easing::PowerOut(2),
            Easing::PowerInOut(3),
            Easing::SineInOut,
            Easing::BackOut(1.5),
            Easing::elastic_out(),
            Easing::BounceOut,
        ]
    }

    #[test]
    fn endpoints_are_exact_for_every_curve() {
        for easing in all_easings() {
            assert_eq!(easing.apply(0.0), 0.0, "{easing}");
            assert_eq!(easing.apply(1.0), 1.0, "{easing}");
            assert_eq!(easing.apply(-0.5), 0.0, "{easing}");
            assert_eq!(easing.apply(1.5), 1.0, "{easing}");
        }
    }

    #[test]
    fn power_levels_follow_named_exponents() {
        assert!((Easing::PowerIn(1).apply(0.5) - 0.25).abs() < 0.0001);
        assert!((Easing::PowerIn(2).apply(0.5) - 0.125).abs() < 0.0001);
        assert!((Easing::PowerOut(2).apply(0.5) - 0.875).abs() < 0.0001);
        assert!((Easing::PowerInOut(1).apply(0.5) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn back_and_elastic_overshoot_before_settling() {
        let back_peak = (1..100)
            .map(|step| Easing::BackOut(1.5).apply(step as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(back_peak > 1.0);

        let elastic_peak = (1..100)
            .map(|step| Easing::elastic_out().apply(step as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(elastic_peak > 1.0);
    }

    #[test]
    fn bounce_stays_within_unit_range() {
        for step in 0..=100 {
            let value = Easing::BounceOut.apply(step as f32 / 100.0);
            assert!((0.0..=1.0001).contains(&value), "{value}");
        }
    }

    #[test]
    fn parses_named_curves() {
        assert_eq!("none".parse::<Easing>(), Ok(Easing::Linear));
        assert_eq!("power2.out".parse::<Easing>(), Ok(Easing::PowerOut(2)));
        assert_eq!("power1.inOut".parse::<Easing>(), Ok(Easing::PowerInOut(1)));
        assert_eq!("power3.in".parse::<Easing>(), Ok(Easing::PowerIn(3)));
        assert_eq!("power2".parse::<Easing>(), Ok(Easing::PowerOut(2)));
        assert_eq!("back.out(1.5)".parse::<Easing>(), Ok(Easing::BackOut(1.5)));
        assert_eq!(
            "back.out".parse::<Easing>(),
            Ok(Easing::BackOut(DEFAULT_BACK_OVERSHOOT))
        );
        assert_eq!(
            "elastic.out(1, 0.4)".parse::<Easing>(),
            Ok(Easing::ElasticOut {
                amplitude: 1.0,
                period: 0.4
            })
        );
        assert_eq!("bounce.out".parse::<Easing>(), Ok(Easing::BounceOut));
        assert_eq!("sine.inOut".parse::<Easing>(), Ok(Easing::SineInOut));
    }

    #[test]
    fn rejects_unknown_curves() {
        for raw in ["wobble.out", "power2.sideways", "back.out(1.5", "powerX.in", "back.out(a)"] {
            let err = raw.parse::<Easing>().expect_err("should reject");
            assert_eq!(err.name, raw);
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        for easing in all_easings() {
            let parsed: Easing = easing.to_string().parse().expect("parse display");
            assert_eq!(parsed, easing);
        }
    }
}
