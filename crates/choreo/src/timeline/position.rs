use std::collections::HashMap;
use std::fmt;

use super::types::TimelineError;

/// Where a step is placed on a timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    /// At the cursor: the end of the latest-ending step so far.
    End,
    Absolute(f32),
    /// Offset from the cursor (`"+=0.5"`, `"-=0.5"`).
    Relative(f32),
    /// Offset from the start of the most recently placed step (`"<"`, `"<+=0.2"`).
    PreviousStart(f32),
    Label { name: String, offset: f32 },
}

impl Position {
    pub fn label(name: impl Into<String>) -> Self {
        Self::Label {
            name: name.into(),
            offset: 0.0,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, TimelineError> {
        let invalid = || TimelineError::InvalidPosition {
            raw: raw.to_string(),
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        if let Some(rest) = trimmed.strip_prefix('<') {
            if rest.is_empty() {
                return Ok(Self::PreviousStart(0.0));
            }
            return parse_offset(rest).map(Self::PreviousStart).ok_or_else(invalid);
        }

        if trimmed.starts_with("+=") || trimmed.starts_with("-=") {
            return parse_offset(trimmed).map(Self::Relative).ok_or_else(invalid);
        }

        if let Ok(seconds) = trimmed.parse::<f32>() {
            if !seconds.is_finite() {
                return Err(invalid());
            }
            return Ok(Self::Absolute(seconds));
        }

        let split = trimmed
            .find("+=")
            .or_else(|| trimmed.find("-="))
            .map(|index| trimmed.split_at(index));
        match split {
            Some((name, offset)) => {
                let offset = parse_offset(offset).ok_or_else(invalid)?;
                if !is_label_name(name) {
                    return Err(invalid());
                }
                Ok(Self::Label {
                    name: name.to_string(),
                    offset,
                })
            }
            None if is_label_name(trimmed) => Ok(Self::label(trimmed)),
            None => Err(invalid()),
        }
    }

    /// Resolves the position to seconds on the timeline.
    pub fn resolve(
        &self,
        cursor: f32,
        previous_start: f32,
        labels: &HashMap<String, f32>,
    ) -> Result<f32, TimelineError> {
        let time = match self {
            Self::End => cursor,
            Self::Absolute(seconds) => *seconds,
            Self::Relative(offset) => cursor + offset,
            Self::PreviousStart(offset) => previous_start + offset,
            Self::Label { name, offset } => {
                let base = labels
                    .get(name)
                    .copied()
                    .ok_or_else(|| TimelineError::UnknownLabel {
                        label: name.clone(),
                    })?;
                base + offset
            }
        };
        if !time.is_finite() {
            return Err(TimelineError::InvalidPosition {
                raw: self.to_string(),
            });
        }
        if time < 0.0 {
            return Err(TimelineError::NegativeTime {
                raw: self.to_string(),
                time,
            });
        }
        Ok(time)
    }
}

fn parse_offset(raw: &str) -> Option<f32> {
    let (sign, magnitude) = if let Some(rest) = raw.strip_prefix("+=") {
        (1.0, rest)
    } else if let Some(rest) = raw.strip_prefix("-=") {
        (-1.0, rest)
    } else {
        return None;
    };
    let value = magnitude.trim().parse::<f32>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(sign * value)
}

fn is_label_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|ch: char| ch.is_ascii_digit() || ch == '-' || ch == '+')
        && !name.contains(char::is_whitespace)
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::End => f.write_str(">"),
            Self::Absolute(seconds) => write!(f, "{seconds}"),
            Self::Relative(offset) => write_offset(f, "", *offset),
            Self::PreviousStart(offset) if *offset == 0.0 => f.write_str("<"),
            Self::PreviousStart(offset) => write_offset(f, "<", *offset),
            Self::Label { name, offset } if *offset == 0.0 => f.write_str(name),
            Self::Label { name, offset } => write_offset(f, name, *offset),
        }
    }
}

fn write_offset(f: &mut fmt::Formatter<'_>, prefix: &str, offset: f32) -> fmt::Result {
    if offset < 0.0 {
        write!(f, "{prefix}-={}", -offset)
    } else {
        write!(f, "{prefix}+={offset}")
    }
}

/// Anything the builder accepts as a step position.
pub trait IntoPosition {
    fn into_position(self) -> Result<Position, TimelineError>;
}

impl IntoPosition for Position {
    fn into_position(self) -> Result<Position, TimelineError> {
        Ok(self)
    }
}

impl IntoPosition for &str {
    fn into_position(self) -> Result<Position, TimelineError> {
        Position::parse(self)
    }
}

impl IntoPosition for String {
    fn into_position(self) -> Result<Position, TimelineError> {
        Position::parse(&self)
    }
}

impl IntoPosition for &String {
    fn into_position(self) -> Result<Position, TimelineError> {
        Position::parse(self)
    }
}

impl IntoPosition for f32 {
    fn into_position(self) -> Result<Position, TimelineError> {
        if self.is_finite() {
            Ok(Position::Absolute(self))
        } else {
            Err(TimelineError::InvalidPosition {
                raw: self.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> HashMap<String, f32> {
        HashMap::from([("impact".to_string(), 10.0), ("floor-0-placed".to_string(), 4.0)])
    }

    #[test]
    fn parses_every_anchor_form() {
        assert_eq!(Position::parse("<"), Ok(Position::PreviousStart(0.0)));
        assert_eq!(Position::parse("<+=0.2"), Ok(Position::PreviousStart(0.2)));
        assert_eq!(Position::parse("+=0.5"), Ok(Position::Relative(0.5)));
        assert_eq!(Position::parse("-=0.5"), Ok(Position::Relative(-0.5)));
        assert_eq!(Position::parse("1.25"), Ok(Position::Absolute(1.25)));
        assert_eq!(Position::parse("impact"), Ok(Position::label("impact")));
        assert_eq!(
            Position::parse("impact+=0.3"),
            Ok(Position::Label {
                name: "impact".to_string(),
                offset: 0.3
            })
        );
        assert_eq!(
            Position::parse("floor-0-placed-=0.2"),
            Ok(Position::Label {
                name: "floor-0-placed".to_string(),
                offset: -0.2
            })
        );
    }

    #[test]
    fn rejects_malformed_anchors() {
        for raw in ["", "+=", "+=abc", "impact+=", "impact+=-1", "<<", "two words", "NaN"] {
            let err = Position::parse(raw).expect_err(raw);
            assert!(matches!(err, TimelineError::InvalidPosition { .. }), "{raw}");
        }
    }

    #[test]
    fn resolve_uses_cursor_previous_start_and_labels() {
        let labels = labels();
        let resolve = |raw: &str| {
            Position::parse(raw)
                .and_then(|position| position.resolve(6.0, 5.0, &labels))
                .expect(raw)
        };
        assert_eq!(Position::End.resolve(6.0, 5.0, &labels), Ok(6.0));
        assert!((resolve("+=0.5") - 6.5).abs() < 0.0001);
        assert!((resolve("-=0.5") - 5.5).abs() < 0.0001);
        assert!((resolve("<") - 5.0).abs() < 0.0001);
        assert!((resolve("impact-=0.2") - 9.8).abs() < 0.0001);
        assert!((resolve("floor-0-placed") - 4.0).abs() < 0.0001);
        assert!((resolve("2") - 2.0).abs() < 0.0001);
    }

    #[test]
    fn resolve_reports_unknown_label_and_negative_time() {
        let labels = labels();
        assert_eq!(
            Position::label("demolish").resolve(0.0, 0.0, &labels),
            Err(TimelineError::UnknownLabel {
                label: "demolish".to_string()
            })
        );
        let err = Position::Relative(-1.0)
            .resolve(0.5, 0.0, &labels)
            .expect_err("negative");
        assert!(matches!(err, TimelineError::NegativeTime { .. }));
    }

    #[test]
    fn into_position_accepts_strings_and_seconds() {
        assert_eq!("<".into_position(), Ok(Position::PreviousStart(0.0)));
        assert_eq!(String::from("impact").into_position(), Ok(Position::label("impact")));
        assert_eq!(2.5f32.into_position(), Ok(Position::Absolute(2.5)));
        assert!(f32::NAN.into_position().is_err());
    }

    #[test]
    fn display_matches_parse_format() {
        for raw in ["<", "<+=0.2", "+=0.5", "-=0.5", "impact", "impact-=0.2", "1.5"] {
            let position = Position::parse(raw).expect(raw);
            assert_eq!(position.to_string(), raw);
        }
    }
}
