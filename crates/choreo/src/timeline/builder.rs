use std::collections::HashMap;
use std::fmt;

use crate::motion::Tween;

use super::player::Cue;
use super::position::IntoPosition;
use super::types::{check_duration, Repeat, TimelineError};

pub type Callback<S> = Box<dyn FnMut(&mut Cue<'_, S>)>;

/// One authored unit of a timeline.
pub enum Step<S> {
    Tween(Tween),
    /// Zero-duration side effect.
    Call(Callback<S>),
    Wait(f32),
    Label(String),
}

impl<S> Step<S> {
    pub fn tween(tween: Tween) -> Self {
        Self::Tween(tween)
    }

    pub fn call<F>(callback: F) -> Self
    where
        F: FnMut(&mut Cue<'_, S>) + 'static,
    {
        Self::Call(Box::new(callback))
    }

    pub fn wait(seconds: f32) -> Self {
        Self::Wait(seconds)
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(name.into())
    }
}

impl<S> From<Tween> for Step<S> {
    fn from(value: Tween) -> Self {
        Self::Tween(value)
    }
}

impl<S> fmt::Debug for Step<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tween(tween) => f.debug_tuple("Tween").field(tween).finish(),
            Self::Call(_) => f.write_str("Call(..)"),
            Self::Wait(seconds) => f.debug_tuple("Wait").field(seconds).finish(),
            Self::Label(name) => f.debug_tuple("Label").field(name).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduledTween {
    pub(crate) at: f32,
    pub(crate) order: usize,
    pub(crate) tween: Tween,
}

impl ScheduledTween {
    pub(crate) fn end(&self) -> f32 {
        self.at + self.tween.total_duration()
    }
}

pub(crate) struct ScheduledCall<S> {
    pub(crate) at: f32,
    pub(crate) order: usize,
    pub(crate) callback: Callback<S>,
}

/// Authoring surface for a timeline. Every method validates eagerly, so a
/// builder that produced no error builds into a playable [`Timeline`].
pub struct TimelineBuilder<S> {
    name: String,
    tweens: Vec<ScheduledTween>,
    calls: Vec<ScheduledCall<S>>,
    labels: HashMap<String, f32>,
    next_order: usize,
    cursor: f32,
    previous_start: f32,
    repeat: Repeat,
    repeat_delay: f32,
    on_cycle_start: Option<Callback<S>>,
}

impl<S> TimelineBuilder<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tweens: Vec::new(),
            calls: Vec::new(),
            labels: HashMap::new(),
            next_order: 0,
            cursor: 0.0,
            previous_start: 0.0,
            repeat: Repeat::Once,
            repeat_delay: 0.0,
            on_cycle_start: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// End of the latest-ending step authored so far.
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn label_time(&self, name: &str) -> Option<f32> {
        self.labels.get(name).copied()
    }

    /// Places each step at the cursor, one after another.
    pub fn sequence<I>(&mut self, steps: I) -> Result<&mut Self, TimelineError>
    where
        I: IntoIterator<Item = Step<S>>,
    {
        for step in steps {
            let at = self.cursor;
            self.place(step, at)?;
        }
        Ok(self)
    }

    /// Starts every step at the same resolved instant.
    pub fn parallel<I, P>(&mut self, steps: I, anchor: P) -> Result<&mut Self, TimelineError>
    where
        I: IntoIterator<Item = Step<S>>,
        P: IntoPosition,
    {
        let at = self.resolve(anchor)?;
        for step in steps {
            self.place(step, at)?;
        }
        Ok(self)
    }

    pub fn tween(&mut self, tween: Tween) -> Result<&mut Self, TimelineError> {
        self.sequence([Step::Tween(tween)])
    }

    pub fn tween_at<P: IntoPosition>(
        &mut self,
        tween: Tween,
        anchor: P,
    ) -> Result<&mut Self, TimelineError> {
        self.parallel([Step::Tween(tween)], anchor)
    }

    pub fn call<F>(&mut self, callback: F) -> Result<&mut Self, TimelineError>
    where
        F: FnMut(&mut Cue<'_, S>) + 'static,
    {
        self.sequence([Step::call(callback)])
    }

    pub fn call_at<F, P>(&mut self, callback: F, anchor: P) -> Result<&mut Self, TimelineError>
    where
        F: FnMut(&mut Cue<'_, S>) + 'static,
        P: IntoPosition,
    {
        self.parallel([Step::call(callback)], anchor)
    }

    pub fn wait(&mut self, seconds: f32) -> Result<&mut Self, TimelineError> {
        self.sequence([Step::Wait(seconds)])
    }

    pub fn label(&mut self, name: impl Into<String>) -> Result<&mut Self, TimelineError> {
        self.sequence([Step::Label(name.into())])
    }

    pub fn label_at<P: IntoPosition>(
        &mut self,
        name: impl Into<String>,
        anchor: P,
    ) -> Result<&mut Self, TimelineError> {
        self.parallel([Step::Label(name.into())], anchor)
    }

    /// Replays the body after each cycle, separated by `repeat_delay` seconds.
    pub fn repeat(&mut self, repeat: Repeat, repeat_delay: f32) -> Result<&mut Self, TimelineError> {
        self.repeat_delay = check_duration("repeat delay", repeat_delay)?;
        self.repeat = repeat;
        Ok(self)
    }

    /// Runs before any body step of every cycle, the first one included.
    pub fn on_cycle_start<F>(&mut self, reset: F) -> &mut Self
    where
        F: FnMut(&mut Cue<'_, S>) + 'static,
    {
        self.on_cycle_start = Some(Box::new(reset));
        self
    }

    pub fn build(self) -> Result<Timeline<S>, TimelineError> {
        let body_length = self.cursor;
        if self.repeat == Repeat::Infinite && body_length + self.repeat_delay <= 0.0 {
            return Err(TimelineError::EmptyLoop {
                timeline: self.name,
            });
        }
        Ok(Timeline {
            name: self.name,
            tweens: self.tweens,
            calls: self.calls,
            labels: self.labels,
            body_length,
            repeat: self.repeat,
            repeat_delay: self.repeat_delay,
            on_cycle_start: self.on_cycle_start,
        })
    }

    fn resolve<P: IntoPosition>(&self, anchor: P) -> Result<f32, TimelineError> {
        anchor
            .into_position()?
            .resolve(self.cursor, self.previous_start, &self.labels)
    }

    fn place(&mut self, step: Step<S>, at: f32) -> Result<(), TimelineError> {
        let end = match step {
            Step::Tween(tween) => {
                check_duration("tween duration", tween.pass_duration())?;
                check_duration("tween delay", tween.start_delay())?;
                if let Some(gain) = tween.validate_gains() {
                    return Err(TimelineError::InvalidGain { gain });
                }
                let scheduled = ScheduledTween {
                    at,
                    order: self.take_order(),
                    tween,
                };
                let end = scheduled.end();
                self.tweens.push(scheduled);
                self.previous_start = at;
                end
            }
            Step::Call(callback) => {
                let order = self.take_order();
                self.calls.push(ScheduledCall {
                    at,
                    order,
                    callback,
                });
                self.previous_start = at;
                at
            }
            Step::Wait(seconds) => {
                let seconds = check_duration("wait", seconds)?;
                self.previous_start = at;
                at + seconds
            }
            Step::Label(name) => {
                if self.labels.contains_key(&name) {
                    return Err(TimelineError::DuplicateLabel { label: name });
                }
                self.labels.insert(name, at);
                at
            }
        };
        self.cursor = self.cursor.max(end);
        Ok(())
    }

    fn take_order(&mut self) -> usize {
        let order = self.next_order;
        self.next_order += 1;
        order
    }
}

/// A fully authored, validated timeline ready for playback.
pub struct Timeline<S> {
    pub(crate) name: String,
    pub(crate) tweens: Vec<ScheduledTween>,
    pub(crate) calls: Vec<ScheduledCall<S>>,
    pub(crate) labels: HashMap<String, f32>,
    pub(crate) body_length: f32,
    pub(crate) repeat: Repeat,
    pub(crate) repeat_delay: f32,
    pub(crate) on_cycle_start: Option<Callback<S>>,
}

impl<S> Timeline<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// End of the last step of one pass.
    pub fn duration(&self) -> f32 {
        self.body_length
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn repeat_delay(&self) -> f32 {
        self.repeat_delay
    }

    pub fn label_time(&self, name: &str) -> Option<f32> {
        self.labels.get(name).copied()
    }

    pub fn tween_count(&self) -> usize {
        self.tweens.len()
    }

    pub fn callback_count(&self) -> usize {
        self.calls.len()
    }
}

impl<S> fmt::Debug for Timeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("name", &self.name)
            .field("duration", &self.body_length)
            .field("tweens", &self.tweens.len())
            .field("calls", &self.calls.len())
            .field("labels", &self.labels)
            .field("repeat", &self.repeat)
            .field("repeat_delay", &self.repeat_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::{ActorId, ActorRegistry, Field};

    const EPSILON: f32 = 0.0001;

    fn truck() -> ActorId {
        let mut registry = ActorRegistry::new();
        registry.register("truck").expect("truck")
    }

    fn move_x(seconds: f32) -> Tween {
        Tween::to(truck(), Field::PositionX, 3.0).duration(seconds)
    }

    #[test]
    fn sequence_places_steps_back_to_back() {
        let mut builder = TimelineBuilder::<()>::new("test");
        builder
            .sequence([
                Step::tween(move_x(1.5)),
                Step::label("arrived"),
                Step::wait(0.5),
                Step::tween(move_x(1.0)),
            ])
            .expect("sequence");

        assert_eq!(builder.label_time("arrived"), Some(1.5));
        assert!((builder.cursor() - 3.0).abs() < EPSILON);
        let timeline = builder.build().expect("build");
        assert_eq!(timeline.tween_count(), 2);
        assert!((timeline.tweens[1].at - 2.0).abs() < EPSILON);
    }

    #[test]
    fn parallel_starts_together_and_cursor_takes_longest() {
        let mut builder = TimelineBuilder::<()>::new("test");
        builder.tween(move_x(1.0)).expect("first");
        builder
            .parallel([Step::tween(move_x(0.5)), Step::tween(move_x(2.0))], "<")
            .expect("parallel");

        assert!((builder.cursor() - 2.0).abs() < EPSILON);
        let timeline = builder.build().expect("build");
        assert_eq!(timeline.tweens[1].at, 0.0);
        assert_eq!(timeline.tweens[2].at, 0.0);
    }

    #[test]
    fn relative_and_label_anchors_resolve_against_cursor_and_labels() {
        let mut builder = TimelineBuilder::<()>::new("test");
        builder.tween(move_x(2.0)).expect("drive");
        builder.label("stopped").expect("label");
        builder.tween_at(move_x(1.0), "-=0.5").expect("overlap");
        builder.label_at("late", "stopped+=3").expect("late");
        builder.tween_at(move_x(0.25), "stopped-=0.25").expect("early");

        let timeline = builder.build().expect("build");
        assert!((timeline.tweens[1].at - 1.5).abs() < EPSILON);
        assert!((timeline.tweens[2].at - 1.75).abs() < EPSILON);
        assert_eq!(timeline.label_time("late"), Some(5.0));
        assert!((timeline.duration() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn anchored_steps_never_pull_the_cursor_back() {
        let mut builder = TimelineBuilder::<()>::new("test");
        builder.tween(move_x(4.0)).expect("long");
        builder.tween_at(move_x(1.0), 0.0).expect("early");
        builder.tween(move_x(1.0)).expect("append");

        let timeline = builder.build().expect("build");
        assert!((timeline.tweens[2].at - 4.0).abs() < EPSILON);
    }

    #[test]
    fn tween_delay_extends_the_step() {
        let mut builder = TimelineBuilder::<()>::new("test");
        builder.tween(move_x(1.0).delay(0.5)).expect("delayed");
        let timeline = builder.build().expect("build");
        let delayed = &timeline.tweens[0];
        assert_eq!(delayed.at, 0.0);
        assert!((delayed.tween.start_delay() - 0.5).abs() < EPSILON);
        assert!((delayed.end() - 1.5).abs() < EPSILON);
        assert!((timeline.duration() - 1.5).abs() < EPSILON);
    }

    #[test]
    fn unknown_label_is_rejected_at_authoring_time() {
        let mut builder = TimelineBuilder::<()>::new("test");
        let err = builder
            .call_at(|_| {}, "impact+=0.1")
            .map(|_| ())
            .expect_err("unknown label");
        assert_eq!(
            err,
            TimelineError::UnknownLabel {
                label: "impact".to_string()
            }
        );
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut builder = TimelineBuilder::<()>::new("test");
        builder.label("impact").expect("first");
        let err = builder.label("impact").map(|_| ()).expect_err("duplicate");
        assert!(matches!(err, TimelineError::DuplicateLabel { .. }));
    }

    #[test]
    fn negative_durations_and_invalid_gains_are_rejected() {
        let mut builder = TimelineBuilder::<()>::new("test");
        assert!(matches!(
            builder.tween(move_x(-1.0)).map(|_| ()),
            Err(TimelineError::NegativeDuration { .. })
        ));
        assert!(matches!(
            builder.tween(move_x(1.0).delay(f32::NAN)).map(|_| ()),
            Err(TimelineError::NegativeDuration { .. })
        ));
        assert!(matches!(
            builder.wait(-0.1).map(|_| ()),
            Err(TimelineError::NegativeDuration { .. })
        ));
        assert!(matches!(
            builder.repeat(Repeat::Infinite, -0.5).map(|_| ()),
            Err(TimelineError::NegativeDuration { .. })
        ));
        let zero_gain = move_x(1.0).linked(truck(), Field::PositionZ, 0.0);
        assert!(matches!(
            builder.tween(zero_gain).map(|_| ()),
            Err(TimelineError::InvalidGain { .. })
        ));
    }

    #[test]
    fn infinite_empty_loop_is_rejected() {
        let mut builder = TimelineBuilder::<()>::new("empty");
        builder.call(|_| {}).expect("call");
        builder.repeat(Repeat::Infinite, 0.0).expect("repeat");
        let err = builder.build().expect_err("empty loop");
        assert_eq!(
            err,
            TimelineError::EmptyLoop {
                timeline: "empty".to_string()
            }
        );

        let mut delayed = TimelineBuilder::<()>::new("delayed");
        delayed.repeat(Repeat::Infinite, 0.5).expect("repeat");
        assert!(delayed.build().is_ok());
    }
}
