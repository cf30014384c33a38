use crate::actors::{ActorId, ActorRegistry, Field};

use super::easing::Easing;

pub const DEFAULT_TWEEN_DURATION: f32 = 0.5;
pub const DEFAULT_TWEEN_EASE: Easing = Easing::PowerOut(1);

/// One field written by a channel: `field = channel_value * gain`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub actor: ActorId,
    pub field: Field,
    pub gain: f32,
}

impl Binding {
    fn read(&self, actors: &ActorRegistry) -> f32 {
        actors.field(self.actor, self.field) / self.gain
    }

    fn write(&self, actors: &mut ActorRegistry, value: f32) {
        actors.set_field(self.actor, self.field, value * self.gain);
    }
}

/// A single animated scalar. Every binding is written from the same value in
/// the same update.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    bindings: Vec<Binding>,
    target: f32,
}

impl Channel {
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Start value in channel units, read through the first binding.
    pub fn sample(&self, actors: &ActorRegistry) -> f32 {
        self.bindings[0].read(actors)
    }

    pub fn write(&self, actors: &mut ActorRegistry, value: f32) {
        for binding in &self.bindings {
            binding.write(actors, value);
        }
    }
}

/// Animation of one or more actor fields toward explicit end values.
///
/// Start values are implicit: the player samples them when the tween begins.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    channels: Vec<Channel>,
    duration: f32,
    delay: f32,
    ease: Easing,
    repeat: u32,
    yoyo: bool,
}

impl Tween {
    pub fn to(actor: ActorId, field: Field, value: f32) -> Self {
        Self::drive(actor, field, 1.0, value)
    }

    /// Tween whose channel value reaches `value` and is written to `field`
    /// multiplied by `gain`.
    pub fn drive(actor: ActorId, field: Field, gain: f32, value: f32) -> Self {
        Self {
            channels: vec![Channel {
                bindings: vec![Binding { actor, field, gain }],
                target: value,
            }],
            duration: DEFAULT_TWEEN_DURATION,
            delay: 0.0,
            ease: DEFAULT_TWEEN_EASE,
            repeat: 0,
            yoyo: false,
        }
    }

    /// Zero-duration tween; writes its end value the moment it is reached.
    pub fn set(actor: ActorId, field: Field, value: f32) -> Self {
        Self::to(actor, field, value).duration(0.0)
    }

    /// Adds an independent channel sharing this tween's timing.
    pub fn and(mut self, actor: ActorId, field: Field, value: f32) -> Self {
        self.channels.push(Channel {
            bindings: vec![Binding {
                actor,
                field,
                gain: 1.0,
            }],
            target: value,
        });
        self
    }

    /// Drives another field from the most recently added channel.
    pub fn linked(mut self, actor: ActorId, field: Field, gain: f32) -> Self {
        if let Some(channel) = self.channels.last_mut() {
            channel.bindings.push(Binding { actor, field, gain });
        }
        self
    }

    pub fn duration(mut self, seconds: f32) -> Self {
        self.duration = seconds;
        self
    }

    pub fn delay(mut self, seconds: f32) -> Self {
        self.delay = seconds;
        self
    }

    pub fn ease(mut self, ease: Easing) -> Self {
        self.ease = ease;
        self
    }

    /// Extra passes after the first one.
    pub fn repeat(mut self, count: u32) -> Self {
        self.repeat = count;
        self
    }

    pub fn yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = yoyo;
        self
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> + '_ {
        self.channels.iter().flat_map(|channel| channel.bindings.iter())
    }

    pub fn pass_duration(&self) -> f32 {
        self.duration
    }

    pub fn start_delay(&self) -> f32 {
        self.delay
    }

    pub fn easing(&self) -> Easing {
        self.ease
    }

    /// Time the tween spends animating, excluding its delay.
    pub fn active_span(&self) -> f32 {
        self.duration * (self.repeat as f32 + 1.0)
    }

    pub fn total_duration(&self) -> f32 {
        self.delay + self.active_span()
    }

    /// True when the last pass runs backwards and the tween settles on its
    /// sampled start value.
    pub fn ends_at_start(&self) -> bool {
        self.yoyo && self.repeat % 2 == 1
    }

    /// Eased progress after `elapsed` seconds of the active span.
    pub fn progress_at(&self, elapsed: f32) -> f32 {
        if self.duration <= 0.0 || elapsed >= self.active_span() {
            return if self.ends_at_start() { 0.0 } else { 1.0 };
        }
        let elapsed = elapsed.max(0.0);
        let pass = (elapsed / self.duration).floor();
        let local = (elapsed - pass * self.duration) / self.duration;
        if self.yoyo && (pass as u32) % 2 == 1 {
            self.ease.apply(1.0 - local)
        } else {
            self.ease.apply(local)
        }
    }

    /// Exact value each channel holds once the tween completes.
    pub fn final_value(&self, channel: &Channel, from: f32) -> f32 {
        if self.ends_at_start() {
            from
        } else {
            channel.target
        }
    }

    pub(crate) fn validate_gains(&self) -> Option<f32> {
        self.bindings()
            .map(|binding| binding.gain)
            .find(|gain| !gain.is_finite() || *gain == 0.0)
    }
}

pub fn interpolate(from: f32, to: f32, progress: f32) -> f32 {
    from + (to - from) * progress
}
