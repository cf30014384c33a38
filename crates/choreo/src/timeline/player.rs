use std::cmp::Ordering;
use std::collections::HashMap;

use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::actors::ActorRegistry;
use crate::motion::{interpolate, Binding, Tween};

use super::builder::{Callback, Timeline};
use super::position::IntoPosition;
use super::types::{
    check_duration, PlaybackStats, Repeat, SkipReason, StepDiagnostic, TimelineError,
};

/// Whole cycles one advance plays out before the rest are dropped.
pub const MAX_REPLAYED_CYCLES: u64 = 16;

/// Mutable world a player drives during one advance.
pub struct Stage<'a, S> {
    pub actors: &'a mut ActorRegistry,
    pub state: &'a mut S,
    pub rng: &'a mut ChaCha8Rng,
}

/// What a callback sees when it fires.
pub struct Cue<'a, S> {
    pub actors: &'a mut ActorRegistry,
    pub state: &'a mut S,
    rng: &'a mut ChaCha8Rng,
    now: f32,
    cycle: u64,
    labels: &'a HashMap<String, f32>,
    spawns: &'a mut Vec<(f32, Tween)>,
}

impl<'a, S> Cue<'a, S> {
    /// Cycle-local time the callback was scheduled at.
    pub fn now(&self) -> f32 {
        self.now
    }

    pub fn cycle_index(&self) -> u64 {
        self.cycle
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut *self.rng
    }

    pub fn label_time(&self, name: &str) -> Option<f32> {
        self.labels.get(name).copied()
    }

    /// Schedules a one-shot tween for the current cycle. Anchors resolve
    /// against labels and the callback time; anything earlier than now starts
    /// now. Spawned tweens are discarded when the next cycle starts.
    pub fn spawn<P: IntoPosition>(&mut self, tween: Tween, anchor: P) -> Result<(), TimelineError> {
        check_duration("tween duration", tween.pass_duration())?;
        check_duration("tween delay", tween.start_delay())?;
        if let Some(gain) = tween.validate_gains() {
            return Err(TimelineError::InvalidGain { gain });
        }
        let at = anchor
            .into_position()?
            .resolve(self.now, self.now, self.labels)?
            .max(self.now);
        self.spawns.push((at, tween));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    End,
    /// Callbacks and zero-length tweens.
    Instant,
    Start,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Authored(usize),
    Spawned(usize),
    Call(usize),
}

#[derive(Debug, Clone, Copy)]
struct Event {
    time: f32,
    kind: EventKind,
    order: usize,
    target: Target,
}

impl Event {
    fn for_slot(slot: &Slot, order: usize, target: Target, events: &mut Vec<Event>) {
        if slot.end <= slot.start {
            events.push(Event {
                time: slot.start,
                kind: EventKind::Instant,
                order,
                target,
            });
            return;
        }
        events.push(Event {
            time: slot.start,
            kind: EventKind::Start,
            order,
            target,
        });
        events.push(Event {
            time: slot.end,
            kind: EventKind::End,
            order,
            target,
        });
    }

    fn cmp_key(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.kind.cmp(&other.kind))
            .then(self.order.cmp(&other.order))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SlotPhase {
    Pending,
    Active { from: Vec<f32> },
    Done,
    Skipped,
}

#[derive(Debug, Clone)]
struct Slot {
    start: f32,
    end: f32,
    tween: Tween,
    phase: SlotPhase,
}

struct Skip {
    binding: Binding,
    reason: SkipReason,
}

impl Slot {
    fn new(at: f32, tween: Tween) -> Self {
        Self {
            start: at + tween.start_delay(),
            end: at + tween.total_duration(),
            tween,
            phase: SlotPhase::Pending,
        }
    }

    /// Samples start values. Returns `Ok(true)` when the tween completed on
    /// the spot because it has no active span.
    fn begin(&mut self, actors: &mut ActorRegistry) -> Result<bool, Skip> {
        let mut from = Vec::with_capacity(self.tween.channels().len());
        for channel in self.tween.channels() {
            let binding = channel.bindings()[0];
            let start = channel.sample(actors);
            if !start.is_finite() {
                self.phase = SlotPhase::Skipped;
                return Err(Skip {
                    binding,
                    reason: SkipReason::NonFiniteStart,
                });
            }
            if !channel.target().is_finite() {
                self.phase = SlotPhase::Skipped;
                return Err(Skip {
                    binding,
                    reason: SkipReason::NonFiniteEnd,
                });
            }
            from.push(start);
        }
        self.phase = SlotPhase::Active { from };
        if self.end <= self.start {
            return Ok(self.finish(actors));
        }
        Ok(false)
    }

    fn finish(&mut self, actors: &mut ActorRegistry) -> bool {
        let SlotPhase::Active { from } = &self.phase else {
            return false;
        };
        for (channel, from) in self.tween.channels().iter().zip(from) {
            channel.write(actors, self.tween.final_value(channel, *from));
        }
        self.phase = SlotPhase::Done;
        true
    }

    fn sample_at(&mut self, time: f32, actors: &mut ActorRegistry) -> Result<(), Skip> {
        let SlotPhase::Active { from } = &self.phase else {
            return Ok(());
        };
        let progress = self.tween.progress_at(time - self.start);
        let values: Vec<f32> = self
            .tween
            .channels()
            .iter()
            .zip(from)
            .map(|(channel, from)| interpolate(*from, channel.target(), progress))
            .collect();
        if let Some(index) = values.iter().position(|value| !value.is_finite()) {
            self.phase = SlotPhase::Skipped;
            return Err(Skip {
                binding: self.tween.channels()[index].bindings()[0],
                reason: SkipReason::NonFiniteValue,
            });
        }
        for (channel, value) in self.tween.channels().iter().zip(values) {
            channel.write(actors, value);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        matches!(self.phase, SlotPhase::Active { .. })
    }
}

/// Plays a [`Timeline`] against a stage, one `advance` per frame.
///
/// Within one advance every tween completion, callback and tween start up to
/// the target time is processed in time order. At equal times completions go
/// first, then callbacks and zero-length tweens in authoring order, then tween
/// starts.
pub struct TimelinePlayer<S> {
    name: String,
    authored: Vec<Slot>,
    calls: Vec<Callback<S>>,
    on_cycle_start: Option<Callback<S>>,
    labels: HashMap<String, f32>,
    body_length: f32,
    repeat: Repeat,
    repeat_delay: f32,
    events: Vec<Event>,
    next_event: usize,
    spawned: Vec<Slot>,
    spawn_events: Vec<Event>,
    spawn_queue: Vec<(f32, Tween)>,
    next_spawn_order: usize,
    cycle_index: u64,
    cycle_time: f32,
    cycle_open: bool,
    finished: bool,
    stats: PlaybackStats,
    diagnostics: Vec<StepDiagnostic>,
}

impl<S> TimelinePlayer<S> {
    pub fn new(timeline: Timeline<S>) -> Self {
        let mut events = Vec::with_capacity(timeline.tweens.len() * 2 + timeline.calls.len());
        let mut authored = Vec::with_capacity(timeline.tweens.len());
        for (index, scheduled) in timeline.tweens.into_iter().enumerate() {
            let slot = Slot::new(scheduled.at, scheduled.tween);
            Event::for_slot(&slot, scheduled.order, Target::Authored(index), &mut events);
            authored.push(slot);
        }
        let mut calls = Vec::with_capacity(timeline.calls.len());
        for (index, scheduled) in timeline.calls.into_iter().enumerate() {
            events.push(Event {
                time: scheduled.at,
                kind: EventKind::Instant,
                order: scheduled.order,
                target: Target::Call(index),
            });
            calls.push(scheduled.callback);
        }
        events.sort_by(Event::cmp_key);
        let next_spawn_order = events.len();

        Self {
            name: timeline.name,
            authored,
            calls,
            on_cycle_start: timeline.on_cycle_start,
            labels: timeline.labels,
            body_length: timeline.body_length,
            repeat: timeline.repeat,
            repeat_delay: timeline.repeat_delay,
            events,
            next_event: 0,
            spawned: Vec::new(),
            spawn_events: Vec::new(),
            spawn_queue: Vec::new(),
            next_spawn_order,
            cycle_index: 0,
            cycle_time: 0.0,
            cycle_open: false,
            finished: false,
            stats: PlaybackStats::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> f32 {
        self.body_length
    }

    pub fn label_time(&self, name: &str) -> Option<f32> {
        self.labels.get(name).copied()
    }

    pub fn cycle_index(&self) -> u64 {
        self.cycle_index
    }

    pub fn cycle_time(&self) -> f32 {
        self.cycle_time
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Seconds left until the current cycle (including its repeat delay)
    /// ends. Advancing by exactly this amount lands on the boundary.
    pub fn time_until_cycle_end(&self) -> f32 {
        if self.finished {
            return 0.0;
        }
        self.current_cycle_length() - self.cycle_time
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    pub fn active_tween_count(&self) -> usize {
        self.authored
            .iter()
            .chain(&self.spawned)
            .filter(|slot| slot.is_active())
            .count()
    }

    pub fn spawned_tween_count(&self) -> usize {
        self.spawned.len()
    }

    pub fn drain_diagnostics(&mut self) -> Vec<StepDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn advance(&mut self, dt: f32, stage: &mut Stage<'_, S>) {
        if self.finished {
            return;
        }
        let mut remaining = if dt.is_finite() {
            dt.max(0.0)
        } else {
            warn!(timeline = %self.name, dt, "non_finite_frame_delta");
            0.0
        };

        loop {
            if !self.cycle_open {
                self.open_cycle(stage);
            }
            let before = remaining;
            let cycle_length = self.current_cycle_length();
            let until_end = cycle_length - self.cycle_time;
            let boundary = remaining >= until_end;
            let target = if boundary {
                cycle_length
            } else {
                self.cycle_time + remaining
            };
            remaining = if boundary {
                (remaining - until_end).max(0.0)
            } else {
                0.0
            };

            self.process_events(target, stage);
            self.sample_active(target, stage.actors);
            self.cycle_time = target;

            if !boundary {
                break;
            }
            self.close_cycle();
            if self.finished || remaining <= 0.0 {
                break;
            }
            remaining = self.fast_forward(remaining);
            if until_end > 0.0 && remaining >= before {
                warn!(timeline = %self.name, remaining, "frame_delta_not_consumed");
                break;
            }
        }
    }

    /// Drops whole cycles a single step would otherwise replay past
    /// [`MAX_REPLAYED_CYCLES`]. The cycle landed on still opens with its reset,
    /// and the final cycle of a counted repeat is never dropped.
    fn fast_forward(&mut self, remaining: f32) -> f32 {
        let full = f64::from(self.body_length) + f64::from(self.repeat_delay);
        let whole = if full > 0.0 {
            (f64::from(remaining) / full).floor() as u64
        } else {
            u64::MAX
        };
        let mut skip = whole.saturating_sub(MAX_REPLAYED_CYCLES);
        if let Repeat::Count(extra) = self.repeat {
            skip = skip.min(u64::from(extra).saturating_sub(self.cycle_index));
        }
        if skip == 0 {
            return remaining;
        }

        self.cycle_index = self.cycle_index.saturating_add(skip);
        warn!(
            timeline = %self.name,
            skipped = skip,
            cycle = self.cycle_index,
            "cycles_fast_forwarded"
        );
        if full > 0.0 {
            (f64::from(remaining) - skip as f64 * full).max(0.0) as f32
        } else {
            remaining
        }
    }

    fn current_cycle_length(&self) -> f32 {
        if self.repeat.is_last_cycle(self.cycle_index) {
            self.body_length
        } else {
            self.body_length + self.repeat_delay
        }
    }

    fn open_cycle(&mut self, stage: &mut Stage<'_, S>) {
        for slot in &mut self.authored {
            slot.phase = SlotPhase::Pending;
        }
        self.spawned.clear();
        self.spawn_events.clear();
        self.spawn_queue.clear();
        self.next_event = 0;
        self.cycle_time = 0.0;
        self.cycle_open = true;
        self.stats.cycles_started += 1;
        debug!(timeline = %self.name, cycle = self.cycle_index, "cycle_started");

        if let Some(reset) = self.on_cycle_start.as_mut() {
            let mut cue = Cue {
                actors: &mut *stage.actors,
                state: &mut *stage.state,
                rng: &mut *stage.rng,
                now: 0.0,
                cycle: self.cycle_index,
                labels: &self.labels,
                spawns: &mut self.spawn_queue,
            };
            reset(&mut cue);
        }
        self.adopt_spawns();
    }

    fn close_cycle(&mut self) {
        if self.repeat.is_last_cycle(self.cycle_index) {
            self.finished = true;
            info!(
                timeline = %self.name,
                cycles = self.cycle_index.saturating_add(1),
                "timeline_finished"
            );
            return;
        }
        self.cycle_index = self.cycle_index.saturating_add(1);
        self.cycle_time = 0.0;
        self.cycle_open = false;
    }

    fn next_due(&self, target: f32) -> Option<(Event, Option<usize>)> {
        let authored = self
            .events
            .get(self.next_event)
            .filter(|event| event.time <= target)
            .map(|event| (*event, None));
        let spawned = self
            .spawn_events
            .iter()
            .enumerate()
            .filter(|(_, event)| event.time <= target)
            .min_by(|(_, a), (_, b)| a.cmp_key(b))
            .map(|(index, event)| (*event, Some(index)));
        match (authored, spawned) {
            (Some(a), Some(b)) => {
                if b.0.cmp_key(&a.0) == Ordering::Less {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (a, b) => a.or(b),
        }
    }

    fn process_events(&mut self, target: f32, stage: &mut Stage<'_, S>) {
        while let Some((event, spawn_index)) = self.next_due(target) {
            match spawn_index {
                Some(index) => {
                    self.spawn_events.swap_remove(index);
                }
                None => self.next_event += 1,
            }

            match event.target {
                Target::Call(index) => {
                    let mut cue = Cue {
                        actors: &mut *stage.actors,
                        state: &mut *stage.state,
                        rng: &mut *stage.rng,
                        now: event.time,
                        cycle: self.cycle_index,
                        labels: &self.labels,
                        spawns: &mut self.spawn_queue,
                    };
                    (self.calls[index])(&mut cue);
                    self.stats.callbacks_fired += 1;
                    self.adopt_spawns();
                }
                Target::Authored(index) => {
                    let outcome = step_slot(&mut self.authored[index], event.kind, stage.actors);
                    self.record(outcome, event.time, stage.actors);
                }
                Target::Spawned(index) => {
                    let outcome = step_slot(&mut self.spawned[index], event.kind, stage.actors);
                    self.record(outcome, event.time, stage.actors);
                }
            }
        }
    }

    fn sample_active(&mut self, time: f32, actors: &mut ActorRegistry) {
        let mut skips = Vec::new();
        for slot in self.authored.iter_mut().chain(self.spawned.iter_mut()) {
            if let Err(skip) = slot.sample_at(time, actors) {
                skips.push(skip);
            }
        }
        for skip in skips {
            self.record(Err(skip), time, actors);
        }
    }

    fn adopt_spawns(&mut self) {
        for (at, tween) in self.spawn_queue.drain(..) {
            let slot = Slot::new(at, tween);
            let index = self.spawned.len();
            let order = self.next_spawn_order;
            self.next_spawn_order += 1;
            Event::for_slot(&slot, order, Target::Spawned(index), &mut self.spawn_events);
            self.spawned.push(slot);
        }
    }

    fn record(&mut self, outcome: Result<bool, Skip>, time: f32, actors: &ActorRegistry) {
        match outcome {
            Ok(true) => self.stats.tweens_completed += 1,
            Ok(false) => {}
            Err(skip) => {
                let diagnostic = StepDiagnostic {
                    timeline: self.name.clone(),
                    cycle: self.cycle_index,
                    time,
                    actor: actors.actor(skip.binding.actor).name().to_string(),
                    field: skip.binding.field,
                    reason: skip.reason,
                };
                warn!(
                    timeline = %diagnostic.timeline,
                    cycle = diagnostic.cycle,
                    time = diagnostic.time,
                    actor = %diagnostic.actor,
                    field = %diagnostic.field,
                    reason = %diagnostic.reason,
                    "step_skipped"
                );
                self.stats.steps_skipped += 1;
                self.diagnostics.push(diagnostic);
            }
        }
    }
}

fn step_slot(slot: &mut Slot, kind: EventKind, actors: &mut ActorRegistry) -> Result<bool, Skip> {
    match kind {
        EventKind::Start | EventKind::Instant if slot.phase == SlotPhase::Pending => {
            slot.begin(actors)
        }
        EventKind::End => Ok(slot.finish(actors)),
        _ => Ok(false),
    }
}
