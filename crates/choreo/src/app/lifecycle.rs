use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::actors::ActorRegistry;
use crate::timeline::{
    PlaybackStats, Stage, StepDiagnostic, Timeline, TimelineBuilder, TimelineError,
    TimelinePlayer,
};

pub type DiagnosticHook = Box<dyn FnMut(&StepDiagnostic)>;

/// What an authoring pass sees: the cast, the script state and the timelines
/// it adopts.
pub struct AuthoringScope<'a, S> {
    actors: &'a mut ActorRegistry,
    state: &'a mut S,
    rng: &'a mut ChaCha8Rng,
    timelines: Vec<Timeline<S>>,
}

impl<'a, S> AuthoringScope<'a, S> {
    pub fn actors(&self) -> &ActorRegistry {
        self.actors
    }

    pub fn actors_mut(&mut self) -> &mut ActorRegistry {
        &mut *self.actors
    }

    pub fn state(&self) -> &S {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut *self.state
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut *self.rng
    }

    pub fn timeline(&self, name: impl Into<String>) -> TimelineBuilder<S> {
        TimelineBuilder::new(name)
    }

    /// Builds the timeline and hands it to the context for playback.
    pub fn adopt(&mut self, builder: TimelineBuilder<S>) -> Result<(), TimelineError> {
        let timeline = builder.build()?;
        info!(
            timeline = timeline.name(),
            duration = timeline.duration(),
            tweens = timeline.tween_count(),
            callbacks = timeline.callback_count(),
            "timeline_adopted"
        );
        self.timelines.push(timeline);
        Ok(())
    }
}

/// Owns everything one authoring pass created: the cast, the script state,
/// the seeded RNG and every adopted timeline.
///
/// `stop` (or dropping the context) releases all of it at once; no callback
/// fires afterwards.
pub struct SceneContext<S> {
    actors: ActorRegistry,
    state: S,
    rng: ChaCha8Rng,
    seed: u64,
    players: Vec<TimelinePlayer<S>>,
    diagnostic_hook: Option<DiagnosticHook>,
    elapsed: f32,
    stopped: bool,
    final_stats: PlaybackStats,
    final_cycle_index: u64,
}

impl<S> SceneContext<S> {
    /// Runs `script` once. On error nothing is started and the error is
    /// returned as-is. On success the registry's current state becomes the
    /// rest pose restored by cycle resets.
    pub fn author<E, F>(
        mut actors: ActorRegistry,
        mut state: S,
        seed: Option<u64>,
        script: F,
    ) -> Result<Self, E>
    where
        F: FnOnce(&mut AuthoringScope<'_, S>) -> Result<(), E>,
    {
        let seed = seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let timelines = {
            let mut scope = AuthoringScope {
                actors: &mut actors,
                state: &mut state,
                rng: &mut rng,
                timelines: Vec::new(),
            };
            script(&mut scope)?;
            scope.timelines
        };
        actors.capture_rest_pose();
        let players: Vec<_> = timelines.into_iter().map(TimelinePlayer::new).collect();
        info!(
            seed,
            timelines = players.len(),
            actor_count = actors.len(),
            "scene_authored"
        );

        Ok(Self {
            actors,
            state,
            rng,
            seed,
            players,
            diagnostic_hook: None,
            elapsed: 0.0,
            stopped: false,
            final_stats: PlaybackStats::default(),
            final_cycle_index: 0,
        })
    }

    pub fn set_diagnostic_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&StepDiagnostic) + 'static,
    {
        self.diagnostic_hook = Some(Box::new(hook));
    }

    /// Drives every owned timeline by `dt` seconds. A no-op once stopped.
    pub fn advance(&mut self, dt: f32) {
        if self.stopped {
            return;
        }
        let mut stage = Stage {
            actors: &mut self.actors,
            state: &mut self.state,
            rng: &mut self.rng,
        };
        for player in &mut self.players {
            player.advance(dt, &mut stage);
        }
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }

        for player in &mut self.players {
            for diagnostic in player.drain_diagnostics() {
                if let Some(hook) = self.diagnostic_hook.as_mut() {
                    hook(&diagnostic);
                }
            }
        }
    }

    /// Cancels every timeline immediately. Pending callbacks never fire.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.final_stats = self.stats();
        self.final_cycle_index = self.cycle_index();
        self.players.clear();
        self.stopped = true;
        info!(
            elapsed = self.elapsed,
            cycles_started = self.final_stats.cycles_started,
            "scene_stopped"
        );
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn actors(&self) -> &ActorRegistry {
        &self.actors
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn timeline_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, name: &str) -> Option<&TimelinePlayer<S>> {
        self.players.iter().find(|player| player.name() == name)
    }

    /// Cycle of the first adopted timeline.
    pub fn cycle_index(&self) -> u64 {
        if self.stopped {
            return self.final_cycle_index;
        }
        self.players
            .first()
            .map(TimelinePlayer::cycle_index)
            .unwrap_or_default()
    }

    pub fn time_until_cycle_end(&self) -> f32 {
        self.players
            .first()
            .map(TimelinePlayer::time_until_cycle_end)
            .unwrap_or_default()
    }

    pub fn stats(&self) -> PlaybackStats {
        if self.stopped {
            return self.final_stats;
        }
        let mut stats = PlaybackStats::default();
        for player in &self.players {
            stats.merge(player.stats());
        }
        stats
    }
}
