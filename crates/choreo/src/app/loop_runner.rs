use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use super::metrics::{MetricsAccumulator, MetricsHandle};
use super::scene::{Scene, SceneCommand, SceneError};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
    /// Stop after this much simulated time. Runs until the scene quits otherwise.
    pub run_duration: Option<Duration>,
    /// Sleep to keep wall-clock pace. When off, every frame advances exactly
    /// one fixed tick of virtual time.
    pub paced: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: Some(60),
            run_duration: None,
            paced: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load scene: {0}")]
    SceneLoad(#[source] SceneError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub ticks: u64,
    pub simulated: Duration,
}

pub fn run_headless(config: LoopConfig, scene: Box<dyn Scene>) -> Result<RunSummary, AppError> {
    run_headless_with_metrics(config, scene, MetricsHandle::default())
}

pub fn run_headless_with_metrics(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<RunSummary, AppError> {
    scene.load().map_err(AppError::SceneLoad)?;
    info!(actor_count = scene.actor_count(), "scene_loaded");

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let frame_target = target_frame_duration(effective_render_cap);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        run_duration_ms = config.run_duration.map(|value| value.as_millis() as u64),
        paced = config.paced,
        "loop_config"
    );

    let origin = Instant::now();
    let mut summary = RunSummary::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = origin;
    let mut metrics_accumulator = MetricsAccumulator::starting_at(metrics_log_interval, origin);
    let mut last_title: Option<String> = None;

    loop {
        let frame_start = Instant::now();
        let (now, raw_frame_dt) = if config.paced {
            let raw = frame_start.saturating_duration_since(last_frame_instant);
            last_frame_instant = frame_start;
            (frame_start, raw)
        } else {
            (origin + summary.simulated + fixed_dt, fixed_dt)
        };

        let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
        accumulator = accumulator.saturating_add(clamped_frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        let mut quit_requested = false;
        for _ in 0..step_plan.ticks_to_run {
            let command = scene.update(fixed_dt_seconds);
            summary.ticks += 1;
            summary.simulated = summary.simulated.saturating_add(fixed_dt);
            metrics_accumulator.record_tick();
            if command == SceneCommand::Quit {
                quit_requested = true;
                break;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        let next_title = scene.debug_title();
        if next_title != last_title {
            if let Some(title) = &next_title {
                info!(title = %title, "scene_title");
            }
            last_title = next_title;
        }

        summary.frames += 1;
        metrics_accumulator.record_frame(raw_frame_dt);
        if let Some(mut snapshot) = metrics_accumulator.maybe_snapshot(now) {
            snapshot.cycle_index = scene.cycle_index();
            snapshot.steps_skipped = scene.steps_skipped();
            metrics_handle.publish(snapshot);
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                cycle_index = snapshot.cycle_index,
                steps_skipped = snapshot.steps_skipped,
                actor_count = scene.actor_count(),
                "loop_metrics"
            );
        }

        if quit_requested {
            info!(reason = "scene_quit", "shutdown_requested");
            break;
        }
        if config
            .run_duration
            .is_some_and(|limit| summary.simulated >= limit)
        {
            info!(reason = "run_duration_elapsed", "shutdown_requested");
            break;
        }

        if config.paced {
            let elapsed = Instant::now().saturating_duration_since(frame_start);
            let cap_sleep = compute_cap_sleep(elapsed, frame_target.or(Some(fixed_dt)));
            if cap_sleep > Duration::ZERO {
                thread::sleep(cap_sleep);
            }
        }
    }

    scene.unload();
    info!(
        frames = summary.frames,
        ticks = summary.ticks,
        simulated_ms = summary.simulated.as_millis() as u64,
        "shutdown"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Default)]
    struct Trace {
        loaded: bool,
        unloaded: bool,
        updates: u32,
        elapsed: f32,
    }

    struct CountingScene {
        trace: Rc<RefCell<Trace>>,
        quit_after: Option<u32>,
        fail_load: bool,
    }

    impl Scene for CountingScene {
        fn load(&mut self) -> Result<(), SceneError> {
            if self.fail_load {
                return Err("rig missing".into());
            }
            self.trace.borrow_mut().loaded = true;
            Ok(())
        }

        fn update(&mut self, fixed_dt_seconds: f32) -> SceneCommand {
            let mut trace = self.trace.borrow_mut();
            trace.updates += 1;
            trace.elapsed += fixed_dt_seconds;
            match self.quit_after {
                Some(limit) if trace.updates >= limit => SceneCommand::Quit,
                _ => SceneCommand::None,
            }
        }

        fn unload(&mut self) {
            self.trace.borrow_mut().unloaded = true;
        }

        fn actor_count(&self) -> usize {
            1
        }
    }

    fn unpaced(run_duration: Option<Duration>) -> LoopConfig {
        LoopConfig {
            target_tps: 50,
            run_duration,
            paced: false,
            ..LoopConfig::default()
        }
    }

    #[test]
    fn unpaced_run_stops_after_simulated_duration() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let scene = CountingScene {
            trace: Rc::clone(&trace),
            quit_after: None,
            fail_load: false,
        };
        let metrics = MetricsHandle::default();

        let summary = run_headless_with_metrics(
            unpaced(Some(Duration::from_secs(2))),
            Box::new(scene),
            metrics.clone(),
        )
        .expect("run");

        assert_eq!(summary.ticks, 100);
        assert_eq!(summary.frames, 100);
        assert_eq!(summary.simulated, Duration::from_secs(2));
        let trace = trace.borrow();
        assert!(trace.loaded && trace.unloaded);
        assert_eq!(trace.updates, 100);
        assert!((trace.elapsed - 2.0).abs() < 0.001);
        assert!(metrics.snapshot().tps > 0.0);
    }

    #[test]
    fn scene_quit_ends_the_loop() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let scene = CountingScene {
            trace: Rc::clone(&trace),
            quit_after: Some(7),
            fail_load: false,
        };

        let summary = run_headless(unpaced(None), Box::new(scene)).expect("run");
        assert_eq!(summary.ticks, 7);
        assert!(trace.borrow().unloaded);
    }

    #[test]
    fn load_failure_is_reported_without_running() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let scene = CountingScene {
            trace: Rc::clone(&trace),
            quit_after: None,
            fail_load: true,
        };

        let err = run_headless(unpaced(None), Box::new(scene)).expect_err("load failure");
        assert!(matches!(err, AppError::SceneLoad(_)));
        assert_eq!(err.to_string(), "failed to load scene: rig missing");
        assert_eq!(trace.borrow().updates, 0);
        assert!(!trace.borrow().unloaded);
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(20);
        let result = plan_sim_steps(Duration::from_millis(60), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(20);
        let result = plan_sim_steps(Duration::from_millis(130), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(70));
    }

    #[test]
    fn compute_cap_sleep_only_when_under_budget() {
        let target = target_frame_duration(Some(50));
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(25), target),
            Duration::ZERO
        );
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(5), target),
            Duration::from_millis(15)
        );
        assert_eq!(compute_cap_sleep(Duration::from_millis(5), None), Duration::ZERO);
    }

    #[test]
    fn normalizers_fall_back_on_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(30)), Some(30));
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
        assert_eq!(format_render_cap(None), "off");
    }
}
