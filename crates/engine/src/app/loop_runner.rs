use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::{Error as PixelsError, TextureError};
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::WindowBuilder;

use crate::gfx::Viewport;
use crate::state::{Game, GameError};

use super::input::{InputCollector, KeyInput};
use super::presenter::Presenter;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub view_width: u32,
    pub view_height: u32,
    pub window_scale: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
}

impl LoopConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.view_width.max(1), self.view_height.max(1))
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Tile Engine".to_string(),
            view_width: 320,
            view_height: 240,
            window_scale: 3,
            target_tps: 20,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("failed to resize render surface: {0}")]
    ResizeSurface(#[source] TextureError),
    #[error("failed to present frame: {0}")]
    Present(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
    #[error("game stopped: {0}")]
    Fatal(#[source] GameError),
}

/// Runs `game` in a window until it quits, the window closes or a state
/// reports a fatal error.
pub fn run_app(config: LoopConfig, mut game: Game) -> Result<(), AppError> {
    let viewport = config.viewport();
    let window_scale = config.window_scale.max(1);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                f64::from(viewport.width * window_scale),
                f64::from(viewport.height * window_scale),
            ))
            .with_min_inner_size(LogicalSize::new(
                f64::from(viewport.width),
                f64::from(viewport.height),
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut presenter =
        Presenter::new(Arc::clone(&window), viewport).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / f64::from(target_tps));
    let mut input = InputCollector::new();

    info!(
        view_width = viewport.width,
        view_height = viewport.height,
        window_scale,
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        state = game.states().active_name().unwrap_or("none"),
        "loop_config"
    );

    let mut failure: Option<AppError> = None;
    let failure_slot = &mut failure;
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(err) = presenter.resize_surface(new_size.width, new_size.height) {
                        warn!(error = %err, "renderer_resize_failed");
                        *failure_slot = Some(AppError::ResizeSurface(err));
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let (x, y) = presenter.cursor_to_view(position.x as f32, position.y as f32);
                    input.set_cursor(x, y);
                }
                WindowEvent::CursorLeft { .. } => {
                    input.clear_cursor();
                }
                WindowEvent::Focused(false) => {
                    input.clear_held();
                    game.lose_focus();
                    info!("focus_lost");
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let PhysicalKey::Code(code) = event.physical_key else {
                        return;
                    };
                    match input.handle_key(code, event.state, event.text.as_deref()) {
                        Some(KeyInput::Pressed(key, typed)) => game.key_pressed(key, typed),
                        Some(KeyInput::Released(key, typed)) => game.key_released(key, typed),
                        None => {}
                    }
                    if input.take_reload_pressed() {
                        info!(reason = "reload_key", "resource_reload_requested");
                        game.reload_resources();
                    }
                    if input.quit_requested() {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        game.tick();
                        if game.should_exit() {
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

                    let (mouse_x, mouse_y) = input.cursor_or_offscreen();
                    let partial = partial_ticks(accumulator, fixed_dt);
                    if let Err(err) = presenter.draw(&mut game, mouse_x, mouse_y, partial) {
                        warn!(error = %err, "renderer_draw_failed");
                        *failure_slot = Some(AppError::Present(err));
                        window_target.exit();
                        return;
                    }

                    if let Some(err) = game.take_fatal_error() {
                        error!(error = %err, "fatal");
                        *failure_slot = Some(AppError::Fatal(err));
                        window_target.exit();
                    } else if game.quit_requested() {
                        info!(reason = "state_quit", "shutdown_requested");
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!(ticks = game.context().ticks(), "shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)?;

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
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

/// Fraction of the next tick already elapsed, in `[0, 1)`.
fn partial_ticks(accumulator: Duration, fixed_dt: Duration) -> f32 {
    if fixed_dt.is_zero() {
        return 0.0;
    }
    let fraction = accumulator.as_secs_f64() / fixed_dt.as_secs_f64();
    (fraction as f32).clamp(0.0, 1.0 - f32::EPSILON)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_a_small_scaled_view() {
        let config = LoopConfig::default();
        assert_eq!(config.viewport(), Viewport::new(320, 240));
        assert_eq!(config.window_scale, 3);
        assert_eq!(config.target_tps, 20);
    }

    #[test]
    fn zero_sized_view_is_bumped_to_one_pixel() {
        let config = LoopConfig {
            view_width: 0,
            view_height: 0,
            ..LoopConfig::default()
        };
        assert_eq!(config.viewport(), Viewport::new(1, 1));
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
        let fixed_dt = Duration::from_millis(50);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 2);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(20));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(50);
        let result = plan_sim_steps(Duration::from_millis(400), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(250));
    }

    #[test]
    fn partial_ticks_is_fraction_of_fixed_step() {
        let fixed_dt = Duration::from_millis(50);
        assert_eq!(partial_ticks(Duration::ZERO, fixed_dt), 0.0);
        assert!((partial_ticks(Duration::from_millis(20), fixed_dt) - 0.4).abs() < 1e-6);
        assert!(partial_ticks(Duration::from_millis(50), fixed_dt) < 1.0);
        assert_eq!(partial_ticks(Duration::from_millis(5), Duration::ZERO), 0.0);
    }

    #[test]
    fn zero_durations_fall_back() {
        let fallback = Duration::from_millis(250);
        assert_eq!(normalize_non_zero_duration(Duration::ZERO, fallback), fallback);
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), fallback),
            Duration::from_millis(5)
        );
    }
}
