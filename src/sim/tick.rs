//! Frame-driven simulation tick
//!
//! The host calls [`tick`] once per animation frame with a millisecond
//! timestamp. Within a tick the order is fixed: physics, collision pass
//! (with merge attempts), global merge scan, merge commit, cleanup,
//! particles, then overflow and round checks.

use glam::Vec2;

use super::merge;
use super::physics;
use super::state::{GamePhase, GameState};
use crate::consts::*;
use crate::error::{SimError, SimResult};

/// Input collected by the host since the previous frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Launch velocity for the piece in hand
    pub launch: Option<Vec2>,
    /// Pause toggle
    pub pause: bool,
}

/// Turns host timestamps into frame deltas
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    /// Make `now_ms` the reference for the next delta
    pub fn reset(&mut self, now_ms: f64) {
        self.last_ms = Some(now_ms);
    }

    /// Seconds since the previous frame; `None` on the first frame
    pub fn advance(&mut self, now_ms: f64) -> Option<f32> {
        let prev = self.last_ms.replace(now_ms)?;
        Some(((now_ms - prev) / 1000.0) as f32)
    }

    pub fn last_ms(&self) -> Option<f64> {
        self.last_ms
    }
}

/// Reject non-positive and non-finite deltas
pub fn validate_dt(dt: f32) -> SimResult<f32> {
    if dt.is_finite() && dt > 0.0 {
        Ok(dt)
    } else {
        Err(SimError::InvalidDeltaTime(dt))
    }
}

/// Advance the session by one host frame
pub fn tick(state: &mut GameState, input: &TickInput, now_ms: f64) {
    if state.phase == GamePhase::GameOver {
        return;
    }

    if input.pause {
        let paused = !state.paused;
        state.set_paused(paused, now_ms);
        return;
    }
    if state.paused {
        state.clock.reset(now_ms);
        return;
    }

    let dt = state.clock.advance(now_ms);
    if let Some(dt) = dt
        && let Err(e) = validate_dt(dt)
    {
        log::warn!("Skipping tick: {}", e);
        return;
    }

    if let Some(launch) = input.launch
        && let Err(e) = state.throw_piece(launch, now_ms)
    {
        log::debug!("Throw rejected: {}", e);
    }

    // First frame only sets the clock reference
    let Some(dt) = dt else { return };
    if let Err(e) = step(state, dt, now_ms) {
        log::warn!("Skipping tick: {}", e);
    }
}

/// Run one simulation step of `dt` seconds
///
/// A rejected `dt` leaves the state untouched. Long frames are clamped to
/// [`MAX_FRAME_DT`].
pub fn step(state: &mut GameState, dt: f32, now_ms: f64) -> SimResult<()> {
    let dt = validate_dt(dt)?.min(MAX_FRAME_DT);

    if state.phase != GamePhase::InRound {
        // Board is frozen while the shop is open; effects still fade
        state.update_particles(dt);
        return Ok(());
    }

    state.time_ticks += 1;
    state.sim_time += f64::from(dt);

    physics::integrate(&mut state.pieces, &state.container, &state.tuning.physics, dt);
    physics::collide_pieces(state);
    merge::scan_for_merge(state);
    merge::commit_due(state);
    state.pieces.retain(|p| !p.consumed);
    state.update_particles(dt);
    state.normalize_order();

    state.check_round_completion(now_ms);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn run(state: &mut GameState, input: &TickInput, frames: usize, start_ms: f64) -> f64 {
        let mut now = start_ms;
        for _ in 0..frames {
            tick(state, input, now);
            now += FRAME_MS;
        }
        now
    }

    #[test]
    fn test_clock_first_frame() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(100.0), None);
        let dt = clock.advance(116.0).unwrap();
        assert!((dt - 0.016).abs() < 1e-6);
        assert_eq!(clock.last_ms(), Some(116.0));
    }

    #[test]
    fn test_validate_dt() {
        assert!(validate_dt(0.016).is_ok());
        assert!(validate_dt(0.0).is_err());
        assert!(validate_dt(-5.0).is_err());
        assert!(validate_dt(f32::NAN).is_err());
        assert!(validate_dt(f32::INFINITY).is_err());
    }

    #[test]
    fn test_negative_dt_leaves_state_unchanged() {
        let mut state = GameState::new(3);
        state.throw_piece(Vec2::new(0.0, 100.0), 0.0).unwrap();
        let before = (state.pieces[0].pos, state.pieces[0].vel, state.time_ticks);
        assert!(matches!(
            step(&mut state, -5.0, 20.0),
            Err(SimError::InvalidDeltaTime(_))
        ));
        assert_eq!(
            (state.pieces[0].pos, state.pieces[0].vel, state.time_ticks),
            before
        );
    }

    #[test]
    fn test_backwards_clock_skips_tick() {
        let mut state = GameState::new(3);
        state.throw_piece(Vec2::ZERO, 0.0).unwrap();
        tick(&mut state, &TickInput::default(), 1000.0);
        let pos = state.pieces[0].pos;
        tick(&mut state, &TickInput::default(), 500.0);
        assert_eq!(state.pieces[0].pos, pos);
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_pieces_fall_while_ticking() {
        let mut state = GameState::new(3);
        let launch = TickInput {
            launch: Some(Vec2::ZERO),
            ..Default::default()
        };
        tick(&mut state, &launch, 0.0);
        let start_y = state.pieces[0].pos.y;
        run(&mut state, &TickInput::default(), 30, FRAME_MS);
        assert!(state.pieces[0].pos.y > start_y);
        assert_eq!(state.time_ticks, 30);
    }

    #[test]
    fn test_pause_freezes_and_resets_clock() {
        let mut state = GameState::new(3);
        state.throw_piece(Vec2::ZERO, 0.0).unwrap();
        let now = run(&mut state, &TickInput::default(), 5, 0.0);

        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, now);
        assert!(state.paused);
        let ticks = state.time_ticks;
        let pos = state.pieces[0].pos;

        run(&mut state, &TickInput::default(), 10, now + FRAME_MS);
        assert_eq!(state.time_ticks, ticks);
        assert_eq!(state.pieces[0].pos, pos);

        // A long pause must not produce a huge delta on resume
        let resume_at = now + 60_000.0;
        tick(&mut state, &pause, resume_at);
        assert!(!state.paused);
        tick(&mut state, &TickInput::default(), resume_at + FRAME_MS);
        assert_eq!(state.time_ticks, ticks + 1);
        assert!((state.pieces[0].pos.y - pos.y).abs() < 10.0);
    }

    #[test]
    fn test_game_over_is_terminal() {
        let mut state = GameState::new(3);
        state.lives = 1;
        state.complete_round(false);
        let launch = TickInput {
            launch: Some(Vec2::ZERO),
            ..Default::default()
        };
        run(&mut state, &launch, 10, 0.0);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.pieces.is_empty());
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_determinism() {
        let mut a = GameState::new(99);
        let mut b = GameState::new(99);
        let inputs = [
            TickInput {
                launch: Some(Vec2::new(120.0, 50.0)),
                ..Default::default()
            },
            TickInput::default(),
            TickInput::default(),
        ];
        let mut now = 0.0;
        for _ in 0..100 {
            for input in &inputs {
                tick(&mut a, input, now);
                tick(&mut b, input, now);
                now += FRAME_MS;
            }
        }
        assert_eq!(a.time_ticks, b.time_ticks);
        assert_eq!(a.pieces.len(), b.pieces.len());
        assert_eq!(a.score, b.score);
        for (pa, pb) in a.pieces.iter().zip(&b.pieces) {
            assert_eq!(pa.kind, pb.kind);
            assert_eq!(pa.pos, pb.pos);
        }
    }
}
