//! Round lifecycle
//!
//! `InRound -> (Won | Lost) -> ShopOpen -> InRound`. A lost round costs a
//! life and replays the same target; losing the last life ends the session.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::piece::Piece;
use super::state::{GameEvent, GamePhase, GameState, SoundCue};
use crate::error::{SimError, SimResult};
use crate::tuning::PhysicsTuning;

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    Won { reward: u32 },
    Lost { lives_left: u8 },
}

/// Gold for a won round: base plus one per family in the deck
pub fn round_reward(base: u32, distinct_families: usize) -> u32 {
    base + distinct_families as u32
}

/// Target score of the following round (always grows)
pub fn next_target(target: u64, multiplier: f64) -> u64 {
    let scaled = (target as f64 * multiplier).round() as u64;
    scaled.max(target + 1)
}

/// Slingshot mapping: pulling back from `drag_start` to `drag_end` fires the
/// other way, scaled by launch power and capped at the max launch speed
pub fn launch_vector(drag_start: Vec2, drag_end: Vec2, physics: &PhysicsTuning) -> Vec2 {
    ((drag_start - drag_end) * physics.launch_power).clamp_length_max(physics.max_launch_speed)
}

impl GameState {
    /// Reset the board and start the current round
    pub fn begin_round(&mut self) {
        self.clear_board();
        self.current_piece = None;
        self.shop_offers.clear();
        self.score = 0;
        self.last_throw_ms = None;
        self.phase = GamePhase::InRound;
        self.deck.refill(&mut self.rng);

        log::info!(
            "Round {} started: target {}, {} cards, {} lives",
            self.round,
            self.target_score,
            self.deck.active_len(),
            self.lives
        );
        self.push_event(GameEvent::RoundChanged(self.round));
        self.push_event(GameEvent::TargetChanged(self.target_score));
        self.push_event(GameEvent::ScoreChanged(self.score));
        self.push_event(GameEvent::LivesChanged(self.lives));
        self.push_event(GameEvent::GoldChanged(self.gold));

        self.spawn_piece();
    }

    /// Draw a random card from the active deck into the hand
    ///
    /// No-op when the deck is empty or a piece is already in hand. Returns the
    /// new piece's id.
    pub fn spawn_piece(&mut self) -> Option<u32> {
        if self.current_piece.is_some() {
            return None;
        }
        let name = self.deck.draw(&mut self.rng)?;
        self.push_event(GameEvent::DeckCountChanged(self.deck.active_len()));

        let ty = match self.registry.get(&name) {
            Ok(ty) => ty.clone(),
            Err(e) => {
                log::warn!("Spawn skipped: {}", e);
                return None;
            }
        };
        let id = self.next_entity_id();
        self.current_piece = Some(Piece::spawn(id, &ty, &self.container));
        self.push_event(GameEvent::PieceInHand(name));
        Some(id)
    }

    /// Why a throw at `now_ms` would be rejected, if it would
    pub fn check_throw(&self, now_ms: f64) -> SimResult<()> {
        if self.phase != GamePhase::InRound {
            return Err(SimError::WrongPhase {
                expected: GamePhase::InRound,
                actual: self.phase,
            });
        }
        if self.current_piece.is_none() {
            return Err(SimError::NoPieceInHand);
        }
        if let Some(last) = self.last_throw_ms {
            let elapsed = now_ms - last;
            let cooldown = self.tuning.round.throw_cooldown_ms;
            if elapsed < cooldown {
                return Err(SimError::ThrowCooldown {
                    remaining_ms: cooldown - elapsed,
                });
            }
        }
        Ok(())
    }

    pub fn can_throw(&self, now_ms: f64) -> bool {
        self.check_throw(now_ms).is_ok()
    }

    /// Launch the piece in hand and draw the next one
    pub fn throw_piece(&mut self, launch: Vec2, now_ms: f64) -> SimResult<u32> {
        self.check_throw(now_ms)?;
        let mut piece = self.current_piece.take().ok_or(SimError::NoPieceInHand)?;

        let max_speed = self.tuning.physics.max_launch_speed;
        piece.vel = if launch.is_finite() {
            launch.clamp_length_max(max_speed)
        } else {
            Vec2::ZERO
        };
        piece.at_rest = false;
        let id = piece.id;
        log::debug!("Threw {} #{} at {:?}", piece.kind, id, piece.vel);

        self.pieces.push(piece);
        self.last_throw_ms = Some(now_ms);
        self.push_event(GameEvent::Sound(SoundCue::Launch));
        self.spawn_piece();
        Ok(id)
    }

    /// True once the last throw is older than the round-end cooldown
    pub fn settled_since_throw(&self, now_ms: f64) -> bool {
        self.last_throw_ms
            .is_none_or(|last| now_ms - last >= self.tuning.round.round_end_cooldown_ms)
    }

    /// A settled piece pokes above the overflow line after the board settled
    ///
    /// Falling, freshly spawned and mid-arc pieces never count.
    pub fn overflowed(&self, now_ms: f64) -> bool {
        let settle_ticks = self.tuning.physics.settle_ticks;
        self.settled_since_throw(now_ms)
            && self.pieces.iter().any(|p| {
                p.is_active()
                    && p.is_settled(settle_ticks)
                    && p.top() < self.container.overflow_line
            })
    }

    /// End the round if it is over; returns the outcome when it ended
    pub fn check_round_completion(&mut self, now_ms: f64) -> Option<RoundOutcome> {
        if self.phase != GamePhase::InRound {
            return None;
        }
        if self.overflowed(now_ms) {
            log::info!("Container overflowed in round {}", self.round);
            return Some(self.complete_round(false));
        }

        let drained = self.deck.active_len() == 0
            && self.current_piece.is_none()
            && self.pending_merges.is_empty();
        if !drained || !self.settled_since_throw(now_ms) {
            return None;
        }
        let won = self.score >= self.target_score;
        Some(self.complete_round(won))
    }

    /// Apply a round result: reward and shop, or a lost life
    pub fn complete_round(&mut self, won: bool) -> RoundOutcome {
        let outcome = if won {
            let families = self.deck.distinct_families(&self.registry);
            let reward = round_reward(self.tuning.round.base_reward, families);
            log::info!(
                "Round {} won with {}/{} (+{} gold)",
                self.round,
                self.score,
                self.target_score,
                reward
            );
            self.add_gold(reward);
            self.round += 1;
            self.target_score =
                next_target(self.target_score, self.tuning.round.target_multiplier);
            self.push_event(GameEvent::RoundChanged(self.round));
            self.push_event(GameEvent::TargetChanged(self.target_score));
            RoundOutcome::Won { reward }
        } else {
            self.lives = self.lives.saturating_sub(1);
            log::info!(
                "Round {} lost with {}/{} ({} lives left)",
                self.round,
                self.score,
                self.target_score,
                self.lives
            );
            self.push_event(GameEvent::LivesChanged(self.lives));
            RoundOutcome::Lost {
                lives_left: self.lives,
            }
        };
        self.push_event(GameEvent::RoundCompleted(outcome));

        match outcome {
            RoundOutcome::Won { .. } => {
                self.push_event(GameEvent::Sound(SoundCue::RoundWon));
                self.open_shop();
            }
            RoundOutcome::Lost { lives_left: 0 } => self.end_session(),
            RoundOutcome::Lost { .. } => {
                self.push_event(GameEvent::Sound(SoundCue::LifeLost));
                self.begin_round();
            }
        }
        outcome
    }

    fn end_session(&mut self) {
        self.phase = GamePhase::GameOver;
        self.current_piece = None;
        self.pending_merges.clear();
        log::info!(
            "Game over in round {} with total score {}",
            self.round,
            self.total_score
        );
        self.push_event(GameEvent::Sound(SoundCue::GameOver));
        self.push_event(GameEvent::GameOver {
            total_score: self.total_score,
            round: self.round,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_hand(state: &mut GameState) {
        state.current_piece = None;
        state.deck.clear_active();
    }

    #[test]
    fn test_reward_and_target() {
        assert_eq!(round_reward(3, 4), 7);
        assert_eq!(next_target(60, 1.5), 90);
        assert_eq!(next_target(1, 1.0), 2);
    }

    #[test]
    fn test_launch_vector_is_slingshot() {
        let physics = PhysicsTuning::default();
        let v = launch_vector(Vec2::new(100.0, 100.0), Vec2::new(90.0, 120.0), &physics);
        assert!(v.x > 0.0 && v.y < 0.0);
        let far = launch_vector(Vec2::ZERO, Vec2::new(0.0, 10_000.0), &physics);
        assert!((far.length() - physics.max_launch_speed).abs() < 1e-2);
    }

    #[test]
    fn test_spawn_drains_deck_by_one() {
        let mut state = GameState::new(11);
        state.current_piece = None;
        let before = state.deck.active_len();
        assert!(state.spawn_piece().is_some());
        assert_eq!(state.deck.active_len(), before - 1);
        // Hand is full now
        assert!(state.spawn_piece().is_none());
        assert_eq!(state.deck.active_len(), before - 1);
    }

    #[test]
    fn test_spawn_on_empty_deck_is_noop() {
        let mut state = GameState::new(11);
        empty_hand(&mut state);
        assert!(state.spawn_piece().is_none());
        assert!(state.current_piece.is_none());
        assert_eq!(state.deck.active_len(), 0);
    }

    #[test]
    fn test_throw_moves_piece_and_draws_next() {
        let mut state = GameState::new(11);
        let held = state.current_piece.as_ref().map(|p| p.id);
        let id = state.throw_piece(Vec2::new(0.0, 300.0), 1000.0).unwrap();
        assert_eq!(Some(id), held);
        assert_eq!(state.pieces.len(), 1);
        assert_eq!(state.pieces[0].vel, Vec2::new(0.0, 300.0));
        assert!(state.current_piece.is_some());
        assert_eq!(state.last_throw_ms, Some(1000.0));
    }

    #[test]
    fn test_throw_cooldown() {
        let mut state = GameState::new(11);
        state.throw_piece(Vec2::ZERO, 1000.0).unwrap();
        let err = state.throw_piece(Vec2::ZERO, 1200.0).unwrap_err();
        assert!(matches!(err, SimError::ThrowCooldown { remaining_ms } if remaining_ms > 0.0));
        assert!(state.throw_piece(Vec2::ZERO, 1500.0).is_ok());
    }

    #[test]
    fn test_throw_without_piece() {
        let mut state = GameState::new(11);
        empty_hand(&mut state);
        assert!(matches!(
            state.throw_piece(Vec2::ZERO, 0.0),
            Err(SimError::NoPieceInHand)
        ));
    }

    #[test]
    fn test_completion_waits_for_deck_and_cooldown() {
        let mut state = GameState::new(11);
        state.score = state.target_score;
        // Deck still holds cards
        assert_eq!(state.check_round_completion(1_000_000.0), None);

        empty_hand(&mut state);
        state.last_throw_ms = Some(10_000.0);
        assert_eq!(state.check_round_completion(11_000.0), None);
        assert!(matches!(
            state.check_round_completion(12_500.0),
            Some(RoundOutcome::Won { .. })
        ));
        assert_eq!(state.phase, GamePhase::ShopOpen);
        assert_eq!(state.round, 2);
    }

    #[test]
    fn test_lost_round_retries_same_target() {
        let mut state = GameState::new(11);
        let target = state.target_score;
        let lives = state.lives;
        empty_hand(&mut state);
        assert_eq!(
            state.check_round_completion(0.0),
            Some(RoundOutcome::Lost {
                lives_left: lives - 1
            })
        );
        assert_eq!(state.phase, GamePhase::InRound);
        assert_eq!(state.target_score, target);
        assert_eq!(state.round, 1);
        assert!(state.current_piece.is_some());
    }

    #[test]
    fn test_last_life_ends_session() {
        let mut state = GameState::new(11);
        state.lives = 1;
        state.drain_events();
        assert_eq!(
            state.complete_round(false),
            RoundOutcome::Lost { lives_left: 0 }
        );
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::GameOver { .. }))
        );
    }

    #[test]
    fn test_overflow_needs_resting_piece_and_settle_time() {
        let mut state = GameState::new(11);
        let y = state.container.overflow_line - 5.0;
        state.place_piece("Cherry", Vec2::new(240.0, y), Vec2::ZERO).unwrap();
        state.last_throw_ms = Some(0.0);
        assert!(!state.overflowed(100.0));
        // Still moving
        assert!(!state.overflowed(10_000.0));
        // Slow for a moment, as at the top of an arc
        state.pieces[0].at_rest = true;
        state.pieces[0].rest_ticks = 1;
        assert!(!state.overflowed(10_000.0));
        state.pieces[0].rest_ticks = state.tuning.physics.settle_ticks;
        assert!(state.overflowed(10_000.0));
    }
}
