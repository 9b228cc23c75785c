//! Session state and core simulation types
//!
//! One `GameState` lives for one play session. Every core operation takes it
//! explicitly; nothing in the simulation reaches for global state.

use std::sync::Arc;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::container::Container;
use super::deck::Deck;
use super::merge::PendingMerge;
use super::piece::Piece;
use super::registry::Registry;
use super::round::RoundOutcome;
use super::shop::ShopOffer;
use super::tick::FrameClock;
use crate::consts::*;
use crate::error::SimResult;
use crate::tuning::Tuning;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Throwing and simulating
    InRound,
    /// Round won; waiting for the shop to close
    ShopOpen,
    /// Lives exhausted (terminal)
    GameOver,
}

/// Sound cues fired for the audio sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    Launch,
    Merge,
    Eat,
    RoundWon,
    LifeLost,
    GameOver,
}

/// Things the host may want to react to, queued in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Sound(SoundCue),
    ScoreChanged(u64),
    GoldChanged(u32),
    RoundChanged(u32),
    TargetChanged(u64),
    LivesChanged(u8),
    DeckCountChanged(usize),
    /// A new throwable piece is in hand
    PieceInHand(String),
    Merged { into: String, value: u32 },
    FruitEaten { eater: String, fruit: String, value: u32 },
    AsteroidsSpawned(usize),
    HazardsCleared { count: usize, value: u32 },
    RoundCompleted(RoundOutcome),
    ShopOpened,
    GameOver { total_score: u64, round: u32 },
}

impl GameEvent {
    /// Events that change something the HUD shows
    pub fn is_stat_change(&self) -> bool {
        matches!(
            self,
            GameEvent::ScoreChanged(_)
                | GameEvent::GoldChanged(_)
                | GameEvent::RoundChanged(_)
                | GameEvent::TargetChanged(_)
                | GameEvent::LivesChanged(_)
                | GameEvent::DeckCountChanged(_)
        )
    }
}

/// Visual-only particle kinds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Floating "+value" indicator
    ScorePopup { value: u32 },
    /// Short-lived coloured spark
    Spark { color: u32 },
}

/// A particle for visual effects (not gameplay-affecting)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// 1 at spawn, removed at 0
    pub life: f32,
    pub kind: ParticleKind,
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Session seed
    pub seed: u64,
    /// Deck draws, asteroid positions, shop offers
    pub(crate) rng: Pcg32,
    pub tuning: Tuning,
    /// Shared, read-only game data
    pub registry: Arc<Registry>,
    pub container: Container,

    pub phase: GamePhase,
    pub paused: bool,
    /// 1-based round number
    pub round: u32,
    /// Score of the current round
    pub score: u64,
    /// Score over the whole session
    pub total_score: u64,
    pub target_score: u64,
    pub gold: u32,
    pub lives: u8,

    pub deck: Deck,
    pub inventory: Vec<String>,
    pub shop_offers: Vec<ShopOffer>,

    /// Pieces in the container (sorted by id at the end of each tick)
    pub pieces: Vec<Piece>,
    /// Piece in hand, waiting to be thrown
    pub current_piece: Option<Piece>,
    pub pending_merges: Vec<PendingMerge>,
    pub particles: Vec<Particle>,

    /// Host timestamp of the last throw (ms)
    pub last_throw_ms: Option<f64>,
    /// Simulated seconds
    pub sim_time: f64,
    pub time_ticks: u64,
    pub clock: FrameClock,

    events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// New session with the default tuning and roster
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, Tuning::default(), Arc::new(Registry::default()))
    }

    /// New session from explicit data
    ///
    /// Starting-deck entries missing from the registry are dropped (logged).
    pub fn with_config(seed: u64, tuning: Tuning, registry: Arc<Registry>) -> Self {
        let cards: Vec<String> = tuning
            .round
            .starting_deck
            .iter()
            .filter(|name| {
                let known = registry.contains(name);
                if !known {
                    log::warn!("Dropping unknown card {} from starting deck", name);
                }
                known
            })
            .cloned()
            .collect();

        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            container: Container::new(&tuning.container),
            phase: GamePhase::InRound,
            paused: false,
            round: 1,
            score: 0,
            total_score: 0,
            target_score: tuning.round.starting_target,
            gold: tuning.round.starting_gold,
            lives: tuning.round.starting_lives,
            deck: Deck::new(cards),
            inventory: Vec::new(),
            shop_offers: Vec::new(),
            pieces: Vec::new(),
            current_piece: None,
            pending_merges: Vec::new(),
            particles: Vec::new(),
            last_throw_ms: None,
            sim_time: 0.0,
            time_ticks: 0,
            clock: FrameClock::default(),
            events: Vec::new(),
            next_id: 1,
            tuning,
            registry,
        };

        log::info!("Session started with seed {}", seed);
        state.begin_round();
        state
    }

    /// Throw the session away and start over with a new seed
    pub fn restart(&mut self, seed: u64) {
        *self = Self::with_config(seed, self.tuning.clone(), Arc::clone(&self.registry));
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every event queued since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn add_score(&mut self, value: u32) {
        self.score += u64::from(value);
        self.total_score += u64::from(value);
        self.push_event(GameEvent::ScoreChanged(self.score));
    }

    pub fn add_gold(&mut self, amount: u32) {
        self.gold += amount;
        self.push_event(GameEvent::GoldChanged(self.gold));
    }

    /// Pause or resume; resuming drops the stale clock reference
    pub fn set_paused(&mut self, paused: bool, now_ms: f64) {
        if self.paused != paused {
            log::info!("{}", if paused { "Paused" } else { "Resumed" });
        }
        self.paused = paused;
        self.clock.reset(now_ms);
    }

    /// Put a piece of the given type straight into the container
    pub fn place_piece(&mut self, kind: &str, pos: Vec2, vel: Vec2) -> SimResult<u32> {
        let ty = self.registry.get(kind)?.clone();
        let id = self.next_entity_id();
        self.pieces.push(Piece::at(id, &ty, pos, vel));
        Ok(id)
    }

    /// Pieces still on the board (not eaten or destroyed)
    pub fn live_count(&self) -> usize {
        self.pieces.iter().filter(|p| !p.consumed).count()
    }

    pub fn piece(&self, id: u32) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id == id)
    }

    /// Empty the container (deck and economy untouched)
    pub fn clear_board(&mut self) {
        self.pieces.clear();
        self.pending_merges.clear();
        self.particles.clear();
    }

    pub fn spawn_particle(&mut self, pos: Vec2, kind: ParticleKind) {
        if self.particles.len() >= MAX_PARTICLES {
            self.particles.remove(0);
        }
        let vel = match kind {
            ParticleKind::ScorePopup { .. } => Vec2::new(0.0, -POPUP_RISE_SPEED),
            ParticleKind::Spark { .. } => Vec2::ZERO,
        };
        self.particles.push(Particle {
            pos,
            vel,
            life: 1.0,
            kind,
        });
    }

    /// Ring of sparks; directions come from a hash so the gameplay RNG is untouched
    pub fn spawn_burst(&mut self, pos: Vec2, color: u32, count: u32) {
        for i in 0..count {
            let hash = (self.time_ticks as u32)
                .wrapping_mul(2654435761)
                .wrapping_add(i * 7919);
            let jitter = (hash % 1000) as f32 / 1000.0;
            let angle = std::f32::consts::TAU * (i as f32 + jitter) / count as f32;
            let speed = 80.0 + jitter * 60.0;
            self.spawn_particle(pos, ParticleKind::Spark { color });
            if let Some(spark) = self.particles.last_mut() {
                spark.vel = Vec2::new(angle.cos(), angle.sin()) * speed;
            }
        }
    }

    /// Age and move particles
    pub fn update_particles(&mut self, dt: f32) {
        for particle in self.particles.iter_mut() {
            particle.pos += particle.vel * dt;
            match particle.kind {
                ParticleKind::ScorePopup { .. } => particle.life -= dt / POPUP_LIFETIME,
                ParticleKind::Spark { .. } => {
                    particle.vel *= 0.9;
                    particle.life -= dt * 2.5;
                }
            }
        }
        self.particles.retain(|p| p.life > 0.0);
    }

    /// Keep pieces sorted by id for stable iteration order
    pub fn normalize_order(&mut self) {
        self.pieces.sort_by_key(|p| p.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_piece_in_hand() {
        let state = GameState::new(5);
        assert_eq!(state.phase, GamePhase::InRound);
        assert!(state.current_piece.is_some());
        assert_eq!(state.deck.active_len(), state.deck.static_len() - 1);
        assert_eq!(state.lives, state.tuning.round.starting_lives);
        assert!(state.pieces.is_empty());
    }

    #[test]
    fn test_unknown_starting_cards_are_dropped() {
        let mut tuning = Tuning::default();
        tuning.round.starting_deck = vec!["Cherry".into(), "Unicorn".into()];
        let state = GameState::with_config(1, tuning, Arc::new(Registry::default()));
        assert_eq!(state.deck.static_cards(), ["Cherry".to_string()]);
    }

    #[test]
    fn test_add_score_tracks_round_and_total() {
        let mut state = GameState::new(5);
        state.drain_events();
        state.add_score(10);
        assert_eq!(state.score, 10);
        assert_eq!(state.total_score, 10);
        assert_eq!(state.drain_events(), vec![GameEvent::ScoreChanged(10)]);
    }

    #[test]
    fn test_particles_expire() {
        let mut state = GameState::new(5);
        state.spawn_particle(Vec2::new(10.0, 10.0), ParticleKind::ScorePopup { value: 4 });
        state.spawn_burst(Vec2::new(10.0, 10.0), 0xffffff, 5);
        assert_eq!(state.particles.len(), 6);
        for _ in 0..150 {
            state.update_particles(1.0 / 60.0);
        }
        assert!(state.particles.is_empty());
    }

    #[test]
    fn test_particle_cap() {
        let mut state = GameState::new(5);
        for _ in 0..(MAX_PARTICLES + 10) {
            state.spawn_particle(Vec2::ZERO, ParticleKind::Spark { color: 0 });
        }
        assert_eq!(state.particles.len(), MAX_PARTICLES);
    }

    #[test]
    fn test_restart_resets_session() {
        let mut state = GameState::new(5);
        state.add_score(50);
        state.gold = 99;
        state.restart(6);
        assert_eq!(state.seed, 6);
        assert_eq!(state.score, 0);
        assert_eq!(state.gold, state.tuning.round.starting_gold);
    }
}
