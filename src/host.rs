//! Host-facing contracts
//!
//! The simulation never renders, plays sound or touches the DOM. Hosts
//! implement these traits and feed them from the event queue and the
//! render frame.

use std::collections::HashMap;

use serde::Serialize;

use crate::sim::{
    GameEvent, GamePhase, GameState, Particle, Piece, Registry, SoundCue, Wall,
};

/// Audio playback failure; always logged and ignored
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio unavailable: {0}")]
    Unavailable(String),
    #[error("playback failed: {0}")]
    Playback(String),
}

/// Fire-and-forget sound cues
pub trait AudioSink {
    fn play(&mut self, cue: SoundCue) -> Result<(), AudioError>;
}

/// Observer for the numbers shown on screen
pub trait HudSink {
    fn update(&mut self, hud: &HudSnapshot);
}

/// Produces a visual frame; the core does not wait on it
pub trait Renderer {
    fn draw(&mut self, frame: &RenderFrame<'_>);
}

/// HUD numbers at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub score: u64,
    pub target_score: u64,
    pub total_score: u64,
    pub round: u32,
    pub gold: u32,
    pub lives: u8,
    pub deck_count: usize,
    pub phase: GamePhase,
    pub paused: bool,
}

/// Everything the renderer needs besides the pieces themselves
#[derive(Debug, Clone, Serialize)]
pub struct RenderConfig<'a> {
    pub width: f32,
    pub height: f32,
    pub debug: bool,
    /// Piece highlighted by the host (e.g. hovered)
    pub selected: Option<u32>,
    pub deck_count: usize,
    pub walls: &'a [Wall],
    pub overflow_line: f32,
}

/// One frame's worth of drawable state
#[derive(Debug, Clone, Serialize)]
pub struct RenderFrame<'a> {
    pub pieces: &'a [Piece],
    pub current_piece: Option<&'a Piece>,
    pub particles: &'a [Particle],
    pub config: RenderConfig<'a>,
}

impl GameState {
    pub fn hud_snapshot(&self) -> HudSnapshot {
        HudSnapshot {
            score: self.score,
            target_score: self.target_score,
            total_score: self.total_score,
            round: self.round,
            gold: self.gold,
            lives: self.lives,
            deck_count: self.deck.active_len(),
            phase: self.phase,
            paused: self.paused,
        }
    }

    /// Borrow the current state as a render frame
    pub fn render_frame(&self, debug: bool, selected: Option<u32>) -> RenderFrame<'_> {
        RenderFrame {
            pieces: &self.pieces,
            current_piece: self.current_piece.as_ref(),
            particles: &self.particles,
            config: RenderConfig {
                width: self.container.width,
                height: self.container.height,
                debug,
                selected,
                deck_count: self.deck.active_len(),
                walls: &self.container.walls,
                overflow_line: self.container.overflow_line,
            },
        }
    }
}

/// Forward a batch of events: cues to the audio sink, one HUD refresh if any
/// stat changed
pub fn dispatch_events<A, H>(events: &[GameEvent], state: &GameState, audio: &mut A, hud: &mut H)
where
    A: AudioSink + ?Sized,
    H: HudSink + ?Sized,
{
    let mut stats_changed = false;
    for event in events {
        if let GameEvent::Sound(cue) = event
            && let Err(e) = audio.play(*cue)
        {
            log::warn!("Sound {:?} failed: {}", cue, e);
        }
        stats_changed |= event.is_stat_change();
    }
    if stats_changed {
        hud.update(&state.hud_snapshot());
    }
}

/// Image cache key for a piece's body
pub fn image_key(name: &str) -> String {
    name.to_string()
}

/// Image cache key for a piece's face overlay
pub fn face_key(name: &str) -> String {
    format!("{name}_face")
}

/// Image cache key for a named feature overlay
pub fn feature_key(name: &str, feature: &str) -> String {
    format!("{name}_{feature}")
}

/// What to draw for a piece body
#[derive(Debug, PartialEq)]
pub enum Sprite<'a, H> {
    Image(&'a H),
    /// Solid colour disc with the type name
    Fallback { color: u32, label: &'a str },
}

/// Loaded image handles keyed by [`image_key`] / [`face_key`] / [`feature_key`]
///
/// A failed load leaves its slot empty; lookups then fall back to colour.
#[derive(Debug)]
pub struct ImageCache<H> {
    entries: HashMap<String, Option<H>>,
}

impl<H> Default for ImageCache<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<H> ImageCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key the preloader should request for a registry
    pub fn wanted_keys(registry: &Registry) -> Vec<String> {
        let mut keys = Vec::new();
        for ty in registry.types() {
            keys.push(image_key(&ty.name));
            for feature in &ty.features {
                keys.push(feature_key(&ty.name, feature));
            }
        }
        keys
    }

    pub fn insert(&mut self, key: impl Into<String>, handle: H) {
        self.entries.insert(key.into(), Some(handle));
    }

    /// Record a load failure; the slot stays empty
    pub fn mark_failed(&mut self, key: impl Into<String>) {
        let key = key.into();
        log::warn!("Image {} failed to load, using colour fallback", key);
        self.entries.insert(key, None);
    }

    pub fn get(&self, key: &str) -> Option<&H> {
        self.entries.get(key).and_then(Option::as_ref)
    }

    pub fn loaded_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_some()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_none()).count()
    }

    /// Body sprite for a piece, or the colour-plus-label fallback
    pub fn sprite<'a>(&'a self, piece: &'a Piece) -> Sprite<'a, H> {
        match self.get(&image_key(&piece.kind)) {
            Some(handle) => Sprite::Image(handle),
            None => Sprite::Fallback {
                color: piece.attributes.color,
                label: &piece.kind,
            },
        }
    }

    pub fn face(&self, piece: &Piece) -> Option<&H> {
        self.get(&face_key(&piece.kind))
    }
}
