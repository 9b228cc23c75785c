//! Static (owned) deck and active (draw) deck

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::registry::Registry;

/// The player's pieces
///
/// `static_deck` is the persistent collection, edited only by the shop.
/// `active` is a shuffled working copy drained by spawning during a round;
/// it never holds more cards than the static deck.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deck {
    static_deck: Vec<String>,
    active: Vec<String>,
}

impl Deck {
    pub fn new(cards: Vec<String>) -> Self {
        Self {
            static_deck: cards,
            active: Vec::new(),
        }
    }

    pub fn static_cards(&self) -> &[String] {
        &self.static_deck
    }

    pub fn active_cards(&self) -> &[String] {
        &self.active
    }

    #[inline]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    #[inline]
    pub fn static_len(&self) -> usize {
        self.static_deck.len()
    }

    /// Replace the active deck with a reshuffled copy of the static deck
    pub fn refill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.active = self.static_deck.clone();
        self.active.shuffle(rng);
    }

    /// Remove one uniformly random card from the active deck
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.active.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.active.len());
        Some(self.active.swap_remove(idx))
    }

    /// Add a card to the static deck (takes effect at the next refill)
    pub fn add(&mut self, name: String) {
        self.static_deck.push(name);
    }

    /// Remove one copy of a card from the static deck
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(idx) = self.static_deck.iter().position(|c| c == name) else {
            return false;
        };
        self.static_deck.remove(idx);
        if self.active.len() > self.static_deck.len() {
            if let Some(active_idx) = self.active.iter().position(|c| c == name) {
                self.active.swap_remove(active_idx);
            } else {
                self.active.truncate(self.static_deck.len());
            }
        }
        true
    }

    pub fn clear_active(&mut self) {
        self.active.clear();
    }

    /// Number of different families among the owned cards
    pub fn distinct_families(&self, registry: &Registry) -> usize {
        self.static_deck
            .iter()
            .filter_map(|name| registry.get(name).ok())
            .map(|ty| ty.family.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}
