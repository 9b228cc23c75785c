//! Between-round shop
//!
//! Opens after a won round. Purchases go to the static deck or to the
//! inventory; closing the shop starts the next round.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::registry::{CharacterType, Registry};
use super::state::{GameEvent, GamePhase, GameState};
use crate::error::{SimError, SimResult};

/// One purchasable card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopOffer {
    pub kind: String,
    pub cost: u32,
}

/// Where a purchase lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseTarget {
    /// Straight into the static deck
    Deck,
    /// Held aside until equipped
    Inventory,
}

/// Everything the shop UI shows
#[derive(Debug, Clone, Serialize)]
pub struct ShopView {
    pub deck: Vec<String>,
    pub inventory: Vec<String>,
    pub offers: Vec<ShopOffer>,
    pub gold: u32,
}

/// Sample up to `count` distinct offers from the purchasable types
pub fn roll_offers<R: Rng + ?Sized>(registry: &Registry, rng: &mut R, count: usize) -> Vec<ShopOffer> {
    let mut candidates: Vec<&CharacterType> = registry.shop_candidates().collect();
    candidates.shuffle(rng);
    candidates
        .into_iter()
        .take(count)
        .map(|ty| ShopOffer {
            kind: ty.name.clone(),
            cost: ty.attributes.shop_cost,
        })
        .collect()
}

impl GameState {
    /// Enter the shop phase with a fresh set of offers
    pub fn open_shop(&mut self) {
        self.phase = GamePhase::ShopOpen;
        self.current_piece = None;
        self.shop_offers = roll_offers(&self.registry, &mut self.rng, self.tuning.shop.offer_count);
        log::info!(
            "Shop open: {}",
            self.shop_offers
                .iter()
                .map(|o| format!("{} ({}g)", o.kind, o.cost))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.push_event(GameEvent::ShopOpened);
    }

    fn require_shop(&self) -> SimResult<()> {
        if self.phase == GamePhase::ShopOpen {
            Ok(())
        } else {
            Err(SimError::WrongPhase {
                expected: GamePhase::ShopOpen,
                actual: self.phase,
            })
        }
    }

    /// Buy the offer in `slot`; the slot is removed from the offer list
    pub fn buy_offer(&mut self, slot: usize, target: PurchaseTarget) -> SimResult<String> {
        self.require_shop()?;
        let offer = self
            .shop_offers
            .get(slot)
            .cloned()
            .ok_or(SimError::OfferNotFound(slot))?;
        if offer.cost > self.gold {
            return Err(SimError::InsufficientGold {
                cost: offer.cost,
                gold: self.gold,
            });
        }

        self.gold -= offer.cost;
        self.shop_offers.remove(slot);
        match target {
            PurchaseTarget::Deck => self.deck.add(offer.kind.clone()),
            PurchaseTarget::Inventory => self.inventory.push(offer.kind.clone()),
        }
        log::info!("Bought {} for {}g ({:?})", offer.kind, offer.cost, target);
        self.push_event(GameEvent::GoldChanged(self.gold));
        Ok(offer.kind)
    }

    /// Move an inventory item into the static deck
    pub fn equip_from_inventory(&mut self, slot: usize) -> SimResult<String> {
        self.require_shop()?;
        if slot >= self.inventory.len() {
            return Err(SimError::InventorySlotEmpty(slot));
        }
        let name = self.inventory.remove(slot);
        self.deck.add(name.clone());
        Ok(name)
    }

    /// Sell one copy of a card from the static deck; returns the refund
    pub fn sell_card(&mut self, name: &str) -> SimResult<u32> {
        self.require_shop()?;
        if !self.deck.static_cards().iter().any(|c| c == name) {
            return Err(SimError::NotInDeck(name.to_string()));
        }
        let cost = self.registry.get(name)?.attributes.shop_cost;
        let refund = (cost as f32 * self.tuning.shop.sell_refund).floor() as u32;

        self.deck.remove(name);
        self.add_gold(refund);
        log::info!("Sold {} for {}g", name, refund);
        Ok(refund)
    }

    /// Leave the shop and start the next round
    pub fn close_shop(&mut self) -> SimResult<()> {
        self.require_shop()?;
        self.begin_round();
        Ok(())
    }

    pub fn shop_view(&self) -> ShopView {
        ShopView {
            deck: self.deck.static_cards().to_vec(),
            inventory: self.inventory.clone(),
            offers: self.shop_offers.clone(),
            gold: self.gold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::BTreeSet;

    fn shop_state() -> GameState {
        let mut state = GameState::new(21);
        state.open_shop();
        state
    }

    #[test]
    fn test_offers_are_distinct_and_purchasable() {
        let registry = Registry::default();
        let mut rng = Pcg32::seed_from_u64(4);
        let offers = roll_offers(&registry, &mut rng, 3);
        assert_eq!(offers.len(), 3);
        let names: BTreeSet<_> = offers.iter().map(|o| o.kind.as_str()).collect();
        assert_eq!(names.len(), 3);
        for offer in &offers {
            let ty = registry.get(&offer.kind).unwrap();
            assert!(!ty.is_hazard());
            assert_eq!(offer.cost, ty.attributes.shop_cost);
        }
    }

    #[test]
    fn test_buy_to_deck_and_inventory() {
        let mut state = shop_state();
        state.gold = 1000;
        let deck_before = state.deck.static_len();

        let first = state.buy_offer(0, PurchaseTarget::Deck).unwrap();
        assert_eq!(state.deck.static_len(), deck_before + 1);
        assert_eq!(state.deck.static_cards().last(), Some(&first));

        let second = state.buy_offer(0, PurchaseTarget::Inventory).unwrap();
        assert_eq!(state.inventory, vec![second.clone()]);
        assert_eq!(state.shop_offers.len(), 1);

        assert_eq!(state.equip_from_inventory(0).unwrap(), second);
        assert!(state.inventory.is_empty());
        assert_eq!(state.deck.static_len(), deck_before + 2);
        assert!(matches!(
            state.equip_from_inventory(0),
            Err(SimError::InventorySlotEmpty(0))
        ));
    }

    #[test]
    fn test_buy_needs_gold() {
        let mut state = shop_state();
        state.gold = 0;
        assert!(matches!(
            state.buy_offer(0, PurchaseTarget::Deck),
            Err(SimError::InsufficientGold { gold: 0, .. })
        ));
        assert_eq!(state.shop_offers.len(), state.tuning.shop.offer_count);
        assert!(matches!(
            state.buy_offer(99, PurchaseTarget::Deck),
            Err(SimError::OfferNotFound(99))
        ));
    }

    #[test]
    fn test_sell_refunds_part_of_cost() {
        let mut state = shop_state();
        let gold = state.gold;
        let cost = state.registry.get("Hamster").unwrap().attributes.shop_cost;
        let refund = state.sell_card("Hamster").unwrap();
        assert_eq!(refund, (cost as f32 * 0.5).floor() as u32);
        assert_eq!(state.gold, gold + refund);
        assert!(matches!(
            state.sell_card("Melon"),
            Err(SimError::NotInDeck(_))
        ));
    }

    #[test]
    fn test_close_starts_next_round() {
        let mut state = shop_state();
        state.close_shop().unwrap();
        assert_eq!(state.phase, GamePhase::InRound);
        assert!(state.current_piece.is_some());
        assert!(state.shop_offers.is_empty());
        assert!(state.close_shop().is_err());
    }

    #[test]
    fn test_shop_ops_rejected_in_round() {
        let mut state = GameState::new(21);
        assert!(matches!(
            state.buy_offer(0, PurchaseTarget::Deck),
            Err(SimError::WrongPhase { .. })
        ));
        assert!(state.sell_card("Cherry").is_err());
    }
}
