//! Ability handlers
//!
//! Two dispatch tables: contact abilities fire when their owner touches a
//! matching piece, evolve abilities fire when a merge produces their owner.
//! New abilities get a variant in [`Ability`] and an arm here.

use glam::Vec2;
use rand::Rng;

use super::piece::Piece;
use super::registry::Ability;
use super::state::{GameEvent, GameState, ParticleKind, SoundCue};

/// Runs when `actor` (index) touches `target` (index)
pub type ContactHandler = fn(&mut GameState, usize, usize);

/// Runs after a merge commits a piece carrying the ability
pub type EvolveHandler = fn(&mut GameState, &Piece);

pub fn contact_handler(ability: Ability) -> Option<ContactHandler> {
    match ability {
        Ability::EatFruit => Some(eat_fruit),
        _ => None,
    }
}

pub fn evolve_handler(ability: Ability) -> Option<EvolveHandler> {
    match ability {
        Ability::SpawnAsteroids => Some(spawn_asteroids),
        Ability::ClearHazards => Some(clear_hazards),
        _ => None,
    }
}

/// Fire every evolve ability of a freshly committed piece
pub fn run_evolve_effects(state: &mut GameState, piece: &Piece) {
    for &ability in &piece.abilities {
        if let Some(handler) = evolve_handler(ability) {
            handler(state, piece);
        }
    }
}

/// The eater swallows the fruit: fruit gone, value scored, eater unchanged
fn eat_fruit(state: &mut GameState, eater: usize, fruit: usize) {
    let eater_kind = state.pieces[eater].kind.clone();
    let food = &mut state.pieces[fruit];
    food.merging = true;
    food.consumed = true;
    let value = food.value();
    let fruit_kind = food.kind.clone();
    let pos = food.pos;

    log::debug!("{} ate {} (+{})", eater_kind, fruit_kind, value);
    state.add_score(value);
    state.spawn_particle(pos, ParticleKind::ScorePopup { value });
    state.push_event(GameEvent::Sound(SoundCue::Eat));
    state.push_event(GameEvent::FruitEaten {
        eater: eater_kind,
        fruit: fruit_kind,
        value,
    });
}

/// Drop a handful of hazards along the top of the container
fn spawn_asteroids(state: &mut GameState, _source: &Piece) {
    let hazard = match state.registry.hazard_type() {
        Ok(ty) => ty.clone(),
        Err(e) => {
            log::warn!("Cannot spawn asteroids: {}", e);
            return;
        }
    };

    let min = state.tuning.round.asteroids_min;
    let max = state.tuning.round.asteroids_max.max(min);
    let count = state.rng.random_range(min..=max);
    let radius = hazard.attributes.radius;
    let (left, right) = state.container.inner_x();
    let y = state.container.spawn_y + radius;
    let drop = Vec2::new(0.0, state.tuning.round.asteroid_drop_speed);

    for _ in 0..count {
        let x = if right - left > 2.0 * radius {
            state.rng.random_range((left + radius)..(right - radius))
        } else {
            (left + right) / 2.0
        };
        let id = state.next_entity_id();
        state.pieces.push(Piece::at(id, &hazard, Vec2::new(x, y), drop));
    }

    log::info!("{} asteroids incoming", count);
    state.push_event(GameEvent::AsteroidsSpawned(count as usize));
}

/// Destroy every hazard on the board and score their value
fn clear_hazards(state: &mut GameState, _source: &Piece) {
    let mut count = 0usize;
    let mut total = 0u32;
    let mut spots = Vec::new();
    for piece in state
        .pieces
        .iter_mut()
        .filter(|p| p.is_hazard() && !p.consumed)
    {
        piece.merging = true;
        piece.consumed = true;
        count += 1;
        total += piece.value();
        spots.push((piece.pos, piece.attributes.color));
    }
    if count == 0 {
        return;
    }

    for (pos, color) in spots {
        state.spawn_burst(pos, color, 4);
    }
    log::info!("Cleared {} hazards (+{})", count, total);
    state.add_score(total);
    state.push_event(GameEvent::HazardsCleared {
        count,
        value: total,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        let mut state = GameState::new(7);
        state.tuning.round.merge_delay = 0.0;
        state.clear_board();
        state
    }

    #[test]
    fn test_dispatch_tables() {
        assert!(contact_handler(Ability::EatFruit).is_some());
        assert!(contact_handler(Ability::Edible).is_none());
        assert!(evolve_handler(Ability::SpawnAsteroids).is_some());
        assert!(evolve_handler(Ability::ClearHazards).is_some());
        assert!(evolve_handler(Ability::Float).is_none());
    }

    #[test]
    fn test_eat_fruit_leaves_eater_unchanged() {
        let mut state = state();
        state.place_piece("Bear", Vec2::new(200.0, 600.0), Vec2::ZERO).unwrap();
        state.place_piece("Apple", Vec2::new(260.0, 600.0), Vec2::ZERO).unwrap();
        eat_fruit(&mut state, 0, 1);

        assert!(state.pieces[1].consumed);
        assert_eq!(state.pieces[0].kind, "Bear");
        assert!(state.pieces[0].is_active());
        assert_eq!(state.score, 32);
    }

    #[test]
    fn test_spawn_asteroids_within_bounds() {
        let mut state = state();
        let moon = state.place_piece("Moon", Vec2::new(240.0, 600.0), Vec2::ZERO).unwrap();
        let moon = state.pieces.iter().find(|p| p.id == moon).unwrap().clone();
        spawn_asteroids(&mut state, &moon);

        let rocks: Vec<_> = state.pieces.iter().filter(|p| p.is_hazard()).collect();
        assert!((1..=5).contains(&rocks.len()));
        let (left, right) = state.container.inner_x();
        for rock in rocks {
            assert!(rock.pos.x - rock.radius >= left && rock.pos.x + rock.radius <= right);
            assert_eq!(rock.top(), state.container.spawn_y);
            assert!(rock.vel.y > 0.0 && !rock.at_rest);
        }
    }

    #[test]
    fn test_clear_hazards_scores_each() {
        let mut state = state();
        for x in [100.0, 200.0, 300.0] {
            state.place_piece("Asteroid", Vec2::new(x, 500.0), Vec2::ZERO).unwrap();
        }
        let earth = state.place_piece("Earth", Vec2::new(240.0, 650.0), Vec2::ZERO).unwrap();
        let earth = state.pieces.iter().find(|p| p.id == earth).unwrap().clone();
        clear_hazards(&mut state, &earth);
        assert_eq!(state.pieces.iter().filter(|p| p.consumed).count(), 3);
        assert_eq!(state.score, 15);
    }
}
