//! Merge engine
//!
//! A pair of touching pieces is evaluated as a small state machine:
//!
//! 1. Neither piece may already be `merging` (or consumed).
//! 2. Contact ability (e.g. an eater touching something edible) wins first;
//!    its handler runs immediately and no new piece is created.
//! 3. Otherwise same family + same tier evolves into the next chain entry.
//!    Both sources are frozen and a [`PendingMerge`] is queued; the new piece
//!    appears (and scores) when the queue is drained later in the tick.
//!
//! Scans resolve at most one merge per call and return right away; other
//! eligible pairs are picked up on later contacts or ticks. Keep it that way:
//! resolving every eligible pair per pass changes how the board plays.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::abilities;
use super::piece::Piece;
use super::registry::Ability;
use super::state::{GameEvent, GameState, ParticleKind, SoundCue};

/// An evolution waiting to be committed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMerge {
    /// Ids of the two frozen source pieces
    pub sources: [u32; 2],
    /// Character type of the piece to create
    pub result: String,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Simulation time (seconds) at which the merge commits
    pub due: f64,
}

/// Why two pieces may merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// A contact ability fires; `actor_is_first` tells which side owns it
    Ability {
        ability: Ability,
        actor_is_first: bool,
    },
    /// Same family, same tier
    Evolve,
}

/// Contact abilities checked before ordinary evolution, in priority order
const CONTACT_ABILITIES: &[(Ability, Ability)] = &[(Ability::EatFruit, Ability::Edible)];

/// Decide whether two pieces can merge (contact is checked separately)
pub fn eligibility(a: &Piece, b: &Piece) -> Option<Eligibility> {
    if !a.is_active() || !b.is_active() {
        return None;
    }

    for &(actor, target) in CONTACT_ABILITIES {
        if a.has(actor) && b.has(target) {
            return Some(Eligibility::Ability {
                ability: actor,
                actor_is_first: true,
            });
        }
        if b.has(actor) && a.has(target) {
            return Some(Eligibility::Ability {
                ability: actor,
                actor_is_first: false,
            });
        }
    }

    if a.tier.is_some() && a.family == b.family && a.tier == b.tier {
        return Some(Eligibility::Evolve);
    }

    None
}

/// Touching, within the contact margin
#[inline]
pub fn in_contact(a: &Piece, b: &Piece, epsilon: f32) -> bool {
    (b.pos - a.pos).length() < a.radius + b.radius + epsilon
}

/// Try to merge the pieces at indices `i` and `j`
///
/// Returns true if a merge (or ability) was committed to.
pub fn try_merge(state: &mut GameState, i: usize, j: usize) -> bool {
    let Some(kind) = eligibility(&state.pieces[i], &state.pieces[j]) else {
        return false;
    };

    match kind {
        Eligibility::Ability {
            ability,
            actor_is_first,
        } => {
            let Some(handler) = abilities::contact_handler(ability) else {
                return false;
            };
            let (actor, target) = if actor_is_first { (i, j) } else { (j, i) };
            handler(state, actor, target);
            true
        }
        Eligibility::Evolve => begin_evolution(state, i, j),
    }
}

/// Scan every touching pair and merge the first eligible one
///
/// Returns after at most one merge.
pub fn scan_for_merge(state: &mut GameState) -> bool {
    let epsilon = state.tuning.physics.contact_epsilon;
    let count = state.pieces.len();
    for i in 0..count {
        for j in (i + 1)..count {
            let (a, b) = (&state.pieces[i], &state.pieces[j]);
            if eligibility(a, b).is_none() || !in_contact(a, b, epsilon) {
                continue;
            }
            if try_merge(state, i, j) {
                return true;
            }
        }
    }
    false
}

/// Freeze both sources and queue the evolved piece
fn begin_evolution(state: &mut GameState, i: usize, j: usize) -> bool {
    let kind = state.pieces[i].kind.clone();
    let next = match state.registry.next_tier(&kind) {
        Ok(Some(next)) => next.name.clone(),
        // Top of the chain: nothing to evolve into
        Ok(None) => return false,
        Err(e) => {
            log::warn!("Merge of {} aborted: {}", kind, e);
            return false;
        }
    };

    let due = state.sim_time + state.tuning.round.merge_delay;
    let (a, b) = (&state.pieces[i], &state.pieces[j]);
    let pending = PendingMerge {
        sources: [a.id, b.id],
        result: next,
        pos: a.pos,
        vel: a.vel,
        due,
    };
    log::debug!(
        "Merging {} #{} + #{} -> {}",
        kind,
        pending.sources[0],
        pending.sources[1],
        pending.result
    );

    state.pieces[i].merging = true;
    state.pieces[j].merging = true;
    state.pending_merges.push(pending);
    true
}

/// Commit every queued merge whose time has come
///
/// Sources leave the live set and the evolved piece enters it at the same
/// point; score is credited here, not at detection. Returns the number of
/// merges committed.
pub fn commit_due(state: &mut GameState) -> usize {
    let now = state.sim_time;
    let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending_merges)
        .into_iter()
        .partition(|m| m.due <= now);
    state.pending_merges = waiting;

    let mut committed = 0;
    for merge in due {
        let ty = match state.registry.get(&merge.result) {
            Ok(ty) => ty.clone(),
            Err(e) => {
                // Sources go back into play untouched
                log::warn!("Dropping merge into {}: {}", merge.result, e);
                for piece in state.pieces.iter_mut().filter(|p| merge.sources.contains(&p.id)) {
                    piece.merging = false;
                }
                continue;
            }
        };
        state.pieces.retain(|p| !merge.sources.contains(&p.id));

        let id = state.next_entity_id();
        let piece = Piece::at(id, &ty, merge.pos, merge.vel);
        let value = piece.value();

        state.add_score(value);
        state.spawn_particle(piece.pos, ParticleKind::ScorePopup { value });
        state.spawn_burst(piece.pos, piece.attributes.color, 6);
        state.push_event(GameEvent::Sound(SoundCue::Merge));
        state.push_event(GameEvent::Merged {
            into: ty.name.clone(),
            value,
        });

        state.pieces.push(piece.clone());
        abilities::run_evolve_effects(state, &piece);
        committed += 1;
    }
    committed
}
