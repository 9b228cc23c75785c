//! Character types, families and evolution chains
//!
//! The registry is static game data: it is built (and validated) once per
//! session and then shared read-only. Pieces copy what they need out of it
//! at spawn time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Closed set of piece capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// Can be eaten by an `EatFruit` piece
    Edible,
    /// Consumes `Edible` pieces on contact
    EatFruit,
    /// Buoyant: gravity on this piece is scaled down
    Float,
    /// While in play, gravity on every piece is multiplied
    HeavyGravity,
    /// Evolving into this type drops hazard pieces into the container
    SpawnAsteroids,
    /// Evolving into this type destroys every hazard piece
    ClearHazards,
}

/// Physical and economic attributes of a character type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub radius: f32,
    pub mass: f32,
    /// Fallback fill colour (0xRRGGBB)
    pub color: u32,
    /// Score awarded when this type is created by a merge or eaten
    pub base_value: u32,
    /// Initial decorative spin (rad/s)
    #[serde(default)]
    pub angular_velocity_seed: f32,
    /// Shop price; zero means never offered
    #[serde(default)]
    pub shop_cost: u32,
    /// Restitution override
    #[serde(default)]
    pub bounce: Option<f32>,
}

/// Immutable definition of one kind of piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterType {
    pub name: String,
    pub family: String,
    /// Position in the family's evolution chain; `None` for hazards
    pub tier: Option<u8>,
    pub attributes: Attributes,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    /// Extra image layers drawn over the body (`"{name}_{feature}"`)
    #[serde(default)]
    pub features: Vec<String>,
}

impl CharacterType {
    #[inline]
    pub fn has(&self, ability: Ability) -> bool {
        self.abilities.contains(&ability)
    }

    /// Hazards never evolve and have no merge partner
    #[inline]
    pub fn is_hazard(&self) -> bool {
        self.tier.is_none()
    }
}

/// A named evolution chain, lowest tier first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: String,
    pub chain: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Serialized registry layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryData {
    families: Vec<Family>,
    types: Vec<CharacterType>,
}

/// Validated lookup tables for character types and families
#[derive(Debug, Clone)]
pub struct Registry {
    types: BTreeMap<String, CharacterType>,
    families: BTreeMap<String, Family>,
}

impl Registry {
    /// Build a registry, rejecting data that would break merges or spawns
    pub fn new(families: Vec<Family>, types: Vec<CharacterType>) -> SimResult<Self> {
        let mut type_map = BTreeMap::new();
        for ty in types {
            let name = ty.name.clone();
            if type_map.insert(name.clone(), ty).is_some() {
                return Err(invalid(&name, "duplicate name"));
            }
        }
        let registry = Self::from_parts(families, type_map);
        registry.validate()?;
        Ok(registry)
    }

    fn from_parts(families: Vec<Family>, types: BTreeMap<String, CharacterType>) -> Self {
        Self {
            types,
            families: families.into_iter().map(|f| (f.id.clone(), f)).collect(),
        }
    }

    /// Check attributes, chain order and family membership
    pub fn validate(&self) -> SimResult<()> {
        for ty in self.types.values() {
            let attrs = &ty.attributes;
            if !(attrs.radius.is_finite() && attrs.radius > 0.0) {
                return Err(invalid(&ty.name, "radius must be positive"));
            }
            if !(attrs.mass.is_finite() && attrs.mass > 0.0) {
                return Err(invalid(&ty.name, "mass must be positive"));
            }
            if let Some(bounce) = attrs.bounce
                && !(0.0..=1.0).contains(&bounce)
            {
                return Err(invalid(&ty.name, "bounce must be within 0..=1"));
            }
        }

        for family in self.families.values() {
            for (tier, name) in family.chain.iter().enumerate() {
                let ty = self.get(name)?;
                if ty.family != family.id {
                    return Err(SimError::NotInChain {
                        name: name.clone(),
                        family: family.id.clone(),
                    });
                }
                if ty.tier != Some(tier as u8) {
                    return Err(invalid(name, "tier does not match chain position"));
                }
            }
        }

        for ty in self.types.values() {
            let family = self.family(&ty.family)?;
            if ty.tier.is_some() && !family.chain.contains(&ty.name) {
                return Err(SimError::NotInChain {
                    name: ty.name.clone(),
                    family: ty.family.clone(),
                });
            }
        }
        Ok(())
    }

    /// Parse and validate a registry from JSON
    pub fn from_json(json: &str) -> SimResult<Self> {
        let data: RegistryData = serde_json::from_str(json)?;
        Self::new(data.families, data.types)
    }

    pub fn to_json_pretty(&self) -> SimResult<String> {
        let data = RegistryData {
            families: self.families.values().cloned().collect(),
            types: self.types.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    pub fn get(&self, name: &str) -> SimResult<&CharacterType> {
        self.types
            .get(name)
            .ok_or_else(|| SimError::UnknownCharacter(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn family(&self, id: &str) -> SimResult<&Family> {
        self.families
            .get(id)
            .ok_or_else(|| SimError::UnknownFamily(id.to_string()))
    }

    /// Next type in the evolution chain; `Ok(None)` at the top of the chain
    pub fn next_tier(&self, name: &str) -> SimResult<Option<&CharacterType>> {
        let ty = self.get(name)?;
        let family = self.family(&ty.family)?;
        let pos = family
            .chain
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SimError::NotInChain {
                name: name.to_string(),
                family: family.id.clone(),
            })?;
        match family.chain.get(pos + 1) {
            Some(next) => self.get(next).map(Some),
            None => Ok(None),
        }
    }

    /// First non-evolving type, spawned by `SpawnAsteroids`
    pub fn hazard_type(&self) -> SimResult<&CharacterType> {
        self.types
            .values()
            .find(|t| t.is_hazard())
            .ok_or(SimError::MissingHazardType)
    }

    /// Types the shop may offer, in name order
    pub fn shop_candidates(&self) -> impl Iterator<Item = &CharacterType> {
        self.types
            .values()
            .filter(|t| !t.is_hazard() && t.attributes.shop_cost > 0)
    }

    pub fn types(&self) -> impl Iterator<Item = &CharacterType> {
        self.types.values()
    }

    pub fn families(&self) -> impl Iterator<Item = &Family> {
        self.families.values()
    }
}

fn invalid(name: &str, reason: &str) -> SimError {
    SimError::InvalidCharacter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Compact constructor for the built-in roster
#[allow(clippy::too_many_arguments)]
fn character(
    name: &str,
    family: &str,
    tier: Option<u8>,
    radius: f32,
    color: u32,
    base_value: u32,
    shop_cost: u32,
    abilities: &[Ability],
) -> CharacterType {
    // Mass grows with area so big pieces shove small ones around
    let mass = (radius / 16.0).powi(2);
    CharacterType {
        name: name.to_string(),
        family: family.to_string(),
        tier,
        attributes: Attributes {
            radius,
            mass,
            color,
            base_value,
            angular_velocity_seed: 1.5 - radius / 40.0,
            shop_cost,
            bounce: None,
        },
        abilities: abilities.to_vec(),
        features: vec!["face".to_string()],
    }
}

fn family(id: &str, chain: &[&str], description: &str) -> Family {
    Family {
        id: id.to_string(),
        chain: chain.iter().map(|s| s.to_string()).collect(),
        description: description.to_string(),
    }
}

impl Default for Registry {
    /// Built-in roster
    ///
    /// Valid by construction; `test_default_roster_is_valid` guards edits.
    fn default() -> Self {
        use Ability::*;

        let types = vec![
            character("Cherry", "fruit", Some(0), 14.0, 0xd7263d, 2, 1, &[Edible]),
            character("Strawberry", "fruit", Some(1), 18.0, 0xf46036, 4, 2, &[Edible]),
            character("Grape", "fruit", Some(2), 23.0, 0x7b2d8b, 8, 3, &[Edible]),
            character("Orange", "fruit", Some(3), 29.0, 0xf49d37, 16, 5, &[Edible]),
            character("Apple", "fruit", Some(4), 36.0, 0x9bc53d, 32, 8, &[Edible]),
            character("Melon", "fruit", Some(5), 45.0, 0x3f8f29, 64, 0, &[Edible]),
            character("Hamster", "critter", Some(0), 16.0, 0xe4c590, 3, 2, &[]),
            character("Rabbit", "critter", Some(1), 21.0, 0xd9d9d9, 6, 3, &[]),
            character("Monkey", "critter", Some(2), 27.0, 0x8b5a2b, 12, 6, &[EatFruit]),
            character("Bear", "critter", Some(3), 35.0, 0x5c3a1e, 24, 10, &[EatFruit]),
            character("Elephant", "critter", Some(4), 46.0, 0x8e9aaf, 48, 0, &[]),
            character("Fish", "sea", Some(0), 15.0, 0x2ec4b6, 3, 2, &[Float]),
            character("Duck", "sea", Some(1), 20.0, 0xffd23f, 6, 3, &[Float]),
            character("Turtle", "sea", Some(2), 27.0, 0x3a7d44, 12, 5, &[Float]),
            character("Whale", "sea", Some(3), 40.0, 0x1b4965, 30, 0, &[Float]),
            character("Pebble", "celestial", Some(0), 15.0, 0x9e9e9e, 3, 2, &[]),
            character("Moon", "celestial", Some(1), 24.0, 0xe0e0e0, 10, 6, &[SpawnAsteroids]),
            character("Earth", "celestial", Some(2), 34.0, 0x2a6fdb, 30, 0, &[ClearHazards]),
            character("Sun", "celestial", Some(3), 46.0, 0xffb703, 80, 0, &[HeavyGravity]),
            {
                let mut asteroid = character("Asteroid", "hazard", None, 12.0, 0x5a5a5a, 5, 0, &[]);
                asteroid.attributes.mass = 1.5;
                asteroid.attributes.bounce = Some(0.6);
                asteroid.features.clear();
                asteroid
            },
        ];

        let families = vec![
            family(
                "fruit",
                &["Cherry", "Strawberry", "Grape", "Orange", "Apple", "Melon"],
                "Ripe and ready to be eaten",
            ),
            family(
                "critter",
                &["Hamster", "Rabbit", "Monkey", "Bear", "Elephant"],
                "Hungry animals; the middle tiers eat fruit",
            ),
            family(
                "sea",
                &["Fish", "Duck", "Turtle", "Whale"],
                "Buoyant swimmers that sink slowly",
            ),
            family(
                "celestial",
                &["Pebble", "Moon", "Earth", "Sun"],
                "Rocks that grow into stars",
            ),
            family("hazard", &[], "Debris that never merges"),
        ];

        let types = types.into_iter().map(|t| (t.name.clone(), t)).collect();
        let registry = Self::from_parts(families, types);
        debug_assert!(registry.validate().is_ok(), "built-in roster is invalid");
        registry
    }
}
