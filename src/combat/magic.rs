use crate::combat::conditions::{ConditionKind, DamageTicks};
use crate::combat::damage::CombatRng;
use crate::entities::creature::CreatureId;
use crate::entities::item::{FieldData, FieldDamage, Item, ItemTypeId};
use crate::entities::skills::Vocation;
use crate::world::area::AreaShape;
use std::collections::HashMap;

pub const ME_DRAW_BLOOD: u8 = 0;
pub const ME_LOSE_ENERGY: u8 = 1;
pub const ME_PUFF: u8 = 2;
pub const ME_BLOCK_HIT: u8 = 3;
pub const ME_EXPLOSION_AREA: u8 = 4;
pub const ME_EXPLOSION_DAMAGE: u8 = 5;
pub const ME_FIRE_AREA: u8 = 6;
pub const ME_MAGIC_BLUE: u8 = 11;
pub const ME_MAGIC_BLOOD: u8 = 12;
pub const ME_ENERGY_AREA: u8 = 13;
pub const ME_ENERGY_DAMAGE: u8 = 14;
pub const ME_POISON_AREA: u8 = 17;
pub const ME_HIT_BY_FIRE: u8 = 20;
pub const ME_HIT_BY_POISON: u8 = 21;

pub const ANI_POWERBOLT: u8 = 3;
pub const ANI_ENERGY: u8 = 5;
pub const ANI_FIRE: u8 = 4;
pub const ANI_SUDDEN_DEATH: u8 = 10;

pub const TEXT_COLOR_PHYSICAL: u8 = 0xB4;
pub const TEXT_COLOR_FIRE: u8 = 0xC6;
pub const TEXT_COLOR_ENERGY: u8 = 0x23;
pub const TEXT_COLOR_POISON: u8 = 0x1E;
pub const TEXT_COLOR_HEAL: u8 = 0x1E;
pub const TEXT_COLOR_MANA: u8 = 2;
pub const TEXT_COLOR_EXPERIENCE: u8 = 0xD7;

/// Field item a magic effect leaves on every tile it touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub type_id: ItemTypeId,
    pub damage: FieldDamage,
    pub stages: u8,
    pub stage_ms: u64,
}

/// A damage-over-time condition handed to every creature the effect hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionSpec {
    pub kind: ConditionKind,
    pub damage: i32,
    pub count: u16,
    pub interval_ms: u32,
}

/// Buff granted to the caster on a successful cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfBuff {
    ManaShield { duration_ms: i64 },
    Haste { duration_ms: i64, speed_bonus: u16 },
}

/// Everything the area-effect engine needs to resolve one cast.
///
/// Negative damage heals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicEffect {
    pub shape: AreaShape,
    pub min_damage: i32,
    pub max_damage: i32,
    pub mana_cost: i32,
    pub offensive: bool,
    pub exhausts: bool,
    /// Physical hits draw blood.
    pub physical: bool,
    /// The center tile must hold a creature for the cast to happen.
    pub requires_target: bool,
    pub animation_color: u8,
    /// Shown on each creature that is hit.
    pub damage_effect: u8,
    /// Shown on tiles of the area that hold nobody.
    pub area_effect: Option<u8>,
    pub distance_effect: Option<u8>,
    pub field: Option<FieldSpec>,
    pub condition: Option<ConditionSpec>,
    pub self_buff: Option<SelfBuff>,
}

impl Default for MagicEffect {
    fn default() -> Self {
        Self {
            shape: AreaShape::Point,
            min_damage: 0,
            max_damage: 0,
            mana_cost: 0,
            offensive: true,
            exhausts: true,
            physical: false,
            requires_target: false,
            animation_color: TEXT_COLOR_PHYSICAL,
            damage_effect: ME_MAGIC_BLOOD,
            area_effect: None,
            distance_effect: None,
            field: None,
            condition: None,
            self_buff: None,
        }
    }
}

impl MagicEffect {
    /// A fixed-damage hit, as used by privileged commands and condition ticks.
    pub fn fixed(damage: i32, damage_effect: u8, animation_color: u8) -> Self {
        Self {
            min_damage: damage,
            max_damage: damage,
            exhausts: false,
            damage_effect,
            animation_color,
            ..Self::default()
        }
    }

    /// The hit a damage-over-time tick of `kind` deals.
    pub fn condition_tick(kind: ConditionKind, damage: i32) -> Self {
        let (effect, color) = match kind {
            ConditionKind::Fire => (ME_HIT_BY_FIRE, TEXT_COLOR_FIRE),
            ConditionKind::Poison => (ME_HIT_BY_POISON, TEXT_COLOR_POISON),
            ConditionKind::Energy => (ME_ENERGY_DAMAGE, TEXT_COLOR_ENERGY),
        };
        Self::fixed(damage, effect, color)
    }

    /// The hit a creature takes when stepping into a field.
    pub fn field_step(damage: &FieldDamage) -> Self {
        let mut effect = Self::condition_tick(damage.condition, damage.initial_damage);
        if damage.tick_count > 0 {
            effect.condition = Some(ConditionSpec {
                kind: damage.condition,
                damage: damage.tick_damage,
                count: damage.tick_count,
                interval_ms: damage.tick_interval_ms,
            });
        }
        effect
    }

    pub fn is_healing(&self) -> bool {
        self.max_damage < 0
    }

    pub fn can_cast(&self, center_blocking: bool, has_target: bool) -> bool {
        if self.requires_target {
            has_target
        } else {
            !center_blocking || has_target
        }
    }

    /// Whether a successful cast exhausts the caster. Offensive effects need
    /// at least one valid target tile, occupied or not.
    pub fn causes_exhaustion(&self, had_target_tiles: bool) -> bool {
        self.exhausts && (!self.offensive || had_target_tiles)
    }

    /// Damage dealt to one target; creatures above the caster's privilege are spared.
    pub fn roll_damage(&self, rng: &mut CombatRng, caster_access: u8, target_access: u8) -> i32 {
        if target_access > caster_access {
            return 0;
        }
        rng.roll_range(self.min_damage, self.max_damage)
    }

    /// A fresh field for a tile, unless the tile cannot hold one.
    pub fn field_item(
        &self,
        owner: Option<CreatureId>,
        protection_zone: bool,
        blocking: bool,
    ) -> Option<Item> {
        let spec = self.field.as_ref()?;
        if protection_zone || blocking {
            return None;
        }
        Some(Item::field(
            spec.type_id,
            FieldData {
                owner,
                damage: spec.damage,
                remaining_stages: spec.stages.max(1),
                stage_ms: spec.stage_ms,
            },
        ))
    }

    pub fn condition_ticks(&self, owner: Option<CreatureId>) -> Option<(ConditionKind, DamageTicks)> {
        let spec = self.condition?;
        Some((
            spec.kind,
            DamageTicks {
                damage: spec.damage,
                remaining: spec.count,
                interval_ms: spec.interval_ms,
                owner,
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spell {
    pub words: String,
    pub magic_level: u16,
    pub vocations: Vec<Vocation>,
    pub effect: MagicEffect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rune {
    pub type_id: ItemTypeId,
    pub magic_level: u16,
    pub effect: MagicEffect,
}

/// Instant spells keyed by their words and runes keyed by item type.
#[derive(Debug, Clone, Default)]
pub struct SpellBook {
    spells: HashMap<String, Spell>,
    runes: HashMap<ItemTypeId, Rune>,
}

impl SpellBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_spell(&mut self, spell: Spell) {
        self.spells.insert(spell.words.to_lowercase(), spell);
    }

    pub fn add_rune(&mut self, rune: Rune) {
        self.runes.insert(rune.type_id, rune);
    }

    pub fn spell(&self, words: &str) -> Option<&Spell> {
        self.spells.get(&words.trim().to_lowercase())
    }

    pub fn rune(&self, type_id: ItemTypeId) -> Option<&Rune> {
        self.runes.get(&type_id)
    }

    pub fn spell_count(&self) -> usize {
        self.spells.len()
    }

    /// The classic starter set of spells and runes.
    pub fn standard() -> Self {
        let casters = vec![Vocation::Sorcerer, Vocation::Druid];
        let all = vec![
            Vocation::Sorcerer,
            Vocation::Druid,
            Vocation::Paladin,
            Vocation::Knight,
        ];
        let mut book = Self::new();

        book.add_spell(Spell {
            words: "exura".to_string(),
            magic_level: 1,
            vocations: all.clone(),
            effect: MagicEffect {
                min_damage: -40,
                max_damage: -20,
                mana_cost: 25,
                offensive: false,
                animation_color: TEXT_COLOR_HEAL,
                damage_effect: ME_MAGIC_BLUE,
                ..MagicEffect::default()
            },
        });
        book.add_spell(Spell {
            words: "exura gran".to_string(),
            magic_level: 3,
            vocations: vec![Vocation::Sorcerer, Vocation::Druid, Vocation::Paladin],
            effect: MagicEffect {
                min_damage: -90,
                max_damage: -60,
                mana_cost: 40,
                offensive: false,
                animation_color: TEXT_COLOR_HEAL,
                damage_effect: ME_MAGIC_BLUE,
                ..MagicEffect::default()
            },
        });
        book.add_spell(Spell {
            words: "exevo flam hur".to_string(),
            magic_level: 4,
            vocations: casters.clone(),
            effect: MagicEffect {
                shape: AreaShape::Cone {
                    range: 4,
                    angle_degrees: 45,
                },
                min_damage: 20,
                max_damage: 45,
                mana_cost: 25,
                animation_color: TEXT_COLOR_FIRE,
                damage_effect: ME_HIT_BY_FIRE,
                area_effect: Some(ME_FIRE_AREA),
                ..MagicEffect::default()
            },
        });
        book.add_spell(Spell {
            words: "exevo vis lux".to_string(),
            magic_level: 6,
            vocations: vec![Vocation::Sorcerer],
            effect: MagicEffect {
                shape: AreaShape::Line { length: 5 },
                min_damage: 40,
                max_damage: 80,
                mana_cost: 100,
                animation_color: TEXT_COLOR_ENERGY,
                damage_effect: ME_ENERGY_DAMAGE,
                area_effect: Some(ME_ENERGY_AREA),
                ..MagicEffect::default()
            },
        });
        book.add_spell(Spell {
            words: "utamo vita".to_string(),
            magic_level: 5,
            vocations: casters.clone(),
            effect: MagicEffect {
                mana_cost: 50,
                offensive: false,
                damage_effect: ME_MAGIC_BLUE,
                self_buff: Some(SelfBuff::ManaShield {
                    duration_ms: 200_000,
                }),
                ..MagicEffect::default()
            },
        });
        book.add_spell(Spell {
            words: "utani hur".to_string(),
            magic_level: 2,
            vocations: all,
            effect: MagicEffect {
                mana_cost: 60,
                offensive: false,
                damage_effect: ME_MAGIC_BLUE,
                self_buff: Some(SelfBuff::Haste {
                    duration_ms: 30_000,
                    speed_bonus: 40,
                }),
                ..MagicEffect::default()
            },
        });

        book.add_rune(Rune {
            type_id: ItemTypeId(2268),
            magic_level: 15,
            effect: MagicEffect {
                min_damage: 80,
                max_damage: 150,
                mana_cost: 110,
                requires_target: true,
                animation_color: TEXT_COLOR_PHYSICAL,
                damage_effect: ME_MAGIC_BLOOD,
                distance_effect: Some(ANI_SUDDEN_DEATH),
                ..MagicEffect::default()
            },
        });
        book.add_rune(Rune {
            type_id: ItemTypeId(2273),
            magic_level: 8,
            effect: MagicEffect {
                min_damage: -250,
                max_damage: -150,
                mana_cost: 100,
                offensive: false,
                requires_target: true,
                animation_color: TEXT_COLOR_HEAL,
                damage_effect: ME_MAGIC_BLUE,
                ..MagicEffect::default()
            },
        });
        book.add_rune(Rune {
            type_id: ItemTypeId(2304),
            magic_level: 4,
            effect: MagicEffect {
                shape: AreaShape::Circle { radius: 3 },
                min_damage: 25,
                max_damage: 55,
                mana_cost: 120,
                animation_color: TEXT_COLOR_FIRE,
                damage_effect: ME_HIT_BY_FIRE,
                area_effect: Some(ME_FIRE_AREA),
                distance_effect: Some(ANI_FIRE),
                ..MagicEffect::default()
            },
        });
        book.add_rune(Rune {
            type_id: ItemTypeId(2313),
            magic_level: 6,
            effect: MagicEffect {
                shape: AreaShape::Circle { radius: 1 },
                min_damage: 30,
                max_damage: 60,
                mana_cost: 80,
                physical: true,
                animation_color: TEXT_COLOR_PHYSICAL,
                damage_effect: ME_EXPLOSION_DAMAGE,
                area_effect: Some(ME_EXPLOSION_AREA),
                distance_effect: Some(ANI_POWERBOLT),
                ..MagicEffect::default()
            },
        });
        for (rune, field, condition, effect, color) in [
            (2301, 1492, ConditionKind::Fire, ME_FIRE_AREA, TEXT_COLOR_FIRE),
            (2285, 1496, ConditionKind::Poison, ME_POISON_AREA, TEXT_COLOR_POISON),
            (2277, 1495, ConditionKind::Energy, ME_ENERGY_AREA, TEXT_COLOR_ENERGY),
        ] {
            let damage = field_damage(condition);
            book.add_rune(Rune {
                type_id: ItemTypeId(rune),
                magic_level: 1,
                effect: MagicEffect {
                    mana_cost: 60,
                    min_damage: damage.initial_damage,
                    max_damage: damage.initial_damage,
                    animation_color: color,
                    damage_effect: effect,
                    area_effect: Some(effect),
                    distance_effect: Some(ANI_FIRE),
                    field: Some(FieldSpec {
                        type_id: ItemTypeId(field),
                        damage,
                        stages: 3,
                        stage_ms: 45_000,
                    }),
                    condition: (damage.tick_count > 0).then_some(ConditionSpec {
                        kind: condition,
                        damage: damage.tick_damage,
                        count: damage.tick_count,
                        interval_ms: damage.tick_interval_ms,
                    }),
                    ..MagicEffect::default()
                },
            });
        }
        book
    }
}

fn field_damage(kind: ConditionKind) -> FieldDamage {
    match kind {
        ConditionKind::Fire => FieldDamage {
            condition: kind,
            initial_damage: 20,
            tick_damage: 10,
            tick_count: 7,
            tick_interval_ms: 4000,
        },
        ConditionKind::Poison => FieldDamage {
            condition: kind,
            initial_damage: 5,
            tick_damage: 5,
            tick_count: 5,
            tick_interval_ms: 5000,
        },
        ConditionKind::Energy => FieldDamage {
            condition: kind,
            initial_damage: 30,
            tick_damage: 25,
            tick_count: 1,
            tick_interval_ms: 10_000,
        },
    }
}
