use crate::entities::creature::{Creature, CreatureId};
use std::collections::BTreeMap;

/// Directory of every placed creature; the only owner of creature state.
#[derive(Debug, Default)]
pub struct CreatureRegistry {
    creatures: BTreeMap<CreatureId, Creature>,
}

impl CreatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, creature: Creature) -> Option<Creature> {
        self.creatures.insert(creature.id, creature)
    }

    pub fn remove(&mut self, id: CreatureId) -> Option<Creature> {
        self.creatures.remove(&id)
    }

    pub fn get(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    pub fn get_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.creatures.get_mut(&id)
    }

    pub fn contains(&self, id: CreatureId) -> bool {
        self.creatures.contains_key(&id)
    }

    /// Case-insensitive lookup by name.
    pub fn by_name(&self, name: &str) -> Option<&Creature> {
        let name = name.trim();
        self.creatures
            .values()
            .find(|creature| creature.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }

    pub fn ids(&self) -> Vec<CreatureId> {
        self.creatures.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.values()
    }

    pub fn players(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.values().filter(|creature| creature.is_player())
    }

    pub fn player_count(&self) -> usize {
        self.players().count()
    }

    /// Mutable access to two distinct creatures at once.
    pub fn pair_mut(
        &mut self,
        first: CreatureId,
        second: CreatureId,
    ) -> Option<(&mut Creature, &mut Creature)> {
        if first == second {
            return None;
        }
        let mut found_first = None;
        let mut found_second = None;
        for (id, creature) in self.creatures.iter_mut() {
            if *id == first {
                found_first = Some(creature);
            } else if *id == second {
                found_second = Some(creature);
            }
        }
        Some((found_first?, found_second?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::skills::Vocation;
    use crate::world::position::Position;

    #[test]
    fn names_match_ignoring_case() {
        let mut registry = CreatureRegistry::new();
        let hero = Creature::player("Hero", Position::new(1, 1, 7), Vocation::Knight);
        let id = hero.id;
        registry.insert(hero);
        registry.insert(Creature::npc("Tom", Position::new(2, 1, 7)));
        assert_eq!(registry.by_name(" hero ").map(|creature| creature.id), Some(id));
        assert_eq!(registry.player_count(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn pair_mut_needs_two_distinct_creatures() {
        let mut registry = CreatureRegistry::new();
        let a = Creature::npc("A", Position::new(1, 1, 7));
        let b = Creature::npc("B", Position::new(2, 1, 7));
        let (a_id, b_id) = (a.id, b.id);
        registry.insert(a);
        registry.insert(b);
        let (first, second) = registry.pair_mut(b_id, a_id).expect("pair");
        first.access = 1;
        second.access = 2;
        assert_eq!(registry.get(b_id).map(|c| c.access), Some(1));
        assert!(registry.pair_mut(a_id, a_id).is_none());
    }
}
