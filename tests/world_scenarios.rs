use std::sync::Arc;

use tibia_core::combat::magic::{MagicEffect, ME_EXPLOSION_DAMAGE, TEXT_COLOR_FIRE};
use tibia_core::entities::creature::{Creature, CreatureId};
use tibia_core::entities::inventory::InventorySlot;
use tibia_core::entities::item::{ItemId, ItemTypeId};
use tibia_core::entities::skills::Vocation;
use tibia_core::game::movement::{ItemLocation, ItemTarget};
use tibia_core::net::message::MessagePart;
use tibia_core::net::session::RecordingSink;
use tibia_core::scheduler::clock::ManualClock;
use tibia_core::scheduler::task::GameTask;
use tibia_core::world::area::AreaShape;
use tibia_core::world::item_types::ItemTypeIndex;
use tibia_core::world::map::{FloorChange, Map, Tile};
use tibia_core::world::position::{Direction, Position};
use tibia_core::{Game, GameError, WorldSettings};

const COINS: ItemTypeId = ItemTypeId(3031);

fn at(x: u16, y: u16) -> Position {
    Position::new(x, y, 7)
}

fn flat_map() -> Map {
    Map::flat(
        "scenario",
        Arc::new(ItemTypeIndex::standard()),
        at(100, 100),
        30,
        30,
        ItemTypeId(100),
    )
}

fn game_with(map: Map, settings: WorldSettings) -> (Game, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let game = Game::new(map, settings, clock.clone());
    game.with_world(|world| world.set_rng_seed(11));
    (game, clock)
}

fn game() -> (Game, Arc<ManualClock>) {
    game_with(flat_map(), WorldSettings::default())
}

fn player(game: &Game, name: &str, position: Position, sink: &Arc<RecordingSink>) -> CreatureId {
    let creature = Creature::player(name, position, Vocation::Knight).with_session(sink.session());
    let (id, _) = game.place_creature(creature).expect("placed");
    sink.clear();
    id
}

/// Drops a stack of coins on `position`, returning its id and stack position.
fn drop_coins(game: &Game, position: Position) -> (ItemId, usize) {
    game.with_world(|world| {
        let item = world.item_types().instantiate(COINS, 10);
        let id = item.id;
        let tile = world.map.tile_mut(position).expect("tile");
        let stackpos = tile.add_item(item);
        (id, stackpos)
    })
}

/// Every place the item with `id` currently lives, as seen from `holder`.
fn owners(game: &Game, holder: CreatureId, id: ItemId) -> usize {
    game.with_world(|world| {
        let on_ground = (100..130)
            .flat_map(|x| (100..130).map(move |y| at(x, y)))
            .filter(|position| {
                world
                    .map
                    .tile(*position)
                    .map(|tile| tile.items().any(|item| item.find(id).is_some()))
                    .unwrap_or(false)
            })
            .count();
        let carried = world
            .creature(holder)
            .ok()
            .and_then(|creature| creature.player_data())
            .map(|player| player.inventory.items().filter(|(_, item)| item.find(id).is_some()).count())
            .unwrap_or(0);
        on_ground + carried
    })
}

#[test]
fn scheduler_fires_by_due_time_then_insertion_order() {
    let (game, clock) = game();
    let scheduler = game.scheduler();
    let task = |look_type| GameTask::ChangeOutfit {
        creature: CreatureId(u32::MAX),
        look_type,
    };
    scheduler.schedule(100, task(1));
    scheduler.schedule(100, task(2));
    scheduler.schedule(50, task(3));

    clock.advance(99);
    let mut order = Vec::new();
    while let Some(entry) = scheduler.pop_due() {
        order.push(entry.task);
    }
    assert_eq!(order, vec![task(3)]);

    clock.advance(1);
    while let Some(entry) = scheduler.pop_due() {
        order.push(entry.task);
    }
    assert_eq!(order, vec![task(3), task(1), task(2)]);
}

#[test]
fn tasks_for_departed_creatures_do_nothing() {
    let (game, clock) = game();
    let sink = RecordingSink::new();
    let id = player(&game, "Hero", at(105, 105), &sink);
    game.change_outfit_after(id, 230, 500).expect("changed");
    game.remove_creature(id).expect("removed");
    clock.advance(5_000);
    assert!(game.run_due_tasks() >= 1);
    assert!(game.with_world(|world| world.creatures.is_empty()));
}

#[test]
fn moved_item_always_has_exactly_one_owner() {
    let (game, _clock) = game();
    let sink = RecordingSink::new();
    let hero = player(&game, "Hero", at(105, 105), &sink);
    let (coins, stackpos) = drop_coins(&game, at(106, 105));
    assert_eq!(owners(&game, hero, coins), 1);

    game.equip_from_ground(hero, at(106, 105), stackpos, InventorySlot::RightHand)
        .expect("equipped");
    assert_eq!(owners(&game, hero, coins), 1);
    let in_hand = game.with_world(|world| {
        world
            .creature(hero)
            .ok()
            .and_then(|creature| creature.player_data())
            .and_then(|player| player.inventory.slot(InventorySlot::RightHand))
            .map(|item| item.id)
    });
    assert_eq!(in_hand, Some(coins));

    game.unequip_to_ground(hero, InventorySlot::RightHand, at(107, 105))
        .expect("dropped");
    assert_eq!(owners(&game, hero, coins), 1);
    let on_tile = game.with_world(|world| {
        world
            .map
            .tile(at(107, 105))
            .and_then(|tile| tile.item_stackpos(coins))
            .is_some()
    });
    assert!(on_tile);
}

#[test]
fn refused_move_leaves_the_world_untouched() {
    let (game, _clock) = game();
    let sink = RecordingSink::new();
    let hero = player(&game, "Hero", at(105, 105), &sink);
    let (coins, stackpos) = drop_coins(&game, at(106, 105));
    game.with_world(|world| {
        world.map.tile_mut(at(107, 105)).expect("tile").blocking = true;
    });
    let before = game.with_world(|world| world.map.tile(at(106, 105)).cloned());

    let result = game.move_item(
        hero,
        ItemLocation::Ground {
            position: at(106, 105),
            stackpos,
        },
        ItemTarget::Ground(at(107, 105)),
    );
    assert_eq!(result, Err(GameError::Rejected));
    assert_eq!(game.with_world(|world| world.map.tile(at(106, 105)).cloned()), before);
    assert_eq!(owners(&game, hero, coins), 1);

    let messages = sink.take();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].parts,
        vec![MessagePart::Cancel {
            text: "Sorry, not possible.".to_string()
        }]
    );
}

#[test]
fn one_area_effect_is_one_message_per_spectator() {
    let (game, _clock) = game();
    let watcher = RecordingSink::new();
    player(&game, "Watcher", at(110, 105), &watcher);
    let mut rats = Vec::new();
    for x in 104..=106 {
        let rat = Creature::monster("Rat", at(x, 106), 100, 10);
        rats.push(game.place_creature(rat).expect("rat").0);
    }
    watcher.clear();

    let effect = MagicEffect {
        shape: AreaShape::Circle { radius: 1 },
        min_damage: 20,
        max_damage: 20,
        damage_effect: ME_EXPLOSION_DAMAGE,
        animation_color: TEXT_COLOR_FIRE,
        ..MagicEffect::default()
    };
    game.make_magic(None, at(105, 106), &effect).expect("cast");

    assert_eq!(watcher.len(), 1);
    let texts = watcher
        .parts()
        .into_iter()
        .filter(|part| matches!(part, MessagePart::AnimatedText { text, .. } if text == "20"))
        .count();
    assert_eq!(texts, rats.len());
    for rat in rats {
        let health = game.with_world(|world| world.creature(rat).map(|rat| rat.stats.health));
        assert_eq!(health, Ok(80));
    }
}

#[test]
fn mana_shield_takes_damage_before_health() {
    let (game, _clock) = game();
    let sink = RecordingSink::new();
    let hero = player(&game, "Hero", at(105, 105), &sink);
    game.with_world(|world| {
        world.creature_mut(hero).expect("hero").timers.mana_shield_ms = 10_000;
    });

    let effect = MagicEffect::fixed(70, ME_EXPLOSION_DAMAGE, TEXT_COLOR_FIRE);
    game.make_magic(None, at(105, 105), &effect).expect("hit");

    let (health, mana) = game.with_world(|world| {
        let hero = world.creature(hero).expect("hero");
        (hero.stats.health, hero.stats.mana)
    });
    assert_eq!((health, mana), (130, 0));
    let texts: Vec<String> = sink
        .parts()
        .into_iter()
        .filter_map(|part| match part {
            MessagePart::TextMessage { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert!(texts.contains(&"You lose 50 mana.".to_string()));
    assert!(texts.contains(&"You lose 20 hitpoints.".to_string()));
}

#[test]
fn killed_player_is_told_and_leaves_a_corpse() {
    let (game, _clock) = game();
    let attacker_sink = RecordingSink::new();
    let victim_sink = RecordingSink::new();
    let knight = Creature::player("Knight", at(105, 105), Vocation::Knight)
        .with_session(attacker_sink.session());
    let knight = {
        let mut knight = knight;
        knight.min_attack = 500;
        knight.max_attack = 500;
        game.place_creature(knight).expect("knight").0
    };
    let victim = player(&game, "Victim", at(106, 105), &victim_sink);
    attacker_sink.clear();

    game.attack(knight, Some(victim)).expect("target set");
    game.make_damage(knight, victim).expect("hit");

    assert!(!game.with_world(|world| world.creatures.contains(victim)));
    let corpse = game.with_world(|world| {
        world
            .map
            .tile(at(106, 105))
            .map(|tile| tile.items().any(|item| item.type_id == ItemTypeId(3065)))
    });
    assert_eq!(corpse, Some(true));
    let told = victim_sink.parts().into_iter().any(|part| {
        matches!(part, MessagePart::TextMessage { text, .. }
            if text == "You lose 150 hitpoints due to an attack by Knight.")
    });
    assert!(told);
    let target = game.with_world(|world| world.creature(knight).map(|knight| knight.attack_target));
    assert_eq!(target, Ok(None));
}

#[test]
fn diagonal_ramp_leads_one_floor_up() {
    let mut map = flat_map();
    for x in 100..130 {
        for y in 100..130 {
            map.insert_tile(Tile::new(Position::new(x, y, 6), ItemTypeId(100)));
        }
    }
    if let Some(tile) = map.tile_mut(at(106, 105)) {
        tile.floor_change = FloorChange {
            north: true,
            east: true,
            ..FloorChange::default()
        };
    }
    let (game, _clock) = game_with(map, WorldSettings::default());
    let sink = RecordingSink::new();
    let hero = player(&game, "Hero", at(105, 105), &sink);

    let arrived = game.walk(hero, Direction::East).expect("walked");
    assert_eq!(arrived, Position::new(107, 104, 6));
    let position = game.with_world(|world| world.creature(hero).map(|hero| hero.position));
    assert_eq!(position, Ok(Position::new(107, 104, 6)));
}

#[test]
fn attacking_a_player_bars_the_protection_zone() {
    let mut map = flat_map();
    if let Some(tile) = map.tile_mut(at(104, 105)) {
        tile.protection_zone = true;
    }
    let (game, _clock) = game_with(map, WorldSettings::default());
    let sink = RecordingSink::new();
    let other = RecordingSink::new();
    let attacker = player(&game, "Attacker", at(105, 105), &sink);
    let victim = player(&game, "Victim", at(106, 105), &other);

    game.make_damage(attacker, victim).expect("hit");
    sink.clear();

    assert_eq!(
        game.walk(attacker, Direction::West),
        Err(GameError::ProtectionZoneViolation)
    );
    let position = game.with_world(|world| world.creature(attacker).map(|creature| creature.position));
    assert_eq!(position, Ok(at(105, 105)));
    assert!(matches!(
        sink.parts().as_slice(),
        [MessagePart::CancelWalk { .. }]
    ));
}

#[test]
fn full_world_turns_players_away() {
    let settings = WorldSettings {
        max_players: 1,
        ..WorldSettings::default()
    };
    let (game, _clock) = game_with(flat_map(), settings);
    game.place_creature(Creature::player("First", at(105, 105), Vocation::None))
        .expect("first");
    let second = game.place_creature(Creature::player("Second", at(106, 105), Vocation::None));
    assert!(matches!(second, Err(GameError::WorldFull)));
    let gm = Creature::player("Gm", at(107, 105), Vocation::None).with_access(3);
    assert!(game.place_creature(gm).is_ok());
}

/// Pending heartbeat and attack chains armed for `id`.
fn chains(game: &Game, id: CreatureId) -> (usize, usize) {
    let pending = game.scheduler().pending_tasks();
    let heartbeats = pending
        .iter()
        .filter(|entry| matches!(entry.task, GameTask::CheckCreature(creature, _) if creature == id))
        .count();
    let attacks = pending
        .iter()
        .filter(|entry| matches!(entry.task, GameTask::CheckAttack(creature, _) if creature == id))
        .count();
    (heartbeats, attacks)
}

#[test]
fn replaced_creature_keeps_a_single_heartbeat() {
    let (game, clock) = game();
    let sink = RecordingSink::new();
    let id = player(&game, "Hero", at(105, 105), &sink);
    let mut hero = game.remove_creature(id).expect("removed");
    hero.stats.health = 100;
    game.place_creature(hero).expect("placed again");

    for _ in 0..5 {
        clock.advance(1000);
        game.run_due_tasks();
    }

    assert_eq!(chains(&game, id), (1, 1));
    let health = game.with_world(|world| world.creature(id).map(|hero| hero.stats.health));
    assert_eq!(health, Ok(105));
}

#[test]
fn attack_heartbeat_hits_rearms_and_drops() {
    let mut map = flat_map();
    if let Some(tile) = map.tile_mut(at(110, 105)) {
        tile.protection_zone = true;
    }
    let (game, clock) = game_with(map, WorldSettings::default());
    let sink = RecordingSink::new();
    let mut knight = Creature::player("Knight", at(105, 105), Vocation::Knight).with_session(sink.session());
    knight.min_attack = 10;
    knight.max_attack = 10;
    let (knight, _) = game.place_creature(knight).expect("knight");
    let (rat, _) = game
        .place_creature(Creature::monster("Rat", at(106, 105), 100, 5))
        .expect("rat");
    let rat_health = || game.with_world(|world| world.creature(rat).map(|rat| rat.stats.health));
    let target = || game.with_world(|world| world.creature(knight).map(|knight| knight.attack_target));
    let cancelled = |sink: &Arc<RecordingSink>| {
        sink.parts()
            .iter()
            .any(|part| matches!(part, MessagePart::CancelAttack))
    };
    game.attack(knight, Some(rat)).expect("target set");

    clock.advance(2000);
    game.run_due_tasks();
    assert_eq!(rat_health(), Ok(90));
    let next: Vec<u64> = game
        .scheduler()
        .pending_tasks()
        .iter()
        .filter(|entry| matches!(entry.task, GameTask::CheckAttack(id, _) if id == knight))
        .map(|entry| entry.due_ms)
        .collect();
    assert_eq!(next, vec![4000]);

    // Out of reach: the target is kept and nothing is hit.
    let mut far = game.remove_creature(rat).expect("rat removed");
    far.position = at(115, 105);
    game.place_creature(far).expect("rat placed far");
    sink.clear();
    clock.advance(2000);
    game.run_due_tasks();
    assert_eq!(rat_health(), Ok(90));
    assert_eq!(target(), Ok(Some(rat)));
    assert!(!cancelled(&sink));

    // Inside a protection zone: the target is dropped and the client told.
    let mut safe = game.remove_creature(rat).expect("rat removed");
    safe.position = at(110, 105);
    game.place_creature(safe).expect("rat placed in zone");
    sink.clear();
    clock.advance(2000);
    game.run_due_tasks();
    assert_eq!(rat_health(), Ok(90));
    assert_eq!(target(), Ok(None));
    assert!(cancelled(&sink));

    game.remove_creature(knight).expect("knight removed");
    clock.advance(2000);
    game.run_due_tasks();
    assert_eq!(chains(&game, knight), (0, 0));
}
