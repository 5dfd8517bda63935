use crate::entities::creature::{CreatureId, CreatureSnapshot, Outfit};
use crate::entities::inventory::InventorySlot;
use crate::entities::item::ItemSnapshot;
use crate::world::position::{Direction, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechKind {
    Say,
    Whisper,
    Yell,
    Private,
    Broadcast,
    Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Advance,
    Event,
    Info,
    Status,
}

/// Something that occupies a stack position on a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThingSnapshot {
    Item(ItemSnapshot),
    Creature(CreatureSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerStats {
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub capacity: i32,
    pub experience: u64,
    pub level: u16,
    pub magic_level: u16,
}

/// One observable change, as documented fields rather than wire bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePart {
    CreatureAppear {
        position: Position,
        stackpos: usize,
        creature: CreatureSnapshot,
    },
    CreatureDisappear {
        creature: CreatureId,
        position: Position,
        stackpos: usize,
    },
    CreatureMove {
        creature: CreatureId,
        from: Position,
        from_stackpos: usize,
        to: Position,
    },
    CreatureTurn {
        creature: CreatureId,
        stackpos: usize,
        direction: Direction,
    },
    CreatureOutfit {
        creature: CreatureId,
        outfit: Outfit,
    },
    CreatureSpeed {
        creature: CreatureId,
        speed: u16,
    },
    CreatureHealth {
        creature: CreatureId,
        percent: u8,
    },
    CreatureSay {
        speaker: CreatureId,
        name: String,
        kind: SpeechKind,
        position: Position,
        text: String,
    },
    ChannelMessage {
        channel: u16,
        speaker: String,
        text: String,
    },
    Teleport {
        creature: CreatureId,
        from: Position,
        from_stackpos: usize,
        to: Position,
    },
    TileUpdated {
        position: Position,
    },
    AddThing {
        position: Position,
        thing: ThingSnapshot,
    },
    RemoveThing {
        position: Position,
        stackpos: usize,
    },
    RefreshThing {
        position: Position,
        stackpos: usize,
        item: ItemSnapshot,
    },
    MagicEffect {
        position: Position,
        effect: u8,
    },
    DistanceShoot {
        from: Position,
        to: Position,
        effect: u8,
    },
    AnimatedText {
        position: Position,
        color: u8,
        text: String,
    },
    TextMessage {
        kind: TextKind,
        text: String,
    },
    Cancel {
        text: String,
    },
    CancelWalk {
        text: String,
        direction: Direction,
    },
    CancelAttack,
    PlayerStats(PlayerStats),
    Icons(u8),
    ContainerOpened {
        cid: u8,
        container: ItemSnapshot,
        capacity: u16,
        items: Vec<ItemSnapshot>,
    },
    ContainerClosed {
        cid: u8,
    },
    ContainerAdd {
        cid: u8,
        item: ItemSnapshot,
    },
    ContainerRemove {
        cid: u8,
        index: usize,
    },
    InventorySlot {
        slot: InventorySlot,
        item: Option<ItemSnapshot>,
    },
}

/// Everything one observer is told about one action, delivered in one piece.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    pub parts: Vec<MessagePart>,
}

impl OutboundMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(part: MessagePart) -> Self {
        Self { parts: vec![part] }
    }

    pub fn push(&mut self, part: MessagePart) {
        self.parts.push(part);
    }

    pub fn extend(&mut self, parts: impl IntoIterator<Item = MessagePart>) {
        self.parts.extend(parts);
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn text(kind: TextKind, text: impl Into<String>) -> MessagePart {
        MessagePart::TextMessage {
            kind,
            text: text.into(),
        }
    }
}
