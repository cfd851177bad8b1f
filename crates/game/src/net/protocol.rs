use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u8 = 1;
pub const DEFAULT_PORT: u16 = 7777;
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Largest encoded message: one tag byte plus the widest payload record.
pub const MAX_MESSAGE_SIZE: usize = 24;

/// Protocol errors on a connection are tolerated up to this count before
/// the peer is disconnected.
pub const PROTOCOL_STRIKE_LIMIT: u32 = 3;

/// Every message on the wire starts with one of these tag bytes; the
/// remaining bytes are a fixed-layout record determined solely by the
/// tag. Values below 100 are client requests, the rest are server
/// notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageTag {
    Hello = 1,
    PlayerState = 2,
    SpawnAttack = 3,
    DamagePlayer = 4,
    DamageTower = 5,
    DamageBase = 6,
    DamageMinion = 7,
    MatchResult = 89,

    Welcome = 101,
    PlayerStateNotice = 102,
    SpawnAttackNotice = 103,
    PlayerDamageNotice = 104,
    TowerDamageNotice = 105,
    BaseDamageNotice = 106,
    MinionDamageNotice = 107,
    GameStart = 188,
    GameResult = 189,
    DestroyObject = 198,
    PlayerDisconnect = 199,
}

impl MessageTag {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Hello),
            2 => Some(Self::PlayerState),
            3 => Some(Self::SpawnAttack),
            4 => Some(Self::DamagePlayer),
            5 => Some(Self::DamageTower),
            6 => Some(Self::DamageBase),
            7 => Some(Self::DamageMinion),
            89 => Some(Self::MatchResult),
            101 => Some(Self::Welcome),
            102 => Some(Self::PlayerStateNotice),
            103 => Some(Self::SpawnAttackNotice),
            104 => Some(Self::PlayerDamageNotice),
            105 => Some(Self::TowerDamageNotice),
            106 => Some(Self::BaseDamageNotice),
            107 => Some(Self::MinionDamageNotice),
            188 => Some(Self::GameStart),
            189 => Some(Self::GameResult),
            198 => Some(Self::DestroyObject),
            199 => Some(Self::PlayerDisconnect),
            _ => None,
        }
    }

    /// Payload size in bytes for this tag, known statically. Records
    /// encode field-by-field in declaration order: u8/bool take one
    /// byte, f32/i32/u32 take four, little-endian, no padding.
    pub fn payload_len(self) -> usize {
        match self {
            Self::Hello => 1,
            Self::PlayerState => 22,
            Self::SpawnAttack => 9,
            Self::DamagePlayer | Self::DamageTower | Self::DamageBase | Self::DamageMinion => 5,
            Self::MatchResult => 1,
            Self::Welcome => 2,
            Self::PlayerStateNotice => 23,
            Self::SpawnAttackNotice => 23,
            Self::PlayerDamageNotice
            | Self::TowerDamageNotice
            | Self::BaseDamageNotice
            | Self::MinionDamageNotice => 5,
            Self::GameStart => 0,
            Self::GameResult => 1,
            Self::DestroyObject => 5,
            Self::PlayerDisconnect => 1,
        }
    }
}

/// Object kinds addressable by destroy notices. Minions are absent on
/// purpose: a minion's destruction is signaled by a damage notice whose
/// health is zero or below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectType {
    Player = 0,
    Attack = 1,
    Tower = 2,
    Base = 3,
}

impl ObjectType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Player),
            1 => Some(Self::Attack),
            2 => Some(Self::Tower),
            3 => Some(Self::Base),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttackType {
    Fireball = 0,
    LightningArrow = 1,
    TowerAttack = 2,
}

impl AttackType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Fireball),
            1 => Some(Self::LightningArrow),
            2 => Some(Self::TowerAttack),
            _ => None,
        }
    }

    pub fn speed(self) -> f32 {
        match self {
            Self::Fireball => 480.0,
            Self::LightningArrow => 720.0,
            Self::TowerAttack => 360.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hello {
    pub protocol_version: u8,
}

/// Client-owned pose for the sender's player and minion. The minion
/// rides along because the wire defines no separate minion-state tag.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerStateUpdate {
    pub client_id: u8,
    pub x: f32,
    pub y: f32,
    pub anim_row: u8,
    pub facing_left: bool,
    pub minion_active: bool,
    pub minion_x: f32,
    pub minion_y: f32,
    pub minion_anim_row: u8,
    pub minion_facing_left: bool,
}

/// The same record as seen by the other clients, stamped with the
/// server-assigned team so first sight can activate the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStateNotice {
    pub client_id: u8,
    pub team: bool,
    pub x: f32,
    pub y: f32,
    pub anim_row: u8,
    pub facing_left: bool,
    pub minion_active: bool,
    pub minion_x: f32,
    pub minion_y: f32,
    pub minion_anim_row: u8,
    pub minion_facing_left: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnAttackRequest {
    pub attack_type: u8,
    pub target_x: f32,
    pub target_y: f32,
}

/// Advisory damage report. The sender never asserts resulting health;
/// the server recomputes it from the authoritative value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageRequest {
    pub target: u8,
    pub amount: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResultReport {
    pub winning_team: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    pub client_id: u8,
    pub team: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnAttackNotice {
    pub attack_id: u32,
    pub owner: u8,
    pub team: bool,
    pub attack_type: u8,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
}

/// Carries the authoritative post-damage health so clients never track
/// health independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageNotice {
    pub target: u8,
    pub health: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub winning_team: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DestroyObject {
    pub object_type: u8,
    pub object_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerDisconnect {
    pub client_id: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown message tag {0}")]
    UnknownTag(u8),
    #[error("tag {tag}: payload is {got} bytes, record needs {expected}")]
    Truncated {
        tag: u8,
        expected: usize,
        got: usize,
    },
    #[error("payload codec failure: {0}")]
    Codec(#[from] bincode::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello(Hello),
    PlayerState(PlayerStateUpdate),
    SpawnAttack(SpawnAttackRequest),
    DamagePlayer(DamageRequest),
    DamageTower(DamageRequest),
    DamageBase(DamageRequest),
    DamageMinion(DamageRequest),
    MatchResult(MatchResultReport),

    Welcome(Welcome),
    PlayerStateNotice(PlayerStateNotice),
    SpawnAttackNotice(SpawnAttackNotice),
    PlayerDamageNotice(DamageNotice),
    TowerDamageNotice(DamageNotice),
    BaseDamageNotice(DamageNotice),
    MinionDamageNotice(DamageNotice),
    GameStart,
    GameResult(GameResult),
    DestroyObject(DestroyObject),
    PlayerDisconnect(PlayerDisconnect),
}

impl Message {
    pub fn tag(&self) -> MessageTag {
        match self {
            Message::Hello(_) => MessageTag::Hello,
            Message::PlayerState(_) => MessageTag::PlayerState,
            Message::SpawnAttack(_) => MessageTag::SpawnAttack,
            Message::DamagePlayer(_) => MessageTag::DamagePlayer,
            Message::DamageTower(_) => MessageTag::DamageTower,
            Message::DamageBase(_) => MessageTag::DamageBase,
            Message::DamageMinion(_) => MessageTag::DamageMinion,
            Message::MatchResult(_) => MessageTag::MatchResult,
            Message::Welcome(_) => MessageTag::Welcome,
            Message::PlayerStateNotice(_) => MessageTag::PlayerStateNotice,
            Message::SpawnAttackNotice(_) => MessageTag::SpawnAttackNotice,
            Message::PlayerDamageNotice(_) => MessageTag::PlayerDamageNotice,
            Message::TowerDamageNotice(_) => MessageTag::TowerDamageNotice,
            Message::BaseDamageNotice(_) => MessageTag::BaseDamageNotice,
            Message::MinionDamageNotice(_) => MessageTag::MinionDamageNotice,
            Message::GameStart => MessageTag::GameStart,
            Message::GameResult(_) => MessageTag::GameResult,
            Message::DestroyObject(_) => MessageTag::DestroyObject,
            Message::PlayerDisconnect(_) => MessageTag::PlayerDisconnect,
        }
    }

    /// True for the client-to-server request family.
    pub fn is_request(&self) -> bool {
        (self.tag() as u8) < 100
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(MAX_MESSAGE_SIZE);
        out.push(self.tag() as u8);
        match self {
            Message::Hello(p) => bincode::serialize_into(&mut out, p)?,
            Message::PlayerState(p) => bincode::serialize_into(&mut out, p)?,
            Message::SpawnAttack(p) => bincode::serialize_into(&mut out, p)?,
            Message::DamagePlayer(p)
            | Message::DamageTower(p)
            | Message::DamageBase(p)
            | Message::DamageMinion(p) => bincode::serialize_into(&mut out, p)?,
            Message::MatchResult(p) => bincode::serialize_into(&mut out, p)?,
            Message::Welcome(p) => bincode::serialize_into(&mut out, p)?,
            Message::PlayerStateNotice(p) => bincode::serialize_into(&mut out, p)?,
            Message::SpawnAttackNotice(p) => bincode::serialize_into(&mut out, p)?,
            Message::PlayerDamageNotice(p)
            | Message::TowerDamageNotice(p)
            | Message::BaseDamageNotice(p)
            | Message::MinionDamageNotice(p) => bincode::serialize_into(&mut out, p)?,
            Message::GameStart => {}
            Message::GameResult(p) => bincode::serialize_into(&mut out, p)?,
            Message::DestroyObject(p) => bincode::serialize_into(&mut out, p)?,
            Message::PlayerDisconnect(p) => bincode::serialize_into(&mut out, p)?,
        }
        Ok(out)
    }

    /// Decodes exactly one frame: the tag byte plus its full record.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (&tag_byte, payload) = frame.split_first().ok_or(ProtocolError::Empty)?;
        let tag = MessageTag::from_u8(tag_byte).ok_or(ProtocolError::UnknownTag(tag_byte))?;
        let expected = tag.payload_len();
        if payload.len() != expected {
            return Err(ProtocolError::Truncated {
                tag: tag_byte,
                expected,
                got: payload.len(),
            });
        }
        let message = match tag {
            MessageTag::Hello => Message::Hello(bincode::deserialize(payload)?),
            MessageTag::PlayerState => Message::PlayerState(bincode::deserialize(payload)?),
            MessageTag::SpawnAttack => Message::SpawnAttack(bincode::deserialize(payload)?),
            MessageTag::DamagePlayer => Message::DamagePlayer(bincode::deserialize(payload)?),
            MessageTag::DamageTower => Message::DamageTower(bincode::deserialize(payload)?),
            MessageTag::DamageBase => Message::DamageBase(bincode::deserialize(payload)?),
            MessageTag::DamageMinion => Message::DamageMinion(bincode::deserialize(payload)?),
            MessageTag::MatchResult => Message::MatchResult(bincode::deserialize(payload)?),
            MessageTag::Welcome => Message::Welcome(bincode::deserialize(payload)?),
            MessageTag::PlayerStateNotice => {
                Message::PlayerStateNotice(bincode::deserialize(payload)?)
            }
            MessageTag::SpawnAttackNotice => {
                Message::SpawnAttackNotice(bincode::deserialize(payload)?)
            }
            MessageTag::PlayerDamageNotice => {
                Message::PlayerDamageNotice(bincode::deserialize(payload)?)
            }
            MessageTag::TowerDamageNotice => {
                Message::TowerDamageNotice(bincode::deserialize(payload)?)
            }
            MessageTag::BaseDamageNotice => {
                Message::BaseDamageNotice(bincode::deserialize(payload)?)
            }
            MessageTag::MinionDamageNotice => {
                Message::MinionDamageNotice(bincode::deserialize(payload)?)
            }
            MessageTag::GameStart => Message::GameStart,
            MessageTag::GameResult => Message::GameResult(bincode::deserialize(payload)?),
            MessageTag::DestroyObject => Message::DestroyObject(bincode::deserialize(payload)?),
            MessageTag::PlayerDisconnect => {
                Message::PlayerDisconnect(bincode::deserialize(payload)?)
            }
        };
        Ok(message)
    }
}

/// Accumulates stream bytes and yields complete messages. Because every
/// record size is known from the tag alone, framing is "wait for
/// 1 + payload_len bytes".
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Returns the next complete message, `Ok(None)` while one is still
    /// partial. A frame that fails to decode is consumed so the stream
    /// stays aligned; an unrecognized tag makes resync impossible, so
    /// the buffered bytes are discarded along with the error.
    pub fn next_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        let Some(&tag_byte) = self.buf.first() else {
            return Ok(None);
        };
        let Some(tag) = MessageTag::from_u8(tag_byte) else {
            self.buf.clear();
            return Err(ProtocolError::UnknownTag(tag_byte));
        };
        let frame_len = 1 + tag.payload_len();
        if self.buf.len() < frame_len {
            return Ok(None);
        }
        let result = Message::decode(&self.buf[..frame_len]);
        self.buf.drain(..frame_len);
        result.map(Some)
    }
}
