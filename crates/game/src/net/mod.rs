mod client;
mod protocol;
mod registry;
mod relay;
mod replication;

pub use client::{ConnectionState, ServerConnection};
pub use protocol::{
    AttackType, DEFAULT_PORT, DEFAULT_TICK_RATE, DamageNotice, DamageRequest, DestroyObject,
    FrameReader, GameResult, Hello, MAX_MESSAGE_SIZE, MatchResultReport, Message, MessageTag,
    ObjectType, PROTOCOL_STRIKE_LIMIT, PROTOCOL_VERSION, PlayerDisconnect, PlayerStateNotice,
    PlayerStateUpdate, ProtocolError, SpawnAttackNotice, SpawnAttackRequest, Welcome,
};
pub use registry::{ConnectionRegistry, NetEvent};
pub use relay::{AuthorityRelay, Directive, LiveAttack};
pub use replication::{
    AttackMirror, BaseMirror, DisconnectPolicy, MatchPhase, MinionMirror, PlayerMirror,
    ReplicationEvent, ReplicationState, TowerMirror,
};
