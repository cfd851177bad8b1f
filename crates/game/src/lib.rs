pub mod dispatch;
pub mod net;
pub mod world;

pub use dispatch::{Dispatcher, Subsystem, SubsystemKind};
pub use net::{
    AuthorityRelay, ConnectionRegistry, ConnectionState, DEFAULT_PORT, DEFAULT_TICK_RATE,
    Directive, DisconnectPolicy, MatchPhase, Message, MessageTag, NetEvent, ObjectType,
    PROTOCOL_VERSION, ReplicationEvent, ReplicationState, ServerConnection,
};
pub use world::{MAX_CLIENTS, ObjectKind};
