use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    ClientConnected {
        slot: u8,
        addr: SocketAddr,
    },
    ClientDisconnected {
        slot: u8,
        reason: DisconnectReason,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum DisconnectReason {
    StreamClosed,
    WriteFailed,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::StreamClosed => "closed its stream",
            DisconnectReason::WriteFailed => "stopped accepting writes",
        }
    }
}
